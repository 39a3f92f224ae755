use chrono::{DateTime, Utc};
use promo_shared::{CodeLength, CodePrefix, PromoCodeValue, MAX_NOTES_LENGTH, MAX_STORED_CODE_LENGTH};
use rand::rngs::OsRng;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::Instrument;

use super::code_generator::{code_space, generate_distinct};
use crate::config::IssuanceConfig;
use crate::domain::{BatchInsert, NewPromoBatch};
use crate::errors::{AppError, Result};
use crate::repository::PromoRepository;

/// Parameters of one issuance request, before validation
#[derive(Debug, Clone)]
pub struct IssueRequest {
    pub count: usize,
    pub bonus_questions: i32,
    pub max_redemptions: i32,
    pub note: Option<String>,
    pub prefix: String,
    pub code_length: usize,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Validated shape of a batch
struct BatchPlan {
    count: usize,
    prefix: CodePrefix,
    length: CodeLength,
    bonus_questions: i32,
    max_redemptions: i32,
    expires_at: Option<DateTime<Utc>>,
    notes: Option<String>,
}

pub struct CodeIssuer {
    repo: Arc<dyn PromoRepository>,
    config: IssuanceConfig,
}

impl CodeIssuer {
    pub fn new(repo: Arc<dyn PromoRepository>, config: IssuanceConfig) -> Self {
        Self { repo, config }
    }

    /// Generate and persist `request.count` new codes, returned in generation order.
    ///
    /// The batch is written all-or-nothing. When the store reports that some
    /// generated codes already exist, only those are regenerated and the whole
    /// batch is retried, up to `max_attempts` times.
    pub async fn create_codes(&self, request: IssueRequest) -> Result<Vec<PromoCodeValue>> {
        let plan = self.plan(request)?;

        let span = tracing::info_span!(
            "create_codes",
            count = plan.count,
            prefix = %plan.prefix.as_str(),
            code_length = plan.length.get(),
            bonus_questions = plan.bonus_questions,
            max_redemptions = plan.max_redemptions
        );

        self.issue(plan).instrument(span).await
    }

    fn plan(&self, request: IssueRequest) -> Result<BatchPlan> {
        if request.count < 1 || request.count > self.config.max_batch_size {
            return Err(AppError::InvalidInput(format!(
                "count must be between 1 and {}",
                self.config.max_batch_size
            )));
        }
        if request.bonus_questions < 1 {
            return Err(AppError::InvalidInput("bonus_questions must be at least 1".to_string()));
        }
        if request.max_redemptions < 1 {
            return Err(AppError::InvalidInput("max_redemptions must be at least 1".to_string()));
        }

        let length = CodeLength::new(request.code_length)?;
        if let Some(space) = code_space(length).filter(|space| request.count > *space) {
            return Err(AppError::InvalidInput(format!(
                "count {} exceeds the {} distinct codes of length {}",
                request.count,
                space,
                length.get()
            )));
        }
        let prefix = CodePrefix::parse(&request.prefix)?;
        if prefix.len() + length.get() > MAX_STORED_CODE_LENGTH {
            return Err(AppError::InvalidInput(format!(
                "prefix plus code length must not exceed {} characters",
                MAX_STORED_CODE_LENGTH
            )));
        }

        let notes = request
            .note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        if notes.as_ref().is_some_and(|n| n.chars().count() > MAX_NOTES_LENGTH) {
            return Err(AppError::InvalidInput(format!(
                "note must be at most {} characters",
                MAX_NOTES_LENGTH
            )));
        }

        Ok(BatchPlan {
            count: request.count,
            prefix,
            length,
            bonus_questions: request.bonus_questions,
            max_redemptions: request.max_redemptions,
            expires_at: request.expires_at,
            notes,
        })
    }

    async fn issue(&self, plan: BatchPlan) -> Result<Vec<PromoCodeValue>> {
        let mut codes = generate_distinct(&mut OsRng, &plan.prefix, plan.length, plan.count, &HashSet::new())?;
        let mut taken: HashSet<PromoCodeValue> = HashSet::new();

        for attempt in 1..=self.config.max_attempts {
            let batch = NewPromoBatch {
                codes: codes.clone(),
                bonus_questions: plan.bonus_questions,
                max_redemptions: plan.max_redemptions,
                expires_at: plan.expires_at,
                notes: plan.notes.clone(),
            };

            match self.repo.insert_batch(&batch).await? {
                BatchInsert::Inserted => {
                    tracing::info!(attempt, "Promo codes created");
                    metrics::counter!("promo_codes_issued_total").increment(codes.len() as u64);
                    return Ok(codes);
                }
                BatchInsert::Collided(collided) => {
                    tracing::warn!(attempt, collisions = collided.len(), "Generated codes already exist, regenerating");
                    taken.extend(collided);

                    let slots: Vec<usize> = codes
                        .iter()
                        .enumerate()
                        .filter(|(_, code)| taken.contains(*code))
                        .map(|(i, _)| i)
                        .collect();
                    let avoid: HashSet<PromoCodeValue> = codes.iter().chain(taken.iter()).cloned().collect();
                    let replacements = generate_distinct(&mut OsRng, &plan.prefix, plan.length, slots.len(), &avoid)
                        .map_err(|e| {
                            tracing::error!(error = %e, "Code space exhausted while regenerating collisions");
                            AppError::Internal(anyhow::anyhow!(e))
                        })?;

                    for (slot, code) in slots.into_iter().zip(replacements) {
                        codes[slot] = code;
                    }
                }
            }
        }

        Err(AppError::Internal(anyhow::anyhow!(
            "Could not create {} unique codes with prefix '{}' after {} attempts",
            plan.count,
            plan.prefix.as_str(),
            self.config.max_attempts
        )))
    }
}
