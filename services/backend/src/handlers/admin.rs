use axum::{
    extract::{Path, Query, State},
    response::Html,
    Form, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use promo_shared::{
    DEFAULT_BATCH_COUNT, DEFAULT_BONUS_QUESTIONS, DEFAULT_CODE_LENGTH, DEFAULT_MAX_REDEMPTIONS,
    DEFAULT_PREFIX,
};
use serde::Deserialize;
use std::str::FromStr;

use crate::{
    domain::CodeStatus,
    errors::{AppError, Result},
    services::IssueRequest,
    state::AppState,
    views,
};

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    #[serde(default)]
    pub token: String,
}

/// Raw admin form. Every field is text so that the token is checked before
/// any other field is interpreted.
#[derive(Debug, Default, Deserialize)]
pub struct CreateCodesForm {
    #[serde(default)]
    pub token: String,
    pub prefix: Option<String>,
    pub count: Option<String>,
    pub bonus_questions: Option<String>,
    pub max_redemptions: Option<String>,
    pub code_length: Option<String>,
    pub note: Option<String>,
    pub expires_date: Option<String>,
}

pub async fn admin_form(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Result<Html<String>> {
    state.admin.authorize(&query.token)?;
    Ok(Html(views::admin_form(&query.token)))
}

pub async fn create_codes(
    State(state): State<AppState>,
    Form(form): Form<CreateCodesForm>,
) -> Result<Html<String>> {
    state.admin.authorize(&form.token)?;

    let expires_at = parse_expires_date(form.expires_date.as_deref())?;
    let request = IssueRequest {
        count: parse_field("count", form.count.as_deref(), DEFAULT_BATCH_COUNT)?,
        bonus_questions: parse_field("bonus_questions", form.bonus_questions.as_deref(), DEFAULT_BONUS_QUESTIONS)?,
        max_redemptions: parse_field("max_redemptions", form.max_redemptions.as_deref(), DEFAULT_MAX_REDEMPTIONS)?,
        note: form.note.clone(),
        prefix: form.prefix.clone().unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
        code_length: parse_field("code_length", form.code_length.as_deref(), DEFAULT_CODE_LENGTH)?,
        expires_at,
    };

    let summary = views::BatchSummary {
        bonus_questions: request.bonus_questions,
        max_redemptions: request.max_redemptions,
        note: request.note.clone().unwrap_or_default(),
        expires_at,
    };

    let codes = state.issuer.create_codes(request).await?;

    Ok(Html(views::codes_created(&codes, &summary, &form.token)))
}

pub async fn code_status(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<CodeStatus>> {
    state.admin.authorize(&query.token)?;

    let promo = state.engine.find_code(&code).await?;
    let redemptions = state.engine.redemptions_for(&promo).await?;

    Ok(Json(CodeStatus::new(promo, redemptions)))
}

/// `YYYY-MM-DD` as UTC midnight; blank means no expiry
pub fn parse_expires_date(raw: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(raw) => raw,
    };

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::InvalidExpiryDate(raw.to_string()))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| AppError::InvalidExpiryDate(raw.to_string()))?;

    Ok(Some(midnight.and_utc()))
}

/// Missing or blank form fields take the form's default
fn parse_field<T: FromStr>(name: &str, raw: Option<&str>, default: T) -> Result<T> {
    match raw.map(str::trim) {
        None | Some("") => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| AppError::InvalidInput(format!("{} must be a whole number", name))),
    }
}
