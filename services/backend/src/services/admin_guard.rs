use std::sync::Arc;

use crate::errors::{AppError, Result};

/// Shared-secret check in front of every admin route
///
/// Fails closed: without a configured token nothing gets through, whatever
/// the caller supplies.
#[derive(Clone)]
pub struct AdminGuard {
    token: Option<Arc<str>>,
}

impl AdminGuard {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.is_empty()).map(Arc::from),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.token.is_some()
    }

    pub fn authorize(&self, supplied: &str) -> Result<()> {
        let expected = self.token.as_deref().ok_or(AppError::AdminTokenNotConfigured)?;

        if constant_time_eq(expected.as_bytes(), supplied.as_bytes()) {
            Ok(())
        } else {
            tracing::warn!("Admin request rejected: token mismatch");
            Err(AppError::Forbidden)
        }
    }
}

impl std::fmt::Debug for AdminGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminGuard")
            .field("configured", &self.is_configured())
            .finish()
    }
}

/// Compare without an early exit on the first differing byte.
/// Only the length comparison short-circuits.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
