use crate::config::Config;
use crate::repository::PromoRepository;
use crate::services::{AdminGuard, CodeIssuer, RedemptionEngine};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RedemptionEngine>,
    pub issuer: Arc<CodeIssuer>,
    pub admin: AdminGuard,
}

impl AppState {
    /// Wire every component from the one configuration object
    pub fn new(config: Config, repo: Arc<dyn PromoRepository>) -> Self {
        let admin = AdminGuard::new(config.admin.token);
        let engine = RedemptionEngine::new(Arc::clone(&repo));
        let issuer = CodeIssuer::new(repo, config.issuance);

        Self {
            engine: Arc::new(engine),
            issuer: Arc::new(issuer),
            admin,
        }
    }
}
