pub mod admin_guard;
pub mod code_generator;
pub mod code_issuer;
pub mod redemption_engine;

pub use admin_guard::AdminGuard;
pub use code_issuer::{CodeIssuer, IssueRequest};
pub use redemption_engine::RedemptionEngine;
