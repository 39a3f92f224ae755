pub mod memory_promo_repository;
pub mod promo_repository;
pub mod redis_promo_repository;

pub use memory_promo_repository::InMemoryPromoRepository;
pub use promo_repository::{PostgresPromoRepository, PromoRepository};
pub use redis_promo_repository::RedisPromoRepository;
