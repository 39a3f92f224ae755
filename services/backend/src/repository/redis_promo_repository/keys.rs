//! Redis key generation functions
//!
//! Centralizes all Redis key patterns used for promo storage and indexing.

/// Redis key prefix for a promo code hash, keyed by normalized code
const CODE_KEY_PREFIX: &str = "promo:code:";

/// Redis key prefix for per-code structures keyed by numeric id
const CODE_ID_PREFIX: &str = "promo:id:";

/// Redis key prefix for a redemption record hash
const REDEMPTION_KEY_PREFIX: &str = "promo:redemption:";

/// Counter handing out promo code ids
const CODE_SEQUENCE: &str = "promo:seq:code";

/// Counter handing out redemption ids
const REDEMPTION_SEQUENCE: &str = "promo:seq:redemption";

/// Generate Redis key for a promo code hash
pub fn code_key(code: &str) -> String {
    format!("{}{}", CODE_KEY_PREFIX, code)
}

/// Set of device ids that redeemed the code with this id
pub fn code_devices_key(promo_code_id: i64) -> String {
    format!("{}{}:devices", CODE_ID_PREFIX, promo_code_id)
}

/// List of redemption ids of the code with this id, in redemption order
pub fn code_redemptions_key(promo_code_id: i64) -> String {
    format!("{}{}:redemptions", CODE_ID_PREFIX, promo_code_id)
}

/// Generate Redis key for a redemption record hash
pub fn redemption_key(redemption_id: i64) -> String {
    format!("{}{}", REDEMPTION_KEY_PREFIX, redemption_id)
}

pub fn code_sequence_key() -> &'static str {
    CODE_SEQUENCE
}

pub fn redemption_sequence_key() -> &'static str {
    REDEMPTION_SEQUENCE
}
