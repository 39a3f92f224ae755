/// Shared constants for the promo-code service
///
/// Centralizes code shape limits and schema column widths so that issuance,
/// redemption and storage agree on them.

/// Symbols a generated code body is drawn from
///
/// `0`, `O`, `1` and `I` are left out so codes can be read aloud and typed
/// from a screenshot without ambiguity. 32 symbols give 5 bits per character.
pub const CODE_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Shortest code body (characters after the prefix)
pub const MIN_CODE_LENGTH: usize = 4;

/// Longest code body (characters after the prefix)
pub const MAX_CODE_LENGTH: usize = 16;

/// Body length used by the admin form when none is given
pub const DEFAULT_CODE_LENGTH: usize = 6;

/// Prefix used by the admin form when none is given
pub const DEFAULT_PREFIX: &str = "STAB";

/// Width of `promo_codes.code`; prefix plus body must fit
pub const MAX_STORED_CODE_LENGTH: usize = 64;

/// Width of `promo_codes.notes`
pub const MAX_NOTES_LENGTH: usize = 255;

/// Width of `promo_redemptions.device_id`
pub const MAX_DEVICE_ID_LENGTH: usize = 128;

/// Upper bound on codes created by one issuance request
pub const MAX_BATCH_SIZE: usize = 1000;

/// Attempts the issuer makes to land a batch without code collisions
pub const MAX_ISSUE_ATTEMPTS: u32 = 5;

/// Default cap on redemptions of a single code
pub const DEFAULT_MAX_REDEMPTIONS: i32 = 1;

/// Default bonus granted by codes created from the admin form
pub const DEFAULT_BONUS_QUESTIONS: i32 = 50;

/// Default number of codes created from the admin form
pub const DEFAULT_BATCH_COUNT: usize = 10;
