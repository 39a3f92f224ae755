//! Random promo code generation
//!
//! Codes are bearer secrets, so generators only accept an RNG that is marked
//! cryptographically secure. Production passes `OsRng`; tests pass a seeded
//! `StdRng` for reproducibility.

use promo_shared::{CodeLength, CodePrefix, PromoCodeValue, ValidationError, CODE_ALPHABET};
use rand::{CryptoRng, Rng};
use std::collections::HashSet;

/// One code: `prefix` followed by `length` symbols drawn uniformly from the alphabet
pub fn generate_code<R>(rng: &mut R, prefix: &CodePrefix, length: CodeLength) -> Result<PromoCodeValue, ValidationError>
where
    R: Rng + CryptoRng,
{
    let mut code = String::with_capacity(prefix.len() + length.get());
    code.push_str(prefix.as_str());
    for _ in 0..length.get() {
        let symbol = CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())];
        code.push(char::from(symbol));
    }
    PromoCodeValue::parse(&code)
}

/// Number of distinct bodies of `length` symbols, `None` when it exceeds `usize`
pub fn code_space(length: CodeLength) -> Option<usize> {
    CODE_ALPHABET.len().checked_pow(length.get() as u32)
}

/// `count` codes, distinct from each other and from everything in `avoid`
///
/// Fails up front when `count` plus `avoid` exceeds the code space, so the
/// draw loop always has room left to terminate.
pub fn generate_distinct<R>(
    rng: &mut R,
    prefix: &CodePrefix,
    length: CodeLength,
    count: usize,
    avoid: &HashSet<PromoCodeValue>,
) -> Result<Vec<PromoCodeValue>, ValidationError>
where
    R: Rng + CryptoRng,
{
    if let Some(available) = code_space(length) {
        if count.saturating_add(avoid.len()) > available {
            return Err(ValidationError::CodeSpaceTooSmall {
                requested: count,
                available: available.saturating_sub(avoid.len()),
            });
        }
    }

    let mut seen: HashSet<PromoCodeValue> = HashSet::with_capacity(count);
    let mut codes = Vec::with_capacity(count);

    while codes.len() < count {
        let code = generate_code(rng, prefix, length)?;
        if avoid.contains(&code) || !seen.insert(code.clone()) {
            continue;
        }
        codes.push(code);
    }

    Ok(codes)
}
