//! Promo codes: generation and normalization.

use rand::Rng;

use promoflow_core::{DomainError, DomainResult};

const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const GENERATED_LEN: usize = 8;

/// Random 8-character uppercase code (ambiguous glyphs like 0/O and 1/I left out).
pub fn generate_promo_code() -> String {
    let mut rng = rand::thread_rng();
    (0..GENERATED_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Uppercase a caller-supplied code and check its shape.
///
/// Codes are 4 to 32 characters of ASCII letters, digits, `-` or `_`.
pub fn normalize_promo_code(raw: &str) -> DomainResult<String> {
    let code = raw.trim().to_ascii_uppercase();
    if !(4..=32).contains(&code.len()) {
        return Err(DomainError::validation("promo code must be 4 to 32 characters"));
    }
    if !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(DomainError::validation(
            "promo code may only contain letters, digits, '-' and '_'",
        ));
    }
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_are_valid() {
        for _ in 0..50 {
            let code = generate_promo_code();
            assert_eq!(code.len(), 8);
            assert_eq!(normalize_promo_code(&code).unwrap(), code);
        }
    }

    #[test]
    fn supplied_codes_are_uppercased() {
        assert_eq!(normalize_promo_code(" summer-24 ").unwrap(), "SUMMER-24");
    }

    #[test]
    fn bad_codes_are_rejected() {
        assert!(normalize_promo_code("abc").is_err());
        assert!(normalize_promo_code("has space").is_err());
        assert!(normalize_promo_code(&"x".repeat(33)).is_err());
    }
}
