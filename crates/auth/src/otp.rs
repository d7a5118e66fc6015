//! One-time codes for verification and password recovery.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use promoflow_core::DomainError;

/// How long a freshly issued code stays valid.
pub const OTP_TTL_MINUTES: i64 = 5;

/// A 6-digit numeric code and its expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneTimeCode {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

impl OneTimeCode {
    pub fn generate(now: DateTime<Utc>) -> Self {
        let code: u32 = rand::thread_rng().gen_range(100_000..=999_999);
        Self {
            code: code.to_string(),
            expires_at: now + Duration::minutes(OTP_TTL_MINUTES),
        }
    }
}

#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
pub enum OtpError {
    #[error("no one-time code has been issued")]
    NotIssued,

    #[error("invalid one-time code")]
    WrongCode,

    #[error("one-time code expired")]
    Expired,
}

impl From<OtpError> for DomainError {
    fn from(err: OtpError) -> Self {
        match err {
            OtpError::NotIssued | OtpError::WrongCode => DomainError::validation(err.to_string()),
            OtpError::Expired => DomainError::invalid_state(err.to_string()),
        }
    }
}

/// Check a submitted code against the stored pair.
///
/// The code is compared first, then the expiry, so a wrong code never reveals
/// whether a valid one has expired. The stored code is not consumed.
pub fn verify_otp(
    stored_code: Option<&str>,
    stored_expiry: Option<DateTime<Utc>>,
    submitted: &str,
    now: DateTime<Utc>,
) -> Result<(), OtpError> {
    let (code, expiry) = match (stored_code, stored_expiry) {
        (Some(code), Some(expiry)) => (code, expiry),
        _ => return Err(OtpError::NotIssued),
    };
    if code != submitted.trim() {
        return Err(OtpError::WrongCode);
    }
    if expiry <= now {
        return Err(OtpError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_code_has_six_digits_and_five_minute_expiry() {
        let now = Utc::now();
        for _ in 0..100 {
            let otp = OneTimeCode::generate(now);
            assert_eq!(otp.code.len(), 6);
            assert!(otp.code.chars().all(|c| c.is_ascii_digit()));
            assert_eq!(otp.expires_at - now, Duration::minutes(5));
        }
    }

    #[test]
    fn matching_code_inside_window_verifies() {
        let now = Utc::now();
        let otp = OneTimeCode::generate(now);
        assert!(verify_otp(Some(&otp.code), Some(otp.expires_at), &otp.code, now).is_ok());
    }

    #[test]
    fn wrong_and_expired_are_distinct() {
        let now = Utc::now();
        let expiry = now + Duration::minutes(5);
        assert_eq!(verify_otp(Some("123456"), Some(expiry), "654321", now), Err(OtpError::WrongCode));

        let later = expiry + Duration::seconds(1);
        assert_eq!(verify_otp(Some("123456"), Some(expiry), "123456", later), Err(OtpError::Expired));

        let wrong: DomainError = OtpError::WrongCode.into();
        let expired: DomainError = OtpError::Expired.into();
        assert_ne!(wrong.kind(), expired.kind());
    }

    #[test]
    fn expiry_boundary_counts_as_expired() {
        let now = Utc::now();
        assert_eq!(verify_otp(Some("123456"), Some(now), "123456", now), Err(OtpError::Expired));
    }

    #[test]
    fn missing_code_is_not_issued() {
        assert_eq!(verify_otp(None, None, "123456", Utc::now()), Err(OtpError::NotIssued));
    }
}
