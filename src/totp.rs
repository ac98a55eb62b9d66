//! TOTP challenge handling (RFC 6238).
//!
//! Verifies 6-digit codes with a 30-second step and a configurable drift
//! window, and produces enrollment material (secret, provisioning URI, QR
//! data URL). Time comes from the injected [`Clock`] so verification is
//! deterministic under test.

use crate::config::TotpConfig;
use crate::error::{AuthError, Result};
use crate::providers::Clock;
use std::sync::Arc;
use totp_rs::{Algorithm, Secret, TOTP};

/// TOTP step length in seconds.
const STEP_SECONDS: u64 = 30;

/// Number of digits in a code.
const DIGITS: usize = 6;

/// Enrollment material for a new TOTP secret.
///
/// This is a setup-time product, not part of the login critical path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotpEnrollment {
    /// Base32-encoded secret, for manual entry.
    pub secret_base32: String,

    /// `otpauth://` provisioning URI.
    pub provisioning_uri: String,

    /// QR code of the provisioning URI as a `data:image/png;base64,` URL.
    pub qr_png_base64: String,
}

/// TOTP challenge handler.
pub struct TotpHandler<C: Clock> {
    issuer: String,
    window_steps: u8,
    clock: Arc<C>,
}

impl<C: Clock> TotpHandler<C> {
    /// Create a handler from configuration and a clock.
    #[must_use]
    pub fn new(config: &TotpConfig, clock: Arc<C>) -> Self {
        Self {
            issuer: config.issuer_label.clone(),
            window_steps: config.window_steps,
            clock,
        }
    }

    /// Verify a submitted code against a base32 secret.
    ///
    /// Checks the current timestep plus `window_steps` steps on either
    /// side. Returns `false` on any mismatch or on an undecodable secret,
    /// never an error; the caller maps `false` to
    /// [`AuthError::InvalidTwoFactorCode`](crate::AuthError::InvalidTwoFactorCode).
    #[must_use]
    pub fn verify_code(&self, secret_base32: &str, code: &str) -> bool {
        self.matched_timestep(secret_base32, code).is_some()
    }

    /// Like [`TotpHandler::verify_code`], but reports which timestep the
    /// code matched so the caller can refuse a second acceptance of the
    /// same step (anti-replay).
    #[must_use]
    pub fn matched_timestep(&self, secret_base32: &str, code: &str) -> Option<u64> {
        let totp = self.build_totp(secret_base32, "account").ok()?;
        let now = self.clock.unix_timestamp();
        let window = u64::from(self.window_steps) * STEP_SECONDS;

        // Walk candidate times oldest-first so a code valid at two steps
        // (impossible with standard TOTP, but cheap to pin down) maps to a
        // stable timestep.
        let start = now.saturating_sub(window);
        let mut time = start;
        while time <= now + window {
            let candidate = totp.generate(time);
            if constant_time_eq::constant_time_eq(candidate.as_bytes(), code.as_bytes()) {
                return Some(time / STEP_SECONDS);
            }
            time += STEP_SECONDS;
        }

        None
    }

    /// Current timestep counter.
    #[must_use]
    pub fn current_timestep(&self) -> u64 {
        self.clock.unix_timestamp() / STEP_SECONDS
    }

    /// Generate a fresh secret and enrollment material for a user.
    ///
    /// # Errors
    ///
    /// Returns error if secret generation or QR encoding fails.
    pub fn generate_secret(&self, account_email: &str) -> Result<TotpEnrollment> {
        let secret = Secret::generate_secret();
        let secret_bytes = secret
            .to_bytes()
            .map_err(|e| AuthError::InternalError(format!("Secret generation failed: {e}")))?;

        let totp = TOTP::new(
            Algorithm::SHA1,
            DIGITS,
            self.window_steps,
            STEP_SECONDS,
            secret_bytes,
            Some(self.issuer.clone()),
            account_email.to_string(),
        )
        .map_err(|e| AuthError::InternalError(format!("TOTP init failed: {e}")))?;

        let qr = totp
            .get_qr_base64()
            .map_err(|e| AuthError::InternalError(format!("QR encoding failed: {e}")))?;

        Ok(TotpEnrollment {
            secret_base32: totp.get_secret_base32(),
            provisioning_uri: totp.get_url(),
            qr_png_base64: format!("data:image/png;base64,{qr}"),
        })
    }

    fn build_totp(&self, secret_base32: &str, account: &str) -> Result<TOTP> {
        let secret_bytes = Secret::Encoded(secret_base32.to_string())
            .to_bytes()
            .map_err(|e| AuthError::InternalError(format!("Secret undecodable: {e}")))?;

        TOTP::new(
            Algorithm::SHA1,
            DIGITS,
            self.window_steps,
            STEP_SECONDS,
            secret_bytes,
            Some(self.issuer.clone()),
            account.to_string(),
        )
        .map_err(|e| AuthError::InternalError(format!("TOTP init failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::mocks::MockClock;
    use chrono::{TimeZone, Utc};

    const SECRET: &str = "JBSWY3DPEHPK3PXPJBSWY3DPEHPK3PXP";

    fn handler_at(epoch_secs: i64) -> TotpHandler<MockClock> {
        let clock = Arc::new(MockClock::new(
            Utc.timestamp_opt(epoch_secs, 0).single().unwrap(),
        ));
        TotpHandler::new(&TotpConfig::default(), clock)
    }

    /// Generate the reference code for a given time, bypassing the handler.
    fn code_at(epoch_secs: u64) -> String {
        let totp = TOTP::new(
            Algorithm::SHA1,
            DIGITS,
            1,
            STEP_SECONDS,
            Secret::Encoded(SECRET.to_string()).to_bytes().unwrap(),
            Some("Authgate".to_string()),
            "account".to_string(),
        )
        .unwrap();
        totp.generate(epoch_secs)
    }

    #[test]
    fn test_current_code_accepted() {
        let handler = handler_at(1_700_000_015);
        assert!(handler.verify_code(SECRET, &code_at(1_700_000_015)));
    }

    #[test]
    fn test_adjacent_steps_accepted() {
        let handler = handler_at(1_700_000_015);
        // One step behind and one ahead are inside the ±1 window.
        assert!(handler.verify_code(SECRET, &code_at(1_700_000_015 - 30)));
        assert!(handler.verify_code(SECRET, &code_at(1_700_000_015 + 30)));
    }

    #[test]
    fn test_outside_window_rejected() {
        let handler = handler_at(1_700_000_015);
        assert!(!handler.verify_code(SECRET, &code_at(1_700_000_015 - 120)));
        assert!(!handler.verify_code(SECRET, &code_at(1_700_000_015 + 120)));
    }

    #[test]
    fn test_garbage_code_rejected() {
        let handler = handler_at(1_700_000_015);
        assert!(!handler.verify_code(SECRET, "000000"));
        assert!(!handler.verify_code(SECRET, ""));
        assert!(!handler.verify_code(SECRET, "not-a-code"));
    }

    #[test]
    fn test_bad_secret_rejected_not_panicking() {
        let handler = handler_at(1_700_000_015);
        assert!(!handler.verify_code("not base32 !!!", "123456"));
    }

    #[test]
    fn test_matched_timestep_is_the_code_step() {
        let handler = handler_at(1_700_000_015);
        let previous_step_code = code_at(1_700_000_015 - 30);

        let step = handler.matched_timestep(SECRET, &previous_step_code).unwrap();
        assert_eq!(step, (1_700_000_015 - 30) / 30);
    }

    #[test]
    fn test_enrollment_material() {
        let handler = handler_at(1_700_000_015);
        let enrollment = handler.generate_secret("user@test.com").unwrap();

        assert!(!enrollment.secret_base32.is_empty());
        assert!(enrollment.provisioning_uri.starts_with("otpauth://totp/"));
        assert!(enrollment.provisioning_uri.contains("issuer=Authgate"));
        assert!(enrollment.qr_png_base64.starts_with("data:image/png;base64,"));

        // A code generated from the enrolled secret must verify.
        let totp = TOTP::new(
            Algorithm::SHA1,
            DIGITS,
            1,
            STEP_SECONDS,
            Secret::Encoded(enrollment.secret_base32.clone())
                .to_bytes()
                .unwrap(),
            Some("Authgate".to_string()),
            "account".to_string(),
        )
        .unwrap();
        let code = totp.generate(1_700_000_015);
        assert!(handler.verify_code(&enrollment.secret_base32, &code));
    }
}
