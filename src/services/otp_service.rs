use std::sync::Arc;

use async_trait::async_trait;
use mongodb::bson::DateTime as BsonDateTime;
use rand::Rng;

use crate::errors::Result;
use crate::models::password_reset::PasswordReset;
use crate::repository::OtpStore;
use crate::services::password_service::PasswordHasher;

pub const MAX_ATTEMPTS: i32 = 5;
pub const LOCK_MINUTES: i64 = 10;
pub const MAX_RESEND: i32 = 3;
pub const RESEND_INTERVAL_MIN: i64 = 2;
pub const OTP_TTL_MINUTES: i64 = 10;

/// Outcome of a throttling gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OtpGate {
    Allowed,
    Denied(String),
}

impl OtpGate {
    pub fn is_allowed(&self) -> bool {
        matches!(self, OtpGate::Allowed)
    }
}

/// Uniform 4-digit code in [1000, 9999]. Short enough to type from an
/// email; the 10-minute TTL and the attempt gate bound brute-force exposure.
pub fn generate_otp() -> String {
    let mut rng = rand::thread_rng();
    rng.gen_range(1000..=9999).to_string()
}

/// Sliding lockout over failed verification attempts. Under the cap the
/// record is always eligible; at the cap it becomes eligible again once the
/// lockout window has elapsed since the last attempt. The counter itself is
/// only reset when a new OTP is generated.
pub fn can_attempt(record: &PasswordReset, now: BsonDateTime) -> OtpGate {
    if record.attempts < MAX_ATTEMPTS {
        return OtpGate::Allowed;
    }

    let last = match record.last_attempt_at {
        Some(t) => t,
        None => return OtpGate::Allowed,
    };

    let minutes = elapsed_minutes(last, now);
    if minutes >= LOCK_MINUTES as f64 {
        return OtpGate::Allowed;
    }

    let remaining = (LOCK_MINUTES as f64 - minutes).ceil() as i64;
    OtpGate::Denied(format!(
        "Too many attempts. Try again after {} minutes",
        remaining
    ))
}

/// Resend throttle. The lifetime cap is permanent for the record: once
/// three resends have happened, only expiry (and the purge that follows)
/// opens the email up again. Below the cap, resends must be 2 minutes apart.
pub fn can_resend(record: &PasswordReset, now: BsonDateTime) -> OtpGate {
    if record.resend_count >= MAX_RESEND {
        return OtpGate::Denied("OTP resend limit reached".to_string());
    }

    let last = match record.last_resend_at {
        Some(t) => t,
        None => return OtpGate::Allowed,
    };

    let minutes = elapsed_minutes(last, now);
    if minutes < RESEND_INTERVAL_MIN as f64 {
        let remaining = (RESEND_INTERVAL_MIN as f64 - minutes).ceil() as i64;
        return OtpGate::Denied(format!(
            "Please wait {} minutes before resending",
            remaining
        ));
    }

    OtpGate::Allowed
}

fn elapsed_minutes(from: BsonDateTime, to: BsonDateTime) -> f64 {
    (to.timestamp_millis() - from.timestamp_millis()) as f64 / 1000.0 / 60.0
}

/// Strategy for matching a candidate OTP to a reset record. Kept behind a
/// trait so the scan below could be swapped for an email-indexed lookup
/// without touching the auth service.
#[async_trait]
pub trait OtpVerifier: Send + Sync {
    /// Returns the record the candidate matched, already marked verified,
    /// or None when no eligible record matched.
    async fn verify(&self, candidate: &str, now: BsonDateTime) -> Result<Option<PasswordReset>>;
}

/// Scans every live, unverified record and bcrypt-compares the candidate
/// against each one the attempt gate allows. Only hashed codes ever touch
/// the store, so there is nothing to index a lookup on; the scan stays
/// cheap because live records are bounded by the 10-minute expiry window.
pub struct ScanVerifier {
    store: Arc<dyn OtpStore>,
    hasher: PasswordHasher,
}

impl ScanVerifier {
    pub fn new(store: Arc<dyn OtpStore>, hasher: PasswordHasher) -> Self {
        Self { store, hasher }
    }
}

#[async_trait]
impl OtpVerifier for ScanVerifier {
    async fn verify(&self, candidate: &str, now: BsonDateTime) -> Result<Option<PasswordReset>> {
        let records = self.store.find_all_live_unverified(now).await?;

        for mut record in records {
            if !can_attempt(&record, now).is_allowed() {
                continue;
            }

            if self.hasher.verify(candidate, &record.hashed_otp)? {
                record.verified = true;
                record.last_attempt_at = Some(now);
                self.store.upsert_by_email(&record).await?;
                return Ok(Some(record));
            }

            // A failed comparison counts against the record's attempt budget.
            record.attempts += 1;
            record.last_attempt_at = Some(now);
            self.store.upsert_by_email(&record).await?;
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> PasswordReset {
        let now = BsonDateTime::now();
        PasswordReset {
            id: None,
            email: "a@x.com".to_string(),
            hashed_otp: "$2b$10$hash".to_string(),
            otp_created_at: now,
            otp_expires_at: minutes_from(now, OTP_TTL_MINUTES),
            attempts: 0,
            last_attempt_at: None,
            resend_count: 0,
            last_resend_at: None,
            verified: false,
        }
    }

    fn minutes_from(t: BsonDateTime, minutes: i64) -> BsonDateTime {
        BsonDateTime::from_millis(t.timestamp_millis() + minutes * 60_000)
    }

    #[test]
    fn generated_otp_is_four_digits() {
        for _ in 0..1_000 {
            let otp = generate_otp();
            let n: u32 = otp.parse().unwrap();
            assert!((1000..=9999).contains(&n), "out of range: {}", otp);
        }
    }

    #[test]
    fn attempts_below_cap_are_allowed() {
        let now = BsonDateTime::now();
        let mut r = record();
        r.attempts = MAX_ATTEMPTS - 1;
        r.last_attempt_at = Some(now);

        assert!(can_attempt(&r, now).is_allowed());
    }

    #[test]
    fn attempts_at_cap_are_locked_out() {
        let now = BsonDateTime::now();
        let mut r = record();
        r.attempts = MAX_ATTEMPTS;
        r.last_attempt_at = Some(now);

        match can_attempt(&r, now) {
            OtpGate::Denied(msg) => assert!(msg.contains("Too many attempts")),
            OtpGate::Allowed => panic!("expected lockout"),
        }
    }

    #[test]
    fn lockout_expires_after_window() {
        let now = BsonDateTime::now();
        let mut r = record();
        r.attempts = MAX_ATTEMPTS;
        r.last_attempt_at = Some(minutes_from(now, -(LOCK_MINUTES + 1)));

        assert!(can_attempt(&r, now).is_allowed());
    }

    #[test]
    fn lockout_message_reports_remaining_minutes() {
        let now = BsonDateTime::now();
        let mut r = record();
        r.attempts = MAX_ATTEMPTS;
        r.last_attempt_at = Some(minutes_from(now, -4));

        match can_attempt(&r, now) {
            OtpGate::Denied(msg) => {
                assert_eq!(msg, "Too many attempts. Try again after 6 minutes")
            }
            OtpGate::Allowed => panic!("expected lockout"),
        }
    }

    #[test]
    fn resend_cap_is_permanent() {
        let now = BsonDateTime::now();
        let mut r = record();
        r.resend_count = MAX_RESEND;
        // Way past any interval: the cap still holds.
        r.last_resend_at = Some(minutes_from(now, -600));

        match can_resend(&r, now) {
            OtpGate::Denied(msg) => assert_eq!(msg, "OTP resend limit reached"),
            OtpGate::Allowed => panic!("expected permanent denial"),
        }
    }

    #[test]
    fn resend_throttled_inside_interval() {
        let now = BsonDateTime::now();
        let mut r = record();
        r.resend_count = 1;
        r.last_resend_at = Some(minutes_from(now, -1));

        match can_resend(&r, now) {
            OtpGate::Denied(msg) => assert!(msg.contains("before resending")),
            OtpGate::Allowed => panic!("expected throttle"),
        }
    }

    #[test]
    fn resend_allowed_after_interval() {
        let now = BsonDateTime::now();
        let mut r = record();
        r.resend_count = 2;
        r.last_resend_at = Some(minutes_from(now, -3));

        assert!(can_resend(&r, now).is_allowed());
    }

    #[test]
    fn first_resend_has_no_interval_gate() {
        let now = BsonDateTime::now();
        let r = record();

        assert!(can_resend(&r, now).is_allowed());
    }

    #[test]
    fn liveness_tracks_expiry_and_verified_flag() {
        let now = BsonDateTime::now();
        let mut r = record();
        assert!(r.is_live(now));

        r.verified = true;
        assert!(!r.is_live(now));

        let mut r = record();
        r.otp_expires_at = minutes_from(now, -1);
        assert!(!r.is_live(now));
    }
}
