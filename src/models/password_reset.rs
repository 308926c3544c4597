use mongodb::bson::oid::ObjectId;
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

/// One password-recovery record per email, living in `password_resets`.
///
/// Lifecycle: created (or regenerated in place) by forgot-password /
/// resend-otp, consumed once `verified` flips true, dead once
/// `otp_expires_at` passes. Expired records are purged lazily, never by a
/// timer.
///
/// `attempts` goes back to 0 every time a new OTP is generated;
/// `resend_count` survives regenerations and only starts at 0 on a fresh
/// record. That asymmetry is intentional: the resend cap bounds how many
/// emails one record can ever trigger.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PasswordReset {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub email: String,
    #[serde(rename = "hashedOTP")]
    pub hashed_otp: String,

    pub otp_created_at: DateTime,
    pub otp_expires_at: DateTime,

    pub attempts: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_attempt_at: Option<DateTime>,

    pub resend_count: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_resend_at: Option<DateTime>,

    pub verified: bool,
}

impl PasswordReset {
    pub fn is_live(&self, now: DateTime) -> bool {
        !self.verified && self.otp_expires_at.timestamp_millis() > now.timestamp_millis()
    }
}
