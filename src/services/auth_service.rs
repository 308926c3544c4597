use std::sync::Arc;

use mongodb::bson::oid::ObjectId;
use mongodb::bson::DateTime as BsonDateTime;

use crate::errors::{AppError, Result};
use crate::models::password_reset::PasswordReset;
use crate::models::user::{AccessClaims, Role, User};
use crate::repository::{CredentialStore, OtpStore};
use crate::services::email_service::NotificationSender;
use crate::services::otp_service::{self, OtpGate, OtpVerifier, OTP_TTL_MINUTES};
use crate::services::password_service::PasswordHasher;
use crate::services::token_service::TokenService;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub user_name: String,
    pub role: Option<Role>,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Orchestrates registration, sessions and the OTP recovery flow. All
/// durable state lives behind the store traits; this type itself is
/// stateless and shared across requests.
pub struct AuthService {
    users: Arc<dyn CredentialStore>,
    resets: Arc<dyn OtpStore>,
    mailer: Arc<dyn NotificationSender>,
    verifier: Arc<dyn OtpVerifier>,
    tokens: TokenService,
    hasher: PasswordHasher,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn CredentialStore>,
        resets: Arc<dyn OtpStore>,
        mailer: Arc<dyn NotificationSender>,
        verifier: Arc<dyn OtpVerifier>,
        tokens: TokenService,
        hasher: PasswordHasher,
    ) -> Self {
        Self {
            users,
            resets,
            mailer,
            verifier,
            tokens,
            hasher,
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    pub async fn register(&self, input: RegisterInput) -> Result<User> {
        if input.name.trim().is_empty()
            || input.email.trim().is_empty()
            || input.password.is_empty()
        {
            return Err(AppError::validation("Field Is Required"));
        }
        if input.user_name.trim().is_empty() {
            return Err(AppError::validation("Unique UserName Is Required"));
        }

        let user_name = input.user_name.trim().to_lowercase();
        if !is_valid_username(&user_name) {
            return Err(AppError::validation(
                "UserName must be 5-20 characters long and contain only \
                 lowercase letters, numbers, and underscore (_)",
            ));
        }
        if self.users.find_by_username(&user_name).await?.is_some() {
            return Err(AppError::conflict("Unique UserName Already Exists"));
        }

        let email = input.email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(AppError::validation("Invalid Email"));
        }
        if input.password != input.confirm_password {
            return Err(AppError::validation("Passwords Do Not Match"));
        }
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::conflict("Email Already In Use"));
        }

        let password_hash = self.hasher.hash(&input.password)?;
        let mut user = User::new(
            input.name.trim().to_string(),
            email,
            user_name,
            password_hash,
            input.role.unwrap_or_default(),
        );
        let id = self.users.insert(&user).await?;
        user.id = Some(id);
        Ok(user)
    }

    /// Login by email OR username, whichever was supplied. A successful
    /// login always overwrites the stored refresh token, so each account
    /// has exactly one live session.
    pub async fn login(
        &self,
        email: Option<&str>,
        user_name: Option<&str>,
        password: &str,
    ) -> Result<(User, TokenPair)> {
        // An empty or whitespace-only identifier counts as missing.
        let email = email
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_lowercase);
        let user_name = user_name
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_lowercase);

        if (email.is_none() && user_name.is_none()) || password.is_empty() {
            return Err(AppError::validation(
                "Email or Username and password are required",
            ));
        }

        let user = if let Some(email) = email {
            self.users.find_by_email(&email).await?
        } else if let Some(user_name) = user_name {
            self.users.find_by_username(&user_name).await?
        } else {
            None
        };

        let user = user.ok_or_else(|| AppError::not_found("You don't have any account"))?;

        if !self.hasher.verify(password, &user.password)? {
            return Err(AppError::authentication("Invalid credentials"));
        }

        let pair = self.issue_pair(&user)?;
        let id = user
            .id
            .ok_or_else(|| AppError::internal("User has no id"))?;
        self.users
            .set_refresh_token(&id, Some(&pair.refresh_token))
            .await?;

        Ok((user, pair))
    }

    /// Never fails outward. The stored refresh token is cleared on a
    /// best-effort basis; an undecodable token still logs the caller out.
    pub async fn logout(&self, refresh_token: Option<&str>) {
        let Some(token) = refresh_token else { return };

        let Ok(claims) = self.tokens.verify_refresh(token) else {
            tracing::debug!("Logout with undecodable refresh token");
            return;
        };
        let Ok(id) = ObjectId::parse_str(&claims.sub) else {
            return;
        };
        if let Err(e) = self.users.set_refresh_token(&id, None).await {
            tracing::warn!("Failed to clear refresh token on logout: {}", e);
        }
    }

    /// Exchanges a refresh token for a new pair. The presented token must
    /// exactly equal the stored one; rotation happens as a compare-and-swap
    /// so a superseded token loses even when two refreshes race.
    pub async fn refresh_access_token(&self, presented: &str) -> Result<(User, TokenPair)> {
        let claims = self
            .tokens
            .verify_refresh(presented)
            .map_err(|_| AppError::authentication("Invalid refresh token"))?;

        let id = ObjectId::parse_str(&claims.sub)
            .map_err(|_| AppError::authentication("Invalid refresh token"))?;

        let user = self
            .users
            .find_by_id(&id)
            .await?
            .ok_or_else(|| AppError::authentication("Invalid refresh token"))?;

        let pair = self.issue_pair(&user)?;
        let swapped = self
            .users
            .swap_refresh_token(&id, presented, &pair.refresh_token)
            .await?;
        if !swapped {
            return Err(AppError::authentication("Refresh token is expired or used"));
        }

        Ok((user, pair))
    }

    pub async fn change_password(
        &self,
        claims: &AccessClaims,
        current_password: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<()> {
        if new_password != confirm_password {
            return Err(AppError::validation("Passwords do not match"));
        }
        if new_password.len() < MIN_PASSWORD_LEN {
            return Err(AppError::validation(
                "Password must be at least 6 characters",
            ));
        }

        let id = ObjectId::parse_str(&claims.sub)?;
        let user = self
            .users
            .find_by_id(&id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;

        if !self.hasher.verify(current_password, &user.password)? {
            return Err(AppError::validation("Current password is incorrect"));
        }

        let password_hash = self.hasher.hash(new_password)?;
        self.users.set_password(&id, &password_hash).await
    }

    /// Starts (or restarts) the recovery flow for an email. The record is
    /// committed before the email goes out: a delivery failure leaves a
    /// valid OTP behind, and is reported as a delivery error, not rolled
    /// back.
    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Err(AppError::validation("Email required"));
        }

        let now = BsonDateTime::now();
        self.resets.delete_expired(now).await?;

        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;

        let record = match self.resets.find_by_email(&email).await? {
            Some(mut record) => {
                if let OtpGate::Denied(msg) = otp_service::can_resend(&record, now) {
                    return Err(AppError::rate_limited(msg));
                }
                record.resend_count += 1;
                record.last_resend_at = Some(now);
                record
            }
            None => new_reset_record(&email, now),
        };

        let otp = self.regenerate(record, now).await?;
        self.mailer.send_otp(&email, &otp, &user.name).await
    }

    /// Same regeneration semantics as forgot-password, minus the global
    /// purge. The account must already exist.
    pub async fn resend_otp(&self, email: &str) -> Result<()> {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Err(AppError::validation("Email is required"));
        }

        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;

        let now = BsonDateTime::now();
        let record = match self.resets.find_by_email(&email).await? {
            Some(mut record) => {
                if let OtpGate::Denied(msg) = otp_service::can_resend(&record, now) {
                    return Err(AppError::rate_limited(msg));
                }
                record.resend_count += 1;
                record.last_resend_at = Some(now);
                record
            }
            None => new_reset_record(&email, now),
        };

        let otp = self.regenerate(record, now).await?;
        self.mailer.send_otp(&email, &otp, &user.name).await
    }

    /// Matches the candidate against every live record and, on success,
    /// returns a purpose-tagged reset token bound to the record's email.
    pub async fn verify_otp(&self, otp: &str) -> Result<String> {
        if otp.trim().is_empty() {
            return Err(AppError::validation("OTP is required"));
        }

        let now = BsonDateTime::now();
        let matched = self
            .verifier
            .verify(otp.trim(), now)
            .await?
            .ok_or_else(|| AppError::validation("Invalid or expired OTP"))?;

        self.tokens.issue_reset_token(&matched.email)
    }

    /// Authorized solely by the reset token; the account is resolved from
    /// the token's embedded email. The confirmation email is best-effort.
    pub async fn reset_password(
        &self,
        reset_token: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<()> {
        let claims = self.tokens.verify_reset(reset_token)?;

        if new_password.is_empty() || confirm_password.is_empty() {
            return Err(AppError::validation("Password fields are required"));
        }
        if new_password != confirm_password {
            return Err(AppError::validation("Passwords do not match"));
        }
        if new_password.len() < MIN_PASSWORD_LEN {
            return Err(AppError::validation(
                "Password must be at least 6 characters",
            ));
        }

        let user = self
            .users
            .find_by_email(&claims.sub)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;
        let id = user
            .id
            .ok_or_else(|| AppError::internal("User has no id"))?;

        let password_hash = self.hasher.hash(new_password)?;
        self.users.set_password(&id, &password_hash).await?;

        if let Err(e) = self.mailer.send_reset_confirmation(&user.email, &user.name).await {
            tracing::error!("Password reset confirmation email failed: {}", e);
        }

        Ok(())
    }

    pub async fn current_user(&self, claims: &AccessClaims) -> Result<User> {
        let id = ObjectId::parse_str(&claims.sub)?;
        self.users
            .find_by_id(&id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))
    }

    fn issue_pair(&self, user: &User) -> Result<TokenPair> {
        Ok(TokenPair {
            access_token: self.tokens.issue_access_token(user)?,
            refresh_token: self.tokens.issue_refresh_token(user)?,
        })
    }

    /// Installs a freshly generated OTP on the record: new hash, new
    /// 10-minute window, attempts back to 0, verified cleared. Returns the
    /// plaintext code for delivery; only the hash is persisted.
    async fn regenerate(&self, mut record: PasswordReset, now: BsonDateTime) -> Result<String> {
        let otp = otp_service::generate_otp();
        record.hashed_otp = self.hasher.hash(&otp)?;
        record.otp_created_at = now;
        record.otp_expires_at =
            BsonDateTime::from_millis(now.timestamp_millis() + OTP_TTL_MINUTES * 60_000);
        record.attempts = 0;
        record.verified = false;
        self.resets.upsert_by_email(&record).await?;
        Ok(otp)
    }
}

fn new_reset_record(email: &str, now: BsonDateTime) -> PasswordReset {
    PasswordReset {
        id: None,
        email: email.to_string(),
        hashed_otp: String::new(),
        otp_created_at: now,
        otp_expires_at: now,
        attempts: 0,
        last_attempt_at: None,
        resend_count: 0,
        last_resend_at: None,
        verified: false,
    }
}

fn is_valid_username(user_name: &str) -> bool {
    (5..=20).contains(&user_name.len())
        && user_name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.contains(char::is_whitespace)
}
