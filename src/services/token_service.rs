use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{de::DeserializeOwned, Serialize};

use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::models::user::{AccessClaims, RefreshClaims, ResetClaims, User};

pub const RESET_PURPOSE: &str = "password-reset";

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Stateless issuer/verifier for the three token kinds. Each kind signs
/// with its own secret, so rotating one never invalidates the others and a
/// token of one kind can never verify as another.
///
/// Which refresh token is *currently* valid for an account is not this
/// type's concern; the auth service compares against the stored value.
pub struct TokenService {
    access: KeyPair,
    refresh: KeyPair,
    reset: KeyPair,
    access_ttl: Duration,
    refresh_ttl: Duration,
    reset_ttl: Duration,
}

impl TokenService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            access: KeyPair::from_secret(&config.access_token_secret),
            refresh: KeyPair::from_secret(&config.refresh_token_secret),
            reset: KeyPair::from_secret(&config.reset_token_secret),
            access_ttl: Duration::minutes(config.access_token_ttl_min),
            refresh_ttl: Duration::minutes(config.refresh_token_ttl_min),
            reset_ttl: Duration::minutes(config.reset_token_ttl_min),
        }
    }

    pub fn issue_access_token(&self, user: &User) -> Result<String> {
        let claims = AccessClaims {
            sub: user
                .id
                .map(|id| id.to_hex())
                .ok_or_else(|| AppError::internal("User has no id"))?,
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
            exp: expiry(self.access_ttl),
        };
        sign(&self.access, &claims)
    }

    pub fn issue_refresh_token(&self, user: &User) -> Result<String> {
        let claims = RefreshClaims {
            sub: user
                .id
                .map(|id| id.to_hex())
                .ok_or_else(|| AppError::internal("User has no id"))?,
            role: user.role.as_str().to_string(),
            jti: new_jti(),
            exp: expiry(self.refresh_ttl),
        };
        sign(&self.refresh, &claims)
    }

    /// Issued only after a successful OTP verification. Carries the email,
    /// not the id: the reset flow resolves the account by email.
    pub fn issue_reset_token(&self, email: &str) -> Result<String> {
        let claims = ResetClaims {
            sub: email.to_string(),
            purpose: RESET_PURPOSE.to_string(),
            exp: expiry(self.reset_ttl),
        };
        sign(&self.reset, &claims)
    }

    pub fn issue_access_token_for(&self, id_hex: &str, email: &str, role: &str) -> Result<String> {
        let claims = AccessClaims {
            sub: id_hex.to_string(),
            email: email.to_string(),
            role: role.to_string(),
            exp: expiry(self.access_ttl),
        };
        sign(&self.access, &claims)
    }

    pub fn issue_refresh_token_for(&self, id_hex: &str, role: &str) -> Result<String> {
        let claims = RefreshClaims {
            sub: id_hex.to_string(),
            role: role.to_string(),
            jti: new_jti(),
            exp: expiry(self.refresh_ttl),
        };
        sign(&self.refresh, &claims)
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims> {
        verify(&self.access, token)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims> {
        verify(&self.refresh, token)
    }

    pub fn verify_reset(&self, token: &str) -> Result<ResetClaims> {
        let claims: ResetClaims = verify(&self.reset, token)?;
        if claims.purpose != RESET_PURPOSE {
            return Err(AppError::authentication("Invalid token purpose"));
        }
        Ok(claims)
    }
}

fn expiry(ttl: Duration) -> usize {
    (Utc::now() + ttl).timestamp() as usize
}

fn new_jti() -> String {
    format!("{:016x}", rand::thread_rng().gen::<u64>())
}

fn sign<C: Serialize>(keys: &KeyPair, claims: &C) -> Result<String> {
    encode(&Header::default(), claims, &keys.encoding)
        .map_err(|e| AppError::internal(format!("Token generation failed: {}", e)))
}

// Expired and malformed tokens collapse into the same message so the
// response never works as a validity oracle.
fn verify<C: DeserializeOwned>(keys: &KeyPair, token: &str) -> Result<C> {
    decode::<C>(token, &keys.decoding, &Validation::new(Algorithm::HS256))
        .map(|data| data.claims)
        .map_err(|_| AppError::authentication("Invalid or expired token"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;
    use mongodb::bson::oid::ObjectId;

    fn config() -> AppConfig {
        AppConfig {
            database_url: "mongodb://localhost".to_string(),
            database_name: "test".to_string(),
            access_token_secret: "access-secret".to_string(),
            refresh_token_secret: "refresh-secret".to_string(),
            reset_token_secret: "reset-secret".to_string(),
            access_token_ttl_min: 15,
            refresh_token_ttl_min: 7 * 24 * 60,
            reset_token_ttl_min: 10,
            mail_api_url: "http://localhost".to_string(),
            mail_api_key: "key".to_string(),
            mail_from: "no-reply@test".to_string(),
            port: 3000,
            host: "0.0.0.0".to_string(),
            environment: "development".to_string(),
        }
    }

    fn user() -> User {
        let mut user = User::new(
            "Alice".to_string(),
            "a@x.com".to_string(),
            "alice1".to_string(),
            "hash".to_string(),
            Role::Influencer,
        );
        user.id = Some(ObjectId::new());
        user
    }

    #[test]
    fn access_token_roundtrip() {
        let tokens = TokenService::new(&config());
        let user = user();

        let token = tokens.issue_access_token(&user).unwrap();
        let claims = tokens.verify_access(&token).unwrap();

        assert_eq!(claims.sub, user.id.unwrap().to_hex());
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.role, "influencer");
    }

    #[test]
    fn refresh_tokens_differ_even_within_the_same_second() {
        let tokens = TokenService::new(&config());
        let user = user();

        // Back-to-back issuance shares the same whole-second exp; the jti
        // nonce must still make every token distinct, or rotation would
        // store the very string it was meant to supersede.
        let first = tokens.issue_refresh_token(&user).unwrap();
        let second = tokens.issue_refresh_token(&user).unwrap();
        assert_ne!(first, second);

        let a = tokens.verify_refresh(&first).unwrap();
        let b = tokens.verify_refresh(&second).unwrap();
        assert_eq!(a.sub, b.sub);
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn token_kinds_do_not_cross_verify() {
        let tokens = TokenService::new(&config());
        let user = user();

        let access = tokens.issue_access_token(&user).unwrap();
        let refresh = tokens.issue_refresh_token(&user).unwrap();

        assert!(tokens.verify_refresh(&access).is_err());
        assert!(tokens.verify_access(&refresh).is_err());
        assert!(tokens.verify_reset(&access).is_err());
    }

    #[test]
    fn reset_token_requires_matching_purpose() {
        let tokens = TokenService::new(&config());

        let good = tokens.issue_reset_token("a@x.com").unwrap();
        let claims = tokens.verify_reset(&good).unwrap();
        assert_eq!(claims.sub, "a@x.com");

        // Valid signature, wrong purpose: must still be rejected.
        let forged = encode(
            &Header::default(),
            &ResetClaims {
                sub: "a@x.com".to_string(),
                purpose: "email-verification".to_string(),
                exp: (Utc::now() + Duration::minutes(10)).timestamp() as usize,
            },
            &EncodingKey::from_secret(b"reset-secret"),
        )
        .unwrap();

        match tokens.verify_reset(&forged) {
            Err(AppError::Authentication(msg)) => assert_eq!(msg, "Invalid token purpose"),
            other => panic!("expected purpose rejection, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = TokenService::new(&config());

        let expired = encode(
            &Header::default(),
            &ResetClaims {
                sub: "a@x.com".to_string(),
                purpose: RESET_PURPOSE.to_string(),
                exp: (Utc::now() - Duration::minutes(5)).timestamp() as usize,
            },
            &EncodingKey::from_secret(b"reset-secret"),
        )
        .unwrap();

        assert!(tokens.verify_reset(&expired).is_err());
    }
}
