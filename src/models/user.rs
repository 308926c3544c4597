use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{self, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    Influencer,
}

impl Default for Role {
    fn default() -> Self {
        Role::Influencer
    }
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Host => "host",
            Role::Influencer => "influencer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// An end-user account. Documents live in the `users` collection with
/// camelCase field names. Email and username are stored normalized
/// (trimmed, lowercased) and are unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    pub user_name: String,
    /// bcrypt digest, never the plaintext.
    pub password: String,
    #[serde(default)]
    pub role: Role,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<BsonDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about_me: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// The single active refresh token; rotation overwrites it, which is
    /// what invalidates a superseded token even before its expiry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: String, email: String, user_name: String, password: String, role: Role) -> Self {
        let now = Utc::now();
        User {
            id: None,
            name,
            email,
            user_name,
            password,
            role,
            phone: None,
            country: None,
            state: None,
            city: None,
            zip_code: None,
            full_address: None,
            date_of_birth: None,
            gender: None,
            about_me: None,
            image: None,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// JWT claims for access tokens.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccessClaims {
    pub sub: String,
    pub email: String,
    pub role: String,
    pub exp: usize,
}

/// JWT claims for refresh tokens. `jti` is a random nonce: `exp` has
/// whole-second granularity, so without it two tokens issued back-to-back
/// would serialize identically and rotation would store an unchanged
/// string, leaving the superseded token alive.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshClaims {
    pub sub: String,
    pub role: String,
    pub jti: String,
    pub exp: usize,
}

/// JWT claims for password-reset tokens. `sub` carries the account email
/// (not the id): the reset flow never learns the account id.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ResetClaims {
    pub sub: String,
    pub purpose: String,
    pub exp: usize,
}
