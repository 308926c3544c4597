use async_trait::async_trait;
use futures_util::TryStreamExt;
use bson::to_bson;
use mongodb::bson::{doc, DateTime as BsonDateTime};
use mongodb::{Collection, Database};

use crate::errors::{AppError, Result};
use crate::models::password_reset::PasswordReset;

/// Persistence contract for password-reset records, keyed by email with
/// upsert semantics: at most one record per email at any time.
#[async_trait]
pub trait OtpStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<PasswordReset>>;

    /// All records that are still unexpired and unverified at `now`. This is
    /// the candidate set for the verification scan.
    async fn find_all_live_unverified(&self, now: BsonDateTime) -> Result<Vec<PasswordReset>>;

    async fn upsert_by_email(&self, record: &PasswordReset) -> Result<()>;

    async fn delete_expired(&self, now: BsonDateTime) -> Result<()>;
}

#[derive(Clone)]
pub struct MongoOtpStore {
    collection: Collection<PasswordReset>,
}

impl MongoOtpStore {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("password_resets"),
        }
    }
}

#[async_trait]
impl OtpStore for MongoOtpStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<PasswordReset>> {
        Ok(self.collection.find_one(doc! { "email": email }).await?)
    }

    async fn find_all_live_unverified(&self, now: BsonDateTime) -> Result<Vec<PasswordReset>> {
        let filter = doc! {
            "otpExpiresAt": { "$gt": now },
            "verified": false,
        };
        let cursor = self.collection.find(filter).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn upsert_by_email(&self, record: &PasswordReset) -> Result<()> {
        let bson = to_bson(record)
            .map_err(|e| AppError::internal(format!("BSON conversion failed: {}", e)))?;
        let mut doc = bson
            .as_document()
            .ok_or_else(|| AppError::internal("PasswordReset did not serialize to a document"))?
            .clone();
        // _id is immutable under $set; the email filter already pins the record.
        doc.remove("_id");

        self.collection
            .update_one(doc! { "email": &record.email }, doc! { "$set": doc })
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn delete_expired(&self, now: BsonDateTime) -> Result<()> {
        self.collection
            .delete_many(doc! { "otpExpiresAt": { "$lt": now } })
            .await?;
        Ok(())
    }
}
