use async_trait::async_trait;
use chrono::Utc;
use mongodb::bson::{doc, oid::ObjectId, DateTime as BsonDateTime};
use mongodb::{Collection, Database};

use crate::errors::Result;
use crate::models::user::User;

/// Persistence contract for user accounts. Every method is atomic per
/// record; the Mongo implementation relies on single-document updates.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_by_username(&self, user_name: &str) -> Result<Option<User>>;
    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<User>>;
    async fn insert(&self, user: &User) -> Result<ObjectId>;

    /// Unconditionally set (or clear) the stored refresh token. Used by
    /// login (a fresh session always wins) and logout.
    async fn set_refresh_token(&self, id: &ObjectId, token: Option<&str>) -> Result<()>;

    /// Compare-and-swap rotation: the new token is stored only if the
    /// currently stored one equals `current`. Returns false when the
    /// presented token was already superseded, which is what makes refresh
    /// tokens single-use.
    async fn swap_refresh_token(&self, id: &ObjectId, current: &str, next: &str) -> Result<bool>;

    async fn set_password(&self, id: &ObjectId, password_hash: &str) -> Result<()>;
}

#[derive(Clone)]
pub struct MongoCredentialStore {
    collection: Collection<User>,
}

impl MongoCredentialStore {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("users"),
        }
    }

    fn now_bson() -> BsonDateTime {
        BsonDateTime::from_millis(Utc::now().timestamp_millis())
    }
}

#[async_trait]
impl CredentialStore for MongoCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.collection.find_one(doc! { "email": email }).await?)
    }

    async fn find_by_username(&self, user_name: &str) -> Result<Option<User>> {
        Ok(self
            .collection
            .find_one(doc! { "userName": user_name })
            .await?)
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<User>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    async fn insert(&self, user: &User) -> Result<ObjectId> {
        let result = self.collection.insert_one(user).await?;
        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| crate::errors::AppError::internal("Insert returned no ObjectId"))
    }

    async fn set_refresh_token(&self, id: &ObjectId, token: Option<&str>) -> Result<()> {
        let update = match token {
            Some(t) => doc! {
                "$set": { "refreshToken": t, "updatedAt": Self::now_bson() }
            },
            None => doc! {
                "$unset": { "refreshToken": "" },
                "$set": { "updatedAt": Self::now_bson() }
            },
        };
        self.collection.update_one(doc! { "_id": id }, update).await?;
        Ok(())
    }

    async fn swap_refresh_token(&self, id: &ObjectId, current: &str, next: &str) -> Result<bool> {
        let filter = doc! { "_id": id, "refreshToken": current };
        let update = doc! {
            "$set": { "refreshToken": next, "updatedAt": Self::now_bson() }
        };
        let result = self.collection.update_one(filter, update).await?;
        Ok(result.matched_count > 0)
    }

    async fn set_password(&self, id: &ObjectId, password_hash: &str) -> Result<()> {
        let update = doc! {
            "$set": { "password": password_hash, "updatedAt": Self::now_bson() }
        };
        self.collection.update_one(doc! { "_id": id }, update).await?;
        Ok(())
    }
}
