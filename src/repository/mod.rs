pub mod password_resets;
pub mod users;

pub use password_resets::{MongoOtpStore, OtpStore};
pub use users::{CredentialStore, MongoCredentialStore};
