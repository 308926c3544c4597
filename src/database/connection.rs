use mongodb::{Client, Database};

use crate::errors::Result;

pub async fn get_db_client(database_url: &str, database_name: &str) -> Result<Database> {
    let client = Client::with_uri_str(database_url).await?;
    let db = client.database(database_name);

    match db.list_collection_names().await {
        Ok(collections) => {
            tracing::info!("Connected to database: {}", database_name);
            tracing::debug!("Collections found: {:?}", collections);
        }
        Err(e) => {
            tracing::warn!(
                "Database '{}' may not exist or is inaccessible: {}",
                database_name,
                e
            );
        }
    }

    Ok(db)
}
