//! Storage abstraction for marketplace records.
//!
//! Provides the [`Storage`] trait as a port for persistence implementations,
//! along with error types, the SQLite adapter and an in-memory adapter.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{
    Inquiry, Material, Notification, PriceResponse, SalesRecord, Vendor, VendorUpdate,
};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// The record addressed by an update was not found.
    #[error("record not found: {0}")]
    NotFound(String),

    /// A record with the same id already exists.
    #[error("duplicate record: {0}")]
    Duplicate(String),

    /// A migration operation failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// Invalid data was encountered.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

/// Port for marketplace persistence.
///
/// Implementations must make [`increment_inquiry_responses`](Storage::increment_inquiry_responses)
/// atomic: several vendors may quote the same inquiry concurrently and the
/// core does no locking of its own over storage.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Persist a new inquiry.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Duplicate`] if the inquiry id is taken.
    async fn create_inquiry(&self, inquiry: &Inquiry) -> Result<(), StorageError>;

    /// Look up an inquiry by its `INQ-…` id.
    ///
    /// Returns `Ok(None)` if not found.
    async fn get_inquiry_by_id(&self, inquiry_id: &str) -> Result<Option<Inquiry>, StorageError>;

    /// Atomically add one to an inquiry's response count and mark it responded.
    ///
    /// Returns the new count.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the inquiry doesn't exist.
    async fn increment_inquiry_responses(&self, inquiry_id: &str) -> Result<u32, StorageError>;

    /// Persist a new vendor.
    async fn create_vendor(&self, vendor: &Vendor) -> Result<(), StorageError>;

    /// Apply a partial update to a vendor.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the vendor doesn't exist.
    async fn update_vendor(&self, vendor_id: &str, update: &VendorUpdate)
    -> Result<(), StorageError>;

    /// Active vendors in `city` (case-insensitive) supplying `material`,
    /// least recently alerted first.
    async fn get_vendors(&self, city: &str, material: Material)
    -> Result<Vec<Vendor>, StorageError>;

    /// Look up a vendor by Telegram chat id.
    async fn get_vendor_by_telegram_id(
        &self,
        telegram_id: &str,
    ) -> Result<Option<Vendor>, StorageError>;

    /// Persist a vendor's quote.
    async fn create_price_response(&self, response: &PriceResponse) -> Result<(), StorageError>;

    /// All quotes for an inquiry, oldest first.
    async fn list_price_responses(
        &self,
        inquiry_id: &str,
    ) -> Result<Vec<PriceResponse>, StorageError>;

    /// Append an admin notification.
    async fn create_notification(&self, notification: &Notification) -> Result<(), StorageError>;

    /// Persist a sales record.
    async fn create_sales_record(&self, record: &SalesRecord) -> Result<(), StorageError>;
}

/// Create a storage backend.
///
/// With a `database_url` this opens (and migrates) a SQLite database;
/// without one it returns an in-memory store.
///
/// # Errors
///
/// Returns [`StorageError::Database`] or [`StorageError::Migration`] if the
/// SQLite backend cannot be opened.
pub async fn create_storage(database_url: Option<&str>) -> Result<Box<dyn Storage>, StorageError> {
    match database_url {
        Some(url) => {
            tracing::info!("Opening SQLite storage");
            Ok(Box::new(SqliteStorage::new(url).await?))
        }
        None => {
            tracing::warn!("No storage.database_url configured, records are kept in memory only");
            Ok(Box::new(MemoryStorage::new()))
        }
    }
}
