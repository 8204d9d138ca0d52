//! SQLite storage implementation.
//!
//! Provides [`SqliteStorage`] as the persistent backend for marketplace records.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use uuid::Uuid;

use crate::identity::Platform;
use crate::model::{
    Inquiry, InquiryStatus, Material, MaterialChoice, Notification, PriceResponse, SalesRecord,
    Vendor, VendorUpdate,
};
use crate::storage::{Storage, StorageError};


/// SQLite-based marketplace storage.
///
/// Uses connection pooling and WAL mode for performance.
/// Runs migrations automatically on startup.
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Create a new SqliteStorage from a database URL.
    ///
    /// The URL should be in the format `sqlite:path/to/database.db`.
    /// Runs migrations automatically and enables WAL mode.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] if connection fails.
    /// Returns [`StorageError::Migration`] if migrations fail.
    pub async fn new(database_url: &str) -> Result<Self, StorageError> {
        let url = database_url.strip_prefix("sqlite:").unwrap_or(database_url);

        let path = PathBuf::from(url);
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Database(format!("failed to create database directory: {}", e))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(url)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Run database migrations.
    async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::Migration(e.to_string()))
    }

    /// Fixed-width RFC 3339 so stored timestamps sort lexically.
    fn timestamp(at: DateTime<Utc>) -> String {
        at.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, StorageError> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StorageError::InvalidData(format!("invalid datetime: {}", e)))
    }

    fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, StorageError> {
        serde_json::to_string(value).map_err(|e| StorageError::InvalidData(e.to_string()))
    }

    fn from_json<T: DeserializeOwned>(s: &str) -> Result<T, StorageError> {
        serde_json::from_str(s).map_err(|e| StorageError::InvalidData(e.to_string()))
    }

    fn parse_material_choice(s: &str) -> Result<MaterialChoice, StorageError> {
        MaterialChoice::parse(s)
            .ok_or_else(|| StorageError::InvalidData(format!("unknown material: {}", s)))
    }

    /// Map a write error, turning primary-key collisions into `Duplicate`.
    fn write_error(e: sqlx::Error, id: &str) -> StorageError {
        match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StorageError::Duplicate(id.to_string())
            }
            other => StorageError::Database(other.to_string()),
        }
    }

    fn row_to_inquiry(row: &SqliteRow) -> Result<Inquiry, StorageError> {
        let material: String = row.get("material");
        let details: String = row.get("details");
        let vendors_contacted: String = row.get("vendors_contacted");
        let status: String = row.get("status");
        let platform: String = row.get("platform");
        let created_at: String = row.get("created_at");
        let response_count: i64 = row.get("response_count");

        Ok(Inquiry {
            inquiry_id: row.get("inquiry_id"),
            user_name: row.get("user_name"),
            user_contact: row.get("user_contact"),
            buyer_phone: row.get("buyer_phone"),
            city: row.get("city"),
            locality: row.get("locality"),
            material: Self::parse_material_choice(&material)?,
            details: Self::from_json(&details)?,
            quantity: row.get("quantity"),
            brand: row.get("brand"),
            vendors_contacted: Self::from_json(&vendors_contacted)?,
            response_count: response_count as u32,
            status: InquiryStatus::parse(&status)
                .ok_or_else(|| StorageError::InvalidData(format!("unknown status: {}", status)))?,
            platform: Platform::parse(&platform).ok_or_else(|| {
                StorageError::InvalidData(format!("unknown platform: {}", platform))
            })?,
            created_at: Self::parse_timestamp(&created_at)?,
        })
    }

    fn row_to_vendor(row: &SqliteRow) -> Result<Vendor, StorageError> {
        let materials: String = row.get("materials");
        let is_active: i64 = row.get("is_active");
        let last_quoted: Option<String> = row.get("last_quoted");
        let created_at: String = row.get("created_at");

        Ok(Vendor {
            vendor_id: row.get("vendor_id"),
            name: row.get("name"),
            phone: row.get("phone"),
            city: row.get("city"),
            materials: Self::from_json(&materials)?,
            telegram_id: row.get("telegram_id"),
            is_active: is_active != 0,
            last_quoted: last_quoted
                .as_deref()
                .map(Self::parse_timestamp)
                .transpose()?,
            created_at: Self::parse_timestamp(&created_at)?,
        })
    }

    fn row_to_price_response(row: &SqliteRow) -> Result<PriceResponse, StorageError> {
        let id: String = row.get("id");
        let material: String = row.get("material");
        let created_at: String = row.get("created_at");

        Ok(PriceResponse {
            id: Uuid::parse_str(&id)
                .map_err(|e| StorageError::InvalidData(format!("invalid UUID: {}", e)))?,
            vendor_id: row.get("vendor_id"),
            inquiry_id: row.get("inquiry_id"),
            material: Self::parse_material_choice(&material)?,
            price: row.get("price"),
            gst: row.get("gst"),
            delivery_charge: row.get("delivery_charge"),
            created_at: Self::parse_timestamp(&created_at)?,
        })
    }
}

const VENDOR_COLUMNS: &str =
    "vendor_id, name, phone, city, materials, telegram_id, is_active, last_quoted, created_at";

#[async_trait]
impl Storage for SqliteStorage {
    async fn create_inquiry(&self, inquiry: &Inquiry) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO inquiries (
                inquiry_id, user_name, user_contact, buyer_phone, city, locality, material,
                details, quantity, brand, vendors_contacted, response_count, status, platform,
                created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&inquiry.inquiry_id)
        .bind(&inquiry.user_name)
        .bind(&inquiry.user_contact)
        .bind(&inquiry.buyer_phone)
        .bind(&inquiry.city)
        .bind(&inquiry.locality)
        .bind(inquiry.material.as_str())
        .bind(Self::to_json(&inquiry.details)?)
        .bind(&inquiry.quantity)
        .bind(&inquiry.brand)
        .bind(Self::to_json(&inquiry.vendors_contacted)?)
        .bind(inquiry.response_count as i64)
        .bind(inquiry.status.as_str())
        .bind(inquiry.platform.as_str())
        .bind(Self::timestamp(inquiry.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| Self::write_error(e, &inquiry.inquiry_id))?;

        Ok(())
    }

    async fn get_inquiry_by_id(&self, inquiry_id: &str) -> Result<Option<Inquiry>, StorageError> {
        let row = sqlx::query(
            r#"
            SELECT inquiry_id, user_name, user_contact, buyer_phone, city, locality, material,
                   details, quantity, brand, vendors_contacted, response_count, status,
                   platform, created_at
            FROM inquiries
            WHERE inquiry_id = ?
            "#,
        )
        .bind(inquiry_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;

        row.as_ref().map(Self::row_to_inquiry).transpose()
    }

    async fn increment_inquiry_responses(&self, inquiry_id: &str) -> Result<u32, StorageError> {
        let row = sqlx::query(
            r#"
            UPDATE inquiries
            SET response_count = response_count + 1, status = ?
            WHERE inquiry_id = ?
            RETURNING response_count
            "#,
        )
        .bind(InquiryStatus::Responded.as_str())
        .bind(inquiry_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;

        match row {
            Some(row) => {
                let count: i64 = row.get("response_count");
                Ok(count as u32)
            }
            None => Err(StorageError::NotFound(inquiry_id.to_string())),
        }
    }

    async fn create_vendor(&self, vendor: &Vendor) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO vendors (
                vendor_id, name, phone, city, materials, telegram_id, is_active, last_quoted,
                created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&vendor.vendor_id)
        .bind(&vendor.name)
        .bind(&vendor.phone)
        .bind(&vendor.city)
        .bind(Self::to_json(&vendor.materials)?)
        .bind(&vendor.telegram_id)
        .bind(vendor.is_active as i64)
        .bind(vendor.last_quoted.map(Self::timestamp))
        .bind(Self::timestamp(vendor.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| Self::write_error(e, &vendor.vendor_id))?;

        Ok(())
    }

    async fn update_vendor(
        &self,
        vendor_id: &str,
        update: &VendorUpdate,
    ) -> Result<(), StorageError> {
        let result = sqlx::query(
            r#"
            UPDATE vendors
            SET last_quoted = COALESCE(?, last_quoted),
                is_active = COALESCE(?, is_active),
                telegram_id = COALESCE(?, telegram_id)
            WHERE vendor_id = ?
            "#,
        )
        .bind(update.last_quoted.map(Self::timestamp))
        .bind(update.is_active.map(|a| a as i64))
        .bind(&update.telegram_id)
        .bind(vendor_id)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(vendor_id.to_string()));
        }

        Ok(())
    }

    async fn get_vendors(
        &self,
        city: &str,
        material: Material,
    ) -> Result<Vec<Vendor>, StorageError> {
        let query = format!(
            r#"
            SELECT {VENDOR_COLUMNS}
            FROM vendors
            WHERE city = ? COLLATE NOCASE AND is_active = 1
            ORDER BY last_quoted IS NOT NULL, last_quoted ASC, created_at ASC
            "#
        );
        let rows = sqlx::query(&query)
            .bind(city.trim())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;

        let mut vendors = Vec::new();
        for row in &rows {
            let vendor = Self::row_to_vendor(row)?;
            if vendor.supplies(material) {
                vendors.push(vendor);
            }
        }

        Ok(vendors)
    }

    async fn get_vendor_by_telegram_id(
        &self,
        telegram_id: &str,
    ) -> Result<Option<Vendor>, StorageError> {
        let query = format!(
            "SELECT {VENDOR_COLUMNS} FROM vendors WHERE telegram_id = ? ORDER BY created_at ASC LIMIT 1"
        );
        let row = sqlx::query(&query)
            .bind(telegram_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;

        row.as_ref().map(Self::row_to_vendor).transpose()
    }

    async fn create_price_response(&self, response: &PriceResponse) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO price_responses (
                id, vendor_id, inquiry_id, material, price, gst, delivery_charge, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(response.id.to_string())
        .bind(&response.vendor_id)
        .bind(&response.inquiry_id)
        .bind(response.material.as_str())
        .bind(&response.price)
        .bind(&response.gst)
        .bind(&response.delivery_charge)
        .bind(Self::timestamp(response.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| Self::write_error(e, &response.id.to_string()))?;

        Ok(())
    }

    async fn list_price_responses(
        &self,
        inquiry_id: &str,
    ) -> Result<Vec<PriceResponse>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT id, vendor_id, inquiry_id, material, price, gst, delivery_charge, created_at
            FROM price_responses
            WHERE inquiry_id = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(inquiry_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;

        rows.iter().map(Self::row_to_price_response).collect()
    }

    async fn create_notification(&self, notification: &Notification) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, kind, message, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(notification.id.to_string())
        .bind(notification.kind.as_str())
        .bind(&notification.message)
        .bind(Self::timestamp(notification.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(())
    }

    async fn create_sales_record(&self, record: &SalesRecord) -> Result<(), StorageError> {
        let entry = &record.entry;
        let cement = entry.cement.as_ref().map(Self::to_json).transpose()?;
        let tmt = entry.tmt.as_ref().map(Self::to_json).transpose()?;

        sqlx::query(
            r#"
            INSERT INTO sales_records (
                id, recorded_by, sales_type, cement, tmt, project_owner, project_name,
                project_rera_id, completion_years, contact_number, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(&record.recorded_by)
        .bind(entry.sales_type.as_str())
        .bind(cement)
        .bind(tmt)
        .bind(&entry.project_owner)
        .bind(&entry.project_name)
        .bind(&entry.project_rera_id)
        .bind(entry.completion_years as i64)
        .bind(&entry.contact_number)
        .bind(Self::timestamp(record.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(())
    }
}
