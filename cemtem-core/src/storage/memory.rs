//! In-memory storage implementation.
//!
//! Used when no database is configured and as the storage double in tests.
//! All mutations happen under one write lock, which makes the response
//! counter increment atomic.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::model::{
    Inquiry, InquiryStatus, Material, Notification, PriceResponse, SalesRecord, Vendor,
    VendorUpdate,
};
use crate::storage::{Storage, StorageError};

#[derive(Debug, Default)]
struct Inner {
    inquiries: HashMap<String, Inquiry>,
    vendors: Vec<Vendor>,
    price_responses: Vec<PriceResponse>,
    notifications: Vec<Notification>,
    sales_records: Vec<SalesRecord>,
}

/// Process-local storage backed by hash maps and vectors.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: RwLock<Inner>,
}

impl MemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all vendors in registration order.
    pub async fn vendors(&self) -> Vec<Vendor> {
        self.inner.read().await.vendors.clone()
    }

    /// Snapshot of all inquiries, unordered.
    pub async fn inquiries(&self) -> Vec<Inquiry> {
        self.inner.read().await.inquiries.values().cloned().collect()
    }

    /// Snapshot of all notifications in creation order.
    pub async fn notifications(&self) -> Vec<Notification> {
        self.inner.read().await.notifications.clone()
    }

    /// Snapshot of all sales records in creation order.
    pub async fn sales_records(&self) -> Vec<SalesRecord> {
        self.inner.read().await.sales_records.clone()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn create_inquiry(&self, inquiry: &Inquiry) -> Result<(), StorageError> {
        let mut inner = self.inner.write().await;
        if inner.inquiries.contains_key(&inquiry.inquiry_id) {
            return Err(StorageError::Duplicate(inquiry.inquiry_id.clone()));
        }
        inner
            .inquiries
            .insert(inquiry.inquiry_id.clone(), inquiry.clone());
        Ok(())
    }

    async fn get_inquiry_by_id(&self, inquiry_id: &str) -> Result<Option<Inquiry>, StorageError> {
        Ok(self.inner.read().await.inquiries.get(inquiry_id).cloned())
    }

    async fn increment_inquiry_responses(&self, inquiry_id: &str) -> Result<u32, StorageError> {
        let mut inner = self.inner.write().await;
        let inquiry = inner
            .inquiries
            .get_mut(inquiry_id)
            .ok_or_else(|| StorageError::NotFound(inquiry_id.to_string()))?;
        inquiry.response_count += 1;
        inquiry.status = InquiryStatus::Responded;
        Ok(inquiry.response_count)
    }

    async fn create_vendor(&self, vendor: &Vendor) -> Result<(), StorageError> {
        let mut inner = self.inner.write().await;
        if inner.vendors.iter().any(|v| v.vendor_id == vendor.vendor_id) {
            return Err(StorageError::Duplicate(vendor.vendor_id.clone()));
        }
        inner.vendors.push(vendor.clone());
        Ok(())
    }

    async fn update_vendor(
        &self,
        vendor_id: &str,
        update: &VendorUpdate,
    ) -> Result<(), StorageError> {
        let mut inner = self.inner.write().await;
        let vendor = inner
            .vendors
            .iter_mut()
            .find(|v| v.vendor_id == vendor_id)
            .ok_or_else(|| StorageError::NotFound(vendor_id.to_string()))?;
        if let Some(last_quoted) = update.last_quoted {
            vendor.last_quoted = Some(last_quoted);
        }
        if let Some(is_active) = update.is_active {
            vendor.is_active = is_active;
        }
        if let Some(ref telegram_id) = update.telegram_id {
            vendor.telegram_id = Some(telegram_id.clone());
        }
        Ok(())
    }

    async fn get_vendors(
        &self,
        city: &str,
        material: Material,
    ) -> Result<Vec<Vendor>, StorageError> {
        let inner = self.inner.read().await;
        let mut matches: Vec<Vendor> = inner
            .vendors
            .iter()
            .filter(|v| v.is_active && v.city.eq_ignore_ascii_case(city.trim()) && v.supplies(material))
            .cloned()
            .collect();
        matches.sort_by_key(|v| (v.last_quoted, v.created_at));
        Ok(matches)
    }

    async fn get_vendor_by_telegram_id(
        &self,
        telegram_id: &str,
    ) -> Result<Option<Vendor>, StorageError> {
        Ok(self
            .inner
            .read()
            .await
            .vendors
            .iter()
            .find(|v| v.telegram_id.as_deref() == Some(telegram_id))
            .cloned())
    }

    async fn create_price_response(&self, response: &PriceResponse) -> Result<(), StorageError> {
        self.inner
            .write()
            .await
            .price_responses
            .push(response.clone());
        Ok(())
    }

    async fn list_price_responses(
        &self,
        inquiry_id: &str,
    ) -> Result<Vec<PriceResponse>, StorageError> {
        Ok(self
            .inner
            .read()
            .await
            .price_responses
            .iter()
            .filter(|r| r.inquiry_id == inquiry_id)
            .cloned()
            .collect())
    }

    async fn create_notification(&self, notification: &Notification) -> Result<(), StorageError> {
        self.inner
            .write()
            .await
            .notifications
            .push(notification.clone());
        Ok(())
    }

    async fn create_sales_record(&self, record: &SalesRecord) -> Result<(), StorageError> {
        self.inner.write().await.sales_records.push(record.clone());
        Ok(())
    }
}
