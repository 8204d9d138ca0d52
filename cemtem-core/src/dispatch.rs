//! Completion-action handling.
//!
//! The [`Dispatcher`] turns the flow engine's [`Action`]s and vendor quotes
//! into storage writes and notifications: inquiry alerts fan out to matching
//! vendors, compiled quotes go back to the buyer on whichever platform the
//! inquiry came from.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::config::DispatchConfig;
use crate::flow::Action;
use crate::identity::{Identity, Platform};
use crate::model::{
    Inquiry, InquiryRequest, InquiryStatus, Material, MaterialChoice, Notification,
    NotificationKind, PriceResponse, SalesEntry, SalesRecord, Vendor, VendorRegistration,
    VendorUpdate,
};
use crate::outbound::Outbound;
use crate::rates::{RateQuote, rate_callback_data};
use crate::reply::Reply;
use crate::storage::{Storage, StorageError};

#[cfg(test)]
mod tests;

/// Sent when a completion action could not be saved.
pub const SAVE_FAILED: &str =
    "Sorry, we couldn't save your details right now. Please type /start to try again.";

/// Errors from completion actions.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Persisting the entity failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Errors from recording a vendor quote.
#[derive(Debug, Error)]
pub enum QuoteError {
    /// No active vendor is registered for this chat.
    #[error("no vendor registered for chat {0}")]
    UnknownVendor(String),

    /// The quoted inquiry doesn't exist.
    #[error("inquiry not found: {0}")]
    UnknownInquiry(String),

    /// Persisting the quote failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Monotonic millisecond ids (`INQ-…`, `VEN-…`).
///
/// Two ids requested within the same millisecond get consecutive values.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: AtomicI64,
}

impl IdGenerator {
    /// Create a generator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Next value: the current time in milliseconds, or one past the previous
    /// value if the clock hasn't moved.
    pub fn next_millis(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let prev = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |prev| {
                Some(now.max(prev + 1))
            })
            .unwrap_or_else(|prev| prev);
        now.max(prev + 1)
    }

    /// A new inquiry id.
    pub fn inquiry_id(&self) -> String {
        format!("INQ-{}", self.next_millis())
    }

    /// A new vendor id.
    pub fn vendor_id(&self) -> String {
        format!("VEN-{}", self.next_millis())
    }
}

/// Executes completion actions and records quotes.
pub struct Dispatcher {
    storage: Arc<dyn Storage>,
    outbound: Outbound,
    ids: IdGenerator,
    config: DispatchConfig,
}

impl Dispatcher {
    /// Create a dispatcher.
    pub fn new(storage: Arc<dyn Storage>, outbound: Outbound, config: DispatchConfig) -> Self {
        Self {
            storage,
            outbound,
            ids: IdGenerator::new(),
            config,
        }
    }

    /// Execute `action` on behalf of `requester`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] if the entity could not be persisted.
    /// Alert and notification failures are logged only.
    pub async fn execute(
        &self,
        requester: &Identity,
        display_name: Option<&str>,
        action: Action,
    ) -> Result<(), DispatchError> {
        match action {
            Action::CreateInquiry(request) => {
                self.create_inquiry(requester, display_name, request).await?;
            }
            Action::RegisterVendor(registration) => {
                self.register_vendor(requester, registration).await?;
            }
            Action::CreateSalesRecord(entry) => {
                self.create_sales_record(requester, entry).await?;
            }
        }
        Ok(())
    }

    /// Persist an inquiry and alert up to `max_vendors_per_material` vendors
    /// per material round.
    pub async fn create_inquiry(
        &self,
        requester: &Identity,
        display_name: Option<&str>,
        request: InquiryRequest,
    ) -> Result<Inquiry, DispatchError> {
        let inquiry_id = self.ids.inquiry_id();

        // Vendors in first-seen order, each with the rounds it matched.
        let mut matched: Vec<(Vendor, Vec<Material>)> = Vec::new();
        for material in request.material.materials() {
            let vendors = self.storage.get_vendors(&request.city, material).await?;
            for vendor in vendors.into_iter().take(self.config.max_vendors_per_material) {
                match matched.iter_mut().find(|(v, _)| v.vendor_id == vendor.vendor_id) {
                    Some((_, rounds)) => rounds.push(material),
                    None => matched.push((vendor, vec![material])),
                }
            }
        }

        let user_name = display_name.map(str::to_string).unwrap_or_else(|| {
            match requester.platform {
                Platform::Telegram => "Telegram User",
                Platform::Web => "Web User",
            }
            .to_string()
        });
        let inquiry = Inquiry {
            inquiry_id: inquiry_id.clone(),
            user_name,
            user_contact: requester.id.clone(),
            buyer_phone: request.phone,
            city: request.city,
            locality: request.locality,
            material: request.material,
            brand: request.details.brand(),
            details: request.details,
            quantity: request.quantity,
            vendors_contacted: matched.iter().map(|(v, _)| v.vendor_id.clone()).collect(),
            response_count: 0,
            status: InquiryStatus::Pending,
            platform: requester.platform,
            created_at: Utc::now(),
        };
        self.storage.create_inquiry(&inquiry).await?;
        tracing::info!(
            inquiry_id = %inquiry.inquiry_id,
            material = inquiry.material.as_str(),
            vendors = matched.len(),
            "inquiry created"
        );

        if matched.is_empty() {
            tracing::info!(
                inquiry_id = %inquiry.inquiry_id,
                city = %inquiry.city,
                "no vendors matched inquiry"
            );
        }

        let now = Utc::now();
        for (vendor, rounds) in &matched {
            if let Some(telegram_id) = &vendor.telegram_id {
                let alert = vendor_alert(&inquiry, vendor, rounds);
                if let Err(e) = self
                    .outbound
                    .send(&Identity::telegram(telegram_id), &alert)
                    .await
                {
                    tracing::warn!(vendor_id = %vendor.vendor_id, error = %e, "vendor alert failed");
                }
            }
            let stamp = VendorUpdate {
                last_quoted: Some(now),
                ..VendorUpdate::default()
            };
            if let Err(e) = self.storage.update_vendor(&vendor.vendor_id, &stamp).await {
                tracing::warn!(vendor_id = %vendor.vendor_id, error = %e, "failed to stamp last_quoted");
            }
        }

        self.notify(
            NotificationKind::InquiryCreated,
            format!(
                "New inquiry {} for {} in {} ({} vendors contacted)",
                inquiry.inquiry_id,
                inquiry.material.label(),
                inquiry.city,
                matched.len()
            ),
        )
        .await;

        Ok(inquiry)
    }

    /// Persist a vendor. A Telegram requester becomes the vendor's alert
    /// address.
    pub async fn register_vendor(
        &self,
        requester: &Identity,
        registration: VendorRegistration,
    ) -> Result<Vendor, DispatchError> {
        let vendor = Vendor {
            vendor_id: self.ids.vendor_id(),
            name: registration.company_name,
            phone: registration.phone,
            city: registration.city,
            materials: registration.materials,
            telegram_id: (requester.platform == Platform::Telegram).then(|| requester.id.clone()),
            is_active: true,
            last_quoted: None,
            created_at: Utc::now(),
        };
        self.storage.create_vendor(&vendor).await?;
        tracing::info!(vendor_id = %vendor.vendor_id, city = %vendor.city, "vendor registered");

        self.notify(
            NotificationKind::VendorRegistered,
            format!("New vendor registered: {} ({})", vendor.name, vendor.city),
        )
        .await;

        Ok(vendor)
    }

    /// Persist a sales record.
    pub async fn create_sales_record(
        &self,
        requester: &Identity,
        entry: SalesEntry,
    ) -> Result<SalesRecord, DispatchError> {
        let record = SalesRecord {
            id: Uuid::now_v7(),
            recorded_by: requester.to_string(),
            entry,
            created_at: Utc::now(),
        };
        self.storage.create_sales_record(&record).await?;
        tracing::info!(id = %record.id, sales_type = record.entry.sales_type.as_str(), "sales record created");
        Ok(record)
    }

    /// Record a quote from the vendor chatting as `vendor_chat` and forward it
    /// to the buyer.
    ///
    /// Returns the confirmation for the vendor.
    ///
    /// # Errors
    ///
    /// Returns [`QuoteError::UnknownVendor`] / [`QuoteError::UnknownInquiry`]
    /// when either side can't be resolved, or [`QuoteError::Storage`].
    pub async fn record_quote(
        &self,
        vendor_chat: &Identity,
        quote: &RateQuote,
    ) -> Result<Reply, QuoteError> {
        // Vendors are keyed by Telegram chat; other platforms can't quote.
        if vendor_chat.platform != Platform::Telegram {
            return Err(QuoteError::UnknownVendor(vendor_chat.to_string()));
        }
        let vendor = self
            .storage
            .get_vendor_by_telegram_id(&vendor_chat.id)
            .await?
            .ok_or_else(|| QuoteError::UnknownVendor(vendor_chat.id.clone()))?;
        let inquiry = self
            .storage
            .get_inquiry_by_id(&quote.inquiry_id)
            .await?
            .ok_or_else(|| QuoteError::UnknownInquiry(quote.inquiry_id.clone()))?;

        let supplied: Vec<Material> = inquiry
            .material
            .materials()
            .into_iter()
            .filter(|m| vendor.supplies(*m))
            .collect();
        let response = PriceResponse {
            id: Uuid::now_v7(),
            vendor_id: vendor.vendor_id.clone(),
            inquiry_id: inquiry.inquiry_id.clone(),
            material: MaterialChoice::from_materials(&supplied).unwrap_or(inquiry.material),
            price: quote.rate.clone(),
            gst: quote.gst.clone(),
            delivery_charge: quote.delivery.clone(),
            created_at: Utc::now(),
        };
        self.storage.create_price_response(&response).await?;
        let count = self
            .storage
            .increment_inquiry_responses(&inquiry.inquiry_id)
            .await?;
        tracing::info!(
            inquiry_id = %inquiry.inquiry_id,
            vendor_id = %vendor.vendor_id,
            responses = count,
            "vendor quote recorded"
        );

        self.notify(
            NotificationKind::VendorQuoteReceived,
            format!(
                "Vendor quote received: {} from {} (Inquiry #{})",
                quote.rate_display(),
                vendor.name,
                inquiry.inquiry_id
            ),
        )
        .await;

        let buyer = Identity {
            platform: inquiry.platform,
            id: inquiry.user_contact.clone(),
        };
        let compiled = buyer_quote(&inquiry, &vendor, &response, quote, count);
        if let Err(e) = self.outbound.send(&buyer, &compiled).await {
            tracing::warn!(inquiry_id = %inquiry.inquiry_id, error = %e, "quote delivery to buyer failed");
        }

        Ok(vendor_confirmation(quote))
    }

    /// [`record_quote`](Self::record_quote) with errors turned into the
    /// vendor-facing reply, or `None` when the configured policy is to stay
    /// silent.
    pub async fn submit_quote(&self, vendor_chat: &Identity, quote: &RateQuote) -> Option<Reply> {
        match self.record_quote(vendor_chat, quote).await {
            Ok(reply) => Some(reply),
            Err(QuoteError::Storage(e)) => {
                tracing::error!(inquiry_id = %quote.inquiry_id, error = %e, "failed to record quote");
                Some(Reply::text(
                    "Sorry, we couldn't record your quote right now. Please try again.",
                ))
            }
            Err(e) => {
                tracing::warn!(chat = %vendor_chat, error = %e, "quote target not found");
                self.config
                    .notify_missing_quote_target
                    .then(|| Reply::text(missing_target_text(&e, quote)))
            }
        }
    }

    async fn notify(&self, kind: NotificationKind, message: String) {
        let notification = Notification::new(kind, message);
        if let Err(e) = self.storage.create_notification(&notification).await {
            tracing::warn!(kind = kind.as_str(), error = %e, "failed to create notification");
        }
    }
}

fn missing_target_text(error: &QuoteError, quote: &RateQuote) -> String {
    match error {
        QuoteError::UnknownVendor(_) => "We couldn't find a vendor registration for this chat. \
             Type /start and choose \"Register As A Vendor\" to start receiving inquiries."
            .to_string(),
        _ => format!(
            "We couldn't find inquiry {}. Please check the Inquiry ID and send your quote again.",
            quote.inquiry_id
        ),
    }
}

/// Alert sent to one vendor. `rounds` are the materials the vendor was
/// matched for.
pub fn vendor_alert(inquiry: &Inquiry, vendor: &Vendor, rounds: &[Material]) -> Reply {
    let material = MaterialChoice::from_materials(rounds).unwrap_or(inquiry.material);
    let place = match &inquiry.locality {
        Some(locality) => format!("{}, {}", locality, inquiry.city),
        None => inquiry.city.clone(),
    };
    let mut details = String::new();
    if material.includes(Material::Cement) && !inquiry.details.cement_types.is_empty() {
        details.push_str(&format!("\n- Cement types: {}", inquiry.details.cement_types.join(", ")));
    }
    if material.includes(Material::Tmt) && !inquiry.details.tmt_sizes.is_empty() {
        details.push_str(&format!("\n- TMT sizes: {}", inquiry.details.tmt_sizes.join(", ")));
    }

    let text = format!(
        "🔔 New Price Inquiry\n\nHi {},\n\nNew inquiry:\n- Material: {}\n- City: {}\n- Quantity: {}\n- Brand: {}{}\n\n\
         Please provide your best rate.\n\nReply with:\nRATE: [Price] per [Unit]\nGST: [Percentage]%\nDELIVERY: [Charges]\n\n\
         Inquiry ID: {}",
        vendor.name,
        material.label(),
        place,
        inquiry.quantity,
        inquiry.brand.as_deref().unwrap_or("Any"),
        details,
        inquiry.inquiry_id
    );
    Reply::text(text).with_button("💰 Enter rate", rate_callback_data(&inquiry.inquiry_id))
}

/// Compiled quote sent to the buyer.
pub fn buyer_quote(
    inquiry: &Inquiry,
    vendor: &Vendor,
    response: &PriceResponse,
    quote: &RateQuote,
    count: u32,
) -> Reply {
    Reply::text(format!(
        "💰 New quote for your inquiry {}\n\n🏢 Vendor: {}\n📱 Phone: {}\n🏗️ Material: {}\n\
         💰 Rate: {}\n📊 GST: {}%\n🚚 Delivery: ₹{}\n\nQuotes received so far: {}",
        inquiry.inquiry_id,
        vendor.name,
        vendor.phone,
        response.material.label(),
        quote.rate_display(),
        response.gst,
        response.delivery_charge,
        count
    ))
}

fn vendor_confirmation(quote: &RateQuote) -> Reply {
    Reply::text(format!(
        "✅ Thank you! Your quote has been received.\n\n📋 Your Quote:\n💰 Rate: {}\n📊 GST: {}%\n🚚 Delivery: ₹{}\n\n\
         Inquiry ID: {}",
        quote.rate_display(),
        quote.gst,
        quote.delivery,
        quote.inquiry_id
    ))
}
