//! Domain records: inquiries, vendors, price responses, sales records.
//!
//! Request types (`InquiryRequest`, `VendorRegistration`, `SalesEntry`) are
//! produced by the flow engine at a flow's terminal step. Persisted types carry
//! the ids and timestamps assigned by the dispatcher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::Platform;

/// A single material category a vendor can supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Material {
    /// Cement bags.
    Cement,
    /// TMT reinforcement bars.
    Tmt,
}

impl Material {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Material::Cement => "cement",
            Material::Tmt => "tmt",
        }
    }

    /// Human-facing name.
    pub fn label(&self) -> &'static str {
        match self {
            Material::Cement => "Cement",
            Material::Tmt => "TMT Bars",
        }
    }

    /// Parse a lowercase material name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "cement" => Some(Material::Cement),
            "tmt" | "tmt bars" => Some(Material::Tmt),
            _ => None,
        }
    }
}

/// A buyer's (or sales rep's) material selection, which may cover both kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialChoice {
    /// Cement only.
    Cement,
    /// TMT bars only.
    Tmt,
    /// Cement and TMT bars.
    Both,
}

impl MaterialChoice {
    /// Stable lowercase name (`cement`, `tmt`, `both`).
    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialChoice::Cement => "cement",
            MaterialChoice::Tmt => "tmt",
            MaterialChoice::Both => "both",
        }
    }

    /// Human-facing name.
    pub fn label(&self) -> &'static str {
        match self {
            MaterialChoice::Cement => "Cement",
            MaterialChoice::Tmt => "TMT Bars",
            MaterialChoice::Both => "Cement & TMT Bars",
        }
    }

    /// Parse a stored choice name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "cement" => Some(MaterialChoice::Cement),
            "tmt" => Some(MaterialChoice::Tmt),
            "both" => Some(MaterialChoice::Both),
            _ => None,
        }
    }

    /// Individual materials covered by this choice, cement first.
    pub fn materials(&self) -> Vec<Material> {
        match self {
            MaterialChoice::Cement => vec![Material::Cement],
            MaterialChoice::Tmt => vec![Material::Tmt],
            MaterialChoice::Both => vec![Material::Cement, Material::Tmt],
        }
    }

    /// Collapse a list of materials back into a choice.
    pub fn from_materials(materials: &[Material]) -> Option<Self> {
        let cement = materials.contains(&Material::Cement);
        let tmt = materials.contains(&Material::Tmt);
        match (cement, tmt) {
            (true, true) => Some(MaterialChoice::Both),
            (true, false) => Some(MaterialChoice::Cement),
            (false, true) => Some(MaterialChoice::Tmt),
            (false, false) => None,
        }
    }

    /// Whether this choice includes `material`.
    pub fn includes(&self, material: Material) -> bool {
        self.materials().contains(&material)
    }
}

impl From<Material> for MaterialChoice {
    fn from(material: Material) -> Self {
        match material {
            Material::Cement => MaterialChoice::Cement,
            Material::Tmt => MaterialChoice::Tmt,
        }
    }
}

/// Companies, types and sizes a buyer asked for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialDetails {
    /// Preferred cement company, `None` for no preference.
    pub cement_company: Option<String>,
    /// Selected cement types.
    pub cement_types: Vec<String>,
    /// Preferred TMT company, `None` for no preference.
    pub tmt_company: Option<String>,
    /// Selected TMT sizes.
    pub tmt_sizes: Vec<String>,
}

impl MaterialDetails {
    /// Company preferences joined for display; `None` if the buyer has none.
    pub fn brand(&self) -> Option<String> {
        let brands: Vec<&str> = [&self.cement_company, &self.tmt_company]
            .into_iter()
            .filter_map(|c| c.as_deref())
            .collect();
        if brands.is_empty() {
            None
        } else {
            Some(brands.join(", "))
        }
    }
}

/// Completed buyer flow, ready to become an [`Inquiry`].
#[derive(Debug, Clone, PartialEq)]
pub struct InquiryRequest {
    /// Requested material(s).
    pub material: MaterialChoice,
    /// Companies, types and sizes.
    pub details: MaterialDetails,
    /// Delivery city.
    pub city: String,
    /// Locality inside the city, when known.
    pub locality: Option<String>,
    /// Free-text quantity ("50 bags").
    pub quantity: String,
    /// Buyer's 10-digit phone number.
    pub phone: String,
}

/// Lifecycle of an inquiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InquiryStatus {
    /// Sent to vendors, no quote yet.
    Pending,
    /// At least one vendor quoted.
    Responded,
}

impl InquiryStatus {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            InquiryStatus::Pending => "pending",
            InquiryStatus::Responded => "responded",
        }
    }

    /// Parse a stored status name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(InquiryStatus::Pending),
            "responded" => Some(InquiryStatus::Responded),
            _ => None,
        }
    }
}

/// A buyer's price inquiry as persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Inquiry {
    /// `INQ-<millis>`.
    pub inquiry_id: String,
    /// Display name of the buyer.
    pub user_name: String,
    /// Buyer's platform address (chat id or web session id).
    pub user_contact: String,
    /// Phone number the buyer gave.
    pub buyer_phone: String,
    /// Delivery city.
    pub city: String,
    /// Locality inside the city.
    pub locality: Option<String>,
    /// Requested material(s).
    pub material: MaterialChoice,
    /// Companies, types and sizes.
    pub details: MaterialDetails,
    /// Free-text quantity.
    pub quantity: String,
    /// Company preferences, if any.
    pub brand: Option<String>,
    /// Vendors the inquiry was sent to.
    pub vendors_contacted: Vec<String>,
    /// Quotes received so far.
    pub response_count: u32,
    /// Current status.
    pub status: InquiryStatus,
    /// Platform the buyer used, which decides how quotes are delivered.
    pub platform: Platform,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Completed vendor-registration flow.
#[derive(Debug, Clone, PartialEq)]
pub struct VendorRegistration {
    /// Company name.
    pub company_name: String,
    /// 10-digit phone.
    pub phone: String,
    /// City the vendor serves.
    pub city: String,
    /// Materials supplied.
    pub materials: Vec<Material>,
}

/// A registered vendor.
#[derive(Debug, Clone, PartialEq)]
pub struct Vendor {
    /// `VEN-<millis>`.
    pub vendor_id: String,
    /// Company name.
    pub name: String,
    /// Contact phone.
    pub phone: String,
    /// City served.
    pub city: String,
    /// Materials supplied.
    pub materials: Vec<Material>,
    /// Telegram chat id; vendors without one never receive alerts.
    pub telegram_id: Option<String>,
    /// Inactive vendors are skipped during fan-out.
    pub is_active: bool,
    /// Last time an inquiry alert was sent.
    pub last_quoted: Option<DateTime<Utc>>,
    /// Registration time.
    pub created_at: DateTime<Utc>,
}

impl Vendor {
    /// Whether this vendor supplies `material`.
    pub fn supplies(&self, material: Material) -> bool {
        self.materials.contains(&material)
    }
}

/// Partial vendor update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VendorUpdate {
    /// New `last_quoted` timestamp.
    pub last_quoted: Option<DateTime<Utc>>,
    /// New active flag.
    pub is_active: Option<bool>,
    /// New Telegram chat id.
    pub telegram_id: Option<String>,
}

/// A vendor's quote for one inquiry.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceResponse {
    /// Record id.
    pub id: Uuid,
    /// Quoting vendor.
    pub vendor_id: String,
    /// Inquiry quoted for.
    pub inquiry_id: String,
    /// Material the quote covers.
    pub material: MaterialChoice,
    /// Rate as supplied (e.g. `"350"`).
    pub price: String,
    /// GST percentage as supplied.
    pub gst: String,
    /// Delivery charge as supplied.
    pub delivery_charge: String,
    /// Submission time.
    pub created_at: DateTime<Utc>,
}

/// Cement part of a recorded sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CementSale {
    /// Cement company.
    pub company: String,
    /// Bags sold.
    pub quantity_bags: u32,
    /// Price per bag in rupees.
    pub price_per_bag: f64,
}

/// One TMT size line of a recorded sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TmtLine {
    /// Bar size, e.g. `12mm`.
    pub size: String,
    /// Kilograms sold.
    pub quantity_kg: u32,
    /// Price per kg in rupees.
    pub price_per_kg: f64,
}

/// TMT part of a recorded sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TmtSale {
    /// TMT company.
    pub company: String,
    /// Per-size lines in selection order.
    pub lines: Vec<TmtLine>,
}

/// Completed sales-record flow.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesEntry {
    /// What was sold.
    pub sales_type: MaterialChoice,
    /// Cement details when cement was sold.
    pub cement: Option<CementSale>,
    /// TMT details when TMT was sold.
    pub tmt: Option<TmtSale>,
    /// Project owner / client name.
    pub project_owner: String,
    /// Project name or location.
    pub project_name: String,
    /// Registry id when the project was picked from a search.
    pub project_rera_id: Option<String>,
    /// Estimated completion in years.
    pub completion_years: u32,
    /// Sales rep's 10-digit number.
    pub contact_number: String,
}

/// A persisted sales record.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesRecord {
    /// Record id.
    pub id: Uuid,
    /// Identity that recorded the sale.
    pub recorded_by: String,
    /// The recorded data.
    pub entry: SalesEntry,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Category of an admin notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// A buyer inquiry was created.
    InquiryCreated,
    /// A vendor registered.
    VendorRegistered,
    /// A vendor submitted a quote.
    VendorQuoteReceived,
}

impl NotificationKind {
    /// Stable snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::InquiryCreated => "inquiry_created",
            NotificationKind::VendorRegistered => "vendor_registered",
            NotificationKind::VendorQuoteReceived => "vendor_quote_received",
        }
    }
}

/// Admin-facing activity record.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// Record id.
    pub id: Uuid,
    /// Category.
    pub kind: NotificationKind,
    /// Human-readable message.
    pub message: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Create a notification stamped now.
    pub fn new(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            kind,
            message: message.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_choice_materials() {
        assert_eq!(MaterialChoice::Cement.materials(), vec![Material::Cement]);
        assert_eq!(
            MaterialChoice::Both.materials(),
            vec![Material::Cement, Material::Tmt]
        );
    }

    #[test]
    fn test_material_choice_from_materials() {
        assert_eq!(
            MaterialChoice::from_materials(&[Material::Tmt, Material::Cement]),
            Some(MaterialChoice::Both)
        );
        assert_eq!(
            MaterialChoice::from_materials(&[Material::Tmt]),
            Some(MaterialChoice::Tmt)
        );
        assert_eq!(MaterialChoice::from_materials(&[]), None);
    }

    #[test]
    fn test_material_parse_is_case_insensitive() {
        assert_eq!(Material::parse(" Cement "), Some(Material::Cement));
        assert_eq!(Material::parse("TMT"), Some(Material::Tmt));
        assert_eq!(Material::parse("sand"), None);
    }

    #[test]
    fn test_brand_joins_preferences() {
        let details = MaterialDetails {
            cement_company: Some("ACC".to_string()),
            tmt_company: Some("JSW".to_string()),
            ..MaterialDetails::default()
        };
        assert_eq!(details.brand(), Some("ACC, JSW".to_string()));
        assert_eq!(MaterialDetails::default().brand(), None);
    }

    #[test]
    fn test_material_serde_lowercase() {
        let json = serde_json::to_string(&vec![Material::Cement, Material::Tmt]).unwrap();
        assert_eq!(json, r#"["cement","tmt"]"#);
    }
}
