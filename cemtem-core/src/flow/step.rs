//! Conversation steps and the typed drafts each flow accumulates.

use crate::model::{
    CementSale, InquiryRequest, Material, MaterialChoice, MaterialDetails, SalesEntry, TmtLine,
    TmtSale, VendorRegistration,
};
use crate::projects::Project;

/// Where a conversation currently is.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Main menu (`user_type`).
    Root,
    /// Buyer inquiry flow.
    Buyer(BuyerState),
    /// Vendor registration flow.
    Vendor(VendorState),
    /// Sales record flow.
    Sales(SalesState),
    /// A flow finished; the next message gets the fallback reply.
    Completed,
}

impl Step {
    /// Stable step name, used in logs and as the extractor's context.
    pub fn name(&self) -> &'static str {
        match self {
            Step::Root => "user_type",
            Step::Buyer(state) => state.stage.name(),
            Step::Vendor(state) => state.stage.name(),
            Step::Sales(state) => state.stage.name(),
            Step::Completed => "completed",
        }
    }
}

/// Buyer flow position plus answers so far.
#[derive(Debug, Clone, PartialEq)]
pub struct BuyerState {
    /// Question being asked.
    pub stage: BuyerStage,
    /// Answers collected.
    pub draft: BuyerDraft,
}

impl BuyerState {
    /// State at `stage` with `draft`.
    pub fn new(stage: BuyerStage, draft: BuyerDraft) -> Self {
        Self { stage, draft }
    }
}

/// Questions of the buyer flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuyerStage {
    /// Cement, TMT or both.
    Material,
    /// Cement company preference.
    CementCompany,
    /// Cement types (multi-select).
    CementTypes,
    /// Custom cement type text.
    CustomType,
    /// TMT company preference.
    TmtCompany,
    /// TMT sizes (multi-select).
    TmtSizes,
    /// City text or `cityId:localityId` (web).
    City,
    /// Yes/no on the default served location (Telegram).
    CityConfirm,
    /// Free-text quantity.
    Quantity,
    /// Buyer's phone; completes the flow.
    Phone,
    /// Yes/no on details recovered by the AI assist.
    Confirm,
}

impl BuyerStage {
    /// Stable stage name.
    pub fn name(&self) -> &'static str {
        match self {
            BuyerStage::Material => "buyer_material",
            BuyerStage::CementCompany => "cement_company",
            BuyerStage::CementTypes => "cement_types",
            BuyerStage::CustomType => "custom_type",
            BuyerStage::TmtCompany => "tmt_company",
            BuyerStage::TmtSizes => "tmt_sizes",
            BuyerStage::City => "city",
            BuyerStage::CityConfirm => "city_confirm",
            BuyerStage::Quantity => "quantity",
            BuyerStage::Phone => "phone",
            BuyerStage::Confirm => "buyer_confirm",
        }
    }
}

/// Answers of the buyer flow.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuyerDraft {
    pub material: Option<MaterialChoice>,
    pub cement_company: Option<String>,
    pub cement_types: Vec<String>,
    pub tmt_company: Option<String>,
    pub tmt_sizes: Vec<String>,
    pub city: Option<String>,
    pub locality: Option<String>,
    pub quantity: Option<String>,
    pub phone: Option<String>,
}

impl BuyerDraft {
    /// Company and type/size details.
    pub fn details(&self) -> MaterialDetails {
        MaterialDetails {
            cement_company: self.cement_company.clone(),
            cement_types: self.cement_types.clone(),
            tmt_company: self.tmt_company.clone(),
            tmt_sizes: self.tmt_sizes.clone(),
        }
    }

    /// The finished request, once material, city, quantity and phone are known.
    pub fn to_request(&self) -> Option<InquiryRequest> {
        Some(InquiryRequest {
            material: self.material?,
            details: self.details(),
            city: self.city.clone()?,
            locality: self.locality.clone(),
            quantity: self.quantity.clone()?,
            phone: self.phone.clone()?,
        })
    }
}

/// Vendor flow position plus answers so far.
#[derive(Debug, Clone, PartialEq)]
pub struct VendorState {
    /// Question being asked.
    pub stage: VendorStage,
    /// Answers collected.
    pub draft: VendorDraft,
}

impl VendorState {
    /// State at `stage` with `draft`.
    pub fn new(stage: VendorStage, draft: VendorDraft) -> Self {
        Self { stage, draft }
    }
}

/// Questions of the vendor registration flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VendorStage {
    CompanyName,
    Phone,
    City,
    Materials,
    /// Yes/no on details recovered by the AI assist.
    Confirm,
}

impl VendorStage {
    /// Stable stage name.
    pub fn name(&self) -> &'static str {
        match self {
            VendorStage::CompanyName => "company_name",
            VendorStage::Phone => "vendor_phone",
            VendorStage::City => "vendor_city",
            VendorStage::Materials => "vendor_materials",
            VendorStage::Confirm => "vendor_confirm",
        }
    }
}

/// Answers of the vendor registration flow.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VendorDraft {
    pub company_name: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub materials: Vec<Material>,
}

impl VendorDraft {
    /// The finished registration, once every field is known.
    pub fn to_registration(&self) -> Option<VendorRegistration> {
        if self.materials.is_empty() {
            return None;
        }
        Some(VendorRegistration {
            company_name: self.company_name.clone()?,
            phone: self.phone.clone()?,
            city: self.city.clone()?,
            materials: self.materials.clone(),
        })
    }
}

/// Sales flow position plus answers so far.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesState {
    /// Question being asked.
    pub stage: SalesStage,
    /// Answers collected.
    pub draft: SalesDraft,
}

impl SalesState {
    /// State at `stage` with `draft`.
    pub fn new(stage: SalesStage, draft: SalesDraft) -> Self {
        Self { stage, draft }
    }
}

/// Questions of the sales record flow.
#[derive(Debug, Clone, PartialEq)]
pub enum SalesStage {
    ItemType,
    CementCompanySelect,
    CementCompanyCustom,
    CementQty,
    CementPrice,
    TmtCompanySelect,
    TmtCompanyCustom,
    TmtSizes,
    /// Quantity for the selected size at this index.
    TmtQty(usize),
    /// Price for the selected size at this index.
    TmtPrice(usize),
    ProjectOwner,
    /// Search registered projects or enter manually.
    ProjectEntry,
    ProjectSearch,
    /// Pick one of these search hits (0 = enter manually).
    ProjectSelect(Vec<Project>),
    ProjectManual,
    CompletionTime,
    Contact,
}

impl SalesStage {
    /// Stable stage name.
    pub fn name(&self) -> &'static str {
        match self {
            SalesStage::ItemType => "item_type",
            SalesStage::CementCompanySelect => "cement_company_select",
            SalesStage::CementCompanyCustom => "cement_company_custom",
            SalesStage::CementQty => "cement_qty",
            SalesStage::CementPrice => "cement_price",
            SalesStage::TmtCompanySelect => "tmt_company_select",
            SalesStage::TmtCompanyCustom => "tmt_company_custom",
            SalesStage::TmtSizes => "tmt_sizes_select",
            SalesStage::TmtQty(_) => "tmt_qty",
            SalesStage::TmtPrice(_) => "tmt_price",
            SalesStage::ProjectOwner => "project_owner",
            SalesStage::ProjectEntry => "project_entry",
            SalesStage::ProjectSearch => "project_search",
            SalesStage::ProjectSelect(_) => "project_select",
            SalesStage::ProjectManual => "project_manual",
            SalesStage::CompletionTime => "completion_time",
            SalesStage::Contact => "sales_contact",
        }
    }
}

/// Answers of the sales record flow.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SalesDraft {
    pub sales_type: Option<MaterialChoice>,
    pub cement_company: Option<String>,
    pub cement_qty: Option<u32>,
    pub cement_price: Option<f64>,
    pub tmt_company: Option<String>,
    pub tmt_sizes: Vec<String>,
    /// One entry per size collected so far, in size order.
    pub tmt_quantities: Vec<u32>,
    /// One entry per size collected so far, in size order.
    pub tmt_prices: Vec<f64>,
    pub project_owner: Option<String>,
    pub project_name: Option<String>,
    pub project_rera_id: Option<String>,
    pub completion_years: Option<u32>,
    pub contact_number: Option<String>,
}

impl SalesDraft {
    /// Cement part, once company, quantity and price are known.
    pub fn cement_sale(&self) -> Option<CementSale> {
        Some(CementSale {
            company: self.cement_company.clone()?,
            quantity_bags: self.cement_qty?,
            price_per_bag: self.cement_price?,
        })
    }

    /// TMT part, once every selected size has a quantity and price.
    pub fn tmt_sale(&self) -> Option<TmtSale> {
        let n = self.tmt_sizes.len();
        if n == 0 || self.tmt_quantities.len() != n || self.tmt_prices.len() != n {
            return None;
        }
        let lines = self
            .tmt_sizes
            .iter()
            .zip(&self.tmt_quantities)
            .zip(&self.tmt_prices)
            .map(|((size, &quantity_kg), &price_per_kg)| TmtLine {
                size: size.clone(),
                quantity_kg,
                price_per_kg,
            })
            .collect();
        Some(TmtSale {
            company: self.tmt_company.clone()?,
            lines,
        })
    }

    /// The finished sales entry, once every required field is known.
    pub fn to_entry(&self) -> Option<SalesEntry> {
        let sales_type = self.sales_type?;
        let cement = if sales_type.includes(Material::Cement) {
            Some(self.cement_sale()?)
        } else {
            None
        };
        let tmt = if sales_type.includes(Material::Tmt) {
            Some(self.tmt_sale()?)
        } else {
            None
        };
        Some(SalesEntry {
            sales_type,
            cement,
            tmt,
            project_owner: self.project_owner.clone()?,
            project_name: self.project_name.clone()?,
            project_rera_id: self.project_rera_id.clone(),
            completion_years: self.completion_years?,
            contact_number: self.contact_number.clone()?,
        })
    }
}
