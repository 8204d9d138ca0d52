//! AI-assist overlay: lets a confident extraction skip ahead in the buyer and
//! vendor flows.

use super::step::{BuyerDraft, BuyerStage, BuyerState, Step, VendorDraft, VendorStage, VendorState};
use super::{FlowContext, Turn, buyer, validate, vendor};
use crate::extract::{ExtractedFields, Extraction};
use crate::model::{Material, MaterialChoice};

/// Whether the overlay may run at `step`.
pub(super) fn eligible(step: &Step) -> bool {
    match step {
        Step::Buyer(state) => state.stage != BuyerStage::Confirm,
        Step::Vendor(state) => state.stage != VendorStage::Confirm,
        Step::Root | Step::Sales(_) | Step::Completed => false,
    }
}

/// The redirected turn, or `None` to fall through to the structured flow.
pub(super) fn apply(step: &Step, extraction: &Extraction, ctx: &FlowContext<'_>) -> Option<Turn> {
    match step {
        Step::Buyer(state) => apply_buyer(state, extraction, ctx),
        Step::Vendor(state) => apply_vendor(state, extraction),
        Step::Root | Step::Sales(_) | Step::Completed => None,
    }
}

fn apply_buyer(state: &BuyerState, extraction: &Extraction, ctx: &FlowContext<'_>) -> Option<Turn> {
    let mut draft = state.draft.clone();
    merge_buyer(&mut draft, &extraction.data);

    match extraction.suggested_step.as_str() {
        "confirm" | "confirm_inquiry" => {
            let material = draft.material?;
            let city = draft.city.clone()?;
            let text = format!(
                "I understand you need {} in {}. Is that correct? (Yes/No)",
                material.label(),
                city
            );
            Some(Turn::new(
                Step::Buyer(BuyerState::new(BuyerStage::Confirm, draft)),
                text,
            ))
        }
        "get_city" if draft.city.is_none() => Some(buyer::city_step(draft, ctx, "")),
        "get_quantity" if draft.material.is_some() && draft.quantity.is_none() => {
            Some(buyer::quantity_step(draft))
        }
        _ => None,
    }
}

fn apply_vendor(state: &VendorState, extraction: &Extraction) -> Option<Turn> {
    if extraction.suggested_step != "vendor_confirm" {
        return None;
    }
    let mut draft = state.draft.clone();
    merge_vendor(&mut draft, &extraction.data);

    let unknown = "(not provided)";
    let materials = if draft.materials.is_empty() {
        unknown.to_string()
    } else {
        vendor::materials_label(&draft.materials)
    };
    let text = format!(
        "You are registering as a vendor. Is your company name {} and you supply {} in {}? (Yes/No)",
        draft.company_name.as_deref().unwrap_or(unknown),
        materials,
        draft.city.as_deref().unwrap_or(unknown)
    );
    Some(Turn::new(
        Step::Vendor(VendorState::new(VendorStage::Confirm, draft)),
        text,
    ))
}

/// Copy over the fields that parse; anything else is ignored.
fn merge_buyer(draft: &mut BuyerDraft, data: &ExtractedFields) {
    if let Some(material) = data.material.as_deref().and_then(MaterialChoice::parse) {
        draft.material = Some(material);
    }
    if let Some(city) = data.city.as_deref().and_then(validate::min_text) {
        draft.city = Some(validate::title_case(&city));
        draft.locality = None;
    }
    if let Some(quantity) = data.quantity.as_deref().and_then(validate::non_empty) {
        draft.quantity = Some(quantity);
    }
    if let Some(brand) = data.brand.as_deref().and_then(validate::min_text) {
        match draft.material {
            Some(MaterialChoice::Tmt) => draft.tmt_company = Some(brand),
            Some(_) => draft.cement_company = Some(brand),
            None => {}
        }
    }
}

fn merge_vendor(draft: &mut VendorDraft, data: &ExtractedFields) {
    if let Some(name) = data.vendor_name.as_deref().and_then(validate::min_text) {
        draft.company_name = Some(name);
    }
    if let Some(phone) = data.vendor_phone.as_deref().and_then(validate::normalize_phone) {
        draft.phone = Some(phone);
    }
    if let Some(city) = data.city.as_deref().and_then(validate::min_text) {
        draft.city = Some(validate::title_case(&city));
    }

    let mut materials: Vec<Material> = data
        .materials
        .iter()
        .flatten()
        .filter_map(|m| Material::parse(m))
        .collect();
    if materials.is_empty()
        && let Some(choice) = data.material.as_deref().and_then(MaterialChoice::parse)
    {
        materials = choice.materials();
    }
    if let Some(choice) = MaterialChoice::from_materials(&materials) {
        draft.materials = choice.materials();
    }
}
