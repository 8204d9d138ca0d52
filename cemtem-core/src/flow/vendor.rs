//! Vendor registration flow.

use super::step::{Step, VendorDraft, VendorStage, VendorState};
use super::{Action, Turn, material_choice, validate};
use crate::model::{Material, VendorRegistration};

const MATERIALS_MENU: &str =
    "🏗️ What materials do you supply?\n\n1 Cement only\n2 TMT Bars only\n3 Both Cement and TMT Bars\n\nReply with 1, 2 or 3";

pub(super) fn start() -> Turn {
    ask(
        VendorStage::CompanyName,
        VendorDraft::default(),
        "🏢 Welcome vendor! Let's get you registered to provide quotes.\n\nWhat's your company name?",
    )
}

pub(super) fn advance(state: VendorState, text: &str) -> Turn {
    let VendorState { stage, mut draft } = state;
    match stage {
        VendorStage::CompanyName => match validate::min_text(text) {
            Some(name) => {
                draft.company_name = Some(name);
                ask(VendorStage::Phone, draft, "📱 What's your phone number?")
            }
            None => ask(
                stage,
                draft,
                "Please enter a valid company name (minimum 2 characters).",
            ),
        },
        VendorStage::Phone => match validate::normalize_phone(text) {
            Some(phone) => {
                draft.phone = Some(phone);
                ask(VendorStage::City, draft, "📍 Which city are you based in?")
            }
            None => ask(stage, draft, "Please enter a valid 10-digit mobile number."),
        },
        VendorStage::City => match validate::min_text(text) {
            Some(city) => {
                draft.city = Some(validate::title_case(&city));
                ask(VendorStage::Materials, draft, MATERIALS_MENU)
            }
            None => ask(stage, draft, "Please enter a valid city name."),
        },
        VendorStage::Materials => match material_choice(text) {
            Some(choice) => {
                draft.materials = choice.materials();
                resume(draft)
            }
            None => ask(stage, draft, "Please reply with 1, 2 or 3."),
        },
        VendorStage::Confirm => match validate::yes_no(text) {
            Some(true) => resume(draft),
            Some(false) => ask(
                VendorStage::CompanyName,
                VendorDraft::default(),
                "No problem. Let's restart your vendor registration. What's your company name?",
            ),
            None => ask(stage, draft, "Please respond with \"Yes\" or \"No\"."),
        },
    }
}

/// Continue at the first unanswered question, or finish.
pub(super) fn resume(draft: VendorDraft) -> Turn {
    if draft.company_name.is_none() {
        return ask(VendorStage::CompanyName, draft, "What's your company name?");
    }
    if draft.phone.is_none() {
        return ask(VendorStage::Phone, draft, "📱 What's your phone number?");
    }
    if draft.city.is_none() {
        return ask(VendorStage::City, draft, "📍 Which city are you based in?");
    }
    match draft.to_registration() {
        Some(registration) => Turn::new(Step::Completed, summary(&registration))
            .with_action(Action::RegisterVendor(registration)),
        None => ask(VendorStage::Materials, draft, MATERIALS_MENU),
    }
}

fn ask(stage: VendorStage, draft: VendorDraft, text: impl Into<String>) -> Turn {
    Turn::new(Step::Vendor(VendorState::new(stage, draft)), text)
}

pub(super) fn materials_label(materials: &[Material]) -> String {
    materials
        .iter()
        .map(|m| m.label())
        .collect::<Vec<_>>()
        .join(", ")
}

fn summary(registration: &VendorRegistration) -> String {
    format!(
        "✅ Excellent! Your vendor registration is complete.\n\n\
         📋 Registration Summary:\n🏢 Company: {}\n📱 Phone: {}\n📍 City: {}\n🏗️ Materials: {}\n\n\
         You'll now receive inquiry notifications and can send quotes!",
        registration.company_name,
        registration.phone,
        registration.city,
        materials_label(&registration.materials)
    )
}
