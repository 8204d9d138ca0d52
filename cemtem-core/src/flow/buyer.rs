//! Buyer inquiry flow.

use super::options::{self, CEMENT_TYPES, CUSTOM_CEMENT_TYPE, TMT_SIZES};
use super::step::{BuyerDraft, BuyerStage, BuyerState, Step};
use super::{Action, FlowContext, Turn, material_choice, validate};
use crate::identity::Platform;
use crate::model::{InquiryRequest, Material, MaterialChoice};

const MATERIAL_MENU: &str = "1 Cement\n2 TMT Bars\n3 Both Cement & TMT Bars";

const CEMENT_COMPANY_HINT: &str =
    "Type the company name (e.g., ACC, UltraTech, Ambuja) or reply \"Any\" if no preference:";

const TMT_COMPANY_HINT: &str =
    "Type the company name (e.g., TATA, JSW, SAIL) or reply \"Any\" if no preference:";

pub(super) fn start() -> Turn {
    ask(
        BuyerStage::Material,
        BuyerDraft::default(),
        format!(
            "🏗️ Great! I'll help you get pricing for cement and TMT bars.\n\n\
             What material do you need pricing for?\n{MATERIAL_MENU}\n\nReply with 1, 2 or 3"
        ),
    )
}

pub(super) fn advance(state: BuyerState, text: &str, ctx: &FlowContext<'_>) -> Turn {
    let BuyerState { stage, mut draft } = state;
    match stage {
        BuyerStage::Material => match material_choice(text) {
            Some(material) => {
                draft.material = Some(material);
                after_material(draft)
            }
            None => ask(
                stage,
                draft,
                "Please reply with 1 for Cement, 2 for TMT Bars or 3 for both",
            ),
        },
        BuyerStage::CementCompany => match company_preference(text) {
            Some(company) => {
                draft.cement_company = company;
                ask(BuyerStage::CementTypes, draft, cement_types_prompt())
            }
            None => ask(
                stage,
                draft,
                format!("Please enter a valid company name (minimum 2 characters).\n\n{CEMENT_COMPANY_HINT}"),
            ),
        },
        BuyerStage::CementTypes => {
            let mut selected = validate::multi_select(text, CEMENT_TYPES.len());
            if selected.is_empty() {
                return ask(
                    stage,
                    draft,
                    format!(
                        "Please select valid cement types using numbers (e.g., \"1,3,5\")\n\n{}",
                        options::numbered(CEMENT_TYPES)
                    ),
                );
            }
            let custom = CUSTOM_CEMENT_TYPE - 1;
            let wants_custom = selected.contains(&custom);
            selected.retain(|&i| i != custom);
            draft.cement_types = options::pick(CEMENT_TYPES, &selected);
            if wants_custom {
                ask(BuyerStage::CustomType, draft, "Please specify your custom cement type:")
            } else {
                after_cement(draft, ctx)
            }
        }
        BuyerStage::CustomType => match validate::min_text(text) {
            Some(custom) => {
                draft.cement_types.push(custom);
                after_cement(draft, ctx)
            }
            None => ask(
                stage,
                draft,
                "Please enter a valid cement type (minimum 2 characters):",
            ),
        },
        BuyerStage::TmtCompany => match company_preference(text) {
            Some(company) => {
                draft.tmt_company = company;
                ask(BuyerStage::TmtSizes, draft, tmt_sizes_prompt())
            }
            None => ask(
                stage,
                draft,
                format!("Please enter a valid company name (minimum 2 characters).\n\n{TMT_COMPANY_HINT}"),
            ),
        },
        BuyerStage::TmtSizes => {
            let selected = validate::multi_select(text, TMT_SIZES.len());
            if selected.is_empty() {
                return ask(
                    stage,
                    draft,
                    format!(
                        "Please select valid TMT sizes using numbers (e.g., \"3,5,7\")\n\n{}",
                        options::numbered(TMT_SIZES)
                    ),
                );
            }
            draft.tmt_sizes = options::pick(TMT_SIZES, &selected);
            let chosen = draft.tmt_sizes.join(", ");
            city_step(draft, ctx, &format!("✅ TMT sizes selected: {chosen}\n\n"))
        }
        BuyerStage::City => {
            if let Some(location) = ctx.locations.resolve(text) {
                draft.city = Some(location.city);
                draft.locality = location.locality;
            } else if let Some(city) = validate::min_text(text) {
                draft.city = Some(validate::title_case(&city));
                draft.locality = None;
            } else {
                return ask(stage, draft, "Please enter a valid city name.");
            }
            quantity_step(draft)
        }
        BuyerStage::CityConfirm => {
            let location = ctx.locations.default_location();
            match validate::yes_no(text) {
                Some(true) => {
                    draft.city = Some(location.city);
                    draft.locality = location.locality;
                    quantity_step(draft)
                }
                Some(false) => Turn::new(
                    Step::Completed,
                    format!(
                        "Sorry, we currently serve only {}. We'll let you know once we reach your area.\n\n\
                         Type /start to begin again.",
                        location.display()
                    ),
                ),
                None => ask(stage, draft, "Please reply with 1 for Yes or 2 for No."),
            }
        }
        BuyerStage::Quantity => match validate::non_empty(text) {
            Some(quantity) => {
                draft.quantity = Some(quantity);
                ask(
                    BuyerStage::Phone,
                    draft,
                    "📱 Great! Please provide your phone number for vendors to contact you:",
                )
            }
            None => ask(
                stage,
                draft,
                "Please enter the quantity you need (e.g., 500 bags, 10 tons).",
            ),
        },
        BuyerStage::Phone => match validate::normalize_phone(text) {
            Some(phone) => {
                draft.phone = Some(phone);
                resume(draft, ctx)
            }
            None => ask(stage, draft, "Please enter a valid 10-digit mobile number."),
        },
        BuyerStage::Confirm => match validate::yes_no(text) {
            Some(true) => resume(draft, ctx),
            Some(false) => ask(
                BuyerStage::Material,
                BuyerDraft::default(),
                format!("No problem. Let's restart. What material are you looking for?\n{MATERIAL_MENU}"),
            ),
            None => ask(stage, draft, "Please respond with \"Yes\" or \"No\"."),
        },
    }
}

/// Continue at the first unanswered question, or finish.
pub(super) fn resume(draft: BuyerDraft, ctx: &FlowContext<'_>) -> Turn {
    let Some(material) = draft.material else {
        return ask(
            BuyerStage::Material,
            draft,
            format!("What material do you need pricing for?\n{MATERIAL_MENU}"),
        );
    };
    if material.includes(Material::Cement) && draft.cement_types.is_empty() {
        return if draft.cement_company.is_none() {
            ask(BuyerStage::CementCompany, draft, cement_company_prompt(material))
        } else {
            ask(BuyerStage::CementTypes, draft, cement_types_prompt())
        };
    }
    if material.includes(Material::Tmt) && draft.tmt_sizes.is_empty() {
        return if draft.tmt_company.is_none() {
            ask(BuyerStage::TmtCompany, draft, tmt_company_prompt(""))
        } else {
            ask(BuyerStage::TmtSizes, draft, tmt_sizes_prompt())
        };
    }
    if draft.city.is_none() {
        return city_step(draft, ctx, "");
    }
    if draft.quantity.is_none() {
        return quantity_step(draft);
    }
    match draft.to_request() {
        Some(request) => Turn::new(Step::Completed, summary(&request))
            .with_action(Action::CreateInquiry(request)),
        None => ask(
            BuyerStage::Phone,
            draft,
            "📱 Please provide your phone number for vendors to contact you:",
        ),
    }
}

/// Ask for the city the way the platform supports.
pub(super) fn city_step(draft: BuyerDraft, ctx: &FlowContext<'_>, prefix: &str) -> Turn {
    match ctx.platform {
        Platform::Web => ask(
            BuyerStage::City,
            draft,
            format!("{prefix}📍 Which city do you need these materials in?\n\nPlease enter your city name:"),
        ),
        Platform::Telegram => {
            let location = ctx.locations.default_location().display();
            ask(
                BuyerStage::CityConfirm,
                draft,
                format!(
                    "{prefix}📍 We currently deliver in {location}.\n\n\
                     Do you need the materials delivered in {location}?\n1 Yes\n2 No"
                ),
            )
        }
    }
}

/// Ask for the quantity, listing what was requested.
pub(super) fn quantity_step(draft: BuyerDraft) -> Turn {
    let mut requested = Vec::new();
    if let Some(material) = draft.material {
        if material.includes(Material::Cement) {
            requested.push(line("Cement", &draft.cement_types));
        }
        if material.includes(Material::Tmt) {
            requested.push(line("TMT", &draft.tmt_sizes));
        }
    }
    let text = format!(
        "📦 How much do you need?\n\nMaterials requested:\n{}\n\n\
         Please specify quantity (e.g., \"50 bags cement\" or \"2 tons TMT\"):",
        requested.join("\n")
    );
    ask(BuyerStage::Quantity, draft, text)
}

fn ask(stage: BuyerStage, draft: BuyerDraft, text: impl Into<String>) -> Turn {
    Turn::new(Step::Buyer(BuyerState::new(stage, draft)), text)
}

fn after_material(draft: BuyerDraft) -> Turn {
    match draft.material {
        Some(MaterialChoice::Tmt) => ask(BuyerStage::TmtCompany, draft, tmt_company_prompt("")),
        Some(material) => {
            let prompt = cement_company_prompt(material);
            ask(BuyerStage::CementCompany, draft, prompt)
        }
        None => start(),
    }
}

fn after_cement(draft: BuyerDraft, ctx: &FlowContext<'_>) -> Turn {
    let chosen = draft.cement_types.join(", ");
    if draft.material == Some(MaterialChoice::Both) {
        let prompt = tmt_company_prompt(&format!("✅ Cement types selected: {chosen}\n\n"));
        ask(BuyerStage::TmtCompany, draft, prompt)
    } else {
        city_step(draft, ctx, &format!("✅ Selected: {chosen}\n\n"))
    }
}

/// `Some(None)` for no preference, `None` for unusable input.
fn company_preference(text: &str) -> Option<Option<String>> {
    if validate::is_no_preference(text) {
        return Some(None);
    }
    validate::min_text(text).map(Some)
}

fn cement_company_prompt(material: MaterialChoice) -> String {
    let lead = if material == MaterialChoice::Both {
        "🏭 Let's start with cement. Do you have any specific cement company preference?"
    } else {
        "🏭 Do you have any specific cement company preference?"
    };
    format!("{lead}\n\n{CEMENT_COMPANY_HINT}")
}

fn tmt_company_prompt(prefix: &str) -> String {
    format!("{prefix}🏭 Do you have any specific TMT company preference?\n\n{TMT_COMPANY_HINT}")
}

fn cement_types_prompt() -> String {
    format!(
        "🏗️ Select cement types you need (reply with numbers separated by commas, e.g., \"1,3,5\"):\n\n{}",
        options::numbered(CEMENT_TYPES)
    )
}

fn tmt_sizes_prompt() -> String {
    format!(
        "🔧 Select TMT sizes you need (reply with numbers separated by commas, e.g., \"3,5,7\"):\n\n{}",
        options::numbered(TMT_SIZES)
    )
}

fn line(label: &str, items: &[String]) -> String {
    if items.is_empty() {
        label.to_string()
    } else {
        format!("{label}: {}", items.join(", "))
    }
}

fn summary(request: &InquiryRequest) -> String {
    let details = &request.details;
    let any = |company: &Option<String>| company.clone().unwrap_or_else(|| "Any".to_string());
    let mut lines = Vec::new();
    if request.material.includes(Material::Cement) {
        lines.push(format!("🏗️ Cement Types: {}", details.cement_types.join(", ")));
        lines.push(format!("🏭 Cement Company: {}", any(&details.cement_company)));
    }
    if request.material.includes(Material::Tmt) {
        lines.push(format!("🔧 TMT Sizes: {}", details.tmt_sizes.join(", ")));
        lines.push(format!("🏭 TMT Company: {}", any(&details.tmt_company)));
    }
    let place = match &request.locality {
        Some(locality) => format!("{locality}, {}", request.city),
        None => request.city.clone(),
    };
    format!(
        "✅ Perfect! Your inquiry has been created and sent to vendors in {}.\n\n\
         📋 Your Inquiry Summary:\n{}\n📍 City: {place}\n📦 Quantity: {}\n📱 Contact: {}\n\n\
         Vendors will send you detailed quotes shortly!",
        request.city,
        lines.join("\n"),
        request.quantity,
        request.phone
    )
}
