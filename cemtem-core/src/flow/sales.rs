//! Sales record flow.

use super::options::{self, SALES_CEMENT_COMPANIES, SALES_TMT_COMPANIES, TMT_SIZES};
use super::step::{SalesDraft, SalesStage, SalesState, Step};
use super::{Action, ProjectLookup, Turn, fallback, material_choice, validate};
use crate::model::{Material, SalesEntry};
use crate::projects::Project;

const MANUAL_PROJECT_PROMPT: &str = "📝 Manual Project Entry\n\nEnter the project name and/or location:\n\n\
     Example: \"XYZ Apartments, Guwahati\" or \"ABC Complex, Ganeshguri\"";

pub(super) fn start() -> Turn {
    ask(
        SalesStage::ItemType,
        SalesDraft::default(),
        "📊 Sales Record\n\nWhat did you sell?\n\n1. Cement\n2. TMT\n3. Both",
    )
}

pub(super) fn advance(state: SalesState, text: &str, lookup: Option<ProjectLookup>) -> Turn {
    let SalesState { stage, mut draft } = state;
    match stage {
        SalesStage::ItemType => match material_choice(text) {
            Some(choice) => {
                draft.sales_type = Some(choice);
                if choice.includes(Material::Cement) {
                    ask(SalesStage::CementCompanySelect, draft, cement_company_prompt(""))
                } else {
                    ask(SalesStage::TmtCompanySelect, draft, tmt_company_prompt(""))
                }
            }
            None => ask(
                SalesStage::ItemType,
                draft,
                "Please select a valid option:\n\n1. Cement\n2. TMT\n3. Both",
            ),
        },
        SalesStage::CementCompanySelect => {
            match validate::menu_choice(text, SALES_CEMENT_COMPANIES.len() + 1) {
                Some(i) if i < SALES_CEMENT_COMPANIES.len() => {
                    draft.cement_company = Some(SALES_CEMENT_COMPANIES[i].to_string());
                    cement_qty_step(draft)
                }
                Some(_) => ask(
                    SalesStage::CementCompanyCustom,
                    draft,
                    "📝 Enter Custom Company\n\nPlease enter the cement company name:",
                ),
                None => ask(
                    SalesStage::CementCompanySelect,
                    draft,
                    cement_company_prompt("Please select a valid option.\n\n"),
                ),
            }
        }
        SalesStage::CementCompanyCustom => match validate::min_text(text) {
            Some(company) => {
                draft.cement_company = Some(company);
                cement_qty_step(draft)
            }
            None => ask(
                SalesStage::CementCompanyCustom,
                draft,
                "Please enter a valid company name (minimum 2 characters)",
            ),
        },
        SalesStage::CementQty => match validate::positive_int(text) {
            Some(qty) => {
                draft.cement_qty = Some(qty);
                ask(
                    SalesStage::CementPrice,
                    draft,
                    format!(
                        "✅ Quantity: {qty} bags recorded\n\nEnter the price per bag (₹):\n\n\
                         Enter the price in rupees (e.g., 350, 400, 450)"
                    ),
                )
            }
            None => ask(
                SalesStage::CementQty,
                draft,
                "Please enter a valid quantity number (e.g., 100, 500, 1000)",
            ),
        },
        SalesStage::CementPrice => match validate::positive_number(text) {
            Some(price) => {
                draft.cement_price = Some(price);
                let recorded = format!("✅ Cement price: ₹{price} per bag recorded\n\n");
                if draft
                    .sales_type
                    .is_some_and(|t| t.includes(Material::Tmt))
                {
                    ask(SalesStage::TmtCompanySelect, draft, tmt_company_prompt(&recorded))
                } else {
                    project_owner_step(draft, &recorded)
                }
            }
            None => ask(
                SalesStage::CementPrice,
                draft,
                "Please enter a valid price number (e.g., 350, 400, 450)",
            ),
        },
        SalesStage::TmtCompanySelect => {
            match validate::menu_choice(text, SALES_TMT_COMPANIES.len() + 1) {
                Some(i) if i < SALES_TMT_COMPANIES.len() => {
                    draft.tmt_company = Some(SALES_TMT_COMPANIES[i].to_string());
                    tmt_sizes_step(draft)
                }
                Some(_) => ask(
                    SalesStage::TmtCompanyCustom,
                    draft,
                    "📝 Enter Custom Company\n\nPlease enter the TMT company name:",
                ),
                None => ask(
                    SalesStage::TmtCompanySelect,
                    draft,
                    tmt_company_prompt("Please select a valid option.\n\n"),
                ),
            }
        }
        SalesStage::TmtCompanyCustom => match validate::min_text(text) {
            Some(company) => {
                draft.tmt_company = Some(company);
                tmt_sizes_step(draft)
            }
            None => ask(
                SalesStage::TmtCompanyCustom,
                draft,
                "Please enter a valid company name (minimum 2 characters)",
            ),
        },
        SalesStage::TmtSizes => {
            let selected = validate::multi_select(text, TMT_SIZES.len());
            if selected.is_empty() {
                return ask(
                    SalesStage::TmtSizes,
                    draft,
                    "Please enter valid size numbers separated by commas (e.g., 1,4,5,8)\n\nAvailable sizes: 1-14",
                );
            }
            draft.tmt_sizes = options::pick(TMT_SIZES, &selected);
            draft.tmt_quantities.clear();
            draft.tmt_prices.clear();
            let chosen = draft.tmt_sizes.join(", ");
            let first = draft.tmt_sizes[0].clone();
            ask(
                SalesStage::TmtQty(0),
                draft,
                format!(
                    "✅ Selected sizes: {chosen}\n\nNow enter the quantity for each size:\n\n\
                     Quantity for {first} (in kg):"
                ),
            )
        }
        SalesStage::TmtQty(index) => {
            let Some(size) = draft.tmt_sizes.get(index).cloned() else {
                tracing::warn!(index, "sales flow lost track of TMT sizes");
                return fallback();
            };
            let Some(qty) = validate::positive_int(text) else {
                return ask(
                    SalesStage::TmtQty(index),
                    draft,
                    format!("Please enter a valid quantity for {size} (e.g., 100, 500, 1000)"),
                );
            };
            draft.tmt_quantities.truncate(index);
            draft.tmt_quantities.push(qty);
            let recorded = format!("✅ Quantity for {size}: {qty} kg recorded\n\n");
            match draft.tmt_sizes.get(index + 1).cloned() {
                Some(next) => ask(
                    SalesStage::TmtQty(index + 1),
                    draft,
                    format!("{recorded}Quantity for {next} (in kg):"),
                ),
                None => {
                    let first = draft.tmt_sizes[0].clone();
                    ask(
                        SalesStage::TmtPrice(0),
                        draft,
                        format!(
                            "{recorded}Now enter the price for each size:\n\nPrice for {first} (₹ per kg):"
                        ),
                    )
                }
            }
        }
        SalesStage::TmtPrice(index) => {
            let Some(size) = draft.tmt_sizes.get(index).cloned() else {
                tracing::warn!(index, "sales flow lost track of TMT sizes");
                return fallback();
            };
            let Some(price) = validate::positive_number(text) else {
                return ask(
                    SalesStage::TmtPrice(index),
                    draft,
                    format!("Please enter a valid price number for {size} (e.g., 65, 70, 75)"),
                );
            };
            draft.tmt_prices.truncate(index);
            draft.tmt_prices.push(price);
            let recorded = format!("✅ Price for {size}: ₹{price} per kg recorded\n\n");
            match draft.tmt_sizes.get(index + 1).cloned() {
                Some(next) => ask(
                    SalesStage::TmtPrice(index + 1),
                    draft,
                    format!("{recorded}Price for {next} (₹ per kg):"),
                ),
                None => project_owner_step(draft, "✅ All TMT prices recorded\n\n"),
            }
        }
        SalesStage::ProjectOwner => match validate::min_text(text) {
            Some(owner) => {
                draft.project_owner = Some(owner);
                ask(
                    SalesStage::ProjectEntry,
                    draft,
                    "How would you like to enter the project?\n\n1. Search registered projects\n2. Enter manually",
                )
            }
            None => ask(
                SalesStage::ProjectOwner,
                draft,
                "Please enter a valid project owner name (minimum 2 characters)",
            ),
        },
        SalesStage::ProjectEntry => match validate::menu_choice(text, 2) {
            Some(0) => ask(
                SalesStage::ProjectSearch,
                draft,
                "🔍 Enter a project name, location or RERA ID to search:",
            ),
            Some(_) => ask(SalesStage::ProjectManual, draft, MANUAL_PROJECT_PROMPT),
            None => ask(
                SalesStage::ProjectEntry,
                draft,
                "Please reply with 1 to search registered projects or 2 to enter manually.",
            ),
        },
        SalesStage::ProjectSearch => {
            let Some(query) = validate::min_text(text) else {
                return ask(
                    SalesStage::ProjectSearch,
                    draft,
                    "Please enter at least 2 characters to search.",
                );
            };
            match lookup {
                Some(ProjectLookup::Hits(hits)) if !hits.is_empty() => {
                    let prompt = select_prompt(&hits, "");
                    ask(SalesStage::ProjectSelect(hits), draft, prompt)
                }
                Some(ProjectLookup::Hits(_)) => ask(
                    SalesStage::ProjectManual,
                    draft,
                    format!("No registered projects matched \"{query}\".\n\n{MANUAL_PROJECT_PROMPT}"),
                ),
                Some(ProjectLookup::Unavailable) | None => ask(
                    SalesStage::ProjectManual,
                    draft,
                    format!("Project search is unavailable right now.\n\n{MANUAL_PROJECT_PROMPT}"),
                ),
            }
        }
        SalesStage::ProjectSelect(results) => {
            if text.trim() == "0" {
                return ask(SalesStage::ProjectManual, draft, MANUAL_PROJECT_PROMPT);
            }
            match validate::menu_choice(text, results.len()) {
                Some(i) => {
                    let project = &results[i];
                    draft.project_name = Some(project.name.clone());
                    draft.project_rera_id = project.rera_id.clone();
                    completion_step(draft, &project.name)
                }
                None => {
                    let prompt = select_prompt(&results, "Please pick one of the listed projects.\n\n");
                    ask(SalesStage::ProjectSelect(results), draft, prompt)
                }
            }
        }
        SalesStage::ProjectManual => match validate::min_text(text) {
            Some(project) => {
                draft.project_name = Some(project.clone());
                draft.project_rera_id = None;
                completion_step(draft, &project)
            }
            None => ask(
                SalesStage::ProjectManual,
                draft,
                "Please enter a valid project name/location (minimum 2 characters)",
            ),
        },
        SalesStage::CompletionTime => match validate::positive_int(text) {
            Some(years) => {
                draft.completion_years = Some(years);
                ask(
                    SalesStage::Contact,
                    draft,
                    format!(
                        "✅ Completion time: {years} years recorded\n\n\
                         Enter your contact number:\n\nEnter your 10-digit mobile number"
                    ),
                )
            }
            None => ask(
                SalesStage::CompletionTime,
                draft,
                "Please enter a valid number of years (e.g., 1, 2, 3, 5)",
            ),
        },
        SalesStage::Contact => match validate::normalize_phone(text) {
            Some(phone) => {
                draft.contact_number = Some(phone);
                match draft.to_entry() {
                    Some(entry) => Turn::new(Step::Completed, summary(&entry))
                        .with_action(Action::CreateSalesRecord(entry)),
                    None => {
                        tracing::warn!("sales flow reached contact with an incomplete draft");
                        fallback()
                    }
                }
            }
            None => ask(
                SalesStage::Contact,
                draft,
                "Please enter a valid 10-digit mobile number",
            ),
        },
    }
}

fn ask(stage: SalesStage, draft: SalesDraft, text: impl Into<String>) -> Turn {
    Turn::new(Step::Sales(SalesState::new(stage, draft)), text)
}

fn cement_company_prompt(prefix: &str) -> String {
    format!(
        "{prefix}🏗️ Select the cement company:\n\n{}",
        options::numbered_with_other(SALES_CEMENT_COMPANIES)
    )
}

fn tmt_company_prompt(prefix: &str) -> String {
    format!(
        "{prefix}🔧 Select the TMT company:\n\n{}",
        options::numbered_with_other(SALES_TMT_COMPANIES)
    )
}

fn cement_qty_step(draft: SalesDraft) -> Turn {
    let company = draft.cement_company.clone().unwrap_or_default();
    ask(
        SalesStage::CementQty,
        draft,
        format!(
            "✅ Company: {company} selected\n\nEnter the quantity sold ({company} Cement):\n\n\
             Enter the quantity in bags (e.g., 100, 500, 1000)"
        ),
    )
}

fn tmt_sizes_step(draft: SalesDraft) -> Turn {
    let company = draft.tmt_company.clone().unwrap_or_default();
    ask(
        SalesStage::TmtSizes,
        draft,
        format!(
            "✅ Company: {company} selected\n\nSelect the TMT sizes sold (multiple selections allowed):\n\n{}\n\n\
             Enter the numbers separated by commas (e.g., 1,4,5,8)",
            options::numbered(TMT_SIZES)
        ),
    )
}

fn project_owner_step(draft: SalesDraft, prefix: &str) -> Turn {
    ask(
        SalesStage::ProjectOwner,
        draft,
        format!("{prefix}Now enter the project owner name:\n\nEnter the full name of the project owner/client"),
    )
}

fn completion_step(draft: SalesDraft, project: &str) -> Turn {
    ask(
        SalesStage::CompletionTime,
        draft,
        format!(
            "✅ Project: {project} recorded\n\nEnter estimated time of completion in years (e.g., 1, 2, 3, 5)"
        ),
    )
}

fn select_prompt(results: &[Project], prefix: &str) -> String {
    let listed = results
        .iter()
        .enumerate()
        .map(|(i, project)| format!("{}. {}", i + 1, project.summary()))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{prefix}🔍 Matching projects:\n\n{listed}\n0. None of these, enter manually")
}

fn summary(entry: &SalesEntry) -> String {
    let mut lines = Vec::new();
    if let Some(cement) = &entry.cement {
        lines.push(format!(
            "🏗️ Cement ({}): {} bags @ ₹{}/bag",
            cement.company, cement.quantity_bags, cement.price_per_bag
        ));
    }
    if let Some(tmt) = &entry.tmt {
        let sizes = tmt
            .lines
            .iter()
            .map(|l| format!("{}: {}kg @ ₹{}/kg", l.size, l.quantity_kg, l.price_per_kg))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!("🔧 TMT ({}): {sizes}", tmt.company));
    }
    format!(
        "✅ Sales Record Complete!\n\nThank you for providing your sales information.\n\n\
         📊 Summary:\n{}\n👤 Owner: {}\n🏗️ Project: {}\n⏱️ Completion: {} years\n📱 Contact: {}",
        lines.join("\n"),
        entry.project_owner,
        entry.project_name,
        entry.completion_years,
        entry.contact_number
    )
}
