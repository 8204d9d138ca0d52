//! Conversation flow engine.
//!
//! A turn maps `(step, platform, text)` to a reply, the next step and an
//! optional completion action. Step handlers are synchronous and pure; the
//! only awaits are the AI-assist extraction and the project search, both done
//! up front by [`FlowEngine::advance`].

pub mod options;
pub mod step;
pub mod validate;

mod assist;
mod buyer;
mod sales;
mod vendor;

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::Duration;

pub use step::{
    BuyerDraft, BuyerStage, BuyerState, SalesDraft, SalesStage, SalesState, Step, VendorDraft,
    VendorStage, VendorState,
};

use crate::config::ExtractionConfig;
use crate::extract::{DisabledExtractor, Extraction, Extractor};
use crate::identity::Platform;
use crate::location::LocationCatalog;
use crate::model::{InquiryRequest, MaterialChoice, SalesEntry, VendorRegistration};
use crate::projects::{Project, ProjectDirectory, StaticProjectDirectory};
use crate::reply::Reply;

/// Side effect requested when a flow completes.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Persist an inquiry and alert matching vendors.
    CreateInquiry(InquiryRequest),
    /// Persist a vendor.
    RegisterVendor(VendorRegistration),
    /// Persist a sales record.
    CreateSalesRecord(SalesEntry),
}

impl Action {
    /// Action name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Action::CreateInquiry(_) => "create_inquiry",
            Action::RegisterVendor(_) => "register_vendor",
            Action::CreateSalesRecord(_) => "create_sales_record",
        }
    }
}

/// Outcome of one message.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    /// What to send back.
    pub reply: Reply,
    /// Step to store for the next message.
    pub next: Step,
    /// Completion action, if the flow just finished.
    pub action: Option<Action>,
}

impl Turn {
    pub(crate) fn new(next: Step, text: impl Into<String>) -> Self {
        Self {
            reply: Reply::text(text),
            next,
            action: None,
        }
    }

    #[must_use]
    pub(crate) fn with_action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }
}

/// Per-call inputs besides the step and text.
#[derive(Debug, Clone, Copy)]
pub struct FlowContext<'a> {
    /// Platform the message arrived on.
    pub platform: Platform,
    /// Served locations.
    pub locations: &'a LocationCatalog,
}

/// Result of the project search done before a `project_search` step.
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectLookup {
    /// Matching projects (possibly none).
    Hits(Vec<Project>),
    /// The directory could not be queried.
    Unavailable,
}

/// Main menu.
pub fn welcome() -> Reply {
    Reply::text(
        "🏗️ Welcome to CemTemBot!\n\n\
         I help you get instant pricing for cement and TMT bars from verified vendors in your city.\n\n\
         Reply with the number of an option:\n1 Buy Materials\n2 Register As A Vendor\n3 Record Sales",
    )
}

/// Usage text for `/help`.
pub fn help() -> Reply {
    Reply::text(
        "CemTemBot commands:\n\
         /start - start over from the main menu\n\
         /help - show this message\n\n\
         Vendors can quote by replying to an inquiry with:\n\
         RATE: 350 per bag\nGST: 18%\nDELIVERY: 500\nInquiry ID: INQ-...\n\n\
         or by tapping \"Enter rate\" under the inquiry.",
    )
}

/// Reply for messages no step claims. Resets to the main menu.
pub fn fallback() -> Turn {
    Turn::new(
        Step::Root,
        "I didn't understand that. Type /start to begin again.",
    )
}

/// Run one step of the structured flow, without AI assist.
///
/// `lookup` carries the project search result when `step` is the sales
/// `project_search` stage; it is ignored everywhere else.
pub fn advance(
    step: Step,
    text: &str,
    ctx: &FlowContext<'_>,
    lookup: Option<ProjectLookup>,
) -> Turn {
    match step {
        Step::Root => root(text),
        Step::Buyer(state) => buyer::advance(state, text, ctx),
        Step::Vendor(state) => vendor::advance(state, text),
        Step::Sales(state) => sales::advance(state, text, lookup),
        Step::Completed => fallback(),
    }
}

fn root(text: &str) -> Turn {
    match validate::menu_choice(text, 3) {
        Some(0) => buyer::start(),
        Some(1) => vendor::start(),
        Some(_) => sales::start(),
        None => Turn::new(
            Step::Root,
            "Please reply with 1 to buy materials, 2 to register as a vendor or 3 to record sales.",
        ),
    }
}

/// `1`/`2`/`3` or the material's name.
fn material_choice(text: &str) -> Option<MaterialChoice> {
    match validate::menu_choice(text, 3) {
        Some(0) => Some(MaterialChoice::Cement),
        Some(1) => Some(MaterialChoice::Tmt),
        Some(_) => Some(MaterialChoice::Both),
        None => MaterialChoice::parse(text),
    }
}

/// Default minimum confidence for an AI suggestion to redirect the flow.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Default upper bound for one extraction call.
pub const DEFAULT_EXTRACTION_TIMEOUT: Duration = Duration::from_secs(8);

/// Structured flows plus the AI-assist overlay and project search.
pub struct FlowEngine {
    extractor: Arc<dyn Extractor>,
    projects: Arc<dyn ProjectDirectory>,
    locations: LocationCatalog,
    confidence_threshold: f64,
    extraction_timeout: Duration,
}

impl Default for FlowEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowEngine {
    /// Engine with AI assist disabled and an empty project directory.
    pub fn new() -> Self {
        Self {
            extractor: Arc::new(DisabledExtractor),
            projects: Arc::new(StaticProjectDirectory::default()),
            locations: LocationCatalog::new(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            extraction_timeout: DEFAULT_EXTRACTION_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = extractor;
        self
    }

    #[must_use]
    pub fn with_projects(mut self, projects: Arc<dyn ProjectDirectory>) -> Self {
        self.projects = projects;
        self
    }

    #[must_use]
    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_extraction_timeout(mut self, timeout: Duration) -> Self {
        self.extraction_timeout = timeout;
        self
    }

    /// Apply the `[extraction]` threshold and timeout.
    #[must_use]
    pub fn with_extraction_config(self, config: &ExtractionConfig) -> Self {
        self.with_confidence_threshold(config.confidence_threshold)
            .with_extraction_timeout(Duration::from_secs(config.timeout_secs))
    }

    /// Served locations.
    pub fn locations(&self) -> &LocationCatalog {
        &self.locations
    }

    /// Process one message at `step`.
    pub async fn advance(&self, platform: Platform, step: Step, text: &str) -> Turn {
        let ctx = FlowContext {
            platform,
            locations: &self.locations,
        };
        let from = step.name();

        if assist::eligible(&step) {
            let extraction = self.extract(text, from).await;
            if extraction.is_confident(self.confidence_threshold)
                && let Some(turn) = assist::apply(&step, &extraction, &ctx)
            {
                tracing::debug!(
                    from,
                    to = turn.next.name(),
                    confidence = extraction.confidence,
                    "AI assist redirected flow"
                );
                return turn;
            }
        }

        let lookup = self.lookup_projects(&step, text).await;
        let turn = advance(step, text, &ctx, lookup);
        tracing::debug!(from, to = turn.next.name(), "step transition");
        turn
    }

    async fn extract(&self, text: &str, step: &str) -> Extraction {
        match tokio::time::timeout(self.extraction_timeout, self.extractor.extract(text, step)).await
        {
            Ok(extraction) => extraction,
            Err(_) => {
                tracing::warn!(step, "AI extraction timed out");
                Extraction::none(step)
            }
        }
    }

    async fn lookup_projects(&self, step: &Step, text: &str) -> Option<ProjectLookup> {
        let Step::Sales(state) = step else {
            return None;
        };
        if !matches!(state.stage, SalesStage::ProjectSearch) {
            return None;
        }
        let query = validate::min_text(text)?;
        match self.projects.search(&query).await {
            Ok(hits) => Some(ProjectLookup::Hits(hits)),
            Err(e) => {
                tracing::warn!(error = %e, "project search failed");
                Some(ProjectLookup::Unavailable)
            }
        }
    }
}
