use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::*;
use crate::extract::{ExtractedFields, MockExtractor};
use crate::model::Material;
use crate::projects::DirectoryError;

/// Feed `inputs` in order starting at the main menu.
async fn run(engine: &FlowEngine, platform: Platform, inputs: &[&str]) -> Vec<Turn> {
    let mut step = Step::Root;
    let mut turns = Vec::new();
    for input in inputs {
        let turn = engine.advance(platform, step, input).await;
        step = turn.next.clone();
        turns.push(turn);
    }
    turns
}

fn last(turns: &[Turn]) -> &Turn {
    turns.last().unwrap()
}

fn confident(suggested_step: &str, data: ExtractedFields) -> Extraction {
    Extraction {
        extracted: true,
        confidence: 0.9,
        data,
        suggested_step: suggested_step.to_string(),
    }
}

struct FailingDirectory;

#[async_trait]
impl ProjectDirectory for FailingDirectory {
    async fn search(&self, _query: &str) -> Result<Vec<Project>, DirectoryError> {
        Err(DirectoryError::Unavailable("connection refused".to_string()))
    }
}

fn project_directory() -> Arc<dyn ProjectDirectory> {
    Arc::new(StaticProjectDirectory::new(vec![Project {
        name: "Green Valley Residency".to_string(),
        location: Some("Beltola, Guwahati".to_string()),
        rera_id: Some("RERA/GHY/2023/0142".to_string()),
    }]))
}

// -- main menu --

#[tokio::test]
async fn test_root_menu_starts_each_flow() {
    let engine = FlowEngine::new();
    for (input, expected) in [("1", "buyer_material"), ("2", "company_name"), ("3", "item_type")] {
        let turn = engine.advance(Platform::Web, Step::Root, input).await;
        assert_eq!(turn.next.name(), expected);
        assert!(turn.action.is_none());
    }
}

#[tokio::test]
async fn test_root_menu_invalid_reprompts() {
    let engine = FlowEngine::new();
    let turn = engine.advance(Platform::Web, Step::Root, "4").await;
    assert_eq!(turn.next, Step::Root);
    assert!(turn.reply.text.contains("1 to buy materials"));
}

#[tokio::test]
async fn test_completed_falls_back_to_root() {
    let engine = FlowEngine::new();
    let turn = engine.advance(Platform::Telegram, Step::Completed, "hello").await;
    assert_eq!(turn.next, Step::Root);
    assert!(turn.reply.text.contains("Type /start"));
    assert!(turn.action.is_none());
}

// -- buyer flow --

#[tokio::test]
async fn test_buyer_both_materials_web_creates_inquiry() {
    let engine = FlowEngine::new();
    let turns = run(
        &engine,
        Platform::Web,
        &["1", "3", "Any", "3,1,1", "JSW", "2,5", "Guwahati", "50 bags", "9876543210"],
    )
    .await;

    let names: Vec<&str> = turns.iter().map(|t| t.next.name()).collect();
    assert_eq!(
        names,
        vec![
            "buyer_material",
            "cement_company",
            "cement_types",
            "tmt_company",
            "tmt_sizes",
            "city",
            "quantity",
            "phone",
            "completed",
        ]
    );

    let turn = last(&turns);
    let Some(Action::CreateInquiry(request)) = &turn.action else {
        panic!("expected create_inquiry, got {:?}", turn.action);
    };
    assert_eq!(request.material, MaterialChoice::Both);
    assert_eq!(request.city, "Guwahati");
    assert_eq!(request.quantity, "50 bags");
    assert_eq!(request.phone, "9876543210");
    assert_eq!(request.details.cement_company, None);
    assert_eq!(request.details.cement_types, vec!["OPC Grade 33", "OPC Grade 53"]);
    assert_eq!(request.details.tmt_company.as_deref(), Some("JSW"));
    assert_eq!(request.details.tmt_sizes, vec!["6mm", "12mm"]);
    assert!(turn.reply.text.contains("Cement Company: Any"));
}

#[tokio::test]
async fn test_multi_select_dedupes_in_option_order() {
    let engine = FlowEngine::new();
    let turns = run(&engine, Platform::Web, &["1", "1", "ACC", "3,1,1"]).await;
    let Step::Buyer(state) = &last(&turns).next else {
        panic!("expected buyer step");
    };
    assert_eq!(state.draft.cement_types, vec!["OPC Grade 33", "OPC Grade 53"]);
    assert_eq!(state.stage, BuyerStage::City);
}

#[tokio::test]
async fn test_custom_cement_type_is_appended() {
    let engine = FlowEngine::new();
    let turns = run(&engine, Platform::Web, &["1", "1", "ACC", "2,7"]).await;
    assert_eq!(last(&turns).next.name(), "custom_type");

    let turn = engine
        .advance(Platform::Web, last(&turns).next.clone(), "Slag Cement")
        .await;
    let Step::Buyer(state) = &turn.next else {
        panic!("expected buyer step");
    };
    assert_eq!(state.draft.cement_types, vec!["OPC Grade 43", "Slag Cement"]);
    assert_eq!(state.stage, BuyerStage::City);
}

#[tokio::test]
async fn test_web_city_resolves_location_pair() {
    let engine = FlowEngine::new();
    let turns = run(&engine, Platform::Web, &["1", "2", "", "4", "guwahati:beltola"]).await;
    let Step::Buyer(state) = &last(&turns).next else {
        panic!("expected buyer step");
    };
    assert_eq!(state.stage, BuyerStage::Quantity);
    assert_eq!(state.draft.city.as_deref(), Some("Guwahati"));
    assert_eq!(state.draft.locality.as_deref(), Some("Beltola"));
    assert_eq!(state.draft.tmt_company, None);
}

#[tokio::test]
async fn test_web_city_plain_text_is_title_cased() {
    let engine = FlowEngine::new();
    let turns = run(&engine, Platform::Web, &["1", "2", "JSW", "4", "new delhi"]).await;
    let Step::Buyer(state) = &last(&turns).next else {
        panic!("expected buyer step");
    };
    assert_eq!(state.draft.city.as_deref(), Some("New Delhi"));
    assert_eq!(state.draft.locality, None);
}

#[tokio::test]
async fn test_telegram_city_confirm_accept() {
    let engine = FlowEngine::new();
    let turns = run(&engine, Platform::Telegram, &["1", "1", "ACC", "1"]).await;
    assert_eq!(last(&turns).next.name(), "city_confirm");
    assert!(last(&turns).reply.text.contains("Guwahati"));

    let turn = engine
        .advance(Platform::Telegram, last(&turns).next.clone(), "yes")
        .await;
    let Step::Buyer(state) = &turn.next else {
        panic!("expected buyer step");
    };
    assert_eq!(state.stage, BuyerStage::Quantity);
    assert_eq!(state.draft.city.as_deref(), Some("Guwahati"));
}

#[tokio::test]
async fn test_telegram_city_confirm_decline_completes_without_inquiry() {
    let engine = FlowEngine::new();
    let turns = run(&engine, Platform::Telegram, &["1", "1", "ACC", "1", "2"]).await;
    let turn = last(&turns);
    assert_eq!(turn.next, Step::Completed);
    assert!(turn.action.is_none());
    assert!(turns.iter().all(|t| t.action.is_none()));
}

#[tokio::test]
async fn test_invalid_input_keeps_step_and_draft() {
    let engine = FlowEngine::new();
    let cases: &[(&[&str], &str)] = &[
        (&["1"], "9"),
        (&["1", "1"], "X"),
        (&["1", "1", "ACC"], "0,99,x"),
        (&["1", "2", "JSW"], "15"),
        (&["1", "1", "ACC", "1"], "A"),
        (&["1", "1", "ACC", "1", "Guwahati"], "   "),
        (&["1", "1", "ACC", "1", "Guwahati", "50 bags"], "987654321"),
        (&["1", "1", "ACC", "1", "Guwahati", "50 bags"], "98765-43210"),
        (&["2"], "A"),
        (&["2", "Sharma Traders"], "12345"),
        (&["2", "Sharma Traders", "9876543210", "Guwahati"], "4"),
        (&["3"], "cement please"),
        (&["3", "1"], "9"),
        (&["3", "1", "1"], "-5"),
        (&["3", "1", "1", "100"], "0"),
    ];

    for (setup, bad) in cases {
        let turns = run(&engine, Platform::Web, setup).await;
        let before = last(&turns).next.clone();
        let turn = engine.advance(Platform::Web, before.clone(), bad).await;
        assert_eq!(turn.next, before, "input {bad:?} at {} changed state", before.name());
        assert!(turn.action.is_none());
    }
}

#[tokio::test]
async fn test_phone_with_spaces_is_accepted() {
    let engine = FlowEngine::new();
    let turns = run(
        &engine,
        Platform::Web,
        &["1", "1", "ACC", "1", "Guwahati", "50 bags", "98765 43210"],
    )
    .await;
    let Some(Action::CreateInquiry(request)) = &last(&turns).action else {
        panic!("expected create_inquiry");
    };
    assert_eq!(request.phone, "9876543210");
    assert_eq!(request.material, MaterialChoice::Cement);
}

// -- vendor flow --

#[tokio::test]
async fn test_vendor_registration() {
    let engine = FlowEngine::new();
    let turns = run(
        &engine,
        Platform::Telegram,
        &["2", "Sharma Traders", "98765 43210", "guwahati", "3"],
    )
    .await;
    let turn = last(&turns);
    assert_eq!(turn.next, Step::Completed);
    let Some(Action::RegisterVendor(registration)) = &turn.action else {
        panic!("expected register_vendor");
    };
    assert_eq!(registration.company_name, "Sharma Traders");
    assert_eq!(registration.phone, "9876543210");
    assert_eq!(registration.city, "Guwahati");
    assert_eq!(registration.materials, vec![Material::Cement, Material::Tmt]);
}

// -- sales flow --

#[tokio::test]
async fn test_sales_both_with_per_size_loop() {
    let engine = FlowEngine::new();
    let turns = run(
        &engine,
        Platform::Telegram,
        &[
            "3", "3", "1", "100", "350", "5", "Kamdhenu", "3,4", "200", "300", "62.5", "61",
            "Mr Das", "2", "Green Valley", "2", "9876543210",
        ],
    )
    .await;

    let names: Vec<&str> = turns.iter().map(|t| t.next.name()).collect();
    assert_eq!(
        names,
        vec![
            "item_type",
            "cement_company_select",
            "cement_qty",
            "cement_price",
            "tmt_company_select",
            "tmt_company_custom",
            "tmt_sizes_select",
            "tmt_qty",
            "tmt_qty",
            "tmt_price",
            "tmt_price",
            "project_owner",
            "project_entry",
            "project_manual",
            "completion_time",
            "sales_contact",
            "completed",
        ]
    );

    let Some(Action::CreateSalesRecord(entry)) = &last(&turns).action else {
        panic!("expected create_sales_record");
    };
    assert_eq!(entry.sales_type, MaterialChoice::Both);
    let cement = entry.cement.as_ref().unwrap();
    assert_eq!(cement.company, "Ambuja");
    assert_eq!(cement.quantity_bags, 100);
    assert_eq!(cement.price_per_bag, 350.0);
    let tmt = entry.tmt.as_ref().unwrap();
    assert_eq!(tmt.company, "Kamdhenu");
    assert_eq!(tmt.lines.len(), 2);
    assert_eq!(tmt.lines[0].size, "8mm");
    assert_eq!(tmt.lines[0].quantity_kg, 200);
    assert_eq!(tmt.lines[0].price_per_kg, 62.5);
    assert_eq!(tmt.lines[1].size, "10mm");
    assert_eq!(tmt.lines[1].quantity_kg, 300);
    assert_eq!(tmt.lines[1].price_per_kg, 61.0);
    assert_eq!(entry.project_owner, "Mr Das");
    assert_eq!(entry.project_name, "Green Valley");
    assert_eq!(entry.project_rera_id, None);
    assert_eq!(entry.completion_years, 2);
    assert_eq!(entry.contact_number, "9876543210");
}

#[tokio::test]
async fn test_sales_project_search_select() {
    let engine = FlowEngine::new().with_projects(project_directory());
    let turns = run(
        &engine,
        Platform::Web,
        &["3", "1", "2", "50", "360", "Mrs Bora", "1", "green"],
    )
    .await;
    let turn = last(&turns);
    assert_eq!(turn.next.name(), "project_select");
    assert!(turn.reply.text.contains("1. Green Valley Residency"));
    assert!(turn.reply.text.contains("0. None of these"));

    let turn = engine.advance(Platform::Web, turn.next.clone(), "1").await;
    let Step::Sales(state) = &turn.next else {
        panic!("expected sales step");
    };
    assert_eq!(state.stage, SalesStage::CompletionTime);
    assert_eq!(state.draft.project_name.as_deref(), Some("Green Valley Residency"));
    assert_eq!(state.draft.project_rera_id.as_deref(), Some("RERA/GHY/2023/0142"));
}

#[tokio::test]
async fn test_sales_project_select_zero_goes_manual() {
    let engine = FlowEngine::new().with_projects(project_directory());
    let turns = run(
        &engine,
        Platform::Web,
        &["3", "1", "2", "50", "360", "Mrs Bora", "1", "green", "0"],
    )
    .await;
    assert_eq!(last(&turns).next.name(), "project_manual");
}

#[tokio::test]
async fn test_sales_project_search_without_hits_goes_manual() {
    let engine = FlowEngine::new().with_projects(project_directory());
    let turns = run(
        &engine,
        Platform::Web,
        &["3", "1", "2", "50", "360", "Mrs Bora", "1", "skyline"],
    )
    .await;
    let turn = last(&turns);
    assert_eq!(turn.next.name(), "project_manual");
    assert!(turn.reply.text.contains("No registered projects matched"));
}

#[tokio::test]
async fn test_sales_project_search_failure_goes_manual() {
    let engine = FlowEngine::new().with_projects(Arc::new(FailingDirectory));
    let turns = run(
        &engine,
        Platform::Web,
        &["3", "1", "2", "50", "360", "Mrs Bora", "1", "green"],
    )
    .await;
    let turn = last(&turns);
    assert_eq!(turn.next.name(), "project_manual");
    assert!(turn.reply.text.contains("unavailable"));
}

// -- AI assist --

#[tokio::test]
async fn test_assist_buyer_confirm_then_resume() {
    let extractor = Arc::new(MockExtractor::new().with_result(confident(
        "confirm",
        ExtractedFields {
            material: Some("cement".to_string()),
            city: Some("guwahati".to_string()),
            quantity: Some("100 bags".to_string()),
            ..ExtractedFields::default()
        },
    )));
    let engine = FlowEngine::new().with_extractor(extractor.clone());

    let start = engine.advance(Platform::Web, Step::Root, "1").await;
    let turn = engine
        .advance(Platform::Web, start.next, "I need 100 bags cement in Guwahati")
        .await;
    assert_eq!(turn.next.name(), "buyer_confirm");
    assert!(turn.reply.text.contains("Cement in Guwahati"));

    let turn = engine.advance(Platform::Web, turn.next, "yes").await;
    let Step::Buyer(state) = &turn.next else {
        panic!("expected buyer step");
    };
    assert_eq!(state.stage, BuyerStage::CementCompany);
    assert_eq!(state.draft.city.as_deref(), Some("Guwahati"));
    assert_eq!(state.draft.quantity.as_deref(), Some("100 bags"));

    // Root and the confirmation stage never consult the extractor.
    assert_eq!(extractor.calls(), vec!["buyer_material"]);
}

#[tokio::test]
async fn test_assist_confirm_no_restarts_with_empty_draft() {
    let extractor = Arc::new(MockExtractor::new().with_result(confident(
        "confirm",
        ExtractedFields {
            material: Some("tmt".to_string()),
            city: Some("Guwahati".to_string()),
            ..ExtractedFields::default()
        },
    )));
    let engine = FlowEngine::new().with_extractor(extractor);

    let turns = run(&engine, Platform::Web, &["1", "need tmt in guwahati", "no"]).await;
    assert_eq!(
        last(&turns).next,
        Step::Buyer(BuyerState::new(BuyerStage::Material, BuyerDraft::default()))
    );
}

#[tokio::test]
async fn test_assist_vendor_confirm_completes() {
    let extractor = Arc::new(MockExtractor::new().with_result(confident(
        "vendor_confirm",
        ExtractedFields {
            vendor_name: Some("Sharma Traders".to_string()),
            vendor_phone: Some("98765 43210".to_string()),
            city: Some("Guwahati".to_string()),
            materials: Some(vec!["cement".to_string(), "tmt".to_string()]),
            ..ExtractedFields::default()
        },
    )));
    let engine = FlowEngine::new().with_extractor(extractor);

    let turns = run(
        &engine,
        Platform::Telegram,
        &["2", "I am Sharma Traders, I supply cement and tmt in Guwahati, 9876543210", "yes"],
    )
    .await;
    assert_eq!(turns[1].next.name(), "vendor_confirm");
    let Some(Action::RegisterVendor(registration)) = &last(&turns).action else {
        panic!("expected register_vendor");
    };
    assert_eq!(registration.company_name, "Sharma Traders");
    assert_eq!(registration.phone, "9876543210");
    assert_eq!(registration.materials, vec![Material::Cement, Material::Tmt]);
}

#[tokio::test]
async fn test_assist_low_confidence_falls_through() {
    let mut weak = confident(
        "confirm",
        ExtractedFields {
            material: Some("cement".to_string()),
            city: Some("Guwahati".to_string()),
            ..ExtractedFields::default()
        },
    );
    weak.confidence = 0.5;
    let engine = FlowEngine::new().with_extractor(Arc::new(MockExtractor::new().with_result(weak)));

    let turns = run(&engine, Platform::Web, &["1", "1"]).await;
    assert_eq!(last(&turns).next.name(), "cement_company");
}

#[tokio::test]
async fn test_assist_timeout_falls_through() {
    let extractor = MockExtractor::new()
        .with_delay(Duration::from_millis(200))
        .with_result(confident(
            "confirm",
            ExtractedFields {
                material: Some("cement".to_string()),
                city: Some("Guwahati".to_string()),
                ..ExtractedFields::default()
            },
        ));
    let engine = FlowEngine::new()
        .with_extractor(Arc::new(extractor))
        .with_extraction_timeout(Duration::from_millis(10));

    let turns = run(&engine, Platform::Web, &["1", "2"]).await;
    assert_eq!(last(&turns).next.name(), "tmt_company");
}

#[tokio::test]
async fn test_assist_get_city_uses_platform_stage() {
    let extractor = Arc::new(MockExtractor::new().with_result(confident(
        "get_city",
        ExtractedFields {
            material: Some("both".to_string()),
            ..ExtractedFields::default()
        },
    )));
    let engine = FlowEngine::new().with_extractor(extractor);

    let turns = run(&engine, Platform::Telegram, &["1", "cement and steel please"]).await;
    assert_eq!(last(&turns).next.name(), "city_confirm");
}

#[tokio::test]
async fn test_sales_flow_skips_assist() {
    let extractor = Arc::new(MockExtractor::new());
    let engine = FlowEngine::new().with_extractor(extractor.clone());
    run(&engine, Platform::Web, &["3", "1", "2"]).await;
    assert!(extractor.calls().is_empty());
}
