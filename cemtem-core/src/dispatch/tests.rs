use std::collections::HashSet;

use super::*;
use crate::model::MaterialDetails;
use crate::outbound::RecordingChannel;
use crate::rates::parse_rate_message;
use crate::storage::MemoryStorage;

struct Harness {
    storage: Arc<MemoryStorage>,
    telegram: Arc<RecordingChannel>,
    web: Arc<RecordingChannel>,
    dispatcher: Dispatcher,
}

fn harness_with(telegram: RecordingChannel, config: DispatchConfig) -> Harness {
    let storage = Arc::new(MemoryStorage::new());
    let telegram = Arc::new(telegram);
    let web = Arc::new(RecordingChannel::new());
    let outbound = Outbound::new()
        .with_channel(Platform::Telegram, telegram.clone())
        .with_channel(Platform::Web, web.clone());
    let dispatcher = Dispatcher::new(storage.clone(), outbound, config);
    Harness {
        storage,
        telegram,
        web,
        dispatcher,
    }
}

fn harness() -> Harness {
    harness_with(RecordingChannel::new(), DispatchConfig::default())
}

fn vendor(id: &str, telegram_id: Option<&str>, materials: Vec<Material>) -> Vendor {
    Vendor {
        vendor_id: id.to_string(),
        name: format!("Vendor {}", id),
        phone: "9876500000".to_string(),
        city: "Guwahati".to_string(),
        materials,
        telegram_id: telegram_id.map(str::to_string),
        is_active: true,
        last_quoted: None,
        created_at: Utc::now(),
    }
}

fn request(material: MaterialChoice) -> InquiryRequest {
    InquiryRequest {
        material,
        details: MaterialDetails {
            cement_company: Some("ACC".to_string()),
            cement_types: vec!["OPC Grade 53".to_string()],
            tmt_company: None,
            tmt_sizes: vec!["8mm".to_string()],
        },
        city: "guwahati".to_string(),
        locality: None,
        quantity: "50 bags".to_string(),
        phone: "9876543210".to_string(),
    }
}

fn stored_inquiry(id: &str, contact: &Identity, material: MaterialChoice) -> Inquiry {
    Inquiry {
        inquiry_id: id.to_string(),
        user_name: "Web User".to_string(),
        user_contact: contact.id.clone(),
        buyer_phone: "9876543210".to_string(),
        city: "Guwahati".to_string(),
        locality: None,
        material,
        details: MaterialDetails::default(),
        quantity: "50 bags".to_string(),
        brand: None,
        vendors_contacted: vec!["VEN-1".to_string()],
        response_count: 0,
        status: InquiryStatus::Pending,
        platform: contact.platform,
        created_at: Utc::now(),
    }
}

// -- ids --

#[test]
fn test_id_generator_is_strictly_monotonic() {
    let ids = IdGenerator::new();
    let values: Vec<i64> = (0..1000).map(|_| ids.next_millis()).collect();
    assert!(values.windows(2).all(|w| w[0] < w[1]));
    assert!(ids.inquiry_id().starts_with("INQ-"));
    assert!(ids.vendor_id().starts_with("VEN-"));
}

// -- create_inquiry --

#[tokio::test]
async fn test_inquiry_for_both_runs_two_rounds() {
    let h = harness();
    for v in [
        vendor("VEN-1", Some("101"), vec![Material::Cement]),
        vendor("VEN-2", Some("102"), vec![Material::Tmt]),
        vendor("VEN-3", Some("103"), vec![Material::Cement, Material::Tmt]),
        vendor("VEN-4", None, vec![Material::Cement]),
    ] {
        h.storage.create_vendor(&v).await.unwrap();
    }

    let buyer = Identity::web("sess-1");
    let inquiry = h
        .dispatcher
        .create_inquiry(&buyer, None, request(MaterialChoice::Both))
        .await
        .unwrap();

    assert!(inquiry.inquiry_id.starts_with("INQ-"));
    assert_eq!(inquiry.material, MaterialChoice::Both);
    assert_eq!(inquiry.user_contact, "sess-1");
    assert_eq!(inquiry.user_name, "Web User");
    assert_eq!(inquiry.brand.as_deref(), Some("ACC"));
    let contacted: HashSet<&str> = inquiry.vendors_contacted.iter().map(String::as_str).collect();
    assert_eq!(contacted, HashSet::from(["VEN-1", "VEN-2", "VEN-3", "VEN-4"]));
    assert_eq!(inquiry.vendors_contacted.len(), 4);

    // One alert per Telegram-addressable vendor, even when matched twice.
    let sent = h.telegram.sent();
    let recipients: HashSet<&str> = sent.iter().map(|(to, _)| to.as_str()).collect();
    assert_eq!(recipients, HashSet::from(["101", "102", "103"]));
    assert_eq!(sent.len(), 3);

    let both_alert = &h.telegram.sent_to("103")[0];
    assert!(both_alert.text.contains("Material: Cement & TMT Bars"));
    assert!(both_alert.text.contains(&format!("Inquiry ID: {}", inquiry.inquiry_id)));
    assert_eq!(
        both_alert.buttons[0].data,
        format!("rate_custom_{}", inquiry.inquiry_id)
    );
    assert!(h.telegram.sent_to("102")[0].text.contains("Material: TMT Bars"));

    let stored = h.storage.get_inquiry_by_id(&inquiry.inquiry_id).await.unwrap();
    assert_eq!(stored, Some(inquiry));
    assert!(h.storage.vendors().await.iter().all(|v| v.last_quoted.is_some()));

    let notifications = h.storage.notifications().await;
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::InquiryCreated);
}

#[tokio::test]
async fn test_inquiry_caps_vendors_per_round() {
    let h = harness();
    for i in 0..5 {
        let id = format!("VEN-{}", i);
        let chat = format!("{}", 200 + i);
        h.storage
            .create_vendor(&vendor(&id, Some(&chat), vec![Material::Cement]))
            .await
            .unwrap();
    }

    let inquiry = h
        .dispatcher
        .create_inquiry(&Identity::telegram(9), Some("Asha"), request(MaterialChoice::Cement))
        .await
        .unwrap();
    assert_eq!(inquiry.vendors_contacted.len(), 3);
    assert_eq!(inquiry.user_name, "Asha");
    assert_eq!(h.telegram.sent().len(), 3);
}

#[tokio::test]
async fn test_inquiry_without_vendors_still_persists() {
    let h = harness();
    let inquiry = h
        .dispatcher
        .create_inquiry(&Identity::telegram(9), None, request(MaterialChoice::Tmt))
        .await
        .unwrap();
    assert!(inquiry.vendors_contacted.is_empty());
    assert!(h.telegram.sent().is_empty());
    assert_eq!(h.storage.inquiries().await.len(), 1);
}

#[tokio::test]
async fn test_failed_alert_does_not_fail_inquiry() {
    let h = harness_with(
        RecordingChannel::new().failing_for("101"),
        DispatchConfig::default(),
    );
    h.storage
        .create_vendor(&vendor("VEN-1", Some("101"), vec![Material::Cement]))
        .await
        .unwrap();
    h.storage
        .create_vendor(&vendor("VEN-2", Some("102"), vec![Material::Cement]))
        .await
        .unwrap();

    let result = h
        .dispatcher
        .create_inquiry(&Identity::web("sess-1"), None, request(MaterialChoice::Cement))
        .await;
    assert!(result.is_ok());
    assert_eq!(h.telegram.sent_to("102").len(), 1);
}

// -- register_vendor / sales --

#[tokio::test]
async fn test_register_vendor_from_telegram_sets_chat_id() {
    let h = harness();
    let registration = VendorRegistration {
        company_name: "Sharma Traders".to_string(),
        phone: "9876543210".to_string(),
        city: "Guwahati".to_string(),
        materials: vec![Material::Cement],
    };

    let vendor = h
        .dispatcher
        .register_vendor(&Identity::telegram(555), registration.clone())
        .await
        .unwrap();
    assert!(vendor.vendor_id.starts_with("VEN-"));
    assert_eq!(vendor.telegram_id.as_deref(), Some("555"));
    assert!(vendor.is_active);

    let web_vendor = h
        .dispatcher
        .register_vendor(&Identity::web("sess-2"), registration)
        .await
        .unwrap();
    assert_eq!(web_vendor.telegram_id, None);
    assert_ne!(web_vendor.vendor_id, vendor.vendor_id);

    let kinds: Vec<NotificationKind> =
        h.storage.notifications().await.iter().map(|n| n.kind).collect();
    assert_eq!(kinds, vec![NotificationKind::VendorRegistered; 2]);
}

#[tokio::test]
async fn test_sales_record_is_attributed() {
    let h = harness();
    let entry = SalesEntry {
        sales_type: MaterialChoice::Cement,
        cement: None,
        tmt: None,
        project_owner: "Mr Das".to_string(),
        project_name: "Green Valley".to_string(),
        project_rera_id: None,
        completion_years: 2,
        contact_number: "9876543210".to_string(),
    };

    h.dispatcher
        .execute(&Identity::telegram(7), None, Action::CreateSalesRecord(entry.clone()))
        .await
        .unwrap();

    let records = h.storage.sales_records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].recorded_by, "telegram:7");
    assert_eq!(records[0].entry, entry);
}

// -- quotes --

#[tokio::test]
async fn test_free_text_quote_is_recorded_and_forwarded() {
    let h = harness();
    h.storage
        .create_vendor(&vendor("VEN-1", Some("101"), vec![Material::Cement]))
        .await
        .unwrap();
    let buyer = Identity::web("sess-1");
    h.storage
        .create_inquiry(&stored_inquiry("INQ-1700000000000", &buyer, MaterialChoice::Both))
        .await
        .unwrap();

    let quote = parse_rate_message(
        "RATE: 350 per bag\nGST: 18%\nDELIVERY: 500\nInquiry ID: INQ-1700000000000",
    )
    .unwrap();
    let reply = h
        .dispatcher
        .record_quote(&Identity::telegram(101), &quote)
        .await
        .unwrap();
    assert!(reply.text.contains("Your quote has been received"));
    assert!(reply.text.contains("₹350 per bag"));

    let responses = h
        .storage
        .list_price_responses("INQ-1700000000000")
        .await
        .unwrap();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].price, "350");
    assert_eq!(responses[0].gst, "18");
    assert_eq!(responses[0].delivery_charge, "500");
    assert_eq!(responses[0].vendor_id, "VEN-1");
    // Vendor only supplies cement out of a `both` inquiry.
    assert_eq!(responses[0].material, MaterialChoice::Cement);

    let inquiry = h
        .storage
        .get_inquiry_by_id("INQ-1700000000000")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(inquiry.response_count, 1);
    assert_eq!(inquiry.status, InquiryStatus::Responded);

    let forwarded = h.web.sent_to("sess-1");
    assert_eq!(forwarded.len(), 1);
    assert!(forwarded[0].text.contains("Vendor VEN-1"));
    assert!(forwarded[0].text.contains("GST: 18%"));

    let kinds: Vec<NotificationKind> =
        h.storage.notifications().await.iter().map(|n| n.kind).collect();
    assert_eq!(kinds, vec![NotificationKind::VendorQuoteReceived]);
}

#[tokio::test]
async fn test_quote_from_unregistered_chat() {
    let h = harness();
    let quote = RateQuote {
        inquiry_id: "INQ-42".to_string(),
        rate: "250".to_string(),
        unit: None,
        gst: "18".to_string(),
        delivery: "400".to_string(),
    };

    let err = h
        .dispatcher
        .record_quote(&Identity::telegram(999), &quote)
        .await
        .unwrap_err();
    assert!(matches!(err, QuoteError::UnknownVendor(_)));

    let reply = h
        .dispatcher
        .submit_quote(&Identity::telegram(999), &quote)
        .await
        .unwrap();
    assert!(reply.text.contains("Register As A Vendor"));
}

#[tokio::test]
async fn test_web_identity_never_matches_vendor() {
    let h = harness();
    h.storage
        .create_vendor(&vendor("VEN-1", Some("101"), vec![Material::Cement]))
        .await
        .unwrap();
    let buyer = Identity::web("sess-1");
    h.storage
        .create_inquiry(&stored_inquiry("INQ-42", &buyer, MaterialChoice::Cement))
        .await
        .unwrap();
    let quote = RateQuote {
        inquiry_id: "INQ-42".to_string(),
        rate: "1".to_string(),
        unit: Some("bag".to_string()),
        gst: "0".to_string(),
        delivery: "0".to_string(),
    };

    let err = h
        .dispatcher
        .record_quote(&Identity::web("101"), &quote)
        .await
        .unwrap_err();
    assert!(matches!(err, QuoteError::UnknownVendor(_)));
    assert!(h.storage.list_price_responses("INQ-42").await.unwrap().is_empty());
    assert!(h.web.sent().is_empty());
}

#[tokio::test]
async fn test_quote_for_unknown_inquiry_respects_policy() {
    let quote = RateQuote {
        inquiry_id: "INQ-42".to_string(),
        rate: "250".to_string(),
        unit: None,
        gst: "18".to_string(),
        delivery: "400".to_string(),
    };

    let h = harness();
    h.storage
        .create_vendor(&vendor("VEN-1", Some("101"), vec![Material::Cement]))
        .await
        .unwrap();
    let err = h
        .dispatcher
        .record_quote(&Identity::telegram(101), &quote)
        .await
        .unwrap_err();
    assert!(matches!(err, QuoteError::UnknownInquiry(ref id) if id == "INQ-42"));
    let reply = h.dispatcher.submit_quote(&Identity::telegram(101), &quote).await;
    assert!(reply.unwrap().text.contains("INQ-42"));

    let silent = harness_with(
        RecordingChannel::new(),
        DispatchConfig {
            notify_missing_quote_target: false,
            ..DispatchConfig::default()
        },
    );
    silent
        .storage
        .create_vendor(&vendor("VEN-1", Some("101"), vec![Material::Cement]))
        .await
        .unwrap();
    assert!(
        silent
            .dispatcher
            .submit_quote(&Identity::telegram(101), &quote)
            .await
            .is_none()
    );
}
