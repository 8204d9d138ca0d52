//! Vendor rate collection.
//!
//! Vendors answer an inquiry alert either with one free-text message carrying
//! the `RATE:` / `GST:` / `DELIVERY:` / `Inquiry ID:` fields, or by pressing
//! the alert's "Enter rate" button and answering three prompts.

use std::sync::LazyLock;

use regex::Regex;

use crate::reply::Reply;

/// Callback payload prefix of the "Enter rate" button.
pub const RATE_CALLBACK_PREFIX: &str = "rate_custom_";

/// Highest GST percentage accepted in guided entry.
pub const MAX_GST_PERCENT: f64 = 30.0;

static RATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)RATE:\s*([0-9]+(?:\.[0-9]+)?)\s*per\s*(\w+)").expect("rate pattern is valid")
});
static GST_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)GST:\s*([0-9]+(?:\.[0-9]+)?)%").expect("gst pattern is valid")
});
static DELIVERY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)DELIVERY:\s*([0-9]+(?:\.[0-9]+)?)").expect("delivery pattern is valid")
});
static INQUIRY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Inquiry ID:\s*(INQ-[0-9]+)").expect("inquiry pattern is valid")
});
static INQUIRY_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^INQ-[0-9]+$").expect("inquiry id pattern is valid"));

/// A complete vendor quote, from either entry path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateQuote {
    /// Inquiry being quoted.
    pub inquiry_id: String,
    /// Rate as written by the vendor.
    pub rate: String,
    /// Unit of the rate ("bag", "kg"), when given.
    pub unit: Option<String>,
    /// GST percentage, `"0"` when not given.
    pub gst: String,
    /// Delivery charge, `"0"` when not given.
    pub delivery: String,
}

impl RateQuote {
    /// "₹350 per bag" or "₹350".
    pub fn rate_display(&self) -> String {
        match &self.unit {
            Some(unit) => format!("₹{} per {}", self.rate, unit),
            None => format!("₹{}", self.rate),
        }
    }
}

/// Parse a free-text quote.
///
/// The rate and inquiry id are required; GST and delivery default to `"0"`.
pub fn parse_rate_message(text: &str) -> Option<RateQuote> {
    let rate = RATE_PATTERN.captures(text)?;
    let inquiry = INQUIRY_PATTERN.captures(text)?;
    let capture = |re: &Regex| {
        re.captures(text)
            .and_then(|c| c.get(1))
            .map_or_else(|| "0".to_string(), |m| m.as_str().to_string())
    };

    Some(RateQuote {
        inquiry_id: inquiry[1].to_uppercase(),
        rate: rate[1].to_string(),
        unit: Some(rate[2].to_string()),
        gst: capture(&GST_PATTERN),
        delivery: capture(&DELIVERY_PATTERN),
    })
}

/// Inquiry id carried by an "Enter rate" callback, if `data` is one.
pub fn parse_rate_callback(data: &str) -> Option<String> {
    let inquiry_id = data.strip_prefix(RATE_CALLBACK_PREFIX)?;
    INQUIRY_ID
        .is_match(inquiry_id)
        .then(|| inquiry_id.to_string())
}

/// Callback payload for the "Enter rate" button of `inquiry_id`.
pub fn rate_callback_data(inquiry_id: &str) -> String {
    format!("{}{}", RATE_CALLBACK_PREFIX, inquiry_id)
}

/// Field a guided rate entry is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateField {
    /// Price per unit, must be positive.
    Rate,
    /// GST percentage, 0 to 30.
    Gst,
    /// Delivery charge, zero or more.
    Delivery,
}

impl RateField {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            RateField::Rate => "rate",
            RateField::Gst => "gst",
            RateField::Delivery => "delivery",
        }
    }

    fn prompt(&self, inquiry_id: &str) -> String {
        match self {
            RateField::Rate => format!(
                "💰 Enter your rate for {} (price per unit in ₹, e.g. 350):",
                inquiry_id
            ),
            RateField::Gst => "📊 Enter GST percentage (0 to 30, e.g. 18):".to_string(),
            RateField::Delivery => {
                "🚚 Enter delivery charges in ₹ (0 if free delivery):".to_string()
            }
        }
    }

    fn invalid(&self) -> &'static str {
        match self {
            RateField::Rate => "Please enter a valid rate greater than 0 (e.g. 350).",
            RateField::Gst => "Please enter a GST percentage between 0 and 30 (e.g. 18).",
            RateField::Delivery => "Please enter a valid delivery charge, 0 or more (e.g. 500).",
        }
    }

    /// Normalised value if `text` is acceptable for this field.
    fn accept(&self, text: &str) -> Option<String> {
        let cleaned: String = text
            .trim()
            .trim_start_matches('₹')
            .trim_end_matches('%')
            .chars()
            .filter(|c| !c.is_whitespace() && *c != ',')
            .collect();
        let value: f64 = cleaned.parse().ok()?;
        if !value.is_finite() {
            return None;
        }
        let ok = match self {
            RateField::Rate => value > 0.0,
            RateField::Gst => (0.0..=MAX_GST_PERCENT).contains(&value),
            RateField::Delivery => value >= 0.0,
        };
        ok.then_some(cleaned)
    }
}

/// Guided rate entry in progress for one vendor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateEntry {
    /// Next field to collect.
    pub waiting_for: RateField,
    /// Inquiry being quoted.
    pub inquiry_id: String,
    /// Rate collected so far.
    pub rate: Option<String>,
    /// GST collected so far.
    pub gst: Option<String>,
}

/// Outcome of feeding one message to a [`RateEntry`].
#[derive(Debug, Clone, PartialEq)]
pub enum RateProgress {
    /// More input needed; send the reply and keep the entry.
    Continue(RateEntry, Reply),
    /// All three fields collected.
    Complete(RateQuote),
}

impl RateEntry {
    /// Start guided entry for `inquiry_id`, returning the first prompt.
    pub fn start(inquiry_id: impl Into<String>) -> (Self, Reply) {
        let entry = Self {
            waiting_for: RateField::Rate,
            inquiry_id: inquiry_id.into(),
            rate: None,
            gst: None,
        };
        let reply = Reply::text(entry.waiting_for.prompt(&entry.inquiry_id));
        (entry, reply)
    }

    /// Feed one message. Invalid input re-prompts the same field unchanged.
    pub fn advance(self, text: &str) -> RateProgress {
        let Some(value) = self.waiting_for.accept(text) else {
            let reply = Reply::text(format!(
                "{}\n\n{}",
                self.waiting_for.invalid(),
                self.waiting_for.prompt(&self.inquiry_id)
            ));
            return RateProgress::Continue(self, reply);
        };

        match self.waiting_for {
            RateField::Rate => {
                let next = Self {
                    waiting_for: RateField::Gst,
                    rate: Some(value),
                    ..self
                };
                let reply = Reply::text(next.waiting_for.prompt(&next.inquiry_id));
                RateProgress::Continue(next, reply)
            }
            RateField::Gst => {
                let next = Self {
                    waiting_for: RateField::Delivery,
                    gst: Some(value),
                    ..self
                };
                let reply = Reply::text(next.waiting_for.prompt(&next.inquiry_id));
                RateProgress::Continue(next, reply)
            }
            RateField::Delivery => RateProgress::Complete(RateQuote {
                inquiry_id: self.inquiry_id,
                rate: self.rate.unwrap_or_else(|| "0".to_string()),
                unit: None,
                gst: self.gst.unwrap_or_else(|| "0".to_string()),
                delivery: value,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_rate_message() {
        let text = "RATE: 350 per bag\nGST: 18%\nDELIVERY: 500\n\nInquiry ID: INQ-1700000000000";
        let quote = parse_rate_message(text).unwrap();
        assert_eq!(quote.inquiry_id, "INQ-1700000000000");
        assert_eq!(quote.rate, "350");
        assert_eq!(quote.unit.as_deref(), Some("bag"));
        assert_eq!(quote.gst, "18");
        assert_eq!(quote.delivery, "500");
    }

    #[test]
    fn test_parse_rate_message_defaults_and_case() {
        let quote = parse_rate_message("rate: 62.5 per kg inquiry id: inq-42").unwrap();
        assert_eq!(quote.inquiry_id, "INQ-42");
        assert_eq!(quote.rate, "62.5");
        assert_eq!(quote.gst, "0");
        assert_eq!(quote.delivery, "0");
        assert_eq!(quote.rate_display(), "₹62.5 per kg");
    }

    #[test]
    fn test_parse_rate_message_requires_rate_and_inquiry() {
        assert!(parse_rate_message("RATE: 350 per bag").is_none());
        assert!(parse_rate_message("GST: 18% Inquiry ID: INQ-1").is_none());
        assert!(parse_rate_message("hello").is_none());
    }

    #[test]
    fn test_parse_rate_callback() {
        assert_eq!(parse_rate_callback("rate_custom_INQ-42"), Some("INQ-42".to_string()));
        assert_eq!(parse_rate_callback("rate_custom_VEN-42"), None);
        assert_eq!(parse_rate_callback("other"), None);
        assert_eq!(rate_callback_data("INQ-7"), "rate_custom_INQ-7");
    }

    #[test]
    fn test_guided_entry_happy_path() {
        let (entry, reply) = RateEntry::start("INQ-42");
        assert!(reply.text.contains("INQ-42"));

        let RateProgress::Continue(entry, _) = entry.advance("250") else {
            panic!("expected gst prompt");
        };
        assert_eq!(entry.waiting_for, RateField::Gst);
        let RateProgress::Continue(entry, _) = entry.advance("18") else {
            panic!("expected delivery prompt");
        };
        assert_eq!(entry.waiting_for, RateField::Delivery);

        let RateProgress::Complete(quote) = entry.advance("400") else {
            panic!("expected completion");
        };
        assert_eq!(
            quote,
            RateQuote {
                inquiry_id: "INQ-42".to_string(),
                rate: "250".to_string(),
                unit: None,
                gst: "18".to_string(),
                delivery: "400".to_string(),
            }
        );
    }

    #[test]
    fn test_guided_entry_rejects_invalid_values() {
        let (entry, _) = RateEntry::start("INQ-1");
        for bad in ["0", "-5", "abc", ""] {
            let RateProgress::Continue(same, reply) = entry.clone().advance(bad) else {
                panic!("invalid rate accepted");
            };
            assert_eq!(same, entry);
            assert!(reply.text.starts_with("Please enter a valid rate"));
        }

        let RateProgress::Continue(gst_entry, _) = entry.advance("350") else {
            panic!("rate rejected");
        };
        for bad in ["31", "-1", "x"] {
            let RateProgress::Continue(same, _) = gst_entry.clone().advance(bad) else {
                panic!("invalid gst accepted");
            };
            assert_eq!(same, gst_entry);
        }

        let RateProgress::Continue(delivery_entry, _) = gst_entry.advance("30") else {
            panic!("gst 30 rejected");
        };
        let RateProgress::Continue(same, _) = delivery_entry.clone().advance("-1") else {
            panic!("negative delivery accepted");
        };
        assert_eq!(same, delivery_entry);
        assert!(matches!(
            delivery_entry.advance("0"),
            RateProgress::Complete(_)
        ));
    }

    #[test]
    fn test_guided_entry_strips_symbols() {
        let (entry, _) = RateEntry::start("INQ-1");
        let RateProgress::Continue(entry, _) = entry.advance("₹1,250") else {
            panic!("rate rejected");
        };
        assert_eq!(entry.rate.as_deref(), Some("1250"));
        let RateProgress::Continue(entry, _) = entry.advance("18%") else {
            panic!("gst rejected");
        };
        assert_eq!(entry.gst.as_deref(), Some("18"));
    }
}
