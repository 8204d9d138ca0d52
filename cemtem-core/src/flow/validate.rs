//! Input parsing shared by every flow step.
//!
//! Each function returns `None` for unacceptable input; callers re-prompt.

/// Minimum length for names, cities and other free text.
pub const MIN_TEXT_LEN: usize = 2;

/// Strip whitespace and accept exactly ten ASCII digits.
pub fn normalize_phone(text: &str) -> Option<String> {
    let phone: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    (phone.len() == 10 && phone.chars().all(|c| c.is_ascii_digit())).then_some(phone)
}

/// Trimmed text of at least [`MIN_TEXT_LEN`] characters.
pub fn min_text(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (trimmed.chars().count() >= MIN_TEXT_LEN).then(|| trimmed.to_string())
}

/// Trimmed, non-empty text.
pub fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// 1-based menu choice in `1..=options`, returned 0-based.
pub fn menu_choice(text: &str, options: usize) -> Option<usize> {
    let n: usize = text.trim().parse().ok()?;
    (1..=options).contains(&n).then(|| n - 1)
}

/// Comma-separated 1-based indices into a list of `options` entries.
///
/// Out-of-range and non-numeric tokens are dropped. The result is 0-based,
/// de-duplicated and in list order, so `"3,1,1"` selects entries 0 and 2.
pub fn multi_select(text: &str, options: usize) -> Vec<usize> {
    let mut selected: Vec<usize> = text
        .split(',')
        .filter_map(|token| menu_choice(token, options))
        .collect();
    selected.sort_unstable();
    selected.dedup();
    selected
}

/// Strictly positive whole number.
pub fn positive_int(text: &str) -> Option<u32> {
    text.trim().parse::<u32>().ok().filter(|&n| n > 0)
}

/// Strictly positive, finite number.
pub fn positive_number(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && *n > 0.0)
}

/// Yes / no answer; `1` and `2` count as yes and no.
pub fn yes_no(text: &str) -> Option<bool> {
    match text.trim().to_lowercase().as_str() {
        "yes" | "y" | "1" => Some(true),
        "no" | "n" | "2" => Some(false),
        _ => None,
    }
}

/// Whether a company-preference answer means "no preference".
pub fn is_no_preference(text: &str) -> bool {
    matches!(
        text.trim().to_lowercase().as_str(),
        "" | "any" | "none" | "no preference"
    )
}

/// Capitalise each word: `"new delhi"` becomes `"New Delhi"`.
pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
