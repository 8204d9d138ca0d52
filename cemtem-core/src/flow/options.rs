//! Fixed option lists offered by the flows.

/// Cement types a buyer can pick. The last entry asks for a custom type.
pub const CEMENT_TYPES: &[&str] = &[
    "OPC Grade 33",
    "OPC Grade 43",
    "OPC Grade 53",
    "PPC Grade 33",
    "PPC Grade 43",
    "PPC Grade 53",
    "Enter Other Specific Type",
];

/// 1-based menu number of the custom cement type entry.
pub const CUSTOM_CEMENT_TYPE: usize = 7;

/// TMT bar sizes.
pub const TMT_SIZES: &[&str] = &[
    "5.5mm", "6mm", "8mm", "10mm", "12mm", "16mm", "18mm", "20mm", "24mm", "26mm", "28mm",
    "32mm", "36mm", "40mm",
];

/// Cement companies offered when recording a sale; one more entry means "other".
pub const SALES_CEMENT_COMPANIES: &[&str] = &[
    "Ambuja",
    "ACC",
    "Ultratech",
    "MAX",
    "DALMIA",
    "Topcem",
    "Black Tiger",
];

/// TMT companies offered when recording a sale; one more entry means "other".
pub const SALES_TMT_COMPANIES: &[&str] = &["Tata Tiscon", "JSW", "Shyam Steel", "Xtech"];

/// Numbered list, one option per line.
pub fn numbered(options: &[&str]) -> String {
    options
        .iter()
        .enumerate()
        .map(|(i, option)| format!("{}. {}", i + 1, option))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Numbered list with a trailing "Others" entry.
pub fn numbered_with_other(options: &[&str]) -> String {
    format!("{}\n{}. Others", numbered(options), options.len() + 1)
}

/// Options at the given 0-based indices, in index order.
pub fn pick(options: &[&str], indices: &[usize]) -> Vec<String> {
    indices
        .iter()
        .filter_map(|&i| options.get(i))
        .map(|s| s.to_string())
        .collect()
}
