//! Generated inventory numbers, `<CODE>-<YYYY>-<NNNN>`.

use chrono::Datelike;

const CATEGORY_CODES: &[(&str, &str)] = &[
    ("laptop", "LT"),
    ("desktop", "DT"),
    ("monitor", "MN"),
    ("printer", "PR"),
    ("router", "RT"),
    ("phone", "PH"),
    ("keyboard", "KB"),
    ("mouse", "MS"),
    ("headset", "HS"),
    ("usb_device", "USB"),
];
const OTHER_CODE: &str = "OT";

/// Short code of a category, `OT` when unknown.
pub fn category_code(category: &str) -> &'static str {
    let category = category.trim().to_lowercase();

    CATEGORY_CODES
        .iter()
        .find(|(name, _)| *name == category)
        .map(|(_, code)| *code)
        .unwrap_or(OTHER_CODE)
}

/// `<CODE>-<YYYY>-` shared by a category within a year.
pub fn inventory_prefix(category: &str, year: i32) -> String {
    format!("{}-{year}-", category_code(category))
}

/// Prefix for the current year.
pub fn current_inventory_prefix(category: &str) -> String {
    inventory_prefix(category, chrono::Local::now().year())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_code() {
        assert_eq!(category_code("laptop"), "LT");
        assert_eq!(category_code(" Monitor "), "MN");
        assert_eq!(category_code("usb_device"), "USB");
        assert_eq!(category_code("coffee machine"), "OT");
    }

    #[test]
    fn test_prefix() {
        assert_eq!(inventory_prefix("printer", 2025), "PR-2025-");
        assert_eq!(inventory_prefix("scanner", 2024), "OT-2024-");
    }
}
