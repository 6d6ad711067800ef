/// Field-name-keyed synthetic values for clear-and-refill corrections.
///
/// Substring matching so refactored field names ("billing_phone",
/// "home_address_line1") still hit the right shape of value.
pub fn synthetic_value(field: &str) -> &'static str {
    let lower = field.to_ascii_lowercase();
    if lower.contains("phone") {
        "5555550123"
    } else if lower.contains("date") || lower.contains("dob") || lower.contains("birth") {
        "1980-01-15"
    } else if lower.contains("zip") || lower.contains("postal") {
        "94103"
    } else if lower.contains("email") {
        "jane.smith@example.com"
    } else if lower.contains("city") {
        "San Francisco"
    } else if lower.contains("state") {
        "CA"
    } else if lower.contains("address") {
        "123 Market Street"
    } else if lower.contains("first") {
        "Jane"
    } else if lower.contains("last") {
        "Smith"
    } else if lower.contains("signature") || lower.contains("name") {
        "Jane Smith"
    } else {
        "Test Value"
    }
}
