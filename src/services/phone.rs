use crate::database::scope::canonical_country_code;
use crate::types::ContactKind;

/// International dialing prefixes recognised when no country is supplied.
/// Longer prefixes first so `+971` wins over a shorter match.
const DIALING_PREFIXES: &[(&str, &str)] = &[
    ("971", "AE"),
    ("94", "LK"),
    ("91", "IN"),
    ("44", "UK"),
    ("1", "US"),
];

/// Built-in dialing prefix for `country`, used when the directory has none
pub fn default_dialing_prefix(country: &str) -> Option<&'static str> {
    DIALING_PREFIXES
        .iter()
        .find(|(_, code)| code.eq_ignore_ascii_case(country))
        .map(|(prefix, _)| *prefix)
}

pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn is_international(raw: &str) -> bool {
    let trimmed = raw.trim_start();
    trimmed.starts_with('+') || trimmed.starts_with("00")
}

/// National significant number for comparisons.
///
/// `+94771234567`, `0094771234567`, `94771234567` and `0771234567` all become
/// `771234567` for dialing prefix `94`. Bare digits only count as international
/// when they are longer than a national number with trunk prefix.
pub fn normalize_phone(raw: &str, dialing_prefix: &str) -> String {
    let mut digits = digits_only(raw);
    let prefix = digits_only(dialing_prefix);

    if is_international(raw) {
        if let Some(rest) = digits.strip_prefix("00") {
            digits = rest.to_string();
        }
        if !prefix.is_empty() {
            if let Some(rest) = digits.strip_prefix(prefix.as_str()) {
                digits = rest.to_string();
            }
        }
    } else if !prefix.is_empty() && digits.len() > 10 && digits.starts_with(prefix.as_str()) {
        digits = digits[prefix.len()..].to_string();
    }

    match digits.strip_prefix('0') {
        Some(rest) => rest.to_string(),
        None => digits,
    }
}

/// E.164 form used for delivery and for the OTP history tables
pub fn to_international(raw: &str, dialing_prefix: &str) -> String {
    let national = normalize_phone(raw, dialing_prefix);
    format!("+{}{}", digits_only(dialing_prefix), national)
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Whether two spellings name the same phone number or email address
pub fn same_contact(kind: ContactKind, a: &str, b: &str, dialing_prefix: &str) -> bool {
    match kind {
        ContactKind::Phone => {
            let a = normalize_phone(a, dialing_prefix);
            !a.is_empty() && a == normalize_phone(b, dialing_prefix)
        }
        ContactKind::Email => {
            let a = normalize_email(a);
            !a.is_empty() && a == normalize_email(b)
        }
    }
}

/// Country for a phone number written in international form, if recognised
pub fn detect_country(phone: &str) -> Option<&'static str> {
    if !is_international(phone) {
        return None;
    }
    let digits = digits_only(phone);
    let digits = digits.strip_prefix("00").unwrap_or(digits.as_str());

    DIALING_PREFIXES
        .iter()
        .find(|(prefix, _)| digits.starts_with(prefix))
        .map(|(_, country)| *country)
}

/// Resolve the country for an OTP send: an explicit two-letter code, a dialing
/// code such as `+94`, detection from the number, then the default.
pub fn resolve_country(supplied: Option<&str>, phone: &str, default_country: &str) -> String {
    if let Some(raw) = supplied.map(str::trim).filter(|s| !s.is_empty()) {
        if let Some(code) = canonical_country_code(raw) {
            return code;
        }
        let digits = digits_only(raw);
        if let Some((_, country)) = DIALING_PREFIXES.iter().find(|(p, _)| *p == digits) {
            return country.to_string();
        }
    }

    detect_country(phone)
        .map(str::to_string)
        .unwrap_or_else(|| default_country.to_string())
}
