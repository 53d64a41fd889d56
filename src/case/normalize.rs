use std::collections::BTreeMap;
use std::str::FromStr;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::case::{CaseRecord, FieldKey};

const ID_KEYS: [&str; 3] = ["id", "case_id", "case"];
const TITLE_KEYS: [&str; 3] = ["title", "name", "case_title"];

/// Lowercases a column name and folds camelCase, dots, dashes and spaces
/// into snake_case. A capital run ends a word before its last capital when
/// lowercase follows, so `targetFTECount` becomes `target_fte_count`.
pub fn normalize_key(raw: &str) -> String {
    let chars: Vec<char> = raw.trim().chars().collect();
    let mut out = String::with_capacity(chars.len() + 4);
    let mut prev_lower = false;
    let mut prev_upper = false;
    for (idx, &ch) in chars.iter().enumerate() {
        if ch.is_ascii_uppercase() {
            let next_lower = chars
                .get(idx + 1)
                .is_some_and(|next| next.is_ascii_lowercase());
            if prev_lower || (prev_upper && next_lower) {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
            prev_lower = false;
            prev_upper = true;
        } else if matches!(ch, '.' | '-' | ' ' | '/') {
            if !out.ends_with('_') {
                out.push('_');
            }
            prev_lower = false;
            prev_upper = false;
        } else {
            out.push(ch);
            prev_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
            prev_upper = false;
        }
    }
    out
}

/// Parses spreadsheet-style numbers such as `"1,250.5"`, `"12%"` or `"$ 40"`.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let sanitized: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '%' | '_' | '$' | ' '))
        .collect();
    if sanitized.is_empty() {
        return None;
    }
    sanitized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Stable identifier for rows that carry a title but no id.
pub fn derive_case_id(title: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.trim().as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("case-{}", &digest[..12])
}

pub fn case_from_fields(fields: &BTreeMap<String, String>) -> Option<CaseRecord> {
    let normalized: BTreeMap<String, &str> = fields
        .iter()
        .map(|(k, v)| (normalize_key(k), v.trim()))
        .collect();

    let id = first_present(&normalized, &ID_KEYS);
    let title = first_present(&normalized, &TITLE_KEYS);
    let (id, title) = match (id, title) {
        (Some(id), Some(title)) => (id.to_string(), title.to_string()),
        (Some(id), None) => (id.to_string(), id.to_string()),
        (None, Some(title)) => (derive_case_id(title), title.to_string()),
        (None, None) => return None,
    };

    let mut record = CaseRecord::new(id, title);
    for (key, raw) in &normalized {
        if ID_KEYS.contains(&key.as_str()) || TITLE_KEYS.contains(&key.as_str()) {
            continue;
        }
        let Ok(field) = FieldKey::from_str(key) else {
            debug!(case_id = record.id(), column = %key, "ignoring unknown column");
            continue;
        };
        match parse_decimal(raw) {
            Some(value) => record.apply_change(field, value),
            None => debug!(
                case_id = record.id(),
                field = %field,
                raw = *raw,
                "non-numeric value, using default {}",
                field.default_value()
            ),
        }
    }
    Some(record)
}

fn first_present<'a>(fields: &BTreeMap<String, &'a str>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| fields.get(*k).copied())
        .find(|v| !v.is_empty())
}
