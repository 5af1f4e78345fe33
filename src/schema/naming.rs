//! Naming rules for tables, fields and select options
//!
//! - External ids: ASCII identifier, 1-64 chars, `^[A-Za-z_][A-Za-z0-9_-]{0,63}$`
//! - Names: non-empty after trimming, at most 255 characters
//! - Option labels: non-empty after trimming, unique within a field

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use super::types::FieldType;
use crate::errors::{TableError, TableResult};

/// Maximum length of a table or field name
pub const MAX_NAME_LEN: usize = 255;

fn external_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]{0,63}$").expect("external id pattern is valid")
    })
}

/// Checks an external id against the identifier grammar.
pub fn validate_external_id(external_id: &str) -> TableResult<()> {
    if external_id_pattern().is_match(external_id) {
        Ok(())
    } else {
        Err(TableError::invalid_name(
            external_id,
            "external id must start with a letter or '_' and contain at most 64 of [A-Za-z0-9_-]",
        ))
    }
}

/// Trims a display name and checks its length.
pub fn normalize_name(name: &str) -> TableResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(TableError::invalid_name(name, "name must not be empty"));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(TableError::invalid_name(
            trimmed,
            format!("name exceeds {} characters", MAX_NAME_LEN),
        ));
    }
    Ok(trimmed.to_string())
}

/// Derives an external id from a display name.
///
/// Lowercases, maps every run of non-alphanumeric ASCII to a single `_`,
/// and prefixes `_` when the result would start with a digit.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_sep = false;

    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            pending_sep = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }

    if slug.is_empty() {
        return "_".to_string();
    }
    if slug.starts_with(|c: char| c.is_ascii_digit()) {
        slug.insert(0, '_');
    }
    slug.truncate(64);
    slug
}

/// Trims select labels and rejects empty or repeated ones.
pub fn normalize_field_type(field_type: FieldType) -> TableResult<FieldType> {
    match field_type {
        FieldType::SingleSelect { options } => Ok(FieldType::SingleSelect {
            options: normalize_options(options)?,
        }),
        FieldType::MultiSelect { options } => Ok(FieldType::MultiSelect {
            options: normalize_options(options)?,
        }),
        other => Ok(other),
    }
}

fn normalize_options(options: Vec<String>) -> TableResult<Vec<String>> {
    let mut seen = HashSet::new();
    let mut normalized = Vec::with_capacity(options.len());

    for option in options {
        let label = option.trim();
        if label.is_empty() {
            return Err(TableError::invalid_name(option, "option label must not be empty"));
        }
        if !seen.insert(label.to_string()) {
            return Err(TableError::invalid_name(label, "option label is repeated"));
        }
        normalized.push(label.to_string());
    }

    Ok(normalized)
}
