//! Naming rules shared by schemas, fields and enum defines.

use crate::error::{Error, Result};
use alloc::string::{String, ToString};

/// Validates `name` and returns it with its first letter upper-cased.
///
/// Names must be non-empty, start with an ASCII letter and contain only ASCII
/// letters and digits.
pub fn normalize_name(name: &str) -> Result<String> {
    let mut chars = name.chars();
    let first = match chars.next() {
        None => return Err(Error::invalid_name(name, "name cannot be empty")),
        Some(c) => c,
    };
    if !first.is_ascii_alphabetic() {
        return Err(Error::invalid_name(name, "name must start with a letter"));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(Error::invalid_name(name, "name must be alphanumeric"));
    }
    Ok(capitalize(name))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(c) => c.to_ascii_uppercase().to_string() + chars.as_str(),
    }
}
