//! The typed parameter system shared by every transform.
//!
//! Each transform class declares a static table of [`ParameterDescriptor`]s
//! (name, human description, default as text). Instances store their current
//! values as strings in a [`ParameterMap`]; typed accessors parse on read
//! and the transform's `set_parameter` validates on write. Raw parameter
//! text from a recipe (`length=25, step=10`) is split here as well.

use std::collections::BTreeMap;

use crate::error::{SfeError, SfeResult};

/// Static description of one supported parameter.
#[derive(Debug, Clone, Copy)]
pub struct ParameterDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub default: &'static str,
}

/// Current parameter values of a transform instance, ordered by name so the
/// deduplication fingerprint is stable.
pub type ParameterMap = BTreeMap<String, String>;

/// Builds the initial value map of an instance: every supported parameter
/// set to its default.
pub fn defaults(supported: &'static [ParameterDescriptor]) -> ParameterMap {
    supported
        .iter()
        .map(|d| (d.name.to_string(), d.default.to_string()))
        .collect()
}

/// Parses raw parameter text into a name → value map.
///
/// The format is `name=value` pairs separated by commas, whitespace around
/// both sides is trimmed, an empty string yields an empty map. A piece
/// without `=` fails with a `Syntax` error pointing at its column.
pub fn parse_raw(text: &str) -> SfeResult<ParameterMap> {
    let mut parameters = ParameterMap::new();
    if text.trim().is_empty() {
        return Ok(parameters);
    }
    let mut column = 0usize;
    for piece in text.split(',') {
        let Some(eq) = piece.find('=') else {
            return Err(SfeError::Syntax {
                text: text.to_string(),
                position: column,
            });
        };
        let name = piece[..eq].trim();
        let value = piece[eq + 1..].trim();
        if name.is_empty() {
            return Err(SfeError::Syntax {
                text: text.to_string(),
                position: column,
            });
        }
        // Last assignment wins for duplicate names.
        parameters.insert(name.to_string(), value.to_string());
        column += piece.len() + 1;
    }
    Ok(parameters)
}

fn invalid(class: &str, name: &str, value: &str) -> SfeError {
    SfeError::InvalidValue {
        class: class.to_string(),
        name: name.to_string(),
        value: value.to_string(),
    }
}

/// Typed read helpers. Every one maps a parse failure to `InvalidValue`
/// carrying the owning class and parameter name.
pub fn parse_bool(class: &str, name: &str, value: &str) -> SfeResult<bool> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(invalid(class, name, value)),
    }
}

pub fn parse_int(class: &str, name: &str, value: &str) -> SfeResult<i64> {
    value.parse().map_err(|_| invalid(class, name, value))
}

pub fn parse_size(class: &str, name: &str, value: &str) -> SfeResult<usize> {
    value.parse().map_err(|_| invalid(class, name, value))
}

pub fn parse_float(class: &str, name: &str, value: &str) -> SfeResult<f32> {
    value.parse().map_err(|_| invalid(class, name, value))
}

/// Whitespace-separated list of integers, e.g. a wavelet tree fingerprint
/// `1 2 3 3` or band boundaries.
pub fn parse_int_list(class: &str, name: &str, value: &str) -> SfeResult<Vec<i64>> {
    let mut out = Vec::new();
    for piece in value.split_whitespace() {
        out.push(piece.parse().map_err(|_| invalid(class, name, value))?);
    }
    if out.is_empty() {
        return Err(invalid(class, name, value));
    }
    Ok(out)
}

/// Enum-over-a-fixed-set parser: the caller supplies the accepted
/// (text, variant) pairs.
pub fn parse_enum<T: Copy>(
    class: &str,
    name: &str,
    value: &str,
    choices: &[(&str, T)],
) -> SfeResult<T> {
    choices
        .iter()
        .find(|(text, _)| *text == value)
        .map(|(_, variant)| *variant)
        .ok_or_else(|| invalid(class, name, value))
}
