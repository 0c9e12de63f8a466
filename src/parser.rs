//! Recipe text parsing.
//!
//! A recipe line looks like
//! `MFCC[Window(length=25,step=10),RDFT,SpectralEnergy,FilterBank(number=40)]`:
//! a feature name followed by a bracketed, comma-separated transform list,
//! each transform optionally carrying a raw parameter body that is parsed
//! later by the parameter system. Whitespace around tokens is insignificant.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{SfeError, SfeResult};

/// One parsed recipe: feature name plus the ordered
/// (transform name, raw parameter text) list.
pub type ParsedFeature = (String, Vec<(String, String)>);

static FEATURE_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)]
    let re = Regex::new(r"^\s*(\w+)\s*\[(.+)\]\s*$").unwrap();
    re
});

static TRANSFORM_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)]
    let re = Regex::new(r"^\s*(\w+)\s*(?:\(([^)]*)\))?\s*$").unwrap();
    re
});

/// Splits the transform list on commas that are not inside a parameter body.
fn split_transforms(body: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in body.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                pieces.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    pieces.push(&body[start..]);
    pieces
}

/// Parses one recipe line. `index` is reported in syntax errors.
pub fn parse_feature(line: &str, index: usize) -> SfeResult<ParsedFeature> {
    let syntax_error = || SfeError::Syntax {
        text: line.to_string(),
        position: index,
    };
    let captures = FEATURE_RE.captures(line).ok_or_else(syntax_error)?;
    let name = captures[1].to_string();
    let mut transforms = Vec::new();
    for piece in split_transforms(&captures[2]) {
        let tfm = TRANSFORM_RE.captures(piece).ok_or_else(syntax_error)?;
        let params = tfm.get(2).map(|m| m.as_str()).unwrap_or("");
        transforms.push((tfm[1].to_string(), params.trim().to_string()));
    }
    Ok((name, transforms))
}

/// Parses a batch of recipe lines, preserving their order.
pub fn parse_features(lines: &[&str]) -> SfeResult<Vec<ParsedFeature>> {
    lines
        .iter()
        .enumerate()
        .map(|(index, line)| parse_feature(line, index))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_mfcc_recipe() {
        let (name, transforms) = parse_feature(
            "MFCC[Window(length=25,step=10),RDFT,SpectralEnergy,\
             FilterBank(number=40,squared=true),Log,DCT,Selector(length=16),STMSN(length=25)]",
            0,
        )
        .unwrap();
        assert_eq!(name, "MFCC");
        assert_eq!(transforms.len(), 8);
        assert_eq!(transforms[0], ("Window".into(), "length=25,step=10".into()));
        assert_eq!(transforms[1], ("RDFT".into(), String::new()));
        assert_eq!(
            transforms[3],
            ("FilterBank".into(), "number=40,squared=true".into())
        );
        assert_eq!(transforms[7], ("STMSN".into(), "length=25".into()));
    }

    #[test]
    fn whitespace_is_insignificant() {
        let (name, transforms) =
            parse_feature("  Energy  [ Window ( length=512 ) ,  Energy ] ", 3).unwrap();
        assert_eq!(name, "Energy");
        assert_eq!(transforms[0], ("Window".into(), "length=512".into()));
        assert_eq!(transforms[1], ("Energy".into(), String::new()));
    }

    #[test]
    fn empty_parameter_body_is_allowed() {
        let (_, transforms) = parse_feature("F[RDFT()]", 0).unwrap();
        assert_eq!(transforms[0], ("RDFT".into(), String::new()));
    }

    #[test]
    fn malformed_lines_report_the_recipe_index() {
        for line in ["NoBrackets", "Name[]", "Name[Tfm(]", "[Tfm]", "Name[Tfm)(]"] {
            match parse_feature(line, 7) {
                Err(SfeError::Syntax { position, .. }) => assert_eq!(position, 7),
                other => panic!("expected syntax error for {line:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn batch_parse_keeps_order() {
        let parsed = parse_features(&["A[Identity]", "B[Identity]"]).unwrap();
        assert_eq!(parsed[0].0, "A");
        assert_eq!(parsed[1].0, "B");
    }
}
