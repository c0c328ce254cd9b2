//! Structural validation of extracted patches.
//!
//! Scans the patch line by line for object declarations and reports every
//! declared object name missing from the registry. The declaration grammar,
//! whitespace-separated:
//!
//! ```text
//! declaration := "#X" "obj" x-coord y-coord symbol arg* ";"?
//! ```
//!
//! where both coordinates are integers and the symbol runs to the next
//! whitespace or the trailing `;`. Lines that do not match are skipped.

use crate::registry::SymbolRegistry;
use std::collections::BTreeSet;

/// Collect every declared object name not present in the registry.
///
/// Returns an ordered set so the report is stable; duplicates collapse.
/// Pure function of its inputs.
pub fn validate(artifact: &str, registry: &SymbolRegistry) -> BTreeSet<String> {
    let mut unknown = BTreeSet::new();
    for line in artifact.lines() {
        if let Some(symbol) = declared_symbol(line) {
            if !registry.contains(symbol) {
                unknown.insert(symbol.to_string());
            }
        }
    }
    unknown
}

/// Parse one line against the declaration grammar and return its symbol.
fn declared_symbol(line: &str) -> Option<&str> {
    let mut tokens = line.split_whitespace();
    if tokens.next()? != "#X" {
        return None;
    }
    if tokens.next()? != "obj" {
        return None;
    }
    tokens.next()?.parse::<i64>().ok()?;
    tokens.next()?.parse::<i64>().ok()?;
    let token = tokens.next()?;
    // The symbol runs to the next whitespace or terminator; arguments after
    // it are not part of its name.
    let symbol = match token.split_once(';') {
        Some((head, _)) => head,
        None => token,
    };
    if symbol.is_empty() {
        return None;
    }
    Some(symbol)
}
