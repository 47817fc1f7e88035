use std::fmt;

use serde::Serialize;

/// Scalar value held by one table cell or timeline entry.
///
/// Source files are untyped text, so values are inferred on read: empty
/// cells become [`Cell::Missing`], anything that parses as a number becomes
/// [`Cell::Num`], everything else stays [`Cell::Text`]. Columns with a
/// forced-text override skip numeric inference entirely.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Missing,
    Num(f64),
    Text(String),
}

/// Literal used when a missing value has to be rendered into a detail
/// record. Matches the explicit fill applied to the damage-state columns.
pub const ABSENT_MARKER: &str = "None";

impl Cell {
    /// Infer a cell from raw text.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(value) => Cell::Num(value),
            Err(_) => Cell::Text(trimmed.to_string()),
        }
    }

    /// Build a cell from raw text without numeric inference.
    pub fn text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Cell::Missing
        } else {
            Cell::Text(trimmed.to_string())
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            Cell::Num(value) => Some(*value),
            _ => None,
        }
    }

    /// Stable textual form, used for entity identifiers and detail values.
    /// `Num` renders via `f64` display so "123" survives a numeric
    /// round-trip unchanged.
    pub fn render(&self) -> String {
        match self {
            Cell::Missing => ABSENT_MARKER.to_string(),
            Cell::Num(value) => value.to_string(),
            Cell::Text(value) => value.clone(),
        }
    }

    /// Hashable key for dedup passes and group indexing.
    pub fn key(&self) -> CellKey {
        match self {
            Cell::Missing => CellKey::Missing,
            Cell::Num(value) => CellKey::Num(value.to_bits()),
            Cell::Text(value) => CellKey::Text(value.clone()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Bit-exact, hashable companion to [`Cell`]. Floating-point cells are
/// keyed by bit pattern; times have been truncated to whole seconds before
/// any dedup runs, so equal instants compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CellKey {
    Missing,
    Num(u64),
    Text(String),
}
