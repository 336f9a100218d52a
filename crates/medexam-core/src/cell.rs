//! Cell value codec
//!
//! Decoding never fails: a malformed cell resolves to `None` so that a few bad
//! cells cannot block a large import.

/// Marker written into a dynamic column for a true result
pub const TRUE_MARKER: &str = "X";

/// Lower-cased strings that decode to `true`
const TRUTHY: [&str; 6] = ["x", "✓", "check", "true", "1", "có"];

/// A single decoded spreadsheet cell
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Blank,
    Number(f64),
    Text(String),
    Bool(bool),
    /// Formula cell with the result cached by the last recalculation
    Formula(CachedValue),
    /// Date, time or duration, kept in display form
    Date(String),
    Error(String),
}

/// Cached result of a formula cell
#[derive(Clone, Debug, PartialEq)]
pub enum CachedValue {
    Blank,
    Number(f64),
    Text(String),
    Bool(bool),
    Error(String),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Blank => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    fn scalar(&self) -> Option<Scalar<'_>> {
        match self {
            Cell::Number(n) => Some(Scalar::Number(*n)),
            Cell::Text(s) => Some(Scalar::Text(s)),
            Cell::Bool(b) => Some(Scalar::Bool(*b)),
            Cell::Formula(cached) => cached.scalar(),
            Cell::Blank | Cell::Date(_) | Cell::Error(_) => None,
        }
    }
}

impl CachedValue {
    fn scalar(&self) -> Option<Scalar<'_>> {
        match self {
            CachedValue::Number(n) => Some(Scalar::Number(*n)),
            CachedValue::Text(s) => Some(Scalar::Text(s)),
            CachedValue::Bool(b) => Some(Scalar::Bool(*b)),
            CachedValue::Blank | CachedValue::Error(_) => None,
        }
    }
}

/// Plain value a cell or a formula's cached result resolves to
enum Scalar<'a> {
    Number(f64),
    Text(&'a str),
    Bool(bool),
}

/// Decode a student identifier
///
/// Numbers truncate toward zero, text is trimmed and parsed as an integer.
pub fn decode_identifier(cell: &Cell) -> Option<i64> {
    match cell.scalar()? {
        Scalar::Number(n) => truncate(n),
        Scalar::Text(s) => s.trim().parse().ok(),
        Scalar::Bool(_) => None,
    }
}

/// Decode a result flag
///
/// Numbers are true only when exactly 1. Text is true when it is one of the
/// accepted markers (case-insensitive), false otherwise, and `None` when empty.
pub fn decode_boolean(cell: &Cell) -> Option<bool> {
    match cell.scalar()? {
        Scalar::Bool(b) => Some(b),
        Scalar::Number(n) => Some(n == 1.0),
        Scalar::Text(s) => {
            let value = s.trim().to_lowercase();
            if value.is_empty() {
                None
            } else {
                Some(TRUTHY.contains(&value.as_str()))
            }
        }
    }
}

/// Decode a header label
pub fn decode_text(cell: &Cell) -> Option<String> {
    match cell.scalar()? {
        Scalar::Text(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Scalar::Number(n) => truncate(n).map(|v| v.to_string()),
        Scalar::Bool(_) => None,
    }
}

/// Cell content for a result flag: the marker for true, blank otherwise
pub fn encode_boolean(value: bool) -> Option<&'static str> {
    value.then_some(TRUE_MARKER)
}

fn truncate(n: f64) -> Option<i64> {
    let t = n.trunc();
    // i64::MAX is not representable as f64; its cast rounds up to 2^63
    if t.is_finite() && t >= i64::MIN as f64 && t < i64::MAX as f64 {
        Some(t as i64)
    } else {
        None
    }
}
