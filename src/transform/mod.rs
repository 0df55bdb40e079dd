pub mod chart;
pub mod overlay;
pub mod pivot;

/// One result row, column name to scalar, in column order.
pub type Row = serde_json::Map<String, serde_json::Value>;
