use serde::Serialize;
use std::collections::BTreeMap;

use super::Row;
use super::pivot::{PivotConfig, PivotError, pivot_for_chart};
use crate::llm::models::ChartConfig;

/// A chart config together with the rows it should be drawn from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartView {
    pub config: ChartConfig,
    pub data: Vec<Row>,
}

/// Theme palette slot per key, numbered from 1.
pub fn palette_colors(keys: &[String]) -> BTreeMap<String, String> {
    keys.iter()
        .enumerate()
        .map(|(i, key)| (key.clone(), format!("hsl(var(--chart-{}))", i + 1)))
        .collect()
}

/// Multi-line configs are pivoted so that each series label becomes a y key.
/// Everything else passes the rows through unchanged.
pub fn prepare_chart(mut config: ChartConfig, rows: Vec<Row>) -> Result<ChartView, PivotError> {
    if !config.is_multi_line() {
        config.colors = palette_colors(&config.y_keys);
        return Ok(ChartView { config, data: rows });
    }

    let measurement = config
        .measurement_column
        .clone()
        .or_else(|| config.y_keys.first().cloned())
        .ok_or_else(|| PivotError::MissingColumn("measurementColumn".to_string()))?;

    let pivot = pivot_for_chart(
        &rows,
        &PivotConfig {
            x_key: Some(config.x_key.clone()),
            line_categories: config.line_categories.clone(),
            category_column: None,
            measurement_column: measurement,
        },
    )?;

    config.x_key = pivot.x_axis_field;
    config.y_keys = pivot.series_labels;
    config.colors = palette_colors(&config.y_keys);

    Ok(ChartView {
        config,
        data: pivot.data,
    })
}
