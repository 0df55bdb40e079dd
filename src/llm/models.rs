use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// Output of SQL generation
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GeneratedQuery {
    pub query: String,
}

/// One explained section of a generated query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct QueryExplanation {
    pub section: String,
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExplanationList {
    pub explanations: Vec<QueryExplanation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Bar,
    Line,
    Area,
    Pie,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfig {
    #[schemars(
        description = "Describe the chart. What is it showing? What is interesting about the way the data is displayed?"
    )]
    pub description: String,

    #[schemars(description = "What is the main takeaway from the chart?")]
    pub takeaway: String,

    #[serde(rename = "type")]
    #[schemars(description = "Type of chart")]
    pub chart_type: ChartType,

    pub title: String,

    #[schemars(description = "Key for x-axis or category")]
    pub x_key: String,

    #[schemars(
        description = "Key(s) for y-axis values, this is typically the quantitative column"
    )]
    pub y_keys: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "For line charts only: whether the chart is comparing groups of data")]
    pub multiple_lines: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(
        description = "For line charts only: key for the quantitative y-axis column to measure against (eg. values, counts)"
    )]
    pub measurement_column: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(
        description = "For line charts only: categories used to compare different lines or data series. Each category represents a distinct line in the chart"
    )]
    pub line_categories: Option<Vec<String>>,

    #[serde(default)]
    #[schemars(description = "Mapping of data keys to color values for chart elements")]
    pub colors: BTreeMap<String, String>,

    #[schemars(description = "Whether to show legend")]
    pub legend: bool,
}

impl ChartConfig {
    pub fn is_multi_line(&self) -> bool {
        self.multiple_lines.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chart_config_uses_camel_case_wire_names() {
        let config: ChartConfig = serde_json::from_value(json!({
            "description": "Unicorns per year",
            "takeaway": "Growth peaked in 2021",
            "type": "line",
            "title": "Unicorns by year",
            "xKey": "year",
            "yKeys": ["count"],
            "multipleLines": true,
            "measurementColumn": "count",
            "lineCategories": ["US", "China"],
            "legend": true
        }))
        .unwrap();

        assert_eq!(config.chart_type, ChartType::Line);
        assert!(config.is_multi_line());
        assert!(config.colors.is_empty());
        assert_eq!(
            config.line_categories,
            Some(vec!["US".to_string(), "China".to_string()])
        );
    }

    #[test]
    fn optional_fields_are_not_required_by_schema() {
        let schema = serde_json::to_value(schemars::schema_for!(ChartConfig)).unwrap();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();

        assert!(required.contains(&"xKey"));
        assert!(!required.contains(&"multipleLines"));
        assert!(!required.contains(&"colors"));
    }
}
