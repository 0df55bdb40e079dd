//! Reshapes one-row-per-observation results into one row per x value with
//! one column per series, the shape multi-line charts consume.
//!
//! The x axis must be ordinal and numeric (typically a year). Rows are sorted
//! by the parsed x value and a value that does not parse is an error rather
//! than being silently misordered.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

use super::Row;

pub const DEFAULT_X_KEY: &str = "year";

#[derive(Debug, Error, PartialEq)]
pub enum PivotError {
    #[error("cannot pivot an empty result set")]
    EmptyRows,
    #[error("column '{0}' is missing from the result rows")]
    MissingColumn(String),
    #[error("no column holds any of the series labels {0:?}")]
    NoCategoryColumn(Vec<String>),
    #[error("no series labels were given or found in column '{0}'")]
    NoSeries(String),
    #[error("x axis '{field}' holds non-numeric value {value}")]
    NonNumericXAxis { field: String, value: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotConfig {
    /// Falls back to [`DEFAULT_X_KEY`].
    pub x_key: Option<String>,
    /// Known series labels. Derived from `category_column` when absent.
    pub line_categories: Option<Vec<String>>,
    pub category_column: Option<String>,
    pub measurement_column: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotedChart {
    pub data: Vec<Row>,
    pub x_axis_field: String,
    pub series_labels: Vec<String>,
}

/// Label form of a scalar: strings verbatim, everything else as JSON text.
fn label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn numeric(field: &str, value: &Value) -> Result<f64, PivotError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|n| n.is_finite())
        .ok_or_else(|| PivotError::NonNumericXAxis {
            field: field.to_string(),
            value: value.to_string(),
        })
}

fn distinct_labels<'a>(values: impl Iterator<Item = &'a Value>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .map(label)
        .filter(|l| seen.insert(l.clone()))
        .collect()
}

pub fn pivot_for_chart(rows: &[Row], config: &PivotConfig) -> Result<PivotedChart, PivotError> {
    let first = rows.first().ok_or(PivotError::EmptyRows)?;
    let x_field = config.x_key.as_deref().unwrap_or(DEFAULT_X_KEY);

    for column in [x_field, config.measurement_column.as_str()] {
        if !first.contains_key(column) {
            return Err(PivotError::MissingColumn(column.to_string()));
        }
    }
    if let Some(column) = &config.category_column {
        if !first.contains_key(column) {
            return Err(PivotError::MissingColumn(column.clone()));
        }
    }

    let series = match (&config.line_categories, &config.category_column) {
        (Some(labels), _) if !labels.is_empty() => labels.clone(),
        (_, Some(column)) => distinct_labels(rows.iter().filter_map(|r| r.get(column))),
        (_, None) => Vec::new(),
    };
    if series.is_empty() {
        let source = config.category_column.clone().unwrap_or_default();
        return Err(PivotError::NoSeries(source));
    }

    let category_field = match &config.category_column {
        Some(column) => column.clone(),
        None => first
            .keys()
            .filter(|k| k.as_str() != x_field)
            .find(|k| {
                rows.iter()
                    .filter_map(|r| r.get(k.as_str()))
                    .any(|v| series.contains(&label(v)))
            })
            .cloned()
            .ok_or_else(|| PivotError::NoCategoryColumn(series.clone()))?,
    };

    // rows keyed by their parsed x, so 2020, 2020.0 and "2020" share one point
    let mut keyed: Vec<(f64, &Row)> = Vec::with_capacity(rows.len());
    // first value seen per distinct x
    let mut xs: Vec<(f64, &Value)> = Vec::new();
    for row in rows {
        let x = row
            .get(x_field)
            .ok_or_else(|| PivotError::MissingColumn(x_field.to_string()))?;
        let order = numeric(x_field, x)?;
        if !xs.iter().any(|(seen, _)| *seen == order) {
            xs.push((order, x));
        }
        keyed.push((order, row));
    }
    xs.sort_by(|a, b| a.0.total_cmp(&b.0));

    let data = xs
        .into_iter()
        .map(|(order, x)| {
            let mut point = Row::new();
            point.insert(x_field.to_string(), x.clone());
            for category in &series {
                let value = keyed
                    .iter()
                    .find(|(row_order, r)| {
                        *row_order == order
                            && r.get(&category_field).map(label).as_deref()
                                == Some(category.as_str())
                    })
                    .and_then(|(_, r)| r.get(&config.measurement_column).cloned())
                    .unwrap_or(Value::Null);
                point.insert(category.clone(), value);
            }
            point
        })
        .collect();

    Ok(PivotedChart {
        data,
        x_axis_field: x_field.to_string(),
        series_labels: series,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(value: Value) -> Vec<Row> {
        serde_json::from_value(value).unwrap()
    }

    fn by_country() -> PivotConfig {
        PivotConfig {
            x_key: Some("year".into()),
            line_categories: None,
            category_column: Some("country".into()),
            measurement_column: "count".into(),
        }
    }

    #[test]
    fn pivots_rows_per_year() {
        let input = rows(json!([
            {"year": 2021, "country": "US", "count": 7},
            {"year": 2020, "country": "US", "count": 5},
            {"year": 2020, "country": "China", "count": 3},
        ]));

        let chart = pivot_for_chart(&input, &by_country()).unwrap();

        assert_eq!(chart.x_axis_field, "year");
        assert_eq!(chart.series_labels, vec!["US", "China"]);
        assert_eq!(
            serde_json::to_value(&chart.data).unwrap(),
            json!([
                {"year": 2020, "US": 5, "China": 3},
                {"year": 2021, "US": 7, "China": null},
            ])
        );
    }

    #[test]
    fn infers_category_column_from_known_labels() {
        let input = rows(json!([
            {"year": "2020", "industry": "fintech", "country": "US", "count": 5},
            {"year": "2020", "industry": "fintech", "country": "China", "count": 3},
            {"year": "2019", "industry": "fintech", "country": "US", "count": 1},
        ]));
        let config = PivotConfig {
            x_key: None,
            line_categories: Some(vec!["US".into(), "China".into()]),
            category_column: None,
            measurement_column: "count".into(),
        };

        let chart = pivot_for_chart(&input, &config).unwrap();

        assert_eq!(
            serde_json::to_value(&chart.data).unwrap(),
            json!([
                {"year": "2019", "US": 1, "China": null},
                {"year": "2020", "US": 5, "China": 3},
            ])
        );
    }

    #[test]
    fn empty_rows_are_rejected() {
        assert_eq!(pivot_for_chart(&[], &by_country()), Err(PivotError::EmptyRows));
    }

    #[test]
    fn missing_x_axis_is_rejected() {
        let input = rows(json!([{"country": "US", "count": 1}]));
        assert_eq!(
            pivot_for_chart(&input, &by_country()),
            Err(PivotError::MissingColumn("year".into()))
        );
    }

    #[test]
    fn missing_measurement_is_rejected() {
        let input = rows(json!([{"year": 2020, "country": "US", "total": 1}]));
        assert_eq!(
            pivot_for_chart(&input, &by_country()),
            Err(PivotError::MissingColumn("count".into()))
        );
    }

    #[test]
    fn unknown_labels_are_rejected() {
        let input = rows(json!([{"year": 2020, "country": "US", "count": 1}]));
        let config = PivotConfig {
            line_categories: Some(vec!["Atlantis".into()]),
            category_column: None,
            ..by_country()
        };
        assert_eq!(
            pivot_for_chart(&input, &config),
            Err(PivotError::NoCategoryColumn(vec!["Atlantis".into()]))
        );
    }

    #[test]
    fn non_numeric_x_axis_is_rejected() {
        let input = rows(json!([
            {"year": "2020", "country": "US", "count": 1},
            {"year": "last year", "country": "US", "count": 2},
        ]));
        assert!(matches!(
            pivot_for_chart(&input, &by_country()),
            Err(PivotError::NonNumericXAxis { field, .. }) if field == "year"
        ));
    }

    #[test]
    fn equal_x_values_share_one_point() {
        let input = rows(json!([
            {"year": 2020, "country": "US", "count": 5},
            {"year": "2020", "country": "China", "count": 3},
            {"year": 2020.0, "country": "India", "count": 2},
            {"year": "2019.0", "country": "US", "count": 1},
        ]));

        let chart = pivot_for_chart(&input, &by_country()).unwrap();

        assert_eq!(
            serde_json::to_value(&chart.data).unwrap(),
            json!([
                {"year": "2019.0", "US": 1, "China": null, "India": null},
                {"year": 2020, "US": 5, "China": 3, "India": 2},
            ])
        );
    }

    #[test]
    fn no_series_is_rejected() {
        let input = rows(json!([{"year": 2020, "country": "US", "count": 1}]));
        let config = PivotConfig {
            category_column: None,
            ..by_country()
        };
        assert_eq!(pivot_for_chart(&input, &config), Err(PivotError::NoSeries(String::new())));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        const COUNTRIES: [&str; 4] = ["US", "China", "India", "UK"];

        fn observations() -> impl Strategy<Value = Vec<Row>> {
            let observation = (2000i64..2030, 0usize..COUNTRIES.len(), 0i64..100);
            prop::collection::vec(observation, 1..40).prop_map(|obs| {
                obs.into_iter()
                    .map(|(year, c, count)| {
                        let mut row = Row::new();
                        row.insert("year".into(), json!(year));
                        row.insert("country".into(), json!(COUNTRIES[c]));
                        row.insert("count".into(), json!(count));
                        row
                    })
                    .collect()
            })
        }

        proptest! {
            #[test]
            fn one_row_per_year_with_every_series(input in observations()) {
                let chart = pivot_for_chart(&input, &by_country()).unwrap();
                let years: HashSet<i64> =
                    input.iter().map(|r| r["year"].as_i64().unwrap()).collect();

                prop_assert_eq!(chart.data.len(), years.len());
                for point in &chart.data {
                    for label in &chart.series_labels {
                        prop_assert!(point.contains_key(label));
                    }
                }
            }

            #[test]
            fn absent_pairs_are_null(input in observations()) {
                let chart = pivot_for_chart(&input, &by_country()).unwrap();
                for point in &chart.data {
                    let year = &point["year"];
                    for label in &chart.series_labels {
                        let present = input
                            .iter()
                            .any(|r| &r["year"] == year && r["country"] == json!(label));
                        prop_assert_eq!(present, !point[label].is_null());
                    }
                }
            }

            #[test]
            fn rows_are_sorted_by_year(input in observations()) {
                let chart = pivot_for_chart(&input, &by_country()).unwrap();
                let years: Vec<i64> =
                    chart.data.iter().map(|r| r["year"].as_i64().unwrap()).collect();
                prop_assert!(years.windows(2).all(|w| w[0] < w[1]));
            }
        }
    }
}
