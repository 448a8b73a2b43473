//! Core Data Models
//!
//! This module defines the data structures shared by the reporting pipeline:
//! the wire types for the GA4 Data and Admin APIs and the in-memory row
//! representation produced for display.
//!
//! ## Data Flow
//!
//! 1. **Request**: [`ReportRequest`] - body sent to `properties/{id}:runReport`
//! 2. **Raw Data**: [`RunReportResponse`] / [`ApiRow`] - positional values as returned
//! 3. **Rows**: [`Row`] of [`CellValue`] - keyed records after the row pipeline
//!
//! ## Features
//!
//! - **Lenient decoding**: every response field defaults when absent, so a
//!   malformed row degrades to empty values instead of failing the batch
//! - **camelCase wire names**: matches the REST surface of the Google APIs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A single cell of a report row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Number(f64),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            CellValue::Number(_) => None,
        }
    }

    /// Numeric view of the cell; text cells are parsed when they look numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{:.0}", n),
            CellValue::Number(n) => write!(f, "{:.2}", n),
        }
    }
}

/// A report row keyed by column name. Column order is not significant.
pub type Row = HashMap<String, CellValue>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub date_ranges: Vec<DateRangeBody>,
    pub dimensions: Vec<NamedField>,
    pub metrics: Vec<NamedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub order_bys: Vec<OrderByBody>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeBody {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedField {
    pub name: String,
}

impl NamedField {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderByBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension: Option<DimensionOrderBy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<MetricOrderBy>,
    pub desc: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionOrderBy {
    pub dimension_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricOrderBy {
    pub metric_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunReportResponse {
    pub dimension_headers: Vec<Header>,
    pub metric_headers: Vec<Header>,
    pub rows: Vec<ApiRow>,
    pub row_count: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Header {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiRow {
    pub dimension_values: Vec<ValueCell>,
    pub metric_values: Vec<ValueCell>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ValueCell {
    pub value: Option<String>,
}

/// Page of `GET accountSummaries` from the Admin API
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountSummariesPage {
    pub account_summaries: Vec<AccountSummary>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountSummary {
    pub account: String,
    pub display_name: String,
    pub property_summaries: Vec<PropertySummary>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PropertySummary {
    pub property: String,
    pub display_name: String,
    pub property_type: Option<String>,
    pub parent: Option<String>,
}

impl PropertySummary {
    /// Numeric id from the `properties/{id}` resource name
    pub fn property_id(&self) -> &str {
        self.property
            .strip_prefix("properties/")
            .unwrap_or(&self.property)
    }
}

/// Error envelope returned by Google APIs
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiErrorDetail {
    pub code: u16,
    pub message: String,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_tolerates_missing_fields() {
        let json = r#"{"rows":[{"dimensionValues":[{"value":"US"}]},{"metricValues":[{}]}]}"#;
        let response: RunReportResponse = serde_json::from_str(json).unwrap();

        assert_eq!(response.rows.len(), 2);
        assert!(response.rows[0].metric_values.is_empty());
        assert!(response.rows[1].dimension_values.is_empty());
        assert_eq!(response.rows[1].metric_values[0].value, None);
        assert_eq!(response.row_count, 0);
    }

    #[test]
    fn test_request_serializes_camel_case() {
        let request = ReportRequest {
            date_ranges: vec![DateRangeBody {
                start_date: "30daysAgo".to_string(),
                end_date: "today".to_string(),
            }],
            dimensions: vec![NamedField::new("pagePath")],
            metrics: vec![NamedField::new("sessions")],
            limit: Some(10),
            offset: None,
            order_bys: vec![OrderByBody {
                dimension: None,
                metric: Some(MetricOrderBy {
                    metric_name: "sessions".to_string(),
                }),
                desc: true,
            }],
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["dateRanges"][0]["startDate"], "30daysAgo");
        assert_eq!(value["dimensions"][0]["name"], "pagePath");
        assert_eq!(value["orderBys"][0]["metric"]["metricName"], "sessions");
        assert_eq!(value["limit"], 10);
        assert!(value.get("offset").is_none());
    }

    #[test]
    fn test_cell_display() {
        assert_eq!(CellValue::Number(42.0).to_string(), "42");
        assert_eq!(CellValue::Number(0.126).to_string(), "0.13");
        assert_eq!(CellValue::text("US").to_string(), "US");
        assert_eq!(CellValue::text(" 7 ").as_f64(), Some(7.0));
        assert_eq!(CellValue::text("n/a").as_f64(), None);
    }

    #[test]
    fn test_property_id_from_resource_name() {
        let summary = PropertySummary {
            property: "properties/123456".to_string(),
            ..Default::default()
        };
        assert_eq!(summary.property_id(), "123456");
    }
}
