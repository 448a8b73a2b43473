//! Query specifications
//!
//! A [`QuerySpec`] is what the user asks for, in user-facing dimension names.
//! It is resolved into source dimensions by [`crate::pipeline`] and turned into
//! a [`ReportRequest`] here.

use crate::dimensions::source_of;
use crate::models::{
    DateRangeBody, DimensionOrderBy, MetricOrderBy, NamedField, OrderByBody, ReportRequest,
};
use crate::pipeline::ResolvedDimensions;
use anyhow::{anyhow, bail, Context, Result};
use chrono::{Duration, Local, NaiveDate};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Data API limits per request
pub const MAX_DIMENSIONS: usize = 9;
pub const MAX_METRICS: usize = 10;

/// A date as understood by the Data API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSpec {
    Absolute(NaiveDate),
    Today,
    Yesterday,
    DaysAgo(u32),
}

impl DateSpec {
    /// Calendar date relative to `today`. Fails when the offset runs past the
    /// range chrono can represent.
    pub fn resolve(&self, today: NaiveDate) -> Result<NaiveDate> {
        let days_back = match self {
            DateSpec::Absolute(date) => return Ok(*date),
            DateSpec::Today => 0,
            DateSpec::Yesterday => 1,
            DateSpec::DaysAgo(n) => i64::from(*n),
        };
        today
            .checked_sub_signed(Duration::days(days_back))
            .ok_or_else(|| anyhow!("Date {} is out of range", self))
    }
}

impl FromStr for DateSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match s {
            "today" => return Ok(DateSpec::Today),
            "yesterday" => return Ok(DateSpec::Yesterday),
            _ => {}
        }
        if let Some(n) = s.strip_suffix("daysAgo") {
            let days = n
                .parse::<u32>()
                .with_context(|| format!("Invalid relative date: {}", s))?;
            return Ok(DateSpec::DaysAgo(days));
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(DateSpec::Absolute)
            .map_err(|_| anyhow!("Invalid date: {}. Use YYYY-MM-DD, today, yesterday or NdaysAgo", s))
    }
}

impl fmt::Display for DateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateSpec::Absolute(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            DateSpec::Today => f.write_str("today"),
            DateSpec::Yesterday => f.write_str("yesterday"),
            DateSpec::DaysAgo(n) => write!(f, "{}daysAgo", n),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateSpec,
    pub end: DateSpec,
}

impl DateRange {
    /// Build a range, rejecting a start that falls after the end.
    pub fn new(start: DateSpec, end: DateSpec) -> Result<Self> {
        let today = Local::now().date_naive();
        if start.resolve(today)? > end.resolve(today)? {
            bail!("Start date {} is after end date {}", start, end);
        }
        Ok(Self { start, end })
    }

    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(start.parse()?, end.parse()?)
    }
}

impl Default for DateRange {
    fn default() -> Self {
        Self {
            start: DateSpec::DaysAgo(30),
            end: DateSpec::Today,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderClause {
    pub field: String,
    pub descending: bool,
}

impl OrderClause {
    /// Parse `field` or `field:asc|desc`.
    pub fn parse(spec: &str) -> Result<Self> {
        let (field, direction) = match spec.split_once(':') {
            Some((field, direction)) => (field.trim(), direction.trim()),
            None => (spec.trim(), "asc"),
        };
        if field.is_empty() {
            bail!("Order clause is missing a field");
        }
        let descending = match direction.to_ascii_lowercase().as_str() {
            "asc" => false,
            "desc" => true,
            other => bail!("Unknown sort direction '{}'", other),
        };
        Ok(Self {
            field: field.to_string(),
            descending,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    pub dimensions: Vec<String>,
    pub metrics: Vec<String>,
    pub date_range: DateRange,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub order_bys: Vec<OrderClause>,
}

impl QuerySpec {
    pub fn new(dimensions: Vec<String>, metrics: Vec<String>) -> Self {
        Self {
            dimensions,
            metrics,
            date_range: DateRange::default(),
            limit: None,
            offset: None,
            order_bys: Vec::new(),
        }
    }

    /// Split a comma separated CLI list, dropping empty entries.
    pub fn parse_list(list: &str) -> Vec<String> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Reject queries the Data API would refuse. Duplicate dimensions and
    /// dimension/metric name collisions are accepted and only logged.
    pub fn validate(&self) -> Result<()> {
        if self.metrics.is_empty() {
            bail!("At least one metric is required");
        }
        if self.dimensions.iter().chain(&self.metrics).any(|n| n.trim().is_empty()) {
            bail!("Dimension and metric names cannot be empty");
        }

        let sources: HashSet<&str> = self.dimensions.iter().map(|d| source_of(d)).collect();
        if sources.len() > MAX_DIMENSIONS {
            bail!(
                "Too many dimensions: {} source dimensions requested, the API allows {}",
                sources.len(),
                MAX_DIMENSIONS
            );
        }
        if self.metrics.len() > MAX_METRICS {
            bail!(
                "Too many metrics: {} requested, the API allows {}",
                self.metrics.len(),
                MAX_METRICS
            );
        }

        for order in &self.order_bys {
            if !self.dimensions.contains(&order.field) && !self.metrics.contains(&order.field) {
                bail!(
                    "Cannot order by '{}': it is not a requested dimension or metric",
                    order.field
                );
            }
        }

        let mut seen = HashSet::new();
        for dimension in &self.dimensions {
            if !seen.insert(dimension.as_str()) {
                warn!(dimension = %dimension, "Dimension requested more than once");
            }
            if self.metrics.contains(dimension) {
                warn!(name = %dimension, "Name requested as both dimension and metric, metric value wins");
            }
        }

        Ok(())
    }

    /// Build the `runReport` body from this query and its resolved dimensions.
    pub fn to_request(&self, resolved: &ResolvedDimensions) -> ReportRequest {
        let order_bys = self
            .order_bys
            .iter()
            .map(|order| {
                if self.metrics.contains(&order.field) {
                    OrderByBody {
                        dimension: None,
                        metric: Some(MetricOrderBy {
                            metric_name: order.field.clone(),
                        }),
                        desc: order.descending,
                    }
                } else {
                    OrderByBody {
                        dimension: Some(DimensionOrderBy {
                            dimension_name: source_of(&order.field).to_string(),
                        }),
                        metric: None,
                        desc: order.descending,
                    }
                }
            })
            .collect();

        ReportRequest {
            date_ranges: vec![DateRangeBody {
                start_date: self.date_range.start.to_string(),
                end_date: self.date_range.end.to_string(),
            }],
            dimensions: resolved.api_dimensions.iter().map(NamedField::new).collect(),
            metrics: self.metrics.iter().map(NamedField::new).collect(),
            limit: self.limit,
            offset: self.offset,
            order_bys,
        }
    }

    /// Output columns in display order: dimensions (deduplicated) then metrics
    pub fn columns(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.dimensions
            .iter()
            .chain(&self.metrics)
            .filter(|name| seen.insert(name.as_str()))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::resolve_dimensions;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_date_spec_parsing() {
        assert_eq!("today".parse::<DateSpec>().unwrap(), DateSpec::Today);
        assert_eq!("7daysAgo".parse::<DateSpec>().unwrap(), DateSpec::DaysAgo(7));
        assert_eq!(
            "2025-01-31".parse::<DateSpec>().unwrap().to_string(),
            "2025-01-31"
        );
        assert!("2025-02-30".parse::<DateSpec>().is_err());
        assert!("xdaysAgo".parse::<DateSpec>().is_err());
    }

    #[test]
    fn test_date_range_rejects_inverted_range() {
        assert!(DateRange::parse("2025-02-01", "2025-01-01").is_err());
        assert!(DateRange::parse("2025-01-01", "2025-02-01").is_ok());
        assert!(DateRange::parse("today", "7daysAgo").is_err());
        assert!(DateRange::parse("28daysAgo", "yesterday").is_ok());
    }

    #[test]
    fn test_huge_relative_date_is_an_error() {
        assert!(DateRange::parse("100000000daysAgo", "today").is_err());
        assert!(DateRange::parse("yesterday", "4294967295daysAgo").is_err());

        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert_eq!(
            DateSpec::DaysAgo(1).resolve(today).unwrap(),
            NaiveDate::from_ymd_opt(2025, 2, 28).unwrap()
        );
        assert!(DateSpec::DaysAgo(u32::MAX).resolve(today).is_err());
    }

    #[test]
    fn test_order_clause_parse() {
        let clause = OrderClause::parse("sessions:desc").unwrap();
        assert_eq!(clause.field, "sessions");
        assert!(clause.descending);
        assert!(!OrderClause::parse("date").unwrap().descending);
        assert!(OrderClause::parse("date:sideways").is_err());
        assert!(OrderClause::parse(":desc").is_err());
    }

    #[test]
    fn test_validate() {
        let query = QuerySpec::new(names(&["country"]), vec![]);
        assert!(query.validate().is_err());

        let mut query = QuerySpec::new(names(&["country"]), names(&["sessions"]));
        assert!(query.validate().is_ok());

        query.order_bys.push(OrderClause::parse("totalUsers:desc").unwrap());
        assert!(query.validate().is_err());

        let many: Vec<String> = (0..10).map(|i| format!("customEvent:d{}", i)).collect();
        assert!(QuerySpec::new(many, names(&["sessions"])).validate().is_err());
    }

    #[test]
    fn test_shared_sources_count_once_against_limit() {
        let mut dimensions: Vec<String> = (0..8).map(|i| format!("customEvent:d{}", i)).collect();
        dimensions.push("pagePath".to_string());
        dimensions.push("domain".to_string());
        let query = QuerySpec::new(dimensions, names(&["sessions"]));
        assert!(query.validate().is_ok());
    }

    #[test]
    fn test_to_request_maps_derived_order_to_source() {
        let mut query = QuerySpec::new(names(&["domain", "country"]), names(&["sessions"]));
        query.limit = Some(50);
        query.order_bys = vec![
            OrderClause::parse("domain").unwrap(),
            OrderClause::parse("sessions:desc").unwrap(),
        ];
        let resolved = resolve_dimensions(&query.dimensions);
        let request = query.to_request(&resolved);

        let dims: Vec<_> = request.dimensions.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(dims, vec!["pagePath", "country"]);
        assert_eq!(
            request.order_bys[0].dimension.as_ref().unwrap().dimension_name,
            "pagePath"
        );
        assert_eq!(request.order_bys[1].metric.as_ref().unwrap().metric_name, "sessions");
        assert!(request.order_bys[1].desc);
        assert_eq!(request.date_ranges[0].start_date, "30daysAgo");
        assert_eq!(request.limit, Some(50));
    }

    #[test]
    fn test_columns_dedup() {
        let query = QuerySpec::new(names(&["date", "date", "country"]), names(&["sessions"]));
        assert_eq!(query.columns(), names(&["date", "country", "sessions"]));
        assert_eq!(QuerySpec::parse_list(" a, b,,c "), names(&["a", "b", "c"]));
    }
}
