//! Row Pipeline
//!
//! Turns a Data API response into display rows in four steps:
//!
//! 1. **Resolve**: [`resolve_dimensions`] collapses the requested user-facing
//!    dimensions into the deduplicated source list sent to the API, remembering
//!    which user names each source feeds.
//! 2. **Build**: [`build_row`] zips a positional [`ApiRow`] into a keyed row,
//!    copying each source value into every user name mapped to it.
//! 3. **Transform**: [`transform_row`] computes derived dimensions from their
//!    source values.
//! 4. **Project**: [`project_row`] drops source columns that only existed to
//!    feed a derived dimension.
//!
//! Every step is synchronous and infallible. Short or missing values in the
//! response become `""` for dimensions and `0` for metrics.

use crate::dimensions::{source_of, transform_of};
use crate::models::{ApiRow, CellValue, Row, RunReportResponse};
use crate::query::QuerySpec;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Source dimensions for one query and the user names each one feeds
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedDimensions {
    /// Deduplicated source names in first-seen order
    pub api_dimensions: Vec<String>,
    /// `(source, user names)` aligned with `api_dimensions`
    pub mapping: Vec<(String, Vec<String>)>,
}

impl ResolvedDimensions {
    pub fn users_of(&self, source: &str) -> &[String] {
        self.mapping
            .iter()
            .find(|(s, _)| s == source)
            .map(|(_, users)| users.as_slice())
            .unwrap_or(&[])
    }
}

pub fn resolve_dimensions(requested: &[String]) -> ResolvedDimensions {
    let mut resolved = ResolvedDimensions::default();

    for dimension in requested {
        let source = source_of(dimension);
        let bucket = match resolved.api_dimensions.iter().position(|s| s == source) {
            Some(idx) => idx,
            None => {
                resolved.api_dimensions.push(source.to_string());
                resolved.mapping.push((source.to_string(), Vec::new()));
                resolved.mapping.len() - 1
            }
        };

        let users = &mut resolved.mapping[bucket].1;
        if users.contains(dimension) {
            warn!(dimension = %dimension, "Duplicate dimension in query");
        }
        users.push(dimension.clone());
    }

    debug!(
        requested = requested.len(),
        api = resolved.api_dimensions.len(),
        "Resolved query dimensions"
    );
    resolved
}

/// Expand one positional API row into a keyed row.
pub fn build_row(resolved: &ResolvedDimensions, metrics: &[String], raw: &ApiRow) -> Row {
    let mut row = Row::with_capacity(resolved.mapping.len() * 2 + metrics.len());

    for (idx, (source, users)) in resolved.mapping.iter().enumerate() {
        let value = raw
            .dimension_values
            .get(idx)
            .and_then(|cell| cell.value.as_deref())
            .unwrap_or("");
        row.insert(source.clone(), CellValue::text(value));
        for user in users {
            row.insert(user.clone(), CellValue::text(value));
        }
    }

    for (idx, metric) in metrics.iter().enumerate() {
        let value = raw
            .metric_values
            .get(idx)
            .and_then(|cell| cell.value.as_deref())
            .map(parse_metric)
            .unwrap_or(0.0);
        row.insert(metric.clone(), CellValue::Number(value));
    }

    row
}

fn parse_metric(value: &str) -> f64 {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

/// Overwrite every derived dimension in `dimensions` with its transform of the
/// source value. All transforms read the row as it was built, so dimensions
/// sharing a source never see each other's output.
pub fn transform_row(dimensions: &[String], mut row: Row) -> Row {
    let updates: Vec<(String, CellValue)> = dimensions
        .iter()
        .filter_map(|dimension| {
            let transform = transform_of(dimension)?;
            let source = row
                .get(source_of(dimension))
                .and_then(CellValue::as_text)
                .unwrap_or("");
            Some((dimension.clone(), transform.apply(&row, source)))
        })
        .collect();

    for (key, value) in updates {
        row.insert(key, value);
    }
    row
}

/// Source columns to drop: those feeding a derived dimension without being
/// requested themselves. Requested metric names are never dropped.
pub fn instrumental_sources(dimensions: &[String], metrics: &[String]) -> HashSet<String> {
    let requested: HashSet<&str> = dimensions
        .iter()
        .chain(metrics)
        .map(String::as_str)
        .collect();

    dimensions
        .iter()
        .map(|d| source_of(d))
        .filter(|source| !requested.contains(source))
        .map(str::to_string)
        .collect()
}

pub fn project_row(mut row: Row, instrumental: &HashSet<String>) -> Row {
    for source in instrumental {
        row.remove(source);
    }
    row
}

/// The pipeline for a single query, computed once and applied per row.
#[derive(Debug, Clone)]
pub struct RowShaper {
    dimensions: Vec<String>,
    metrics: Vec<String>,
    resolved: ResolvedDimensions,
    instrumental: HashSet<String>,
}

impl RowShaper {
    pub fn new(query: &QuerySpec) -> Self {
        Self {
            dimensions: query.dimensions.clone(),
            metrics: query.metrics.clone(),
            resolved: resolve_dimensions(&query.dimensions),
            instrumental: instrumental_sources(&query.dimensions, &query.metrics),
        }
    }

    pub fn resolved(&self) -> &ResolvedDimensions {
        &self.resolved
    }

    pub fn shape(&self, raw: &ApiRow) -> Row {
        let row = build_row(&self.resolved, &self.metrics, raw);
        let row = transform_row(&self.dimensions, row);
        project_row(row, &self.instrumental)
    }

    pub fn shape_all(&self, response: &RunReportResponse) -> Vec<Row> {
        response.rows.iter().map(|raw| self.shape(raw)).collect()
    }
}
