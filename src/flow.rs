//! Session Flow
//!
//! A light flow report assembled from two dimension-grouped queries: sessions
//! by landing page and activity by page path. The ratios are illustrative
//! page-level indicators, not GA4's own exit or conversion rates.

use crate::models::Row;
use crate::query::{DateRange, QuerySpec};
use serde::Serialize;
use std::collections::HashMap;

const LANDING_PAGE: &str = "landingPage";
const PAGE_PATH: &str = "pagePath";
const SESSIONS: &str = "sessions";
const VIEWS: &str = "screenPageViews";
const KEY_EVENTS: &str = "keyEvents";

pub fn entry_query(date_range: DateRange) -> QuerySpec {
    let mut query = QuerySpec::new(vec![LANDING_PAGE.to_string()], vec![SESSIONS.to_string()]);
    query.date_range = date_range;
    query
}

pub fn page_query(date_range: DateRange) -> QuerySpec {
    let mut query = QuerySpec::new(
        vec![PAGE_PATH.to_string()],
        vec![VIEWS.to_string(), SESSIONS.to_string(), KEY_EVENTS.to_string()],
    );
    query.date_range = date_range;
    query
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlowStep {
    pub page: String,
    pub entries: f64,
    pub views: f64,
    pub sessions: f64,
    pub key_events: f64,
    /// sessions / views
    pub exit_ratio: f64,
    /// key events / sessions
    pub conversion_ratio: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowReport {
    pub total_entries: f64,
    pub total_views: f64,
    pub steps: Vec<FlowStep>,
}

impl FlowReport {
    /// Merge the two query results by page and keep the `top_n` pages with
    /// the most entries (views break ties).
    pub fn from_rows(entry_rows: &[Row], page_rows: &[Row], top_n: usize) -> Self {
        let mut pages: HashMap<String, FlowStep> = HashMap::new();

        for row in entry_rows {
            let page = text(row, LANDING_PAGE);
            let step = pages.entry(page.clone()).or_insert_with(|| empty_step(page));
            step.entries += number(row, SESSIONS);
        }
        for row in page_rows {
            let page = text(row, PAGE_PATH);
            let step = pages.entry(page.clone()).or_insert_with(|| empty_step(page));
            step.views += number(row, VIEWS);
            step.sessions += number(row, SESSIONS);
            step.key_events += number(row, KEY_EVENTS);
        }

        let mut steps: Vec<FlowStep> = pages
            .into_values()
            .map(|mut step| {
                step.exit_ratio = ratio(step.sessions, step.views);
                step.conversion_ratio = ratio(step.key_events, step.sessions);
                step
            })
            .collect();

        let total_entries: f64 = steps.iter().map(|s| s.entries).sum();
        let total_views: f64 = steps.iter().map(|s| s.views).sum();

        steps.sort_by(|a, b| {
            b.entries
                .total_cmp(&a.entries)
                .then(b.views.total_cmp(&a.views))
                .then_with(|| a.page.cmp(&b.page))
        });
        steps.truncate(top_n);

        Self {
            total_entries,
            total_views,
            steps,
        }
    }
}

fn empty_step(page: String) -> FlowStep {
    FlowStep {
        page,
        entries: 0.0,
        views: 0.0,
        sessions: 0.0,
        key_events: 0.0,
        exit_ratio: 0.0,
        conversion_ratio: 0.0,
    }
}

fn text(row: &Row, key: &str) -> String {
    row.get(key).map(|v| v.to_string()).unwrap_or_default()
}

fn number(row: &Row, key: &str) -> f64 {
    row.get(key).and_then(|v| v.as_f64()).unwrap_or(0.0)
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}
