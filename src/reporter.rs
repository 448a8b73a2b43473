//! Report Engine
//!
//! [`AnalyticsReporter`] runs a report end to end:
//!
//! 1. **Validate**: reject queries the Data API would refuse
//! 2. **Resolve**: map user dimensions onto source dimensions
//! 3. **Fetch**: call `runReport` through [`AnalyticsClient`]
//! 4. **Shape**: expand, transform and project rows via [`RowShaper`]
//! 5. **View**: filter, sort and paginate with the caller's [`ViewState`]
//! 6. **Render**: format the page through [`DisplayManager`]
//!
//! Each report runs inside a span carrying a fresh request id.

use crate::client::AnalyticsClient;
use crate::display::{DisplayManager, OutputFormat};
use crate::flow::{self, FlowReport};
use crate::logging::report_span;
use crate::models::Row;
use crate::pipeline::RowShaper;
use crate::query::{DateRange, QuerySpec};
use crate::view::ViewState;
use anyhow::{Context, Result};
use std::time::Instant;
use tracing::{info, Instrument};

pub struct AnalyticsReporter {
    client: AnalyticsClient,
    display_manager: DisplayManager,
}

impl AnalyticsReporter {
    pub fn new(client: AnalyticsClient, display_manager: DisplayManager) -> Self {
        Self {
            client,
            display_manager,
        }
    }

    /// Run `query` and return its finished rows, before any view is applied.
    pub async fn fetch_rows(&self, property_id: &str, query: &QuerySpec) -> Result<Vec<Row>> {
        query.validate()?;

        let shaper = RowShaper::new(query);
        let request = query.to_request(shaper.resolved());
        let started = Instant::now();

        let response = self
            .client
            .run_report(property_id, &request)
            .await
            .with_context(|| format!("Report failed for property {}", property_id))?;
        let rows = shaper.shape_all(&response);

        info!(
            rows = rows.len(),
            api_dimensions = request.dimensions.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Report rows shaped"
        );
        Ok(rows)
    }

    pub async fn run_query(
        &self,
        property_id: &str,
        query: &QuerySpec,
        view: &ViewState,
        format: OutputFormat,
    ) -> Result<String> {
        async {
            let rows = self.fetch_rows(property_id, query).await?;
            let page = view.apply(rows);
            self.display_manager.render(&page, &query.columns(), format)
        }
        .instrument(report_span("query", property_id))
        .await
    }

    /// Fetch entry pages and page activity concurrently and merge them.
    pub async fn run_flow(
        &self,
        property_id: &str,
        date_range: DateRange,
        top_n: usize,
        format: OutputFormat,
    ) -> Result<String> {
        async {
            let entry_query = flow::entry_query(date_range);
            let page_query = flow::page_query(date_range);

            let (entry_rows, page_rows) = futures::try_join!(
                self.fetch_rows(property_id, &entry_query),
                self.fetch_rows(property_id, &page_query)
            )?;

            let report = FlowReport::from_rows(&entry_rows, &page_rows, top_n);
            self.display_manager.render_flow(&report, format)
        }
        .instrument(report_span("flow", property_id))
        .await
    }

    pub async fn list_properties(&self, format: OutputFormat) -> Result<String> {
        let properties = self.client.list_properties().await?;
        self.display_manager.render_properties(&properties, format)
    }
}
