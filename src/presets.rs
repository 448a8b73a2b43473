//! Built-in report presets

use crate::query::{DateRange, OrderClause, QuerySpec};

#[derive(Debug, Clone, Copy)]
pub struct Preset {
    pub name: &'static str,
    pub description: &'static str,
    pub dimensions: &'static [&'static str],
    pub metrics: &'static [&'static str],
    /// Default ordering as `(field, descending)`
    pub order: Option<(&'static str, bool)>,
}

pub const PRESETS: &[Preset] = &[
    Preset {
        name: "overview",
        description: "Daily sessions, users and page views",
        dimensions: &["date"],
        metrics: &["sessions", "totalUsers", "screenPageViews"],
        order: Some(("date", false)),
    },
    Preset {
        name: "top-pages",
        description: "Most viewed pages",
        dimensions: &["pagePath", "pageTitle"],
        metrics: &["screenPageViews", "sessions"],
        order: Some(("screenPageViews", true)),
    },
    Preset {
        name: "domains",
        description: "Traffic by hostname",
        dimensions: &["domain"],
        metrics: &["sessions", "screenPageViews"],
        order: Some(("sessions", true)),
    },
    Preset {
        name: "traffic-sources",
        description: "Sessions by source and medium",
        dimensions: &["sessionSource", "sessionMedium"],
        metrics: &["sessions", "totalUsers"],
        order: Some(("sessions", true)),
    },
    Preset {
        name: "devices",
        description: "Sessions by device category",
        dimensions: &["deviceCategory"],
        metrics: &["sessions", "totalUsers"],
        order: Some(("sessions", true)),
    },
    Preset {
        name: "user-types",
        description: "New versus returning users",
        dimensions: &["userType"],
        metrics: &["sessions", "totalUsers"],
        order: Some(("sessions", true)),
    },
    Preset {
        name: "countries",
        description: "Sessions by country",
        dimensions: &["country"],
        metrics: &["sessions", "totalUsers"],
        order: Some(("sessions", true)),
    },
];

pub fn find(name: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

pub fn all() -> &'static [Preset] {
    PRESETS
}

impl Preset {
    pub fn to_query(&self, date_range: DateRange, limit: Option<u64>) -> QuerySpec {
        let mut query = QuerySpec::new(
            self.dimensions.iter().map(|d| d.to_string()).collect(),
            self.metrics.iter().map(|m| m.to_string()).collect(),
        );
        query.date_range = date_range;
        query.limit = limit;
        if let Some((field, descending)) = self.order {
            query.order_bys.push(OrderClause {
                field: field.to_string(),
                descending,
            });
        }
        query
    }
}
