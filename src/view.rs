//! View State
//!
//! Sorting, filtering and pagination over finished report rows. All of it is
//! driven by an explicit [`ViewState`] that callers pass through the render
//! chain; nothing here keeps state between calls.

use crate::models::{CellValue, Row};
use anyhow::{bail, Result};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub column: String,
    pub descending: bool,
}

impl SortKey {
    /// Parse `column` or `column:asc|desc`.
    pub fn parse(spec: &str) -> Result<Self> {
        let mut parts = spec.splitn(2, ':');
        let column = parts
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow::anyhow!("Sort key is missing a column"))?;
        let descending = match parts.next().map(|d| d.trim().to_ascii_lowercase()) {
            None => false,
            Some(d) if d == "asc" => false,
            Some(d) if d == "desc" => true,
            Some(other) => bail!("Unknown sort direction '{}'", other),
        };
        Ok(Self {
            column: column.to_string(),
            descending,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    NotEq,
    Contains,
    Gt,
    Gte,
    Lt,
    Lte,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: String,
}

impl Filter {
    /// Parse `field<op>value` where op is one of `=`, `!=`, `~`, `>`, `>=`, `<`, `<=`.
    pub fn parse(expr: &str) -> Result<Self> {
        let Some(start) = expr.find(|c| matches!(c, '=' | '!' | '~' | '>' | '<')) else {
            bail!("Filter '{}' has no operator", expr);
        };
        let rest = &expr[start..];
        let (op, len) = if rest.starts_with(">=") {
            (FilterOp::Gte, 2)
        } else if rest.starts_with("<=") {
            (FilterOp::Lte, 2)
        } else if rest.starts_with("!=") {
            (FilterOp::NotEq, 2)
        } else if rest.starts_with('=') {
            (FilterOp::Eq, 1)
        } else if rest.starts_with('~') {
            (FilterOp::Contains, 1)
        } else if rest.starts_with('>') {
            (FilterOp::Gt, 1)
        } else if rest.starts_with('<') {
            (FilterOp::Lt, 1)
        } else {
            bail!("Filter '{}' has an unknown operator", expr);
        };

        let field = expr[..start].trim();
        if field.is_empty() {
            bail!("Filter '{}' is missing a field", expr);
        }
        Ok(Self {
            field: field.to_string(),
            op,
            value: rest[len..].trim().to_string(),
        })
    }

    pub fn matches(&self, row: &Row) -> bool {
        let Some(cell) = row.get(&self.field) else {
            return false;
        };
        let wanted = self.value.parse::<f64>().ok();

        match self.op {
            FilterOp::Eq => equals(cell, &self.value, wanted),
            FilterOp::NotEq => !equals(cell, &self.value, wanted),
            FilterOp::Contains => cell
                .to_string()
                .to_lowercase()
                .contains(&self.value.to_lowercase()),
            FilterOp::Gt | FilterOp::Gte | FilterOp::Lt | FilterOp::Lte => {
                let (Some(actual), Some(wanted)) = (cell.as_f64(), wanted) else {
                    return false;
                };
                match self.op {
                    FilterOp::Gt => actual > wanted,
                    FilterOp::Gte => actual >= wanted,
                    FilterOp::Lt => actual < wanted,
                    _ => actual <= wanted,
                }
            }
        }
    }
}

fn equals(cell: &CellValue, raw: &str, wanted: Option<f64>) -> bool {
    match (cell, wanted) {
        (CellValue::Number(n), Some(w)) => *n == w,
        _ => cell.to_string() == raw,
    }
}

/// One page of rows plus the totals needed to render a footer
#[derive(Debug, Clone)]
pub struct Page {
    pub rows: Vec<Row>,
    pub page: usize,
    pub total_pages: usize,
    pub total_rows: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub sort: Vec<SortKey>,
    pub filters: Vec<Filter>,
    /// Rows per page; 0 shows everything on one page
    pub page_size: usize,
    /// 1-based page number
    pub page: usize,
}

impl ViewState {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            page: 1,
            ..Default::default()
        }
    }

    pub fn filter_rows(&self, rows: Vec<Row>) -> Vec<Row> {
        rows.into_iter()
            .filter(|row| self.filters.iter().all(|f| f.matches(row)))
            .collect()
    }

    /// Stable multi-key sort in selection order. Missing values sort last.
    pub fn sort_rows(&self, rows: &mut [Row]) {
        if self.sort.is_empty() {
            return;
        }
        rows.sort_by(|a, b| {
            for key in &self.sort {
                let ord = match (a.get(&key.column), b.get(&key.column)) {
                    (Some(x), Some(y)) => {
                        let ord = compare_cells(x, y);
                        if key.descending {
                            ord.reverse()
                        } else {
                            ord
                        }
                    }
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
    }

    pub fn paginate(&self, rows: Vec<Row>) -> Page {
        let total_rows = rows.len();
        if self.page_size == 0 {
            return Page {
                rows,
                page: 1,
                total_pages: 1,
                total_rows,
            };
        }

        let full_pages = total_rows / self.page_size;
        let total_pages = (full_pages + usize::from(total_rows % self.page_size != 0)).max(1);
        let page = self.page.max(1);
        let rows = rows
            .into_iter()
            .skip((page - 1).saturating_mul(self.page_size))
            .take(self.page_size)
            .collect();

        Page {
            rows,
            page,
            total_pages,
            total_rows,
        }
    }

    /// Reject sort keys and filters naming a column the report does not
    /// output, including source columns projected away for a derived one.
    pub fn check_columns(&self, columns: &[String]) -> Result<()> {
        let sorted = self.sort.iter().map(|k| ("sort by", &k.column));
        let filtered = self.filters.iter().map(|f| ("filter on", &f.field));
        for (action, column) in sorted.chain(filtered) {
            if !columns.contains(column) {
                bail!(
                    "Cannot {} '{}': not an output column (available: {})",
                    action,
                    column,
                    columns.join(", ")
                );
            }
        }
        Ok(())
    }

    /// Filter, then sort, then cut out the current page.
    pub fn apply(&self, rows: Vec<Row>) -> Page {
        let mut rows = self.filter_rows(rows);
        self.sort_rows(&mut rows);
        self.paginate(rows)
    }
}

fn compare_cells(a: &CellValue, b: &CellValue) -> Ordering {
    match (a, b) {
        (CellValue::Number(x), CellValue::Number(y)) => x.total_cmp(y),
        (CellValue::Number(_), CellValue::Text(_)) => Ordering::Less,
        (CellValue::Text(_), CellValue::Number(_)) => Ordering::Greater,
        (CellValue::Text(x), CellValue::Text(y)) => x.cmp(y),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(path: &str, sessions: f64) -> Row {
        let mut row = Row::new();
        row.insert("pagePath".to_string(), CellValue::text(path));
        row.insert("sessions".to_string(), CellValue::Number(sessions));
        row
    }

    #[test]
    fn test_filter_parse() {
        let filter = Filter::parse("sessions>=10").unwrap();
        assert_eq!(filter.field, "sessions");
        assert_eq!(filter.op, FilterOp::Gte);
        assert_eq!(filter.value, "10");

        let filter = Filter::parse("pageTitle=a=b").unwrap();
        assert_eq!(filter.op, FilterOp::Eq);
        assert_eq!(filter.value, "a=b");

        assert_eq!(Filter::parse("country != US").unwrap().op, FilterOp::NotEq);
        assert!(Filter::parse("sessions").is_err());
        assert!(Filter::parse(">5").is_err());
        assert!(Filter::parse("a!b").is_err());
    }

    #[test]
    fn test_filter_matching() {
        let r = row("/Blog/post", 12.0);
        assert!(Filter::parse("pagePath~blog").unwrap().matches(&r));
        assert!(Filter::parse("sessions=12").unwrap().matches(&r));
        assert!(Filter::parse("sessions>10").unwrap().matches(&r));
        assert!(!Filter::parse("sessions<12").unwrap().matches(&r));
        assert!(!Filter::parse("pagePath>3").unwrap().matches(&r));
        assert!(!Filter::parse("missing=1").unwrap().matches(&r));
    }

    #[test]
    fn test_sort_is_stable_and_multi_key() {
        let mut rows = vec![row("/b", 5.0), row("/a", 5.0), row("/c", 9.0), row("/a", 1.0)];
        let view = ViewState {
            sort: vec![SortKey::parse("sessions:desc").unwrap()],
            ..ViewState::new(0)
        };
        view.sort_rows(&mut rows);
        let paths: Vec<_> = rows.iter().map(|r| r["pagePath"].to_string()).collect();
        assert_eq!(paths, vec!["/c", "/b", "/a", "/a"]);

        let view = ViewState {
            sort: vec![
                SortKey::parse("pagePath").unwrap(),
                SortKey::parse("sessions:desc").unwrap(),
            ],
            ..ViewState::new(0)
        };
        view.sort_rows(&mut rows);
        let order: Vec<_> = rows
            .iter()
            .map(|r| format!("{}:{}", r["pagePath"], r["sessions"]))
            .collect();
        assert_eq!(order, vec!["/a:5", "/a:1", "/b:5", "/c:9"]);
    }

    #[test]
    fn test_paginate() {
        let rows: Vec<Row> = (0..25).map(|i| row("/p", i as f64)).collect();
        let mut view = ViewState::new(10);
        view.page = 3;
        let page = view.paginate(rows.clone());
        assert_eq!(page.rows.len(), 5);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.total_rows, 25);

        view.page = 4;
        assert!(view.paginate(rows.clone()).rows.is_empty());

        let page = ViewState::new(0).paginate(rows);
        assert_eq!(page.rows.len(), 25);
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn test_check_columns() {
        let columns = vec!["domain".to_string(), "sessions".to_string()];
        let view = ViewState {
            sort: vec![SortKey::parse("sessions:desc").unwrap()],
            filters: vec![Filter::parse("domain~shop").unwrap()],
            ..ViewState::new(10)
        };
        assert!(view.check_columns(&columns).is_ok());

        let view = ViewState {
            filters: vec![Filter::parse("pagePath~blog").unwrap()],
            ..ViewState::new(10)
        };
        let err = view.check_columns(&columns).unwrap_err().to_string();
        assert!(err.contains("filter on 'pagePath'"), "{}", err);

        let view = ViewState {
            sort: vec![SortKey::parse("totalUsers").unwrap()],
            ..ViewState::new(10)
        };
        assert!(view.check_columns(&columns).is_err());
    }

    #[test]
    fn test_paginate_extreme_sizes() {
        let rows: Vec<Row> = (0..3).map(|i| row("/p", i as f64)).collect();

        let page = ViewState::new(usize::MAX).paginate(rows.clone());
        assert_eq!(page.rows.len(), 3);
        assert_eq!(page.total_pages, 1);

        let mut view = ViewState::new(2);
        view.page = usize::MAX;
        let page = view.paginate(rows.clone());
        assert!(page.rows.is_empty());
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.total_rows, 3);

        view.page = 0;
        assert_eq!(view.paginate(rows).page, 1);
    }

    #[test]
    fn test_apply_filters_before_paging() {
        let rows: Vec<Row> = (0..30).map(|i| row("/p", i as f64)).collect();
        let view = ViewState {
            filters: vec![Filter::parse("sessions>=20").unwrap()],
            sort: vec![SortKey::parse("sessions:desc").unwrap()],
            ..ViewState::new(4)
        };
        let page = view.apply(rows);
        assert_eq!(page.total_rows, 10);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.rows[0]["sessions"], CellValue::Number(29.0));
    }
}
