//! Dimension Registry
//!
//! Maps user-facing dimension names onto the source dimensions understood by the
//! Data API. A dimension is either *plain* (its own source, no entry here) or
//! *derived* (a registered source plus a [`Transform`]).
//!
//! Adding a derived dimension takes a [`Transform`] variant, its `apply` arm and
//! one [`DERIVED_DIMENSIONS`] entry. Resolution, row building and projection
//! pick it up without changes.

use crate::models::{CellValue, Row};
use url::Url;

/// Origin used to resolve relative page paths into URLs
const PLACEHOLDER_ORIGIN: &str = "https://example.com";

/// Closed set of transforms a derived dimension can apply to its source value.
///
/// Every variant is total: empty or malformed input yields an empty string,
/// zero or the input unchanged, never a panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// Hostname of the source resolved against [`PLACEHOLDER_ORIGIN`]
    Hostname,
    /// Number of non-empty path segments, as a number
    PathDepth,
    /// Drops the trailing `" - Site Name"` suffix and normalizes whitespace
    CleanTitle,
    /// `new` / `returning` to display labels
    UserTypeLabel,
    /// `desktop` / `mobile` / `tablet` to display labels
    DeviceLabel,
}

impl Transform {
    /// Compute the derived value. `_row` is the expanded row, available for
    /// transforms that combine several columns.
    pub fn apply(self, _row: &Row, source: &str) -> CellValue {
        let value = match self {
            Transform::PathDepth => return CellValue::Number(path_depth(source) as f64),
            Transform::Hostname => hostname(source),
            Transform::CleanTitle => clean_title(source),
            Transform::UserTypeLabel => label(source, &[("new", "New User"), ("returning", "Returning User")]),
            Transform::DeviceLabel => label(
                source,
                &[("desktop", "Desktop"), ("mobile", "Mobile"), ("tablet", "Tablet")],
            ),
        };
        CellValue::Text(value)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DerivedDimension {
    pub name: &'static str,
    pub source: &'static str,
    pub transform: Transform,
    pub description: &'static str,
}

pub const DERIVED_DIMENSIONS: &[DerivedDimension] = &[
    DerivedDimension {
        name: "domain",
        source: "pagePath",
        transform: Transform::Hostname,
        description: "Hostname parsed from the page path",
    },
    DerivedDimension {
        name: "pageDepth",
        source: "pagePath",
        transform: Transform::PathDepth,
        description: "Number of segments in the page path",
    },
    DerivedDimension {
        name: "pageTitle",
        source: "pageTitle",
        transform: Transform::CleanTitle,
        description: "Page title without the trailing site name",
    },
    DerivedDimension {
        name: "userType",
        source: "newVsReturning",
        transform: Transform::UserTypeLabel,
        description: "New or returning user label",
    },
    DerivedDimension {
        name: "deviceCategory",
        source: "deviceCategory",
        transform: Transform::DeviceLabel,
        description: "Title-cased device category",
    },
];

pub fn lookup(name: &str) -> Option<&'static DerivedDimension> {
    DERIVED_DIMENSIONS.iter().find(|d| d.name == name)
}

/// Source dimension for `name`; plain and unknown names map to themselves.
pub fn source_of(name: &str) -> &str {
    match lookup(name) {
        Some(derived) => derived.source,
        None => name,
    }
}

pub fn transform_of(name: &str) -> Option<Transform> {
    lookup(name).map(|d| d.transform)
}

pub fn is_derived(name: &str) -> bool {
    lookup(name).is_some()
}

fn resolve_url(source: &str) -> Option<Url> {
    Url::parse(PLACEHOLDER_ORIGIN)
        .and_then(|base| base.join(source))
        .ok()
}

fn hostname(source: &str) -> String {
    resolve_url(source)
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_default()
}

fn path_depth(source: &str) -> usize {
    resolve_url(source)
        .and_then(|url| url.path_segments().map(|segments| segments.filter(|s| !s.is_empty()).count()))
        .unwrap_or(0)
}

fn clean_title(source: &str) -> String {
    let title = match source.rfind(" - ") {
        Some(idx) => &source[..idx],
        None => source,
    };
    title.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn label(source: &str, labels: &[(&str, &str)]) -> String {
    labels
        .iter()
        .find(|(raw, _)| raw.eq_ignore_ascii_case(source.trim()))
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| source.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn apply(name: &str, source: &str) -> String {
        let transform = transform_of(name).unwrap();
        transform.apply(&Row::new(), source).to_string()
    }

    #[test]
    fn test_registry_names_are_unique() {
        let names: HashSet<_> = DERIVED_DIMENSIONS.iter().map(|d| d.name).collect();
        assert_eq!(names.len(), DERIVED_DIMENSIONS.len());
        assert!(DERIVED_DIMENSIONS.iter().all(|d| !d.source.is_empty()));
    }

    #[test]
    fn test_source_of() {
        assert_eq!(source_of("domain"), "pagePath");
        assert_eq!(source_of("userType"), "newVsReturning");
        assert_eq!(source_of("country"), "country");
        assert_eq!(source_of("somethingUnknown"), "somethingUnknown");
        assert!(transform_of("country").is_none());
        assert!(is_derived("domain"));
        assert!(!is_derived("pagePath"));
    }

    #[test]
    fn test_hostname() {
        assert_eq!(apply("domain", "/products/shoe"), "example.com");
        assert_eq!(apply("domain", "https://shop.example.org/cart?x=1"), "shop.example.org");
        assert_eq!(apply("domain", ""), "example.com");
        assert_eq!(apply("domain", "http://[::1"), "");
    }

    #[test]
    fn test_path_depth() {
        assert_eq!(apply("pageDepth", "/products/shoe"), "2");
        assert_eq!(apply("pageDepth", "/blog/2025/01/?ref=x"), "3");
        assert_eq!(apply("pageDepth", "https://shop.example.org/cart"), "1");
        assert_eq!(apply("pageDepth", "/"), "0");
        assert_eq!(apply("pageDepth", ""), "0");
        assert_eq!(apply("pageDepth", "http://[::1"), "0");
    }

    #[test]
    fn test_clean_title() {
        assert_eq!(apply("pageTitle", "Running Shoes - Shop - Example"), "Running Shoes - Shop");
        assert_eq!(apply("pageTitle", "  Home   page  "), "Home page");
        assert_eq!(apply("pageTitle", "Checkout -Done"), "Checkout -Done");
        assert_eq!(apply("pageTitle", ""), "");
    }

    #[test]
    fn test_labels_are_case_insensitive() {
        assert_eq!(apply("userType", "NEW"), "New User");
        assert_eq!(apply("userType", "returning"), "Returning User");
        assert_eq!(apply("userType", "(not set)"), "(not set)");
        assert_eq!(apply("deviceCategory", "Mobile"), "Mobile");
        assert_eq!(apply("deviceCategory", "tablet"), "Tablet");
        assert_eq!(apply("deviceCategory", "smarttv"), "smarttv");
        assert_eq!(apply("deviceCategory", ""), "");
    }
}
