//! List query construction.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Largest page the server accepts.
pub(crate) const MAX_PAGE_SIZE: u32 = 100;

/// Sort order of a sort clause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One sort clause of a list query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

/// An immutable description of a list request.
///
/// Built with consuming `with_*` methods; the client never mutates it, so
/// the same query can be reissued for every page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    table: String,
    view: Option<String>,
    filter_formula: Option<String>,
    fields: Vec<String>,
    sort: Vec<Sort>,
    page_size: Option<u32>,
    max_records: Option<u32>,
}

impl Query {
    /// Creates a query listing every record of a table.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            view: None,
            filter_formula: None,
            fields: Vec::new(),
            sort: Vec::new(),
            page_size: None,
            max_records: None,
        }
    }

    /// Restricts the listing to a named view.
    #[must_use]
    pub fn with_view(mut self, view: impl Into<String>) -> Self {
        self.view = Some(view.into());
        self
    }

    /// Filters records with an Airtable formula, e.g. `{Score} >= 70`.
    #[must_use]
    pub fn with_filter(mut self, formula: impl Into<String>) -> Self {
        self.filter_formula = Some(formula.into());
        self
    }

    /// Projects the listing onto the given fields.
    #[must_use]
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Appends a sort clause.
    #[must_use]
    pub fn with_sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort.push(Sort {
            field: field.into(),
            direction,
        });
        self
    }

    /// Overrides the configured page size. Clamped to `1..=100`.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Caps the total number of records the server returns across all pages.
    #[must_use]
    pub fn with_max_records(mut self, max_records: u32) -> Self {
        self.max_records = Some(max_records);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn view(&self) -> Option<&str> {
        self.view.as_deref()
    }

    pub fn filter_formula(&self) -> Option<&str> {
        self.filter_formula.as_deref()
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn sort(&self) -> &[Sort] {
        &self.sort
    }

    pub fn max_records(&self) -> Option<u32> {
        self.max_records
    }

    /// Page size sent to the server, falling back to `default_page_size`.
    pub fn page_size(&self, default_page_size: u32) -> u32 {
        self.page_size
            .unwrap_or(default_page_size)
            .clamp(1, MAX_PAGE_SIZE)
    }

    /// Encodes the query as list parameters for one page request.
    pub(crate) fn params(&self, default_page_size: u32, offset: Option<&str>) -> Vec<(String, String)> {
        let mut params = Vec::new();

        if let Some(view) = &self.view {
            params.push(("view".to_owned(), view.clone()));
        }
        if let Some(formula) = &self.filter_formula {
            params.push(("filterByFormula".to_owned(), formula.clone()));
        }
        for field in &self.fields {
            params.push(("fields[]".to_owned(), field.clone()));
        }
        for (i, sort) in self.sort.iter().enumerate() {
            params.push((format!("sort[{i}][field]"), sort.field.clone()));
            params.push((format!("sort[{i}][direction]"), sort.direction.to_string()));
        }
        if let Some(max_records) = self.max_records {
            params.push(("maxRecords".to_owned(), max_records.to_string()));
        }
        params.push((
            "pageSize".to_owned(),
            self.page_size(default_page_size).to_string(),
        ));
        if let Some(offset) = offset {
            params.push(("offset".to_owned(), offset.to_owned()));
        }

        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(params: &[(String, String)]) -> Vec<(&str, &str)> {
        params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    #[test]
    fn test_minimal_query_params() {
        let query = Query::new("Properties");
        assert_eq!(
            pairs(&query.params(100, None)),
            vec![("pageSize", "100")]
        );
    }

    #[test]
    fn test_full_query_params_in_order() {
        let query = Query::new("Properties")
            .with_view("Grid view")
            .with_filter("{Motivation Score} >= 70")
            .with_fields(["Address", "ARV"])
            .with_sort("ARV", SortDirection::Desc)
            .with_max_records(50)
            .with_page_size(25);

        assert_eq!(
            pairs(&query.params(100, Some("itr123/rec456"))),
            vec![
                ("view", "Grid view"),
                ("filterByFormula", "{Motivation Score} >= 70"),
                ("fields[]", "Address"),
                ("fields[]", "ARV"),
                ("sort[0][field]", "ARV"),
                ("sort[0][direction]", "desc"),
                ("maxRecords", "50"),
                ("pageSize", "25"),
                ("offset", "itr123/rec456"),
            ]
        );
    }

    #[test]
    fn test_page_size_is_clamped() {
        assert_eq!(Query::new("t").with_page_size(0).page_size(100), 1);
        assert_eq!(Query::new("t").with_page_size(500).page_size(100), 100);
        assert_eq!(Query::new("t").page_size(10), 10);
    }
}
