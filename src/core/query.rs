//! Query parameters and pagination utilities

use crate::core::error::ValidationError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Number of items per page
///
/// The API accepts any limit, the dashboard only offers these three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum PageSize {
    Ten,
    #[default]
    Twenty,
    Fifty,
}

impl PageSize {
    pub const ALL: [PageSize; 3] = [PageSize::Ten, PageSize::Twenty, PageSize::Fifty];

    pub fn get(self) -> u32 {
        match self {
            PageSize::Ten => 10,
            PageSize::Twenty => 20,
            PageSize::Fifty => 50,
        }
    }
}

impl TryFrom<u32> for PageSize {
    type Error = ValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            10 => Ok(PageSize::Ten),
            20 => Ok(PageSize::Twenty),
            50 => Ok(PageSize::Fifty),
            other => Err(ValidationError::field(
                "limit",
                format!("page size must be 10, 20 or 50 (got {})", other),
            )),
        }
    }
}

impl From<PageSize> for u32 {
    fn from(size: PageSize) -> Self {
        size.get()
    }
}

/// Sort field for the expense list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    Date,
    Amount,
    Category,
    CreatedAt,
}

impl SortField {
    pub fn as_str(self) -> &'static str {
        match self {
            SortField::Date => "date",
            SortField::Amount => "amount",
            SortField::Category => "category",
            SortField::CreatedAt => "createdAt",
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Query parameters sent to the expense list endpoint
///
/// Unset fields are omitted from the query string entirely, so an empty
/// category or amount never reaches the server as `""` or `0`.
///
/// # Example
/// ```text
/// GET /api/v1/expenses?page=1&limit=20&sort=date&order=desc&search=Lunch
/// GET /api/v1/expenses?page=2&limit=50&sort=amount&order=asc&minAmount=10
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterQuery {
    /// Page number (starts at 1)
    pub page: u32,
    pub limit: PageSize,
    pub sort: SortField,
    pub order: SortOrder,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl Default for FilterQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: PageSize::default(),
            sort: SortField::default(),
            order: SortOrder::default(),
            from: None,
            to: None,
            category: None,
            min_amount: None,
            max_amount: None,
            search: None,
        }
    }
}

impl FilterQuery {
    /// Default query with a custom page size
    pub fn with_limit(limit: PageSize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    /// Get page number, ensuring minimum of 1
    pub fn page(&self) -> u32 {
        self.page.max(1)
    }

    /// Whether any narrowing filter (not paging or sorting) is set
    pub fn has_filters(&self) -> bool {
        self.from.is_some()
            || self.to.is_some()
            || self.category.is_some()
            || self.min_amount.is_some()
            || self.max_amount.is_some()
            || self.search.is_some()
    }

    /// Serialize into query-string pairs, skipping unset fields
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page().to_string()),
            ("limit", self.limit.get().to_string()),
            ("sort", self.sort.as_str().to_string()),
            ("order", self.order.as_str().to_string()),
        ];
        if let Some(from) = self.from {
            pairs.push(("from", from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = self.to {
            pairs.push(("to", to.format("%Y-%m-%d").to_string()));
        }
        if let Some(category) = non_blank(self.category.as_deref()) {
            pairs.push(("category", category.to_string()));
        }
        if let Some(min) = self.min_amount {
            pairs.push(("minAmount", min.to_string()));
        }
        if let Some(max) = self.max_amount {
            pairs.push(("maxAmount", max.to_string()));
        }
        if let Some(search) = non_blank(self.search.as_deref()) {
            pairs.push(("search", search.to_string()));
        }
        pairs
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// A single change merged into the [`FilterQuery`]
///
/// `None` payloads unset the field. The `*_input` constructors accept raw
/// form text where an empty string means "no filter".
#[derive(Debug, Clone, PartialEq)]
pub enum FilterChange {
    Sort(SortField),
    Order(SortOrder),
    From(Option<NaiveDate>),
    To(Option<NaiveDate>),
    Category(Option<String>),
    MinAmount(Option<f64>),
    MaxAmount(Option<f64>),
    Search(Option<String>),
}

impl FilterChange {
    /// Category from a select box; `""` clears the filter
    pub fn category_input(raw: &str) -> Self {
        FilterChange::Category(non_blank(Some(raw)).map(str::to_string))
    }

    /// Search text; blank after trimming clears the filter
    pub fn search_input(raw: &str) -> Self {
        FilterChange::Search(non_blank(Some(raw)).map(str::to_string))
    }

    pub fn min_amount_input(raw: &str) -> Result<Self, ValidationError> {
        parse_amount_input("minAmount", raw).map(FilterChange::MinAmount)
    }

    pub fn max_amount_input(raw: &str) -> Result<Self, ValidationError> {
        parse_amount_input("maxAmount", raw).map(FilterChange::MaxAmount)
    }

    pub fn from_input(raw: &str) -> Result<Self, ValidationError> {
        parse_date_input("from", raw).map(FilterChange::From)
    }

    pub fn to_input(raw: &str) -> Result<Self, ValidationError> {
        parse_date_input("to", raw).map(FilterChange::To)
    }

    /// Merge this change into a query. Does not touch `page`.
    ///
    /// Blank category and search text unset the filter, whichever
    /// constructor built the change.
    pub fn apply_to(self, query: &mut FilterQuery) {
        match self {
            FilterChange::Sort(sort) => query.sort = sort,
            FilterChange::Order(order) => query.order = order,
            FilterChange::From(from) => query.from = from,
            FilterChange::To(to) => query.to = to,
            FilterChange::Category(category) => {
                query.category = non_blank(category.as_deref()).map(str::to_string)
            }
            FilterChange::MinAmount(min) => query.min_amount = min,
            FilterChange::MaxAmount(max) => query.max_amount = max,
            FilterChange::Search(search) => {
                query.search = non_blank(search.as_deref()).map(str::to_string)
            }
        }
    }
}

/// Parse an amount filter field; empty input means unset
pub fn parse_amount_input(field: &str, raw: &str) -> Result<Option<f64>, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(Some(value)),
        _ => Err(ValidationError::field(
            field,
            format!("'{}' is not a valid amount", raw),
        )),
    }
}

fn parse_date_input(field: &str, raw: &str) -> Result<Option<NaiveDate>, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| ValidationError::field(field, "Date must be YYYY-MM-DD"))
}

/// One page of a list endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// The page items, in server order
    pub items: Vec<T>,

    /// Pagination metadata
    pub pagination: PaginationMeta,
}

impl<T> Page<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Pagination metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    /// Current page number (starts at 1)
    pub page: u32,

    /// Number of items per page
    pub limit: u32,

    /// Total number of items (after filters)
    pub total: u64,

    /// Total number of pages
    pub total_pages: u32,

    /// Whether there is a next page
    pub has_next: bool,

    /// Whether there is a previous page
    pub has_prev: bool,
}

impl PaginationMeta {
    /// Create pagination metadata from calculation
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let limit = limit.max(1);
        let page = page.max(1);
        let total_pages = if total == 0 {
            0
        } else {
            u32::try_from(total.div_ceil(u64::from(limit))).unwrap_or(u32::MAX)
        };

        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1 && total_pages > 0,
        }
    }
}
