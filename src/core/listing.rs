use crate::core::search::searchable_text;
use crate::domain::model::{EntityKind, Record};
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;

/// Dropdown value meaning "no filter".
pub const ALL_OPTION: &str = "all";
pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub value: String,
}

impl FieldFilter {
    pub fn new(field: &str, value: &str) -> Self {
        Self {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    /// Parses `field=value`.
    pub fn parse(spec: &str) -> Option<Self> {
        let (field, value) = spec.split_once('=')?;
        let field = field.trim();
        if field.is_empty() {
            return None;
        }
        Some(Self::new(field, value.trim()))
    }

    fn is_wildcard(&self) -> bool {
        self.value.is_empty() || self.value.eq_ignore_ascii_case(ALL_OPTION)
    }

    fn matches(&self, record: &Record) -> bool {
        if self.is_wildcard() {
            return true;
        }
        match record.get(&self.field) {
            Some(Value::Array(items)) => items
                .iter()
                .any(|item| scalar_text(item).is_some_and(|t| t.eq_ignore_ascii_case(&self.value))),
            Some(value) => scalar_text(value).is_some_and(|t| t.eq_ignore_ascii_case(&self.value)),
            None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    /// Status-style tab on top of the list.
    pub tab: Option<FieldFilter>,
    /// Dropdown filters; all of them must hold.
    pub filters: Vec<FieldFilter>,
    pub text: Option<String>,
    pub sort_by: Option<String>,
    pub order: SortOrder,
    /// 1-based.
    pub page: usize,
    pub page_size: usize,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            tab: None,
            filters: Vec::new(),
            text: None,
            sort_by: None,
            order: SortOrder::Asc,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

impl ListQuery {
    pub fn matches(&self, kind: EntityKind, record: &Record) -> bool {
        if let Some(tab) = &self.tab {
            if !tab.matches(record) {
                return false;
            }
        }
        if !self.filters.iter().all(|filter| filter.matches(record)) {
            return false;
        }
        match self.text.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => {
                searchable_text(kind, record).contains(&text.to_lowercase())
            }
            _ => true,
        }
    }

    pub fn apply(&self, kind: EntityKind, records: &[Record]) -> Page<Record> {
        let mut matched: Vec<&Record> = records
            .iter()
            .filter(|record| self.matches(kind, record))
            .collect();

        if let Some(field) = &self.sort_by {
            matched.sort_by(|a, b| compare_field(a.get(field), b.get(field), self.order));
        }

        let page_size = self.page_size.max(1);
        let page = self.page.max(1);
        let total = matched.len();
        let total_pages = total.div_ceil(page_size);

        let items = matched
            .into_iter()
            .skip((page - 1).saturating_mul(page_size))
            .take(page_size)
            .cloned()
            .collect();

        Page {
            items,
            total,
            page,
            page_size,
            total_pages,
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Sort bucket for mixed-type columns: numbers, then text, then booleans,
/// then structured values.
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Number(_) => 0,
        Value::String(_) => 1,
        Value::Bool(_) => 2,
        _ => 3,
    }
}

/// Missing and null values sort last in either direction.
fn compare_field(a: Option<&Value>, b: Option<&Value>, order: SortOrder) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());

    let (x, y) = match (a, b) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => return Ordering::Greater,
        (Some(_), None) => return Ordering::Less,
        (Some(x), Some(y)) => (x, y),
    };

    let ordering = type_rank(x).cmp(&type_rank(y)).then_with(|| match (x, y) {
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.total_cmp(&y)
        }
        (Value::String(x), Value::String(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => x.to_string().cmp(&y.to_string()),
    });

    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}
