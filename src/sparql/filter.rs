//! Search criteria applied by the synthesizer

use crate::model::Value;

/// Constraint on one model field
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Regular expression match on the string value of the field
    Regex {
        field: String,
        pattern: String,
        case_insensitive: bool,
    },
    Equals { field: String, value: Value },
    /// Set membership, rendered as a `VALUES` block
    In { field: String, values: Vec<Value> },
    /// Inclusive bounds on a numeric or temporal field
    Range {
        field: String,
        min: Option<Value>,
        max: Option<Value>,
    },
}

impl Filter {
    /// Case-insensitive regex filter
    pub fn regex(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Filter::Regex {
            field: field.into(),
            pattern: pattern.into(),
            case_insensitive: true,
        }
    }

    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Equals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn one_of(field: impl Into<String>, values: Vec<Value>) -> Self {
        Filter::In {
            field: field.into(),
            values,
        }
    }

    pub fn range(field: impl Into<String>, min: Option<Value>, max: Option<Value>) -> Self {
        Filter::Range {
            field: field.into(),
            min,
            max,
        }
    }

    /// Field targeted by the filter
    pub fn field(&self) -> &str {
        match self {
            Filter::Regex { field, .. }
            | Filter::Equals { field, .. }
            | Filter::In { field, .. }
            | Filter::Range { field, .. } => field,
        }
    }
}

/// Sort key
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub descending: bool,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

/// Options of a synthesized select
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectOptions {
    pub filters: Vec<Filter>,
    pub order_by: Vec<OrderBy>,
    /// 0-based page index
    pub page: i64,
    /// Page size, `<= 0` disables pagination
    pub page_size: i64,
    /// Language of label values, `None` for every language
    pub lang: Option<String>,
}

impl SelectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    pub fn paginate(mut self, page: i64, page_size: i64) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    pub fn lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    /// `(offset, limit)` when pagination applies. Negative pages count as 0.
    pub fn pagination(&self) -> Option<(usize, usize)> {
        if self.page_size <= 0 {
            return None;
        }
        let page_size = self.page_size as usize;
        let page = self.page.max(0) as usize;
        Some((page.saturating_mul(page_size), page_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination() {
        assert_eq!(SelectOptions::new().pagination(), None);
        assert_eq!(SelectOptions::new().paginate(2, 0).pagination(), None);
        assert_eq!(SelectOptions::new().paginate(2, -5).pagination(), None);
        assert_eq!(SelectOptions::new().paginate(0, 10).pagination(), Some((0, 10)));
        assert_eq!(SelectOptions::new().paginate(3, 10).pagination(), Some((30, 10)));
        assert_eq!(SelectOptions::new().paginate(-1, 10).pagination(), Some((0, 10)));
    }

    #[test]
    fn test_filter_field() {
        assert_eq!(Filter::regex("brand", "^a").field(), "brand");
        assert_eq!(Filter::equals("uri", Value::Uri("urn:a".into())).field(), "uri");
    }
}
