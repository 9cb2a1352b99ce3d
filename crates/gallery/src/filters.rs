//! Validated pagination and sorting parameters for list queries.

use thiserror::Error;

const MAX_PAGE: i64 = 10_000_000;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("page {0} out of range (1..={MAX_PAGE})")]
    InvalidPage(i64),
    #[error("page size {0} out of range (1..={MAX_PAGE_SIZE})")]
    InvalidPageSize(i64),
    #[error("unsupported sort column {0:?}")]
    UnsupportedSort(String),
}

/// Validated pagination/sort request.
///
/// Construction is the validation boundary: a `Filters` value can only
/// hold a sort key present in the safelist supplied for that query, so
/// ORDER BY interpolation never sees caller input directly.
#[derive(Debug, Clone)]
pub struct Filters {
    page: i64,
    page_size: i64,
    sort: String,
}

impl Filters {
    pub fn new(
        page: i64,
        page_size: i64,
        sort: &str,
        safelist: &[&str],
    ) -> Result<Self, FilterError> {
        if !(1..=MAX_PAGE).contains(&page) {
            return Err(FilterError::InvalidPage(page));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(FilterError::InvalidPageSize(page_size));
        }
        if !safelist.contains(&sort) {
            return Err(FilterError::UnsupportedSort(sort.to_string()));
        }
        Ok(Self {
            page,
            page_size,
            sort: sort.to_string(),
        })
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn page_size(&self) -> i64 {
        self.page_size
    }

    pub fn sort_column(&self) -> &str {
        self.sort.trim_start_matches('-')
    }

    pub fn sort_direction(&self) -> &str {
        if self.sort.starts_with('-') {
            "DESC"
        } else {
            "ASC"
        }
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }
}

/// Result-set metadata computed alongside a filtered query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageInfo {
    pub current_page: i64,
    pub page_size: i64,
    pub first_page: i64,
    pub last_page: i64,
    pub total_records: i64,
}

impl PageInfo {
    pub fn calculate(total_records: i64, page: i64, page_size: i64) -> Self {
        if total_records == 0 {
            return Self::default();
        }
        Self {
            current_page: page,
            page_size,
            first_page: 1,
            last_page: (total_records + page_size - 1) / page_size,
            total_records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAFELIST: &[&str] = &["id", "-id", "name", "-name"];

    #[test]
    fn accepts_safelisted_sorts() {
        let filters = Filters::new(1, 10, "-name", SAFELIST).unwrap();
        assert_eq!(filters.sort_column(), "name");
        assert_eq!(filters.sort_direction(), "DESC");

        let filters = Filters::new(1, 10, "id", SAFELIST).unwrap();
        assert_eq!(filters.sort_column(), "id");
        assert_eq!(filters.sort_direction(), "ASC");
    }

    #[test]
    fn rejects_unknown_sort_before_any_query() {
        let err = Filters::new(1, 10, "name; DROP TABLE events", SAFELIST).unwrap_err();
        assert_eq!(
            err,
            FilterError::UnsupportedSort("name; DROP TABLE events".into())
        );
    }

    #[test]
    fn rejects_out_of_range_pages() {
        assert_eq!(
            Filters::new(0, 10, "id", SAFELIST).unwrap_err(),
            FilterError::InvalidPage(0)
        );
        assert_eq!(
            Filters::new(10_000_001, 10, "id", SAFELIST).unwrap_err(),
            FilterError::InvalidPage(10_000_001)
        );
        assert_eq!(
            Filters::new(1, 0, "id", SAFELIST).unwrap_err(),
            FilterError::InvalidPageSize(0)
        );
        assert_eq!(
            Filters::new(1, 101, "id", SAFELIST).unwrap_err(),
            FilterError::InvalidPageSize(101)
        );
    }

    #[test]
    fn offset_follows_page_and_size() {
        let filters = Filters::new(3, 25, "id", SAFELIST).unwrap();
        assert_eq!(filters.limit(), 25);
        assert_eq!(filters.offset(), 50);
    }

    #[test]
    fn page_info_rounds_last_page_up() {
        let info = PageInfo::calculate(21, 2, 10);
        assert_eq!(info.current_page, 2);
        assert_eq!(info.first_page, 1);
        assert_eq!(info.last_page, 3);
        assert_eq!(info.total_records, 21);
    }

    #[test]
    fn page_info_is_empty_for_zero_records() {
        assert_eq!(PageInfo::calculate(0, 1, 10), PageInfo::default());
    }
}
