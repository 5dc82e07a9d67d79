//! Query Builder pagination operations

use serde::Serialize;

use super::builder::QueryBuilder;

impl<M> QueryBuilder<M> {
    /// Add LIMIT clause
    pub fn limit(mut self, count: i64) -> Self {
        self.limit_count = Some(count);
        self
    }

    /// Add OFFSET clause
    pub fn offset(mut self, count: i64) -> Self {
        self.offset_value = Some(count);
        self
    }

    /// Alias for [`limit`](Self::limit)
    pub fn take(self, count: i64) -> Self {
        self.limit(count)
    }

    /// Alias for [`offset`](Self::offset)
    pub fn skip(self, count: i64) -> Self {
        self.offset(count)
    }

    /// Restrict to one page (LIMIT + OFFSET); page numbers start at 1
    pub fn for_page(self, page: u64, per_page: u64) -> Self {
        let page = page.max(1);
        let per_page = per_page.max(1);
        let offset = (page - 1).saturating_mul(per_page);
        self.limit(clamp_to_i64(per_page)).offset(clamp_to_i64(offset))
    }
}

// LIMIT and OFFSET are signed 64-bit in SQLite
fn clamp_to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Page metadata computed from the total row count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub current_page: u64,
    pub per_page: u64,
    pub total: u64,
    pub last_page: u64,
    pub from: Option<u64>,
    pub to: Option<u64>,
}

impl PageInfo {
    /// Compute page metadata; `page` and `per_page` below 1 are treated as 1
    pub fn new(total: u64, page: u64, per_page: u64) -> Self {
        let current_page = page.max(1);
        let per_page = per_page.max(1);
        let last_page = total.div_ceil(per_page).max(1);
        let offset = (current_page - 1).saturating_mul(per_page);

        let (from, to) = if offset < total {
            (Some(offset + 1), Some(offset.saturating_add(per_page).min(total)))
        } else {
            (None, None)
        };

        Self {
            current_page,
            per_page,
            total,
            last_page,
            from,
            to,
        }
    }

    /// Row offset of the first item on this page
    pub fn offset(&self) -> u64 {
        (self.current_page - 1).saturating_mul(self.per_page)
    }

    /// Whether pages exist after this one
    pub fn has_more_pages(&self) -> bool {
        self.current_page < self.last_page
    }
}

/// One page of results together with its metadata
#[derive(Debug, Clone)]
pub struct Paginator<T> {
    pub data: Vec<T>,
    pub info: PageInfo,
}

impl<T> Paginator<T> {
    pub fn current_page(&self) -> u64 {
        self.info.current_page
    }

    pub fn per_page(&self) -> u64 {
        self.info.per_page
    }

    pub fn total(&self) -> u64 {
        self.info.total
    }

    pub fn last_page(&self) -> u64 {
        self.info.last_page
    }

    pub fn from(&self) -> Option<u64> {
        self.info.from
    }

    pub fn to(&self) -> Option<u64> {
        self.info.to
    }

    /// Transform every item, keeping the metadata
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Paginator<U> {
        Paginator {
            data: self.data.into_iter().map(f).collect(),
            info: self.info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_info_last_partial_page() {
        let info = PageInfo::new(37, 4, 10);
        assert_eq!(info.total, 37);
        assert_eq!(info.last_page, 4);
        assert_eq!(info.from, Some(31));
        assert_eq!(info.to, Some(37));
        assert!(!info.has_more_pages());
    }

    #[test]
    fn test_page_info_empty_and_out_of_range() {
        let empty = PageInfo::new(0, 1, 15);
        assert_eq!(empty.last_page, 1);
        assert_eq!(empty.from, None);
        assert_eq!(empty.to, None);

        let beyond = PageInfo::new(20, 5, 10);
        assert_eq!(beyond.last_page, 2);
        assert_eq!(beyond.from, None);
    }

    #[test]
    fn test_page_info_clamps_zero_inputs() {
        let info = PageInfo::new(5, 0, 0);
        assert_eq!(info.current_page, 1);
        assert_eq!(info.per_page, 1);
        assert_eq!(info.last_page, 5);
        assert_eq!(info.offset(), 0);
    }

    #[test]
    fn test_for_page_sets_limit_and_offset() {
        let query: QueryBuilder<()> = QueryBuilder::table("posts").for_page(3, 20);
        assert_eq!(query.limit_count, Some(20));
        assert_eq!(query.offset_value, Some(40));
    }

    #[test]
    fn test_page_info_huge_page_number_saturates() {
        let info = PageInfo::new(37, u64::MAX, 10);
        assert_eq!(info.last_page, 4);
        assert_eq!(info.offset(), u64::MAX);
        assert_eq!(info.from, None);
        assert_eq!(info.to, None);
    }

    #[test]
    fn test_for_page_clamps_offset_to_i64() {
        let query: QueryBuilder<()> = QueryBuilder::table("posts").for_page(u64::MAX, u64::MAX);
        assert_eq!(query.limit_count, Some(i64::MAX));
        assert_eq!(query.offset_value, Some(i64::MAX));
    }
}
