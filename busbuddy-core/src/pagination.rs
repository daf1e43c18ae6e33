use serde::{Deserialize, Serialize};

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    10
}

/// `?page=&limit=` query parameters with the listing defaults.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}

impl PageQuery {
    /// Clamp to sane bounds; page is 1-based.
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            limit: self.limit.clamp(1, 100),
        }
    }

    pub fn offset(&self) -> i64 {
        let p = self.page.max(1);
        i64::from(p - 1) * i64::from(self.limit)
    }

    pub fn limit_i64(&self) -> i64 {
        i64::from(self.limit)
    }
}

/// Echoed back alongside every list response.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct PageInfo {
    pub current: u32,
    pub pages: u32,
    pub total: u64,
}

impl PageInfo {
    pub fn new(query: PageQuery, total: u64) -> Self {
        let limit = u64::from(query.limit.max(1));
        let pages = total.div_ceil(limit) as u32;
        Self {
            current: query.page.max(1),
            pages,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_are_one_based() {
        let q = PageQuery { page: 1, limit: 10 };
        assert_eq!(q.offset(), 0);
        let q = PageQuery { page: 3, limit: 10 };
        assert_eq!(q.offset(), 20);
    }

    #[test]
    fn page_count_rounds_up() {
        let q = PageQuery { page: 1, limit: 10 };
        assert_eq!(PageInfo::new(q, 0).pages, 0);
        assert_eq!(PageInfo::new(q, 10).pages, 1);
        assert_eq!(PageInfo::new(q, 11).pages, 2);
        assert_eq!(PageInfo::new(q, 25).total, 25);
    }

    #[test]
    fn zero_page_normalizes_to_first() {
        let q = PageQuery { page: 0, limit: 500 }.normalized();
        assert_eq!(q.page, 1);
        assert_eq!(q.limit, 100);
    }
}
