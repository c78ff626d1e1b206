use crate::error::{EngineError, EngineResult};

/// A validated 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u64,
    page_size: u64,
}

impl Pagination {
    /// Validate `page >= 1` and `page_size >= 1`.
    pub fn new(page: u64, page_size: u64) -> EngineResult<Self> {
        if page == 0 {
            return Err(EngineError::InvalidPagination {
                message: "page must be >= 1".to_string(),
            });
        }
        if page_size == 0 {
            return Err(EngineError::InvalidPagination {
                message: "page_size must be >= 1".to_string(),
            });
        }
        Ok(Self { page, page_size })
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Documents to skip before this page.
    pub fn skip(&self) -> usize {
        usize::try_from((self.page - 1).saturating_mul(self.page_size)).unwrap_or(usize::MAX)
    }

    /// Page size as a store limit.
    pub fn limit(&self) -> usize {
        usize::try_from(self.page_size).unwrap_or(usize::MAX)
    }

    /// `ceil(total / page_size)`.
    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(self.page_size)
    }
}
