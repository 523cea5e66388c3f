use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum InvalidPageRequestError {
    #[error("Page numbers start at 1")]
    PageZero,
    #[error("Page size must be between 1 and {MAX_PAGE_SIZE}, got {0}")]
    PageSize(u32),
}

/// A validated `(page, limit)` pair. Pages are 1-based.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Result<Self, InvalidPageRequestError> {
        if page == 0 {
            return Err(InvalidPageRequestError::PageZero);
        }
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(InvalidPageRequestError::PageSize(limit));
        }

        Ok(Self { page, limit })
    }

    #[must_use]
    pub fn page(self) -> u32 {
        self.page
    }

    #[must_use]
    pub fn limit(self) -> u32 {
        self.limit
    }

    #[must_use]
    pub fn offset(self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u64,
    pub total_items: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    #[must_use]
    pub fn new(request: PageRequest, total_items: u64) -> Self {
        let total_pages = total_items.div_ceil(u64::from(request.limit));

        Self {
            current_page: request.page,
            total_pages,
            total_items,
            has_next: u64::from(request.page) < total_pages,
            has_prev: request.page > 1,
        }
    }

    /// The page returned when there is nothing to query at all.
    #[must_use]
    pub fn empty(request: PageRequest) -> Self {
        Self {
            current_page: request.page,
            total_pages: 0,
            total_items: 0,
            has_next: false,
            has_prev: false,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    #[must_use]
    pub fn empty(request: PageRequest) -> Self {
        Self {
            items: Vec::new(),
            pagination: Pagination::empty(request),
        }
    }
}
