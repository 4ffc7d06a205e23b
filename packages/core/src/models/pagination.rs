//! Offset/limit pagination

use serde::{Deserialize, Serialize};

/// Requested page (1-based). A `page_size` of 0 selects the configured default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 0,
        }
    }
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    /// Apply the configured default and upper bound
    pub fn clamp(self, default_size: u32, max_size: u32) -> Self {
        let page_size = match self.page_size {
            0 => default_size,
            size => size.min(max_size),
        };
        Self {
            page: self.page.max(1),
            page_size: page_size.max(1),
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.max(1) - 1) * i64::from(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }
}

/// One page of results. `total` counts the whole filtered set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pagination<T> {
    pub page: u32,
    pub page_size: u32,
    pub total: i64,
    pub items: Vec<T>,
}

impl<T> Pagination<T> {
    pub fn empty(request: PageRequest) -> Self {
        Self {
            page: request.page,
            page_size: request.page_size,
            total: 0,
            items: Vec::new(),
        }
    }

    pub fn new(request: PageRequest, total: i64, items: Vec<T>) -> Self {
        Self {
            page: request.page,
            page_size: request.page_size,
            total,
            items,
        }
    }

    pub fn total_pages(&self) -> i64 {
        if self.page_size == 0 {
            return 0;
        }
        let size = i64::from(self.page_size);
        (self.total + size - 1) / size
    }
}
