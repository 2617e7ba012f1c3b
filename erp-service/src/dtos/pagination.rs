use serde::{Deserialize, Serialize};
use validator::Validate;

pub const DEFAULT_PAGE_LIMIT: i64 = 20;

fn default_limit() -> i64 {
    DEFAULT_PAGE_LIMIT
}

#[derive(Debug, Clone, Copy, Deserialize, Validate)]
pub struct PaginationParams {
    #[serde(default = "default_limit")]
    #[validate(range(min = 0, max = 50, message = "limit must be between 0 and 50"))]
    pub limit: i64,

    #[serde(default)]
    #[validate(range(min = 0, message = "offset must not be negative"))]
    pub offset: i64,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

/// One page of a listing. `total` counts the whole table, not the page.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub next_offset: Option<i64>,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    /// `next_offset` is set only when a full, non-empty page came back.
    pub fn new(items: Vec<T>, total: i64, params: PaginationParams) -> Self {
        let full_page = params.limit > 0 && items.len() as i64 == params.limit;
        Self {
            total,
            limit: params.limit,
            offset: params.offset,
            next_offset: full_page.then_some(params.offset + params.limit),
            items,
        }
    }
}
