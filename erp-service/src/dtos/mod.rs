pub mod auth;
pub mod org;
pub mod pagination;
pub mod records;

pub use pagination::{Page, PaginationParams};
