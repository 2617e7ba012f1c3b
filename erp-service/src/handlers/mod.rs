//! HTTP handlers for erp-service.

pub mod accounts;
pub mod clients;
pub mod companies;
pub mod metrics;
pub mod organizations;
pub mod services;
pub mod tags;
pub mod token;
pub mod users;
