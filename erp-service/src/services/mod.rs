//! Services layer: token handling, authorization, persistence and the
//! association rules.

pub mod authz;
pub mod clock;
mod database;
pub mod error;
mod jwt;
pub mod metrics;
mod relations;

pub use authz::{Authorization, Principal};
pub use clock::{Clock, MockClock, SystemClock};
pub use database::Database;
pub use error::ServiceError;
pub use jwt::{AccessTokenClaims, IssuedToken, JwtService, VerifiedClaims};
pub use relations::Relations;
