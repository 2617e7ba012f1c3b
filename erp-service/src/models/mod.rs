pub mod account;
pub mod client;
pub mod company;
pub mod organization;
pub mod service;
pub mod tag;
pub mod user;

pub use account::{Account, AccountDetails, AccountSummary};
pub use client::{Client, ClientDetails};
pub use company::{Company, CompanyDetails, PersonType};
pub use organization::Organization;
pub use service::{Service, ServiceDetails};
pub use tag::{Tag, TagDetails};
pub use user::{normalize_email, Role, User, UserResponse};
