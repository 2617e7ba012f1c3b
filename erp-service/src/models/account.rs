use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::company::Company;
use super::service::Service;

/// Billing account. A company owns at most one.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Account {
    pub account_id: Uuid,
    pub rnc: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(rnc: String) -> Self {
        let now = Utc::now();
        Self {
            account_id: Uuid::new_v4(),
            rnc,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Account as embedded in a company response.
#[derive(Debug, Clone, Serialize)]
pub struct AccountSummary {
    #[serde(flatten)]
    pub account: Account,
    pub services: Vec<Service>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountDetails {
    #[serde(flatten)]
    pub account: Account,
    pub company: Company,
    pub services: Vec<Service>,
}
