use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::company::Company;

/// A person or business the firm works for.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Client {
    pub client_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    pub fn new(name: String, email: String, phone: String) -> Self {
        let now = Utc::now();
        Self {
            client_id: Uuid::new_v4(),
            name,
            email,
            phone,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Client together with the companies it is related to.
#[derive(Debug, Clone, Serialize)]
pub struct ClientDetails {
    #[serde(flatten)]
    pub client: Client,
    pub companies: Vec<Company>,
}
