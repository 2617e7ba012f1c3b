use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::service::Service;

/// Free-form label attached to services.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Tag {
    pub tag_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tag {
    pub fn new(name: String) -> Self {
        let now = Utc::now();
        Self {
            tag_id: Uuid::new_v4(),
            name,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TagDetails {
    #[serde(flatten)]
    pub tag: Tag,
    pub services: Vec<Service>,
}
