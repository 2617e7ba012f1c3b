//! Request bodies for clients, companies, services, tags and accounts.

use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::models::PersonType;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateClientRequest {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, max = 50, message = "Phone is required"))]
    pub phone: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateClientRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(min = 1, max = 50))]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCompanyRequest {
    #[validate(length(min = 1, max = 20, message = "RNC is required"))]
    pub rnc: String,

    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,

    pub person_type: PersonType,

    /// Clients to relate on creation.
    #[serde(default)]
    pub related: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCompanyRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,

    pub person_type: Option<PersonType>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateServiceRequest {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,

    #[serde(default)]
    pub tags: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RenameServiceItem {
    pub service_id: Uuid,

    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTagRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RenameTagItem {
    pub tag_id: Uuid,

    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAccountRequest {
    #[validate(length(min = 1, max = 20, message = "RNC is required"))]
    pub rnc: String,

    #[serde(default)]
    pub services: Vec<Uuid>,
}

/// Ids to attach to an existing record.
#[derive(Debug, Deserialize, Validate)]
pub struct LinkRequest {
    #[validate(length(min = 1, message = "At least one id is required"))]
    pub ids: Vec<Uuid>,
}
