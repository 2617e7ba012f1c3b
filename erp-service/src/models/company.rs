use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::account::AccountSummary;
use super::client::Client;

/// Legal nature of a company's owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonType {
    Fisica,
    Juridica,
}

impl PersonType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersonType::Fisica => "fisica",
            PersonType::Juridica => "juridica",
        }
    }
}

impl std::str::FromStr for PersonType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fisica" => Ok(PersonType::Fisica),
            "juridica" => Ok(PersonType::Juridica),
            _ => Err(format!("Invalid person type: {}", s)),
        }
    }
}

/// Company keyed by its RNC tax identifier.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Company {
    pub rnc: String,
    pub name: String,
    pub person_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Company {
    pub fn new(rnc: String, name: String, person_type: PersonType) -> Self {
        let now = Utc::now();
        Self {
            rnc,
            name,
            person_type: person_type.as_str().to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanyDetails {
    #[serde(flatten)]
    pub company: Company,
    pub related: Vec<Client>,
    pub account: Option<AccountSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_person_type_parsing() {
        assert_eq!("fisica".parse::<PersonType>().unwrap(), PersonType::Fisica);
        assert_eq!(
            "juridica".parse::<PersonType>().unwrap(),
            PersonType::Juridica
        );
        assert!("other".parse::<PersonType>().is_err());
    }

    #[test]
    fn test_person_type_serializes_lowercase() {
        let json = serde_json::to_string(&PersonType::Juridica).unwrap();
        assert_eq!(json, "\"juridica\"");
    }
}
