use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::clock::Clock;
use super::error::ServiceError;
use crate::config::JwtConfig;

/// Issues and verifies HS256 bearer tokens. Expiry is judged by the
/// injected clock, not by wall time inside `jsonwebtoken`.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expiry_minutes: i64,
    clock: Arc<dyn Clock>,
}

/// Wire claims. Nothing else is carried in the token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub access_token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Claims of a token whose signature and expiry have been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedClaims {
    pub subject: String,
    pub issued_at: i64,
    pub expires_at: i64,
}

impl JwtService {
    pub fn new(config: &JwtConfig, clock: Arc<dyn Clock>) -> Result<Self, ServiceError> {
        if config.secret.is_empty() {
            return Err(ServiceError::Validation(
                "JWT secret must not be empty".to_string(),
            ));
        }

        if config.access_token_expiry_minutes <= 0 {
            return Err(ServiceError::Validation(
                "Access token lifetime must be positive".to_string(),
            ));
        }

        tracing::info!("JWT service initialized with HS256 key");

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            access_token_expiry_minutes: config.access_token_expiry_minutes,
            clock,
        })
    }

    /// Sign a token for `subject` that expires `ttl_minutes` from now.
    pub fn issue(&self, subject: &str, ttl_minutes: i64) -> Result<IssuedToken, ServiceError> {
        if ttl_minutes <= 0 {
            return Err(ServiceError::Validation(
                "Token lifetime must be positive".to_string(),
            ));
        }

        let issued_at = self.clock.now();
        let expires_at = issued_at + Duration::minutes(ttl_minutes);

        let claims = AccessTokenClaims {
            sub: subject.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let access_token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode access token: {}", e))?;

        metrics::counter!("erp_tokens_issued_total").increment(1);

        Ok(IssuedToken {
            access_token,
            issued_at,
            expires_at,
        })
    }

    pub fn issue_default(&self, subject: &str) -> Result<IssuedToken, ServiceError> {
        self.issue(subject, self.access_token_expiry_minutes)
    }

    /// Check signature, algorithm, claim shape and expiry. The token is valid
    /// while `now < exp`. All failures collapse into `InvalidToken`.
    pub fn verify(&self, token: &str) -> Result<VerifiedClaims, ServiceError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub", "iat"]);

        let claims = decode::<AccessTokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected access token");
                ServiceError::InvalidToken
            })?
            .claims;

        if self.clock.now().timestamp() >= claims.exp {
            tracing::debug!(sub = %claims.sub, exp = claims.exp, "Access token expired");
            return Err(ServiceError::InvalidToken);
        }

        Ok(VerifiedClaims {
            subject: claims.sub,
            issued_at: claims.iat,
            expires_at: claims.exp,
        })
    }

    pub fn access_token_expiry_minutes(&self) -> i64 {
        self.access_token_expiry_minutes
    }
}
