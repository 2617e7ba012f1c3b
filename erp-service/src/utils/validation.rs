use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use service_core::error::AppError;
use validator::Validate;

/// JSON body that has passed `validator` rules. Malformed JSON and rule
/// violations are both reported as 422 in the standard error body.
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e: JsonRejection| match &e {
                JsonRejection::MissingJsonContentType(_) => {
                    AppError::BadRequest(anyhow::anyhow!("Expected a JSON body: {}", e.body_text()))
                }
                _ => AppError::Unprocessable(anyhow::anyhow!(e.body_text())),
            })?;

        value.validate()?;

        Ok(ValidatedJson(value))
    }
}

/// JSON array body whose every element passes `validator` rules. An empty
/// array is rejected.
pub struct ValidatedBatch<T>(pub Vec<T>);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedBatch<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(items) = Json::<Vec<T>>::from_request(req, state)
            .await
            .map_err(|e| AppError::Unprocessable(anyhow::anyhow!(e.body_text())))?;

        if items.is_empty() {
            return Err(AppError::Unprocessable(anyhow::anyhow!(
                "At least one item is required"
            )));
        }

        for item in &items {
            item.validate()?;
        }

        Ok(ValidatedBatch(items))
    }
}
