use axum::Json;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::core::models::Validate;
use crate::errors::SummaryError;

/// JSON body extractor that runs [`Validate`] before the handler is called.
///
/// Any JSON rejection (wrong content type, malformed body, missing field) and
/// any validation failure becomes `SummaryError::InvalidRequest`, i.e. a 422.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = SummaryError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| {
                warn!(rejection = %rejection.body_text(), "Rejected request body");
                SummaryError::InvalidRequest(rejection.body_text())
            })?;

        value.validate().map_err(|detail| {
            warn!(detail = %detail, "Request body failed validation");
            SummaryError::InvalidRequest(detail)
        })?;

        Ok(Self(value))
    }
}
