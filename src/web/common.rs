use crate::route::RouteBuildError;
use crate::store::StoreError;
use axum::extract::{OriginalUri, Request};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

pub type RouteResult<O> = Result<O, RouteErrorResponse>;

/// Body of every failed API call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteErrorResponse {
    #[serde(skip)]
    pub status_code: StatusCode,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl RouteErrorResponse {
    pub fn new(status_code: StatusCode) -> Self {
        let error = status_code.canonical_reason().unwrap_or("Unknown error").to_string();
        RouteErrorResponse {
            status_code,
            error,
            reason: None,
        }
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED).with_error("unauthorized")
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = error.into();
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

impl From<StoreError> for RouteErrorResponse {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Unauthorized => Self::unauthorized(),
            StoreError::InvalidInput(e) => Self::new(StatusCode::BAD_REQUEST).with_error("lat and lng required").with_reason(e.to_string()),
            StoreError::Unavailable => {
                error!("❌ Location store is unavailable");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR).with_error("internal error")
            }
        }
    }
}

impl From<RouteBuildError> for RouteErrorResponse {
    fn from(value: RouteBuildError) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR)
            .with_error("route unavailable")
            .with_reason(value.to_string())
    }
}

impl IntoResponse for RouteErrorResponse {
    fn into_response(self) -> axum::response::Response {
        (self.status_code, Json(self)).into_response()
    }
}

pub(crate) async fn route_not_found(OriginalUri(original_uri): OriginalUri, req: Request) -> impl IntoResponse {
    RouteErrorResponse::new(StatusCode::NOT_FOUND).with_reason(format!("{} {}", req.method(), original_uri.path()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InvalidFix;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(StoreError::Unauthorized, StatusCode::UNAUTHORIZED)]
    #[case(StoreError::InvalidInput(InvalidFix::MissingCoordinate("lat")), StatusCode::BAD_REQUEST)]
    #[case(StoreError::Unavailable, StatusCode::INTERNAL_SERVER_ERROR)]
    fn store_errors_map_to_status_codes(#[case] error: StoreError, #[case] expected: StatusCode) {
        let response = RouteErrorResponse::from(error);

        assert_eq!(response.status_code, expected);
    }

    #[test]
    fn unauthorized_responses_carry_no_detail() -> Result<(), serde_json::Error> {
        let body = serde_json::to_value(RouteErrorResponse::from(StoreError::Unauthorized))?;

        assert_eq!(body, serde_json::json!({ "error": "unauthorized" }));
        Ok(())
    }

    #[test]
    fn store_failures_use_a_generic_message() -> Result<(), serde_json::Error> {
        let body = serde_json::to_value(RouteErrorResponse::from(StoreError::Unavailable))?;

        assert_eq!(body, serde_json::json!({ "error": "internal error" }));
        Ok(())
    }
}
