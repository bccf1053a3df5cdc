use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::stripe::{SignatureError, SIGNATURE_HEADER};
use crate::AppState;

/// Stripe event payloads stay well below this.
const MAX_WEBHOOK_BODY: usize = 256 * 1024;

/// Extractor that verifies the Stripe-Signature header against the raw
/// request body before any JSON parsing happens.
pub struct VerifiedWebhook {
    pub body: Bytes,
}

#[async_trait]
impl FromRequest<AppState> for VerifiedWebhook {
    type Rejection = AuthError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let signature = req
            .headers()
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .ok_or(AuthError::MissingSignature)?;

        let body = axum::body::to_bytes(req.into_body(), MAX_WEBHOOK_BODY)
            .await
            .map_err(|_| AuthError::BodyReadError)?;

        state
            .webhook_verifier
            .verify(&body, &signature)
            .map_err(AuthError::Signature)?;

        Ok(VerifiedWebhook { body })
    }
}

#[derive(Debug)]
pub enum AuthError {
    MissingSignature,
    Signature(SignatureError),
    BodyReadError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AuthError::MissingSignature => {
                (StatusCode::UNAUTHORIZED, "Missing Stripe-Signature header")
            }
            AuthError::Signature(SignatureError::InvalidFormat)
            | AuthError::Signature(SignatureError::InvalidTimestamp) => {
                (StatusCode::BAD_REQUEST, "Invalid signature format")
            }
            AuthError::Signature(SignatureError::InvalidSecret) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Invalid webhook secret configuration",
            ),
            AuthError::Signature(_) => {
                (StatusCode::UNAUTHORIZED, "Signature verification failed")
            }
            AuthError::BodyReadError => (StatusCode::BAD_REQUEST, "Failed to read request body"),
        };

        tracing::warn!("Webhook authentication failed: {:?}", self);
        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_signature_is_unauthorized() {
        let response = AuthError::MissingSignature.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_malformed_header_is_bad_request() {
        let response = AuthError::Signature(SignatureError::InvalidFormat).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_stale_signature_is_unauthorized() {
        let response =
            AuthError::Signature(SignatureError::OutsideTolerance { age: 900 }).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
