use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use tracing::Instrument;

use super::auth::VerifiedWebhook;
use crate::error::AppError;
use crate::stripe::{CheckoutEvent, StripeEvent};
use crate::use_cases::{Outcome, PaymentWebhookReconciler, UseCaseError};
use crate::AppState;

/// `POST /webhooks/stripe`
///
/// Any error response makes Stripe redeliver the event later.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    webhook: VerifiedWebhook,
) -> Result<impl IntoResponse, AppError> {
    let event: StripeEvent = serde_json::from_slice(&webhook.body)
        .map_err(|e| AppError::BadRequest(format!("Invalid event payload: {}", e)))?;

    let checkout = event
        .checkout_event()
        .map_err(|e| AppError::BadRequest(format!("Invalid checkout session: {}", e)))?;

    let span = tracing::info_span!(
        "stripe_webhook",
        event_id = %event.id,
        event_type = %event.event_type
    );

    let body = match dispatch(&state.reconciler, checkout).instrument(span).await? {
        Some(outcome) => json!({ "received": true, "outcome": outcome }),
        None => json!({ "received": true, "ignored": event.event_type }),
    };

    Ok((StatusCode::OK, Json(body)))
}

/// Routes a checkout event to the reconciler; `None` for event types it
/// doesn't handle.
async fn dispatch(
    reconciler: &PaymentWebhookReconciler,
    event: CheckoutEvent,
) -> Result<Option<Outcome>, UseCaseError> {
    let outcome = match event {
        CheckoutEvent::Completed(session) => reconciler.on_session_completed(&session).await?,
        CheckoutEvent::AsyncPaymentSucceeded(session) => {
            reconciler.on_async_payment_succeeded(&session).await?
        }
        CheckoutEvent::AsyncPaymentFailed(session) => {
            reconciler.on_async_payment_failed(&session).await?
        }
        CheckoutEvent::Expired(session) => reconciler.on_session_expired(&session).await?,
        CheckoutEvent::Canceled(session) => reconciler.on_session_canceled(&session).await?,
        CheckoutEvent::Ignored(event_type) => {
            tracing::debug!(event_type = %event_type, "Ignoring unhandled event type");
            return Ok(None);
        }
    };

    Ok(Some(outcome))
}
