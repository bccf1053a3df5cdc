use serde::Deserialize;

use crate::ports::CheckoutSession;

/// Generic Stripe webhook event; `data.object` is parsed based on `type`.
#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

/// Checkout-session events the reconciler acts on.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutEvent {
    Completed(CheckoutSession),
    AsyncPaymentSucceeded(CheckoutSession),
    AsyncPaymentFailed(CheckoutSession),
    Expired(CheckoutSession),
    Canceled(CheckoutSession),
    Ignored(String),
}

impl StripeEvent {
    pub fn checkout_event(&self) -> Result<CheckoutEvent, serde_json::Error> {
        let wrap: fn(CheckoutSession) -> CheckoutEvent = match self.event_type.as_str() {
            "checkout.session.completed" => CheckoutEvent::Completed,
            "checkout.session.async_payment_succeeded" => CheckoutEvent::AsyncPaymentSucceeded,
            "checkout.session.async_payment_failed" => CheckoutEvent::AsyncPaymentFailed,
            "checkout.session.expired" => CheckoutEvent::Expired,
            "checkout.session.canceled" => CheckoutEvent::Canceled,
            other => return Ok(CheckoutEvent::Ignored(other.to_string())),
        };

        let session = CheckoutSession::deserialize(&self.data.object)?;
        Ok(wrap(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(event_type: &str, object: serde_json::Value) -> StripeEvent {
        serde_json::from_value(json!({
            "id": "evt_1",
            "object": "event",
            "type": event_type,
            "data": { "object": object }
        }))
        .unwrap()
    }

    #[test]
    fn test_completed_event_parses_session() {
        let e = event(
            "checkout.session.completed",
            json!({ "id": "cs_1", "object": "checkout.session", "payment_intent": "pi_1", "payment_status": "paid" }),
        );

        match e.checkout_event().unwrap() {
            CheckoutEvent::Completed(session) => {
                assert_eq!(session.id, "cs_1");
                assert_eq!(session.payment_intent.as_deref(), Some("pi_1"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_expired_session_without_payment_intent() {
        let e = event(
            "checkout.session.expired",
            json!({ "id": "cs_2", "payment_intent": null }),
        );

        assert_eq!(
            e.checkout_event().unwrap(),
            CheckoutEvent::Expired(CheckoutSession {
                id: "cs_2".to_string(),
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_unhandled_event_is_ignored() {
        let e = event("invoice.paid", json!({ "id": "in_1" }));
        assert_eq!(
            e.checkout_event().unwrap(),
            CheckoutEvent::Ignored("invoice.paid".to_string())
        );
    }

    #[test]
    fn test_session_without_id_is_an_error() {
        let e = event("checkout.session.async_payment_failed", json!({ "payment_intent": "pi_1" }));
        assert!(e.checkout_event().is_err());
    }
}
