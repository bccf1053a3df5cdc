//! Payment webhook reconciliation.
//! Advances a local payment through its lifecycle as checkout-session
//! events arrive, and completes the ownership transfer once it is paid.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::UseCaseError;
use crate::domain::payment::PaymentUpdate;
use crate::domain::{PaymentStatus, PropertyRecord, TransferRequest, TransferStatus};
use crate::ports::{CheckoutSession, PaymentIntent, PaymentProcessor, Repositories};

const UNKNOWN_ERROR: &str = "Unknown error";

/// What a webhook did to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
    /// No payment is tied to the session; nothing was changed.
    PaymentNotFound,
    /// The payment intent has no charge yet; nothing was changed.
    NoCharge,
    Updated {
        status: PaymentStatus,
        transfer_completed: bool,
    },
}

pub struct PaymentWebhookReconciler {
    repos: Repositories,
    processor: Arc<dyn PaymentProcessor>,
}

impl PaymentWebhookReconciler {
    pub fn new(repos: Repositories, processor: Arc<dyn PaymentProcessor>) -> Self {
        Self { repos, processor }
    }

    /// `checkout.session.completed`: records the card and the charge outcome,
    /// completing the transfer when the charge succeeded.
    pub async fn on_session_completed(
        &self,
        session: &CheckoutSession,
    ) -> Result<Outcome, UseCaseError> {
        let intent = self.fetch_intent(session).await?;

        let Some(charge_id) = intent.latest_charge.as_deref() else {
            info!(session_id = %session.id, payment_intent = %intent.id, "Payment intent has no charge yet");
            return Ok(Outcome::NoCharge);
        };

        let charge = self.processor.retrieve_charge(charge_id).await?;
        let status = charge_status(&charge.status)?;
        let card = charge.card();

        let update = PaymentUpdate {
            payment_intent_id: intent.id.clone(),
            card_brand: card.map(|c| c.brand.clone()),
            card_last4: card.map(|c| c.last4.clone()),
            status: Some(status),
        };

        if !self.update_payment(&session.id, update).await? {
            return Ok(Outcome::PaymentNotFound);
        }

        self.finish(session, status).await
    }

    /// `checkout.session.async_payment_succeeded`: delayed methods that settled.
    pub async fn on_async_payment_succeeded(
        &self,
        session: &CheckoutSession,
    ) -> Result<Outcome, UseCaseError> {
        let Some(mut payment) = self.repos.payments.find_by_session_id(&session.id).await? else {
            debug!(session_id = %session.id, "No payment for session");
            return Ok(Outcome::PaymentNotFound);
        };

        let previous = payment.status;
        payment.status = PaymentStatus::Succeeded;
        payment.updated_at = Utc::now();
        self.repos.payments.update_payment(&payment).await?;

        info!(
            session_id = %session.id,
            payment_id = %payment.id,
            from = %previous,
            to = %payment.status,
            "Payment status updated"
        );

        self.finish(session, PaymentStatus::Succeeded).await
    }

    /// `checkout.session.async_payment_failed`.
    ///
    /// The processor's failure message is logged only; the payment row has no
    /// column for it.
    pub async fn on_async_payment_failed(
        &self,
        session: &CheckoutSession,
    ) -> Result<Outcome, UseCaseError> {
        let intent = self.fetch_intent(session).await?;

        let error = intent.last_payment_error.as_ref();
        let error_message = error
            .and_then(|e| e.message.as_deref())
            .unwrap_or(UNKNOWN_ERROR);
        let error_code = error.and_then(|e| e.code.as_deref()).unwrap_or("none");
        warn!(
            session_id = %session.id,
            error_code,
            error = %error_message,
            "Async payment failed"
        );

        self.set_status(session, &intent, PaymentStatus::Failed).await
    }

    /// `checkout.session.expired`
    pub async fn on_session_expired(
        &self,
        session: &CheckoutSession,
    ) -> Result<Outcome, UseCaseError> {
        let intent = self.fetch_intent(session).await?;
        self.set_status(session, &intent, PaymentStatus::Expired).await
    }

    pub async fn on_session_canceled(
        &self,
        session: &CheckoutSession,
    ) -> Result<Outcome, UseCaseError> {
        let intent = self.fetch_intent(session).await?;
        self.set_status(session, &intent, PaymentStatus::Canceled).await
    }

    /// Hands the property to the requester, writes a property record and
    /// marks the transfer request paid.
    ///
    /// Not idempotent: every call reassigns the owner and appends another
    /// record. Returns `false` when no payment exists for the session.
    pub async fn complete_transfer(&self, session: &CheckoutSession) -> Result<bool, UseCaseError> {
        let Some(transfer) = self.transfer_for(session).await? else {
            return Ok(false);
        };

        self.transfer_ownership(session, transfer).await?;
        Ok(true)
    }

    async fn transfer_for(
        &self,
        session: &CheckoutSession,
    ) -> Result<Option<TransferRequest>, UseCaseError> {
        let Some(payment) = self.repos.payments.find_by_session_id(&session.id).await? else {
            debug!(session_id = %session.id, "No payment for session, skipping transfer");
            return Ok(None);
        };

        let transfer = self
            .repos
            .transfers
            .get_transfer_request(payment.transfer_request_id)
            .await?;
        Ok(Some(transfer))
    }

    /// The transfer request is marked paid last, so a failure part way
    /// leaves it pending and a redelivered event finishes the job.
    async fn transfer_ownership(
        &self,
        session: &CheckoutSession,
        mut transfer: TransferRequest,
    ) -> Result<(), UseCaseError> {
        let mut property = self.repos.properties.get_property(transfer.property_id).await?;
        let previous_owner = property.owner_id;
        property.reassign(transfer.requested_by);
        self.repos.properties.update_property(&property).await?;

        let record = self
            .repos
            .properties
            .create_property_record(&PropertyRecord::new(property.id, transfer.requested_by))
            .await?;

        transfer.mark_paid();
        self.repos.transfers.update_transfer_request(&transfer).await?;

        info!(
            session_id = %session.id,
            transfer_request_id = %transfer.id,
            property_id = %property.id,
            from_owner = %previous_owner,
            to_owner = %transfer.requested_by,
            record_id = %record.id,
            "Ownership transfer completed"
        );

        Ok(())
    }

    async fn fetch_intent(&self, session: &CheckoutSession) -> Result<PaymentIntent, UseCaseError> {
        let intent_id = session
            .payment_intent
            .as_deref()
            .ok_or_else(|| UseCaseError::MissingPaymentIntent(session.id.clone()))?;

        Ok(self.processor.retrieve_payment_intent(intent_id).await?)
    }

    async fn set_status(
        &self,
        session: &CheckoutSession,
        intent: &PaymentIntent,
        status: PaymentStatus,
    ) -> Result<Outcome, UseCaseError> {
        let update = PaymentUpdate {
            payment_intent_id: intent.id.clone(),
            status: Some(status),
            ..Default::default()
        };

        if !self.update_payment(&session.id, update).await? {
            return Ok(Outcome::PaymentNotFound);
        }

        Ok(Outcome::Updated {
            status,
            transfer_completed: false,
        })
    }

    /// Applies `update` to the session's payment; `false` if there is none.
    async fn update_payment(
        &self,
        session_id: &str,
        update: PaymentUpdate,
    ) -> Result<bool, UseCaseError> {
        let Some(mut payment) = self.repos.payments.find_by_session_id(session_id).await? else {
            debug!(session_id, "No payment for session");
            return Ok(false);
        };

        let previous = payment.status;
        payment.apply_update(update);
        self.repos.payments.update_payment(&payment).await?;

        info!(
            session_id,
            payment_id = %payment.id,
            from = %previous,
            to = %payment.status,
            "Payment status updated"
        );

        Ok(true)
    }

    /// Completes the transfer for a succeeded payment unless its request is
    /// already paid. Concurrent deliveries for one session are not
    /// serialized here.
    async fn finish(
        &self,
        session: &CheckoutSession,
        status: PaymentStatus,
    ) -> Result<Outcome, UseCaseError> {
        let mut transfer_completed = false;

        if status == PaymentStatus::Succeeded {
            if let Some(transfer) = self.transfer_for(session).await? {
                if transfer.status == TransferStatus::Paid {
                    info!(session_id = %session.id, "Transfer already paid, not repeated");
                } else {
                    self.transfer_ownership(session, transfer).await?;
                    transfer_completed = true;
                }
            }
        }

        Ok(Outcome::Updated {
            status,
            transfer_completed,
        })
    }
}

fn charge_status(raw: &str) -> Result<PaymentStatus, UseCaseError> {
    match raw {
        "succeeded" => Ok(PaymentStatus::Succeeded),
        "pending" => Ok(PaymentStatus::Pending),
        "failed" => Ok(PaymentStatus::Failed),
        other => Err(UseCaseError::UnexpectedChargeStatus(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charge_status_mapping() {
        assert_eq!(charge_status("succeeded").unwrap(), PaymentStatus::Succeeded);
        assert_eq!(charge_status("pending").unwrap(), PaymentStatus::Pending);
        assert_eq!(charge_status("failed").unwrap(), PaymentStatus::Failed);
        assert!(matches!(
            charge_status("refunded"),
            Err(UseCaseError::UnexpectedChargeStatus(s)) if s == "refunded"
        ));
    }
}
