//! Payment domain entity.
//! One checkout attempt, keyed by the Stripe checkout session id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::UnknownStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Succeeded,
    Failed,
    Expired,
    Canceled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Expired => "expired",
            PaymentStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "succeeded" => Ok(PaymentStatus::Succeeded),
            "failed" => Ok(PaymentStatus::Failed),
            "expired" => Ok(PaymentStatus::Expired),
            "canceled" => Ok(PaymentStatus::Canceled),
            other => Err(UnknownStatus {
                kind: "payment",
                value: other.to_string(),
            }),
        }
    }
}

/// Domain entity representing a payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub session_id: String,
    pub payment_intent_id: Option<String>,
    pub card_brand: Option<String>,
    pub card_last4: Option<String>,
    pub status: PaymentStatus,
    pub transfer_request_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(session_id: impl Into<String>, transfer_request_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            session_id: session_id.into(),
            payment_intent_id: None,
            card_brand: None,
            card_last4: None,
            status: PaymentStatus::Pending,
            transfer_request_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies what a processor lookup revealed. Card fields are only
    /// overwritten when present so a later failure event keeps the card
    /// that was captured on success.
    pub fn apply_update(&mut self, update: PaymentUpdate) {
        self.payment_intent_id = Some(update.payment_intent_id);
        if let Some(brand) = update.card_brand {
            self.card_brand = Some(brand);
        }
        if let Some(last4) = update.card_last4 {
            self.card_last4 = Some(last4);
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        self.updated_at = Utc::now();
    }
}

/// Fields a webhook may change on a payment.
#[derive(Debug, Clone, Default)]
pub struct PaymentUpdate {
    pub payment_intent_id: String,
    pub card_brand: Option<String>,
    pub card_last4: Option<String>,
    pub status: Option<PaymentStatus>,
}
