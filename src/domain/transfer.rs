use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::UnknownStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Pending,
    Paid,
    Rejected,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::Paid => "paid",
            TransferStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransferStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransferStatus::Pending),
            "paid" => Ok(TransferStatus::Paid),
            "rejected" => Ok(TransferStatus::Rejected),
            other => Err(UnknownStatus {
                kind: "transfer request",
                value: other.to_string(),
            }),
        }
    }
}

/// A request to move a property to a new owner, finalized once paid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub id: Uuid,
    pub property_id: Uuid,
    pub requested_by: Uuid,
    pub status: TransferStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TransferRequest {
    pub fn new(property_id: Uuid, requested_by: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            property_id,
            requested_by,
            status: TransferStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn mark_paid(&mut self) {
        self.status = TransferStatus::Paid;
        self.updated_at = Utc::now();
    }
}
