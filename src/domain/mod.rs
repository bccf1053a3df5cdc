//! Domain entities for the property registry.
//! Plain records, independent of the persistence layer.

pub mod payment;
pub mod property;
pub mod transfer;
pub mod user;

pub use payment::{Payment, PaymentStatus};
pub use property::{Property, PropertyRecord};
pub use transfer::{TransferRequest, TransferStatus};
pub use user::User;

/// Raised when a stored status string does not match any known variant.
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} status: {value}")]
pub struct UnknownStatus {
    pub kind: &'static str,
    pub value: String,
}
