//! Stripe integration: REST client, webhook signatures, event envelopes.

pub mod client;
pub mod events;
pub mod signature;

pub use client::{StripeClient, DEFAULT_API_BASE};
pub use events::{CheckoutEvent, StripeEvent};
pub use signature::{SignatureError, WebhookVerifier, SIGNATURE_HEADER};
