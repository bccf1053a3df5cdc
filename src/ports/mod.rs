//! Ports the use cases depend on: persistence and the payment processor.
//! Adapters in `crate::adapters` and `crate::stripe` implement them.

pub mod processor;
pub mod repository;

pub use processor::{
    CardDetails, Charge, CheckoutSession, Customer, NewCustomer, PaymentError, PaymentIntent,
    PaymentMethodDetails, PaymentProcessor, ProcessorError, ProcessorResult,
};
pub use repository::{
    PaymentRepository, PropertyRepository, Repositories, RepositoryError, RepositoryResult,
    TransferRequestRepository, UserRepository,
};
