#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use registry_payments::adapters::InMemoryRegistry;
use registry_payments::domain::{Payment, Property, TransferRequest, User};
use registry_payments::ports::{
    CardDetails, Charge, CheckoutSession, Customer, NewCustomer, PaymentError, PaymentIntent,
    PaymentMethodDetails, PaymentProcessor, PaymentRepository, ProcessorError, ProcessorResult,
    PropertyRepository, Repositories, TransferRequestRepository, UserRepository,
};
use registry_payments::use_cases::PaymentWebhookReconciler;

/// Scripted payment processor backed by maps.
#[derive(Default)]
pub struct FakeProcessor {
    intents: Mutex<HashMap<String, PaymentIntent>>,
    charges: Mutex<HashMap<String, Charge>>,
    customers: Mutex<HashMap<String, Customer>>,
    intent_calls: AtomicUsize,
    created_customers: Mutex<Vec<NewCustomer>>,
}

impl FakeProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_intent(self, intent: PaymentIntent) -> Self {
        self.intents
            .lock()
            .unwrap()
            .insert(intent.id.clone(), intent);
        self
    }

    pub fn with_charge(self, charge: Charge) -> Self {
        self.charges
            .lock()
            .unwrap()
            .insert(charge.id.clone(), charge);
        self
    }

    pub fn with_customer(self, customer: Customer) -> Self {
        self.customers
            .lock()
            .unwrap()
            .insert(customer.id.clone(), customer);
        self
    }

    pub fn intent_calls(&self) -> usize {
        self.intent_calls.load(Ordering::SeqCst)
    }

    pub fn created_customers(&self) -> Vec<NewCustomer> {
        self.created_customers.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentProcessor for FakeProcessor {
    async fn retrieve_payment_intent(&self, id: &str) -> ProcessorResult<PaymentIntent> {
        self.intent_calls.fetch_add(1, Ordering::SeqCst);
        self.intents
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| ProcessorError::NotFound {
                resource: "payment_intent",
                id: id.to_string(),
            })
    }

    async fn retrieve_charge(&self, id: &str) -> ProcessorResult<Charge> {
        self.charges
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| ProcessorError::NotFound {
                resource: "charge",
                id: id.to_string(),
            })
    }

    async fn retrieve_customer(&self, id: &str) -> ProcessorResult<Customer> {
        self.customers
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| ProcessorError::Api {
                status: 404,
                message: format!("No such customer: '{}'", id),
            })
    }

    async fn create_customer(&self, customer: &NewCustomer) -> ProcessorResult<Customer> {
        let mut created = self.created_customers.lock().unwrap();
        created.push(customer.clone());
        Ok(Customer {
            id: format!("cus_new_{}", created.len()),
            email: Some(customer.email.clone()),
            name: Some(customer.name.clone()),
            deleted: false,
        })
    }
}

pub fn intent(id: &str, latest_charge: Option<&str>) -> PaymentIntent {
    PaymentIntent {
        id: id.to_string(),
        status: None,
        latest_charge: latest_charge.map(str::to_string),
        last_payment_error: None,
    }
}

pub fn failed_intent(id: &str, message: Option<&str>) -> PaymentIntent {
    PaymentIntent {
        last_payment_error: Some(PaymentError {
            code: Some("card_declined".to_string()),
            message: message.map(str::to_string),
        }),
        ..intent(id, None)
    }
}

pub fn card_charge(id: &str, status: &str, brand: &str, last4: &str) -> Charge {
    Charge {
        id: id.to_string(),
        status: status.to_string(),
        payment_method_details: Some(PaymentMethodDetails {
            card: Some(CardDetails {
                brand: brand.to_string(),
                last4: last4.to_string(),
            }),
        }),
    }
}

pub fn session(id: &str, payment_intent: Option<&str>) -> CheckoutSession {
    CheckoutSession {
        id: id.to_string(),
        payment_intent: payment_intent.map(str::to_string),
    }
}

/// A seller's property with a pending transfer request from a buyer, and a
/// pending payment for `session_id`.
pub struct Seeded {
    pub store: Arc<InMemoryRegistry>,
    pub seller: User,
    pub buyer: User,
    pub property: Property,
    pub transfer: TransferRequest,
    pub payment: Payment,
}

pub async fn seed(session_id: &str) -> Seeded {
    let store = Arc::new(InMemoryRegistry::new());

    let seller = store
        .insert_user(&User::new("seller", "seller@example.com"))
        .await
        .unwrap();
    let buyer = store
        .insert_user(&User::new("buyer", "buyer@example.com"))
        .await
        .unwrap();
    let property = store
        .insert_property(&Property::new(seller.id))
        .await
        .unwrap();
    let transfer = store
        .insert_transfer_request(&TransferRequest::new(property.id, buyer.id))
        .await
        .unwrap();
    let payment = store
        .insert_payment(&Payment::new(session_id, transfer.id))
        .await
        .unwrap();

    Seeded {
        store,
        seller,
        buyer,
        property,
        transfer,
        payment,
    }
}

pub fn reconciler(store: &Arc<InMemoryRegistry>, processor: Arc<FakeProcessor>) -> PaymentWebhookReconciler {
    PaymentWebhookReconciler::new(Repositories::from_store(store.clone()), processor)
}

pub async fn payment_for(store: &InMemoryRegistry, session_id: &str) -> Payment {
    store.find_by_session_id(session_id).await.unwrap().unwrap()
}

pub async fn owner_of(store: &InMemoryRegistry, property_id: Uuid) -> Uuid {
    store.get_property(property_id).await.unwrap().owner_id
}
