mod common;

use std::sync::Arc;

use common::FakeProcessor;
use registry_payments::adapters::InMemoryRegistry;
use registry_payments::domain::User;
use registry_payments::ports::{Customer, RepositoryError, UserRepository};
use registry_payments::use_cases::{StripeCustomerService, UseCaseError};

async fn store_with(user: User) -> (Arc<InMemoryRegistry>, User) {
    let store = Arc::new(InMemoryRegistry::new());
    let user = store.insert_user(&user).await.unwrap();
    (store, user)
}

fn named_user() -> User {
    User {
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        ..User::new("ada", "ada@example.com")
    }
}

#[tokio::test]
async fn test_creates_and_stores_customer_when_none_exists() {
    let (store, user) = store_with(named_user()).await;
    let processor = Arc::new(FakeProcessor::new());
    let service = StripeCustomerService::new(store.clone(), processor.clone());

    let customer = service.get_or_create_stripe_customer(&user).await.unwrap();

    let created = processor.created_customers();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].email, "ada@example.com");
    assert_eq!(created[0].name, "Ada Lovelace");

    let stored = store.get_user(user.id).await.unwrap();
    assert_eq!(stored.stripe_customer_id.as_deref(), Some(customer.id.as_str()));
}

#[tokio::test]
async fn test_falls_back_to_username_for_name() {
    let (store, user) = store_with(User::new("bob", "bob@example.com")).await;
    let processor = Arc::new(FakeProcessor::new());
    let service = StripeCustomerService::new(store, processor.clone());

    service.get_or_create_stripe_customer(&user).await.unwrap();

    assert_eq!(processor.created_customers()[0].name, "bob");
}

#[tokio::test]
async fn test_returns_existing_customer() {
    let user = User {
        stripe_customer_id: Some("cus_existing".to_string()),
        ..named_user()
    };
    let (store, user) = store_with(user).await;
    let processor = Arc::new(FakeProcessor::new().with_customer(Customer {
        id: "cus_existing".to_string(),
        email: Some("ada@example.com".to_string()),
        name: Some("Ada Lovelace".to_string()),
        deleted: false,
    }));
    let service = StripeCustomerService::new(store.clone(), processor.clone());

    let customer = service.get_or_create_stripe_customer(&user).await.unwrap();

    assert_eq!(customer.id, "cus_existing");
    assert!(processor.created_customers().is_empty());
    let stored = store.get_user(user.id).await.unwrap();
    assert_eq!(stored.stripe_customer_id.as_deref(), Some("cus_existing"));
}

#[tokio::test]
async fn test_unretrievable_customer_is_replaced() {
    let user = User {
        stripe_customer_id: Some("cus_gone".to_string()),
        ..named_user()
    };
    let (store, user) = store_with(user).await;
    let processor = Arc::new(FakeProcessor::new());
    let service = StripeCustomerService::new(store.clone(), processor.clone());

    let customer = service.get_or_create_stripe_customer(&user).await.unwrap();

    assert_ne!(customer.id, "cus_gone");
    assert_eq!(processor.created_customers().len(), 1);
    let stored = store.get_user(user.id).await.unwrap();
    assert_eq!(stored.stripe_customer_id, Some(customer.id));
}

#[tokio::test]
async fn test_deleted_customer_is_replaced() {
    let user = User {
        stripe_customer_id: Some("cus_deleted".to_string()),
        ..named_user()
    };
    let (store, user) = store_with(user).await;
    let processor = Arc::new(FakeProcessor::new().with_customer(Customer {
        id: "cus_deleted".to_string(),
        deleted: true,
        ..Default::default()
    }));
    let service = StripeCustomerService::new(store, processor.clone());

    let customer = service.get_or_create_stripe_customer(&user).await.unwrap();

    assert_ne!(customer.id, "cus_deleted");
    assert_eq!(processor.created_customers().len(), 1);
}

#[tokio::test]
async fn test_ensure_for_unknown_user() {
    let store = Arc::new(InMemoryRegistry::new());
    let service = StripeCustomerService::new(store, Arc::new(FakeProcessor::new()));

    let err = service
        .ensure_for_user(uuid::Uuid::new_v4())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        UseCaseError::Repository(RepositoryError::NotFound(_))
    ));
}
