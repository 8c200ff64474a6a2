//! Customer link lifecycle under concurrent writers.
//!
//! These tests require a migrated database.
//! Run with: `BILEMO_TEST_DATABASE_URL=... cargo test -p bilemo-api --test customer_links -- --ignored`

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use bilemo_api::db::customers::Detached;
use bilemo_api::db::{ClientRepository, CustomerRepository, PgCustomerStore};
use bilemo_api::models::{CustomerChanges, NewCustomer};
use bilemo_api::services::customers::{Attachment, CustomerError, attach_customer};
use bilemo_core::{ClientId, CustomerId, Email};

const TRIALS: usize = 20;

async fn pool() -> PgPool {
    let url = std::env::var("BILEMO_TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .unwrap();
    PgPoolOptions::new()
        .max_connections(32)
        .connect(&url)
        .await
        .unwrap()
}

fn unique_email(prefix: &str) -> Email {
    Email::parse(&format!("{prefix}-{}@bilemo.test", Uuid::new_v4().simple())).unwrap()
}

async fn new_client(pool: &PgPool) -> ClientId {
    sqlx::query_scalar(
        "INSERT INTO bilemo.client (email, password_hash, company)
         VALUES ($1, 'not-a-hash', 'Link Test')
         RETURNING id",
    )
    .bind(unique_email("client"))
    .fetch_one(pool)
    .await
    .unwrap()
}

fn jane(email: &Email) -> NewCustomer {
    NewCustomer {
        email: email.clone(),
        firstname: "Jane".to_owned(),
        lastname: "Doe".to_owned(),
    }
}

async fn attach(
    pool: &PgPool,
    client_id: ClientId,
    customer: &NewCustomer,
) -> Result<Attachment, CustomerError> {
    let mut store = PgCustomerStore::begin(pool).await?;
    let attachment = attach_customer(&mut store, client_id, customer).await?;
    store.commit().await?;
    Ok(attachment)
}

/// A customer linked to every client in `clients`.
async fn shared_customer(pool: &PgPool, clients: &[ClientId]) -> (Email, CustomerId) {
    let email = unique_email("shared");
    let mut id = None;
    for &client_id in clients {
        let linked = attach(pool, client_id, &jane(&email)).await.unwrap();
        id = Some(linked.into_inner().customer.id);
    }
    (email, id.unwrap())
}

async fn link_count(pool: &PgPool, email: &Email) -> Option<i64> {
    sqlx::query_scalar(
        "SELECT (SELECT COUNT(*) FROM bilemo.client_customer cc WHERE cc.customer_id = c.id)
         FROM bilemo.customer c WHERE c.email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await
    .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "Requires database"]
async fn test_concurrent_attach_same_email_creates_once() {
    let pool = pool().await;
    let email = unique_email("burst");

    let mut clients = Vec::new();
    for _ in 0..TRIALS {
        clients.push(new_client(&pool).await);
    }

    let handles: Vec<_> = clients
        .iter()
        .map(|&client_id| {
            let pool = pool.clone();
            let customer = jane(&email);
            tokio::spawn(async move { attach(&pool, client_id, &customer).await })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        if matches!(handle.await.unwrap().unwrap(), Attachment::Created(_)) {
            created += 1;
        }
    }

    assert_eq!(created, 1);
    assert_eq!(link_count(&pool, &email).await, Some(i64::try_from(TRIALS).unwrap()));
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "Requires database"]
async fn test_concurrent_detach_removes_customer_with_last_link() {
    let pool = pool().await;

    for _ in 0..TRIALS {
        let a = new_client(&pool).await;
        let b = new_client(&pool).await;
        let (email, id) = shared_customer(&pool, &[a, b]).await;

        let first = {
            let pool = pool.clone();
            tokio::spawn(async move { CustomerRepository::new(&pool).detach(a, id).await })
        };
        let second = {
            let pool = pool.clone();
            tokio::spawn(async move { CustomerRepository::new(&pool).detach(b, id).await })
        };
        let mut outcomes = [
            first.await.unwrap().unwrap(),
            second.await.unwrap().unwrap(),
        ];
        outcomes.sort_by_key(|d| *d == Detached::Removed);

        assert_eq!(outcomes, [Detached::Unlinked, Detached::Removed]);
        assert_eq!(link_count(&pool, &email).await, None);
    }
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "Requires database"]
async fn test_attach_racing_last_detach_links_or_recreates() {
    let pool = pool().await;

    for _ in 0..TRIALS {
        let a = new_client(&pool).await;
        let b = new_client(&pool).await;
        let (email, id) = shared_customer(&pool, &[a]).await;

        let detach = {
            let pool = pool.clone();
            tokio::spawn(async move { CustomerRepository::new(&pool).detach(a, id).await })
        };
        let attached = {
            let pool = pool.clone();
            let customer = jane(&email);
            tokio::spawn(async move { attach(&pool, b, &customer).await })
        };

        let detached = detach.await.unwrap().unwrap();
        let attached = attached.await.unwrap().unwrap();

        match (detached, attached) {
            (Detached::Removed, Attachment::Created(_))
            | (Detached::Unlinked, Attachment::Linked(_)) => {}
            other => panic!("inconsistent outcome: {other:?}"),
        }
        assert_eq!(link_count(&pool, &email).await, Some(1));
    }
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "Requires database"]
async fn test_client_delete_racing_detach_leaves_no_orphan() {
    let pool = pool().await;

    for _ in 0..TRIALS {
        let a = new_client(&pool).await;
        let b = new_client(&pool).await;
        let (email, id) = shared_customer(&pool, &[a, b]).await;

        let deleted = {
            let pool = pool.clone();
            tokio::spawn(async move { ClientRepository::new(&pool).delete(a).await })
        };
        let detached = {
            let pool = pool.clone();
            tokio::spawn(async move { CustomerRepository::new(&pool).detach(b, id).await })
        };

        deleted.await.unwrap().unwrap();
        detached.await.unwrap().unwrap();
        assert_eq!(link_count(&pool, &email).await, None);
    }
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "Requires database"]
async fn test_locked_customer_holds_off_detach_until_updated() {
    let pool = pool().await;
    let a = new_client(&pool).await;
    let b = new_client(&pool).await;
    let (email, id) = shared_customer(&pool, &[a, b]).await;

    let locked = CustomerRepository::new(&pool).lock(id).await.unwrap().unwrap();
    let mut expected = vec![a, b];
    expected.sort_unstable();
    assert_eq!(locked.clients(), expected.as_slice());

    let detach = {
        let pool = pool.clone();
        tokio::spawn(async move { CustomerRepository::new(&pool).detach(b, id).await })
    };
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!detach.is_finished());

    let updated = locked
        .update(CustomerChanges {
            firstname: Some("Janet".to_owned()),
            ..CustomerChanges::default()
        })
        .await
        .unwrap();
    assert_eq!(updated.firstname, "Janet");

    assert_eq!(detach.await.unwrap().unwrap(), Detached::Unlinked);
    assert_eq!(link_count(&pool, &email).await, Some(1));
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "Requires database"]
async fn test_lock_missing_customer_is_none() {
    let pool = pool().await;
    let missing = CustomerRepository::new(&pool)
        .lock(CustomerId::new(i32::MAX))
        .await
        .unwrap();
    assert!(missing.is_none());
}
