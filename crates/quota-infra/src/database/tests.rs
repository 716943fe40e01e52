use std::time::Duration;

use quota_core::QuotaError;
use quota_core::ports::PolicyStore;
use sea_orm::{DatabaseBackend, DbErr, MockDatabase};

use crate::database::PostgresPolicyStore;
use crate::database::entity::user_rate;

const MINUTE: Duration = Duration::from_secs(60);

fn row(id: i32, rate_limit: i32) -> user_rate::Model {
    user_rate::Model {
        id,
        name: "client123".to_owned(),
        rate_limit,
    }
}

#[tokio::test]
async fn test_find_policy_by_id() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![row(1, 5)]])
        .into_connection();

    let store = PostgresPolicyStore::new(db, MINUTE);
    let policy = store.find_by_id("1").await.unwrap().unwrap();

    assert_eq!(policy.client_id, "1");
    assert_eq!(policy.units_per_interval, 5);
    assert_eq!(policy.interval, MINUTE);
}

#[tokio::test]
async fn test_missing_row_is_none() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![Vec::<user_rate::Model>::new()])
        .into_connection();

    let store = PostgresPolicyStore::new(db, MINUTE);
    assert!(store.find_by_id("2").await.unwrap().is_none());
}

#[tokio::test]
async fn test_non_numeric_id_skips_query() {
    // No query results queued: a query would fail the test.
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

    let store = PostgresPolicyStore::new(db, MINUTE);
    assert!(store.find_by_id("client-abc").await.unwrap().is_none());
}

#[tokio::test]
async fn test_zero_rate_limit_is_invalid() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![row(3, 0)]])
        .into_connection();

    let store = PostgresPolicyStore::new(db, MINUTE);
    let err = store.find_by_id("3").await.unwrap_err();
    assert!(matches!(err, QuotaError::InvalidPolicy { ref client_id, .. } if client_id == "3"));
}

#[tokio::test]
async fn test_query_failure_is_backend_unavailable() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_errors(vec![DbErr::Custom("connection reset".to_owned())])
        .into_connection();

    let store = PostgresPolicyStore::new(db, MINUTE);
    let err = store.find_by_id("1").await.unwrap_err();
    assert!(matches!(err, QuotaError::BackendUnavailable(_)));
}
