//! PostgreSQL policy store.

use std::time::Duration;

use async_trait::async_trait;
use sea_orm::{DbConn, DbErr, EntityTrait};

use quota_core::QuotaError;
use quota_core::domain::ClientPolicy;
use quota_core::error::RepoError;
use quota_core::ports::PolicyStore;

use super::entity::user_rate::{self, Entity as UserRateEntity};

/// Reads client quotas from the `user_rate` table.
pub struct PostgresPolicyStore {
    db: DbConn,
    interval: Duration,
}

impl PostgresPolicyStore {
    /// `interval` is the refill period every row's `rate_limit` applies to.
    pub fn new(db: DbConn, interval: Duration) -> Self {
        Self { db, interval }
    }

    fn to_policy(&self, model: user_rate::Model) -> Result<ClientPolicy, QuotaError> {
        ClientPolicy::new(
            model.id.to_string(),
            i64::from(model.rate_limit),
            self.interval,
        )
    }
}

fn repo_error(err: DbErr) -> RepoError {
    match err {
        DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => RepoError::Connection(err.to_string()),
        other => RepoError::Query(other.to_string()),
    }
}

#[async_trait]
impl PolicyStore for PostgresPolicyStore {
    async fn find_by_id(&self, client_id: &str) -> Result<Option<ClientPolicy>, QuotaError> {
        // Primary keys are integers; anything else cannot match a row.
        let Ok(id) = client_id.parse::<i32>() else {
            tracing::debug!(client_id = %client_id, "Client id is not a valid policy key");
            return Ok(None);
        };

        let model = UserRateEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(repo_error)?;

        model.map(|model| self.to_policy(model)).transpose()
    }
}
