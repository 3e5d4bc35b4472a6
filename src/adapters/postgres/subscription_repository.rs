//! PostgreSQL implementation of SubscriptionRepository.
//!
//! Creation and cancellation call the `create_subscription_atomic` and
//! `cancel_subscription_atomic` database functions, which report expected
//! failures in a JSON object instead of raising. Provider-driven updates are a
//! single conditional UPDATE keyed by `provider_subscription_id`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    DomainError, ErrorCode, ProviderPlanId, ProviderSubscriptionId, SubscriptionId, Timestamp,
    UserId,
};
use crate::domain::subscription::{
    ApplyOutcome, FieldWrite, StatusUpdate, Subscription, SubscriptionStatus,
};
use crate::ports::{NewSubscription, SubscriptionRepository};

/// PostgreSQL implementation of the SubscriptionRepository port.
pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a subscription.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    user_id: Uuid,
    provider_subscription_id: String,
    provider_plan_id: String,
    status: String,
    start_date: Option<DateTime<Utc>>,
    next_billing_date: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    cancellation_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let corrupt = |e: crate::domain::foundation::ValidationError| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid stored value: {}", e))
        };

        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            user_id: UserId::new(row.user_id.to_string()).map_err(corrupt)?,
            provider_subscription_id: ProviderSubscriptionId::new(row.provider_subscription_id)
                .map_err(corrupt)?,
            provider_plan_id: ProviderPlanId::new(row.provider_plan_id).map_err(corrupt)?,
            status: parse_status(&row.status)?,
            start_date: row.start_date.map(Timestamp::from_datetime),
            next_billing_date: row.next_billing_date.map(Timestamp::from_datetime),
            cancelled_at: row.cancelled_at.map(Timestamp::from_datetime),
            cancellation_reason: row.cancellation_reason,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

/// JSON object returned by the atomic database functions.
#[derive(Debug, Deserialize)]
struct AtomicResult {
    success: bool,
    #[serde(default)]
    subscription_id: Option<Uuid>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct ApplyRow {
    previous_status: String,
    applied: bool,
}

fn parse_status(s: &str) -> Result<SubscriptionStatus, DomainError> {
    s.parse().map_err(|_| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid status value: {}", s),
        )
    })
}

/// Splits a field write into the `(mode, value)` pair the UPDATE expects.
fn field_write_params(write: &FieldWrite) -> (&'static str, Option<DateTime<Utc>>) {
    match write {
        FieldWrite::Keep => ("keep", None),
        FieldWrite::SetIfNull(ts) => ("set_if_null", Some(ts.into_datetime())),
        FieldWrite::Set(ts) => ("set", Some(ts.into_datetime())),
    }
}

fn db_error(operation: &str, e: sqlx::Error) -> DomainError {
    tracing::error!(operation, error = %e, "Subscription query failed");
    DomainError::database(format!("Failed to {}: {}", operation, e))
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn create_subscription_atomic(
        &self,
        subscription: &NewSubscription,
    ) -> Result<SubscriptionId, DomainError> {
        let psid = subscription.provider_subscription_id.as_str();

        // A non-uuid user id cannot match any users row.
        let user_uuid = Uuid::parse_str(subscription.user_id.as_str())
            .map_err(|_| DomainError::user_not_found(subscription.user_id.as_str()))?;

        let Json(result) = sqlx::query_scalar::<_, Json<AtomicResult>>(
            "SELECT create_subscription_atomic($1, $2, $3, $4)",
        )
        .bind(user_uuid)
        .bind(psid)
        .bind(subscription.provider_plan_id.as_str())
        .bind(subscription.initial_status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                // User deleted between the existence check and the insert.
                if db_err.code().as_deref() == Some("23503") {
                    return DomainError::user_not_found(subscription.user_id.as_str());
                }
                if db_err.constraint() == Some("subscriptions_provider_subscription_id_key") {
                    return DomainError::subscription_exists(psid);
                }
            }
            db_error("create subscription", e)
        })?;

        if result.success {
            return result
                .subscription_id
                .map(SubscriptionId::from_uuid)
                .ok_or_else(|| DomainError::database("create_subscription_atomic returned no id"));
        }

        Err(match result.error_code.as_deref() {
            Some("SUBSCRIPTION_EXISTS") => DomainError::subscription_exists(psid),
            Some("USER_NOT_FOUND") => DomainError::user_not_found(subscription.user_id.as_str()),
            Some("INVALID_STATUS") => DomainError::validation(
                "initial_status",
                result.message.unwrap_or_else(|| "Invalid initial status".to_string()),
            ),
            other => DomainError::database(format!(
                "create_subscription_atomic failed: {}",
                other.unwrap_or("unknown")
            )),
        })
    }

    async fn cancel_subscription_atomic(
        &self,
        user_id: &UserId,
        provider_subscription_id: &ProviderSubscriptionId,
        reason: &str,
    ) -> Result<(), DomainError> {
        let psid = provider_subscription_id.as_str();
        let user_uuid =
            Uuid::parse_str(user_id.as_str()).map_err(|_| DomainError::subscription_not_found(psid))?;

        let Json(result) = sqlx::query_scalar::<_, Json<AtomicResult>>(
            "SELECT cancel_subscription_atomic($1, $2, $3)",
        )
        .bind(user_uuid)
        .bind(psid)
        .bind(reason)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("cancel subscription", e))?;

        if result.success {
            return Ok(());
        }

        Err(match result.error_code.as_deref() {
            Some("SUBSCRIPTION_NOT_FOUND") => DomainError::subscription_not_found(psid),
            other => DomainError::database(format!(
                "cancel_subscription_atomic failed: {}",
                other.unwrap_or("unknown")
            )),
        })
    }

    async fn apply_status_update(
        &self,
        provider_subscription_id: &ProviderSubscriptionId,
        update: &StatusUpdate,
    ) -> Result<ApplyOutcome, DomainError> {
        let (start_mode, start_value) = field_write_params(&update.start_date);
        let (billing_mode, billing_value) = field_write_params(&update.next_billing_date);

        let row = sqlx::query_as::<_, ApplyRow>(
            r#"
            WITH current AS (
                SELECT id, status
                FROM subscriptions
                WHERE provider_subscription_id = $1
                FOR UPDATE
            ),
            updated AS (
                UPDATE subscriptions s SET
                    status = $2,
                    start_date = CASE $3
                        WHEN 'set' THEN $4
                        WHEN 'set_if_null' THEN COALESCE(s.start_date, $4)
                        ELSE s.start_date
                    END,
                    next_billing_date = CASE $5
                        WHEN 'set' THEN $6
                        WHEN 'set_if_null' THEN COALESCE(s.next_billing_date, $6)
                        ELSE s.next_billing_date
                    END,
                    updated_at = now()
                FROM current c
                WHERE s.id = c.id
                  AND (c.status NOT IN ('cancelled', 'expired') OR c.status = $2)
                RETURNING s.id
            )
            SELECT c.status AS previous_status,
                   EXISTS (SELECT 1 FROM updated) AS applied
            FROM current c
            "#,
        )
        .bind(provider_subscription_id.as_str())
        .bind(update.status.as_str())
        .bind(start_mode)
        .bind(start_value)
        .bind(billing_mode)
        .bind(billing_value)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("apply status update", e))?;

        let Some(row) = row else {
            return Ok(ApplyOutcome::NotFound);
        };

        let previous = parse_status(&row.previous_status)?;
        Ok(if row.applied {
            ApplyOutcome::Applied { previous }
        } else {
            ApplyOutcome::SkippedTerminal { current: previous }
        })
    }

    async fn find_by_provider_id(
        &self,
        provider_subscription_id: &ProviderSubscriptionId,
    ) -> Result<Option<Subscription>, DomainError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT id, user_id, provider_subscription_id, provider_plan_id, status,
                   start_date, next_billing_date, cancelled_at, cancellation_reason,
                   created_at, updated_at
            FROM subscriptions
            WHERE provider_subscription_id = $1
            "#,
        )
        .bind(provider_subscription_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find subscription", e))?;

        row.map(Subscription::try_from).transpose()
    }
}
