//! PostgreSQL implementation of OrganizationStore.
//!
//! Reads organizations and writes their subscription columns in the
//! `organizations` table. `apply_change` locks the row with
//! `SELECT ... FOR UPDATE` so concurrent replicas serialize on it.

use crate::domain::billing::{
    BillingInterval, Organization, SubscriptionChange, SubscriptionRecord, SubscriptionTier,
};
use crate::domain::foundation::{DomainError, ErrorCode, OrganizationId, Timestamp};
use crate::ports::{AppliedChange, OrganizationStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{PgPool, Postgres};

const UPDATE_SUBSCRIPTION: &str = r#"
    UPDATE organizations SET
        subscription_tier = $2,
        subscription_status = $3,
        billing_interval = $4,
        flowglad_customer_id = $5,
        flowglad_subscription_id = $6,
        trial_end = $7,
        updated_at = NOW()
    WHERE id = $1
"#;

fn update_subscription_query<'q>(
    id: &'q OrganizationId,
    subscription: &'q SubscriptionRecord,
) -> Query<'q, Postgres, PgArguments> {
    sqlx::query(UPDATE_SUBSCRIPTION)
        .bind(id.as_str())
        .bind(subscription.tier.as_str())
        .bind(&subscription.status)
        .bind(subscription.billing_interval.map(|i| i.as_str()))
        .bind(&subscription.external_customer_id)
        .bind(&subscription.external_subscription_id)
        .bind(subscription.trial_end.map(|t| *t.as_datetime()))
}

fn organization_not_found(id: &OrganizationId) -> DomainError {
    DomainError::new(ErrorCode::OrganizationNotFound, "Organization not found")
        .with_detail("organization_id", id.as_str())
}

/// PostgreSQL implementation of the OrganizationStore port.
pub struct PostgresOrganizationStore {
    pool: PgPool,
}

impl PostgresOrganizationStore {
    /// Creates a new PostgresOrganizationStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of an organization.
#[derive(Debug, sqlx::FromRow)]
struct OrganizationRow {
    id: String,
    name: String,
    subscription_tier: String,
    subscription_status: Option<String>,
    billing_interval: Option<String>,
    flowglad_customer_id: Option<String>,
    flowglad_subscription_id: Option<String>,
    trial_end: Option<DateTime<Utc>>,
}

impl TryFrom<OrganizationRow> for Organization {
    type Error = DomainError;

    fn try_from(row: OrganizationRow) -> Result<Self, Self::Error> {
        let id = OrganizationId::new(row.id).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid organization id: {}", e))
        })?;
        let tier: SubscriptionTier = row.subscription_tier.parse().map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid tier value: {}", e))
        })?;
        let billing_interval = row
            .billing_interval
            .as_deref()
            .map(str::parse::<BillingInterval>)
            .transpose()
            .map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid interval value: {}", e))
            })?;

        Ok(Organization {
            id,
            name: row.name,
            subscription: SubscriptionRecord {
                tier,
                status: row.subscription_status,
                billing_interval,
                external_customer_id: row.flowglad_customer_id,
                external_subscription_id: row.flowglad_subscription_id,
                trial_end: row.trial_end.map(Timestamp::from_datetime),
            },
        })
    }
}

#[async_trait]
impl OrganizationStore for PostgresOrganizationStore {
    async fn find_by_customer_id(
        &self,
        customer_id: &str,
        limit: usize,
    ) -> Result<Vec<Organization>, DomainError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows: Vec<OrganizationRow> = sqlx::query_as(
            r#"
            SELECT id, name, subscription_tier, subscription_status, billing_interval,
                   flowglad_customer_id, flowglad_subscription_id, trial_end
            FROM organizations
            WHERE flowglad_customer_id = $1
            ORDER BY id ASC
            LIMIT $2
            "#,
        )
        .bind(customer_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to find organizations by customer", e))?;

        rows.into_iter().map(Organization::try_from).collect()
    }

    async fn find_by_id(&self, id: &OrganizationId) -> Result<Option<Organization>, DomainError> {
        let row: Option<OrganizationRow> = sqlx::query_as(
            r#"
            SELECT id, name, subscription_tier, subscription_status, billing_interval,
                   flowglad_customer_id, flowglad_subscription_id, trial_end
            FROM organizations
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to find organization", e))?;

        row.map(Organization::try_from).transpose()
    }

    async fn update_subscription(
        &self,
        id: &OrganizationId,
        subscription: &SubscriptionRecord,
    ) -> Result<(), DomainError> {
        let result = update_subscription_query(id, subscription)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to update subscription", e))?;

        if result.rows_affected() == 0 {
            return Err(organization_not_found(id));
        }

        Ok(())
    }

    async fn apply_change(
        &self,
        id: &OrganizationId,
        change: &SubscriptionChange,
    ) -> Result<Option<AppliedChange>, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database("Failed to begin transaction", e))?;

        let row: Option<OrganizationRow> = sqlx::query_as(
            r#"
            SELECT id, name, subscription_tier, subscription_status, billing_interval,
                   flowglad_customer_id, flowglad_subscription_id, trial_end
            FROM organizations
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| DomainError::database("Failed to lock organization", e))?;

        // Dropping the transaction rolls it back.
        let Some(row) = row else {
            return Ok(None);
        };
        let mut org = Organization::try_from(row)?;

        let changed = org.subscription.apply(change);
        if changed {
            update_subscription_query(id, &org.subscription)
                .execute(&mut *tx)
                .await
                .map_err(|e| DomainError::database("Failed to update subscription", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| DomainError::database("Failed to commit subscription change", e))?;

        Ok(Some(AppliedChange {
            subscription: org.subscription,
            changed,
        }))
    }
}
