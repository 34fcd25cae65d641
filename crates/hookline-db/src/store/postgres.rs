//! Postgres-backed `WebhookStore` implementation.
//!
//! Runtime-checked queries (`sqlx::query_as`) against the schema in
//! `migrations/`; claim uses `FOR UPDATE SKIP LOCKED` so concurrent
//! workers never double-deliver a row.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    CreateDelivery, CreateDeliveryAttempt, CreateEndpoint, CreateEvent, CreateEventType,
    CreateFilter, Delivery, DeliveryAttempt, Endpoint, EndpointFilter, EndpointSubscription,
    Event, EventType, UpdateEndpoint,
};
use crate::store::{DeliveryQuery, EndpointQuery, EventQuery, EventTypeQuery, WebhookStore};

/// Postgres store over a shared connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Escape LIKE metacharacters so user input matches literally.
fn escape_like(needle: &str) -> String {
    needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn map_insert_error(e: sqlx::Error, entity: &'static str, value: String) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Duplicate { entity, value }
        }
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            StoreError::MissingReference { entity }
        }
        _ => StoreError::Database(e),
    }
}

#[async_trait]
impl WebhookStore for PgStore {
    async fn insert_event_type(&self, input: CreateEventType) -> Result<EventType, StoreError> {
        sqlx::query_as(
            r"
            INSERT INTO webhook_event_types (name, category, payload_schema, sample_payload)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            ",
        )
        .bind(&input.name)
        .bind(&input.category)
        .bind(&input.payload_schema)
        .bind(&input.sample_payload)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "event type", input.name.clone()))
    }

    async fn find_event_type(&self, id: Uuid) -> Result<Option<EventType>, StoreError> {
        Ok(
            sqlx::query_as("SELECT * FROM webhook_event_types WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn find_event_type_by_name(&self, name: &str) -> Result<Option<EventType>, StoreError> {
        Ok(
            sqlx::query_as("SELECT * FROM webhook_event_types WHERE name = $1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn list_event_types(&self, query: EventTypeQuery) -> Result<Vec<EventType>, StoreError> {
        let mut sql = String::from("SELECT * FROM webhook_event_types WHERE 1 = 1");
        let mut param_count = 0;

        if query.category.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND category = ${param_count}"));
        }
        if query.active.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND active = ${param_count}"));
        }
        sql.push_str(" ORDER BY name ASC");

        let mut q = sqlx::query_as::<_, EventType>(&sql);
        if let Some(ref category) = query.category {
            q = q.bind(category);
        }
        if let Some(active) = query.active {
            q = q.bind(active);
        }
        Ok(q.fetch_all(&self.pool).await?)
    }

    async fn set_event_type_active(&self, id: Uuid, active: bool) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE webhook_event_types SET active = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(active)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_endpoint(
        &self,
        input: CreateEndpoint,
        event_type_ids: Vec<Uuid>,
    ) -> Result<Endpoint, StoreError> {
        let mut tx = self.pool.begin().await?;

        let endpoint: Endpoint = sqlx::query_as(
            r"
            INSERT INTO webhook_endpoints (
                name, description, url, http_method, content_type,
                secret_encrypted, signature_algorithm, retry_strategy,
                retry_delay_secs, max_attempts, timeout_secs, verify_tls,
                enable_filtering, custom_headers, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            ",
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.url)
        .bind(&input.http_method)
        .bind(&input.content_type)
        .bind(&input.secret_encrypted)
        .bind(input.signature_algorithm.to_string())
        .bind(input.retry_strategy.to_string())
        .bind(input.retry_delay_secs)
        .bind(input.max_attempts)
        .bind(input.timeout_secs)
        .bind(input.verify_tls)
        .bind(input.enable_filtering)
        .bind(&input.custom_headers)
        .bind(input.created_by)
        .fetch_one(&mut *tx)
        .await?;

        for event_type_id in event_type_ids {
            sqlx::query(
                r"
                INSERT INTO webhook_endpoint_subscriptions (endpoint_id, event_type_id)
                VALUES ($1, $2)
                ON CONFLICT (endpoint_id, event_type_id) DO NOTHING
                ",
            )
            .bind(endpoint.id)
            .bind(event_type_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_insert_error(e, "event type", event_type_id.to_string()))?;
        }

        tx.commit().await?;
        Ok(endpoint)
    }

    async fn find_endpoint(&self, id: Uuid) -> Result<Option<Endpoint>, StoreError> {
        Ok(
            sqlx::query_as("SELECT * FROM webhook_endpoints WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn list_endpoints(&self, query: EndpointQuery) -> Result<Vec<Endpoint>, StoreError> {
        let mut sql = String::from("SELECT * FROM webhook_endpoints WHERE 1 = 1");
        let mut param_count = 0;

        if query.active.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND active = ${param_count}"));
        }
        if query.name_contains.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND name ILIKE ${param_count}"));
        }
        sql.push_str(&format!(
            " ORDER BY created_at DESC LIMIT ${} OFFSET ${}",
            param_count + 1,
            param_count + 2
        ));

        let mut q = sqlx::query_as::<_, Endpoint>(&sql);
        if let Some(active) = query.active {
            q = q.bind(active);
        }
        if let Some(ref needle) = query.name_contains {
            q = q.bind(format!("%{}%", escape_like(needle)));
        }
        Ok(q.bind(query.limit).bind(query.offset).fetch_all(&self.pool).await?)
    }

    async fn count_endpoints(&self, query: EndpointQuery) -> Result<i64, StoreError> {
        let mut sql = String::from("SELECT COUNT(*) FROM webhook_endpoints WHERE 1 = 1");
        let mut param_count = 0;

        if query.active.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND active = ${param_count}"));
        }
        if query.name_contains.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND name ILIKE ${param_count}"));
        }

        let mut q = sqlx::query_scalar::<_, i64>(&sql);
        if let Some(active) = query.active {
            q = q.bind(active);
        }
        if let Some(ref needle) = query.name_contains {
            q = q.bind(format!("%{}%", escape_like(needle)));
        }
        Ok(q.fetch_one(&self.pool).await?)
    }

    async fn update_endpoint(
        &self,
        id: Uuid,
        update: UpdateEndpoint,
    ) -> Result<Option<Endpoint>, StoreError> {
        Ok(sqlx::query_as(
            r"
            UPDATE webhook_endpoints SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                url = COALESCE($4, url),
                http_method = COALESCE($5, http_method),
                content_type = COALESCE($6, content_type),
                secret_encrypted = COALESCE($7, secret_encrypted),
                signature_algorithm = COALESCE($8, signature_algorithm),
                retry_strategy = COALESCE($9, retry_strategy),
                retry_delay_secs = COALESCE($10, retry_delay_secs),
                max_attempts = COALESCE($11, max_attempts),
                timeout_secs = COALESCE($12, timeout_secs),
                verify_tls = COALESCE($13, verify_tls),
                enable_filtering = COALESCE($14, enable_filtering),
                custom_headers = COALESCE($15, custom_headers),
                active = COALESCE($16, active),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            ",
        )
        .bind(id)
        .bind(update.name)
        .bind(update.description)
        .bind(update.url)
        .bind(update.http_method)
        .bind(update.content_type)
        .bind(update.secret_encrypted)
        .bind(update.signature_algorithm.map(|v| v.to_string()))
        .bind(update.retry_strategy.map(|v| v.to_string()))
        .bind(update.retry_delay_secs)
        .bind(update.max_attempts)
        .bind(update.timeout_secs)
        .bind(update.verify_tls)
        .bind(update.enable_filtering)
        .bind(update.custom_headers)
        .bind(update.active)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_endpoint(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM webhook_endpoints WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_subscriptions(
        &self,
        endpoint_id: Uuid,
    ) -> Result<Vec<EndpointSubscription>, StoreError> {
        Ok(sqlx::query_as(
            r"
            SELECT * FROM webhook_endpoint_subscriptions
            WHERE endpoint_id = $1
            ORDER BY created_at ASC
            ",
        )
        .bind(endpoint_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn set_subscription_active(
        &self,
        endpoint_id: Uuid,
        event_type_id: Uuid,
        active: bool,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r"
            UPDATE webhook_endpoint_subscriptions
            SET active = $3
            WHERE endpoint_id = $1 AND event_type_id = $2
            ",
        )
        .bind(endpoint_id)
        .bind(event_type_id)
        .bind(active)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn endpoints_for_event_type(
        &self,
        event_type_id: Uuid,
    ) -> Result<Vec<Endpoint>, StoreError> {
        Ok(sqlx::query_as(
            r"
            SELECT e.* FROM webhook_endpoints e
            JOIN webhook_endpoint_subscriptions s ON s.endpoint_id = e.id
            WHERE s.event_type_id = $1
                AND s.active = TRUE
                AND e.active = TRUE
            ORDER BY e.created_at ASC
            ",
        )
        .bind(event_type_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn insert_filter(&self, input: CreateFilter) -> Result<EndpointFilter, StoreError> {
        sqlx::query_as(
            r"
            INSERT INTO webhook_endpoint_filters
                (endpoint_id, field_path, operator, value, include_on_match)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            ",
        )
        .bind(input.endpoint_id)
        .bind(&input.field_path)
        .bind(input.operator.to_string())
        .bind(&input.value)
        .bind(input.include_on_match)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "endpoint", input.endpoint_id.to_string()))
    }

    async fn list_filters(&self, endpoint_id: Uuid) -> Result<Vec<EndpointFilter>, StoreError> {
        Ok(sqlx::query_as(
            r"
            SELECT * FROM webhook_endpoint_filters
            WHERE endpoint_id = $1
            ORDER BY created_at ASC
            ",
        )
        .bind(endpoint_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn delete_filter(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM webhook_endpoint_filters WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_event(&self, input: CreateEvent) -> Result<Event, StoreError> {
        sqlx::query_as(
            r"
            INSERT INTO webhook_events (
                event_id, event_type_id, event_type, payload, occurred_at,
                triggered_by, customer_id, source_ip, user_agent
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            ",
        )
        .bind(&input.event_id)
        .bind(input.event_type_id)
        .bind(&input.event_type)
        .bind(&input.payload)
        .bind(input.occurred_at)
        .bind(input.triggered_by)
        .bind(input.customer_id)
        .bind(&input.source_ip)
        .bind(&input.user_agent)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "event", input.event_id.clone()))
    }

    async fn find_event(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        Ok(sqlx::query_as("SELECT * FROM webhook_events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn search_events(&self, query: EventQuery) -> Result<Vec<Event>, StoreError> {
        let mut sql = String::from("SELECT * FROM webhook_events WHERE 1 = 1");
        let mut param_count = 0;

        if query.event_type_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND event_type_id = ${param_count}"));
        }
        if query.processed.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND processed = ${param_count}"));
        }
        if query.occurred_from.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND occurred_at >= ${param_count}"));
        }
        if query.occurred_to.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND occurred_at <= ${param_count}"));
        }
        if query.triggered_by.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND triggered_by = ${param_count}"));
        }
        if query.customer_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND customer_id = ${param_count}"));
        }
        sql.push_str(&format!(
            " ORDER BY occurred_at DESC LIMIT ${} OFFSET ${}",
            param_count + 1,
            param_count + 2
        ));

        let mut q = sqlx::query_as::<_, Event>(&sql);
        if let Some(event_type_id) = query.event_type_id {
            q = q.bind(event_type_id);
        }
        if let Some(processed) = query.processed {
            q = q.bind(processed);
        }
        if let Some(occurred_from) = query.occurred_from {
            q = q.bind(occurred_from);
        }
        if let Some(occurred_to) = query.occurred_to {
            q = q.bind(occurred_to);
        }
        if let Some(triggered_by) = query.triggered_by {
            q = q.bind(triggered_by);
        }
        if let Some(customer_id) = query.customer_id {
            q = q.bind(customer_id);
        }
        Ok(q.bind(query.limit).bind(query.offset).fetch_all(&self.pool).await?)
    }

    async fn mark_event_processed(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query(
            r"
            UPDATE webhook_events
            SET processed = TRUE, processed_at = now()
            WHERE id = $1 AND processed = FALSE
            ",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_delivery(
        &self,
        input: CreateDelivery,
    ) -> Result<Option<Delivery>, StoreError> {
        Ok(sqlx::query_as(
            r"
            INSERT INTO webhook_deliveries (event_id, endpoint_id, max_attempts, scheduled_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (event_id, endpoint_id) DO NOTHING
            RETURNING *
            ",
        )
        .bind(input.event_id)
        .bind(input.endpoint_id)
        .bind(input.max_attempts)
        .bind(input.scheduled_at)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find_delivery(&self, id: Uuid) -> Result<Option<Delivery>, StoreError> {
        Ok(
            sqlx::query_as("SELECT * FROM webhook_deliveries WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn search_deliveries(&self, query: DeliveryQuery) -> Result<Vec<Delivery>, StoreError> {
        let mut sql = String::from("SELECT * FROM webhook_deliveries WHERE 1 = 1");
        let mut param_count = 0;

        if query.endpoint_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND endpoint_id = ${param_count}"));
        }
        if query.event_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND event_id = ${param_count}"));
        }
        if query.status.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND status = ${param_count}"));
        }
        if query.min_attempts.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND attempt_count >= ${param_count}"));
        }
        if query.max_attempts.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND attempt_count <= ${param_count}"));
        }
        if query.created_from.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND created_at >= ${param_count}"));
        }
        if query.created_to.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND created_at <= ${param_count}"));
        }
        sql.push_str(&format!(
            " ORDER BY created_at DESC LIMIT ${} OFFSET ${}",
            param_count + 1,
            param_count + 2
        ));

        let mut q = sqlx::query_as::<_, Delivery>(&sql);
        if let Some(endpoint_id) = query.endpoint_id {
            q = q.bind(endpoint_id);
        }
        if let Some(event_id) = query.event_id {
            q = q.bind(event_id);
        }
        if let Some(status) = query.status {
            q = q.bind(status.to_string());
        }
        if let Some(min_attempts) = query.min_attempts {
            q = q.bind(min_attempts);
        }
        if let Some(max_attempts) = query.max_attempts {
            q = q.bind(max_attempts);
        }
        if let Some(created_from) = query.created_from {
            q = q.bind(created_from);
        }
        if let Some(created_to) = query.created_to {
            q = q.bind(created_to);
        }
        Ok(q.bind(query.limit).bind(query.offset).fetch_all(&self.pool).await?)
    }

    async fn claim_due_deliveries(
        &self,
        batch: i64,
        lease: Duration,
    ) -> Result<Vec<Delivery>, StoreError> {
        let lease_secs = lease.num_milliseconds() as f64 / 1000.0;
        Ok(sqlx::query_as(
            r"
            UPDATE webhook_deliveries
            SET claimed_at = now(), updated_at = now()
            WHERE id IN (
                SELECT id FROM webhook_deliveries
                WHERE status IN ('pending', 'retrying')
                    AND attempt_count < max_attempts
                    AND COALESCE(next_retry_at, scheduled_at) <= now()
                    AND (claimed_at IS NULL
                         OR claimed_at < now() - make_interval(secs => $2))
                ORDER BY scheduled_at ASC
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING *
            ",
        )
        .bind(batch)
        .bind(lease_secs)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn mark_delivery_delivered(
        &self,
        id: Uuid,
        attempt_count: i32,
        response_code: i16,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r"
            UPDATE webhook_deliveries
            SET status = 'delivered',
                attempt_count = $2,
                delivered_at = now(),
                next_retry_at = NULL,
                claimed_at = NULL,
                last_response_code = $3,
                last_error = NULL,
                updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(attempt_count)
        .bind(response_code)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_delivery_retrying(
        &self,
        id: Uuid,
        attempt_count: i32,
        next_retry_at: DateTime<Utc>,
        response_code: Option<i16>,
        error: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r"
            UPDATE webhook_deliveries
            SET status = 'retrying',
                attempt_count = $2,
                next_retry_at = $3,
                claimed_at = NULL,
                last_response_code = $4,
                last_error = $5,
                updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(attempt_count)
        .bind(next_retry_at)
        .bind(response_code)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_delivery_failed(
        &self,
        id: Uuid,
        attempt_count: i32,
        response_code: Option<i16>,
        error: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r"
            UPDATE webhook_deliveries
            SET status = 'failed',
                attempt_count = $2,
                next_retry_at = NULL,
                claimed_at = NULL,
                last_response_code = $3,
                last_error = $4,
                updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(attempt_count)
        .bind(response_code)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_attempt(
        &self,
        input: CreateDeliveryAttempt,
    ) -> Result<DeliveryAttempt, StoreError> {
        sqlx::query_as(
            r"
            INSERT INTO webhook_delivery_attempts (
                delivery_id, attempt_number, request_url, request_headers,
                request_body_sha256, response_code, response_headers,
                response_body, latency_ms, is_successful, error_type, error_message
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            ",
        )
        .bind(input.delivery_id)
        .bind(input.attempt_number)
        .bind(&input.request_url)
        .bind(&input.request_headers)
        .bind(&input.request_body_sha256)
        .bind(input.response_code)
        .bind(&input.response_headers)
        .bind(&input.response_body)
        .bind(input.latency_ms)
        .bind(input.is_successful)
        .bind(&input.error_type)
        .bind(&input.error_message)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "delivery", input.delivery_id.to_string()))
    }

    async fn list_attempts(
        &self,
        delivery_id: Uuid,
    ) -> Result<Vec<DeliveryAttempt>, StoreError> {
        Ok(sqlx::query_as(
            r"
            SELECT * FROM webhook_delivery_attempts
            WHERE delivery_id = $1
            ORDER BY attempt_number ASC
            ",
        )
        .bind(delivery_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn record_endpoint_delivery(
        &self,
        endpoint_id: Uuid,
        success: bool,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r"
            UPDATE webhook_endpoints
            SET total_deliveries = total_deliveries + 1,
                successful_deliveries = successful_deliveries + CASE WHEN $2 THEN 1 ELSE 0 END,
                failed_deliveries = failed_deliveries + CASE WHEN $2 THEN 0 ELSE 1 END,
                last_delivery_at = now(),
                last_success_at = CASE WHEN $2 THEN now() ELSE last_success_at END,
                last_failure_at = CASE WHEN $2 THEN last_failure_at ELSE now() END,
                updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(endpoint_id)
        .bind(success)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
