//! Audit log repository implementation.

use sqlx::PgPool;

use tillpoint_core::error::{AppError, ErrorKind};
use tillpoint_core::result::AppResult;
use tillpoint_core::types::pagination::{PageRequest, PageResponse};
use tillpoint_entity::audit::{AuditLogEntry, AuditLogFilter, CreateAuditLogEntry};

/// Repository for the append-only audit log.
#[derive(Debug, Clone)]
pub struct AuditLogRepository {
    pool: PgPool,
}

impl AuditLogRepository {
    /// Create a new audit log repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append an audit log entry.
    pub async fn create(&self, data: &CreateAuditLogEntry) -> AppResult<AuditLogEntry> {
        sqlx::query_as::<_, AuditLogEntry>(
            "INSERT INTO audit_log \
                 (user_id, action_type, module_id, action_id, ip_address, \
                  user_agent, session_id, risk_level, details) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
        )
        .bind(data.user_id)
        .bind(data.action_type)
        .bind(data.module_id)
        .bind(data.action_id)
        .bind(&data.ip_address)
        .bind(&data.user_agent)
        .bind(data.session_id)
        .bind(data.risk_level)
        .bind(&data.details)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create audit entry", e))
    }

    /// Search the audit log with filters, newest first. Administrative
    /// review only; never called on the check hot path.
    pub async fn search(
        &self,
        filter: &AuditLogFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<AuditLogEntry>> {
        let mut conditions = Vec::new();
        let mut param_idx = 1u32;

        if filter.user_id.is_some() {
            conditions.push(format!("user_id = ${param_idx}"));
            param_idx += 1;
        }
        if filter.action_type.is_some() {
            conditions.push(format!("action_type = ${param_idx}"));
            param_idx += 1;
        }
        if filter.module_id.is_some() {
            conditions.push(format!("module_id = ${param_idx}"));
            param_idx += 1;
        }
        if filter.risk_level.is_some() {
            conditions.push(format!("risk_level = ${param_idx}"));
            param_idx += 1;
        }
        if filter.since.is_some() {
            conditions.push(format!("created_at >= ${param_idx}"));
            param_idx += 1;
        }
        if filter.until.is_some() {
            conditions.push(format!("created_at < ${param_idx}"));
            param_idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) FROM audit_log {where_clause}");
        let select_sql = format!(
            "SELECT * FROM audit_log {where_clause} ORDER BY created_at DESC LIMIT ${param_idx} OFFSET ${}",
            param_idx + 1
        );

        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        let mut select_query = sqlx::query_as::<_, AuditLogEntry>(&select_sql);

        if let Some(uid) = filter.user_id {
            count_query = count_query.bind(uid);
            select_query = select_query.bind(uid);
        }
        if let Some(at) = filter.action_type {
            count_query = count_query.bind(at);
            select_query = select_query.bind(at);
        }
        if let Some(mid) = filter.module_id {
            count_query = count_query.bind(mid);
            select_query = select_query.bind(mid);
        }
        if let Some(rl) = filter.risk_level {
            count_query = count_query.bind(rl);
            select_query = select_query.bind(rl);
        }
        if let Some(since) = filter.since {
            count_query = count_query.bind(since);
            select_query = select_query.bind(since);
        }
        if let Some(until) = filter.until {
            count_query = count_query.bind(until);
            select_query = select_query.bind(until);
        }

        let total = count_query.fetch_one(&self.pool).await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to count audit entries", e)
        })?;

        let entries = select_query
            .bind(page.limit() as i64)
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to search audit log", e)
            })?;

        Ok(PageResponse::new(
            entries,
            page.page,
            page.page_size,
            total as u64,
        ))
    }
}
