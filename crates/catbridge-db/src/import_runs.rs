//! Database operations for `import_runs`.

use std::fmt::Display;
use std::future::Future;

use catbridge_core::{EntityKind, ImportResult};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `import_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ImportRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub entity_kind: String,
    pub trigger_source: String,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub records_processed: i32,
    pub records_skipped: i32,
    pub error_count: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

const IMPORT_RUN_COLUMNS: &str = "id, public_id, entity_kind, trigger_source, status, \
     started_at, completed_at, records_processed, records_skipped, error_count, \
     error_message, created_at";

/// Creates a new import run in `queued` status and returns the full row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_import_run(
    pool: &PgPool,
    entity_kind: EntityKind,
    trigger_source: &str,
) -> Result<ImportRunRow, DbError> {
    let public_id = Uuid::new_v4();

    let row = sqlx::query_as::<_, ImportRunRow>(&format!(
        "INSERT INTO import_runs (public_id, entity_kind, trigger_source, status) \
         VALUES ($1, $2, $3, 'queued') \
         RETURNING {IMPORT_RUN_COLUMNS}"
    ))
    .bind(public_id)
    .bind(entity_kind.to_string())
    .bind(trigger_source)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Moves a `queued` run to `running` and sets `started_at = NOW()`.
///
/// # Errors
///
/// Returns [`DbError::InvalidImportRunTransition`] if the run is not queued,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn start_import_run(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE import_runs \
         SET status = 'running', started_at = NOW() \
         WHERE id = $1 AND status = 'queued'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidImportRunTransition {
            id,
            expected_status: "queued",
        });
    }

    Ok(())
}

/// Marks a `running` run as `succeeded` with its final counters.
///
/// A run whose ledger carries per-record errors still succeeds; only fatal
/// aborts go through [`fail_import_run`].
///
/// # Errors
///
/// Returns [`DbError::InvalidImportRunTransition`] if the run is not running,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn complete_import_run(
    pool: &PgPool,
    id: i64,
    records_processed: i32,
    records_skipped: i32,
    error_count: i32,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE import_runs \
         SET status = 'succeeded', completed_at = NOW(), \
             records_processed = $1, records_skipped = $2, error_count = $3 \
         WHERE id = $4 AND status = 'running'",
    )
    .bind(records_processed)
    .bind(records_skipped)
    .bind(error_count)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidImportRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Marks a `running` run as `failed` with the fatal error message.
///
/// # Errors
///
/// Returns [`DbError::InvalidImportRunTransition`] if the run is not running,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn fail_import_run(pool: &PgPool, id: i64, error_message: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE import_runs \
         SET status = 'failed', completed_at = NOW(), error_message = $1 \
         WHERE id = $2 AND status = 'running'",
    )
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidImportRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_import_run(pool: &PgPool, id: i64) -> Result<ImportRunRow, DbError> {
    let row = sqlx::query_as::<_, ImportRunRow>(&format!(
        "SELECT {IMPORT_RUN_COLUMNS} FROM import_runs WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Returns the most recent `limit` runs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_import_runs(pool: &PgPool, limit: i64) -> Result<Vec<ImportRunRow>, DbError> {
    let rows = sqlx::query_as::<_, ImportRunRow>(&format!(
        "SELECT {IMPORT_RUN_COLUMNS} FROM import_runs \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Runs `import`, bracketing it with an `import_runs` row when `pool` is
/// given: queued and running before, succeeded or failed after.
///
/// Bookkeeping failures are logged and never change the import's outcome.
///
/// # Errors
///
/// Returns the error of `import` unchanged.
pub async fn record_import_run<F, E>(
    pool: Option<&PgPool>,
    kind: EntityKind,
    trigger_source: &str,
    import: F,
) -> Result<ImportResult, E>
where
    F: Future<Output = Result<ImportResult, E>>,
    E: Display,
{
    let run_id = match pool {
        Some(pool) => begin_run(pool, kind, trigger_source).await,
        None => None,
    };

    let outcome = import.await;

    if let (Some(pool), Some(run_id)) = (pool, run_id) {
        match &outcome {
            Ok(result) => complete_run_best_effort(pool, run_id, result).await,
            Err(e) => fail_run_best_effort(pool, run_id, kind, &e.to_string()).await,
        }
    }

    if let Ok(result) = &outcome {
        tracing::info!(
            kind = %kind,
            trigger_source,
            processed = result.processed,
            skipped = result.skipped,
            errors = result.failed(),
            "import finished"
        );
    }
    outcome
}

async fn begin_run(pool: &PgPool, kind: EntityKind, trigger_source: &str) -> Option<i64> {
    let run = match create_import_run(pool, kind, trigger_source).await {
        Ok(run) => run,
        Err(e) => {
            tracing::error!(kind = %kind, error = %e, "failed to record import run");
            return None;
        }
    };
    if let Err(e) = start_import_run(pool, run.id).await {
        tracing::error!(run_id = run.id, error = %e, "failed to mark import run as running");
        return None;
    }
    Some(run.id)
}

async fn complete_run_best_effort(pool: &PgPool, run_id: i64, result: &ImportResult) {
    let processed = saturating_i32(result.processed);
    let skipped = saturating_i32(result.skipped);
    let errors = saturating_i32(result.failed());
    if let Err(e) = complete_import_run(pool, run_id, processed, skipped, errors).await {
        tracing::error!(run_id, error = %e, "failed to mark import run as succeeded");
    }
}

async fn fail_run_best_effort(pool: &PgPool, run_id: i64, kind: EntityKind, message: &str) {
    if let Err(mark_err) = fail_import_run(pool, run_id, message).await {
        tracing::error!(
            run_id,
            error = %mark_err,
            "failed to mark {kind} import run as failed"
        );
    }
}

fn saturating_i32(value: usize) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
