//! Create-with-retry for tables whose primary-key sequence can fall behind
//! rows inserted with explicit ids.
//!
//! A primary-key collision advances the table's sequence and re-runs the same
//! insert. Any other unique violation is reported as a duplicate field and is
//! never retried. There is no backoff between attempts.

use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ConnectionTrait, DbBackend, DbErr, EntityName,
    EntityTrait, IntoActiveModel, SqlErr, Statement, TransactionTrait,
};
use std::fmt;
use std::future::Future;
use tracing::{debug, error, warn};

/// Attempt bound used when the configuration does not override it.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;

/// Settings for [`create_with_retry`].
#[derive(Debug, Clone, Copy)]
pub struct CreateRetryConfig {
    /// Total insert attempts, including the first one.
    pub max_attempts: u32,
}

impl Default for CreateRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// How a failed insert collided with existing data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
    /// The generated primary key is already taken.
    PrimaryKey,
    /// Another unique constraint rejected the row; carries the offending field.
    Unique(String),
}

/// Classifies store errors for the retry loop.
pub trait ConflictClassify {
    /// `table` is the insert target, used to strip it from constraint names.
    fn conflict(&self, table: &str) -> Option<Conflict>;
}

#[derive(Debug, thiserror::Error)]
pub enum CreateError<E> {
    #[error("{0} already exists")]
    Duplicate(String),

    #[error("Unable to create {entity} after {attempts} attempts")]
    Exhausted { entity: String, attempts: u32 },

    #[error("{0}")]
    Store(E),
}

/// Runs `attempt` until it succeeds, fails with something other than a
/// primary-key collision, or `config.max_attempts` collisions have happened.
///
/// `advance` runs once after every collision, before the next attempt.
pub async fn create_with_retry<T, E, A, AFut, S, SFut>(
    entity: &str,
    config: CreateRetryConfig,
    mut attempt: A,
    mut advance: S,
) -> Result<T, CreateError<E>>
where
    A: FnMut() -> AFut,
    AFut: Future<Output = Result<T, E>>,
    S: FnMut() -> SFut,
    SFut: Future<Output = ()>,
    E: ConflictClassify + fmt::Display,
{
    let max_attempts = config.max_attempts.max(1);

    for attempt_no in 1..=max_attempts {
        let err = match attempt().await {
            Ok(created) => {
                if attempt_no > 1 {
                    debug!(entity, attempts = attempt_no, "create succeeded after retry");
                }
                return Ok(created);
            }
            Err(err) => err,
        };

        match err.conflict(entity) {
            Some(Conflict::PrimaryKey) => {
                counter!("marketplace_db.pk_collision", 1, "entity" => entity.to_string());
                warn!(
                    entity,
                    attempt = attempt_no,
                    max_attempts,
                    "primary key collision, advancing sequence"
                );
                advance().await;
            }
            Some(Conflict::Unique(field)) => {
                debug!(entity, field = %field, "unique constraint violated");
                return Err(CreateError::Duplicate(field));
            }
            None => return Err(CreateError::Store(err)),
        }
    }

    counter!("marketplace_db.create_exhausted", 1, "entity" => entity.to_string());
    error!(entity, attempts = max_attempts, "giving up after repeated primary key collisions");
    Err(CreateError::Exhausted {
        entity: entity.to_string(),
        attempts: max_attempts,
    })
}

/// Inserts `model` through [`create_with_retry`], advancing `{table}_id_seq`
/// on collisions.
///
/// Each attempt runs in its own savepoint, so a rejected insert leaves an
/// enclosing transaction usable.
pub async fn insert_with_retry<A, C>(
    db: &C,
    model: A,
    config: CreateRetryConfig,
) -> Result<<A::Entity as EntityTrait>::Model, CreateError<DbErr>>
where
    C: ConnectionTrait + TransactionTrait,
    A: ActiveModelTrait + ActiveModelBehavior + Send,
    <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
{
    let table = <A::Entity as Default>::default().table_name().to_owned();
    let sequence = format!("{}_id_seq", table);
    let sequence = sequence.as_str();

    create_with_retry(
        &table,
        config,
        move || {
            let model = model.clone();
            async move { insert_in_savepoint(db, model).await }
        },
        move || advance_sequence(db, sequence),
    )
    .await
}

async fn insert_in_savepoint<A, C>(
    db: &C,
    model: A,
) -> Result<<A::Entity as EntityTrait>::Model, DbErr>
where
    C: ConnectionTrait + TransactionTrait,
    A: ActiveModelTrait + ActiveModelBehavior + Send,
    <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
{
    let savepoint = db.begin().await?;
    match model.insert(&savepoint).await {
        Ok(created) => {
            savepoint.commit().await?;
            Ok(created)
        }
        Err(err) => {
            if let Err(rollback_err) = savepoint.rollback().await {
                warn!(error = %rollback_err, "savepoint rollback failed");
            }
            Err(err)
        }
    }
}

/// Nudges a Postgres sequence forward. Failures are logged and ignored; other
/// backends have no sequence to advance.
pub async fn advance_sequence<C>(db: &C, sequence: &str)
where
    C: ConnectionTrait,
{
    if db.get_database_backend() != DbBackend::Postgres {
        return;
    }

    let stmt = Statement::from_sql_and_values(
        DbBackend::Postgres,
        "SELECT nextval($1::regclass)",
        [sequence.into()],
    );
    if let Err(e) = db.query_one(stmt).await {
        warn!(sequence, error = %e, "failed to advance sequence");
    }
}

static PG_CONSTRAINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"unique constraint "([^"]+)""#).expect("valid regex"));

static SQLITE_COLUMNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"UNIQUE constraint failed: (.+)$").expect("valid regex"));

impl ConflictClassify for DbErr {
    fn conflict(&self, table: &str) -> Option<Conflict> {
        match self.sql_err()? {
            SqlErr::UniqueConstraintViolation(message) => {
                Some(classify_unique_message(&message, table))
            }
            _ => None,
        }
    }
}

/// Reads a unique-violation message from Postgres or SQLite.
///
/// Postgres names the constraint: `*_pkey` is the primary key and
/// `{table}_{field}_key` names the field. SQLite lists `table.column`
/// pairs; a lone `id` column is the primary key.
pub fn classify_unique_message(message: &str, table: &str) -> Conflict {
    if let Some(name) = PG_CONSTRAINT
        .captures(message)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
    {
        if name.ends_with("_pkey") {
            return Conflict::PrimaryKey;
        }
        let prefix = format!("{}_", table);
        let field = name.strip_prefix(prefix.as_str()).unwrap_or(name);
        let field = field
            .strip_suffix("_key")
            .or_else(|| field.strip_suffix("_unique"))
            .unwrap_or(field);
        return Conflict::Unique(field.to_string());
    }

    if let Some(columns) = SQLITE_COLUMNS
        .captures(message.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
    {
        let columns: Vec<&str> = columns
            .split(',')
            .map(|c| c.trim())
            .map(|c| c.rsplit('.').next().unwrap_or(c))
            .collect();
        if columns == ["id"] {
            return Conflict::PrimaryKey;
        }
        if let Some(first) = columns.first() {
            return Conflict::Unique((*first).to_string());
        }
    }

    Conflict::Unique("value".to_string())
}
