use sea_orm::{DatabaseConnection, DatabaseTransaction};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, sync::Synchronizer};

mod aggregates;
mod entries;

pub use aggregates::AggregateReport;
pub use entries::{EntryListFilter, EntryPage};

/// Run a read-only or single-entity block inside a DB transaction, committing
/// on success and rolling back (on drop) on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// Tunables of the engine.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// How many times a mutation is retried from a fresh read when a
    /// concurrent writer got there first (version bump or busy database).
    pub max_conflict_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_conflict_retries: 3,
        }
    }
}

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    config: EngineConfig,
    sync: Synchronizer,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Whether a failed mutation attempt should run again.
    ///
    /// A conflict against a caller-pinned version is final.
    fn should_retry(&self, err: &EngineError, attempt: u32, pinned_version: bool) -> bool {
        attempt < self.config.max_conflict_retries
            && err.is_retryable()
            && !(pinned_version && matches!(err, EngineError::Conflict(_)))
    }

    /// Commits a ledger write together with its aggregate adjustment, or
    /// rolls both back.
    ///
    /// A failed rollback leaves the pair in an unknown state: it is reported
    /// as `Consistency` and logged as a reconciliation task for the user.
    async fn settle<T>(
        &self,
        db_tx: DatabaseTransaction,
        outcome: ResultEngine<T>,
        user_id: &str,
        entry_id: Uuid,
    ) -> ResultEngine<T> {
        match outcome {
            Ok(value) => {
                db_tx.commit().await?;
                Ok(value)
            }
            Err(err) => match db_tx.rollback().await {
                Ok(()) => Err(err),
                Err(rollback_err) => {
                    tracing::error!(
                        user_id,
                        %entry_id,
                        error = %err,
                        rollback_error = %rollback_err,
                        "ledger and aggregate may be out of sync; reconciliation required"
                    );
                    Err(EngineError::Consistency {
                        user_id: user_id.to_string(),
                        entry_id,
                        reason: format!("{err}; rollback failed: {rollback_err}"),
                    })
                }
            },
        }
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    config: EngineConfig,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    pub fn config(mut self, config: EngineConfig) -> EngineBuilder {
        self.config = config;
        self
    }

    pub fn max_conflict_retries(mut self, retries: u32) -> EngineBuilder {
        self.config.max_conflict_retries = retries;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        self.database.ping().await?;
        Ok(Engine {
            database: self.database,
            config: self.config,
            sync: Synchronizer,
        })
    }
}
