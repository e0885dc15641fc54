//! Expense ledger with synchronized per-user running totals.
//!
//! Every create, update and delete of a [`LedgerEntry`] is paired, inside one
//! database transaction, with an atomic adjustment of the owner's
//! [`UserAggregate`]. See [`Engine`] for the entry points.

pub use aggregates::{AggregateField, Totals, UserAggregate};
pub use commands::{CreateEntryCmd, EntryPatch, UpdateEntryCmd};
pub use delta::Delta;
pub use entries::{EntryKind, LedgerEntry};
pub use error::EngineError;
pub use money::Money;
pub use ops::{
    AggregateReport, Engine, EngineBuilder, EngineConfig, EntryListFilter, EntryPage,
};

mod aggregates;
mod commands;
mod delta;
mod entries;
mod error;
mod money;
mod ops;
mod sync;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
