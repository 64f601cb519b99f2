//! Persistence layer: aura records behind a backend trait, plus the
//! atomic update wrapper everything else goes through.

pub mod aura_store;
pub mod libsql_backend;
pub mod memory;
pub mod migrations;
pub mod traits;

pub use aura_store::{ApplyOutcome, AuraStore, DEFAULT_MAX_ATTEMPTS};
pub use libsql_backend::LibSqlBackend;
pub use memory::InMemoryBackend;
pub use traits::{AuraBackend, AuraRecord, AuraSlot, CasOutcome};
