//! Engine Module
//!
//! The storage engine contract, its shared scaffolding and the lifecycle
//! guard used by cache managers.

mod base;
mod clock;
mod contract;
mod managed;


// Re-export public types
pub use base::{default_id_generator, EngineCore, EngineCoreBuilder, IdGenerator};
pub use clock::{Clock, ManualClock, SystemClock};
pub use contract::{Datum, Engine, Operation};
pub use managed::{EngineState, ManagedEngine};
