//! Background Tasks Module
//!
//! Contains background tasks that run alongside an engine.
//!
//! # Tasks
//! - Purge: Removes expired memory engine entries at a fixed interval

mod purge;

pub use purge::spawn_purge_task;
