//! Aura engine: a per-user and per-group RGB "mood" that drifts toward
//! the emotional tone of the messages being sent.

pub mod aura;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod store;
pub mod tone;
