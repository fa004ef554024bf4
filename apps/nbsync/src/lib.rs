//! Library surface of the nbsync binary: configuration parsing, logging
//! setup and the run lifecycle. Split out so integration tests can drive
//! the parser and orchestrator directly.

pub mod config;
pub mod logging;
pub mod run;
