//! Optrade Trading Backend Library
//!
//! Core components for the binary-options trading backend: the account
//! ledger, trade lifecycle (create, settle, cancel), the query layer, and
//! the HTTP boundary on top of them.

pub mod application;
pub mod config;
pub mod domain;
pub mod persistence;
