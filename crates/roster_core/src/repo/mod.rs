//! Persistence session layer.
//!
//! # Responsibility
//! - Define the session contract the service layer persists through.
//! - Isolate SQLite query and transaction details from service orchestration.
//!
//! # Invariants
//! - Sessions return semantic errors (`Conflict`) in addition to DB
//!   transport errors.
//! - Writes become durable only through `UserSession::commit`.

pub mod user_session;
