//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate session calls into use-case level APIs.
//! - Keep CLI callers decoupled from storage details.

pub mod user_service;
