//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate collaborator calls into use-case level APIs.
//! - Keep UI/FFI layers decoupled from store and auth details.

pub mod account_service;
