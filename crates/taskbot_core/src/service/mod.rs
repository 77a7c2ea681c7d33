//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep dispatch and transport layers decoupled from storage details.

pub mod task_service;
