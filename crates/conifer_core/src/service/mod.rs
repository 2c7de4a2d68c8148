//! Use-case services.
//!
//! # Responsibility
//! - Orchestrate model and repository calls into dashboard use cases.
//! - Keep the presentation layer decoupled from file layout and locking.

pub mod dashboard_service;
pub mod leaderboard_service;
pub mod session_service;
