//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate model mutations and snapshot persistence into the
//!   command/query surface consumed by the UI layer.
//! - Keep callers decoupled from storage details.

pub mod board_store;
