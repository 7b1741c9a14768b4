//! Domain services used by the HTTP routes and the seed command.
//!
//! ARCHITECTURE
//! ============
//! Service modules own business logic and store access so route handlers
//! stay focused on request decoding and cookie plumbing. Every board
//! operation takes the caller's `SessionContext` as a parameter.

pub mod auth;
pub mod board;
pub mod ordering;
pub mod session;
