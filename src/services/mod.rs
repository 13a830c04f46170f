//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own session, identity-provider and GitHub concerns so
//! route handlers can stay focused on protocol translation and cookie
//! plumbing. Nothing here depends on axum.

pub mod auth;
pub mod entry;
pub mod github;
pub mod guard;
pub mod session;
pub mod token_store;
