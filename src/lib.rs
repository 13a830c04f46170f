//! DailyCommit: write daily journal entries and commit them to GitHub.

pub mod config;
pub mod routes;
pub mod services;
pub mod state;
pub mod ui;
