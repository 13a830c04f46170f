//! Theme state and server-rendered page shells.

pub mod pages;
pub mod theme;
