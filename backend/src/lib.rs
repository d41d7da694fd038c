//! ENEM API Backend Library
//!
//! This library exposes modules for testing and external use.
//! The main binary is in `src/main.rs`.

pub mod api;
pub mod config;
pub mod error;
pub mod loader;
pub mod models;
pub mod repositories;
pub mod services;
/// Application state shared by the handlers
pub mod state;
pub mod stats;
pub mod store;
