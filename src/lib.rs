//! # sunwidgetr Library
//!
//! Internal library for the sunwidgetr binary application
//!
//! This library exists to enable testing of complex internals and provide
//! clean separation between CLI dispatch (main.rs) and application logic.
//!
//! ## Architecture
//!
//! - **Store**: `store` module persists location and sunrise/sunset times
//! - **Fetching**: `api` module talks to the remote time service
//! - **Synchronization**: `sync` module coordinates fetch, cache and outcome
//! - **Location**: `location` module acquires a position via GeoClue2
//! - **Notification**: `notify` module broadcasts events to widgets
//! - **Commands**: `commands` module for CLI subcommands (serve, sync, ...)
//! - **Infrastructure**: signal handling, instance locking, logging, config

// Import macros from logger module for use in all submodules
#[macro_use]
pub mod logger;

pub mod api;
pub mod args;
pub mod commands;
pub mod common;
pub mod config;
pub mod instance;
pub mod location;
pub mod notify;
pub mod signals;
pub mod store;
pub mod sync;
