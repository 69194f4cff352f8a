//! Command handlers for the sunwidgetr CLI.
//!
//! Each subcommand is implemented in its own submodule. `serve` hosts the
//! long-running instance; the rest are one-shot commands that either talk to
//! that instance or do the work themselves.

pub mod locate;
pub mod save;
pub mod serve;
pub mod status;
pub mod sync;
