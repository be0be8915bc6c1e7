//! # CLI Behavior
//!
//! This is **one possible client** for a vault. It is the only place that knows about
//! terminal I/O, exit codes and output formatting.
//!
//! ## Addressing Items
//!
//! Every document, folder and trash record is addressed by its UUID. Any unique
//! prefix of at least four characters works too, so the short ids printed by `ls`
//! and `trash ls` can be pasted back in. An ambiguous prefix is an error that lists
//! the candidates.
//!
//! ## Vault Location
//!
//! `--root DIR` selects the storage root. Without it the OS data directory is used
//! (`notevault::config::default_root`). Settings come from `notevault.toml`, see
//! `notevault::config`.
//!
//! ## Logging
//!
//! Library events go through `log`. `RUST_LOG` picks the filter; `-v` raises the
//! default to `debug`.
//!
//! ## Module Structure
//!
//! - `setup`: Argument parsing via clap
//! - `commands`: Vault wiring and per-command handlers
//! - `render`: Output formatting

mod commands;
mod render;
pub mod setup;

pub use commands::run;
