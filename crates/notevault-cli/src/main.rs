//! # Notevault CLI
//!
//! A small administrative client for a notevault storage root: browse folders, move
//! and rename things, manage the trash and run recovery. The binary is intentionally
//! thin; argument parsing, dispatch and rendering live in `src/cli/`, and every
//! storage decision is made by the `notevault` library.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (crates/notevault-cli/src/cli/)                  │
//! │  - clap argument parsing (setup.rs)                         │
//! │  - Vault wiring + dispatch (commands.rs)                    │
//! │  - Plain-text output (render.rs)                            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  notevault::Vault                                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
