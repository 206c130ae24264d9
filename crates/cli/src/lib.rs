//! Quill CLI Library
//!
//! This crate provides `ql`, a shell prompt built on `quill-core`. Commands
//! are defined in a YAML file as templated shell command lines with typed
//! parameters, and are typed at a prompt that checks, colours and completes
//! the line on every key.
//!
//! # Key Features
//!
//! - **Live Prompt**: status colouring, predictions, Tab completion and
//!   value stepping as you type
//! - **Command Definitions**: templated command lines with typed, optional
//!   and defaulted parameters, grouped sub-commands
//! - **Background Commands**: long runs report when they finish
//! - **History**: executed lines are saved and can be recalled
//! - **Builtins**: `help`, `set`, `history`, `exit` and `{ ... }` scripts
//!
//! # Architecture
//!
//! - [`cli_args`]: Command-line argument parsing
//! - [`definitions`], [`file_handling`]: Reading and validating the YAML
//! - [`interpolation`], [`execution`]: Rendering and running shell lines
//! - [`host`], [`history`], [`builtins`]: What commands see of the session
//! - [`session`]: The canon, requisition and host together
//! - [`prompt`]: The interactive terminal prompt
//!
//! # Examples
//!
//! ```bash
//! # Interactive prompt
//! ql
//!
//! # Run one line
//! ql deploy staging --verbose
//!
//! # Check a line without running it
//! ql --check deploy staging
//!
//! # Print what would run
//! ql --dry-run deploy staging
//! ```

pub mod builtins;
pub mod cli_args;
pub mod config;
pub mod definitions;
pub mod error;
pub mod execution;
pub mod file_handling;
pub mod history;
pub mod host;
pub mod interpolation;
pub mod prompt;
pub mod session;
