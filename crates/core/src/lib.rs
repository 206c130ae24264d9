//! Quill Core Library
//!
//! This crate turns free-form typed text into a typed, named set of command
//! arguments, re-parsing on every keystroke so an input widget can show
//! validity, completions and what each character belongs to.
//!
//! # Key Features
//!
//! - **Lossless tokenizing**: quotes, escapes, `{ ... }` script blocks
//! - **Command registry**: multi-word commands, parameter groups, switches,
//!   array parameters and defaults checked at registration
//! - **Pluggable types**: numbers, selections, deferred types and anything
//!   implementing [`types::Type`]
//! - **Live requisition**: status per character, predictions, completion,
//!   increment/decrement and execution with asynchronous results
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use quill_core::canon::{Canon, CommandSpec, ParamSpec};
//! use quill_core::output::Reply;
//! use quill_core::requisition::Requisition;
//! use quill_core::status::Status;
//!
//! let canon = Canon::new();
//! canon.add_command(
//!     CommandSpec::new("echo")
//!         .param(ParamSpec::new("message"))
//!         .exec(|args, _| Ok(Reply::from(args.get_str("message").unwrap_or_default()))),
//! )?;
//!
//! let mut requisition = Requisition::new(Arc::new(canon));
//! requisition.update("echo hello world");
//! assert_eq!(requisition.status(), Status::Valid);
//!
//! let output = requisition.exec(None);
//! assert!(output.is_completed());
//! # Ok::<(), quill_core::error::Error>(())
//! ```

pub mod argument;
pub mod canon;
pub mod conversion;
pub mod error;
pub mod events;
pub mod host;
pub mod output;
pub mod requisition;
pub mod status;
pub mod tokenizer;
pub mod types;
pub mod value;
