//! Command-line argument parsing.
//!
//! This module defines the command-line interface of `ql` using the `clap`
//! crate.

use clap::Parser;

/// Command-line arguments for `ql`.
///
/// Without `input` words `ql` starts the interactive prompt. With them the
/// words are joined into one line which is executed (or checked) once.
///
/// # Examples
///
/// ```rust
/// use clap::Parser;
/// use quill_cli::cli_args::Args;
///
/// let args = Args::parse_from(["ql", "--dry-run", "deploy", "staging"]);
/// assert_eq!(args.input_line(), Some("deploy staging".to_string()));
/// ```
#[derive(Parser, Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct Args {
    /// Path to the command definitions YAML file.
    ///
    /// If not provided, defaults to `~/.quill/commands.yml`.
    #[arg(long, short = 'c')]
    pub config_path: Option<String>,

    /// Path to the file storing the history of executed lines.
    ///
    /// If not provided, defaults to `~/.quill/history.yml`.
    #[arg(long, short = 'l')]
    pub history_path: Option<String>,

    /// Print the shell command lines instead of running them.
    #[arg(long, short = 'd', action)]
    pub dry_run: bool,

    /// Do not add executed lines to the history file.
    #[arg(long, short = 's', action)]
    pub skip_history_save: bool,

    /// Report whether the input line is valid instead of executing it.
    #[arg(long, action)]
    pub check: bool,

    /// A line to execute once, instead of starting the prompt.
    ///
    /// # Examples
    /// ```bash
    /// ql deploy staging --verbose
    /// ```
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub input: Vec<String>,
}

impl Args {
    /// The one-shot input line, if any words were given.
    pub fn input_line(&self) -> Option<String> {
        if self.input.is_empty() {
            None
        } else {
            Some(self.input.join(" "))
        }
    }
}
