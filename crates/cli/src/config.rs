//! Configuration paths and defaults for `ql`.
//!
//! Paths given on the command line or taken from the defaults below go
//! through `shellexpand`, so `~` works everywhere a path is accepted.

/// Default path for the command definitions file
const DEFAULT_CONFIG_PATH: &str = "~/.quill/commands.yml";
/// Default path for the history of executed lines
const DEFAULT_HISTORY_PATH: &str = "~/.quill/history.yml";

/// Default shell to use for command execution
pub const DEFAULT_SHELL: &str = "/bin/bash";

/// Default number of lines kept in the history
pub const DEFAULT_HISTORY_SIZE: usize = 100;

/// Resolves the command definitions file path.
///
/// Uses `config_path_arg` if given, otherwise the default path. Shell
/// expansions like `~` are resolved.
///
/// # Examples
///
/// ```
/// use quill_cli::config::get_config_path;
///
/// let custom_path = get_config_path(Some("/path/to/commands.yml"));
/// assert_eq!(custom_path, "/path/to/commands.yml");
/// ```
pub fn get_config_path(config_path_arg: Option<&str>) -> String {
    shellexpand::tilde(config_path_arg.unwrap_or(DEFAULT_CONFIG_PATH)).to_string()
}

/// Resolves the history file path, like [`get_config_path`].
pub fn get_history_path(history_path_arg: Option<&str>) -> String {
    shellexpand::tilde(history_path_arg.unwrap_or(DEFAULT_HISTORY_PATH)).to_string()
}

/// The shell commands run through: `$SHELL`, or [`DEFAULT_SHELL`].
pub fn default_shell() -> String {
    std::env::var("SHELL").unwrap_or_else(|_| DEFAULT_SHELL.to_string())
}

/// Expands shell variables in a working directory path.
///
/// # Examples
///
/// ```
/// use quill_cli::config::expand_working_directory;
///
/// let expanded = expand_working_directory(Some("~/projects"));
/// assert!(expanded.is_some());
/// assert!(expand_working_directory(None).is_none());
/// ```
pub fn expand_working_directory(working_directory: Option<&str>) -> Option<String> {
    working_directory.map(|working_directory| shellexpand::tilde(working_directory).to_string())
}
