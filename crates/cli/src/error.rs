use leon::{ParseError, RenderError};
use quill_core::output::ExecError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{}", .0)]
    Core(#[from] quill_core::error::Error),

    #[error("The sub process exited with a non-success code: {}", .0)]
    SubProcessExit(i32),

    #[error("The sub process was terminated by a signal.")]
    SubProcessKilled,

    #[error("Error starting `{}`: {}", .shell, .original)]
    SubProcess {
        shell: String,
        original: std::io::Error,
    },

    #[error("Error {} {} file at `{}`: {}", .action, .file_description, .path, .original)]
    Yaml {
        action: String,
        file_description: String,
        path: String,
        original: serde_yaml::Error,
    },

    #[error("No commands were found in the command definition YAML. Is `{}` empty?", .path)]
    EmptyCommandDefinition { path: String },

    #[error("IO error with {} file at path `{}`: {}", .file_description, .path, .original)]
    Io {
        file_description: String,
        path: String,
        original: std::io::Error,
    },

    #[error("Error parsing placeholder string: {}", .0)]
    Parse(#[from] ParseError),

    #[error("Error rendering placeholder template string: {}", .0)]
    Render(#[from] RenderError),

    #[error("STDIO error: {}", .0)]
    Stdio(#[from] std::io::Error),

    #[error("Found a non-unique command name: `{}`", .0)]
    NonUniqueCommandName(String),

    #[error("Found a placeholder that is not a parameter of command `{}`: `{}`", .0, .1)]
    NotFoundParameter(String, String),

    #[error("In {}/{}: cannot read default `{}`: {}", .command, .param, .text, .message)]
    InvalidDefault {
        command: String,
        param: String,
        text: String,
        message: String,
    },

    #[error("Unknown setting `{}`", .0)]
    UnknownSetting(String),

    #[error("Invalid value for setting `{}`: {}", .0, .1)]
    InvalidSetting(String, String),

    #[error("`{}` is not a command that can run: {}", .0, .1)]
    NotRunnable(String, String),
}

impl Error {
    pub fn empty_command_definition(path: String) -> Self {
        Self::EmptyCommandDefinition { path }
    }

    pub fn yaml_error(
        action: String,
        file_description: String,
        path: String,
        original: serde_yaml::Error,
    ) -> Self {
        Self::Yaml {
            action,
            file_description,
            path,
            original,
        }
    }

    pub fn io_error(file_description: String, path: String, original: std::io::Error) -> Self {
        Self::Io {
            file_description,
            path,
            original,
        }
    }
}

impl From<Error> for ExecError {
    fn from(error: Error) -> Self {
        ExecError::new(error.to_string())
    }
}
