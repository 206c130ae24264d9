use log::error;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Configuration and invariant errors.
///
/// Parse-time problems with typed input are never errors, they are reported
/// through the [`Status`](crate::status::Status) of a conversion instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid command: a command must have a non-empty name")]
    MissingCommandName,

    #[error("Invalid type: a type must have a non-empty name")]
    MissingTypeName,

    #[error("Unknown type `{}`", .0)]
    UnknownType(String),

    #[error("Invalid options for type `{}`: {}", .type_name, .message)]
    InvalidTypeOptions { type_name: String, message: String },

    #[error("In {}: positional parameter `{}` follows a named-only parameter", .command, .param)]
    PositionalAfterNamed { command: String, param: String },

    #[error("In {}: parameter names may not be empty", .0)]
    EmptyParameterName(String),

    #[error("In {}: parameter name `{}` may not contain spaces", .command, .param)]
    ParameterNameWithSpace { command: String, param: String },

    #[error("In {}: found a non-unique parameter name `{}`", .command, .param)]
    DuplicateParameterName { command: String, param: String },

    #[error("In {}/{}: boolean parameters always default to false", .command, .param)]
    InvalidBooleanDefault { command: String, param: String },

    #[error("In {}/{}: named-only parameters need a default value", .command, .param)]
    MissingNamedDefault { command: String, param: String },

    #[error(
        "In {}/{}: default value `{}` does not round trip ({})",
        .command,
        .param,
        .text,
        .message
    )]
    InvalidDefault {
        command: String,
        param: String,
        text: String,
        message: String,
    },

    #[error("Unknown parameter `{}`", .0)]
    UnknownParameter(String),

    #[error("Internal error: {}", .0)]
    Invariant(String),
}

impl Error {
    pub fn invalid_type_options(type_name: &str, message: impl Into<String>) -> Self {
        Self::InvalidTypeOptions {
            type_name: type_name.to_string(),
            message: message.into(),
        }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        let message = message.into();
        error!("Invariant violated: {message}");
        Self::Invariant(message)
    }
}
