//! Reading and writing the command definitions and history files.

use std::collections::HashSet;
use std::fs::{self, File};
use std::path::Path;

use log::info;

use crate::definitions::CommandDefinition;
use crate::error::Error::{NonUniqueCommandName, NotFoundParameter};
use crate::error::{Error, Result};
use crate::interpolation;

fn get_reader(file_description: &str, path: &str) -> Result<File> {
    File::open(path).map_err(|e| Error::io_error(file_description.to_string(), path.to_string(), e))
}

fn ensure_parent(file_description: &str, path: &str) -> Result<()> {
    match Path::new(path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
            .map_err(|e| Error::io_error(file_description.to_string(), path.to_string(), e)),
        _ => Ok(()),
    }
}

/// Reads the history of executed lines, oldest first.
///
/// Returns an empty history if the file doesn't exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read, or is not a
/// YAML list of strings.
pub fn get_history(history_path: &str) -> Result<Vec<String>> {
    if !Path::new(history_path).exists() {
        return Ok(Vec::new());
    }

    let reader = get_reader("history", history_path)?;
    serde_yaml::from_reader(reader).map_err(|e| {
        Error::yaml_error(
            "reading".to_string(),
            "history".to_string(),
            history_path.to_string(),
            e,
        )
    })
}

/// Writes the history of executed lines, creating the directory if needed.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written to.
pub fn write_history(history_path: &str, history: &[String]) -> Result<()> {
    ensure_parent("history", history_path)?;
    let f = File::create(history_path)
        .map_err(|e| Error::io_error("history".to_string(), history_path.to_string(), e))?;

    serde_yaml::to_writer(f, history).map_err(|e| {
        Error::yaml_error(
            "writing".to_string(),
            "history".to_string(),
            history_path.to_string(),
            e,
        )
    })
}

/// Every `{placeholder}` in the command template must be a parameter.
fn validate_templates(command: &CommandDefinition) -> Result<()> {
    let Some(template_args) = &command.command else {
        return Ok(());
    };

    let templates = interpolation::get_templates(template_args)?;
    let declared: HashSet<&str> = command.parameters().map(|p| p.name.as_str()).collect();

    for token in interpolation::get_tokens(&templates) {
        if !declared.contains(token.as_str()) {
            return Err(NotFoundParameter(command.name.clone(), token));
        }
    }

    Ok(())
}

fn validate_command_definitions(commands: &[CommandDefinition]) -> Result<()> {
    let mut names = HashSet::new();

    for cmd in commands {
        if !names.insert(cmd.name.as_str()) {
            return Err(NonUniqueCommandName(cmd.name.clone()));
        }

        validate_templates(cmd)?;
    }

    Ok(())
}

/// Loads and validates command definitions from a configuration file.
///
/// A missing file is not an error: `ql` then only knows its builtin
/// commands. Names and parameters are further checked when the commands
/// are registered.
///
/// # Errors
///
/// Returns an error if:
/// - The configuration file exists but cannot be read
/// - The YAML is malformed or doesn't match the expected structure
/// - The configuration file holds an empty list
/// - Two commands share a name
/// - A command template uses a placeholder that is not a parameter
///
/// # Examples
///
/// ```no_run
/// use quill_cli::file_handling::get_command_definitions;
///
/// let commands = get_command_definitions("~/.quill/commands.yml")?;
/// println!("Loaded {} commands", commands.len());
/// # Ok::<(), quill_cli::error::Error>(())
/// ```
pub fn get_command_definitions(config_path: &str) -> Result<Vec<CommandDefinition>> {
    if !Path::new(config_path).exists() {
        info!("No command definitions at `{config_path}`, using builtins only");
        return Ok(Vec::new());
    }

    let config_reader = get_reader("config", config_path)?;
    let parsed_command_defs: Vec<CommandDefinition> =
        serde_yaml::from_reader(config_reader).map_err(|e| {
            Error::yaml_error(
                "reading".to_string(),
                "config".to_string(),
                config_path.to_string(),
                e,
            )
        })?;

    if parsed_command_defs.is_empty() {
        return Err(Error::empty_command_definition(config_path.to_string()));
    }

    validate_command_definitions(&parsed_command_defs)?;

    Ok(parsed_command_defs)
}
