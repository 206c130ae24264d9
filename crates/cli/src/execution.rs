use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::process::{Command, ExitStatus, Stdio};

use itertools::Itertools;
use log::info;
use quill_core::output::Args;

use crate::config::expand_working_directory;
use crate::definitions::CommandDefinition;
use crate::error::{Error, Result};
use crate::interpolation::{build_context, get_templates, interpolate_command};

/// A rendered command line and where to run it.
#[derive(Debug, Clone, PartialEq)]
pub struct ShellCommand {
    pub shell: String,
    pub line: String,
    pub working_directory: Option<String>,
    pub environment: Option<HashMap<String, String>>,
}

impl ShellCommand {
    pub fn new(shell: impl Into<String>, line: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            line: line.into(),
            working_directory: None,
            environment: None,
        }
    }

    /// Renders the definition's template with `args`.
    ///
    /// # Errors
    ///
    /// Returns an error if the definition has no template (it is a group),
    /// or a placeholder cannot be rendered.
    pub fn from_definition(
        definition: &CommandDefinition,
        args: &Args,
        shell: &str,
    ) -> Result<Self> {
        let Some(template_args) = &definition.command else {
            return Err(Error::NotRunnable(
                definition.name.clone(),
                "it is a group of commands".to_string(),
            ));
        };

        let templates = get_templates(template_args)?;
        let line = interpolate_command(&build_context(args), &templates)?.join(" ");

        Ok(Self {
            shell: shell.to_string(),
            line,
            working_directory: expand_working_directory(definition.working_directory.as_deref()),
            environment: definition.environment.clone(),
        })
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.shell);
        command.args(["-c", self.line.as_str()]);

        if let Some(working_directory) = &self.working_directory {
            command.current_dir(working_directory);
        }
        if let Some(environment) = &self.environment {
            info!("Executing with environment variables: {environment:?}");
            command.envs(environment);
        }
        command
    }

    /// Runs attached to the terminal.
    ///
    /// # Errors
    ///
    /// Returns an error if the shell cannot start or exits with non-zero
    /// status.
    pub fn run(&self) -> Result<()> {
        info!("Running `{}` with `{}`", self.line, self.shell);
        let status = self
            .command()
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .and_then(|mut child| child.wait())
            .map_err(|original| Error::SubProcess {
                shell: self.shell.clone(),
                original,
            })?;

        check_status(status)
    }

    /// Runs detached from the terminal and returns what it printed.
    ///
    /// # Errors
    ///
    /// As [`ShellCommand::run`].
    pub fn capture(&self) -> Result<String> {
        info!("Running `{}` in the background with `{}`", self.line, self.shell);
        let output = self
            .command()
            .stdin(Stdio::null())
            .output()
            .map_err(|original| Error::SubProcess {
                shell: self.shell.clone(),
                original,
            })?;

        check_status(output.status)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// What would run, for a dry run.
    pub fn describe(&self) -> String {
        let mut text = format!("Dry run: {}", self.line);

        if let Some(environment) = self.environment.as_ref() {
            text.push_str("\nWith environment:");
            for (key, value) in environment.iter().sorted() {
                text.push_str(&format!("\n\t\"{key}\": \"{value}\""));
            }
        }
        text
    }
}

impl Display for ShellCommand {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(&self.line)
    }
}

fn check_status(status: ExitStatus) -> Result<()> {
    if status.success() {
        return Ok(());
    }
    match status.code() {
        Some(code) => Err(Error::SubProcessExit(code)),
        None => Err(Error::SubProcessKilled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::value::Value;

    fn definition(yaml: &str) -> CommandDefinition {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_from_definition_renders_line() {
        let def = definition(
            r#"
name: greet
command: ["echo", "Hello", "{name}"]
working_directory: "/tmp"
environment:
  GREETING: "1"
params:
  - name: name
"#,
        );
        let mut args = Args::new();
        args.insert("name", Some(Value::from("fred")));

        let command = ShellCommand::from_definition(&def, &args, "/bin/sh").unwrap();
        assert_eq!(command.line, "echo Hello fred");
        assert_eq!(command.shell, "/bin/sh");
        assert_eq!(command.working_directory, Some("/tmp".to_string()));
        assert_eq!(
            command.environment.unwrap().get("GREETING"),
            Some(&"1".to_string())
        );
    }

    #[test]
    fn test_describe_sorts_environment() {
        let mut command = ShellCommand::new("/bin/sh", "make");
        assert_eq!(command.describe(), "Dry run: make");

        command.environment = Some(HashMap::from([
            ("B".to_string(), "2".to_string()),
            ("A".to_string(), "1".to_string()),
        ]));
        assert_eq!(
            command.describe(),
            "Dry run: make\nWith environment:\n\t\"A\": \"1\"\n\t\"B\": \"2\""
        );
    }

    #[test]
    fn test_group_is_not_runnable() {
        let def = definition("name: git\n");
        let result = ShellCommand::from_definition(&def, &Args::new(), "/bin/sh");
        assert!(matches!(result, Err(Error::NotRunnable(_, _))));
    }

    #[test]
    fn test_capture_output() {
        let mut command = ShellCommand::new("/bin/sh", "echo \"$QUILL_TEST\"");
        command.environment = Some(HashMap::from([("QUILL_TEST".to_string(), "hi".to_string())]));
        assert_eq!(command.capture().unwrap(), "hi\n");
    }

    #[test]
    fn test_exit_code_is_reported() {
        let command = ShellCommand::new("/bin/sh", "exit 3");
        assert!(matches!(command.capture(), Err(Error::SubProcessExit(3))));
    }
}
