//! Commands every `ql` session has, whatever the definitions file holds.
//!
//! Builtins find the session they run in through the environment handle of
//! their execution context, see [`SessionState::of`].

use std::fmt::Write;

use itertools::Itertools;
use quill_core::canon::{eval_command_spec, Canon, Command, CommandSpec, DefaultValue, ParamSpec};
use quill_core::output::{Args, ExecError, ExecResult, ExecutionContext, Reply};
use quill_core::value::Value;

use crate::error::Result;
use crate::execution::ShellCommand;
use crate::session::SessionState;

/// Registers `help`, `set`, `history`, `exit` and the `{ ... }` script
/// command.
///
/// # Errors
///
/// Returns an error if a builtin fails to register.
pub fn register(canon: &Canon) -> Result<()> {
    canon.add_command(
        CommandSpec::new("help")
            .description("List commands, or describe one")
            .param(
                ParamSpec::new("search")
                    .type_ref("command")
                    .description("The command to describe")
                    .default_value(DefaultValue::Null),
            )
            .exec(help),
    )?;

    canon.add_command(
        CommandSpec::new("set")
            .description("Change a setting")
            .param(ParamSpec::new("setting").type_ref("setting"))
            .param(ParamSpec::new("value").type_ref("setting_value"))
            .exec(set),
    )?;

    canon.add_command(
        CommandSpec::new("history")
            .description("Show the lines run so far")
            .exec(history),
    )?;

    canon.add_command(
        CommandSpec::new("exit")
            .description("Leave the prompt")
            .exec(|_, context| {
                SessionState::of(context)?.request_exit();
                Ok(Reply::none())
            }),
    )?;

    canon.add_command(eval_command_spec(eval))?;
    Ok(())
}

fn help(args: &Args, context: &ExecutionContext) -> ExecResult {
    let text = match args.get("search").and_then(Value::as_command) {
        Some(command) => {
            let mut text = describe_command(command);
            let subs = list_sub_commands(context.canon(), command.name());
            if !subs.is_empty() {
                text.push_str("\n\nCommands:\n");
                text.push_str(&subs);
            }
            text
        }
        None => list_commands(context.canon()),
    };
    Ok(Reply::from(text))
}

/// One line per visible top-level command, names aligned. Sub-commands
/// are described by `help <group>`.
pub fn list_commands(canon: &Canon) -> String {
    let commands = canon
        .commands()
        .into_iter()
        .filter(|command| !command.is_hidden() && !command.name().contains(' '))
        .sorted_by(|a, b| a.name().cmp(b.name()))
        .collect::<Vec<_>>();
    let width = commands.iter().map(|c| c.name().len()).max().unwrap_or(0);

    commands
        .iter()
        .map(|command| {
            let description = command.description().unwrap_or_default();
            format!("{:width$}  {description}", command.name()).trim_end().to_string()
        })
        .join("\n")
}

/// The visible commands one word below `group`.
fn list_sub_commands(canon: &Canon, group: &str) -> String {
    let prefix = format!("{group} ");
    canon
        .commands()
        .into_iter()
        .filter(|command| !command.is_hidden())
        .filter(|command| {
            command
                .name()
                .strip_prefix(&prefix)
                .is_some_and(|rest| !rest.contains(' '))
        })
        .sorted_by(|a, b| a.name().cmp(b.name()))
        .map(|command| {
            let description = command.description().unwrap_or_default();
            format!("  {}  {description}", command.name()).trim_end().to_string()
        })
        .join("\n")
}

/// Usage, description, manual and parameters of `command`.
pub fn describe_command(command: &Command) -> String {
    let mut text = String::new();
    let usage = command
        .params()
        .iter()
        .filter(|param| !param.is_hidden())
        .map(|param| match (param.is_positional_allowed(), param.is_data_required()) {
            (true, true) => format!("<{}>", param.name()),
            (true, false) => format!("[{}]", param.name()),
            (false, _) => format!("[--{}]", param.name()),
        })
        .join(" ");
    let _ = writeln!(text, "{} {usage}", command.name());

    if let Some(description) = command.description() {
        let _ = writeln!(text, "\n{description}");
    }
    if let Some(manual) = command.manual() {
        let _ = writeln!(text, "\n{manual}");
    }

    let visible = command.params().iter().filter(|param| !param.is_hidden()).collect::<Vec<_>>();
    if !visible.is_empty() {
        let _ = writeln!(text, "\nParameters:");
        for param in visible {
            let type_name = param.param_type().name().to_string();
            let _ = write!(text, "  {} ({type_name})", param.name());
            if let Some(description) = param.description() {
                let _ = write!(text, ": {description}");
            }
            if let Some(default) = param.default_value().value() {
                let _ = write!(text, " [default: {default}]");
            }
            text.push('\n');
        }
    }

    text.trim_end().to_string()
}

fn set(args: &Args, context: &ExecutionContext) -> ExecResult {
    let state = SessionState::of(context)?;
    let name = args
        .get_str("setting")
        .ok_or_else(|| ExecError::new("No setting given"))?;
    let value = args
        .get("value")
        .cloned()
        .ok_or_else(|| ExecError::new(format!("No value given for `{name}`")))?;

    state.host().set(name, value.clone())?;
    Ok(Reply::from(format!("{name} = {value}")))
}

fn history(_args: &Args, context: &ExecutionContext) -> ExecResult {
    let state = SessionState::of(context)?;
    let text = state
        .history_entries()
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{:>4}  {line}", i + 1))
        .join("\n");
    Ok(Reply::from(text))
}

/// Runs the text of a `{ ... }` block through the shell.
fn eval(args: &Args, context: &ExecutionContext) -> ExecResult {
    let state = SessionState::of(context)?;
    let script = args.get_str("script").unwrap_or_default();
    let command = ShellCommand::new(state.host().shell(), script);

    if state.host().dry_run() {
        return Ok(Reply::from(format!("Dry run: {command}")));
    }
    command.run()?;
    Ok(Reply::none())
}
