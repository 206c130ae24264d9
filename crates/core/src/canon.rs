//! The registry of commands and types.
//!
//! A [`Canon`] is created once by the embedding application, filled with
//! [`CommandSpec`]s, and shared with every
//! [`Requisition`](crate::requisition::Requisition) through an `Arc`.
//! Registration validates each command:
//!
//! - the command has a name
//! - parameter names are non-empty, free of spaces and unique
//! - positional parameters come before named-only (grouped) ones
//! - every parameter type resolves through the type registry
//! - booleans default to `false`, and nothing else
//! - named-only parameters that are not boolean or array have a default
//! - every default survives `stringify` then `parse`

use std::collections::{BTreeMap, HashSet};
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, PoisonError, RwLock};

use log::{debug, info, warn};

use crate::error::{Error, Result};
use crate::events::Event;
use crate::host::{EmptyHost, Host};
use crate::output::{Args, ExecResult, ExecutionContext};
use crate::status::Status;
use crate::types::{ParseContext, Type, TypeClass, TypeEntry, TypeRef, TypeRegistry, TypeSpec};
use crate::value::Value;

/// The name the `{ ... }` script command is registered under.
pub const EVAL_COMMAND_NAME: &str = "{";

/// The function run when a command executes.
pub type ExecFn = Arc<dyn Fn(&Args, &ExecutionContext) -> ExecResult + Send + Sync>;

/// What a parameter falls back to when nothing was typed for it.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DefaultValue {
    /// No default: the parameter is required.
    #[default]
    Undefined,
    /// Optional, with no value.
    Null,
    Value(Value),
}

impl DefaultValue {
    pub fn value(&self) -> Option<&Value> {
        match self {
            DefaultValue::Value(value) => Some(value),
            _ => None,
        }
    }
}

impl From<Value> for DefaultValue {
    fn from(value: Value) -> Self {
        DefaultValue::Value(value)
    }
}

/// Declares one parameter of a command.
#[derive(Debug, Clone, Default)]
pub struct ParamSpec {
    pub name: String,
    pub type_ref: TypeRef,
    pub description: Option<String>,
    pub manual: Option<String>,
    pub default_value: DefaultValue,
    pub hidden: bool,
    pub short: Option<char>,
    /// Only settable as `--name value`. Parameters in a group always are.
    pub named_only: bool,
}

impl ParamSpec {
    /// A required string parameter.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn type_ref(mut self, type_ref: impl Into<TypeRef>) -> Self {
        self.type_ref = type_ref.into();
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn manual(mut self, manual: impl Into<String>) -> Self {
        self.manual = Some(manual.into());
        self
    }

    #[must_use]
    pub fn default_value(mut self, default_value: DefaultValue) -> Self {
        self.default_value = default_value;
        self
    }

    #[must_use]
    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    #[must_use]
    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    #[must_use]
    pub fn named_only(mut self, named_only: bool) -> Self {
        self.named_only = named_only;
        self
    }
}

/// An entry in a command's parameter list.
#[derive(Debug, Clone)]
pub enum ParamEntry {
    Param(ParamSpec),
    Group { name: String, params: Vec<ParamSpec> },
}

/// Declares a command. See [`Canon::add_command`].
#[derive(Clone, Default)]
pub struct CommandSpec {
    pub name: String,
    pub description: Option<String>,
    pub manual: Option<String>,
    pub hidden: bool,
    pub return_type: Option<String>,
    pub params: Vec<ParamEntry>,
    pub exec: Option<ExecFn>,
}

impl CommandSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn manual(mut self, manual: impl Into<String>) -> Self {
        self.manual = Some(manual.into());
        self
    }

    #[must_use]
    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    #[must_use]
    pub fn return_type(mut self, return_type: impl Into<String>) -> Self {
        self.return_type = Some(return_type.into());
        self
    }

    #[must_use]
    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(ParamEntry::Param(param));
        self
    }

    #[must_use]
    pub fn group(mut self, name: impl Into<String>, params: Vec<ParamSpec>) -> Self {
        self.params.push(ParamEntry::Group {
            name: name.into(),
            params,
        });
        self
    }

    /// Makes the command executable. Commands without a function are groups,
    /// parents of multi-word commands.
    #[must_use]
    pub fn exec<F>(mut self, exec: F) -> Self
    where
        F: Fn(&Args, &ExecutionContext) -> ExecResult + Send + Sync + 'static,
    {
        self.exec = Some(Arc::new(exec));
        self
    }
}

impl Debug for CommandSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSpec")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("executable", &self.exec.is_some())
            .finish()
    }
}

/// The hidden command that runs `{ ... }` blocks. Its single
/// parameter, `script`, holds the text between the braces.
pub fn eval_command_spec<F>(exec: F) -> CommandSpec
where
    F: Fn(&Args, &ExecutionContext) -> ExecResult + Send + Sync + 'static,
{
    CommandSpec::new(EVAL_COMMAND_NAME)
        .description("Run a script")
        .hidden(true)
        .param(ParamSpec::new("script").type_ref("script"))
        .exec(exec)
}

/// A registered parameter.
#[derive(Debug, Clone)]
pub struct Parameter {
    name: String,
    param_type: Arc<dyn Type>,
    description: Option<String>,
    manual: Option<String>,
    default_value: DefaultValue,
    short: Option<char>,
    group: Option<String>,
    named_only: bool,
    hidden: bool,
}

impl Parameter {
    /// A parameter that is not part of any command, used for the command
    /// name itself and for arguments that could not be assigned.
    pub(crate) fn synthetic(name: &str, param_type: Arc<dyn Type>) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            description: None,
            manual: None,
            default_value: DefaultValue::Undefined,
            short: None,
            group: None,
            named_only: false,
            hidden: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn param_type(&self) -> &Arc<dyn Type> {
        &self.param_type
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn manual(&self) -> Option<&str> {
        self.manual.as_deref()
    }

    pub fn default_value(&self) -> &DefaultValue {
        &self.default_value
    }

    pub fn short(&self) -> Option<char> {
        self.short
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// True if the parameter may be given without its `--name`.
    pub fn is_positional_allowed(&self) -> bool {
        !self.named_only
    }

    /// True if there is no default, so the user has to supply a value.
    pub fn is_data_required(&self) -> bool {
        matches!(self.default_value, DefaultValue::Undefined)
    }

    /// True if `text` is `--name` or `-short`.
    pub fn is_known_as(&self, text: &str) -> bool {
        if let Some(long) = text.strip_prefix("--") {
            return long == self.name;
        }
        match (text.strip_prefix('-'), self.short) {
            (Some(short), Some(expected)) => short.chars().eq(std::iter::once(expected)),
            _ => false,
        }
    }
}

/// A registered command.
pub struct Command {
    name: String,
    description: Option<String>,
    manual: Option<String>,
    hidden: bool,
    return_type: Option<String>,
    params: Vec<Parameter>,
    exec: Option<ExecFn>,
}

impl Command {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn manual(&self) -> Option<&str> {
        self.manual.as_deref()
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn return_type(&self) -> Option<&str> {
        self.return_type.as_deref()
    }

    /// Parameters in declaration order, with groups flattened.
    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|param| param.name == name)
    }

    pub fn is_executable(&self) -> bool {
        self.exec.is_some()
    }

    pub fn exec_fn(&self) -> Option<&ExecFn> {
        self.exec.as_ref()
    }
}

impl Debug for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("hidden", &self.hidden)
            .field("params", &self.params)
            .field("executable", &self.exec.is_some())
            .finish()
    }
}

/// Notification sent when the set of commands changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanonChange {
    Added(String),
    Replaced(String),
    Removed(String),
}

/// Commands and types, plus the host that answers host-backed types.
pub struct Canon {
    commands: RwLock<BTreeMap<String, Arc<Command>>>,
    types: TypeRegistry,
    host: RwLock<Arc<dyn Host>>,
    on_change: Event<CanonChange>,
}

impl Canon {
    /// A canon with the built-in types, no commands and an empty host.
    pub fn new() -> Self {
        Self {
            commands: RwLock::new(BTreeMap::new()),
            types: TypeRegistry::new(),
            host: RwLock::new(Arc::new(EmptyHost)),
            on_change: Event::new(),
        }
    }

    /// Validates and registers a command, replacing any command of the same
    /// name.
    ///
    /// # Arguments
    ///
    /// * `spec` - The command to register
    ///
    /// # Errors
    ///
    /// Any of the configuration errors in [`Error`] describing why the command spec
    /// is unusable. Nothing is registered in that case.
    ///
    /// # Examples
    ///
    /// ```
    /// use quill_core::canon::{Canon, CommandSpec, ParamSpec};
    /// use quill_core::output::Reply;
    ///
    /// let canon = Canon::new();
    /// let command = canon
    ///     .add_command(
    ///         CommandSpec::new("greet")
    ///             .param(ParamSpec::new("name"))
    ///             .exec(|args, _| {
    ///                 let name = args.get_str("name").unwrap_or_default();
    ///                 Ok(Reply::from(format!("Hello {name}")))
    ///             }),
    ///     )
    ///     .unwrap();
    /// assert_eq!(command.params().len(), 1);
    /// ```
    pub fn add_command(&self, spec: CommandSpec) -> Result<Arc<Command>> {
        if spec.name.trim().is_empty() {
            return Err(Error::MissingCommandName);
        }

        let params = self.build_params(&spec)?;
        let command = Arc::new(Command {
            name: spec.name,
            description: spec.description,
            manual: spec.manual,
            hidden: spec.hidden,
            return_type: spec.return_type,
            params,
            exec: spec.exec,
        });

        let name = command.name.clone();
        let replaced = self.write_commands().insert(name.clone(), command.clone());

        if replaced.is_some() {
            warn!("Replacing existing command `{name}`");
            self.on_change.emit(&CanonChange::Replaced(name));
        } else {
            info!("Registered command `{name}`");
            self.on_change.emit(&CanonChange::Added(name));
        }
        Ok(command)
    }

    fn build_params(&self, spec: &CommandSpec) -> Result<Vec<Parameter>> {
        let ctx = ParseContext::new(self);
        let mut names = HashSet::new();
        let mut seen_named_only = false;
        let mut params = Vec::new();

        let flattened = spec.params.iter().flat_map(|entry| match entry {
            ParamEntry::Param(param) => vec![(param, None)],
            ParamEntry::Group { name, params } => params
                .iter()
                .map(|param| (param, Some(name.clone())))
                .collect(),
        });

        for (param, group) in flattened {
            let command = spec.name.clone();
            let named_only = param.named_only || group.is_some();

            if param.name.is_empty() {
                return Err(Error::EmptyParameterName(command));
            }
            if param.name.contains(char::is_whitespace) {
                return Err(Error::ParameterNameWithSpace {
                    command,
                    param: param.name.clone(),
                });
            }
            if !names.insert(param.name.as_str()) {
                return Err(Error::DuplicateParameterName {
                    command,
                    param: param.name.clone(),
                });
            }
            if named_only {
                seen_named_only = true;
            } else if seen_named_only {
                return Err(Error::PositionalAfterNamed {
                    command,
                    param: param.name.clone(),
                });
            }

            let param_type = self.types.resolve(&param.type_ref)?;
            let default_value = match param_type.class() {
                TypeClass::Boolean => match &param.default_value {
                    DefaultValue::Undefined | DefaultValue::Value(Value::Bool(false)) => {
                        DefaultValue::Value(Value::Bool(false))
                    }
                    _ => {
                        return Err(Error::InvalidBooleanDefault {
                            command,
                            param: param.name.clone(),
                        })
                    }
                },
                TypeClass::Array => param.default_value.clone(),
                _ if named_only && param.default_value == DefaultValue::Undefined => {
                    return Err(Error::MissingNamedDefault {
                        command,
                        param: param.name.clone(),
                    });
                }
                _ => param.default_value.clone(),
            };

            if let Some(default) = default_value.value() {
                check_round_trip(&command, &param.name, param_type.as_ref(), default, &ctx)?;
            }

            params.push(Parameter {
                name: param.name.clone(),
                param_type,
                description: param.description.clone(),
                manual: param.manual.clone(),
                default_value,
                short: param.short,
                group,
                named_only,
                hidden: param.hidden,
            });
        }

        Ok(params)
    }

    /// Returns `false` if no command is called `name`.
    pub fn remove_command(&self, name: &str) -> bool {
        let removed = self.write_commands().remove(name).is_some();
        if removed {
            info!("Removed command `{name}`");
            self.on_change.emit(&CanonChange::Removed(name.to_string()));
        }
        removed
    }

    pub fn command(&self, name: &str) -> Option<Arc<Command>> {
        self.read_commands().get(name).cloned()
    }

    /// All commands, sorted by name.
    pub fn commands(&self) -> Vec<Arc<Command>> {
        self.read_commands().values().cloned().collect()
    }

    pub fn command_names(&self) -> Vec<String> {
        self.read_commands().keys().cloned().collect()
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn register_type(&self, entry: TypeEntry) -> Result<()> {
        self.types.register_type(entry)
    }

    pub fn unregister_type(&self, name: &str) -> bool {
        self.types.unregister_type(name)
    }

    pub fn get_type(&self, spec: &TypeSpec) -> Result<Arc<dyn Type>> {
        self.types.get_type(spec)
    }

    pub fn set_host(&self, host: Arc<dyn Host>) {
        debug!("Installing host {host:?}");
        *self.host.write().unwrap_or_else(PoisonError::into_inner) = host;
    }

    pub fn host(&self) -> Arc<dyn Host> {
        self.host.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Fired after every add, replace and remove.
    pub fn on_change(&self) -> &Event<CanonChange> {
        &self.on_change
    }

    fn read_commands(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, Arc<Command>>> {
        self.commands.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_commands(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, Arc<Command>>> {
        self.commands.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Canon {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Canon {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canon")
            .field("commands", &self.command_names())
            .field("types", &self.types.names())
            .finish()
    }
}

fn check_round_trip(
    command: &str,
    param: &str,
    param_type: &dyn Type,
    default: &Value,
    ctx: &ParseContext,
) -> Result<()> {
    let text = param_type.stringify(Some(default), ctx);
    let conversion = param_type.parse_str(&text, ctx);

    let message = if conversion.status() != Status::Valid {
        Some(
            conversion
                .message()
                .map_or_else(|| conversion.status().to_string(), str::to_string),
        )
    } else if conversion.value().is_some_and(|value| value != default) {
        let parsed = conversion
            .value()
            .map(ToString::to_string)
            .unwrap_or_default();
        Some(format!("parsed back as `{parsed}`"))
    } else {
        None
    };

    match message {
        Some(message) => Err(Error::InvalidDefault {
            command: command.to_string(),
            param: param.to_string(),
            text,
            message,
        }),
        None => Ok(()),
    }
}
