//! One `ql` session: the canon with builtins and configured commands, the
//! shell host and the requisition the prompt edits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use log::{debug, info};
use quill_core::canon::Canon;
use quill_core::output::{
    Args as CommandArgs, ExecError, ExecResult, ExecutionContext, Handle, Output, OutputData,
    OutputRecord, Reply,
};
use quill_core::requisition::Requisition;
use quill_core::status::Status;
use quill_core::value::Value;

use crate::builtins;
use crate::cli_args::Args;
use crate::config::{self, DEFAULT_HISTORY_SIZE};
use crate::definitions::CommandDefinition;
use crate::error::Result;
use crate::execution::ShellCommand;
use crate::file_handling;
use crate::history::History;
use crate::host::ShellHost;

/// What commands share across a session. Reached from a running command
/// through [`SessionState::of`].
#[derive(Debug)]
pub struct SessionState {
    host: Arc<ShellHost>,
    history: Mutex<History>,
    exit_requested: AtomicBool,
}

impl SessionState {
    pub fn new(host: Arc<ShellHost>, history: History) -> Self {
        Self {
            host,
            history: Mutex::new(history),
            exit_requested: AtomicBool::new(false),
        }
    }

    /// The session a command is running in.
    ///
    /// # Errors
    ///
    /// Fails if the command was run outside a `ql` session.
    pub fn of(context: &ExecutionContext) -> std::result::Result<&SessionState, ExecError> {
        context
            .environment()
            .and_then(|handle| handle.downcast_ref::<SessionState>())
            .ok_or_else(|| ExecError::new("This command only runs inside a ql session"))
    }

    pub fn host(&self) -> &ShellHost {
        &self.host
    }

    pub fn history_entries(&self) -> Vec<String> {
        self.history().entries().to_vec()
    }

    /// See [`History::recall`].
    pub fn recall(&self, back: usize) -> Option<String> {
        self.history().recall(back).map(str::to_string)
    }

    pub fn request_exit(&self) {
        info!("Exit requested");
        self.exit_requested.store(true, Ordering::SeqCst);
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested.load(Ordering::SeqCst)
    }

    /// Adds a successful run to the history, once.
    fn record(&self, recorded: &AtomicBool, record: &OutputRecord) {
        if record.error || recorded.swap(true, Ordering::SeqCst) {
            return;
        }
        let limit = self.host.history_size();
        self.history().push(&record.canonical, limit);
    }

    fn history(&self) -> MutexGuard<'_, History> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct Session {
    state: Arc<SessionState>,
    requisition: Requisition,
}

impl Session {
    /// Registers the builtins and `definitions` on a new canon.
    ///
    /// # Errors
    ///
    /// Returns an error if a definition does not register.
    pub fn new(
        host: ShellHost,
        history: History,
        definitions: Vec<CommandDefinition>,
    ) -> Result<Self> {
        let host = Arc::new(host);
        let canon = Canon::new();
        canon.set_host(host.clone());
        builtins::register(&canon)?;
        for definition in definitions {
            register_definition(&canon, definition)?;
        }

        let state = Arc::new(SessionState::new(host, history));
        let environment: Handle = state.clone();
        let requisition = Requisition::new(Arc::new(canon)).with_environment(Some(environment));
        Ok(Self { state, requisition })
    }

    /// A session configured from the command line.
    ///
    /// # Errors
    ///
    /// Returns an error if the definitions file is invalid or the working
    /// directory cannot be read.
    pub fn from_args(args: &Args) -> Result<Self> {
        let config_path = config::get_config_path(args.config_path.as_deref());
        debug!("Config path: `{config_path}`");
        let definitions = file_handling::get_command_definitions(&config_path)?;

        let history_path = config::get_history_path(args.history_path.as_deref());
        debug!("History path: `{history_path}`");
        let history = History::load(&history_path, !args.skip_history_save);

        let root = std::env::current_dir()?;
        let mut host = ShellHost::new(
            root,
            &config::default_shell(),
            args.dry_run,
            DEFAULT_HISTORY_SIZE,
        );
        if !definitions.is_empty() {
            host = host.with_definition_files(vec![config_path]);
        }

        Self::new(host, history, definitions)
    }

    pub fn requisition(&self) -> &Requisition {
        &self.requisition
    }

    pub fn requisition_mut(&mut self) -> &mut Requisition {
        &mut self.requisition
    }

    pub fn state(&self) -> &Arc<SessionState> {
        &self.state
    }

    pub fn should_exit(&self) -> bool {
        self.state.exit_requested()
    }

    /// Runs the line, or `line` if given, recording it in the history once
    /// it succeeds.
    pub fn execute(&mut self, line: Option<&str>) -> Output {
        let output = self.requisition.exec(line);

        let recorded = Arc::new(AtomicBool::new(false));
        let on_close = {
            let state = self.state.clone();
            let recorded = recorded.clone();
            move |record: &OutputRecord| state.record(&recorded, record)
        };
        output.on_close().subscribe(on_close);
        if output.is_completed() {
            self.state.record(&recorded, &output.record());
        }
        output
    }

    /// The status of `line`, and why it is not valid.
    pub fn check(&mut self, line: &str) -> (Status, Option<String>) {
        self.requisition.update(line);
        (self.requisition.status(), self.requisition.status_message())
    }
}

/// Registers one configured command, running its template through the
/// shell.
///
/// # Errors
///
/// Returns an error if the definition's parameters are invalid.
pub fn register_definition(canon: &Canon, definition: CommandDefinition) -> Result<()> {
    let spec = definition.to_command_spec(canon)?;
    if definition.is_group() {
        canon.add_command(spec)?;
        return Ok(());
    }

    let definition = Arc::new(definition);
    canon.add_command(spec.exec(move |args, context| run_definition(&definition, args, context)))?;
    Ok(())
}

fn run_definition(
    definition: &CommandDefinition,
    args: &CommandArgs,
    context: &ExecutionContext,
) -> ExecResult {
    let state = SessionState::of(context)?;
    let command = ShellCommand::from_definition(definition, args, &state.host().shell())?;

    if state.host().dry_run() {
        return Ok(Reply::from(command.describe()));
    }
    if !definition.background {
        command.run()?;
        return Ok(Reply::none());
    }

    let (promise, resolver) = context.create_promise();
    thread::spawn(move || match command.capture() {
        Ok(output) => resolver.resolve(Some(Value::from(output))),
        Err(e) => resolver.reject(e.into()),
    });
    Ok(Reply::from(promise))
}

/// The text to show for a finished run, if any.
pub fn describe_output(record: &OutputRecord) -> Option<String> {
    match &record.data {
        Some(OutputData::Value(value)) => {
            let text = value.to_string();
            let text = text.trim_end();
            (!text.is_empty()).then(|| text.to_string())
        }
        Some(OutputData::Error(e)) => Some(format!("Error: {}", e.message())),
        None => None,
    }
}
