//! Running commands: what they receive, what they return, and the record of
//! each execution.
//!
//! A command function gets its [`Args`] and an [`ExecutionContext`] and
//! returns an [`ExecResult`]. The reply is either a value, or a [`Promise`]
//! that some other thread settles later through its [`Resolver`]. Either
//! way the requisition hands back an [`Output`] at once, which completes when
//! the result is known.

use std::any::Any;
use std::cell::RefCell;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use indexmap::IndexMap;
use log::{debug, error, info, warn};
use thiserror::Error;

use crate::canon::Canon;
use crate::events::Event;
use crate::requisition::Requisition;
use crate::value::Value;

/// Argument values by parameter name, in declaration order. Parameters
/// without a value (and without a default) map to `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    values: IndexMap<String, Option<Value>>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Option<Value>) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name).and_then(Option::as_ref)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    /// `false` unless the parameter is a boolean set to `true`.
    pub fn get_bool(&self, name: &str) -> bool {
        self.get(name).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn get_array(&self, name: &str) -> Option<&[Value]> {
        self.get(name).and_then(Value::as_array)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Value>)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A command failed.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ExecError {
    message: String,
}

impl ExecError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for ExecError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ExecError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// How a promise ended.
pub type Settlement = std::result::Result<Option<Value>, ExecError>;

type Callback = Box<dyn FnOnce(&Settlement) + Send>;

enum PromiseState {
    Pending(Vec<Callback>),
    Settled(Settlement),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A result that arrives later.
#[derive(Clone)]
pub struct Promise {
    state: Arc<Mutex<PromiseState>>,
}

impl Promise {
    /// A pending promise and the handle that settles it.
    pub fn new() -> (Promise, Resolver) {
        let state = Arc::new(Mutex::new(PromiseState::Pending(Vec::new())));
        (
            Promise { state: state.clone() },
            Resolver { state, settled: false },
        )
    }

    /// Calls `callback` once the promise settles, straight away if it
    /// already has. Callbacks run on the settling thread in the order they
    /// were added.
    pub fn then<F>(&self, callback: F)
    where
        F: FnOnce(&Settlement) + Send + 'static,
    {
        let settlement = {
            let mut state = lock(&self.state);
            match &mut *state {
                PromiseState::Pending(callbacks) => {
                    callbacks.push(Box::new(callback));
                    return;
                }
                PromiseState::Settled(settlement) => settlement.clone(),
            }
        };
        callback(&settlement);
    }

    pub fn is_settled(&self) -> bool {
        matches!(*lock(&self.state), PromiseState::Settled(_))
    }

    pub fn settlement(&self) -> Option<Settlement> {
        match &*lock(&self.state) {
            PromiseState::Settled(settlement) => Some(settlement.clone()),
            PromiseState::Pending(_) => None,
        }
    }
}

impl Debug for Promise {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Promise").field("settled", &self.is_settled()).finish()
    }
}

/// Settles a [`Promise`]. Dropping it unsettled rejects the promise.
pub struct Resolver {
    state: Arc<Mutex<PromiseState>>,
    settled: bool,
}

impl Resolver {
    pub fn resolve(mut self, value: Option<Value>) {
        self.settle(Ok(value));
    }

    pub fn reject(mut self, error: ExecError) {
        self.settle(Err(error));
    }

    fn settle(&mut self, settlement: Settlement) {
        self.settled = true;
        let callbacks = {
            let mut state = lock(&self.state);
            match std::mem::replace(&mut *state, PromiseState::Settled(settlement.clone())) {
                PromiseState::Pending(callbacks) => callbacks,
                PromiseState::Settled(previous) => {
                    *state = PromiseState::Settled(previous);
                    Vec::new()
                }
            }
        };
        for callback in callbacks {
            callback(&settlement);
        }
    }
}

impl Drop for Resolver {
    fn drop(&mut self) {
        if !self.settled {
            warn!("Promise abandoned without being settled");
            self.settle(Err(ExecError::new("The command never finished")));
        }
    }
}

impl Debug for Resolver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver").field("settled", &self.settled).finish()
    }
}

/// What a command function hands back.
#[derive(Debug, Clone)]
pub enum Reply {
    Value(Option<Value>),
    Pending(Promise),
}

impl Reply {
    /// Finished, with nothing to show.
    pub fn none() -> Self {
        Reply::Value(None)
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Reply::Value(Some(value))
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Reply::Value(Some(Value::String(text)))
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Reply::from(text.to_string())
    }
}

impl From<Promise> for Reply {
    fn from(promise: Promise) -> Self {
        Reply::Pending(promise)
    }
}

pub type ExecResult = std::result::Result<Reply, ExecError>;

/// The eventual result of an execution.
#[derive(Debug, Clone)]
pub enum OutputData {
    Value(Value),
    Error(ExecError),
}

/// A snapshot of an [`Output`].
#[derive(Debug, Clone)]
pub struct OutputRecord {
    /// The name of the command run, if one was resolved.
    pub command: Option<String>,
    pub args: Args,
    /// The line as the user typed it.
    pub typed: String,
    /// The line as [`Requisition::to_canonical_string`] renders it.
    pub canonical: String,
    pub completed: bool,
    pub error: bool,
    pub data: Option<OutputData>,
    pub duration: Option<Duration>,
}

struct OutputInner {
    record: Mutex<OutputRecord>,
    /// Nothing is ever sent. The sender is dropped once the close listeners
    /// have run, which wakes every waiter on `closed`.
    closer: Mutex<Option<Sender<()>>>,
    closed: Receiver<()>,
    started: Instant,
    on_change: Event<OutputRecord>,
    on_close: Event<OutputRecord>,
}

/// The record of one execution, shared between the requisition that
/// started it and whoever settles it.
#[derive(Clone)]
pub struct Output {
    inner: Arc<OutputInner>,
}

impl Output {
    pub(crate) fn new(
        command: Option<String>,
        args: Args,
        typed: String,
        canonical: String,
    ) -> Self {
        let (closer, closed) = bounded(1);
        Self {
            inner: Arc::new(OutputInner {
                record: Mutex::new(OutputRecord {
                    command,
                    args,
                    typed,
                    canonical,
                    completed: false,
                    error: false,
                    data: None,
                    duration: None,
                }),
                closer: Mutex::new(Some(closer)),
                closed,
                started: Instant::now(),
                on_change: Event::new(),
                on_close: Event::new(),
            }),
        }
    }

    pub fn record(&self) -> OutputRecord {
        lock(&self.inner.record).clone()
    }

    pub fn is_completed(&self) -> bool {
        lock(&self.inner.record).completed
    }

    pub fn is_error(&self) -> bool {
        lock(&self.inner.record).error
    }

    pub fn data(&self) -> Option<OutputData> {
        lock(&self.inner.record).data.clone()
    }

    /// Blocks until the output completes and its listeners have run.
    pub fn wait(&self) -> OutputRecord {
        let _ = self.inner.closed.recv();
        self.record()
    }

    /// Like [`Output::wait`], giving up after `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<OutputRecord> {
        match self.inner.closed.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => None,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => Some(self.record()),
        }
    }

    /// Fired when the output completes, before [`Output::on_close`].
    pub fn on_change(&self) -> &Event<OutputRecord> {
        &self.inner.on_change
    }

    pub fn on_close(&self) -> &Event<OutputRecord> {
        &self.inner.on_close
    }

    pub(crate) fn complete(&self, settlement: Settlement) {
        let record = {
            let mut record = lock(&self.inner.record);
            if record.completed {
                debug!("Ignoring second completion of {:?}", record.typed);
                return;
            }
            record.completed = true;
            record.duration = Some(self.inner.started.elapsed());
            match settlement {
                Ok(value) => {
                    info!("`{}` completed", record.typed);
                    record.data = value.map(OutputData::Value);
                }
                Err(e) => {
                    error!("`{}` failed: {e}", record.typed);
                    record.error = true;
                    record.data = Some(OutputData::Error(e));
                }
            }
            record.clone()
        };

        self.inner.on_change.emit(&record);
        self.inner.on_close.emit(&record);
        lock(&self.inner.closer).take();
    }

    /// Completes this output when `promise` settles.
    pub(crate) fn complete_with(&self, promise: &Promise) {
        let output = self.clone();
        promise.then(move |settlement| output.complete(settlement.clone()));
    }
}

impl Debug for Output {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Output").field(&self.record()).finish()
    }
}

/// Opaque handle passed through to commands untouched.
pub type Handle = Arc<dyn Any + Send + Sync>;

/// What a running command can reach besides its arguments.
pub struct ExecutionContext {
    canon: Arc<Canon>,
    environment: Option<Handle>,
    document: Option<Handle>,
    typed: String,
    pending_update: RefCell<Option<String>>,
}

impl ExecutionContext {
    pub(crate) fn new(
        canon: Arc<Canon>,
        environment: Option<Handle>,
        document: Option<Handle>,
        typed: String,
    ) -> Self {
        Self {
            canon,
            environment,
            document,
            typed,
            pending_update: RefCell::new(None),
        }
    }

    pub fn canon(&self) -> &Arc<Canon> {
        &self.canon
    }

    pub fn environment(&self) -> Option<&Handle> {
        self.environment.as_ref()
    }

    pub fn document(&self) -> Option<&Handle> {
        self.document.as_ref()
    }

    /// The line that is being executed.
    pub fn typed(&self) -> &str {
        &self.typed
    }

    /// Runs another line, in a requisition of its own.
    pub fn exec(&self, input: &str) -> Output {
        let mut child = Requisition::new(self.canon.clone())
            .with_environment(self.environment.clone())
            .with_document(self.document.clone());
        child.exec(Some(input))
    }

    /// Replaces the input line once the command returns.
    pub fn update(&self, text: impl Into<String>) {
        *self.pending_update.borrow_mut() = Some(text.into());
    }

    pub fn create_promise(&self) -> (Promise, Resolver) {
        Promise::new()
    }

    pub(crate) fn take_update(&self) -> Option<String> {
        self.pending_update.borrow_mut().take()
    }
}

impl Debug for ExecutionContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("typed", &self.typed)
            .field("pending_update", &self.pending_update)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn test_promise_callbacks_in_order() {
        let (promise, resolver) = Promise::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let seen = seen.clone();
            promise.then(move |settlement| {
                assert!(settlement.is_ok());
                seen.lock().unwrap().push(i);
            });
        }
        assert!(!promise.is_settled());
        resolver.resolve(Some(Value::from(1i64)));

        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
        assert!(promise.is_settled());
    }

    #[test]
    fn test_then_after_settle_runs_immediately() {
        let (promise, resolver) = Promise::new();
        resolver.reject(ExecError::new("nope"));

        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        promise.then(move |settlement| *sink.lock().unwrap() = Some(settlement.clone()));
        assert_eq!(*seen.lock().unwrap(), Some(Err(ExecError::new("nope"))));
    }

    #[test]
    fn test_dropped_resolver_rejects() {
        let (promise, resolver) = Promise::new();
        drop(resolver);
        assert!(matches!(promise.settlement(), Some(Err(_))));
    }

    #[test]
    fn test_output_completes_from_another_thread() {
        let output = Output::new(
            Some("sleep".to_string()),
            Args::new(),
            "sleep".to_string(),
            "sleep".to_string(),
        );
        let (promise, resolver) = Promise::new();
        output.complete_with(&promise);

        let closed = Arc::new(Mutex::new(false));
        let flag = closed.clone();
        output.on_close().subscribe(move |_| *flag.lock().unwrap() = true);

        let handle = thread::spawn(move || resolver.resolve(Some(Value::from("done"))));
        let record = output.wait();
        handle.join().unwrap();

        assert!(record.completed);
        assert!(!record.error);
        assert!(
            matches!(record.data, Some(OutputData::Value(Value::String(ref s))) if s == "done")
        );
        assert!(record.duration.is_some());
        assert!(*closed.lock().unwrap());
    }

    #[test]
    fn test_every_waiter_wakes() {
        let output = Output::new(None, Args::new(), "later".to_string(), "later".to_string());
        assert!(output.wait_timeout(Duration::from_millis(10)).is_none());

        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let output = output.clone();
                thread::spawn(move || output.wait_timeout(Duration::from_secs(10)))
            })
            .collect();
        output.complete(Ok(None));

        for waiter in waiters {
            assert!(waiter.join().unwrap().is_some_and(|record| record.completed));
        }
        assert!(output.wait().completed);
    }

    #[test]
    fn test_second_completion_ignored() {
        let output = Output::new(None, Args::new(), String::new(), String::new());
        output.complete(Err(ExecError::new("first")));
        output.complete(Ok(None));
        assert!(output.is_error());
    }

    #[test]
    fn test_args_accessors() {
        let mut args = Args::new();
        args.insert("name", Some("fred".into()));
        args.insert("flag", Some(true.into()));
        args.insert("missing", None);

        assert_eq!(args.get_str("name"), Some("fred"));
        assert!(args.get_bool("flag"));
        assert!(!args.get_bool("missing"));
        assert!(args.contains("missing"));
        assert_eq!(args.get("missing"), None);
        assert_eq!(args.len(), 3);
    }
}
