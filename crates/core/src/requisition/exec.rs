//! Running the line, and rendering it canonically.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use log::{error, info};

use super::{quote, Requisition};
use crate::canon::EVAL_COMMAND_NAME;
use crate::output::{Args, ExecError, ExecutionContext, Output, Reply};
use crate::status::Status;
use crate::types::TypeClass;
use crate::value::Value;

impl Requisition {
    /// Runs the line, after replacing it with `input` if given.
    ///
    /// The returned [`Output`] is already complete unless the command
    /// replied with a promise. A line that is not valid, or that names a
    /// command group, completes as an error carrying the status message.
    /// After a command runs the line is cleared, then replaced by any text
    /// the command asked for through [`ExecutionContext::update`].
    pub fn exec(&mut self, input: Option<&str>) -> Output {
        if let Some(input) = input {
            self.update(input);
        }

        let command = self.command().cloned();
        let args = self.args();
        let output = Output::new(
            command.as_ref().map(|command| command.name().to_string()),
            args.clone(),
            self.typed.clone(),
            self.to_canonical_string(),
        );

        let exec_fn = command.as_ref().and_then(|command| command.exec_fn().cloned());
        let (Status::Valid, Some(exec_fn)) = (self.status(), exec_fn) else {
            let message = self
                .status_message()
                .unwrap_or_else(|| "Nothing to execute".to_string());
            error!("Not executing `{}`: {message}", self.typed);
            output.complete(Err(ExecError::new(message)));
            return output;
        };

        info!("Executing `{}`", self.typed);
        let context = ExecutionContext::new(
            self.canon.clone(),
            self.environment.clone(),
            self.document.clone(),
            self.typed.clone(),
        );
        match panic::catch_unwind(AssertUnwindSafe(|| exec_fn(&args, &context))) {
            Ok(Ok(Reply::Value(value))) => output.complete(Ok(value)),
            Ok(Ok(Reply::Pending(promise))) => output.complete_with(&promise),
            Ok(Err(e)) => output.complete(Err(e)),
            Err(payload) => output.complete(Err(ExecError::new(panic_message(&*payload)))),
        }

        self.update("");
        if let Some(text) = context.take_update() {
            self.update(&text);
        }
        output
    }

    /// The arguments the current command would run with: what was typed
    /// where something was, defaults elsewhere.
    pub fn args(&self) -> Args {
        let mut args = Args::new();
        for assignment in self.assignments.values() {
            args.insert(assignment.name(), assignment.effective_value().cloned());
        }
        args
    }

    /// Renders the line the way it would have been typed in full.
    ///
    /// Parameters still at their default are left out. Positional
    /// parameters stay positional until one is left out, after which the
    /// rest use `--name value`, as named-only parameters always do.
    pub fn to_canonical_string(&self) -> String {
        let Some(command) = self.command() else {
            return String::new();
        };

        if command.name() == EVAL_COMMAND_NAME {
            let script = self.assignments.get("script").map(|a| a.arg().text()).unwrap_or_default();
            return format!("{{ {script} }}");
        }

        self.with_context(|ctx| {
            let mut line = command.name().to_string();
            let mut positional = true;

            for assignment in self.assignments.values() {
                let param = assignment.parameter();
                let value = assignment.effective_value();
                if value == param.default_value().value() {
                    if param.is_positional_allowed() {
                        positional = false;
                    }
                    continue;
                }
                let Some(value) = value else {
                    continue;
                };

                let by_position = positional && param.is_positional_allowed();
                let param_type = param.param_type();
                match (param_type.class(), value) {
                    (TypeClass::Boolean, Value::Bool(true)) => {
                        line.push_str(&format!(" --{}", param.name()));
                    }
                    (TypeClass::Array, Value::Array(members)) if !by_position => {
                        for member in members {
                            let text = param_type
                                .stringify(Some(&Value::Array(vec![member.clone()])), ctx);
                            line.push_str(&format!(" --{} {}", param.name(), quote(&text)));
                        }
                    }
                    (TypeClass::Array, Value::Array(members)) => {
                        for member in members {
                            let text = param_type
                                .stringify(Some(&Value::Array(vec![member.clone()])), ctx);
                            line.push_str(&format!(" {}", quote(&text)));
                        }
                    }
                    _ => {
                        let text = quote(&param_type.stringify(Some(value), ctx));
                        if by_position {
                            line.push_str(&format!(" {text}"));
                        } else {
                            line.push_str(&format!(" --{} {text}", param.name()));
                        }
                    }
                }
            }
            line
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "The command panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use crate::canon::{eval_command_spec, Canon, CommandSpec, DefaultValue, ParamSpec};
    use crate::output::{ExecError, OutputData, Reply};
    use crate::requisition::Requisition;
    use crate::types::TypeOptions;
    use crate::value::Value;

    fn canon() -> Arc<Canon> {
        let canon = Canon::new();
        canon
            .add_command(
                CommandSpec::new("greet")
                    .param(ParamSpec::new("name"))
                    .param(ParamSpec::new("times").type_ref("number").default_value(crate::value::Value::from(1i64).into()))
                    .group(
                        "Options",
                        vec![
                            ParamSpec::new("loud").type_ref("boolean"),
                            ParamSpec::new("tags")
                                .type_ref(TypeOptions {
                                    subtype: Some(Box::new("string".into())),
                                    ..TypeOptions::new("array")
                                })
                                .default_value(DefaultValue::Null),
                        ],
                    )
                    .exec(|args, _| {
                        let name = args.get_str("name").unwrap_or_default();
                        Ok(Reply::from(format!("Hello {name}")))
                    }),
            )
            .unwrap();
        canon
            .add_command(CommandSpec::new("fail").exec(|_, _| Err(ExecError::new("broken"))))
            .unwrap();
        canon
            .add_command(CommandSpec::new("boom").exec(|_, _| panic!("kaboom")))
            .unwrap();
        canon
            .add_command(CommandSpec::new("again").exec(|_, context| {
                context.update("greet again");
                Ok(Reply::none())
            }))
            .unwrap();
        canon
            .add_command(eval_command_spec(|args, _| {
                Ok(Reply::from(args.get_str("script").unwrap_or_default().to_uppercase()))
            }))
            .unwrap();
        Arc::new(canon)
    }

    fn value_of(record: &crate::output::OutputRecord) -> Option<&Value> {
        match &record.data {
            Some(OutputData::Value(value)) => Some(value),
            _ => None,
        }
    }

    #[test]
    fn test_exec_runs_and_clears() {
        let mut requisition = Requisition::new(canon());
        let output = requisition.exec(Some("greet fred"));
        let record = output.record();
        assert!(record.completed);
        assert!(!record.error);
        assert_eq!(value_of(&record), Some(&Value::from("Hello fred")));
        assert_eq!(record.command.as_deref(), Some("greet"));
        assert_eq!(record.args.get_f64("times"), Some(1.0));
        assert_eq!(requisition.text(), "");
    }

    #[test]
    fn test_invalid_line_is_not_run() {
        let mut requisition = Requisition::new(canon());
        let output = requisition.exec(Some("greet"));
        assert!(output.is_error());
        assert_eq!(requisition.text(), "greet");
    }

    #[test]
    fn test_errors_and_panics_are_recorded() {
        let mut requisition = Requisition::new(canon());
        let failed = requisition.exec(Some("fail")).record();
        assert!(matches!(
            failed.data,
            Some(OutputData::Error(ref e)) if e.message() == "broken"
        ));

        let panicked = requisition.exec(Some("boom")).record();
        assert!(panicked.error);
        assert!(matches!(
            panicked.data,
            Some(OutputData::Error(ref e)) if e.message() == "kaboom"
        ));
    }

    #[test]
    fn test_context_update_applies_after_clear() {
        let mut requisition = Requisition::new(canon());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        requisition
            .on_text_change()
            .subscribe(move |text: &String| sink.lock().unwrap().push(text.clone()));

        requisition.exec(Some("again"));
        assert_eq!(requisition.text(), "greet again");
        assert_eq!(*seen.lock().unwrap(), vec!["again", "", "greet again"]);
    }

    #[test]
    fn test_canonical_string() {
        let mut requisition = Requisition::new(canon());
        requisition.update("greet   --loud 'fred smith'");
        assert_eq!(
            requisition.to_canonical_string(),
            "greet fred\\ smith --loud"
        );

        requisition.update("greet fred 3 --tags a --tags 'b c'");
        assert_eq!(
            requisition.to_canonical_string(),
            "greet fred 3 --tags a --tags b\\ c"
        );

        requisition.update("greet --times 2 fred");
        assert_eq!(requisition.to_canonical_string(), "greet fred 2");
    }

    #[test]
    fn test_script_line() {
        let mut requisition = Requisition::new(canon());
        requisition.update("{ shout }");
        assert_eq!(requisition.to_canonical_string(), "{ shout }");
        let record = requisition.exec(None).record();
        assert_eq!(value_of(&record), Some(&Value::from("SHOUT")));
    }
}
