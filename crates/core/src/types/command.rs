use crate::argument::Argument;
use crate::conversion::{Conversion, Prediction};
use crate::status::Status;
use crate::types::{ParseContext, Type};
use crate::value::Value;

/// The name of a registered command.
///
/// Sub-commands (names with a space) are only predicted once something has
/// been typed, so an empty line offers just the top level. Hidden commands
/// are only matched exactly.
#[derive(Debug, Clone, Default)]
pub struct CommandType;

impl CommandType {
    fn find_predictions(text: &str, ctx: &ParseContext) -> Vec<Prediction> {
        let commands = ctx.canon().commands();
        let mut predictions: Vec<Prediction> = commands
            .iter()
            .filter(|command| command.name() == text)
            .map(|command| Prediction::new(command.name(), Value::Command(command.clone())))
            .collect();

        for command in &commands {
            let name = command.name();
            if name == text || command.is_hidden() || !name.starts_with(text) {
                continue;
            }
            if text.is_empty() && name.contains(' ') {
                continue;
            }
            predictions.push(
                Prediction::new(name, Value::Command(command.clone()))
                    .with_description(command.description().map(str::to_string)),
            );
        }

        predictions
    }
}

impl Type for CommandType {
    fn name(&self) -> &str {
        "command"
    }

    fn stringify(&self, value: Option<&Value>, _ctx: &ParseContext) -> String {
        match value {
            Some(Value::Command(command)) => command.name().to_string(),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }

    fn parse(&self, arg: &Argument, ctx: &ParseContext) -> Conversion {
        let text = arg.text();
        let predictions = Self::find_predictions(text, ctx);

        let Some(first) = predictions.first() else {
            return Conversion::error(arg.clone(), Some(format!("Can't use '{text}'.")));
        };

        if let Value::Command(command) = &first.value {
            if predictions.len() == 1 {
                if command.name() == text && command.is_executable() {
                    return Conversion::new(Some(first.value.clone()), arg.clone());
                }
            } else if first.name == text {
                let value = first.value.clone();
                return Conversion::new(Some(value), arg.clone()).with_predictions(predictions);
            }
        }

        Conversion::new(None, arg.clone())
            .with_status(Status::Incomplete, None)
            .with_predictions(predictions)
    }
}
