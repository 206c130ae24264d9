use crate::argument::Argument;
use crate::conversion::Conversion;
use crate::tokenizer::{escape, unescape};
use crate::types::{ParseContext, Type, TypeClass};
use crate::value::Value;

/// Free text. Escapes in the typed text are resolved.
#[derive(Debug, Clone, Default)]
pub struct StringType {
    allow_blank: bool,
}

impl StringType {
    pub fn new(allow_blank: bool) -> Self {
        Self { allow_blank }
    }
}

impl Type for StringType {
    fn name(&self) -> &str {
        "string"
    }

    fn class(&self) -> TypeClass {
        TypeClass::String
    }

    fn stringify(&self, value: Option<&Value>, _ctx: &ParseContext) -> String {
        value.map(|value| escape(&value.to_string())).unwrap_or_default()
    }

    fn parse(&self, arg: &Argument, _ctx: &ParseContext) -> Conversion {
        if arg.text().is_empty() && !self.allow_blank {
            return Conversion::incomplete(arg.clone(), None);
        }
        Conversion::new(Some(Value::String(unescape(arg.text()))), arg.clone())
    }
}

/// The body of a `{ ... }` block, taken as it was typed.
#[derive(Debug, Clone, Default)]
pub struct ScriptType;

impl Type for ScriptType {
    fn name(&self) -> &str {
        "script"
    }

    fn parse(&self, arg: &Argument, _ctx: &ParseContext) -> Conversion {
        if arg.text().trim().is_empty() {
            return Conversion::incomplete(arg.clone(), Some("Script is empty".to_string()));
        }
        Conversion::new(Some(Value::String(arg.text().to_string())), arg.clone())
    }
}
