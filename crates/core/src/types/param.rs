use crate::argument::Argument;
use crate::conversion::Conversion;
use crate::types::selection::parse_selection;
use crate::types::{LookupEntry, ParseContext, Type};
use crate::value::Value;

/// Parses arguments the assigner could not place.
///
/// When the argument looks like the start of a switch, the `--name` of every
/// named-only parameter still without an argument is offered. Anything else
/// is simply not used.
#[derive(Debug, Clone)]
pub struct ParamType {
    incomplete_name: bool,
}

impl ParamType {
    pub fn new(incomplete_name: bool) -> Self {
        Self { incomplete_name }
    }

    pub fn is_incomplete_name(&self) -> bool {
        self.incomplete_name
    }

    fn entries(ctx: &ParseContext) -> Vec<LookupEntry> {
        let Some(command) = ctx.command() else {
            return Vec::new();
        };

        command
            .params()
            .iter()
            .filter(|param| !param.is_positional_allowed())
            .filter(|param| ctx.conversion(param.name()).map_or(true, |c| c.arg().is_unset()))
            .map(|param| LookupEntry {
                description: param.description().map(str::to_string),
                hidden: param.is_hidden(),
                ..LookupEntry::new(
                    format!("--{}", param.name()),
                    Value::String(param.name().to_string()),
                )
            })
            .collect()
    }
}

impl Type for ParamType {
    fn name(&self) -> &str {
        "param"
    }

    fn parse(&self, arg: &Argument, ctx: &ParseContext) -> Conversion {
        if self.incomplete_name {
            parse_selection(&Self::entries(ctx), arg)
        } else {
            Conversion::error(arg.clone(), Some("Unused argument".to_string()))
        }
    }
}
