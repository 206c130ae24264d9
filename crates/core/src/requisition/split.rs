//! Finding the command at the start of the line.

use log::debug;

use crate::argument::Argument;
use crate::canon::EVAL_COMMAND_NAME;
use crate::conversion::Conversion;
use crate::types::{CommandType, ParseContext, Type};
use crate::value::Value;

#[derive(Debug)]
pub(crate) struct Split {
    pub conversion: Conversion,
    /// How many leading arguments name the command.
    pub consumed: usize,
}

/// Resolves the longest run of leading arguments that names a command.
///
/// Growth stops at the first candidate that is executable or unknown; a
/// command group keeps growing while there are arguments left. A leading
/// script block selects the eval command without consuming anything, so the
/// block goes on to its `script` parameter.
pub(crate) fn split(args: &[Argument], ctx: &ParseContext) -> Split {
    let Some(first) = args.first() else {
        return Split {
            conversion: CommandType.parse(&Argument::blank(), ctx),
            consumed: 0,
        };
    };

    if first.is_script() {
        let conversion = match ctx.canon().command(EVAL_COMMAND_NAME) {
            Some(eval) => Conversion::new(Some(Value::Command(eval)), Argument::blank()),
            None => Conversion::error(
                Argument::blank(),
                Some("Scripts are not supported".to_string()),
            ),
        };
        return Split {
            conversion,
            consumed: 0,
        };
    }

    let mut used = 1;
    let conversion = loop {
        let arg = if used == 1 {
            first.clone()
        } else {
            Argument::merged(args[..used].to_vec())
        };
        let conversion = CommandType.parse(&arg, ctx);

        let is_group = conversion
            .value()
            .and_then(Value::as_command)
            .is_some_and(|command| !command.is_executable());
        if !is_group || used >= args.len() {
            break conversion;
        }
        used += 1;
    };

    debug!("Command `{}` uses {used} argument(s)", conversion.arg().text());
    Split {
        conversion,
        consumed: used.min(args.len()),
    }
}
