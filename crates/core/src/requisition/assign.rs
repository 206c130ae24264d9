//! Distributing arguments over a command's parameters.
//!
//! The assigner only decides which argument goes where. Parsing happens
//! afterwards, in declaration order, so that deferred types can look at the
//! parameters before them.

use log::debug;

use crate::argument::Argument;
use crate::canon::Command;
use crate::types::TypeClass;

/// An argument still in the line, with its position among the raw arguments.
#[derive(Debug, Clone)]
pub(crate) struct Token {
    pub index: usize,
    pub arg: Argument,
}

/// What one parameter receives.
#[derive(Debug, Clone, Default)]
pub(crate) enum Slot {
    /// Nothing was typed for it.
    #[default]
    Blank,
    /// An argument built from the raw arguments at `raw`.
    Arg { arg: Argument, raw: Vec<usize> },
}

/// An argument no parameter took.
#[derive(Debug, Clone)]
pub(crate) struct Unassigned {
    pub arg: Argument,
    pub raw: Vec<usize>,
}

#[derive(Debug, Default)]
pub(crate) struct Plan {
    /// One slot per parameter, in declaration order.
    pub slots: Vec<Slot>,
    pub unassigned: Vec<Unassigned>,
}

impl Plan {
    fn leave(&mut self, tokens: Vec<Token>) {
        self.unassigned.extend(tokens.into_iter().map(|token| Unassigned {
            arg: token.arg,
            raw: vec![token.index],
        }));
    }
}

/// Assigns `tokens` to the parameters of `command`.
///
/// 1. Without a command, or without parameters, everything is unassigned.
/// 2. A sole string parameter takes the rest of the line.
/// 3. `--name` (or `-s`) switches claim their parameter, and the following
///    argument unless the parameter is boolean. Array parameters collect
///    every occurrence; a repeated switch for anything else is unassigned.
/// 4. Positional parameters take what is left in declaration order. An
///    array parameter swallows the remainder, and something that looks like
///    the start of a switch is set aside instead of being consumed.
pub(crate) fn assign(command: Option<&Command>, mut tokens: Vec<Token>) -> Plan {
    let params = command.map(Command::params).unwrap_or_default();
    let mut plan = Plan {
        slots: vec![Slot::Blank; params.len()],
        unassigned: Vec::new(),
    };

    if command.is_none() || params.is_empty() {
        plan.leave(tokens);
        return plan;
    }
    if tokens.is_empty() {
        return plan;
    }

    if let [param] = params {
        if param.param_type().class() == TypeClass::String {
            let raw = tokens.iter().map(|token| token.index).collect();
            let arg = if tokens.len() == 1 {
                tokens.remove(0).arg
            } else {
                Argument::merged(tokens.into_iter().map(|token| token.arg).collect())
            };
            plan.slots[0] = Slot::Arg { arg, raw };
            return plan;
        }
    }

    let mut named = vec![false; params.len()];
    let mut arrays: Vec<Option<(Vec<Argument>, Vec<usize>)>> = vec![None; params.len()];

    for (p, param) in params.iter().enumerate() {
        let class = param.param_type().class();
        let mut i = 0;
        while i < tokens.len() {
            if !param.is_known_as(tokens[i].arg.text()) {
                i += 1;
                continue;
            }

            named[p] = true;
            let switch = tokens.remove(i);
            let mut raw = vec![switch.index];
            let arg = if class == TypeClass::Boolean {
                Argument::true_named(switch.arg)
            } else {
                let value = (i < tokens.len()).then(|| tokens.remove(i)).map(|token| {
                    raw.push(token.index);
                    token.arg
                });
                Argument::named(switch.arg, value)
            };

            if class == TypeClass::Array {
                let (members, indices) = arrays[p].get_or_insert_with(Default::default);
                members.push(arg);
                indices.extend(raw);
            } else if matches!(plan.slots[p], Slot::Blank) {
                plan.slots[p] = Slot::Arg { arg, raw };
            } else {
                debug!("`{}` given twice", param.name());
                let repeated = arg.raw_args().into_iter().cloned().zip(raw);
                plan.leave(repeated.map(|(arg, index)| Token { index, arg }).collect());
            }
        }
    }

    for (p, param) in params.iter().enumerate() {
        if named[p] || !param.is_positional_allowed() {
            continue;
        }

        let class = param.param_type().class();
        if class == TypeClass::Array {
            let (members, indices) = arrays[p].get_or_insert_with(Default::default);
            for token in tokens.drain(..) {
                members.push(token.arg);
                indices.push(token.index);
            }
            continue;
        }

        if tokens.is_empty() {
            continue;
        }
        let token = tokens.remove(0);
        if is_incomplete_name(token.arg.text(), class) {
            plan.leave(vec![token]);
        } else {
            plan.slots[p] = Slot::Arg {
                arg: token.arg,
                raw: vec![token.index],
            };
        }
    }

    for (p, array) in arrays.into_iter().enumerate() {
        if let Some((members, raw)) = array {
            plan.slots[p] = Slot::Arg {
                arg: Argument::array(members),
                raw,
            };
        }
    }

    plan.leave(tokens);
    plan
}

/// True if `text` looks like the start of a switch rather than a value. For
/// numbers only `--x`, `-x` and `-_` count, so `-4` stays a value.
fn is_incomplete_name(text: &str, class: TypeClass) -> bool {
    let mut chars = text.chars();
    if chars.next() != Some('-') {
        return false;
    }
    if class != TypeClass::Number {
        return true;
    }
    chars
        .next()
        .is_some_and(|c| c == '-' || c == '_' || c.is_ascii_alphabetic())
}
