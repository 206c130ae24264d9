//! Rewriting the line: completion, setting values and stepping them.
//!
//! Every rewrite replaces the raw arguments behind one assignment and
//! re-parses the whole line, so listeners see an ordinary update.

use itertools::Itertools;
use log::debug;

use super::cursor::Owner;
use super::{needs_quotes, quote, Cursor, Requisition};
use crate::argument::{Argument, ArgumentKind, BegetOptions};
use crate::error::{Error, Result};
use crate::status::Status;
use crate::types::TypeClass;
use crate::value::Value;

impl Requisition {
    /// Completes the assignment under `cursor.start` with one of its
    /// predictions.
    ///
    /// `prediction` wraps around the prediction list, so `-1` picks the
    /// last. Completing adds a trailing space unless the prediction wants
    /// more typing. Without predictions a valid assignment just gets its
    /// trailing space.
    ///
    /// # Errors
    ///
    /// [`Error::Invariant`] if the assignment's raw arguments are not
    /// adjacent in the line.
    pub fn complete(&mut self, cursor: Cursor, prediction: isize) -> Result<()> {
        let owner = self.owner_at(cursor.start);
        let assignment = self.assignment_of(owner).clone();
        let predictions = assignment.predictions();
        let choice = if predictions.is_empty() {
            None
        } else {
            let index = prediction.rem_euclid(predictions.len() as isize) as usize;
            predictions.into_iter().nth(index)
        };

        let raws = self.owned_raws(owner);
        if raws.is_empty() {
            let Some(choice) = choice else {
                return Ok(());
            };
            if owner == Owner::Command {
                return Ok(());
            }

            let options = BegetOptions::with_text(choice.name).suffix_space(!choice.incomplete);
            let value = Argument::from("").beget(&options);
            let switch = if assignment.parameter().is_positional_allowed() {
                String::new()
            } else {
                format!("--{} ", assignment.name())
            };
            let text = format!("{}{}{switch}{value}", self.typed, self.separator());
            self.update(&text);
            return Ok(());
        }

        let next_is_spaced = raws
            .last()
            .and_then(|last| self.raw_args.get(last + 1))
            .is_some_and(|next| next.prefix().starts_with(char::is_whitespace));

        let arg = assignment.arg();
        let replacement = match choice {
            Some(choice) => {
                debug!("Completing `{}` with `{}`", arg.text(), choice.name);
                let options = BegetOptions::with_text(choice.name)
                    .dont_quote(owner == Owner::Command)
                    .suffix_space(!choice.incomplete && !next_is_spaced);
                arg.beget(&options)
            }
            None if assignment.status() == Status::Valid && !next_is_spaced => {
                arg.beget(&BegetOptions::default().suffix_space(true))
            }
            None => return Ok(()),
        };

        if &replacement == arg {
            return Ok(());
        }
        self.splice(&raws, replacement.raw_args().into_iter().cloned().collect())
    }

    /// Sets parameter `name` to `value` by rewriting the line.
    ///
    /// Text already typed for the parameter is replaced in place. Otherwise
    /// `--name value` is appended, or a bare `--name` for a boolean set to
    /// `true`. Setting a switched-on boolean to `false`, or anything to
    /// `None`, removes what was typed. Arrays are rewritten member by
    /// member, wherever they were typed.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownParameter`] if the current command has no parameter
    /// `name`, [`Error::Invariant`] if its raw arguments are not adjacent.
    pub fn set_value(&mut self, name: &str, value: Option<Value>) -> Result<()> {
        let index = self
            .assignments
            .get_index_of(name)
            .ok_or_else(|| Error::UnknownParameter(name.to_string()))?;
        let owner = Owner::Param(index);
        let assignment = self.assignment_of(owner).clone();
        let param = assignment.parameter();
        if param.param_type().class() == TypeClass::Array {
            self.set_array(owner, value);
            return Ok(());
        }
        let is_boolean = param.param_type().class() == TypeClass::Boolean;
        let text = self.with_context(|ctx| param.param_type().stringify(value.as_ref(), ctx));
        let raws = self.owned_raws(owner);

        if raws.is_empty() {
            let addition = match &value {
                None => return Ok(()),
                Some(value) if is_boolean => {
                    if value.as_bool() != Some(true) {
                        return Ok(());
                    }
                    format!("--{}", param.name())
                }
                Some(_) => format!("--{} {}", param.name(), quote(&text)),
            };
            let line = format!("{}{}{addition}", self.typed, self.separator());
            self.update(&line);
            return Ok(());
        }

        let switched_on = matches!(assignment.arg().kind(), ArgumentKind::TrueNamed(_));
        let replacement = match &value {
            None => Vec::new(),
            Some(value) if switched_on => {
                if value.as_bool() == Some(true) {
                    return Ok(());
                }
                Vec::new()
            }
            Some(_) => {
                let options =
                    BegetOptions::with_text(text.as_str()).dont_quote(!needs_quotes(&text));
                let arg = assignment.arg().beget(&options);
                arg.raw_args().into_iter().cloned().collect()
            }
        };
        self.splice(&raws, replacement)
    }

    /// Replaces every member typed for an array parameter.
    ///
    /// Members can be spread over the line (`--tags a x --tags b`), so the
    /// old ones are dropped wherever they are and the new ones go where the
    /// first of them was. Members given by name are replaced by name.
    fn set_array(&mut self, owner: Owner, value: Option<Value>) {
        let assignment = self.assignment_of(owner).clone();
        let param = assignment.parameter();
        let elements = match value {
            None => Vec::new(),
            Some(Value::Array(values)) => values,
            Some(other) => vec![other],
        };
        let texts: Vec<String> = self.with_context(|ctx| {
            elements
                .into_iter()
                .map(|element| {
                    let text = param
                        .param_type()
                        .stringify(Some(&Value::Array(vec![element])), ctx);
                    quote(&text)
                })
                .collect()
        });
        let by_name = !param.is_positional_allowed()
            || assignment.arg().members().iter().any(Argument::is_named);
        let member_text = |text: &String| {
            if by_name {
                format!("--{} {text}", param.name())
            } else {
                text.clone()
            }
        };

        let raws = self.owned_raws(owner);
        let (Some(&first), Some(&last)) = (raws.first(), raws.last()) else {
            if !texts.is_empty() {
                let addition = texts
                    .iter()
                    .map(|text| format!("--{} {text}", param.name()))
                    .join(" ");
                let line = format!("{}{}{addition}", self.typed, self.separator());
                self.update(&line);
            }
            return;
        };

        let prefix = self.raw_args[first].prefix();
        let lead = match &prefix[..prefix.len() - prefix.trim_start().len()] {
            "" => " ".to_string(),
            lead => lead.to_string(),
        };
        let suffix = self.raw_args[last].suffix();
        let trail = suffix[suffix.trim_end().len()..].to_string();
        let mut members: Vec<Argument> = texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let prefix = if i == 0 { lead.as_str() } else { " " };
                Argument::new(member_text(text), prefix, "")
            })
            .collect();
        if let Some(member) = members.last_mut() {
            member.push_suffix(&trail);
        }

        let mut raw_args = Vec::with_capacity(self.raw_args.len());
        for (i, arg) in self.raw_args.iter().enumerate() {
            if i == first {
                raw_args.append(&mut members);
            }
            if !raws.contains(&i) {
                raw_args.push(arg.clone());
            }
        }
        debug!("Rewriting `{}` as {} member(s)", param.name(), texts.len());
        let text: String = raw_args.iter().map(ToString::to_string).collect();
        self.update(&text);
    }

    /// Moves parameter `name` to its type's next value.
    ///
    /// # Errors
    ///
    /// As [`Requisition::set_value`].
    pub fn increment(&mut self, name: &str) -> Result<()> {
        self.step(name, true)
    }

    /// Moves parameter `name` to its type's previous value.
    ///
    /// # Errors
    ///
    /// As [`Requisition::set_value`].
    pub fn decrement(&mut self, name: &str) -> Result<()> {
        self.step(name, false)
    }

    fn step(&mut self, name: &str, up: bool) -> Result<()> {
        let assignment = self
            .assignments
            .get(name)
            .ok_or_else(|| Error::UnknownParameter(name.to_string()))?;
        let param_type = assignment.parameter().param_type().clone();
        let current = assignment.value().cloned();

        let next = self.with_context(|ctx| {
            if up {
                param_type.increment(current.as_ref(), ctx)
            } else {
                param_type.decrement(current.as_ref(), ctx)
            }
        });
        match next {
            Some(value) => self.set_value(name, Some(value)),
            None => Ok(()),
        }
    }

    /// Replaces the raw arguments at `raws` and re-parses.
    fn splice(&mut self, raws: &[usize], replacement: Vec<Argument>) -> Result<()> {
        let (Some(&first), Some(&last)) = (raws.first(), raws.last()) else {
            return Err(Error::invariant("no arguments to replace"));
        };
        if last - first + 1 != raws.len() {
            return Err(Error::invariant(format!(
                "arguments {raws:?} of `{}` are not adjacent",
                self.typed
            )));
        }

        let mut raw_args = self.raw_args.clone();
        raw_args.splice(first..=last, replacement);
        let text: String = raw_args.iter().map(ToString::to_string).collect();
        self.update(&text);
        Ok(())
    }

    /// What goes between the line and something appended to it.
    fn separator(&self) -> &'static str {
        if self.typed.is_empty() || self.typed.ends_with(char::is_whitespace) {
            ""
        } else {
            " "
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::canon::{Canon, CommandSpec, DefaultValue, ParamSpec};
    use crate::error::Error;
    use crate::output::Reply;
    use crate::requisition::{Cursor, Requisition};
    use crate::types::TypeOptions;
    use crate::value::Value;

    fn canon() -> Arc<Canon> {
        let canon = Canon::new();
        let noop = |spec: CommandSpec| spec.exec(|_, _| Ok(Reply::none()));
        canon.add_command(noop(CommandSpec::new("tsv"))).unwrap();
        canon.add_command(noop(CommandSpec::new("tselarr"))).unwrap();
        canon
            .add_command(noop(
                CommandSpec::new("tsu")
                    .param(ParamSpec::new("num").type_ref(TypeOptions {
                        min: Some(-5.0),
                        max: Some(10.0),
                        ..TypeOptions::new("number")
                    }))
                    .group(
                        "Options",
                        vec![
                            ParamSpec::new("verbose").type_ref("boolean"),
                            ParamSpec::new("label").default_value(DefaultValue::Null),
                        ],
                    ),
            ))
            .unwrap();
        let words = || TypeOptions {
            subtype: Some(Box::new("string".into())),
            ..TypeOptions::new("array")
        };
        canon
            .add_command(noop(
                CommandSpec::new("tsm").param(ParamSpec::new("words").type_ref(words())),
            ))
            .unwrap();
        canon
            .add_command(noop(
                CommandSpec::new("tst")
                    .param(ParamSpec::new("first"))
                    .group("Options", vec![ParamSpec::new("tags").type_ref(words())]),
            ))
            .unwrap();
        Arc::new(canon)
    }

    fn value_of(requisition: &Requisition, name: &str) -> Option<Value> {
        requisition.assignment(name).and_then(|a| a.value()).cloned()
    }

    #[test]
    fn test_complete_command() {
        let mut requisition = Requisition::new(canon());
        requisition.update("tsela");
        requisition.complete(Cursor::at(5), 0).unwrap();
        assert_eq!(requisition.text(), "tselarr ");
    }

    #[test]
    fn test_complete_valid_adds_space() {
        let mut requisition = Requisition::new(canon());
        requisition.update("tsv");
        requisition.complete(Cursor::at(3), 0).unwrap();
        assert_eq!(requisition.text(), "tsv ");
    }

    #[test]
    fn test_complete_switch_name() {
        let mut requisition = Requisition::new(canon());
        requisition.update("tsu 4 --ve");
        requisition.complete(Cursor::at(10), 0).unwrap();
        assert_eq!(requisition.text(), "tsu 4 --verbose ");
    }

    #[test]
    fn test_complete_wraps_index() {
        let mut requisition = Requisition::new(canon());
        requisition.update("ts");
        requisition.complete(Cursor::at(2), -1).unwrap();
        assert_eq!(requisition.text(), "tsv ");
    }

    #[test]
    fn test_set_value_replaces_and_appends() {
        let mut requisition = Requisition::new(canon());
        requisition.update("tsu 4");
        requisition.set_value("num", Some(7i64.into())).unwrap();
        assert_eq!(requisition.text(), "tsu 7");

        requisition.set_value("label", Some("big top".into())).unwrap();
        assert_eq!(requisition.text(), "tsu 7 --label big\\ top");
        assert_eq!(value_of(&requisition, "label"), Some("big top".into()));

        requisition.set_value("verbose", Some(true.into())).unwrap();
        assert_eq!(requisition.text(), "tsu 7 --label big\\ top --verbose");

        requisition.set_value("verbose", Some(false.into())).unwrap();
        assert_eq!(requisition.text(), "tsu 7 --label big\\ top");
    }

    #[test]
    fn test_set_value_rewrites_array_members() {
        let mut requisition = Requisition::new(canon());
        requisition.update("tsm a b");
        requisition
            .set_value("words", Some(Value::Array(vec!["z".into()])))
            .unwrap();
        assert_eq!(requisition.text(), "tsm z");
        assert_eq!(
            value_of(&requisition, "words"),
            Some(Value::Array(vec!["z".into()]))
        );

        requisition.set_value("words", None).unwrap();
        assert_eq!(requisition.text(), "tsm");

        requisition
            .set_value("words", Some(Value::Array(vec!["p".into(), "q".into()])))
            .unwrap();
        assert_eq!(requisition.text(), "tsm --words p --words q");
        assert_eq!(
            value_of(&requisition, "words"),
            Some(Value::Array(vec!["p".into(), "q".into()]))
        );
    }

    #[test]
    fn test_set_value_on_scattered_array() {
        let mut requisition = Requisition::new(canon());
        requisition.update("tst x --tags a b --tags c");
        assert_eq!(requisition.unassigned().len(), 1);

        requisition
            .set_value("tags", Some(Value::Array(vec!["z".into(), "w y".into()])))
            .unwrap();
        assert_eq!(requisition.text(), "tst x --tags z --tags w\\ y b");
        assert_eq!(
            value_of(&requisition, "tags"),
            Some(Value::Array(vec!["z".into(), "w y".into()]))
        );
        assert_eq!(value_of(&requisition, "first"), Some("x".into()));
    }

    #[test]
    fn test_set_value_unknown_parameter() {
        let mut requisition = Requisition::new(canon());
        requisition.update("tsu 4");
        assert_eq!(
            requisition.set_value("nope", None),
            Err(Error::UnknownParameter("nope".to_string()))
        );
    }

    #[test]
    fn test_increment_and_decrement_number() {
        let mut requisition = Requisition::new(canon());
        requisition.update("tsu ");
        requisition.increment("num").unwrap();
        assert_eq!(requisition.text(), "tsu --num -5");

        requisition.update("tsu 10");
        requisition.increment("num").unwrap();
        assert_eq!(requisition.text(), "tsu 10");
        requisition.decrement("num").unwrap();
        assert_eq!(requisition.text(), "tsu 9");
    }
}
