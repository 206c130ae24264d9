//! The live parse of one input line.
//!
//! A [`Requisition`] is created per input surface and fed the whole line on
//! every edit through [`Requisition::update`]. Each update runs the same
//! pipeline:
//!
//! - tokenize the line, keeping the raw arguments verbatim
//! - split off the command name (see [`split`])
//! - assign the rest to parameters (see [`assign`])
//! - parse every parameter in declaration order
//! - notify listeners of the assignments that actually changed
//!
//! On top of that the requisition answers the questions an input widget
//! asks: which assignment the cursor is in, how to color each character,
//! what to complete, and how to run the line.

use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use indexmap::IndexMap;
use log::debug;

use crate::argument::Argument;
use crate::canon::{Canon, Command, Parameter};
use crate::conversion::Conversion;
use crate::events::Event;
use crate::output::Handle;
use crate::status::Status;
use crate::tokenizer::tokenize;
use crate::types::{CommandType, ParamType, ParseContext, Type};
use crate::value::Value;

mod assign;
mod assignment;
mod cursor;
mod edit;
mod exec;
mod split;

pub use assignment::{Assignment, AssignmentChange, COMMAND_ASSIGNMENT_NAME, UNASSIGNED_NAME};
pub use cursor::{Cursor, StatusSpan};

use assign::{Slot, Token};
use cursor::{Owner, Part};

/// The typed line, broken down into a command and its assignments.
pub struct Requisition {
    canon: Arc<Canon>,
    environment: Option<Handle>,
    document: Option<Handle>,
    typed: String,
    raw_args: Vec<Argument>,
    command_assignment: Assignment,
    assignments: IndexMap<String, Assignment>,
    unassigned: Vec<Assignment>,
    /// The owner of each raw argument.
    owners: Vec<Owner>,
    on_assignment_change: Event<AssignmentChange>,
    on_text_change: Event<String>,
}

impl Requisition {
    /// A requisition holding an empty line.
    pub fn new(canon: Arc<Canon>) -> Self {
        let command_param = Parameter::synthetic(COMMAND_ASSIGNMENT_NAME, Arc::new(CommandType));
        let mut requisition = Self {
            canon,
            environment: None,
            document: None,
            typed: String::new(),
            raw_args: Vec::new(),
            command_assignment: Assignment::command(
                command_param,
                Conversion::incomplete(Argument::blank(), None),
            ),
            assignments: IndexMap::new(),
            unassigned: Vec::new(),
            owners: Vec::new(),
            on_assignment_change: Event::new(),
            on_text_change: Event::new(),
        };
        requisition.parse("");
        requisition
    }

    /// Passed untouched to every command this requisition runs.
    #[must_use]
    pub fn with_environment(mut self, environment: Option<Handle>) -> Self {
        self.environment = environment;
        self
    }

    /// Passed untouched to every command this requisition runs.
    #[must_use]
    pub fn with_document(mut self, document: Option<Handle>) -> Self {
        self.document = document;
        self
    }

    pub fn canon(&self) -> &Arc<Canon> {
        &self.canon
    }

    /// The line as last given to [`Requisition::update`].
    pub fn text(&self) -> &str {
        &self.typed
    }

    /// The tokenizer's arguments, which join back into [`Requisition::text`].
    pub fn raw_args(&self) -> &[Argument] {
        &self.raw_args
    }

    pub fn command(&self) -> Option<&Arc<Command>> {
        self.command_assignment.value().and_then(Value::as_command)
    }

    pub fn command_assignment(&self) -> &Assignment {
        &self.command_assignment
    }

    pub fn assignment(&self, name: &str) -> Option<&Assignment> {
        self.assignments.get(name)
    }

    /// Parameter assignments in declaration order.
    pub fn assignments(&self) -> impl Iterator<Item = &Assignment> {
        self.assignments.values()
    }

    /// Arguments no parameter took.
    pub fn unassigned(&self) -> &[Assignment] {
        &self.unassigned
    }

    /// Fired once per changed assignment after each update.
    pub fn on_assignment_change(&self) -> &Event<AssignmentChange> {
        &self.on_assignment_change
    }

    /// Fired once after each update, with the new line.
    pub fn on_text_change(&self) -> &Event<String> {
        &self.on_text_change
    }

    /// Re-parses the whole line.
    pub fn update(&mut self, text: &str) {
        let old_command = self.command().cloned();
        let old_command_conversion = self.command_assignment.conversion().clone();
        let old_conversions = self.conversions();

        self.parse(text);

        let mut changes = Vec::new();
        if &old_command_conversion != self.command_assignment.conversion() {
            changes.push(AssignmentChange {
                name: COMMAND_ASSIGNMENT_NAME.to_string(),
                old: old_command_conversion,
                new: self.command_assignment.conversion().clone(),
            });
        }
        if same_command(old_command.as_ref(), self.command()) {
            for (name, assignment) in &self.assignments {
                match old_conversions.get(name) {
                    Some(old) if old != assignment.conversion() => changes.push(AssignmentChange {
                        name: name.clone(),
                        old: old.clone(),
                        new: assignment.conversion().clone(),
                    }),
                    _ => {}
                }
            }
        }

        for change in &changes {
            self.on_assignment_change.emit(change);
        }
        self.on_text_change.emit(&self.typed);
    }

    fn parse(&mut self, text: &str) {
        let canon = self.canon.clone();
        let raw_args = tokenize(text);

        let split = split::split(&raw_args, &ParseContext::new(&canon));
        let command = split.conversion.value().and_then(Value::as_command).cloned();
        let tokens = raw_args
            .iter()
            .cloned()
            .enumerate()
            .skip(split.consumed)
            .map(|(index, arg)| Token { index, arg })
            .collect();
        let plan = assign::assign(command.as_deref(), tokens);

        let mut owners = vec![Owner::Command; raw_args.len()];
        let mut conversions = IndexMap::new();
        let mut assignments = IndexMap::new();

        if let Some(command) = &command {
            for (p, (param, slot)) in command.params().iter().zip(plan.slots).enumerate() {
                let ctx = ParseContext::new(&canon)
                    .with_command(Some(command.as_ref()))
                    .with_conversions(&conversions);
                let conversion = match slot {
                    Slot::Blank => param.param_type().blank(&ctx),
                    Slot::Arg { arg, raw } => {
                        for index in raw {
                            owners[index] = Owner::Param(p);
                        }
                        param.param_type().parse(&arg, &ctx)
                    }
                };
                debug!(
                    "`{}` is {} with {:?}",
                    param.name(),
                    conversion.status(),
                    conversion.value()
                );
                conversions.insert(param.name().to_string(), conversion.clone());
                assignments.insert(
                    param.name().to_string(),
                    Assignment::param(param.clone(), conversion),
                );
            }
        }

        let ctx = ParseContext::new(&canon)
            .with_command(command.as_deref())
            .with_conversions(&conversions);
        let unassigned = plan
            .unassigned
            .into_iter()
            .enumerate()
            .map(|(u, leftover)| {
                for index in leftover.raw {
                    owners[index] = Owner::Unassigned(u);
                }
                let param_type = ParamType::new(leftover.arg.text().starts_with('-'));
                let conversion = param_type.parse(&leftover.arg, &ctx);
                let param = Parameter::synthetic(UNASSIGNED_NAME, Arc::new(param_type));
                Assignment::unassigned(param, conversion)
            })
            .collect();

        self.typed = text.to_string();
        self.raw_args = raw_args;
        self.command_assignment =
            Assignment::command(self.command_assignment.parameter().clone(), split.conversion);
        self.assignments = assignments;
        self.unassigned = unassigned;
        self.owners = owners;
    }

    /// The status of the whole line.
    ///
    /// Any assignment that is not valid makes the line an error, including
    /// an incomplete one: a line is only incomplete when all that is wrong
    /// with it are half-typed switch names.
    pub fn status(&self) -> Status {
        let mut status = Status::combine(
            std::iter::once(&self.command_assignment)
                .chain(self.assignments.values())
                .map(Assignment::status),
        );
        if status == Status::Incomplete {
            status = Status::Error;
        }

        if !self.unassigned.is_empty() {
            let all_incomplete = self.unassigned.iter().all(|u| u.arg().text().starts_with('-'));
            status = status.worst(if all_incomplete {
                Status::Incomplete
            } else {
                Status::Error
            });
        }
        status
    }

    /// Why the line is not valid, `None` if it is.
    pub fn status_message(&self) -> Option<String> {
        if self.command_assignment.status() != Status::Valid {
            let message = self
                .command_assignment
                .message()
                .map_or_else(|| "invalid command".to_string(), str::to_string);
            return Some(message);
        }

        if let Some(assignment) = self.assignments.values().find(|a| a.status() != Status::Valid) {
            let message = match assignment.message() {
                Some(message) => message.to_string(),
                None => format!("Value required for '{}'", assignment.name()),
            };
            return Some(message);
        }

        self.unassigned.first().map(|assignment| {
            assignment
                .message()
                .map_or_else(|| "unused argument".to_string(), str::to_string)
        })
    }

    /// The assignment the character before `cursor` belongs to.
    ///
    /// Position 0 is always the command. Positions past the end of the line
    /// count as the last character.
    pub fn assignment_at(&self, cursor: usize) -> &Assignment {
        self.assignment_of(self.owner_at(cursor))
    }

    pub(crate) fn owner_at(&self, cursor: usize) -> Owner {
        if cursor == 0 {
            return Owner::Command;
        }
        let owners = self.char_owners();
        owners
            .get(cursor - 1)
            .or(owners.last())
            .copied()
            .unwrap_or(Owner::Command)
    }

    /// Every character of the line with the status to show it in.
    ///
    /// Text takes the status of its assignment, spacing and quotes are
    /// always valid. Incomplete text shows as an error unless the cursor is
    /// still in it.
    pub fn input_status_markup(&self, cursor: usize) -> Vec<StatusSpan> {
        let traces = cursor::trace(&self.raw_args);
        if traces.is_empty() {
            return Vec::new();
        }

        let at = cursor.saturating_sub(1).min(traces.len() - 1);
        let current = traces[at];
        let current_owner = self.raw_owner(current.raw);
        let inside = current.part == Part::Text
            || (current.part == Part::Suffix && self.is_named(current_owner));

        let chars = traces.iter().map(|trace| {
            if trace.part != Part::Text {
                return (Status::Valid, trace.c);
            }
            let owner = self.raw_owner(trace.raw);
            let mut status = self.assignment_of(owner).status();
            if status == Status::Incomplete && (owner != current_owner || !inside) {
                status = Status::Error;
            }
            (status, trace.c)
        });
        cursor::merge_spans(chars)
    }

    fn char_owners(&self) -> Vec<Owner> {
        cursor::char_owners(
            &self.raw_args,
            &self.owners,
            |owner| self.is_named(owner),
            self.first_blank_positional(),
        )
    }

    fn is_named(&self, owner: Owner) -> bool {
        self.assignment_of(owner).arg().is_named()
    }

    fn first_blank_positional(&self) -> Option<Owner> {
        self.assignments
            .values()
            .position(|a| a.arg().is_unset() && a.parameter().is_positional_allowed())
            .map(Owner::Param)
    }

    fn raw_owner(&self, raw: usize) -> Owner {
        self.owners.get(raw).copied().unwrap_or(Owner::Command)
    }

    pub(crate) fn assignment_of(&self, owner: Owner) -> &Assignment {
        let found = match owner {
            Owner::Command => None,
            Owner::Param(p) => self.assignments.get_index(p).map(|(_, a)| a),
            Owner::Unassigned(u) => self.unassigned.get(u),
        };
        found.unwrap_or(&self.command_assignment)
    }

    /// Indices of the raw arguments `owner` was built from, in order.
    pub(crate) fn owned_raws(&self, owner: Owner) -> Vec<usize> {
        self.owners
            .iter()
            .enumerate()
            .filter(|(_, o)| **o == owner)
            .map(|(i, _)| i)
            .collect()
    }

    /// Runs `f` with a context holding the current command and conversions.
    pub(crate) fn with_context<R>(&self, f: impl FnOnce(&ParseContext) -> R) -> R {
        let conversions = self.conversions();
        let ctx = ParseContext::new(&self.canon)
            .with_command(self.command().map(|command| &**command))
            .with_conversions(&conversions);
        f(&ctx)
    }

    /// The current conversion of every parameter, by name.
    pub(crate) fn conversions(&self) -> IndexMap<String, Conversion> {
        self.assignments
            .iter()
            .map(|(name, assignment)| (name.clone(), assignment.conversion().clone()))
            .collect()
    }
}

impl Debug for Requisition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Requisition")
            .field("typed", &self.typed)
            .field("command", &self.command().map(|c| c.name().to_string()))
            .field("status", &self.status())
            .finish()
    }
}

fn same_command(a: Option<&Arc<Command>>, b: Option<&Arc<Command>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// True if `text` has to be quoted to stay one argument.
pub(crate) fn needs_quotes(text: &str) -> bool {
    let mut previous = None;
    for c in text.chars() {
        if c == ' ' && previous != Some('\\') {
            return true;
        }
        previous = Some(c);
    }
    text.is_empty()
}

/// `text`, single-quoted if it would otherwise not be one argument.
pub(crate) fn quote(text: &str) -> String {
    if needs_quotes(text) {
        format!("'{text}'")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::canon::{CommandSpec, DefaultValue, ParamSpec};
    use crate::output::Reply;

    fn canon() -> Arc<Canon> {
        let canon = Canon::new();
        canon
            .add_command(
                CommandSpec::new("tsu")
                    .param(ParamSpec::new("num").type_ref("number"))
                    .group(
                        "Options",
                        vec![ParamSpec::new("name").default_value(DefaultValue::Null)],
                    )
                    .exec(|_, _| Ok(Reply::none())),
            )
            .unwrap();
        canon
            .add_command(CommandSpec::new("tsv").exec(|_, _| Ok(Reply::none())))
            .unwrap();
        Arc::new(canon)
    }

    #[test]
    fn test_empty_line() {
        let requisition = Requisition::new(canon());
        assert_eq!(requisition.text(), "");
        assert!(requisition.command().is_none());
        assert_eq!(requisition.status(), Status::Error);
        assert!(requisition.input_status_markup(0).is_empty());
    }

    #[test]
    fn test_status_of_partial_line() {
        let mut requisition = Requisition::new(canon());
        requisition.update("tsu");
        assert_eq!(
            requisition.assignment("num").unwrap().status(),
            Status::Incomplete
        );
        assert_eq!(requisition.status(), Status::Error);
        assert_eq!(
            requisition.status_message().as_deref(),
            Some("Value required for 'num'")
        );

        requisition.update("tsu 4");
        assert_eq!(requisition.status(), Status::Valid);
        assert_eq!(requisition.status_message(), None);
    }

    #[test]
    fn test_half_typed_switch_is_incomplete() {
        let mut requisition = Requisition::new(canon());
        requisition.update("tsu 4 --na");
        assert_eq!(requisition.unassigned().len(), 1);
        assert_eq!(requisition.status(), Status::Incomplete);
        let names: Vec<String> = requisition.unassigned()[0]
            .predictions()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["--name"]);

        requisition.update("tsu 4 extra");
        assert_eq!(requisition.status(), Status::Error);
    }

    #[test]
    fn test_assignment_at() {
        let mut requisition = Requisition::new(canon());
        requisition.update("tsu 4");
        assert!(requisition.assignment_at(0).is_command());
        assert!(requisition.assignment_at(3).is_command());
        assert_eq!(requisition.assignment_at(4).name(), "num");
        assert_eq!(requisition.assignment_at(5).name(), "num");
        assert_eq!(requisition.assignment_at(99).name(), "num");

        requisition.update("tsu ");
        assert_eq!(requisition.assignment_at(4).name(), "num");
    }

    #[test]
    fn test_named_suffix_stays() {
        let mut requisition = Requisition::new(canon());
        requisition.update("tsu 4 --name ");
        assert_eq!(requisition.assignment_at(13).name(), "name");
    }

    #[test]
    fn test_markup_escalates_incomplete() {
        let mut requisition = Requisition::new(canon());
        requisition.update("tsv");
        assert_eq!(
            requisition.input_status_markup(3),
            vec![StatusSpan {
                status: Status::Valid,
                text: "tsv".to_string()
            }]
        );

        requisition.update("ts");
        assert_eq!(
            requisition.input_status_markup(2)[0].status,
            Status::Incomplete
        );

        requisition.update("ts ");
        assert_eq!(
            requisition.input_status_markup(3),
            vec![
                StatusSpan {
                    status: Status::Error,
                    text: "ts".to_string()
                },
                StatusSpan {
                    status: Status::Valid,
                    text: " ".to_string()
                },
            ]
        );

        requisition.update("tsu 4 --na x");
        let markup = requisition.input_status_markup(12);
        let statuses: Vec<(Status, &str)> =
            markup.iter().map(|s| (s.status, s.text.as_str())).collect();
        assert_eq!(
            statuses,
            vec![
                (Status::Valid, "tsu 4 "),
                (Status::Error, "--na"),
                (Status::Valid, " "),
                (Status::Error, "x"),
            ]
        );
    }

    #[test]
    fn test_change_events() {
        let mut requisition = Requisition::new(canon());
        let changes = Arc::new(Mutex::new(Vec::new()));
        let texts = Arc::new(Mutex::new(Vec::new()));
        let sink = changes.clone();
        requisition
            .on_assignment_change()
            .subscribe(move |change: &AssignmentChange| {
                sink.lock().unwrap().push(change.name.clone());
            });
        let sink = texts.clone();
        requisition
            .on_text_change()
            .subscribe(move |text: &String| sink.lock().unwrap().push(text.clone()));

        requisition.update("tsu");
        requisition.update("tsu 4");
        requisition.update("tsu 4 ");

        assert_eq!(
            *changes.lock().unwrap(),
            vec![COMMAND_ASSIGNMENT_NAME, "num", "num"]
        );
        assert_eq!(*texts.lock().unwrap(), vec!["tsu", "tsu 4", "tsu 4 "]);
    }

    #[test]
    fn test_needs_quotes() {
        assert!(needs_quotes(""));
        assert!(needs_quotes("a b"));
        assert!(!needs_quotes("a\\ b"));
        assert!(!needs_quotes("ab"));
    }
}
