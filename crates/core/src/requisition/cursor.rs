//! Mapping character positions in the line onto assignments.
//!
//! Positions count characters, not bytes.

use crate::argument::Argument;
use crate::status::Status;

/// A selection in the input line. `start == end` for a plain caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub start: usize,
    pub end: usize,
}

impl Cursor {
    pub fn at(position: usize) -> Self {
        Self {
            start: position,
            end: position,
        }
    }
}

/// A run of characters sharing one status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSpan {
    pub status: Status,
    pub text: String,
}

/// Who a raw argument belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Owner {
    Command,
    /// A parameter, by declaration index.
    Param(usize),
    /// An unassigned argument, by index.
    Unassigned(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Part {
    Prefix,
    Text,
    Suffix,
}

/// One character of the line and what it belongs to.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CharTrace {
    pub c: char,
    /// The raw argument the character came from.
    pub raw: usize,
    pub part: Part,
}

/// Traces every character of the line back to its raw argument.
pub(crate) fn trace(raw_args: &[Argument]) -> Vec<CharTrace> {
    let mut traces = Vec::new();
    for (raw, arg) in raw_args.iter().enumerate() {
        let parts = [
            (Part::Prefix, arg.prefix()),
            (Part::Text, arg.text()),
            (Part::Suffix, arg.suffix()),
        ];
        for (part, text) in parts {
            traces.extend(text.chars().map(|c| CharTrace { c, raw, part }));
        }
    }
    traces
}

/// The owner of every character in the line.
///
/// Prefix and text belong to the argument's own owner. Suffix characters
/// look forward: to the next argument's owner, or after the last argument
/// to `trailing` when there is one. The suffix of a named argument stays
/// with its owner, since that is where the value goes.
pub(crate) fn char_owners(
    raw_args: &[Argument],
    owners: &[Owner],
    is_named: impl Fn(Owner) -> bool,
    trailing: Option<Owner>,
) -> Vec<Owner> {
    let mut result = Vec::new();
    for (i, arg) in raw_args.iter().enumerate() {
        let owner = owners.get(i).copied().unwrap_or(Owner::Command);
        let own_chars = arg.prefix().chars().count() + arg.text().chars().count();
        result.extend(std::iter::repeat(owner).take(own_chars));

        let suffix_owner = if is_named(owner) {
            owner
        } else if let Some(next) = owners.get(i + 1) {
            *next
        } else {
            trailing.unwrap_or(owner)
        };
        result.extend(std::iter::repeat(suffix_owner).take(arg.suffix().chars().count()));
    }
    result
}

/// Merges adjacent characters with equal status into spans.
pub(crate) fn merge_spans(chars: impl IntoIterator<Item = (Status, char)>) -> Vec<StatusSpan> {
    let mut spans: Vec<StatusSpan> = Vec::new();
    for (status, c) in chars {
        match spans.last_mut() {
            Some(span) if span.status == status => span.text.push(c),
            _ => spans.push(StatusSpan {
                status,
                text: c.to_string(),
            }),
        }
    }
    spans
}
