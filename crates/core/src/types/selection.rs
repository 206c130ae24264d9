//! Types that pick one value out of a table of names.
//!
//! Matching a typed name against a table, in order of preference:
//!
//! 1. exact matches (hidden entries included)
//! 2. case-insensitive prefix matches
//! 3. case-insensitive infix matches, while there are few predictions
//! 4. fuzzy matches, only when nothing else matched
//!
//! Once the argument has a suffix the user has moved on, so only an exact
//! match is offered.

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;

use crate::argument::{Argument, ArgumentKind};
use crate::conversion::{Conversion, Prediction, MAX_PREDICTIONS};
use crate::error::{Error, Result};
use crate::status::Status;
use crate::types::{LookupEntry, ParseContext, Type, TypeClass, TypeOptions};
use crate::value::Value;

/// Predictions for `arg` out of `entries`.
pub(crate) fn find_predictions(entries: &[LookupEntry], arg: &Argument) -> Vec<Prediction> {
    fn add(entry: &LookupEntry, predictions: &mut Vec<Prediction>) {
        if predictions.len() < MAX_PREDICTIONS
            && !predictions.iter().any(|p| p.name == entry.name)
        {
            predictions.push(
                Prediction::new(entry.name.clone(), entry.value.clone())
                    .with_description(entry.description.clone()),
            );
        }
    }

    let text = arg.text();
    let mut predictions: Vec<Prediction> = Vec::new();

    for entry in entries.iter().filter(|entry| entry.name == text) {
        add(entry, &mut predictions);
    }

    if !arg.suffix().is_empty() {
        return predictions;
    }

    let lowered = text.to_lowercase();
    let visible = || entries.iter().filter(|entry| !entry.hidden);

    for entry in visible().filter(|entry| entry.name.to_lowercase().starts_with(&lowered)) {
        add(entry, &mut predictions);
    }

    if predictions.len() < MAX_PREDICTIONS / 2 {
        for entry in visible().filter(|entry| entry.name.to_lowercase().contains(&lowered)) {
            add(entry, &mut predictions);
        }
    }

    if predictions.is_empty() && !text.is_empty() {
        let matcher = SkimMatcherV2::default();
        let mut scored: Vec<(i64, &LookupEntry)> = visible()
            .filter_map(|entry| matcher.fuzzy_match(&entry.name, text).map(|score| (score, entry)))
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        for (_, entry) in scored {
            add(entry, &mut predictions);
        }
    }

    predictions
}

/// Parses `arg` as one of `entries`.
pub(crate) fn parse_selection(entries: &[LookupEntry], arg: &Argument) -> Conversion {
    let predictions = find_predictions(entries, arg);

    if let Some(first) = predictions.first() {
        if first.name == arg.text() {
            let value = first.value.clone();
            return Conversion::new(Some(value), arg.clone()).with_predictions(predictions);
        }
    }

    let message = format!("Can't use '{}'.", arg.text());
    let status = if predictions.is_empty() {
        Status::Error
    } else {
        Status::Incomplete
    };
    Conversion::new(None, arg.clone())
        .with_status(status, Some(message))
        .with_predictions(predictions)
}

/// Steps through `entries` relative to `value`.
///
/// Incrementing moves towards the start of the table and decrementing
/// towards the end, both wrapping around.
pub(crate) fn cycle(
    entries: &[LookupEntry],
    value: Option<&Value>,
    increment: bool,
) -> Option<Value> {
    if entries.is_empty() {
        return None;
    }
    let position = value.and_then(|value| entries.iter().position(|entry| &entry.value == value));

    let index = if increment {
        match position.unwrap_or(1) {
            0 => entries.len() - 1,
            index => index - 1,
        }
    } else {
        let next = position.unwrap_or(0) + 1;
        if next >= entries.len() {
            0
        } else {
            next
        }
    };

    Some(entries[index].value.clone())
}

/// One value out of a fixed table.
#[derive(Debug, Clone)]
pub struct SelectionType {
    name: String,
    entries: Vec<LookupEntry>,
}

impl SelectionType {
    pub fn new(name: impl Into<String>, entries: Vec<LookupEntry>) -> Self {
        Self {
            name: name.into(),
            entries,
        }
    }

    /// Builds a selection from `data` (names that are their own values)
    /// and `lookup` (explicit entries).
    ///
    /// # Errors
    ///
    /// Fails if neither is given.
    pub fn from_options(options: &TypeOptions) -> Result<Self> {
        let mut entries: Vec<LookupEntry> = options
            .data
            .iter()
            .flatten()
            .map(|name| LookupEntry::named(name.as_str()))
            .collect();
        entries.extend(options.lookup.iter().flatten().cloned());

        if entries.is_empty() {
            return Err(Error::invalid_type_options(
                &options.name,
                "a selection needs `data` or `lookup`",
            ));
        }
        Ok(Self::new(options.name.as_str(), entries))
    }

    pub fn entries(&self) -> &[LookupEntry] {
        &self.entries
    }
}

impl Type for SelectionType {
    fn name(&self) -> &str {
        &self.name
    }

    fn stringify(&self, value: Option<&Value>, _ctx: &ParseContext) -> String {
        let Some(value) = value else {
            return String::new();
        };
        self.entries
            .iter()
            .find(|entry| &entry.value == value)
            .map(|entry| entry.name.clone())
            .unwrap_or_else(|| value.to_string())
    }

    fn parse(&self, arg: &Argument, _ctx: &ParseContext) -> Conversion {
        parse_selection(&self.entries, arg)
    }

    fn increment(&self, value: Option<&Value>, _ctx: &ParseContext) -> Option<Value> {
        cycle(&self.entries, value, true)
    }

    fn decrement(&self, value: Option<&Value>, _ctx: &ParseContext) -> Option<Value> {
        cycle(&self.entries, value, false)
    }
}

/// `true` or `false`. As a switch, presence means `true`.
#[derive(Debug, Clone, Default)]
pub struct BooleanType;

impl BooleanType {
    fn entries() -> [LookupEntry; 2] {
        [
            LookupEntry::new("false", Value::Bool(false)),
            LookupEntry::new("true", Value::Bool(true)),
        ]
    }
}

impl Type for BooleanType {
    fn name(&self) -> &str {
        "boolean"
    }

    fn class(&self) -> TypeClass {
        TypeClass::Boolean
    }

    fn parse(&self, arg: &Argument, _ctx: &ParseContext) -> Conversion {
        match arg.kind() {
            ArgumentKind::TrueNamed(_) => Conversion::new(Some(Value::Bool(true)), arg.clone()),
            ArgumentKind::FalseNamed => Conversion::new(Some(Value::Bool(false)), arg.clone()),
            _ => parse_selection(&Self::entries(), arg),
        }
    }

    fn blank(&self, _ctx: &ParseContext) -> Conversion {
        Conversion::new(Some(Value::Bool(false)), Argument::blank())
    }

    fn increment(&self, value: Option<&Value>, _ctx: &ParseContext) -> Option<Value> {
        cycle(&Self::entries(), value, true)
    }

    fn decrement(&self, value: Option<&Value>, _ctx: &ParseContext) -> Option<Value> {
        cycle(&Self::entries(), value, false)
    }
}
