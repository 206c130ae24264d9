//! The argument model.
//!
//! An [`Argument`] is a token of typed input that remembers enough of its
//! surroundings to rebuild the original text: for every argument produced by
//! the tokenizer `prefix + text + suffix` is exactly the substring it was cut
//! from. Composite arguments (merged, named, array) are built by the assigner
//! out of those raw tokens and keep them reachable through
//! [`Argument::raw_args`].

use std::fmt::{Display, Formatter};

use itertools::Itertools;

/// A single piece of typed input along with the text around it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    text: String,
    prefix: String,
    suffix: String,
    kind: ArgumentKind,
}

/// The closed set of argument variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentKind {
    /// An ordinary token.
    Plain,
    /// Stands in for input the user did not provide.
    Blank,
    /// A `{ ... }` literal block.
    Script,
    /// Several raw arguments collapsed to feed one parameter.
    Merged(Vec<Argument>),
    /// A `--name value` pair. The value is absent when the switch was the
    /// last thing typed.
    Named {
        name: Box<Argument>,
        value: Option<Box<Argument>>,
    },
    /// A boolean switch that was present.
    TrueNamed(Option<Box<Argument>>),
    /// A boolean switch that was absent.
    FalseNamed,
    /// The members of an array parameter, in the order they were typed.
    Array(Vec<Argument>),
}

/// Options for [`Argument::beget`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BegetOptions {
    /// Replacement text, `None` keeps the current text.
    pub text: Option<String>,
    /// Never wrap the new text in quotes, even if it contains spaces.
    pub dont_quote: bool,
    /// Ensure the prefix starts with a space.
    pub prefix_space: bool,
    /// Ensure the prefix ends with a space.
    pub prefix_post_space: bool,
    /// Ensure the suffix ends with a space.
    pub suffix_space: bool,
}

impl BegetOptions {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn dont_quote(mut self, dont_quote: bool) -> Self {
        self.dont_quote = dont_quote;
        self
    }

    #[must_use]
    pub fn prefix_space(mut self) -> Self {
        self.prefix_space = true;
        self
    }

    #[must_use]
    pub fn suffix_space(mut self, suffix_space: bool) -> Self {
        self.suffix_space = suffix_space;
        self
    }
}

impl Argument {
    /// Creates a plain argument.
    pub fn new(
        text: impl Into<String>,
        prefix: impl Into<String>,
        suffix: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            prefix: prefix.into(),
            suffix: suffix.into(),
            kind: ArgumentKind::Plain,
        }
    }

    /// An argument standing for missing input.
    pub fn blank() -> Self {
        Self {
            text: String::new(),
            prefix: String::new(),
            suffix: String::new(),
            kind: ArgumentKind::Blank,
        }
    }

    /// A script block. Whitespace at either end of the text moves into the
    /// prefix and suffix so that the text is just the script.
    pub fn script(
        text: impl Into<String>,
        prefix: impl Into<String>,
        suffix: impl Into<String>,
    ) -> Self {
        let text = text.into();
        let mut prefix = prefix.into();
        let mut suffix = suffix.into();

        let trimmed_start = text.trim_start_matches(' ');
        prefix.push_str(&text[..text.len() - trimmed_start.len()]);
        let trimmed = trimmed_start.trim_end_matches(' ');
        suffix.insert_str(0, &trimmed_start[trimmed.len()..]);

        Self {
            text: trimmed.to_string(),
            prefix,
            suffix,
            kind: ArgumentKind::Script,
        }
    }

    /// Collapses a run of adjacent arguments into one. The merged text is
    /// everything between the first prefix and the last suffix, so the
    /// original input is still reproduced.
    pub fn merged(args: Vec<Argument>) -> Self {
        let (Some(first), Some(last)) = (args.first(), args.last()) else {
            return Self::blank();
        };

        let prefix = first.prefix.clone();
        let suffix = last.suffix.clone();
        let whole: String = args.iter().map(ToString::to_string).collect();
        let text = whole[prefix.len()..whole.len() - suffix.len()].to_string();

        Self {
            text,
            prefix,
            suffix,
            kind: ArgumentKind::Merged(args),
        }
    }

    /// A `--name value` pair.
    pub fn named(name: Argument, value: Option<Argument>) -> Self {
        let (text, prefix, suffix) = match &value {
            Some(value) => (
                value.text.clone(),
                format!("{name}{}", value.prefix),
                value.suffix.clone(),
            ),
            None => (String::new(), name.to_string(), String::new()),
        };

        Self {
            text,
            prefix,
            suffix,
            kind: ArgumentKind::Named {
                name: Box::new(name),
                value: value.map(Box::new),
            },
        }
    }

    /// A boolean switch that was typed.
    pub fn true_named(arg: Argument) -> Self {
        Self {
            text: arg.text.clone(),
            prefix: arg.prefix.clone(),
            suffix: arg.suffix.clone(),
            kind: ArgumentKind::TrueNamed(Some(Box::new(arg))),
        }
    }

    /// A boolean switch that was not typed.
    pub fn false_named() -> Self {
        Self {
            text: String::new(),
            prefix: String::new(),
            suffix: String::new(),
            kind: ArgumentKind::FalseNamed,
        }
    }

    /// The arguments feeding an array parameter.
    pub fn array(members: Vec<Argument>) -> Self {
        let text = members
            .iter()
            .map(|member| member.text.as_str())
            .join(" ");
        let prefix = members.first().map(|m| m.prefix.clone()).unwrap_or_default();
        let suffix = members.last().map(|m| m.suffix.clone()).unwrap_or_default();

        Self {
            text,
            prefix,
            suffix,
            kind: ArgumentKind::Array(members),
        }
    }

    /// Extends the suffix, used by the tokenizer for trailing whitespace.
    pub(crate) fn push_suffix(&mut self, extra: &str) {
        self.suffix.push_str(extra);
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn kind(&self) -> &ArgumentKind {
        &self.kind
    }

    /// True if there is nothing but whitespace in this argument.
    pub fn is_blank(&self) -> bool {
        self.text.is_empty() && self.prefix.trim().is_empty() && self.suffix.trim().is_empty()
    }

    /// True if this argument was never typed, i.e. it is a [`ArgumentKind::Blank`].
    pub fn is_unset(&self) -> bool {
        matches!(self.kind, ArgumentKind::Blank)
    }

    pub fn is_named(&self) -> bool {
        matches!(self.kind, ArgumentKind::Named { .. })
    }

    pub fn is_script(&self) -> bool {
        matches!(self.kind, ArgumentKind::Script)
    }

    /// The members of an array argument, empty for every other kind.
    pub fn members(&self) -> &[Argument] {
        match &self.kind {
            ArgumentKind::Array(members) => members,
            _ => &[],
        }
    }

    /// The tokenizer-level arguments this argument was built from.
    pub fn raw_args(&self) -> Vec<&Argument> {
        match &self.kind {
            ArgumentKind::Plain | ArgumentKind::Script => vec![self],
            ArgumentKind::Blank | ArgumentKind::FalseNamed | ArgumentKind::TrueNamed(None) => {
                Vec::new()
            }
            ArgumentKind::TrueNamed(Some(arg)) => arg.raw_args(),
            ArgumentKind::Merged(args) | ArgumentKind::Array(args) => {
                args.iter().flat_map(Argument::raw_args).collect()
            }
            ArgumentKind::Named { name, value } => {
                let mut raw = name.raw_args();
                if let Some(value) = value {
                    raw.extend(value.raw_args());
                }
                raw
            }
        }
    }

    /// Derives a replacement for this argument, keeping its prefix and suffix.
    ///
    /// New text containing a space (or empty new text) is wrapped in single
    /// quotes unless the prefix already ends with a quote or
    /// [`BegetOptions::dont_quote`] is set.
    #[must_use]
    pub fn beget(&self, options: &BegetOptions) -> Argument {
        match &self.kind {
            ArgumentKind::Named { name, value } => {
                let value = match value {
                    Some(value) => value.beget(options),
                    None => {
                        let prefix = if name.suffix.is_empty() { " " } else { "" };
                        Argument::new("", prefix, "").beget(options)
                    }
                };
                Argument::named((**name).clone(), Some(value))
            }
            ArgumentKind::TrueNamed(Some(arg)) => {
                let options = BegetOptions {
                    text: None,
                    ..options.clone()
                };
                Argument::true_named(arg.beget(&options))
            }
            ArgumentKind::TrueNamed(None) | ArgumentKind::FalseNamed | ArgumentKind::Array(_) => {
                self.clone()
            }
            ArgumentKind::Plain
            | ArgumentKind::Blank
            | ArgumentKind::Script
            | ArgumentKind::Merged(_) => self.beget_simple(options),
        }
    }

    fn beget_simple(&self, options: &BegetOptions) -> Argument {
        let text = options.text.clone().unwrap_or_else(|| self.text.clone());
        let mut prefix = self.prefix.clone();
        let mut suffix = self.suffix.clone();

        if options.text.is_some() && !options.dont_quote {
            let needs_quote = text.contains(' ') || text.is_empty();
            let has_quote = prefix.ends_with('\'') || prefix.ends_with('"');
            if needs_quote && !has_quote {
                prefix.push('\'');
                suffix.insert(0, '\'');
            }
        }

        if options.prefix_space && !prefix.starts_with(' ') {
            prefix.insert(0, ' ');
        }
        if options.prefix_post_space && !prefix.ends_with(' ') {
            prefix.push(' ');
        }
        if options.suffix_space && !suffix.ends_with(' ') {
            suffix.push(' ');
        }

        if text == self.text && prefix == self.prefix && suffix == self.suffix {
            return self.clone();
        }

        Argument {
            text,
            prefix,
            suffix,
            kind: if self.is_script() {
                ArgumentKind::Script
            } else {
                ArgumentKind::Plain
            },
        }
    }
}

impl Display for Argument {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ArgumentKind::Array(members) => {
                for member in members {
                    write!(f, "{member}")?;
                }
                Ok(())
            }
            _ => write!(f, "{}{}{}", self.prefix, self.text, self.suffix),
        }
    }
}

impl From<&str> for Argument {
    fn from(text: &str) -> Self {
        Argument::new(text, "", "")
    }
}

impl From<String> for Argument {
    fn from(text: String) -> Self {
        Argument::new(text, "", "")
    }
}
