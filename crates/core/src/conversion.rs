//! The result of parsing one [`Argument`] against a type.

use std::fmt::{Debug, Formatter};
use std::sync::{Arc, OnceLock};

use crate::argument::Argument;
use crate::status::Status;
use crate::value::Value;

/// Upper bound on the number of predictions any conversion reports.
pub const MAX_PREDICTIONS: usize = 11;

/// A candidate completion for the text of an argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub name: String,
    pub value: Value,
    /// More typing is expected after this prediction, so completing with it
    /// does not add a separating space.
    pub incomplete: bool,
    pub description: Option<String>,
}

impl Prediction {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
            incomplete: false,
            description: None,
        }
    }

    #[must_use]
    pub fn incomplete(mut self) -> Self {
        self.incomplete = true;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }
}

type Producer = Arc<dyn Fn() -> Vec<Prediction> + Send + Sync>;

/// A sequence of predictions that is only produced when read.
///
/// Lazy predictions are recomputed on every read since the candidates may
/// change between keystrokes, unless built with [`Predictions::cached`].
#[derive(Clone, Default)]
pub struct Predictions {
    source: Source,
}

#[derive(Clone, Default)]
enum Source {
    #[default]
    Empty,
    Fixed(Arc<Vec<Prediction>>),
    Lazy(Producer),
    Cached(Producer, Arc<OnceLock<Vec<Prediction>>>),
}

impl Predictions {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn fixed(predictions: Vec<Prediction>) -> Self {
        if predictions.is_empty() {
            return Self::none();
        }
        Self {
            source: Source::Fixed(Arc::new(predictions)),
        }
    }

    pub fn lazy<F>(producer: F) -> Self
    where
        F: Fn() -> Vec<Prediction> + Send + Sync + 'static,
    {
        Self {
            source: Source::Lazy(Arc::new(producer)),
        }
    }

    /// Like [`Predictions::lazy`] but the first evaluation is kept.
    pub fn cached<F>(producer: F) -> Self
    where
        F: Fn() -> Vec<Prediction> + Send + Sync + 'static,
    {
        Self {
            source: Source::Cached(Arc::new(producer), Arc::new(OnceLock::new())),
        }
    }

    /// Evaluates the predictions, capped at [`MAX_PREDICTIONS`].
    pub fn get(&self) -> Vec<Prediction> {
        let mut predictions = match &self.source {
            Source::Empty => return Vec::new(),
            Source::Fixed(predictions) => predictions.as_ref().clone(),
            Source::Lazy(producer) => producer(),
            Source::Cached(producer, cache) => cache.get_or_init(|| producer()).clone(),
        };
        predictions.truncate(MAX_PREDICTIONS);
        predictions
    }

    /// True if it is known without evaluating that there are no predictions.
    pub fn is_none(&self) -> bool {
        matches!(self.source, Source::Empty)
    }
}

impl Debug for Predictions {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.source {
            Source::Empty => f.write_str("Predictions::None"),
            Source::Fixed(predictions) => f
                .debug_tuple("Predictions::Fixed")
                .field(predictions)
                .finish(),
            Source::Lazy(_) => f.write_str("Predictions::Lazy"),
            Source::Cached(_, _) => f.write_str("Predictions::Cached"),
        }
    }
}

impl From<Vec<Prediction>> for Predictions {
    fn from(predictions: Vec<Prediction>) -> Self {
        Predictions::fixed(predictions)
    }
}

/// The outcome of parsing an argument.
///
/// Two conversions are equal when they hold equal values parsed from equal
/// arguments; status, message and predictions are derived from those.
#[derive(Debug, Clone)]
pub struct Conversion {
    value: Option<Value>,
    arg: Argument,
    status: Status,
    message: Option<String>,
    predictions: Predictions,
    children: Vec<Conversion>,
}

impl Conversion {
    /// A valid conversion.
    pub fn new(value: Option<Value>, arg: Argument) -> Self {
        Self {
            value,
            arg,
            status: Status::Valid,
            message: None,
            predictions: Predictions::none(),
            children: Vec::new(),
        }
    }

    pub fn incomplete(arg: Argument, message: Option<String>) -> Self {
        Self::new(None, arg).with_status(Status::Incomplete, message)
    }

    pub fn error(arg: Argument, message: Option<String>) -> Self {
        Self::new(None, arg).with_status(Status::Error, message)
    }

    /// Aggregates per-member conversions of an array argument. The value is
    /// the list of member values, the status the worst member status and the
    /// message the first member message.
    pub fn array(children: Vec<Conversion>, arg: Argument) -> Self {
        let values = children.iter().filter_map(|child| child.value.clone()).collect();
        let status = Status::combine(children.iter().map(|child| child.status));
        let message = children.iter().find_map(|child| child.message.clone());

        Self {
            value: Some(Value::Array(values)),
            arg,
            status,
            message,
            predictions: Predictions::none(),
            children,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: Status, message: Option<String>) -> Self {
        self.status = status;
        self.message = message;
        self
    }

    #[must_use]
    pub fn with_predictions(mut self, predictions: impl Into<Predictions>) -> Self {
        self.predictions = predictions.into();
        self
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn arg(&self) -> &Argument {
        &self.arg
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn predictions(&self) -> Vec<Prediction> {
        self.predictions.get()
    }

    /// Member conversions of an array conversion.
    pub fn children(&self) -> &[Conversion] {
        &self.children
    }

    /// True if the user supplied something for this conversion.
    pub fn is_data_provided(&self) -> bool {
        self.value.is_some() || !self.arg.text().is_empty()
    }
}

impl PartialEq for Conversion {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.arg == other.arg
    }
}
