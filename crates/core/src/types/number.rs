use crate::argument::Argument;
use crate::conversion::Conversion;
use crate::error::{Error, Result};
use crate::types::{ParseContext, Type, TypeClass, TypeOptions};
use crate::value::{format_number, Value};

/// A number, optionally bounded and restricted to integers.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberType {
    min: Option<f64>,
    max: Option<f64>,
    step: f64,
    allow_float: bool,
}

impl Default for NumberType {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
            step: 1.0,
            allow_float: false,
        }
    }
}

impl NumberType {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// Fails if `step` is not positive or `min` is above `max`.
    pub fn from_options(options: &TypeOptions) -> Result<Self> {
        let step = options.step.unwrap_or(1.0);
        if !(step > 0.0) {
            return Err(Error::invalid_type_options("number", "`step` must be positive"));
        }
        if let (Some(min), Some(max)) = (options.min, options.max) {
            if min > max {
                return Err(Error::invalid_type_options("number", "`min` is above `max`"));
            }
        }

        Ok(Self {
            min: options.min,
            max: options.max,
            step,
            allow_float: options.allow_float,
        })
    }

    #[must_use]
    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    #[must_use]
    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    #[must_use]
    pub fn step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }

    #[must_use]
    pub fn allow_float(mut self, allow_float: bool) -> Self {
        self.allow_float = allow_float;
        self
    }

    fn clamp(&self, value: f64) -> f64 {
        match (self.min, self.max) {
            (Some(min), _) if value < min => min,
            (_, Some(max)) if value > max => max,
            _ => value,
        }
    }
}

impl Type for NumberType {
    fn name(&self) -> &str {
        "number"
    }

    fn class(&self) -> TypeClass {
        TypeClass::Number
    }

    fn stringify(&self, value: Option<&Value>, _ctx: &ParseContext) -> String {
        match value {
            Some(Value::Number(number)) => format_number(*number),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }

    fn parse(&self, arg: &Argument, _ctx: &ParseContext) -> Conversion {
        let text = arg.text().trim();
        if text.trim_start_matches('-').is_empty() {
            return Conversion::incomplete(arg.clone(), None);
        }

        let invalid = || {
            let message = format!("Can't convert \"{text}\" to a number.");
            Conversion::error(arg.clone(), Some(message))
        };
        if !self.allow_float && text.contains('.') {
            return invalid();
        }
        let Ok(value) = text.parse::<f64>() else {
            return invalid();
        };
        if !value.is_finite() {
            return invalid();
        }

        if let Some(max) = self.max {
            if value > max {
                return Conversion::error(
                    arg.clone(),
                    Some(format!(
                        "{text} is greater than maximum allowed: {}.",
                        format_number(max)
                    )),
                );
            }
        }
        if let Some(min) = self.min {
            if value < min {
                return Conversion::error(
                    arg.clone(),
                    Some(format!(
                        "{text} is smaller than minimum allowed: {}.",
                        format_number(min)
                    )),
                );
            }
        }

        Conversion::new(Some(Value::Number(value)), arg.clone())
    }

    fn increment(&self, value: Option<&Value>, _ctx: &ParseContext) -> Option<Value> {
        let Some(value) = value.and_then(Value::as_f64) else {
            return Some(Value::Number(self.min.unwrap_or(0.0)));
        };
        // Snap onto a multiple of the step
        let next = ((value + self.step) / self.step).floor() * self.step;
        Some(Value::Number(if self.max.is_some() { self.clamp(next) } else { next }))
    }

    fn decrement(&self, value: Option<&Value>, _ctx: &ParseContext) -> Option<Value> {
        let Some(value) = value.and_then(Value::as_f64) else {
            return Some(Value::Number(self.max.unwrap_or(1.0)));
        };
        let next = ((value - self.step) / self.step).ceil() * self.step;
        Some(Value::Number(self.clamp(next)))
    }
}
