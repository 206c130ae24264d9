//! Types whose identity is only known while parsing.

use std::sync::Arc;

use log::debug;

use crate::argument::Argument;
use crate::conversion::Conversion;
use crate::types::{ParseContext, Type, TypeSpec};
use crate::value::Value;

/// Accepts nothing in particular. Used where a deferred type cannot be
/// resolved yet.
#[derive(Debug, Clone, Default)]
pub struct BlankType;

impl Type for BlankType {
    fn name(&self) -> &str {
        "blank"
    }

    fn stringify(&self, _value: Option<&Value>, _ctx: &ParseContext) -> String {
        String::new()
    }

    fn parse(&self, arg: &Argument, _ctx: &ParseContext) -> Conversion {
        Conversion::new(None, arg.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    /// The sibling's value names a registered type.
    TypeName,
    /// The sibling's value names a host setting, whose type is used.
    Setting,
}

/// Delegates to a type chosen by the value of a sibling parameter.
///
/// The sibling must be declared before this parameter so that its
/// conversion is in the [`ParseContext`]. Until it has a usable value the
/// [`BlankType`] stands in.
#[derive(Debug, Clone)]
pub struct DeferredType {
    from: String,
    source: Source,
}

impl DeferredType {
    pub fn new(from: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            source: Source::TypeName,
        }
    }

    /// The value of the setting named by the sibling parameter `from`.
    pub fn setting_value(from: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            source: Source::Setting,
        }
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    /// The type to delegate to in this context.
    pub fn resolve(&self, ctx: &ParseContext) -> Arc<dyn Type> {
        self.try_resolve(ctx).unwrap_or_else(|| Arc::new(BlankType))
    }

    fn try_resolve(&self, ctx: &ParseContext) -> Option<Arc<dyn Type>> {
        let selected = ctx.conversion(&self.from)?.value()?.as_str()?;
        let spec = match self.source {
            Source::TypeName => TypeSpec::Name(selected.to_string()),
            Source::Setting => ctx
                .canon()
                .host()
                .settings()
                .into_iter()
                .find(|setting| setting.name == selected)?
                .type_spec,
        };

        match ctx.canon().types().get_type(&spec) {
            Ok(resolved) => Some(resolved),
            Err(e) => {
                debug!("Deferred type on `{}` could not resolve: {e}", self.from);
                None
            }
        }
    }
}

impl Type for DeferredType {
    fn name(&self) -> &str {
        match self.source {
            Source::TypeName => "deferred",
            Source::Setting => "setting_value",
        }
    }

    fn stringify(&self, value: Option<&Value>, ctx: &ParseContext) -> String {
        self.resolve(ctx).stringify(value, ctx)
    }

    fn parse(&self, arg: &Argument, ctx: &ParseContext) -> Conversion {
        self.resolve(ctx).parse(arg, ctx)
    }

    fn blank(&self, ctx: &ParseContext) -> Conversion {
        self.resolve(ctx).blank(ctx)
    }

    fn increment(&self, value: Option<&Value>, ctx: &ParseContext) -> Option<Value> {
        self.resolve(ctx).increment(value, ctx)
    }

    fn decrement(&self, value: Option<&Value>, ctx: &ParseContext) -> Option<Value> {
        self.resolve(ctx).decrement(value, ctx)
    }
}
