//! The embedding application, as seen by the host-backed types.

use std::fmt::Debug;

use crate::types::TypeSpec;
use crate::value::Value;

/// A configurable setting exposed by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct Setting {
    pub name: String,
    /// The type values of this setting are parsed with.
    pub type_spec: TypeSpec,
    pub description: Option<String>,
    pub value: Option<Value>,
}

impl Setting {
    pub fn new(name: impl Into<String>, type_spec: TypeSpec) -> Self {
        Self {
            name: name.into(),
            type_spec,
            description: None,
            value: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }
}

/// Answers the `node`, `nodelist`, `resource`, `setting` and
/// `setting_value` types.
///
/// Every method has an empty default, so a host only implements what it
/// has.
pub trait Host: Send + Sync + Debug {
    /// Nodes matching `query`.
    ///
    /// # Errors
    ///
    /// A message describing why `query` is malformed.
    fn select_nodes(&self, _query: &str) -> Result<Vec<String>, String> {
        Ok(Vec::new())
    }

    /// Names of the resources of `kind`, or of every kind if `None`.
    fn resources(&self, _kind: Option<&str>) -> Vec<String> {
        Vec::new()
    }

    fn settings(&self) -> Vec<Setting> {
        Vec::new()
    }
}

/// A host with nothing in it.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyHost;

impl Host for EmptyHost {}
