//! The type system: how argument text becomes a typed [`Value`].
//!
//! Every parameter has a [`Type`]. Types are looked up by name in a
//! [`TypeRegistry`], which holds either a shared instance (for types without
//! options, such as `boolean`) or a factory that builds a fresh instance from
//! a [`TypeSpec`] (for types like `number` with a minimum and maximum).
//!
//! Built-in types:
//!
//! - `string`, `number`, `boolean`, `selection`, `array`
//! - `deferred` (the real type depends on the value of a sibling parameter)
//! - `blank`, `script`
//! - `command` and `param`, used by the requisition itself
//! - `node`, `nodelist`, `resource`, `setting`, `setting_value`, answered by
//!   the [`Host`](crate::host::Host)

use std::fmt::{Debug, Formatter};
use std::sync::{Arc, RwLock};

use indexmap::IndexMap;
use log::debug;
use serde::Deserialize;

use crate::argument::Argument;
use crate::canon::{Canon, Command};
use crate::conversion::Conversion;
use crate::error::{Error, Result};
use crate::value::Value;

pub mod array;
pub mod command;
pub mod deferred;
pub mod host;
pub mod number;
pub mod param;
pub mod selection;
pub mod string;

pub use array::ArrayType;
pub use command::CommandType;
pub use deferred::{BlankType, DeferredType};
pub use host::{NodeListType, NodeType, ResourceType, SettingType};
pub use number::NumberType;
pub use param::ParamType;
pub use selection::{BooleanType, SelectionType};
pub use string::{ScriptType, StringType};

/// Broad families of types, used by the assigner to decide how arguments
/// are distributed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeClass {
    String,
    Number,
    Boolean,
    Array,
    Other,
}

/// Converts between argument text and values.
pub trait Type: Send + Sync + Debug {
    fn name(&self) -> &str;

    fn class(&self) -> TypeClass {
        TypeClass::Other
    }

    /// Turns a value back into text that [`Type::parse`] accepts.
    fn stringify(&self, value: Option<&Value>, _ctx: &ParseContext) -> String {
        value.map(ToString::to_string).unwrap_or_default()
    }

    fn parse(&self, arg: &Argument, ctx: &ParseContext) -> Conversion;

    /// The conversion used when nothing was typed for a parameter.
    fn blank(&self, _ctx: &ParseContext) -> Conversion {
        Conversion::incomplete(Argument::blank(), None)
    }

    /// The value after `value`, if the type has an order.
    fn increment(&self, _value: Option<&Value>, _ctx: &ParseContext) -> Option<Value> {
        None
    }

    /// The value before `value`, if the type has an order.
    fn decrement(&self, _value: Option<&Value>, _ctx: &ParseContext) -> Option<Value> {
        None
    }

    fn parse_str(&self, text: &str, ctx: &ParseContext) -> Conversion {
        self.parse(&Argument::from(text), ctx)
    }
}

/// One row of a selection table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LookupEntry {
    pub name: String,
    pub value: Value,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub description: Option<String>,
}

impl LookupEntry {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
            hidden: false,
            description: None,
        }
    }

    /// An entry whose value is its own name.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(name.clone(), Value::String(name))
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

/// Declares a type: either just its name or its name with options.
///
/// ```
/// use quill_core::types::TypeSpec;
///
/// let spec: TypeSpec = serde_yaml::from_str("{ name: number, min: 0, max: 10 }").unwrap();
/// assert_eq!(spec.name(), "number");
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TypeSpec {
    Name(String),
    Options(TypeOptions),
}

impl TypeSpec {
    pub fn name(&self) -> &str {
        match self {
            TypeSpec::Name(name) => name,
            TypeSpec::Options(options) => &options.name,
        }
    }
}

impl Default for TypeSpec {
    fn default() -> Self {
        TypeSpec::Name("string".to_string())
    }
}

impl From<&str> for TypeSpec {
    fn from(name: &str) -> Self {
        TypeSpec::Name(name.to_string())
    }
}

impl From<TypeOptions> for TypeSpec {
    fn from(options: TypeOptions) -> Self {
        TypeSpec::Options(options)
    }
}

/// Options a type factory may read. Each type uses the few that apply to it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TypeOptions {
    pub name: String,
    /// `number`
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
    pub allow_float: bool,
    /// `string`
    pub allow_blank: bool,
    /// `selection`: names that are also their values
    pub data: Option<Vec<String>>,
    /// `selection`
    pub lookup: Option<Vec<LookupEntry>>,
    /// `array`
    pub subtype: Option<Box<TypeSpec>>,
    /// `deferred` and `setting_value`: the sibling parameter deciding the type
    pub from: Option<String>,
    /// `nodelist`
    pub allow_empty: bool,
    /// `resource`
    pub kind: Option<String>,
}

impl TypeOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A type as given to a parameter: a spec resolved through the registry, or
/// a ready instance.
#[derive(Debug, Clone)]
pub enum TypeRef {
    Spec(TypeSpec),
    Instance(Arc<dyn Type>),
}

impl Default for TypeRef {
    fn default() -> Self {
        TypeRef::Spec(TypeSpec::default())
    }
}

impl From<&str> for TypeRef {
    fn from(name: &str) -> Self {
        TypeRef::Spec(TypeSpec::from(name))
    }
}

impl From<TypeSpec> for TypeRef {
    fn from(spec: TypeSpec) -> Self {
        TypeRef::Spec(spec)
    }
}

impl From<TypeOptions> for TypeRef {
    fn from(options: TypeOptions) -> Self {
        TypeRef::Spec(TypeSpec::Options(options))
    }
}

impl From<Arc<dyn Type>> for TypeRef {
    fn from(instance: Arc<dyn Type>) -> Self {
        TypeRef::Instance(instance)
    }
}

pub type TypeFactory =
    Arc<dyn Fn(&TypeOptions, &TypeRegistry) -> Result<Arc<dyn Type>> + Send + Sync>;

/// What the registry stores under a type name.
#[derive(Clone)]
pub enum TypeEntry {
    Shared(Arc<dyn Type>),
    Factory { name: String, factory: TypeFactory },
}

impl TypeEntry {
    pub fn shared(instance: impl Type + 'static) -> Self {
        TypeEntry::Shared(Arc::new(instance))
    }

    pub fn factory<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&TypeOptions, &TypeRegistry) -> Result<Arc<dyn Type>> + Send + Sync + 'static,
    {
        TypeEntry::Factory {
            name: name.into(),
            factory: Arc::new(factory),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TypeEntry::Shared(instance) => instance.name(),
            TypeEntry::Factory { name, .. } => name,
        }
    }
}

impl Debug for TypeEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeEntry::Shared(instance) => f.debug_tuple("Shared").field(instance).finish(),
            TypeEntry::Factory { name, .. } => f.debug_tuple("Factory").field(name).finish(),
        }
    }
}

/// Types by name.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    entries: RwLock<IndexMap<String, TypeEntry>>,
}

impl TypeRegistry {
    /// A registry holding only the built-in types.
    pub fn new() -> Self {
        let registry = Self::default();
        for entry in builtin_types() {
            let name = entry.name().to_string();
            registry.write().insert(name, entry);
        }
        registry
    }

    /// Adds a type, replacing any type of the same name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingTypeName`] if the entry has an empty name.
    pub fn register_type(&self, entry: TypeEntry) -> Result<()> {
        let name = entry.name().to_string();
        if name.is_empty() {
            return Err(Error::MissingTypeName);
        }
        debug!("Registering type `{name}`");
        self.write().insert(name, entry);
        Ok(())
    }

    /// Returns `false` if nothing was registered under `name`.
    pub fn unregister_type(&self, name: &str) -> bool {
        self.write().shift_remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    /// Resolves a spec to a type instance.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownType`] for unregistered names, or whatever
    /// error the type's factory raises for invalid options.
    pub fn get_type(&self, spec: &TypeSpec) -> Result<Arc<dyn Type>> {
        let name = spec.name();
        // The entry is cloned out so factories can resolve subtypes
        let entry = self
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownType(name.to_string()))?;

        match entry {
            TypeEntry::Shared(instance) => Ok(instance),
            TypeEntry::Factory { factory, .. } => match spec {
                TypeSpec::Name(name) => factory(&TypeOptions::new(name.as_str()), self),
                TypeSpec::Options(options) => factory(options, self),
            },
        }
    }

    pub fn resolve(&self, type_ref: &TypeRef) -> Result<Arc<dyn Type>> {
        match type_ref {
            TypeRef::Spec(spec) => self.get_type(spec),
            TypeRef::Instance(instance) => Ok(instance.clone()),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, IndexMap<String, TypeEntry>> {
        self.entries.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, IndexMap<String, TypeEntry>> {
        self.entries.write().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn builtin_types() -> Vec<TypeEntry> {
    vec![
        TypeEntry::factory("string", |options, _| {
            Ok(Arc::new(StringType::new(options.allow_blank)) as Arc<dyn Type>)
        }),
        TypeEntry::factory("number", |options, _| {
            Ok(Arc::new(NumberType::from_options(options)?) as Arc<dyn Type>)
        }),
        TypeEntry::shared(BooleanType),
        TypeEntry::factory("selection", |options, _| {
            Ok(Arc::new(SelectionType::from_options(options)?) as Arc<dyn Type>)
        }),
        TypeEntry::factory("array", |options, registry| {
            let subtype = options
                .subtype
                .as_deref()
                .ok_or_else(|| Error::invalid_type_options("array", "missing `subtype`"))?;
            Ok(Arc::new(ArrayType::new(registry.get_type(subtype)?)) as Arc<dyn Type>)
        }),
        TypeEntry::factory("deferred", |options, _| {
            let from = options
                .from
                .clone()
                .ok_or_else(|| Error::invalid_type_options("deferred", "missing `from`"))?;
            Ok(Arc::new(DeferredType::new(from)) as Arc<dyn Type>)
        }),
        TypeEntry::shared(BlankType),
        TypeEntry::shared(ScriptType),
        TypeEntry::shared(CommandType),
        TypeEntry::shared(ParamType::new(true)),
        TypeEntry::shared(NodeType),
        TypeEntry::factory("nodelist", |options, _| {
            Ok(Arc::new(NodeListType::new(options.allow_empty)) as Arc<dyn Type>)
        }),
        TypeEntry::factory("resource", |options, _| {
            Ok(Arc::new(ResourceType::new(options.kind.clone())) as Arc<dyn Type>)
        }),
        TypeEntry::shared(SettingType),
        TypeEntry::factory("setting_value", |options, _| {
            let from = options.from.clone().unwrap_or_else(|| "setting".to_string());
            Ok(Arc::new(DeferredType::setting_value(from)) as Arc<dyn Type>)
        }),
    ]
}

/// What a type may look at while parsing, besides the argument itself.
///
/// The requisition parses parameters in declaration order, so
/// [`ParseContext::conversion`] sees every parameter declared before the one
/// being parsed.
#[derive(Clone, Copy)]
pub struct ParseContext<'a> {
    canon: &'a Canon,
    command: Option<&'a Command>,
    conversions: Option<&'a IndexMap<String, Conversion>>,
}

impl<'a> ParseContext<'a> {
    pub fn new(canon: &'a Canon) -> Self {
        Self {
            canon,
            command: None,
            conversions: None,
        }
    }

    #[must_use]
    pub fn with_command(mut self, command: Option<&'a Command>) -> Self {
        self.command = command;
        self
    }

    #[must_use]
    pub fn with_conversions(mut self, conversions: &'a IndexMap<String, Conversion>) -> Self {
        self.conversions = Some(conversions);
        self
    }

    pub fn canon(&self) -> &'a Canon {
        self.canon
    }

    /// The command whose parameters are being parsed.
    pub fn command(&self) -> Option<&'a Command> {
        self.command
    }

    pub fn conversion(&self, param: &str) -> Option<&'a Conversion> {
        self.conversions.and_then(|conversions| conversions.get(param))
    }
}

impl Debug for ParseContext<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParseContext")
            .field("command", &self.command.map(Command::name))
            .field("conversions", &self.conversions.map(IndexMap::len))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Status;

    #[test]
    fn test_builtins_registered() {
        let registry = TypeRegistry::new();
        for name in [
            "string",
            "number",
            "boolean",
            "selection",
            "array",
            "deferred",
            "blank",
            "script",
            "command",
            "param",
            "node",
            "nodelist",
            "resource",
            "setting",
            "setting_value",
        ] {
            assert!(registry.contains(name), "missing {name}");
        }
    }

    #[test]
    fn test_unknown_type_is_an_error() {
        let registry = TypeRegistry::new();
        let error = registry.get_type(&TypeSpec::from("colour")).unwrap_err();
        assert_eq!(error, Error::UnknownType("colour".to_string()));
    }

    #[test]
    fn test_factory_reads_options() {
        let canon = Canon::new();
        let ctx = ParseContext::new(&canon);
        let spec: TypeSpec = serde_yaml::from_str("{ name: number, max: 10 }").unwrap();
        let number = canon.types().get_type(&spec).unwrap();
        assert_eq!(number.class(), TypeClass::Number);
        assert_eq!(number.parse_str("11", &ctx).status(), Status::Error);
    }

    #[test]
    fn test_array_requires_subtype() {
        let registry = TypeRegistry::new();
        assert!(matches!(
            registry.get_type(&TypeSpec::from("array")),
            Err(Error::InvalidTypeOptions { .. })
        ));

        let spec: TypeSpec = serde_yaml::from_str("{ name: array, subtype: number }").unwrap();
        assert_eq!(registry.get_type(&spec).unwrap().class(), TypeClass::Array);
    }

    #[test]
    fn test_register_and_unregister() {
        let registry = TypeRegistry::new();
        registry
            .register_type(TypeEntry::factory("flavour", |_, _| {
                Ok(Arc::new(SelectionType::new(
                    "flavour",
                    vec![LookupEntry::named("salty"), LookupEntry::named("sweet")],
                )) as Arc<dyn Type>)
            }))
            .unwrap();
        assert!(registry.get_type(&TypeSpec::from("flavour")).is_ok());
        assert!(registry.unregister_type("flavour"));
        assert!(!registry.unregister_type("flavour"));

        let nameless = TypeEntry::factory("", |_, _| Ok(Arc::new(BlankType) as Arc<dyn Type>));
        assert_eq!(
            registry.register_type(nameless),
            Err(Error::MissingTypeName)
        );
    }

    #[test]
    fn test_lookup_spec_from_yaml() {
        let yaml = "{ name: selection, lookup: \
            [{ name: one, value: 1 }, { name: two, value: 2, hidden: true }] }";
        let spec: TypeSpec = serde_yaml::from_str(yaml).unwrap();
        let TypeSpec::Options(options) = spec else {
            panic!("expected options");
        };
        let lookup = options.lookup.unwrap();
        assert_eq!(lookup[0].value, Value::Number(1.0));
        assert!(lookup[1].hidden);
    }
}
