//! Command definitions as written in the YAML config file.
//!
//! ```yaml
//! - name: deploy
//!   description: Deploy a service
//!   command: ["kubectl", "apply", "-f", "{manifest}"]
//!   params:
//!     - name: manifest
//!       type: node
//!     - group: Options
//!       params:
//!         - name: verbose
//!           type: boolean
//! ```
//!
//! A definition without `command` registers a command group, the first
//! word of multi-word commands such as `deploy staging`.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use quill_core::canon::{Canon, CommandSpec, DefaultValue, ParamSpec};
use quill_core::status::Status;
use quill_core::types::{ParseContext, TypeSpec};
use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ParameterDefinition {
    pub name: String,
    #[serde(rename = "type", default)]
    pub type_spec: TypeSpec,
    pub description: Option<String>,
    pub manual: Option<String>,
    /// Typed text, read with the parameter's type.
    pub default: Option<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub hidden: bool,
    pub short: Option<char>,
}

impl ParameterDefinition {
    /// Builds the parameter, reading `default` with the parameter's type.
    ///
    /// # Errors
    ///
    /// Returns an error if the type is unknown or the default is not valid
    /// input for it.
    pub fn to_param_spec(&self, command: &str, canon: &Canon) -> Result<ParamSpec> {
        let default_value = match (&self.default, self.optional) {
            (Some(text), _) => {
                let param_type = canon.get_type(&self.type_spec)?;
                let conversion = param_type.parse_str(text, &ParseContext::new(canon));
                if conversion.status() != Status::Valid {
                    return Err(Error::InvalidDefault {
                        command: command.to_string(),
                        param: self.name.clone(),
                        text: text.clone(),
                        message: conversion.message().unwrap_or("invalid").to_string(),
                    });
                }
                conversion.value().cloned().map_or(DefaultValue::Null, DefaultValue::Value)
            }
            (None, true) => DefaultValue::Null,
            (None, false) => DefaultValue::Undefined,
        };

        let mut spec = ParamSpec::new(self.name.as_str())
            .type_ref(self.type_spec.clone())
            .default_value(default_value)
            .hidden(self.hidden);
        if let Some(description) = &self.description {
            spec = spec.description(description.as_str());
        }
        if let Some(manual) = &self.manual {
            spec = spec.manual(manual.as_str());
        }
        if let Some(short) = self.short {
            spec = spec.short(short);
        }
        Ok(spec)
    }
}

impl Display for ParameterDefinition {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "`{}`", self.name)?;

        if let Some(desc) = &self.description {
            write!(formatter, " ({desc})")?;
        }

        Ok(())
    }
}

/// A parameter, or a named group of parameters only settable by name.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ParamEntryDefinition {
    Group {
        group: String,
        params: Vec<ParameterDefinition>,
    },
    Param(ParameterDefinition),
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct CommandDefinition {
    pub name: String,
    pub description: Option<String>,
    pub manual: Option<String>,
    #[serde(default)]
    pub hidden: bool,
    /// Template arguments joined into the shell line. `{param}` is
    /// replaced by the parameter's value.
    pub command: Option<Vec<String>>,
    pub working_directory: Option<String>,
    pub environment: Option<HashMap<String, String>>,
    /// Run on a thread instead of blocking the prompt.
    #[serde(default)]
    pub background: bool,
    pub params: Option<Vec<ParamEntryDefinition>>,
}

impl CommandDefinition {
    /// Every parameter, groups flattened, in declaration order.
    pub fn parameters(&self) -> impl Iterator<Item = &ParameterDefinition> {
        self.params.iter().flatten().flat_map(|entry| match entry {
            ParamEntryDefinition::Group { params, .. } => params.iter().collect::<Vec<_>>(),
            ParamEntryDefinition::Param(param) => vec![param],
        })
    }

    pub fn is_group(&self) -> bool {
        self.command.is_none()
    }

    /// The command as registered, without its exec function.
    ///
    /// # Errors
    ///
    /// Returns an error if a parameter's type or default is invalid.
    pub fn to_command_spec(&self, canon: &Canon) -> Result<CommandSpec> {
        let mut spec = CommandSpec::new(self.name.as_str()).hidden(self.hidden);
        if let Some(description) = &self.description {
            spec = spec.description(description.as_str());
        }
        if let Some(manual) = &self.manual {
            spec = spec.manual(manual.as_str());
        }

        for entry in self.params.iter().flatten() {
            spec = match entry {
                ParamEntryDefinition::Param(param) => {
                    spec.param(param.to_param_spec(&self.name, canon)?)
                }
                ParamEntryDefinition::Group { group, params } => {
                    let params = params
                        .iter()
                        .map(|param| param.to_param_spec(&self.name, canon))
                        .collect::<Result<Vec<_>>>()?;
                    spec.group(group.as_str(), params)
                }
            };
        }
        Ok(spec)
    }
}

impl Display for CommandDefinition {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.description {
            Some(desc) => write!(formatter, "{} ({desc})", self.name),
            None => formatter.write_str(&self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::value::Value;

    fn parse(yaml: &str) -> Vec<CommandDefinition> {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_minimal_definition() {
        let defs = parse("- name: hello\n  command: [echo, hello]\n");
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "hello");
        assert_eq!(
            defs[0].command,
            Some(vec!["echo".to_string(), "hello".to_string()])
        );
        assert!(!defs[0].background);
        assert!(!defs[0].is_group());
        assert_eq!(defs[0].parameters().count(), 0);
    }

    #[test]
    fn test_groups_and_types() {
        let defs = parse(
            r#"
- name: git
  description: Git helpers
- name: git log
  command: ["git", "log", "-n", "{count}"]
  params:
    - name: count
      type: { name: number, min: 1 }
      default: "10"
    - group: Options
      params:
        - name: oneline
          type: boolean
"#,
        );
        assert!(defs[0].is_group());
        assert_eq!(format!("{}", defs[0]), "git (Git helpers)");

        let names: Vec<&str> = defs[1].parameters().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["count", "oneline"]);
        assert_eq!(
            defs[1].parameters().next().unwrap().type_spec.name(),
            "number"
        );
        assert_eq!(
            defs[1].parameters().nth(1).unwrap().type_spec.name(),
            "boolean"
        );
    }

    #[test]
    fn test_default_is_read_with_type() {
        let canon = Canon::new();
        let param: ParameterDefinition =
            serde_yaml::from_str("{ name: count, type: number, default: '10' }").unwrap();
        let spec = param.to_param_spec("log", &canon).unwrap();
        assert_eq!(spec.default_value, DefaultValue::Value(Value::from(10i64)));

        let bad: ParameterDefinition =
            serde_yaml::from_str("{ name: count, type: number, default: ten }").unwrap();
        assert!(matches!(
            bad.to_param_spec("log", &canon),
            Err(Error::InvalidDefault { .. })
        ));
    }

    #[test]
    fn test_optional_without_default_is_null() {
        let canon = Canon::new();
        let param: ParameterDefinition =
            serde_yaml::from_str("{ name: label, optional: true }").unwrap();
        assert_eq!(
            param.to_param_spec("x", &canon).unwrap().default_value,
            DefaultValue::Null
        );

        let required: ParameterDefinition = serde_yaml::from_str("{ name: label }").unwrap();
        assert_eq!(
            required.to_param_spec("x", &canon).unwrap().default_value,
            DefaultValue::Undefined
        );
    }

    #[test]
    fn test_command_spec_registers() {
        let canon = Canon::new();
        let defs = parse(
            r#"
- name: greet
  command: ["echo", "{name}"]
  params:
    - name: name
    - group: Options
      params:
        - name: times
          type: number
          default: "1"
"#,
        );
        let command = canon.add_command(defs[0].to_command_spec(&canon).unwrap()).unwrap();
        assert_eq!(command.params().len(), 2);
        assert_eq!(command.params()[1].group(), Some("Options"));
        assert!(!command.is_executable());
    }
}
