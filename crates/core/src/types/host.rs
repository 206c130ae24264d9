//! Types backed by the [`Host`](crate::host::Host) installed on the canon.

use crate::argument::Argument;
use crate::conversion::{Conversion, Prediction, Predictions};
use crate::status::Status;
use crate::types::selection::{cycle, parse_selection};
use crate::types::{LookupEntry, ParseContext, Type};
use crate::value::Value;

/// Query text for the nodes whose names start with `text`.
fn prefix_query(text: &str) -> String {
    format!("{text}*")
}

/// Completions for a node query, computed when read.
fn node_predictions(ctx: &ParseContext, text: &str) -> Predictions {
    let host = ctx.canon().host();
    let query = prefix_query(text);
    Predictions::lazy(move || {
        host.select_nodes(&query)
            .unwrap_or_default()
            .into_iter()
            .map(|node| Prediction::new(node.clone(), Value::String(node)))
            .collect()
    })
}

/// Exactly one node.
#[derive(Debug, Clone, Default)]
pub struct NodeType;

impl Type for NodeType {
    fn name(&self) -> &str {
        "node"
    }

    fn parse(&self, arg: &Argument, ctx: &ParseContext) -> Conversion {
        let text = arg.text();
        if text.is_empty() {
            return Conversion::incomplete(arg.clone(), Some("Empty".to_string()))
                .with_predictions(node_predictions(ctx, text));
        }

        match ctx.canon().host().select_nodes(text) {
            Err(message) => Conversion::error(arg.clone(), Some(message)),
            Ok(nodes) => match nodes.as_slice() {
                [] => Conversion::incomplete(arg.clone(), Some("No matches".to_string()))
                    .with_predictions(node_predictions(ctx, text)),
                [node] => Conversion::new(Some(Value::String(node.clone())), arg.clone()),
                _ => Conversion::error(
                    arg.clone(),
                    Some(format!("Too many matches ({})", nodes.len())),
                ),
            },
        }
    }
}

/// Any number of nodes.
#[derive(Debug, Clone, Default)]
pub struct NodeListType {
    allow_empty: bool,
}

impl NodeListType {
    pub fn new(allow_empty: bool) -> Self {
        Self { allow_empty }
    }
}

impl Type for NodeListType {
    fn name(&self) -> &str {
        "nodelist"
    }

    fn stringify(&self, _value: Option<&Value>, _ctx: &ParseContext) -> String {
        // A node list is only ever described by the query that found it
        String::new()
    }

    fn parse(&self, arg: &Argument, ctx: &ParseContext) -> Conversion {
        let text = arg.text();
        if text.is_empty() {
            let conversion = Conversion::new(Some(Value::Array(Vec::new())), arg.clone());
            return if self.allow_empty {
                conversion
            } else {
                conversion.with_status(Status::Incomplete, Some("Empty".to_string()))
            };
        }

        match ctx.canon().host().select_nodes(text) {
            Err(message) => Conversion::error(arg.clone(), Some(message)),
            Ok(nodes) if nodes.is_empty() && !self.allow_empty => {
                Conversion::incomplete(arg.clone(), Some("No matches".to_string()))
                    .with_predictions(node_predictions(ctx, text))
            }
            Ok(nodes) => Conversion::new(
                Some(Value::Array(nodes.into_iter().map(Value::String).collect())),
                arg.clone(),
            ),
        }
    }

    fn blank(&self, _ctx: &ParseContext) -> Conversion {
        Conversion::new(Some(Value::Array(Vec::new())), Argument::blank())
    }
}

/// One of the host's resources, optionally of a single kind.
#[derive(Debug, Clone, Default)]
pub struct ResourceType {
    kind: Option<String>,
}

impl ResourceType {
    pub fn new(kind: Option<String>) -> Self {
        Self { kind }
    }

    fn entries(&self, ctx: &ParseContext) -> Vec<LookupEntry> {
        ctx.canon()
            .host()
            .resources(self.kind.as_deref())
            .into_iter()
            .map(LookupEntry::named)
            .collect()
    }
}

impl Type for ResourceType {
    fn name(&self) -> &str {
        "resource"
    }

    fn parse(&self, arg: &Argument, ctx: &ParseContext) -> Conversion {
        parse_selection(&self.entries(ctx), arg)
    }

    fn increment(&self, value: Option<&Value>, ctx: &ParseContext) -> Option<Value> {
        cycle(&self.entries(ctx), value, true)
    }

    fn decrement(&self, value: Option<&Value>, ctx: &ParseContext) -> Option<Value> {
        cycle(&self.entries(ctx), value, false)
    }
}

/// The name of one of the host's settings.
#[derive(Debug, Clone, Default)]
pub struct SettingType;

impl SettingType {
    fn entries(ctx: &ParseContext) -> Vec<LookupEntry> {
        ctx.canon()
            .host()
            .settings()
            .into_iter()
            .map(|setting| LookupEntry {
                description: setting.description.clone(),
                ..LookupEntry::named(setting.name)
            })
            .collect()
    }
}

impl Type for SettingType {
    fn name(&self) -> &str {
        "setting"
    }

    fn parse(&self, arg: &Argument, ctx: &ParseContext) -> Conversion {
        parse_selection(&Self::entries(ctx), arg)
    }

    fn increment(&self, value: Option<&Value>, ctx: &ParseContext) -> Option<Value> {
        cycle(&Self::entries(ctx), value, true)
    }

    fn decrement(&self, value: Option<&Value>, ctx: &ParseContext) -> Option<Value> {
        cycle(&Self::entries(ctx), value, false)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::canon::Canon;
    use crate::host::{Host, Setting};
    use crate::types::TypeSpec;

    #[derive(Debug)]
    struct FakeHost;

    impl Host for FakeHost {
        fn select_nodes(&self, query: &str) -> Result<Vec<String>, String> {
            let nodes = ["main.rs", "lib.rs", "mod.rs"];
            if query.starts_with('[') {
                return Err("Syntax error in query".to_string());
            }
            let matches = match query.strip_suffix('*') {
                Some(prefix) => nodes.iter().filter(|n| n.starts_with(prefix)).collect::<Vec<_>>(),
                None => nodes.iter().filter(|n| **n == query).collect(),
            };
            Ok(matches.into_iter().map(ToString::to_string).collect())
        }

        fn resources(&self, kind: Option<&str>) -> Vec<String> {
            match kind {
                Some("style") => vec!["dark.css".to_string()],
                _ => vec!["dark.css".to_string(), "app.js".to_string()],
            }
        }

        fn settings(&self) -> Vec<Setting> {
            vec![
                Setting::new("shell", TypeSpec::from("string")),
                Setting::new("dry_run", TypeSpec::from("boolean")),
            ]
        }
    }

    fn canon() -> Canon {
        let canon = Canon::new();
        canon.set_host(Arc::new(FakeHost));
        canon
    }

    #[test]
    fn test_node_counts() {
        let canon = canon();
        let ctx = ParseContext::new(&canon);
        assert_eq!(
            NodeType.parse_str("main.rs", &ctx).value(),
            Some(&Value::from("main.rs"))
        );
        assert_eq!(NodeType.parse_str("*", &ctx).status(), Status::Error);
        assert_eq!(NodeType.parse_str("[", &ctx).status(), Status::Error);

        let none = NodeType.parse_str("ma", &ctx);
        assert_eq!(none.status(), Status::Incomplete);
        assert_eq!(none.predictions()[0].name, "main.rs");
    }

    #[test]
    fn test_nodelist_allow_empty() {
        let canon = canon();
        let ctx = ParseContext::new(&canon);
        assert_eq!(
            NodeListType::new(false).parse_str("x", &ctx).status(),
            Status::Incomplete
        );
        assert_eq!(
            NodeListType::new(true).parse_str("x", &ctx).status(),
            Status::Valid
        );
        let all = NodeListType::new(false).parse_str("*", &ctx);
        assert_eq!(
            all.value().and_then(Value::as_array).map(<[Value]>::len),
            Some(3)
        );
    }

    #[test]
    fn test_resource_kinds() {
        let canon = canon();
        let ctx = ParseContext::new(&canon);
        let styles = ResourceType::new(Some("style".to_string()));
        assert_eq!(styles.parse_str("app.js", &ctx).status(), Status::Error);
        assert_eq!(
            ResourceType::default().parse_str("app.js", &ctx).status(),
            Status::Valid
        );
    }

    #[test]
    fn test_setting_names() {
        let canon = canon();
        let ctx = ParseContext::new(&canon);
        assert_eq!(
            SettingType.parse_str("dry_run", &ctx).value(),
            Some(&Value::from("dry_run"))
        );
        assert_eq!(
            SettingType.parse_str("sh", &ctx).status(),
            Status::Incomplete
        );
    }
}
