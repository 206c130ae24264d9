use std::collections::HashMap;

use indexmap::IndexSet;
use leon::Template;
use quill_core::output::Args;

use crate::error::Result;

/// Find all tokens in all arguments of templates of command, in order.
pub fn get_tokens(templates: &[Template]) -> IndexSet<String> {
    let mut tokens = IndexSet::new();

    for template in templates {
        for key in template.keys() {
            let _ = tokens.insert((*key).to_string());
        }
    }

    tokens
}

pub fn get_templates(command: &[String]) -> Result<Vec<Template<'_>>> {
    let mut templates: Vec<Template> = Vec::new();

    for argument in command {
        templates.push(Template::parse(argument.as_ref())?);
    }

    Ok(templates)
}

/// Template values from command arguments. Unset arguments render empty.
pub fn build_context(args: &Args) -> HashMap<String, String> {
    args.iter()
        .map(|(name, value)| {
            let text = value.map(ToString::to_string).unwrap_or_default();
            (name.to_string(), text)
        })
        .collect()
}

pub fn interpolate_command(
    context: &HashMap<String, String>,
    templates: &[Template],
) -> Result<Vec<String>> {
    let mut interpolated_arguments: Vec<String> = Vec::new();

    for template in templates {
        interpolated_arguments.push(template.render(&context)?);
    }

    Ok(interpolated_arguments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::value::Value;

    #[test]
    fn test_tokens_keep_first_appearance_order() {
        let command = vec![
            "scp".to_string(),
            "{file}".to_string(),
            "{host}:{path}".to_string(),
            "{file}.bak".to_string(),
        ];
        let templates = get_templates(&command).unwrap();
        let tokens: Vec<String> = get_tokens(&templates).into_iter().collect();
        assert_eq!(tokens, vec!["file", "host", "path"]);
    }

    #[test]
    fn test_invalid_template() {
        let command = vec!["echo {unclosed".to_string()];
        assert!(get_templates(&command).is_err());
    }

    #[test]
    fn test_interpolate_from_args() {
        let mut args = Args::new();
        args.insert("name", Some(Value::from("fred")));
        args.insert("times", Some(Value::from(3i64)));
        args.insert("tags", Some(Value::from(vec![Value::from("a"), Value::from("b")])));
        args.insert("label", None);

        let command = vec![
            "greet".to_string(),
            "{name}".to_string(),
            "-n{times}".to_string(),
            "{tags}".to_string(),
            "[{label}]".to_string(),
        ];
        let templates = get_templates(&command).unwrap();
        let line = interpolate_command(&build_context(&args), &templates).unwrap();
        assert_eq!(line, vec!["greet", "fred", "-n3", "a b", "[]"]);
    }

    #[test]
    fn test_missing_value_fails() {
        let command = vec!["echo".to_string(), "{missing}".to_string()];
        let templates = get_templates(&command).unwrap();
        assert!(interpolate_command(&HashMap::new(), &templates).is_err());
    }
}
