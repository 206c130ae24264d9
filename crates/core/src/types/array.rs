use std::sync::Arc;

use itertools::Itertools;

use crate::argument::{Argument, ArgumentKind};
use crate::conversion::Conversion;
use crate::tokenizer::tokenize;
use crate::types::{ParseContext, Type, TypeClass};
use crate::value::Value;

/// Any number of values of one subtype.
#[derive(Debug, Clone)]
pub struct ArrayType {
    subtype: Arc<dyn Type>,
}

impl ArrayType {
    pub fn new(subtype: Arc<dyn Type>) -> Self {
        Self { subtype }
    }

    pub fn subtype(&self) -> &Arc<dyn Type> {
        &self.subtype
    }
}

impl Type for ArrayType {
    fn name(&self) -> &str {
        "array"
    }

    fn class(&self) -> TypeClass {
        TypeClass::Array
    }

    fn stringify(&self, value: Option<&Value>, ctx: &ParseContext) -> String {
        match value {
            Some(Value::Array(values)) => values
                .iter()
                .map(|value| self.subtype.stringify(Some(value), ctx))
                .join(" "),
            Some(other) => self.subtype.stringify(Some(other), ctx),
            None => String::new(),
        }
    }

    fn parse(&self, arg: &Argument, ctx: &ParseContext) -> Conversion {
        let members: Vec<Argument> = match arg.kind() {
            ArgumentKind::Array(members) => members.clone(),
            _ if arg.text().is_empty() => Vec::new(),
            // Typed text handed over directly, e.g. a default value
            _ => tokenize(arg.text()),
        };

        let children = members
            .iter()
            .map(|member| self.subtype.parse(member, ctx))
            .collect();
        Conversion::array(children, arg.clone())
    }

    fn blank(&self, _ctx: &ParseContext) -> Conversion {
        Conversion::array(Vec::new(), Argument::blank())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canon::Canon;
    use crate::status::Status;
    use crate::types::{NumberType, StringType};

    #[test]
    fn test_parse_members() {
        let canon = Canon::new();
        let ctx = ParseContext::new(&canon);
        let array = ArrayType::new(Arc::new(StringType::default()));
        let arg = Argument::array(vec![
            Argument::new("x", " ", ""),
            Argument::new("y", " ", ""),
            Argument::new("z", " ", ""),
        ]);

        let conversion = array.parse(&arg, &ctx);
        assert_eq!(conversion.status(), Status::Valid);
        assert_eq!(
            conversion.value(),
            Some(&Value::Array(vec!["x".into(), "y".into(), "z".into()]))
        );
    }

    #[test]
    fn test_bad_member_makes_array_invalid() {
        let canon = Canon::new();
        let ctx = ParseContext::new(&canon);
        let array = ArrayType::new(Arc::new(NumberType::new()));
        let arg = Argument::array(vec![Argument::from("1"), Argument::new("x", " ", "")]);
        assert_eq!(array.parse(&arg, &ctx).status(), Status::Error);
    }

    #[test]
    fn test_blank_is_valid_and_empty() {
        let canon = Canon::new();
        let ctx = ParseContext::new(&canon);
        let array = ArrayType::new(Arc::new(NumberType::new()));
        let blank = array.blank(&ctx);
        assert_eq!(blank.status(), Status::Valid);
        assert_eq!(blank.value(), Some(&Value::Array(Vec::new())));
    }

    #[test]
    fn test_text_round_trips() {
        let canon = Canon::new();
        let ctx = ParseContext::new(&canon);
        let array = ArrayType::new(Arc::new(StringType::default()));
        let value = Value::Array(vec!["a b".into(), "c".into()]);

        let text = array.stringify(Some(&value), &ctx);
        assert_eq!(text, "a\\ b c");
        assert_eq!(array.parse_str(&text, &ctx).value(), Some(&value));
    }
}
