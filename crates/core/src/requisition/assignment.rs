use crate::argument::Argument;
use crate::canon::Parameter;
use crate::conversion::{Conversion, Prediction};
use crate::status::Status;
use crate::value::Value;

/// The name change notifications use for the command assignment.
pub const COMMAND_ASSIGNMENT_NAME: &str = "__command";

/// The name of the parameter standing behind unassigned arguments.
pub const UNASSIGNED_NAME: &str = "__unassigned";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Command,
    Param,
    Unassigned,
}

/// The current binding of one parameter to the conversion of whatever was
/// typed for it.
#[derive(Debug, Clone)]
pub struct Assignment {
    param: Parameter,
    conversion: Conversion,
    role: Role,
}

impl Assignment {
    pub(crate) fn command(param: Parameter, conversion: Conversion) -> Self {
        Self {
            param,
            conversion,
            role: Role::Command,
        }
    }

    pub(crate) fn param(param: Parameter, conversion: Conversion) -> Self {
        Self {
            param,
            conversion,
            role: Role::Param,
        }
    }

    pub(crate) fn unassigned(param: Parameter, conversion: Conversion) -> Self {
        Self {
            param,
            conversion,
            role: Role::Unassigned,
        }
    }

    pub fn parameter(&self) -> &Parameter {
        &self.param
    }

    pub fn name(&self) -> &str {
        self.param.name()
    }

    pub fn conversion(&self) -> &Conversion {
        &self.conversion
    }

    pub fn arg(&self) -> &Argument {
        self.conversion.arg()
    }

    pub fn value(&self) -> Option<&Value> {
        self.conversion.value()
    }

    pub fn message(&self) -> Option<&str> {
        self.conversion.message()
    }

    pub fn predictions(&self) -> Vec<Prediction> {
        self.conversion.predictions()
    }

    pub fn is_command(&self) -> bool {
        self.role == Role::Command
    }

    pub fn is_unassigned(&self) -> bool {
        self.role == Role::Unassigned
    }

    /// The value the command receives: the parsed value if anything was
    /// supplied, otherwise the parameter's default.
    pub fn effective_value(&self) -> Option<&Value> {
        if self.conversion.is_data_provided() {
            self.conversion.value()
        } else {
            self.param.default_value().value()
        }
    }

    /// The status of this assignment.
    ///
    /// An optional parameter nobody typed anything for is valid even when
    /// its type would call blank input incomplete. The command assignment is
    /// incomplete until it names an executable command.
    pub fn status(&self) -> Status {
        if self.role == Role::Unassigned {
            return self.conversion.status();
        }

        let status = if self.param.is_data_required() && !self.conversion.is_data_provided() {
            Status::Incomplete
        } else if !self.param.is_data_required() && self.conversion.arg().is_unset() {
            Status::Valid
        } else {
            self.conversion.status()
        };

        if self.role == Role::Command {
            let executable = self
                .conversion
                .value()
                .and_then(Value::as_command)
                .is_some_and(|command| command.is_executable());
            if !executable {
                return status.worst(Status::Incomplete);
            }
        }
        status
    }
}

/// Sent when an assignment's conversion changes during an update.
#[derive(Debug, Clone)]
pub struct AssignmentChange {
    /// The parameter name, or [`COMMAND_ASSIGNMENT_NAME`].
    pub name: String,
    pub old: Conversion,
    pub new: Conversion,
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::canon::{Canon, CommandSpec, DefaultValue, ParamSpec};
    use crate::output::Reply;
    use crate::types::CommandType;

    fn params() -> Vec<Parameter> {
        let canon = Canon::new();
        let command = canon
            .add_command(
                CommandSpec::new("x")
                    .param(ParamSpec::new("required"))
                    .param(
                        ParamSpec::new("optional")
                            .type_ref("boolean")
                            .default_value(DefaultValue::Undefined),
                    )
                    .param(ParamSpec::new("maybe").default_value(DefaultValue::Null))
                    .exec(|_, _| Ok(Reply::none())),
            )
            .unwrap();
        command.params().to_vec()
    }

    #[test]
    fn test_required_without_data_is_incomplete() {
        let required = params().remove(0);
        let assignment =
            Assignment::param(required, Conversion::incomplete(Argument::blank(), None));
        assert_eq!(assignment.status(), Status::Incomplete);
    }

    #[test]
    fn test_optional_unset_is_valid() {
        let maybe = params().remove(2);
        let assignment = Assignment::param(maybe, Conversion::incomplete(Argument::blank(), None));
        assert_eq!(assignment.status(), Status::Valid);
        assert_eq!(assignment.effective_value(), None);
    }

    #[test]
    fn test_effective_value_falls_back_to_default() {
        let flag = params().remove(1);
        let assignment = Assignment::param(flag, Conversion::incomplete(Argument::blank(), None));
        assert_eq!(assignment.effective_value(), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_command_group_is_incomplete() {
        let canon = Canon::new();
        let group = canon.add_command(CommandSpec::new("tsn")).unwrap();
        let param = Parameter::synthetic(COMMAND_ASSIGNMENT_NAME, Arc::new(CommandType));
        let conversion = Conversion::new(Some(Value::Command(group)), Argument::from("tsn"));
        let assignment = Assignment::command(param, conversion);
        assert_eq!(assignment.status(), Status::Incomplete);
        assert!(assignment.is_command());
    }
}
