//! Provider-neutral command and parameter objects.
//!
//! Plugins adjust these (bind-by-name flags, cursor markers, value coercion)
//! before an executor translates them into driver calls.

use super::value::SqlValue;

/// How the command text is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandType {
    /// Plain SQL text.
    #[default]
    Text,
    /// `text` is a stored-procedure name.
    StoredProcedure,
}

/// Direction of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParameterDirection {
    #[default]
    Input,
    Output,
    InputOutput,
    ReturnValue,
}

/// A named command parameter.
///
/// `name` is stored without the vendor prefix; the SQL text carries the
/// prefixed form.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: SqlValue,
    pub direction: ParameterDirection,
    /// Explicit size for variable-length values.
    pub size: Option<usize>,
    /// Vendor type override (e.g. `RefCursor`).
    pub provider_type: Option<String>,
}

impl Parameter {
    /// Create an input parameter.
    pub fn new(name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            direction: ParameterDirection::Input,
            size: None,
            provider_type: None,
        }
    }

    /// Set the direction.
    #[must_use]
    pub fn with_direction(mut self, direction: ParameterDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Whether the parameter sends a value to the server.
    pub fn is_input(&self) -> bool {
        matches!(
            self.direction,
            ParameterDirection::Input | ParameterDirection::InputOutput
        )
    }
}

/// A command ready for execution.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Command {
    pub text: String,
    pub command_type: CommandType,
    pub parameters: Vec<Parameter>,
    /// Bind parameters by name instead of by position.
    pub bind_by_name: bool,
    /// Fetch size for LONG columns (`-1` fetches the whole value at once).
    pub long_fetch_size: Option<i32>,
}

impl Command {
    /// Create a text command with no parameters.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Create a stored-procedure command.
    pub fn procedure(name: impl Into<String>) -> Self {
        Self {
            text: name.into(),
            command_type: CommandType::StoredProcedure,
            ..Self::default()
        }
    }

    /// Append a parameter.
    #[must_use]
    pub fn with_param(mut self, param: Parameter) -> Self {
        self.parameters.push(param);
        self
    }

    /// Find a parameter by its unprefixed name.
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_defaults() {
        let cmd = Command::new("SELECT 1");
        assert_eq!(cmd.command_type, CommandType::Text);
        assert!(cmd.parameters.is_empty());
        assert!(!cmd.bind_by_name);
        assert!(cmd.long_fetch_size.is_none());
    }

    #[test]
    fn test_parameter_lookup() {
        let cmd = Command::new("SELECT @0")
            .with_param(Parameter::new("0", 5))
            .with_param(Parameter::new("out", SqlValue::NULL).with_direction(ParameterDirection::Output));
        assert_eq!(cmd.parameter("0").map(|p| &p.value), Some(&SqlValue::I32(5)));
        assert!(!cmd.parameter("out").map(Parameter::is_input).unwrap_or(true));
        assert!(cmd.parameter("missing").is_none());
    }

    #[test]
    fn test_procedure_command() {
        let cmd = Command::procedure("pr_clearAll");
        assert_eq!(cmd.command_type, CommandType::StoredProcedure);
        assert_eq!(cmd.text, "pr_clearAll");
    }
}
