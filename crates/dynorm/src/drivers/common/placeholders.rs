//! Named-placeholder rewriting.
//!
//! Statements are built with vendor-prefixed names (`@0`, `:name`, `?0`)
//! while the driver crates bind by position. [`prepare`] rewrites the SQL
//! text into the driver's positional form and returns the parameters in
//! bind order.
//!
//! The scanner skips string literals, quoted identifiers, comments and
//! PostgreSQL `::` casts. Names that match no parameter are left untouched,
//! so server-side variables such as `@@IDENTITY` or MySQL `@var` survive.

use crate::core::{Command, CommandType, Parameter};
use crate::error::{OrmError, Result};

/// Positional placeholder syntax of a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?` per occurrence (sqlx SQLite/MySQL). Repeated names bind twice.
    Question,
    /// `$1, $2, ...` (tokio-postgres). Repeated names reuse their number.
    Dollar,
    /// `@P1, @P2, ...` (tiberius). Repeated names reuse their number.
    AtP,
}

/// SQL text in driver form plus the parameters to bind, in order.
#[derive(Debug, Clone)]
pub struct Prepared<'a> {
    pub sql: String,
    pub params: Vec<&'a Parameter>,
}

/// Rewrite `command` for a driver with the given placeholder `style`.
///
/// `prefixes` lists the characters accepted as placeholder introducers.
pub fn prepare<'a>(
    command: &'a Command,
    prefixes: &[char],
    style: PlaceholderStyle,
) -> Result<Prepared<'a>> {
    if command.command_type == CommandType::StoredProcedure {
        return Err(OrmError::Unsupported(format!(
            "stored procedure command '{}' must be rendered to call text before execution",
            command.text
        )));
    }

    let chars: Vec<char> = command.text.chars().collect();
    let mut sql = String::with_capacity(command.text.len() + 8);
    let mut params: Vec<&Parameter> = Vec::new();
    // Numbered styles: parameter index -> assigned position.
    let mut numbered: Vec<(usize, usize)> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\'' | '"' | '`' | '[' => {
                let close = if c == '[' { ']' } else { c };
                let end = skip_quoted(&chars, i, close);
                sql.extend(&chars[i..end]);
                i = end;
            }
            '-' if chars.get(i + 1) == Some(&'-') => {
                let end = chars[i..]
                    .iter()
                    .position(|&ch| ch == '\n')
                    .map_or(chars.len(), |p| i + p);
                sql.extend(&chars[i..end]);
                i = end;
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                let end = find_block_end(&chars, i + 2);
                sql.extend(&chars[i..end]);
                i = end;
            }
            ':' if chars.get(i + 1) == Some(&':') => {
                sql.push_str("::");
                i += 2;
            }
            c if prefixes.contains(&c) && is_placeholder_start(&chars, i) => {
                let start = i + 1;
                let end = chars[start..]
                    .iter()
                    .position(|ch| !is_ident_char(*ch))
                    .map_or(chars.len(), |p| start + p);
                let name: String = chars[start..end].iter().collect();

                match find_parameter(command, &name) {
                    Some(index) => {
                        let param = &command.parameters[index];
                        if !param.is_input() {
                            return Err(OrmError::Unsupported(format!(
                                "parameter '{}' is {:?}; positional drivers bind input values only",
                                param.name, param.direction
                            )));
                        }
                        match style {
                            PlaceholderStyle::Question => {
                                sql.push('?');
                                params.push(param);
                            }
                            PlaceholderStyle::Dollar | PlaceholderStyle::AtP => {
                                let position = match numbered.iter().find(|(idx, _)| *idx == index)
                                {
                                    Some((_, pos)) => *pos,
                                    None => {
                                        params.push(param);
                                        numbered.push((index, params.len()));
                                        params.len()
                                    }
                                };
                                if style == PlaceholderStyle::Dollar {
                                    sql.push_str(&format!("${}", position));
                                } else {
                                    sql.push_str(&format!("@P{}", position));
                                }
                            }
                        }
                    }
                    None => sql.extend(&chars[i..end]),
                }
                i = end;
            }
            other => {
                sql.push(other);
                i += 1;
            }
        }
    }

    Ok(Prepared { sql, params })
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// A prefix starts a placeholder when it is followed by a name and is not
/// doubled (`@@ROWCOUNT`) or glued to a preceding identifier.
fn is_placeholder_start(chars: &[char], i: usize) -> bool {
    let next_ok = chars.get(i + 1).is_some_and(|c| is_ident_char(*c));
    let prev_ok = i == 0 || {
        let prev = chars[i - 1];
        prev != chars[i] && !is_ident_char(prev)
    };
    next_ok && prev_ok
}

/// Index just past the closing quote; doubled quotes are escapes.
fn skip_quoted(chars: &[char], open: usize, close: char) -> usize {
    let mut i = open + 1;
    while i < chars.len() {
        if chars[i] == close {
            if chars.get(i + 1) == Some(&close) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    chars.len()
}

fn find_block_end(chars: &[char], from: usize) -> usize {
    let mut i = from;
    while i + 1 < chars.len() {
        if chars[i] == '*' && chars[i + 1] == '/' {
            return i + 2;
        }
        i += 1;
    }
    chars.len()
}

fn find_parameter(command: &Command, name: &str) -> Option<usize> {
    command
        .parameters
        .iter()
        .position(|p| p.name == name)
        .or_else(|| {
            command
                .parameters
                .iter()
                .position(|p| p.name.eq_ignore_ascii_case(name))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ParameterDirection, SqlValue};

    fn command(text: &str, names: &[&str]) -> Command {
        names.iter().enumerate().fold(Command::new(text), |cmd, (i, n)| {
            cmd.with_param(Parameter::new(*n, i as i32))
        })
    }

    fn bound(prepared: &Prepared<'_>) -> Vec<SqlValue> {
        prepared.params.iter().map(|p| p.value.clone()).collect()
    }

    #[test]
    fn test_question_style() {
        let cmd = command("SELECT * FROM t WHERE a = @0 AND b = @1", &["0", "1"]);
        let prepared = prepare(&cmd, &['@'], PlaceholderStyle::Question).unwrap();
        assert_eq!(prepared.sql, "SELECT * FROM t WHERE a = ? AND b = ?");
        assert_eq!(bound(&prepared), vec![SqlValue::I32(0), SqlValue::I32(1)]);
    }

    #[test]
    fn test_question_style_repeats_values() {
        let cmd = command("SELECT ?x, ?x", &["x"]);
        let prepared = prepare(&cmd, &['?'], PlaceholderStyle::Question).unwrap();
        assert_eq!(prepared.sql, "SELECT ?, ?");
        assert_eq!(prepared.params.len(), 2);
    }

    #[test]
    fn test_dollar_style_reuses_numbers() {
        let cmd = command("SELECT :b, :a, :b", &["a", "b"]);
        let prepared = prepare(&cmd, &[':'], PlaceholderStyle::Dollar).unwrap();
        assert_eq!(prepared.sql, "SELECT $1, $2, $1");
        assert_eq!(bound(&prepared), vec![SqlValue::I32(1), SqlValue::I32(0)]);
    }

    #[test]
    fn test_atp_style() {
        let cmd = command("UPDATE t SET a = @0 WHERE id = @1", &["0", "1"]);
        let prepared = prepare(&cmd, &['@'], PlaceholderStyle::AtP).unwrap();
        assert_eq!(prepared.sql, "UPDATE t SET a = @P1 WHERE id = @P2");
    }

    #[test]
    fn test_skips_literals_casts_and_comments() {
        let cmd = command(
            "SELECT ':0', \"@0\", x::text, [a:0] -- :0\nFROM t /* :0 */ WHERE y = :0",
            &["0"],
        );
        let prepared = prepare(&cmd, &[':', '@'], PlaceholderStyle::Dollar).unwrap();
        assert_eq!(
            prepared.sql,
            "SELECT ':0', \"@0\", x::text, [a:0] -- :0\nFROM t /* :0 */ WHERE y = $1"
        );
        assert_eq!(prepared.params.len(), 1);
    }

    #[test]
    fn test_escaped_quotes_inside_literal() {
        let cmd = command("SELECT 'it''s @0' WHERE a = @0", &["0"]);
        let prepared = prepare(&cmd, &['@'], PlaceholderStyle::Question).unwrap();
        assert_eq!(prepared.sql, "SELECT 'it''s @0' WHERE a = ?");
    }

    #[test]
    fn test_unknown_names_and_server_variables_untouched() {
        let cmd = command("SELECT @@IDENTITY, @missing, @0", &["0"]);
        let prepared = prepare(&cmd, &['@'], PlaceholderStyle::AtP).unwrap();
        assert_eq!(prepared.sql, "SELECT @@IDENTITY, @missing, @P1");
    }

    #[test]
    fn test_case_insensitive_name_match() {
        let cmd = command("SELECT :Name", &["name"]);
        let prepared = prepare(&cmd, &[':'], PlaceholderStyle::Dollar).unwrap();
        assert_eq!(prepared.sql, "SELECT $1");
    }

    #[test]
    fn test_procedure_commands_rejected() {
        let cmd = Command::procedure("pr_clearAll");
        let err = prepare(&cmd, &['@'], PlaceholderStyle::Question).unwrap_err();
        assert!(matches!(err, OrmError::Unsupported(_)));
    }

    #[test]
    fn test_output_parameters_are_rejected() {
        let cmd = Command::new("SELECT @0, @total")
            .with_param(Parameter::new("0", 1))
            .with_param(
                Parameter::new("total", SqlValue::NULL).with_direction(ParameterDirection::Output),
            );
        let err = prepare(&cmd, &['@'], PlaceholderStyle::AtP).unwrap_err();
        assert!(matches!(err, OrmError::Unsupported(ref m) if m.contains("total")));

        let inout = Command::new("SELECT @x").with_param(
            Parameter::new("x", 5).with_direction(ParameterDirection::InputOutput),
        );
        let prepared = prepare(&inout, &['@'], PlaceholderStyle::Question).unwrap();
        assert_eq!(prepared.sql, "SELECT ?");
    }
}
