//! Placeholder substitution for OpenVPN config templates.
//!
//! Syntax:
//! - `$Name` or `${Name}`: replaced with the value supplied for `Name`
//! - `$$`: a literal `$`
//!
//! Identifiers match `[A-Za-z_][A-Za-z0-9_]*`. There are no conditionals or
//! loops, so a template renders iff every placeholder it uses is supplied.
//! Extra supplied values are ignored.

use crate::error::TemplateError;
use std::collections::HashMap;

const SENTINEL: char = '$';

/// Named values available to a template.
#[derive(Debug, Default, Clone)]
pub struct Substitutions<'a> {
    values: HashMap<&'a str, String>,
}

impl<'a> Substitutions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Supply `value` for placeholder `name`
    pub fn set(mut self, name: &'a str, value: impl ToString) -> Self {
        self.values.insert(name, value.to_string());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Substitute every placeholder in `template`.
///
/// # Errors
/// - [`TemplateError::MissingPlaceholder`] for the first placeholder with no value
/// - [`TemplateError::InvalidPlaceholder`] for a `$` not followed by an
///   identifier, `{identifier}` or `$`
pub fn substitute(template: &str, values: &Substitutions<'_>) -> Result<String, TemplateError> {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(SENTINEL) {
        output.push_str(&rest[..pos]);
        let after = &rest[pos + SENTINEL.len_utf8()..];
        let offset = template.len() - rest.len() + pos;
        let invalid = || invalid_placeholder(template, offset);

        let (name, consumed) = if after.starts_with(SENTINEL) {
            output.push(SENTINEL);
            rest = &after[SENTINEL.len_utf8()..];
            continue;
        } else if let Some(braced) = after.strip_prefix('{') {
            let end = braced.find('}').ok_or_else(invalid)?;
            let name = &braced[..end];
            if !is_identifier(name) {
                return Err(invalid());
            }
            (name, end + 2)
        } else {
            let end = after
                .char_indices()
                .find(|&(_, c)| !is_identifier_char(c))
                .map_or(after.len(), |(i, _)| i);
            let name = &after[..end];
            if !is_identifier(name) {
                return Err(invalid());
            }
            (name, end)
        };

        let value = values
            .get(name)
            .ok_or_else(|| TemplateError::MissingPlaceholder {
                name: name.to_string(),
            })?;
        output.push_str(value);
        rest = &after[consumed..];
    }
    output.push_str(rest);

    Ok(output)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(is_identifier_start) && chars.all(is_identifier_char)
}

/// 1-based line and column of byte `offset`.
fn invalid_placeholder(template: &str, offset: usize) -> TemplateError {
    let before = &template[..offset];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let column = template[line_start..offset].chars().count() + 1;
    TemplateError::InvalidPlaceholder { line, column }
}
