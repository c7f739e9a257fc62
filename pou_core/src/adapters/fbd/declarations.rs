//! Variable declaration sections: `<name> : <TYPE> [:= <literal>] ;`
//! with an optional trailing `(* comment *)`.

use std::collections::HashSet;

use crate::domain::ast::{VarKind, Variable};
use crate::error::ParseError;

use super::Lines;

pub(crate) fn parse_section(
    lines: &mut Lines,
    kind: VarKind,
    out: &mut Vec<Variable>,
    seen: &mut HashSet<String>,
) -> Result<(), ParseError> {
    while let Some((line_no, line)) = lines.next() {
        if line == "END_VAR" {
            return Ok(());
        }
        let var = parse_declaration(line, line_no, kind)?;
        if !seen.insert(var.name.clone()) {
            return Err(ParseError::DuplicateVariableName { name: var.name });
        }
        out.push(var);
    }
    Err(ParseError::MalformedSection {
        line: lines.last_line_no(),
        detail: "variable section not terminated by END_VAR".to_string(),
    })
}

fn parse_declaration(line: &str, line_no: usize, kind: VarKind) -> Result<Variable, ParseError> {
    let malformed = |detail: String| ParseError::MalformedSection {
        line: line_no,
        detail,
    };

    // Split off the trailing comment before anything else.
    let (decl, comment) = match line.find("(*") {
        Some(open) => {
            let rest = &line[open + 2..];
            let close = rest
                .find("*)")
                .ok_or_else(|| malformed("unterminated comment".to_string()))?;
            if !rest[close + 2..].trim().is_empty() {
                return Err(malformed("content after comment".to_string()));
            }
            (line[..open].trim(), rest[..close].trim().to_string())
        }
        None => (line, String::new()),
    };

    let decl = decl
        .strip_suffix(';')
        .ok_or_else(|| malformed(format!("missing ';' in declaration '{decl}'")))?
        .trim();
    let (name, rest) = decl
        .split_once(':')
        .ok_or_else(|| malformed(format!("missing ':' in declaration '{decl}'")))?;
    let name = name.trim();
    if !is_identifier(name) {
        return Err(malformed(format!("invalid variable name '{name}'")));
    }

    let (data_type, init_value) = match rest.split_once(":=") {
        Some((ty, init)) => {
            let init = init.trim();
            if init.is_empty() {
                return Err(malformed(format!("empty initializer for '{name}'")));
            }
            (ty.trim(), Some(init.to_string()))
        }
        None => (rest.trim(), None),
    };
    if !is_identifier(data_type) {
        return Err(malformed(format!("invalid type '{data_type}' for '{name}'")));
    }

    Ok(Variable {
        name: name.to_string(),
        kind,
        data_type: data_type.to_string(),
        init_value,
        comment,
    })
}

pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
