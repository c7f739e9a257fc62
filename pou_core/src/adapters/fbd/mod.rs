//! Textual POU/FBD frontend.
//! Recognizes `PROGRAM` headers, `VAR*` declaration sections, optional
//! `GROUPS` metadata and a `BODY` of block/wire statements, building a
//! cross-checked [`Program`] or failing with a [`ParseError`] kind.

mod body;
mod declarations;

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use log::warn;

use crate::domain::ast::{Endpoint, Group, Program, VarKind};
use crate::error::ParseError;
use crate::ports::frontend::PouFrontend;

pub(crate) use declarations::is_identifier;

/// Frontend adapter for the line-oriented POU dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct FbdTextFrontend;

impl PouFrontend for FbdTextFrontend {
    fn parse(&self, source: &str) -> Result<Program, ParseError> {
        parse_source(source)
    }
}

/// Read and parse a POU file. I/O failures surface as
/// [`ParseError::UnreadableFile`]; the parser itself never writes.
pub fn parse_pou_file(path: impl AsRef<Path>) -> Result<Program, ParseError> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|source| ParseError::UnreadableFile {
        path: path.display().to_string(),
        source,
    })?;
    parse_source(&source)
}

/// Significant (non-blank) source lines with 1-based numbering.
pub(crate) struct Lines<'a> {
    items: Vec<(usize, &'a str)>,
    idx: usize,
}

impl<'a> Lines<'a> {
    fn new(source: &'a str) -> Self {
        let items = source
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty())
            .collect();
        Self { items, idx: 0 }
    }

    pub(crate) fn next(&mut self) -> Option<(usize, &'a str)> {
        let item = self.items.get(self.idx).copied();
        if item.is_some() {
            self.idx += 1;
        }
        item
    }

    /// Line number of the last significant line, for truncation errors.
    pub(crate) fn last_line_no(&self) -> usize {
        self.items.last().map(|(n, _)| *n).unwrap_or(0)
    }
}

pub(crate) fn parse_source(source: &str) -> Result<Program, ParseError> {
    let mut lines = Lines::new(source);

    let (header_line, header) = lines.next().ok_or(ParseError::MalformedSection {
        line: 0,
        detail: "empty POU source".to_string(),
    })?;
    let name = match header.strip_prefix("PROGRAM ") {
        Some(rest) if is_identifier(rest.trim()) => rest.trim().to_string(),
        _ => {
            return Err(ParseError::MalformedSection {
                line: header_line,
                detail: format!("expected 'PROGRAM <name>', found '{header}'"),
            })
        }
    };

    let mut variables = Vec::new();
    let mut seen_names = HashSet::new();
    let mut blocks = Vec::new();
    let mut connections = Vec::new();
    let mut groups = Vec::new();
    let mut terminated = false;

    while let Some((line_no, line)) = lines.next() {
        let keyword = line.split_whitespace().next().unwrap_or("");
        let section_kind = match keyword {
            "VAR_INPUT" => Some(VarKind::InputVar),
            "VAR_OUTPUT" => Some(VarKind::OutputVar),
            "VAR_IN_OUT" => Some(VarKind::InOutVar),
            "VAR" => Some(VarKind::LocalVar),
            _ => None,
        };

        if section_kind.is_some() || keyword == "GROUPS" || keyword == "BODY" {
            if line != keyword {
                return Err(ParseError::MalformedSection {
                    line: line_no,
                    detail: format!("unexpected content after '{keyword}'"),
                });
            }
        }

        if let Some(kind) = section_kind {
            declarations::parse_section(&mut lines, kind, &mut variables, &mut seen_names)?;
        } else if keyword == "GROUPS" {
            parse_groups(&mut lines, &mut groups)?;
        } else if keyword == "BODY" {
            body::parse_body(&mut lines, &mut blocks, &mut connections)?;
        } else if line == "END_PROGRAM" {
            terminated = true;
            break;
        } else if keyword.starts_with("VAR_") {
            return Err(ParseError::UnknownVariableKind {
                keyword: keyword.to_string(),
                line: line_no,
            });
        } else {
            return Err(ParseError::MalformedSection {
                line: line_no,
                detail: format!("unrecognized section start '{line}'"),
            });
        }
    }

    if !terminated {
        return Err(ParseError::MalformedSection {
            line: lines.last_line_no(),
            detail: "missing END_PROGRAM".to_string(),
        });
    }

    let program = Program {
        name,
        variables,
        blocks,
        connections,
        groups,
    };
    validate_connections(&program)?;
    warn_group_mismatches(&program);
    Ok(program)
}

fn parse_groups(lines: &mut Lines, groups: &mut Vec<Group>) -> Result<(), ParseError> {
    while let Some((line_no, line)) = lines.next() {
        if line == "END_GROUPS" {
            return Ok(());
        }
        let malformed = |detail: String| ParseError::MalformedSection {
            line: line_no,
            detail,
        };
        let rest = line
            .strip_prefix("GROUP ")
            .and_then(|r| r.trim().strip_suffix(';'))
            .ok_or_else(|| malformed(format!("expected 'GROUP <name> : <members> ;', found '{line}'")))?;
        let (name, members) = rest
            .split_once(':')
            .ok_or_else(|| malformed(format!("missing ':' in group '{rest}'")))?;
        let name = name.trim();
        if !is_identifier(name) {
            return Err(malformed(format!("invalid group name '{name}'")));
        }
        let members: Vec<String> = members
            .split(',')
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .collect();
        groups.push(Group {
            name: name.to_string(),
            members,
        });
    }
    Err(ParseError::MalformedSection {
        line: lines.last_line_no(),
        detail: "groups section not terminated by END_GROUPS".to_string(),
    })
}

/// Every wire endpoint must resolve to a declared block pin or variable.
fn validate_connections(program: &Program) -> Result<(), ParseError> {
    for conn in &program.connections {
        resolve_endpoint(program, &conn.source)?;
        resolve_endpoint(program, &conn.dest)?;
    }
    Ok(())
}

fn resolve_endpoint(program: &Program, ep: &Endpoint) -> Result<(), ParseError> {
    if let Some(block) = program.block(&ep.owner) {
        if block.pin(&ep.pin).is_some() {
            return Ok(());
        }
    } else if let Some(var) = program.variable(&ep.owner) {
        if ep.pin == var.name {
            return Ok(());
        }
    }
    Err(ParseError::DanglingConnectionReference {
        owner: ep.owner.clone(),
        pin: ep.pin.clone(),
    })
}

/// Grouping is metadata only: a member whose declared kind disagrees with
/// the group's role, or which is not declared at all, is tolerated and
/// logged. The report always reflects declared kinds.
fn warn_group_mismatches(program: &Program) {
    for group in &program.groups {
        let expected = match group.name.as_str() {
            "Inputs" => Some(VarKind::InputVar),
            "Outputs" => Some(VarKind::OutputVar),
            _ => None,
        };
        for member in &group.members {
            match program.variable(member) {
                None => warn!(
                    "group '{}' references undeclared variable '{}'",
                    group.name, member
                ),
                Some(var) => {
                    if let Some(expected) = expected {
                        if var.kind != expected {
                            warn!(
                                "variable '{}' is declared {} but grouped under '{}'",
                                var.name,
                                var.kind.label(),
                                group.name
                            );
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ast::PinDirection;

    const COLLATZ_ODD: &str = "\
PROGRAM Collatz_Calculator_Odd
VAR_INPUT
    N : UINT := 1; (* Collatz Input *)
END_VAR
VAR_OUTPUT
    Result_Odd : UINT; (* Result if the input is an odd number *)
END_VAR
GROUPS
    GROUP Inputs : N;
    GROUP Outputs : Result_Odd;
END_GROUPS
BODY
    BLOCK Mul_1 : MUL AT (40, 10) PINS (IN1 IN, IN2 IN, OUT OUT);
    BLOCK Add_1 : ADD AT (90, 10) PINS (IN1 IN, IN2 IN, OUT OUT);
    WIRE N -> Mul_1.IN1;
    WIRE Mul_1.OUT -> Add_1.IN1;
    WIRE Add_1.OUT -> Result_Odd;
END_BODY
END_PROGRAM
";

    #[test]
    fn parses_program_header_variables_and_body() {
        let prog = parse_source(COLLATZ_ODD).unwrap();
        assert_eq!(prog.name, "Collatz_Calculator_Odd");
        assert_eq!(prog.variables.len(), 2);
        assert_eq!(prog.blocks.len(), 2);
        assert_eq!(prog.connections.len(), 3);
        assert_eq!(prog.groups.len(), 2);

        let n = prog.variable("N").unwrap();
        assert_eq!(n.kind, VarKind::InputVar);
        assert_eq!(n.data_type, "UINT");
        assert_eq!(n.init_value.as_deref(), Some("1"));
        assert_eq!(n.comment, "Collatz Input");

        let result = prog.variable("Result_Odd").unwrap();
        assert_eq!(result.kind, VarKind::OutputVar);
        assert!(result.init_value.is_none());

        let mul = prog.block("Mul_1").unwrap();
        assert_eq!(mul.type_name, "MUL");
        let pos = mul.position.unwrap();
        assert_eq!((pos.x, pos.y), (40.0, 10.0));
        assert_eq!(mul.pin("OUT").unwrap().direction, PinDirection::Out);
    }

    #[test]
    fn bare_variable_endpoint_uses_its_own_name_as_pin() {
        let prog = parse_source(COLLATZ_ODD).unwrap();
        let first = &prog.connections[0];
        assert_eq!(first.source.owner, "N");
        assert_eq!(first.source.pin, "N");
        assert_eq!(first.dest.owner, "Mul_1");
        assert_eq!(first.dest.pin, "IN1");
    }

    #[test]
    fn duplicate_variable_name_across_sections_is_rejected() {
        let src = "\
PROGRAM P
VAR_INPUT
    X : UINT;
END_VAR
VAR_OUTPUT
    X : UINT;
END_VAR
END_PROGRAM
";
        match parse_source(src) {
            Err(ParseError::DuplicateVariableName { name }) => assert_eq!(name, "X"),
            other => panic!("expected DuplicateVariableName, got {other:?}"),
        }
    }

    #[test]
    fn unknown_var_section_keyword_is_rejected() {
        let src = "PROGRAM P\nVAR_GLOBAL\n    X : UINT;\nEND_VAR\nEND_PROGRAM\n";
        match parse_source(src) {
            Err(ParseError::UnknownVariableKind { keyword, .. }) => {
                assert_eq!(keyword, "VAR_GLOBAL")
            }
            other => panic!("expected UnknownVariableKind, got {other:?}"),
        }
    }

    #[test]
    fn wire_to_undeclared_pin_is_dangling() {
        let src = "\
PROGRAM P
VAR_INPUT
    A : BOOL;
END_VAR
BODY
    BLOCK And_1 : AND AT (10, 10) PINS (IN1 IN, OUT OUT);
    WIRE A -> And_1.IN9;
END_BODY
END_PROGRAM
";
        match parse_source(src) {
            Err(ParseError::DanglingConnectionReference { owner, pin }) => {
                assert_eq!(owner, "And_1");
                assert_eq!(pin, "IN9");
            }
            other => panic!("expected DanglingConnectionReference, got {other:?}"),
        }
    }

    #[test]
    fn wire_to_undeclared_variable_is_dangling() {
        let src = "\
PROGRAM P
BODY
    BLOCK And_1 : AND AT (10, 10) PINS (IN1 IN, OUT OUT);
    WIRE Ghost -> And_1.IN1;
END_BODY
END_PROGRAM
";
        assert!(matches!(
            parse_source(src),
            Err(ParseError::DanglingConnectionReference { .. })
        ));
    }

    #[test]
    fn junk_top_level_line_is_malformed() {
        let src = "PROGRAM P\nFROBNICATE\nEND_PROGRAM\n";
        match parse_source(src) {
            Err(ParseError::MalformedSection { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected MalformedSection, got {other:?}"),
        }
    }

    #[test]
    fn truncated_source_is_malformed() {
        let src = "PROGRAM P\nVAR_INPUT\n    A : BOOL;\n";
        assert!(matches!(
            parse_source(src),
            Err(ParseError::MalformedSection { .. })
        ));

        let src = "PROGRAM P\nVAR_INPUT\n    A : BOOL;\nEND_VAR\n";
        assert!(matches!(
            parse_source(src),
            Err(ParseError::MalformedSection { .. })
        ));
    }

    #[test]
    fn group_role_mismatch_is_tolerated_and_kind_stays_declared() {
        // mirrors the output_has_non_output_vars fixture family
        let src = "\
PROGRAM P
VAR_INPUT
    A : BOOL;
END_VAR
VAR_OUTPUT
    B : BOOL;
END_VAR
GROUPS
    GROUP Outputs : A, B;
END_GROUPS
END_PROGRAM
";
        let prog = parse_source(src).unwrap();
        assert_eq!(prog.variable("A").unwrap().kind, VarKind::InputVar);
        assert_eq!(prog.groups[0].members, vec!["A", "B"]);
    }

    #[test]
    fn empty_program_without_groups_parses() {
        let prog = parse_source("PROGRAM Empty_Prog\nEND_PROGRAM\n").unwrap();
        assert!(prog.variables.is_empty());
        assert!(prog.blocks.is_empty());
    }

    #[test]
    fn block_without_at_clause_has_no_position() {
        let src = "\
PROGRAM P
BODY
    BLOCK And_1 : AND PINS (IN1 IN, OUT OUT);
END_BODY
END_PROGRAM
";
        let prog = parse_source(src).unwrap();
        assert!(prog.block("And_1").unwrap().position.is_none());
    }

    #[test]
    fn unreadable_file_surfaces_as_typed_error() {
        let missing = std::env::temp_dir().join("definitely_not_here_8841.pou");
        match parse_pou_file(&missing) {
            Err(ParseError::UnreadableFile { path, .. }) => {
                assert!(path.contains("definitely_not_here_8841"))
            }
            other => panic!("expected UnreadableFile, got {other:?}"),
        }
    }
}
