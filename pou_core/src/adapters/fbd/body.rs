//! FBD body statements:
//! `BLOCK <inst> : <TYPE> [AT (<x>, <y>)] PINS (<pin> IN|OUT, ...) ;`
//! `WIRE <endpoint> -> <endpoint> ;`

use crate::domain::ast::{Block, Connection, Endpoint, Pin, PinDirection, Position};
use crate::error::ParseError;

use super::{is_identifier, Lines};

pub(crate) fn parse_body(
    lines: &mut Lines,
    blocks: &mut Vec<Block>,
    connections: &mut Vec<Connection>,
) -> Result<(), ParseError> {
    while let Some((line_no, line)) = lines.next() {
        if line == "END_BODY" {
            return Ok(());
        }
        if let Some(rest) = line.strip_prefix("BLOCK ") {
            let block = parse_block(rest, line_no)?;
            if blocks.iter().any(|b| b.name == block.name) {
                return Err(ParseError::MalformedSection {
                    line: line_no,
                    detail: format!("duplicate block instance '{}'", block.name),
                });
            }
            blocks.push(block);
        } else if let Some(rest) = line.strip_prefix("WIRE ") {
            connections.push(parse_wire(rest, line_no)?);
        } else {
            return Err(ParseError::MalformedSection {
                line: line_no,
                detail: format!("unrecognized body statement '{line}'"),
            });
        }
    }
    Err(ParseError::MalformedSection {
        line: lines.last_line_no(),
        detail: "body not terminated by END_BODY".to_string(),
    })
}

fn parse_block(rest: &str, line_no: usize) -> Result<Block, ParseError> {
    let malformed = |detail: String| ParseError::MalformedSection {
        line: line_no,
        detail,
    };

    let rest = rest
        .trim()
        .strip_suffix(';')
        .ok_or_else(|| malformed("missing ';' after block statement".to_string()))?
        .trim();
    let (name, after) = rest
        .split_once(':')
        .ok_or_else(|| malformed(format!("missing ':' in block '{rest}'")))?;
    let name = name.trim();
    if !is_identifier(name) {
        return Err(malformed(format!("invalid block instance name '{name}'")));
    }

    let pins_at = find_keyword(after, "PINS")
        .ok_or_else(|| malformed(format!("missing PINS clause in block '{name}'")))?;
    let pins = parse_pins(after[pins_at + "PINS".len()..].trim(), name, line_no)?;

    let head = after[..pins_at].trim();
    let (type_name, position) = match find_keyword(head, "AT") {
        Some(at) => (
            head[..at].trim_end(),
            Some(parse_position(head[at + "AT".len()..].trim(), line_no)?),
        ),
        None => (head, None),
    };
    if !is_identifier(type_name) {
        return Err(malformed(format!("invalid block type '{type_name}'")));
    }

    Ok(Block {
        name: name.to_string(),
        type_name: type_name.to_string(),
        position,
        pins,
    })
}

/// Locate `kw` as a whole token, not a substring of an identifier such
/// as `PINSEL` or `ATON`. A following '(' counts as a boundary.
fn find_keyword(s: &str, kw: &str) -> Option<usize> {
    s.match_indices(kw).find_map(|(at, _)| {
        let before_ok = at == 0 || s[..at].ends_with(char::is_whitespace);
        let rest = &s[at + kw.len()..];
        let after_ok =
            rest.is_empty() || rest.starts_with(char::is_whitespace) || rest.starts_with('(');
        (before_ok && after_ok).then_some(at)
    })
}

fn parse_position(s: &str, line_no: usize) -> Result<Position, ParseError> {
    let malformed = || ParseError::MalformedSection {
        line: line_no,
        detail: format!("expected position '(<x>, <y>)', found '{s}'"),
    };
    let inner = s
        .strip_prefix('(')
        .and_then(|r| r.strip_suffix(')'))
        .ok_or_else(malformed)?;
    let (x, y) = inner.split_once(',').ok_or_else(malformed)?;
    let x: f64 = x.trim().parse().map_err(|_| malformed())?;
    let y: f64 = y.trim().parse().map_err(|_| malformed())?;
    Ok(Position { x, y })
}

fn parse_pins(s: &str, block: &str, line_no: usize) -> Result<Vec<Pin>, ParseError> {
    let malformed = |detail: String| ParseError::MalformedSection {
        line: line_no,
        detail,
    };
    let inner = s
        .strip_prefix('(')
        .and_then(|r| r.strip_suffix(')'))
        .ok_or_else(|| malformed(format!("expected parenthesized pin list in block '{block}'")))?;

    let mut pins: Vec<Pin> = Vec::new();
    for item in inner.split(',') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        let mut parts = item.split_whitespace();
        let (name, dir) = match (parts.next(), parts.next(), parts.next()) {
            (Some(name), Some(dir), None) => (name, dir),
            _ => return Err(malformed(format!("expected '<pin> IN|OUT', found '{item}'"))),
        };
        if !is_identifier(name) {
            return Err(malformed(format!("invalid pin name '{name}'")));
        }
        let direction = match dir {
            "IN" => PinDirection::In,
            "OUT" => PinDirection::Out,
            other => return Err(malformed(format!("invalid pin direction '{other}'"))),
        };
        if pins.iter().any(|p| p.name == name) {
            return Err(malformed(format!("duplicate pin '{name}' on block '{block}'")));
        }
        pins.push(Pin {
            name: name.to_string(),
            direction,
        });
    }
    Ok(pins)
}

fn parse_wire(rest: &str, line_no: usize) -> Result<Connection, ParseError> {
    let malformed = |detail: String| ParseError::MalformedSection {
        line: line_no,
        detail,
    };
    let rest = rest
        .trim()
        .strip_suffix(';')
        .ok_or_else(|| malformed("missing ';' after wire statement".to_string()))?;
    let (src, dst) = rest
        .split_once("->")
        .ok_or_else(|| malformed(format!("missing '->' in wire '{rest}'")))?;
    Ok(Connection {
        source: parse_endpoint(src.trim(), line_no)?,
        dest: parse_endpoint(dst.trim(), line_no)?,
    })
}

fn parse_endpoint(s: &str, line_no: usize) -> Result<Endpoint, ParseError> {
    let malformed = || ParseError::MalformedSection {
        line: line_no,
        detail: format!("invalid wire endpoint '{s}'"),
    };
    match s.split_once('.') {
        Some((owner, pin)) => {
            if !is_identifier(owner) || !is_identifier(pin) {
                return Err(malformed());
            }
            Ok(Endpoint {
                owner: owner.to_string(),
                pin: pin.to_string(),
            })
        }
        None => {
            if !is_identifier(s) {
                return Err(malformed());
            }
            // Bare variable endpoint: the variable is its own pin.
            Ok(Endpoint {
                owner: s.to_string(),
                pin: s.to_string(),
            })
        }
    }
}
