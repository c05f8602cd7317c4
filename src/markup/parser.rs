//! Recursive-descent markup scanner.
//!
//! One pass over the input string, no lookahead beyond the current tag.
//! Three shapes are recognized at the cursor, in priority order: a text run
//! (everything up to the next `<`), an opening or self-closing tag, and a
//! closing tag. Attribute values are captured in double-quoted form only.
//! Comments, processing instructions, and CDATA are not special-cased.

use tracing::debug;

use super::node::{Element, Node};

/// Options controlling text-node emission.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Emit every text run verbatim. When off (the default) runs are
    /// trimmed and whitespace-only runs are discarded.
    pub raw_text: bool,
}

/// Structural markup errors. Malformed structure aborts the parse: a tree
/// built from unbalanced markup is unsafe to hand to the materializer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarkupError {
    /// A closing tag with no open element to close.
    #[error("closing tag at byte {position} has no matching open element")]
    UnbalancedClose { position: usize },
    /// A closing tag naming a different element than the one open.
    #[error("closing tag </{found}> at byte {position} does not match open element <{expected}>")]
    MismatchedClose {
        expected: String,
        found: String,
        position: usize,
    },
    /// A tag or quoted attribute value cut off by end of input.
    #[error("tag starting at byte {position} is never terminated")]
    UnterminatedTag { position: usize },
}

/// Parse markup into an ordered node forest with default options.
pub fn parse(input: &str) -> Result<Vec<Node>, MarkupError> {
    parse_with(input, &ParseOptions::default())
}

/// Parse markup into an ordered node forest.
///
/// Elements still open at end of input are closed implicitly, as a
/// streaming scanner would.
pub fn parse_with(input: &str, options: &ParseOptions) -> Result<Vec<Node>, MarkupError> {
    let bytes = input.as_bytes();
    let mut roots: Vec<Node> = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut cursor = 0;

    while cursor < input.len() {
        if bytes[cursor] == b'<' {
            if input[cursor..].starts_with("</") {
                let (found, next) = parse_closing_tag(input, cursor)?;
                let closed = stack
                    .pop()
                    .ok_or(MarkupError::UnbalancedClose { position: cursor })?;
                if !found.is_empty() && closed.name != found {
                    return Err(MarkupError::MismatchedClose {
                        expected: closed.name,
                        found,
                        position: cursor,
                    });
                }
                attach(Node::Element(closed), &mut stack, &mut roots);
                cursor = next;
            } else {
                let (element, self_closing, next) = parse_tag(input, cursor)?;
                if self_closing {
                    attach(Node::Element(element), &mut stack, &mut roots);
                } else {
                    stack.push(element);
                }
                cursor = next;
            }
        } else {
            let end = input[cursor..]
                .find('<')
                .map(|i| cursor + i)
                .unwrap_or(input.len());
            let raw = &input[cursor..end];
            if options.raw_text {
                attach(Node::Text(decode_entities(raw)), &mut stack, &mut roots);
            } else {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    attach(Node::Text(decode_entities(trimmed)), &mut stack, &mut roots);
                }
            }
            cursor = end;
        }
    }

    if !stack.is_empty() {
        debug!(open = stack.len(), "input ended with open elements; closing implicitly");
    }
    while let Some(closed) = stack.pop() {
        attach(Node::Element(closed), &mut stack, &mut roots);
    }
    Ok(roots)
}

fn attach(node: Node, stack: &mut [Element], roots: &mut Vec<Node>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => roots.push(node),
    }
}

fn is_name_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-'
}

/// Parse `</name ...>` starting at `start`. Returns the closing name and
/// the cursor position after `>`.
fn parse_closing_tag(input: &str, start: usize) -> Result<(String, usize), MarkupError> {
    let bytes = input.as_bytes();
    let mut i = start + 2;
    let name_start = i;
    while i < bytes.len() && is_name_byte(bytes[i]) {
        i += 1;
    }
    let name = input[name_start..i].to_owned();
    let close = input[i..]
        .find('>')
        .ok_or(MarkupError::UnterminatedTag { position: start })?;
    Ok((name, i + close + 1))
}

/// Parse `<name attr="value" ...>` or `<name .../>` starting at `start`.
/// Returns the element, whether it was self-closing, and the cursor
/// position after `>`.
fn parse_tag(input: &str, start: usize) -> Result<(Element, bool, usize), MarkupError> {
    let bytes = input.as_bytes();
    let mut i = start + 1;
    let name_start = i;
    while i < bytes.len() && is_name_byte(bytes[i]) {
        i += 1;
    }
    let mut element = Element::new(&input[name_start..i]);

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            return Err(MarkupError::UnterminatedTag { position: start });
        }
        match bytes[i] {
            b'>' => return Ok((element, false, i + 1)),
            b'/' if bytes.get(i + 1) == Some(&b'>') => return Ok((element, true, i + 2)),
            b'/' => i += 1,
            _ => {
                let attr_start = i;
                while i < bytes.len() && is_name_byte(bytes[i]) {
                    i += 1;
                }
                if i == attr_start {
                    // Not a name byte; skip it and resynchronize.
                    i += 1;
                    continue;
                }
                let attr_name = input[attr_start..i].to_owned();
                while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                let mut value = String::new();
                if bytes.get(i) == Some(&b'=') {
                    i += 1;
                    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                        i += 1;
                    }
                    if bytes.get(i) == Some(&b'"') {
                        i += 1;
                        let close = input[i..]
                            .find('"')
                            .ok_or(MarkupError::UnterminatedTag { position: start })?;
                        value = decode_entities(&input[i..i + close]);
                        i += close + 1;
                    } else {
                        // Only double-quoted values are captured. Skip the
                        // token so the scan stays aligned.
                        while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>'
                        {
                            i += 1;
                        }
                    }
                }
                element.attributes.insert(attr_name, value);
            }
        }
    }
}

/// Decode the standard entities plus decimal and hex character references.
///
/// Anything that does not form a recognized entity is passed through
/// verbatim, ampersand included.
pub fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail
            .find(';')
            .filter(|&semi| (2..=10).contains(&semi))
            .and_then(|semi| decode_entity(&tail[1..semi]).map(|ch| (ch, semi)));
        match decoded {
            Some((ch, semi)) => {
                out.push(ch);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(body: &str) -> Option<char> {
    match body {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "amp" => Some('&'),
        _ => {
            let digits = body.strip_prefix('#')?;
            let code = match digits.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => digits.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}
