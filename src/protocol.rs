//! Wire-level pieces of the Tor control protocol.
//!
//! Reply-line parsing, the quoted-string codec, command formatting and the
//! version comparison used to gate `ADD_ONION` against legacy daemons.
//! Payloads are kept as bytes throughout: Tor permits non-UTF-8 content in
//! CmdData sections.

use std::borrow::Cow;

use crate::error::{Error, Result};

/// A raw reply line from Tor, stripped of its CRLF terminator.
#[derive(Debug, Clone)]
pub struct ReplyLine {
    /// The 3-digit status code.
    pub code: u16,
    /// The separator character: `-` mid-reply, `+` data, space for the end.
    pub separator: char,
    /// The payload after the separator.
    pub data: Vec<u8>,
}

impl ReplyLine {
    /// Parse a reply line. The first three bytes must be ASCII digits and
    /// the fourth one of space, `-` or `+`.
    pub fn parse(line: &[u8]) -> Result<Self> {
        if line.len() < 4 {
            return Err(Error::Protocol(format!(
                "reply line too short: {:?}",
                String::from_utf8_lossy(line)
            )));
        }
        if !line[..3].iter().all(u8::is_ascii_digit) {
            return Err(Error::Protocol(format!(
                "invalid status code in: {:?}",
                String::from_utf8_lossy(line)
            )));
        }
        let code = (line[0] - b'0') as u16 * 100 + (line[1] - b'0') as u16 * 10 + (line[2] - b'0') as u16;
        if code < 100 {
            return Err(Error::Protocol(format!("status code {code} out of range")));
        }

        let separator = line[3] as char;
        if !matches!(separator, ' ' | '-' | '+') {
            return Err(Error::Protocol(format!(
                "invalid separator {separator:?} in: {:?}",
                String::from_utf8_lossy(line)
            )));
        }

        Ok(ReplyLine {
            code,
            separator,
            data: line[4..].to_vec(),
        })
    }

    /// Whether this is the terminal line of a reply.
    pub fn is_end(&self) -> bool {
        self.separator == ' '
    }

    /// Whether this line opens a data section terminated by a lone `.`.
    pub fn is_data(&self) -> bool {
        self.separator == '+'
    }

    /// Whether this is a mid-reply continuation line.
    pub fn is_mid(&self) -> bool {
        self.separator == '-'
    }

    /// The payload as text, lossy for the rare non-UTF-8 case.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }
}

/// Wrap a byte string in double quotes, escaping `"` and `\`.
pub fn quoted(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len() + 2);
    out.push(b'"');
    for &byte in input {
        match byte {
            b'"' => out.extend_from_slice(b"\\\""),
            b'\\' => out.extend_from_slice(b"\\\\"),
            _ => out.push(byte),
        }
    }
    out.push(b'"');
    out
}

/// [`quoted`] for text values.
pub fn quoted_str(input: &str) -> String {
    String::from_utf8(quoted(input.as_bytes())).expect("quoting preserves UTF-8")
}

/// Undo [`quoted`]. Input that does not start with a quote is returned as-is.
pub fn unquoted(input: &[u8]) -> Vec<u8> {
    if input.len() < 2 || input[0] != b'"' {
        return input.to_vec();
    }

    let mut out = Vec::with_capacity(input.len() - 2);
    let mut i = 1;
    while i < input.len() {
        match input[i] {
            b'\\' => {
                i += 1;
                if i < input.len() {
                    out.push(input[i]);
                }
            }
            b'"' => return out,
            byte => out.push(byte),
        }
        i += 1;
    }
    out
}

/// Split on `separator`, treating quoted sections (with `\` escapes) as
/// opaque. Matches how Tor separates event and reply arguments.
pub fn split_quoted(input: &[u8], separator: u8) -> Vec<Vec<u8>> {
    let mut out = Vec::new();
    let mut in_quote = false;
    let mut start = 0;
    let mut i = 0;

    while i < input.len() {
        match input[i] {
            b'"' => in_quote = !in_quote,
            b'\\' if in_quote => i += 1,
            _ => {}
        }
        if !in_quote && i < input.len() && input[i] == separator {
            out.push(input[start..i].to_vec());
            start = i + 1;
        }
        i += 1;
    }

    if start < input.len() {
        out.push(input[start..].to_vec());
    }
    out
}

/// Strip ASCII whitespace from both ends of a byte string.
pub fn trim(input: &[u8]) -> &[u8] {
    let start = input
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(input.len());
    let end = input
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |p| p + 1);
    &input[start..end]
}

/// Format a command line: uppercase keyword, space-separated arguments, CRLF.
pub fn format_command(keyword: &str, args: &[&str]) -> String {
    let mut cmd = keyword.to_string();
    for arg in args {
        cmd.push(' ');
        cmd.push_str(arg);
    }
    cmd.push_str("\r\n");
    cmd
}

/// Whether `version` is at least `target`, comparing dotted numeric
/// segments left to right. The first differing segment decides; a
/// non-numeric segment or an exhausted side ends the comparison, with a
/// shorter `version` counting as older.
pub fn version_at_least(version: &str, target: &str) -> bool {
    let version_parts: Vec<&str> = version.split(['.', '-']).collect();
    let target_parts: Vec<&str> = target.split(['.', '-']).collect();

    for i in 0..version_parts.len().max(target_parts.len()) {
        let Some(part) = version_parts.get(i) else {
            return false;
        };
        let Some(target_part) = target_parts.get(i) else {
            return true;
        };
        let (Ok(value), Ok(target_value)) = (part.parse::<u64>(), target_part.parse::<u64>()) else {
            return true;
        };
        if value != target_value {
            return value > target_value;
        }
    }
    true
}
