//! Pool-state files.
//!
//! One leaf per line, `<path> <type> <value>`:
//!
//! ```text
//! # parampool state
//! "Main menu/Nx" int 40
//! dolfin/linear_solver choice gmres
//! output/title str Run 1\nsecond line
//! ```
//!
//! Paths containing whitespace, quotes or a leading `#` are quoted. String
//! values escape backslash, newline, carriage return and tab; everything
//! after the separating space is the value. Blank lines and `#` comments are
//! ignored, so the files can be edited by hand.

use std::{fmt::Write as _, fs, path::Path};

use log::debug;

use crate::{
    data::{item::Item, pool::Pool, value::ValueTag},
    error::{Origin, PoolError, Result},
    resolve::{Assignment, Source, apply_source},
    traverse::Visitor,
};

const HEADER: &str = "# parampool state\n# <path> <type> <value>\n";

fn quote_path(path: &str) -> String {
    let needs_quotes = path.starts_with('#')
        || path.chars().any(|c| c.is_whitespace() || c == '"' || c == '\\');
    if !needs_quotes {
        return path.to_string();
    }
    let mut out = String::with_capacity(path.len() + 2);
    out.push('"');
    for c in path.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

/// Reverse of [`escape_value`]. Unknown escapes are kept as written.
fn unescape_value(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

struct LineWriter(String);

impl Visitor for LineWriter {
    fn leaf(&mut self, path: &str, item: &Item) {
        let tag = item.kind().tag();
        let value = match tag {
            ValueTag::Str | ValueTag::Choice => escape_value(&item.value().to_string()),
            _ => item.value().to_string(),
        };
        let _ = writeln!(self.0, "{} {tag} {value}", quote_path(path));
    }
}

/// Render `pool` in pool-file format.
pub fn render_pool_file(pool: &Pool) -> String {
    let mut writer = LineWriter(String::from(HEADER));
    pool.walk(&mut writer);
    writer.0
}

/// Write `pool` to the file at `path`.
pub fn write_pool_file(pool: &Pool, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, render_pool_file(pool)).map_err(|e| PoolError::io(path, e))?;
    debug!("wrote {} parameters to {}", pool.len(), path.display());
    Ok(())
}

/// Split a quoted path off the start of `line`.
fn take_quoted(line: &str) -> Option<(String, &str)> {
    let mut name = String::new();
    let mut escaped = false;
    for (idx, c) in line.char_indices().skip(1) {
        match c {
            _ if escaped => {
                name.push(c);
                escaped = false;
            }
            '\\' => escaped = true,
            '"' => return Some((name, &line[idx + 1..])),
            _ => name.push(c),
        }
    }
    None
}

fn split_token(text: &str) -> (&str, &str) {
    match text.find(char::is_whitespace) {
        Some(idx) => (&text[..idx], &text[idx..]),
        None => (text, ""),
    }
}

/// Parse one non-comment line into `(name, tag, raw value)`.
fn parse_line(line: &str) -> Result<(String, ValueTag, String), String> {
    let (name, rest) = if line.starts_with('"') {
        take_quoted(line).ok_or("unterminated quoted path")?
    } else {
        let (name, rest) = split_token(line);
        (name.to_string(), rest)
    };
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return Err("expected whitespace after the path".to_string());
    }

    let (tag_token, rest) = split_token(rest.trim_start());
    if tag_token.is_empty() {
        return Err("expected `<path> <type> <value>`".to_string());
    }
    let tag = ValueTag::from_token(tag_token)
        .ok_or_else(|| format!("unknown type tag `{tag_token}`"))?;

    // one separator character, the rest is the value
    let mut value = rest.chars();
    value.next();
    let value = value.as_str();
    let raw = match tag {
        ValueTag::Str | ValueTag::Choice => unescape_value(value),
        _ => value.trim().to_string(),
    };
    Ok((name, tag, raw))
}

/// Parse pool-file text into a source attributed to `file`.
///
/// Only syntax is checked here; names and values are checked when the
/// source is applied.
pub fn parse_pool_file(text: &str, file: &Path) -> Result<Source> {
    let mut source = Source::new(Origin::PoolFile(file.to_path_buf()));
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let (name, tag, raw) = parse_line(trimmed).map_err(|message| PoolError::PoolFileParse {
            file: file.to_path_buf(),
            line: idx + 1,
            message,
        })?;
        source.push(Assignment {
            tag: Some(tag),
            line: Some(idx + 1),
            ..Assignment::new(name, raw)
        });
    }
    Ok(source)
}

/// Read and parse the pool file at `path`.
pub fn read_pool_file(path: impl AsRef<Path>) -> Result<Source> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| PoolError::io(path, e))?;
    parse_pool_file(&text, path)
}

/// Load a pool file as one atomic override source.
///
/// Any malformed line or unknown path rejects the whole file.
pub fn set_defaults_from_file(pool: &mut Pool, path: impl AsRef<Path>) -> Result<usize> {
    let source = read_pool_file(path)?;
    apply_source(pool, &source)
}
