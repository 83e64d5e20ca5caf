//! Request-driven generation: a batch over a request file, or an interactive
//! prompt loop.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};

use crate::config::GenConfig;
use crate::render::{self, RenderRequest, Style};
use crate::schema::Schema;

/// A request line that could not be understood. Carries the 1-based line
/// number of the input.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("line {line}: missing group name")]
    MissingGroup { line: usize },
    #[error("line {line}: `{name}` is not a valid group name")]
    InvalidGroup { line: usize, name: String },
    #[error("line {line}: expected yes/no for the string table flag, got `{value}`")]
    InvalidFlag { line: usize, value: String },
    #[error("line {line}: unknown style `{value}` (expected `c` or nothing)")]
    InvalidStyle { line: usize, value: String },
    #[error("line {line}: expected at most 3 fields, got {count}")]
    TooManyFields { line: usize, count: usize },
}

fn parse_bool(token: &str) -> Option<bool> {
    match token.to_ascii_lowercase().as_str() {
        "yes" | "true" | "t" | "1" => Some(true),
        "" | "no" | "false" | "f" | "0" => Some(false),
        _ => None,
    }
}

fn strip_comment(line: &str) -> &str {
    line.split('#').next().unwrap_or("")
}

/// Parse `<group>[, <string table: bool>][, <style: c>]`.
///
/// `Ok(None)` for blank and comment-only lines.
pub fn parse_request_line(line: &str, line_no: usize) -> Result<Option<RenderRequest>, RequestError> {
    let content = strip_comment(line).trim();
    if content.is_empty() {
        return Ok(None);
    }

    let fields: Vec<&str> = content.split(',').map(str::trim).collect();
    if fields.len() > 3 {
        return Err(RequestError::TooManyFields {
            line: line_no,
            count: fields.len(),
        });
    }

    let group = fields[0];
    if group.is_empty() {
        return Err(RequestError::MissingGroup { line: line_no });
    }
    if !group.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(RequestError::InvalidGroup {
            line: line_no,
            name: group.to_string(),
        });
    }

    let flag = fields.get(1).copied().unwrap_or("");
    let emit_string_table = parse_bool(flag).ok_or_else(|| RequestError::InvalidFlag {
        line: line_no,
        value: flag.to_string(),
    })?;

    let style = match fields.get(2).copied().unwrap_or("") {
        "" => Style::Scoped,
        s if s.eq_ignore_ascii_case("c") => Style::Legacy,
        other => {
            return Err(RequestError::InvalidStyle {
                line: line_no,
                value: other.to_string(),
            });
        }
    };

    Ok(Some(RenderRequest {
        group: group.to_string(),
        emit_string_table,
        style,
        underlying_type: None,
    }))
}

/// Counts reported at the end of a batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub generated: usize,
    pub not_found: usize,
    pub skipped: usize,
}

fn banner_block(config: &GenConfig) -> String {
    format!("\n{}\n\n", config.banner())
}

fn prologue(config: &GenConfig, include_string: bool) -> String {
    let mut out = String::from("#pragma once\n\n");
    out.push_str("// This file was auto-generated by enumgen. Do not edit.\n\n");
    out.push_str("#include <stdint.h>\n");
    if include_string {
        out.push_str("#include <string>\n");
    }
    if !config.namespace.is_empty() {
        out.push_str(&format!("\nnamespace {} {{\n", config.namespace));
    }
    out
}

/// Render every request read from `input` into one header on `out`.
///
/// Malformed lines are logged and skipped; unknown groups become stubs.
pub fn run_batch(
    schema: &Schema,
    input: impl BufRead,
    out: &mut impl Write,
    config: &GenConfig,
) -> Result<BatchSummary> {
    let mut summary = BatchSummary::default();
    let mut blocks = Vec::new();

    for (idx, line) in input.lines().enumerate() {
        let line = line.context("failed to read requests")?;
        let request = match parse_request_line(&line, idx + 1) {
            Ok(Some(request)) => request,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!("skipping request: {e}");
                summary.skipped += 1;
                continue;
            }
        };
        match render::render_request(schema, &request, config) {
            Ok(block) => {
                summary.generated += 1;
                blocks.push(block);
            }
            Err(e) => {
                tracing::warn!("{e}");
                summary.not_found += 1;
                blocks.push(render::not_found_stub(&request.group));
            }
        }
    }

    let include_string = blocks.iter().any(|b| render::needs_string_header(b));
    let mut text = prologue(config, include_string);
    for block in &blocks {
        text.push_str(&banner_block(config));
        text.push_str(block);
    }
    text.push_str(&banner_block(config));
    if !config.namespace.is_empty() {
        text.push_str(&format!("}} // end namespace {}\n", config.namespace));
    }

    out.write_all(text.as_bytes())
        .context("failed to write generated header")?;
    Ok(summary)
}

fn is_quit(line: &str) -> bool {
    matches!(line, "q" | "quit" | "exit")
}

/// Render one interactive line: a struct template if the name is a known
/// struct, otherwise an enum request.
fn render_interactive(schema: &Schema, line: &str, config: &GenConfig) -> String {
    let name = strip_comment(line).split(',').next().unwrap_or("").trim();
    if let Some(def) = schema.struct_def(name) {
        return render::structs::render_struct(def, config);
    }
    match parse_request_line(line, 1) {
        Ok(Some(request)) => render::render_request(schema, &request, config)
            .unwrap_or_else(|_| render::not_found_stub(&request.group)),
        Ok(None) => String::new(),
        Err(e) => format!("// {e}\n"),
    }
}

/// Prompt for names on `out` until `q`, `quit`, `exit` or end of input.
/// Returns how many blocks were rendered.
pub fn run_interactive(
    schema: &Schema,
    mut input: impl BufRead,
    out: &mut impl Write,
    config: &GenConfig,
) -> Result<usize> {
    writeln!(
        out,
        "// Enter a struct or enum name to begin, Ctrl+D to end interactive session:"
    )?;
    let mut rendered = 0;
    let mut line = String::new();
    loop {
        write!(out, "('q' to quit): ")?;
        out.flush()?;
        line.clear();
        if input.read_line(&mut line).context("failed to read input")? == 0 {
            writeln!(out)?;
            break;
        }
        let trimmed = strip_comment(&line).trim();
        if is_quit(trimmed) {
            break;
        }
        if trimmed.is_empty() {
            continue;
        }
        let body = render_interactive(schema, trimmed, config);
        write!(out, "{}{body}{}", banner_block(config), banner_block(config))?;
        rendered += 1;
    }
    tracing::debug!(rendered, "interactive session ended");
    Ok(rendered)
}
