//! Region patching: regenerate the text between `// Codegen <Tag>` and
//! `// Codegen </Tag>` markers in an existing source file.
//!
//! The whole file is scanned before anything is rendered or written, so a
//! marker error never leaves a half-patched file behind.

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

use crate::config::GenConfig;
use crate::render::{self, RenderRequest, Style};
use crate::schema::Schema;

/// `// Codegen <VkFormat, uint32_t, c>` opens, `// Codegen </VkFormat>` closes.
static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*// Codegen <\s*(/?)\s*([A-Za-z_][A-Za-z0-9_]*)\s*(?:,\s*([A-Za-z0-9_]*)\s*(?:,\s*([A-Za-z0-9_]*)\s*)?)?>",
    )
    .unwrap()
});

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MarkerError {
    #[error("line {line}: </{tag}> closes a region that was never opened")]
    NotOpened { line: usize, tag: String },
    #[error("line {line}: <{open}> is not closed before <{found}>")]
    NotClosed {
        line: usize,
        open: String,
        found: String,
    },
    #[error("<{tag}> opened on line {line} is never closed")]
    Unterminated { line: usize, tag: String },
}

/// One region to regenerate, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    pub tag: String,
    /// Underlying type given in the opening marker.
    pub attr: Option<String>,
    pub style: Style,
    /// Lines from the previous closing marker (or the top of the file) to
    /// this opening marker.
    pub start_offset: usize,
    /// Lines from the opening marker to the closing marker.
    pub num_lines: usize,
}

impl ChangeSet {
    pub fn request(&self) -> RenderRequest {
        RenderRequest {
            group: self.tag.clone(),
            emit_string_table: false,
            style: self.style,
            underlying_type: self.attr.clone(),
        }
    }
}

#[derive(Debug)]
enum Marker {
    Open {
        tag: String,
        attr: Option<String>,
        style: Style,
    },
    Close {
        tag: String,
    },
}

fn parse_marker(line: &str) -> Option<Marker> {
    if !line.contains("Codegen") {
        return None;
    }
    let caps = MARKER_RE.captures(line)?;
    let tag = caps[2].to_string();
    if !caps[1].is_empty() {
        return Some(Marker::Close { tag });
    }
    let attr = caps
        .get(3)
        .map(|m| m.as_str().to_string())
        .filter(|s| !s.is_empty());
    let style = match caps.get(4).map(|m| m.as_str()) {
        Some("c") => Style::Legacy,
        _ => Style::Scoped,
    };
    Some(Marker::Open { tag, attr, style })
}

#[derive(Debug)]
enum ScanState {
    Closed,
    Open {
        tag: String,
        attr: Option<String>,
        style: Style,
        line: usize,
        start_offset: usize,
    },
}

/// Collect the regions of a file, checking that markers pair up with one
/// region open at a time.
pub fn scan_regions<S: AsRef<str>>(lines: &[S]) -> Result<Vec<ChangeSet>, MarkerError> {
    let mut changes = Vec::new();
    let mut state = ScanState::Closed;
    let mut last_close = 0;

    for (idx, line) in lines.iter().enumerate() {
        let Some(marker) = parse_marker(line.as_ref()) else {
            continue;
        };
        state = match (state, marker) {
            (ScanState::Closed, Marker::Open { tag, attr, style }) => ScanState::Open {
                tag,
                attr,
                style,
                line: idx,
                start_offset: idx - last_close,
            },
            (ScanState::Closed, Marker::Close { tag }) => {
                return Err(MarkerError::NotOpened { line: idx + 1, tag });
            }
            (ScanState::Open { tag, .. }, Marker::Open { tag: found, .. }) => {
                return Err(MarkerError::NotClosed {
                    line: idx + 1,
                    open: tag,
                    found,
                });
            }
            (
                ScanState::Open {
                    tag,
                    attr,
                    style,
                    line,
                    start_offset,
                },
                Marker::Close { tag: closing },
            ) => {
                if closing != tag {
                    return Err(MarkerError::NotClosed {
                        line: idx + 1,
                        open: tag,
                        found: format!("/{closing}"),
                    });
                }
                last_close = idx;
                changes.push(ChangeSet {
                    tag,
                    attr,
                    style,
                    start_offset,
                    num_lines: idx - line,
                });
                ScanState::Closed
            }
        };
    }

    match state {
        ScanState::Closed => Ok(changes),
        ScanState::Open { tag, line, .. } => Err(MarkerError::Unterminated {
            line: line + 1,
            tag,
        }),
    }
}

/// Replace the interior of every region with `render(change)`, tracking how
/// far earlier replacements moved the lines that follow.
pub fn apply_regions<F>(mut lines: Vec<String>, changes: &[ChangeSet], mut render: F) -> Vec<String>
where
    F: FnMut(&ChangeSet) -> String,
{
    let mut anchor = 0;
    for change in changes {
        let start = anchor + change.start_offset + 1;
        let remove = change.num_lines.saturating_sub(1);
        let generated: Vec<String> = render(change)
            .split_inclusive('\n')
            .map(String::from)
            .collect();
        let inserted = generated.len();
        lines.splice(start..start + remove, generated);
        anchor = start + inserted;
    }
    lines
}

/// Result of a successful patch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOutcome {
    pub regions: usize,
    pub backup: Option<PathBuf>,
}

pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".backup");
    PathBuf::from(name)
}

/// Regenerate every region of `input`. Writes to `output` (backing up an
/// existing file first), or to `stdout` when no output path is given.
pub fn patch_file(
    input: &Path,
    output: Option<&Path>,
    schema: &Schema,
    config: &GenConfig,
    stdout: &mut impl Write,
) -> Result<PatchOutcome> {
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let lines: Vec<String> = text.split_inclusive('\n').map(String::from).collect();

    let changes =
        scan_regions(&lines).with_context(|| format!("no code generated for {}", input.display()))?;
    tracing::debug!(path = %input.display(), regions = changes.len(), "markers scanned");

    let patched = apply_regions(lines, &changes, |change| {
        render::render_request(schema, &change.request(), config).unwrap_or_else(|e| {
            tracing::warn!("{e}");
            render::not_found_stub(&change.tag)
        })
    });
    let patched = patched.concat();

    let mut backup = None;
    match output {
        Some(path) => {
            if path.is_file() {
                let dest = backup_path(path);
                std::fs::copy(path, &dest)
                    .with_context(|| format!("failed to back up {}", path.display()))?;
                backup = Some(dest);
            }
            std::fs::write(path, &patched)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
        None => stdout
            .write_all(patched.as_bytes())
            .context("failed to write to stdout")?,
    }

    Ok(PatchOutcome {
        regions: changes.len(),
        backup,
    })
}
