use crate::utils::error::Result;
use git2::{Blob, Patch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Context,
    Added,
    Removed,
}

impl LineKind {
    fn from_origin(origin: char) -> Option<Self> {
        match origin {
            ' ' => Some(Self::Context),
            '+' => Some(Self::Added),
            '-' => Some(Self::Removed),
            _ => None,
        }
    }

    fn css_class(self) -> &'static str {
        match self {
            Self::Context => "diff-context",
            Self::Added => "diff-add",
            Self::Removed => "diff-del",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchLine {
    pub kind: LineKind,
    pub old_lineno: Option<u32>,
    pub new_lineno: Option<u32>,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchHunk {
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
    pub lines: Vec<PatchLine>,
}

/// The change a tagged commit makes to the project's code.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CodePatch {
    pub hunks: Vec<PatchHunk>,
}

impl CodePatch {
    pub fn from_blobs(old_blob: &Blob<'_>, new_blob: &Blob<'_>) -> Result<Self> {
        let patch = Patch::from_blobs(old_blob, None, new_blob, None, None)?;
        let mut hunks = Vec::with_capacity(patch.num_hunks());

        for hunk_idx in 0..patch.num_hunks() {
            let (hunk, n_lines) = patch.hunk(hunk_idx)?;
            let mut lines = Vec::with_capacity(n_lines);

            for line_idx in 0..n_lines {
                let line = patch.line_in_hunk(hunk_idx, line_idx)?;
                // Skip the "no newline at end of file" markers.
                let Some(kind) = LineKind::from_origin(line.origin()) else {
                    continue;
                };
                let content = String::from_utf8_lossy(line.content());
                lines.push(PatchLine {
                    kind,
                    old_lineno: line.old_lineno(),
                    new_lineno: line.new_lineno(),
                    content: content.trim_end_matches(['\r', '\n']).to_string(),
                });
            }

            hunks.push(PatchHunk {
                old_start: hunk.old_start(),
                old_lines: hunk.old_lines(),
                new_start: hunk.new_start(),
                new_lines: hunk.new_lines(),
                lines,
            });
        }

        Ok(Self { hunks })
    }

    pub fn n_added(&self) -> usize {
        self.count(LineKind::Added)
    }

    pub fn n_removed(&self) -> usize {
        self.count(LineKind::Removed)
    }

    fn count(&self, kind: LineKind) -> usize {
        self.hunks
            .iter()
            .flat_map(|h| h.lines.iter())
            .filter(|l| l.kind == kind)
            .count()
    }

    /// Render as one `<table class="patch">` per hunk, runs of same-kind
    /// lines grouped into a `<tbody>`.
    pub fn to_html(&self, slug: &str) -> String {
        let mut html = format!(
            "<div class=\"patch-container\" data-slug=\"{}\">\n",
            escape_html(slug)
        );

        for hunk in &self.hunks {
            html.push_str("<table class=\"patch\">\n");
            for run in hunk.lines.chunk_by(|a, b| a.kind == b.kind) {
                html.push_str(&format!("<tbody class=\"{}\">\n", run[0].kind.css_class()));
                for line in run {
                    html.push_str(&format!(
                        "<tr><td>{}</td><td>{}</td><td><pre>{}</pre></td></tr>\n",
                        lineno_cell(line.old_lineno),
                        lineno_cell(line.new_lineno),
                        escape_html(&line.content)
                    ));
                }
                html.push_str("</tbody>\n");
            }
            html.push_str("</table>\n");
        }

        html.push_str("</div>\n");
        html
    }
}

fn lineno_cell(lineno: Option<u32>) -> String {
    lineno.map(|n| n.to_string()).unwrap_or_default()
}

/// Escape text for use in HTML content or a double-quoted attribute.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
