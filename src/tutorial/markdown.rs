//! Tutorial Markdown rendering.
//!
//! Tutorial text is CommonMark with a couple of extensions:
//!
//! * shortcodes, each on a line of its own, e.g. `{{< commit add-rabbit >}}`;
//! * thematic breaks (`---`) separating the front matter from each chapter.

use crate::utils::error::{BuildError, Result};
use pulldown_cmark::{html, CowStr, Event, Options, Parser};
use regex::Regex;
use std::sync::OnceLock;

fn shortcode_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*\{\{<\s*([A-Za-z0-9_-]+)(?:\s+([^\s>]+))?\s*>\}\}\s*$")
            .expect("valid shortcode regex")
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shortcode {
    /// Show the code patch of the commit tagged with this slug.
    Commit { slug: String },
    RunFinishedProject,
}

impl Shortcode {
    fn parse(line: usize, name: &str, arg: Option<&str>) -> Result<Self> {
        match (name, arg) {
            ("commit", Some(slug)) => Ok(Self::Commit {
                slug: slug.to_string(),
            }),
            ("commit", None) => Err(BuildError::Shortcode {
                line,
                message: "'commit' shortcode needs a slug".to_string(),
            }),
            ("run-finished-project", None) => Ok(Self::RunFinishedProject),
            ("run-finished-project", Some(arg)) => Err(BuildError::Shortcode {
                line,
                message: format!("'run-finished-project' takes no argument (got '{}')", arg),
            }),
            (other, _) => Err(BuildError::Shortcode {
                line,
                message: format!("unknown shortcode '{}'", other),
            }),
        }
    }
}

/// An open fenced code block: its fence character and run length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fence {
    ch: char,
    len: usize,
}

impl Fence {
    /// The fence a line opens, if any.
    fn opened_by(line: &str) -> Option<Self> {
        let trimmed = line.trim_start();
        let ch = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
        let len = trimmed.chars().take_while(|c| *c == ch).count();
        if len < 3 {
            return None;
        }
        // A backtick fence's info string may not itself contain backticks.
        if ch == '`' && trimmed[len..].contains('`') {
            return None;
        }
        Some(Self { ch, len })
    }

    fn is_closed_by(&self, line: &str) -> bool {
        let trimmed = line.trim();
        let run = trimmed.chars().take_while(|c| *c == self.ch).count();
        run >= self.len && run == trimmed.chars().count()
    }
}

/// Each line of `text`, with the shortcode it holds if it is one.
///
/// Lines inside fenced code blocks are never shortcodes.
fn classify_lines(text: &str) -> Result<Vec<(&str, Option<Shortcode>)>> {
    let mut lines = Vec::new();
    let mut fence: Option<Fence> = None;

    for (idx, line) in text.lines().enumerate() {
        match fence {
            Some(open) => {
                if open.is_closed_by(line) {
                    fence = None;
                }
                lines.push((line, None));
            }
            None => {
                if let Some(open) = Fence::opened_by(line) {
                    fence = Some(open);
                    lines.push((line, None));
                    continue;
                }
                let shortcode = match shortcode_regex().captures(line) {
                    Some(caps) => {
                        let name = caps.get(1).map_or("", |m| m.as_str());
                        let arg = caps.get(2).map(|m| m.as_str());
                        Some(Shortcode::parse(idx + 1, name, arg)?)
                    }
                    None => None,
                };
                lines.push((line, shortcode));
            }
        }
    }

    Ok(lines)
}

fn markdown_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options
}

pub fn render_markdown(text: &str) -> String {
    let mut html_output = String::new();
    html::push_html(&mut html_output, Parser::new_ext(text, markdown_options()));
    html_output
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderedTutorial {
    pub front_matter: String,
    pub chapters: Vec<String>,
}

const PLACEHOLDER_PREFIX: &str = "<!-- pytchbuild-shortcode:";
const PLACEHOLDER_SUFFIX: &str = " -->";

/// The shortcode index named by an HTML-block line standing in for it.
fn placeholder_index(html: &str) -> Option<usize> {
    html.trim()
        .strip_prefix(PLACEHOLDER_PREFIX)?
        .strip_suffix(PLACEHOLDER_SUFFIX)?
        .parse()
        .ok()
}

/// Render tutorial text, asking `patch_html` for the HTML of each
/// `commit` shortcode's slug.
///
/// The text is parsed as one document, with each shortcode line standing
/// in as an HTML comment block, so link references resolve across
/// shortcodes. Only top-level thematic breaks start a new chapter.
pub fn render_tutorial<F>(text: &str, mut patch_html: F) -> Result<RenderedTutorial>
where
    F: FnMut(&str) -> Result<String>,
{
    let mut shortcodes = Vec::new();
    let mut source = String::with_capacity(text.len());
    for (line, shortcode) in classify_lines(text)? {
        match shortcode {
            Some(shortcode) => {
                let indent = &line[..line.len() - line.trim_start().len()];
                source.push_str(&format!(
                    "{}{}{}{}\n",
                    indent,
                    PLACEHOLDER_PREFIX,
                    shortcodes.len(),
                    PLACEHOLDER_SUFFIX
                ));
                shortcodes.push(shortcode);
            }
            None => {
                source.push_str(line);
                source.push('\n');
            }
        }
    }

    let mut finished: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut pending: Vec<Event<'_>> = Vec::new();
    let mut depth = 0usize;

    for event in Parser::new_ext(&source, markdown_options()) {
        match event {
            Event::Start(_) => {
                depth += 1;
                pending.push(event);
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                pending.push(event);
            }
            Event::Rule if depth == 0 => {
                html::push_html(&mut current, pending.drain(..));
                finished.push(std::mem::take(&mut current));
            }
            Event::Html(raw) => match placeholder_index(&raw).and_then(|i| shortcodes.get(i)) {
                Some(Shortcode::Commit { slug }) => {
                    pending.push(Event::Html(CowStr::from(patch_html(slug)?)));
                }
                Some(Shortcode::RunFinishedProject) => {
                    pending.push(Event::Html(CowStr::from(
                        "<div class=\"run-finished-project\"></div>\n",
                    )));
                }
                None => pending.push(Event::Html(raw)),
            },
            other => pending.push(other),
        }
    }
    html::push_html(&mut current, pending.into_iter());
    finished.push(current);

    let mut chunks = finished.into_iter();
    let front_matter = chunks.next().unwrap_or_default();
    Ok(RenderedTutorial {
        front_matter,
        chapters: chunks.collect(),
    })
}
