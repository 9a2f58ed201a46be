//! HotSpot LogCompilation ingestion
//!
//! Sprint 2-3: log tokenizer and record routing
//!
//! Turns `-XX:+LogCompilation` output into [`Compilation`] records. The log
//! is XML-shaped but not XML: attribute values are single-quoted, elements
//! interleave with free-form tty output, and a dying VM truncates the file
//! mid-element. The tokenizer is therefore line-oriented and tolerant:
//! every input line either yields an element event or is counted and
//! skipped, and parsing never fails on content.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::compilation::Compilation;
use crate::tag::{AttributeMap, Tag, TagKind, ATTR_COMPILE_ID, TAG_TASK_DONE};

/// Element names that group the interesting records without being records
/// themselves. They are transparent: their children route as if top-level
/// and are never accumulated, so memory stays bounded over long logs.
const CONTAINER_TAGS: [&str; 3] = ["hotspot_log", "compilation_log", "tty"];

fn is_container(name: &str) -> bool {
    CONTAINER_TAGS.contains(&name)
}

/// One tokenized log line
#[derive(Debug, Clone, PartialEq, Eq)]
enum LineToken {
    /// `<name a='v'/>`, a complete element on one line
    SelfClosed { name: String, attributes: AttributeMap },
    /// `<name a='v'>`, opens a nested element
    Open { name: String, attributes: AttributeMap },
    /// `</name>`
    Close { name: String },
}

fn is_element_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Decode the five XML entities the VM writer emits. `&amp;` is replaced
/// last so already-escaped entities survive one level of double escaping.
fn unescape(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Parse `key='value'` pairs (single or double quotes). Returns `None` on
/// anything that does not scan cleanly, e.g. an unterminated quote.
fn parse_attributes(input: &str) -> Option<AttributeMap> {
    let mut attributes = AttributeMap::new();
    let bytes = input.as_bytes();
    let mut pos = 0;

    while pos < bytes.len() {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos >= bytes.len() {
            break;
        }

        let key_start = pos;
        while pos < bytes.len() && bytes[pos] != b'=' && !bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos >= bytes.len() || bytes[pos] != b'=' {
            return None;
        }
        let key = &input[key_start..pos];
        pos += 1;

        if pos >= bytes.len() {
            return None;
        }
        let quote = bytes[pos];
        if quote != b'\'' && quote != b'"' {
            return None;
        }
        pos += 1;

        let value_start = pos;
        while pos < bytes.len() && bytes[pos] != quote {
            pos += 1;
        }
        if pos >= bytes.len() {
            return None;
        }
        let value = &input[value_start..pos];
        pos += 1;

        attributes.insert(key.to_string(), unescape(value));
    }

    Some(attributes)
}

/// Tokenize one trimmed line. `None` means the line carries no element
/// event: blank, free-form tty text, the XML prolog, or malformed markup.
fn tokenize_line(trimmed: &str) -> Option<LineToken> {
    if !trimmed.starts_with('<') || !trimmed.ends_with('>') || trimmed.len() < 3 {
        return None;
    }
    if trimmed.starts_with("<?") || trimmed.starts_with("<!") {
        return None;
    }

    if let Some(rest) = trimmed.strip_prefix("</") {
        let name = rest.strip_suffix('>')?.trim();
        if !is_element_name(name) {
            return None;
        }
        return Some(LineToken::Close {
            name: name.to_string(),
        });
    }

    let self_closed = trimmed.ends_with("/>");
    let body = if self_closed {
        &trimmed[1..trimmed.len() - 2]
    } else {
        &trimmed[1..trimmed.len() - 1]
    };
    let body = body.trim();

    let (name, rest) = match body.find(|c: char| c.is_ascii_whitespace()) {
        Some(split) => (&body[..split], body[split..].trim_start()),
        None => (body, ""),
    };
    if !is_element_name(name) {
        return None;
    }
    let attributes = parse_attributes(rest)?;

    let name = name.to_string();
    if self_closed {
        Some(LineToken::SelfClosed { name, attributes })
    } else {
        Some(LineToken::Open { name, attributes })
    }
}

/// Counters describing one parse run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseSummary {
    /// Input lines inspected, element or not
    pub lines_seen: u64,
    /// Elements attached to a compilation record (a `task` with a nested
    /// `task_done` counts as two)
    pub records_routed: u64,
    /// Lines that produced no element event
    pub lines_skipped: u64,
    /// Lifecycle elements dropped for lack of routing identity
    pub records_dropped: u64,
}

/// Streaming parser owning the growing set of compilations.
///
/// Indices are assigned in order of first sight of each `compile_id`, so
/// record one of a log is always `#1` no matter which of its elements
/// arrives first. Feed lines with [`parse_line`], or whole inputs with
/// [`parse_str`] / [`parse_file`], then take the results via
/// [`compilations`] or [`into_compilations`].
///
/// [`parse_line`]: LogParser::parse_line
/// [`parse_str`]: LogParser::parse_str
/// [`parse_file`]: LogParser::parse_file
/// [`compilations`]: LogParser::compilations
/// [`into_compilations`]: LogParser::into_compilations
#[derive(Debug, Default)]
pub struct LogParser {
    compilations: Vec<Compilation>,
    index_by_id: HashMap<String, usize>,
    open_stack: Vec<Tag>,
    summary: ParseSummary,
}

impl LogParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one log line
    pub fn parse_line(&mut self, line: &str) {
        self.summary.lines_seen += 1;
        let trimmed = line.trim();

        match tokenize_line(trimmed) {
            Some(token) => self.handle_token(token),
            None => {
                self.summary.lines_skipped += 1;
                if looks_like_element(trimmed) {
                    warn!(line = trimmed, "skipping malformed element line");
                }
            }
        }
    }

    /// Parse a complete in-memory log. Elements still open at the end of
    /// input are auto-closed so truncated logs keep their last task.
    pub fn parse_str(&mut self, text: &str) -> ParseSummary {
        for line in text.lines() {
            self.parse_line(line);
        }
        self.drain_open_elements();
        self.summary
    }

    /// Parse a log file from disk
    pub fn parse_file(&mut self, path: &Path) -> Result<ParseSummary> {
        let file = File::open(path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        let reader = BufReader::new(file);

        for line in reader.lines() {
            let line =
                line.with_context(|| format!("failed to read log file {}", path.display()))?;
            self.parse_line(&line);
        }

        self.drain_open_elements();
        Ok(self.summary)
    }

    /// All compilations in first-sight order
    pub fn compilations(&self) -> &[Compilation] {
        &self.compilations
    }

    /// Consume the parser, keeping the compilations
    pub fn into_compilations(self) -> Vec<Compilation> {
        self.compilations
    }

    /// Look up a compilation by the compile_id its records carried
    pub fn compilation_by_id(&self, compile_id: &str) -> Option<&Compilation> {
        self.index_by_id
            .get(compile_id)
            .and_then(|&index| self.compilations.get(index))
    }

    /// Counters for the lines fed so far
    pub fn summary(&self) -> ParseSummary {
        self.summary
    }

    fn handle_token(&mut self, token: LineToken) {
        match token {
            LineToken::SelfClosed { name, attributes } => {
                self.finish_element(Tag::new(name, attributes));
            }
            LineToken::Open { name, attributes } => {
                if is_container(&name) {
                    return;
                }
                self.open_stack.push(Tag::new(name, attributes));
            }
            LineToken::Close { name } => {
                if is_container(&name) {
                    return;
                }
                while let Some(tag) = self.open_stack.pop() {
                    let matched = tag.name() == name;
                    if !matched {
                        warn!(element = tag.name(), "auto-closing unterminated element");
                    }
                    self.finish_element(tag);
                    if matched {
                        return;
                    }
                }
                warn!(element = %name, "closing element that was never opened");
            }
        }
    }

    /// A completed element becomes a child of the innermost open element,
    /// or routes into a compilation when nothing is open above it.
    fn finish_element(&mut self, tag: Tag) {
        if let Some(parent) = self.open_stack.last_mut() {
            parent.push_child(Arc::new(tag));
            return;
        }
        self.route(Arc::new(tag));
    }

    fn route(&mut self, tag: Arc<Tag>) {
        let kind = match tag.kind() {
            Some(kind) => kind,
            None => {
                debug!(element = tag.name(), "ignoring unrecognized element");
                return;
            }
        };

        if kind == TagKind::TaskDone {
            // task_done carries no compile_id; it is only reachable through
            // the task element it is nested in
            self.summary.records_dropped += 1;
            warn!("dropping task_done outside a task element");
            return;
        }

        let compile_id = match tag.attribute(ATTR_COMPILE_ID) {
            Some(id) => id.to_owned(),
            None => {
                self.summary.records_dropped += 1;
                warn!(
                    element = tag.name(),
                    "dropping lifecycle element without compile_id"
                );
                return;
            }
        };

        let index = self.index_for(&compile_id);
        let compilation = &mut self.compilations[index];

        match kind {
            TagKind::TaskQueued => {
                compilation.attach_queued(tag);
                self.summary.records_routed += 1;
            }
            TagKind::NMethod => {
                compilation.attach_nmethod(tag);
                self.summary.records_routed += 1;
            }
            TagKind::Task => {
                let task_done = tag.first_named_child(TAG_TASK_DONE).cloned();
                compilation.attach_task(tag);
                self.summary.records_routed += 1;
                if let Some(task_done) = task_done {
                    compilation.attach_task_done(task_done);
                    self.summary.records_routed += 1;
                }
            }
            TagKind::TaskDone => unreachable!("handled above"),
        }
    }

    fn index_for(&mut self, compile_id: &str) -> usize {
        if let Some(&index) = self.index_by_id.get(compile_id) {
            return index;
        }
        let index = self.compilations.len();
        self.compilations.push(Compilation::new(index));
        self.index_by_id.insert(compile_id.to_owned(), index);
        index
    }

    fn drain_open_elements(&mut self) {
        while let Some(tag) = self.open_stack.pop() {
            warn!(
                element = tag.name(),
                "auto-closing element left open at end of input"
            );
            self.finish_element(tag);
        }
    }
}

fn looks_like_element(trimmed: &str) -> bool {
    trimmed.starts_with('<') && !trimmed.starts_with("<?") && !trimmed.starts_with("<!")
}
