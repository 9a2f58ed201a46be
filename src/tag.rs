//! Attribute-bag records parsed from HotSpot compilation log events
//!
//! Sprint 1-2: MVP tag model
//!
//! A `-XX:+LogCompilation` file is a stream of XML-ish elements, each a flat
//! bag of single-quoted string attributes. [`Tag`] is the in-memory form of
//! one element: name, attributes, and (for `<task>`) nested children. Tags
//! are immutable once built; downstream consumers hold `Arc<Tag>` references
//! handed out by the parser.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Element name of a compile-queue entry event
pub const TAG_TASK_QUEUED: &str = "task_queued";
/// Element name of a native-method emission event
pub const TAG_NMETHOD: &str = "nmethod";
/// Element name of a compiler task body (nests its `task_done` child)
pub const TAG_TASK: &str = "task";
/// Element name of a task completion marker
pub const TAG_TASK_DONE: &str = "task_done";

/// Compilation identity shared by all records of one compile
pub const ATTR_COMPILE_ID: &str = "compile_id";
/// Native code address of an emitted method
pub const ATTR_ADDRESS: &str = "address";
/// Compiler that produced the code (C1, C2)
pub const ATTR_COMPILER: &str = "compiler";
/// Native method size in bytes, reported on `task_done`
pub const ATTR_NMSIZE: &str = "nmsize";
/// Compile classification (absent = standard, `osr`, `c2n`)
pub const ATTR_COMPILE_KIND: &str = "compile_kind";
/// Tiered-compilation level that produced the code
pub const ATTR_LEVEL: &str = "level";
/// Fully qualified method signature
pub const ATTR_METHOD: &str = "method";
/// Event timestamp in fractional seconds since VM start
pub const ATTR_STAMP: &str = "stamp";
/// Completion timestamp; preferred over `stamp` when both are present
pub const ATTR_STAMP_COMPLETED: &str = "stamp_completed";

/// compile_kind value for on-stack-replacement compiles
pub const KIND_OSR: &str = "osr";
/// compile_kind value for native wrapper stubs. These are trivial
/// compiled-to-native bridges and are excluded from elapsed-time accounting.
pub const KIND_C2N: &str = "c2n";

/// Flat attribute mapping of one log element.
///
/// A `BTreeMap` keeps iteration deterministic, so dumps render the same way
/// on every run, and lets the unattached-slot accessors hand out a shared
/// const-empty map instead of allocating a sentinel.
pub type AttributeMap = BTreeMap<String, String>;

/// Shared empty attribute map, returned by tolerant accessors when the
/// corresponding record was never attached.
pub fn empty_attributes() -> &'static AttributeMap {
    static EMPTY: AttributeMap = AttributeMap::new();
    &EMPTY
}

/// The four record kinds that make up one compilation lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    /// `<task_queued/>` - the compilation request entered the compile queue
    TaskQueued,
    /// `<nmethod/>` - the compiler emitted native code
    NMethod,
    /// `<task/>` - the compiler task body
    Task,
    /// `<task_done/>` - task completion, carries the native method size
    TaskDone,
}

impl TagKind {
    /// Map an element name to its lifecycle kind, if it has one
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            TAG_TASK_QUEUED => Some(TagKind::TaskQueued),
            TAG_NMETHOD => Some(TagKind::NMethod),
            TAG_TASK => Some(TagKind::Task),
            TAG_TASK_DONE => Some(TagKind::TaskDone),
            _ => None,
        }
    }

    /// The element name this kind corresponds to
    pub fn name(&self) -> &'static str {
        match self {
            TagKind::TaskQueued => TAG_TASK_QUEUED,
            TagKind::NMethod => TAG_NMETHOD,
            TagKind::Task => TAG_TASK,
            TagKind::TaskDone => TAG_TASK_DONE,
        }
    }
}

/// One parsed log element: name, attribute bag, nested children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    name: String,
    attributes: AttributeMap,
    children: Vec<Arc<Tag>>,
}

impl Tag {
    /// Create a childless tag
    pub fn new(name: impl Into<String>, attributes: AttributeMap) -> Self {
        Self {
            name: name.into(),
            attributes,
            children: Vec::new(),
        }
    }

    /// Element name (e.g. `task_queued`)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lifecycle kind derived from the element name, if any
    pub fn kind(&self) -> Option<TagKind> {
        TagKind::from_name(&self.name)
    }

    /// Read-only view of the attribute bag
    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    /// Look up a single attribute value
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Nested child elements, in document order
    pub fn children(&self) -> &[Arc<Tag>] {
        &self.children
    }

    /// Append a child element (used by the parser while the element is open)
    pub fn push_child(&mut self, child: Arc<Tag>) {
        self.children.push(child);
    }

    /// First child with the given element name
    pub fn first_named_child(&self, name: &str) -> Option<&Arc<Tag>> {
        self.children.iter().find(|child| child.name == name)
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        for _ in 0..depth {
            write!(f, "  ")?;
        }
        write!(f, "<{}", self.name)?;
        for (key, value) in &self.attributes {
            write!(f, " {}='{}'", key, value)?;
        }
        if self.children.is_empty() {
            write!(f, "/>")
        } else {
            writeln!(f, ">")?;
            for child in &self.children {
                child.render(f, depth + 1)?;
                writeln!(f)?;
            }
            for _ in 0..depth {
                write!(f, "  ")?;
            }
            write!(f, "</{}>", self.name)
        }
    }
}

impl fmt::Display for Tag {
    /// Render the tag back in log form. Attributes come out in key order,
    /// which may differ from the source line; this is a display artifact,
    /// not a parsing round-trip.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> AttributeMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_kind_from_name() {
        assert_eq!(TagKind::from_name("task_queued"), Some(TagKind::TaskQueued));
        assert_eq!(TagKind::from_name("nmethod"), Some(TagKind::NMethod));
        assert_eq!(TagKind::from_name("task"), Some(TagKind::Task));
        assert_eq!(TagKind::from_name("task_done"), Some(TagKind::TaskDone));
        assert_eq!(TagKind::from_name("vm_version"), None);
    }

    #[test]
    fn test_kind_name_round_trip() {
        for kind in [
            TagKind::TaskQueued,
            TagKind::NMethod,
            TagKind::Task,
            TagKind::TaskDone,
        ] {
            assert_eq!(TagKind::from_name(kind.name()), Some(kind));
        }
    }

    #[test]
    fn test_attribute_lookup() {
        let tag = Tag::new(
            TAG_TASK_QUEUED,
            attrs(&[("compile_id", "42"), ("stamp", "0.125")]),
        );
        assert_eq!(tag.attribute("compile_id"), Some("42"));
        assert_eq!(tag.attribute("stamp"), Some("0.125"));
        assert_eq!(tag.attribute("level"), None);
        assert_eq!(tag.kind(), Some(TagKind::TaskQueued));
    }

    #[test]
    fn test_display_self_closing_sorted() {
        let tag = Tag::new("nmethod", attrs(&[("stamp", "0.2"), ("compile_id", "7")]));
        // BTreeMap renders keys alphabetically
        assert_eq!(tag.to_string(), "<nmethod compile_id='7' stamp='0.2'/>");
    }

    #[test]
    fn test_display_nested_children() {
        let mut task = Tag::new("task", attrs(&[("compile_id", "1")]));
        task.push_child(Arc::new(Tag::new("task_done", attrs(&[("nmsize", "376")]))));

        let rendered = task.to_string();
        assert_eq!(
            rendered,
            "<task compile_id='1'>\n  <task_done nmsize='376'/>\n</task>"
        );
    }

    #[test]
    fn test_first_named_child() {
        let mut task = Tag::new("task", AttributeMap::new());
        task.push_child(Arc::new(Tag::new("phase", AttributeMap::new())));
        task.push_child(Arc::new(Tag::new("task_done", attrs(&[("nmsize", "8")]))));

        let done = task.first_named_child(TAG_TASK_DONE).unwrap();
        assert_eq!(done.attribute("nmsize"), Some("8"));
        assert!(task.first_named_child("failure").is_none());
    }

    #[test]
    fn test_empty_attributes_is_shared_and_empty() {
        let a = empty_attributes();
        let b = empty_attributes();
        assert!(a.is_empty());
        assert!(std::ptr::eq(a, b));
    }
}
