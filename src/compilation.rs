//! Compilation lifecycle model
//!
//! Sprint 1-2: MVP model
//!
//! HotSpot logs one compile as several loosely-ordered records: a
//! `task_queued` event, an `nmethod` emission event, a `task` body (with a
//! nested `task_done`). [`Compilation`] collects those records for one
//! compile id, derives timing and identity facts as each one is attached,
//! and exposes a stable typed view (elapsed compile time, native code size,
//! display signature) to the report layers.
//!
//! One ingestion thread owns the record while attaching; afterwards any
//! number of readers may query it concurrently through `&self` accessors
//! (the type is `Send + Sync`, attached records are shared `Arc<Tag>`s and
//! nothing is computed lazily behind interior mutability). The handoff
//! relies on the caller's happens-before edge, not on locks here.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::assembly::NativeAssembly;
use crate::stamp;
use crate::tag::{
    empty_attributes, AttributeMap, Tag, ATTR_ADDRESS, ATTR_COMPILER, ATTR_COMPILE_ID,
    ATTR_COMPILE_KIND, ATTR_LEVEL, ATTR_METHOD, ATTR_NMSIZE, KIND_C2N,
};

/// Errors surfaced by [`Compilation`] accessors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompilationError {
    /// `compiled_attributes` queried before an `nmethod` record was attached.
    /// This is a caller bug: the pipeline is expected to query completed
    /// compilations only, so the absence fails loudly instead of handing
    /// back empty data.
    #[error("compilation #{ordinal} has no nmethod record yet")]
    NotCompiled { ordinal: usize },

    /// `task_done` is attached but carries no nmsize attribute
    #[error("task_done record for compilation #{ordinal} is missing the nmsize attribute")]
    MissingNativeSize { ordinal: usize },

    /// `task_done` carries an nmsize attribute that is not a valid integer
    #[error("invalid nmsize '{value}' on compilation #{ordinal}")]
    InvalidNativeSize { ordinal: usize, value: String },
}

/// Result type for compilation accessors
pub type Result<T> = std::result::Result<T, CompilationError>;

/// All records of one compilation, plus the facts derived from them.
///
/// Created empty with only its index; the ingestion pipeline attaches
/// records in whatever order the log supplies them. Attachments are
/// independent and overwrite on repeat, but a field finalized by one
/// attachment is never recomputed by another (see [`attach_nmethod`]).
///
/// [`attach_nmethod`]: Compilation::attach_nmethod
#[derive(Debug, Clone, Default)]
pub struct Compilation {
    index: usize,
    queued: Option<Arc<Tag>>,
    nmethod: Option<Arc<Tag>>,
    task: Option<Arc<Tag>>,
    task_done: Option<Arc<Tag>>,
    assembly: Option<NativeAssembly>,
    compile_id: Option<String>,
    queued_stamp: i64,
    compiled_stamp: i64,
    compile_time: i64,
    native_address: Option<String>,
}

impl Compilation {
    /// Create an empty record with the given zero-based index
    pub fn new(index: usize) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    /// Zero-based creation ordinal, fixed for the record's lifetime
    pub fn index(&self) -> usize {
        self.index
    }

    /// One-based ordinal used in display strings
    pub fn ordinal(&self) -> usize {
        self.index + 1
    }

    /// Attach the `task_queued` record.
    ///
    /// Re-derives the compile id (absent attribute leaves it unset) and the
    /// queued stamp (absent timestamp keys leave it 0).
    pub fn attach_queued(&mut self, tag: Arc<Tag>) {
        self.compile_id = tag.attribute(ATTR_COMPILE_ID).map(str::to_owned);
        self.queued_stamp = stamp::extract_stamp(tag.attributes());
        self.queued = Some(tag);
    }

    /// Attach the `nmethod` record.
    ///
    /// Re-derives the native address and the compiled stamp, and computes
    /// the elapsed compile time once, right here: it requires both stamps
    /// to be known already and the compile kind to be something other than
    /// a native wrapper. Attaching `task_queued` afterwards does NOT
    /// recompute the elapsed time - the order sensitivity is part of the
    /// contract and pinned by tests, because the queued stamp belongs to
    /// the same compile only when it was seen first in log order.
    pub fn attach_nmethod(&mut self, tag: Arc<Tag>) {
        self.native_address = tag.attribute(ATTR_ADDRESS).map(str::to_owned);
        self.compiled_stamp = stamp::extract_stamp(tag.attributes());

        let native_wrapper = tag.attribute(ATTR_COMPILE_KIND) == Some(KIND_C2N);
        if !native_wrapper && self.queued_stamp != 0 && self.compiled_stamp != 0 {
            // May go negative on inconsistent stamps; propagated as-is so
            // the report layer can flag the data instead of hiding it.
            self.compile_time = self.compiled_stamp - self.queued_stamp;
        }

        self.nmethod = Some(tag);
    }

    /// Attach the `task` record. No derived-field side effects.
    pub fn attach_task(&mut self, tag: Arc<Tag>) {
        self.task = Some(tag);
    }

    /// Attach the `task_done` record. The native size is parsed lazily by
    /// [`native_size`](Compilation::native_size), not here.
    pub fn attach_task_done(&mut self, tag: Arc<Tag>) {
        self.task_done = Some(tag);
    }

    /// Attach a disassembly artifact produced by an external collaborator
    pub fn attach_assembly(&mut self, assembly: NativeAssembly) {
        self.assembly = Some(assembly);
    }

    /// The attached disassembly artifact, if any
    pub fn assembly(&self) -> Option<&NativeAssembly> {
        self.assembly.as_ref()
    }

    /// Override the native address (used when the address is resolved from
    /// a source other than the nmethod record, e.g. a disassembly header)
    pub fn set_native_address(&mut self, address: impl Into<String>) {
        self.native_address = Some(address.into());
    }

    pub fn queued(&self) -> Option<&Tag> {
        self.queued.as_deref()
    }

    pub fn nmethod(&self) -> Option<&Tag> {
        self.nmethod.as_deref()
    }

    pub fn task(&self) -> Option<&Tag> {
        self.task.as_deref()
    }

    pub fn task_done(&self) -> Option<&Tag> {
        self.task_done.as_deref()
    }

    /// Compile id shared by all records of this compilation
    pub fn compile_id(&self) -> Option<&str> {
        self.compile_id.as_deref()
    }

    /// Native code address from the nmethod record (or an override)
    pub fn native_address(&self) -> Option<&str> {
        self.native_address.as_deref()
    }

    /// Queue-entry stamp in ms; 0 = unknown
    pub fn queued_stamp(&self) -> i64 {
        self.queued_stamp
    }

    /// Code-emission stamp in ms; 0 = unknown
    pub fn compiled_stamp(&self) -> i64 {
        self.compiled_stamp
    }

    /// Elapsed queue-to-emission time in ms.
    ///
    /// 0 = never computed (missing records, missing stamps, or a native
    /// wrapper compile). Negative values mean the log's stamps are
    /// inconsistent; they are reported untouched for the caller to flag.
    pub fn compile_time(&self) -> i64 {
        self.compile_time
    }

    /// Method signature, from the queued record with the task record as
    /// fallback (both carry it in well-formed logs)
    pub fn method(&self) -> Option<&str> {
        self.queued_attribute(ATTR_METHOD)
            .or_else(|| self.task.as_deref().and_then(|tag| tag.attribute(ATTR_METHOD)))
    }

    /// Attributes of the queued record; empty when it was never attached.
    ///
    /// Infallible by contract: consumers query queue facts long before a
    /// compilation completes, so absence here is an ordinary state.
    pub fn queued_attributes(&self) -> &AttributeMap {
        match &self.queued {
            Some(tag) => tag.attributes(),
            None => empty_attributes(),
        }
    }

    /// Single attribute of the queued record
    pub fn queued_attribute(&self, key: &str) -> Option<&str> {
        self.queued_attributes().get(key).map(String::as_str)
    }

    /// Attributes of the nmethod record.
    ///
    /// Unlike [`queued_attributes`](Compilation::queued_attributes) this
    /// fails when the record is missing: callers only ask after confirming
    /// a compilation completed, so absence is a precondition violation.
    pub fn compiled_attributes(&self) -> Result<&AttributeMap> {
        match &self.nmethod {
            Some(tag) => Ok(tag.attributes()),
            None => Err(CompilationError::NotCompiled {
                ordinal: self.ordinal(),
            }),
        }
    }

    /// Single attribute of the nmethod record, same precondition as
    /// [`compiled_attributes`](Compilation::compiled_attributes)
    pub fn compiled_attribute(&self, key: &str) -> Result<Option<&str>> {
        Ok(self.compiled_attributes()?.get(key).map(String::as_str))
    }

    /// Native method size in bytes from the `task_done` record.
    ///
    /// Returns 0 while `task_done` is unattached (the compile simply has
    /// not finished). Once attached, an absent or malformed nmsize is a
    /// data integrity problem and comes back as an error; this method
    /// never guesses a size.
    pub fn native_size(&self) -> Result<u64> {
        let task_done = match &self.task_done {
            Some(tag) => tag,
            None => return Ok(0),
        };

        let value = match task_done.attribute(ATTR_NMSIZE) {
            Some(value) => value,
            None => {
                return Err(CompilationError::MissingNativeSize {
                    ordinal: self.ordinal(),
                })
            }
        };

        value
            .parse::<u64>()
            .map_err(|_| CompilationError::InvalidNativeSize {
                ordinal: self.ordinal(),
                value: value.to_owned(),
            })
    }

    /// Display signature: `#<n>`, plus a parenthesized compiler descriptor
    /// once the nmethod record is attached, e.g. `#7  (C2 / OSR / Level 4)`
    pub fn signature(&self) -> String {
        let mut signature = format!("#{}", self.ordinal());

        if let Some(tag) = &self.nmethod {
            let compiler = tag.attribute(ATTR_COMPILER);
            let kind = tag.attribute(ATTR_COMPILE_KIND);
            let level = tag.attribute(ATTR_LEVEL);

            signature.push_str("  (");

            if let Some(compiler) = compiler {
                signature.push_str(compiler);
            }

            if let Some(kind) = kind {
                if compiler.is_some() {
                    signature.push_str(" / ");
                }
                signature.push_str(&kind.to_uppercase());
            }

            if let Some(level) = level {
                signature.push_str(" / Level ");
                signature.push_str(level);
            }

            signature.push(')');
        }

        signature
    }

    /// Compiler descriptor, e.g. `C2`, `C2 OSR`, `C2N`.
    ///
    /// `None` until the nmethod record is attached; an empty string when
    /// the record carries neither a compiler nor a kind attribute.
    pub fn compiler_description(&self) -> Option<String> {
        let tag = self.nmethod.as_deref()?;

        let compiler = tag.attribute(ATTR_COMPILER);
        let kind = tag.attribute(ATTR_COMPILE_KIND);

        let mut description = String::new();

        if let Some(compiler) = compiler {
            description.push_str(compiler);
        }

        if let Some(kind) = kind {
            if compiler.is_some() {
                description.push(' ');
            }
            description.push_str(&kind.to_uppercase());
        }

        Some(description)
    }

    /// Tier descriptor, e.g. `Level 4`.
    ///
    /// `None` until the nmethod record is attached; an empty string when
    /// the record has no level attribute.
    pub fn tier_description(&self) -> Option<String> {
        let tag = self.nmethod.as_deref()?;

        Some(match tag.attribute(ATTR_LEVEL) {
            Some(level) => format!("Level {}", level),
            None => String::new(),
        })
    }
}

impl fmt::Display for Compilation {
    /// Diagnostic dump: the queued, nmethod and task records one per line,
    /// unattached slots skipped
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for tag in [&self.queued, &self.nmethod, &self.task]
            .into_iter()
            .flatten()
        {
            writeln!(f, "{}", tag)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::AttributeMap;

    fn tag(name: &str, pairs: &[(&str, &str)]) -> Arc<Tag> {
        let attributes: AttributeMap = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Arc::new(Tag::new(name, attributes))
    }

    fn queued_tag(compile_id: &str, stamp: &str) -> Arc<Tag> {
        tag(
            "task_queued",
            &[
                ("compile_id", compile_id),
                ("method", "java/lang/String hashCode ()I"),
                ("stamp", stamp),
            ],
        )
    }

    #[test]
    fn test_new_record_is_empty() {
        let compilation = Compilation::new(0);
        assert_eq!(compilation.index(), 0);
        assert_eq!(compilation.ordinal(), 1);
        assert!(compilation.queued().is_none());
        assert!(compilation.nmethod().is_none());
        assert!(compilation.task().is_none());
        assert!(compilation.task_done().is_none());
        assert!(compilation.assembly().is_none());
        assert!(compilation.compile_id().is_none());
        assert_eq!(compilation.queued_stamp(), 0);
        assert_eq!(compilation.compiled_stamp(), 0);
        assert_eq!(compilation.compile_time(), 0);
    }

    #[test]
    fn test_bare_signature_is_one_based_ordinal() {
        for index in [0usize, 1, 6, 41] {
            let compilation = Compilation::new(index);
            assert_eq!(compilation.signature(), format!("#{}", index + 1));
        }
    }

    #[test]
    fn test_attach_queued_derives_id_and_stamp() {
        let mut compilation = Compilation::new(0);
        compilation.attach_queued(queued_tag("17", "0.25"));

        assert_eq!(compilation.compile_id(), Some("17"));
        assert_eq!(compilation.queued_stamp(), 250);
        assert_eq!(
            compilation.queued_attribute("method"),
            Some("java/lang/String hashCode ()I")
        );
    }

    #[test]
    fn test_attach_queued_without_compile_id_leaves_identity_unset() {
        let mut compilation = Compilation::new(0);
        compilation.attach_queued(tag("task_queued", &[("stamp", "0.1")]));
        assert_eq!(compilation.compile_id(), None);
        assert_eq!(compilation.queued_stamp(), 100);
    }

    #[test]
    fn test_elapsed_time_queued_then_nmethod() {
        let mut compilation = Compilation::new(0);
        compilation.attach_queued(queued_tag("1", "0.1"));
        compilation.attach_nmethod(tag(
            "nmethod",
            &[
                ("compile_id", "1"),
                ("compiler", "C2"),
                ("address", "0x7f3c4c060b10"),
                ("stamp", "0.25"),
            ],
        ));

        assert_eq!(compilation.queued_stamp(), 100);
        assert_eq!(compilation.compiled_stamp(), 250);
        assert_eq!(compilation.compile_time(), 150);
        assert_eq!(compilation.native_address(), Some("0x7f3c4c060b10"));
    }

    #[test]
    fn test_elapsed_time_is_order_sensitive() {
        // Attaching nmethod before task_queued must leave the elapsed time
        // unset: at nmethod time no queued stamp is known, and a later
        // queued-attach never recomputes. The asymmetry is contractual.
        let mut compilation = Compilation::new(0);
        compilation.attach_nmethod(tag("nmethod", &[("stamp", "0.25")]));
        compilation.attach_queued(queued_tag("1", "0.1"));

        assert_eq!(compilation.queued_stamp(), 100);
        assert_eq!(compilation.compiled_stamp(), 250);
        assert_eq!(compilation.compile_time(), 0);
    }

    #[test]
    fn test_native_wrapper_never_gets_elapsed_time() {
        let mut compilation = Compilation::new(0);
        compilation.attach_queued(queued_tag("2", "0.1"));
        compilation.attach_nmethod(tag(
            "nmethod",
            &[("compile_kind", "c2n"), ("stamp", "0.25")],
        ));

        assert_eq!(compilation.compile_time(), 0);
    }

    #[test]
    fn test_missing_stamp_skips_elapsed_time() {
        let mut compilation = Compilation::new(0);
        compilation.attach_queued(tag("task_queued", &[("compile_id", "3")]));
        compilation.attach_nmethod(tag("nmethod", &[("stamp", "0.25")]));

        assert_eq!(compilation.queued_stamp(), 0);
        assert_eq!(compilation.compile_time(), 0);
    }

    #[test]
    fn test_negative_elapsed_time_propagates() {
        let mut compilation = Compilation::new(0);
        compilation.attach_queued(queued_tag("4", "0.5"));
        compilation.attach_nmethod(tag("nmethod", &[("stamp", "0.2")]));

        assert_eq!(compilation.compile_time(), -300);
    }

    #[test]
    fn test_reattach_queued_rederives_but_keeps_elapsed() {
        let mut compilation = Compilation::new(0);
        compilation.attach_queued(queued_tag("5", "0.1"));
        compilation.attach_nmethod(tag("nmethod", &[("stamp", "0.25")]));
        assert_eq!(compilation.compile_time(), 150);

        compilation.attach_queued(queued_tag("99", "0.2"));
        assert_eq!(compilation.compile_id(), Some("99"));
        assert_eq!(compilation.queued_stamp(), 200);
        // finalized by the earlier nmethod attach; not retroactively fixed
        assert_eq!(compilation.compile_time(), 150);
    }

    #[test]
    fn test_queued_attributes_tolerates_absence() {
        let compilation = Compilation::new(0);
        assert!(compilation.queued_attributes().is_empty());
        assert_eq!(compilation.queued_attribute("method"), None);
    }

    #[test]
    fn test_compiled_attributes_requires_nmethod() {
        let compilation = Compilation::new(6);
        assert_eq!(
            compilation.compiled_attributes().unwrap_err(),
            CompilationError::NotCompiled { ordinal: 7 }
        );
        assert_eq!(
            compilation.compiled_attribute("compiler").unwrap_err(),
            CompilationError::NotCompiled { ordinal: 7 }
        );
    }

    #[test]
    fn test_compiled_attributes_after_attach() {
        let mut compilation = Compilation::new(0);
        let nmethod = tag("nmethod", &[("compiler", "C1"), ("level", "3")]);
        compilation.attach_nmethod(nmethod.clone());

        let attributes = compilation.compiled_attributes().unwrap();
        assert_eq!(attributes, nmethod.attributes());
        assert_eq!(
            compilation.compiled_attribute("compiler").unwrap(),
            Some("C1")
        );
        assert_eq!(compilation.compiled_attribute("absent").unwrap(), None);
    }

    #[test]
    fn test_native_size_unattached_is_zero() {
        let compilation = Compilation::new(0);
        assert_eq!(compilation.native_size().unwrap(), 0);
    }

    #[test]
    fn test_native_size_parses_nmsize() {
        let mut compilation = Compilation::new(0);
        compilation.attach_task_done(tag("task_done", &[("nmsize", "376"), ("success", "1")]));
        assert_eq!(compilation.native_size().unwrap(), 376);
    }

    #[test]
    fn test_native_size_missing_attribute_is_error() {
        let mut compilation = Compilation::new(0);
        compilation.attach_task_done(tag("task_done", &[("success", "1")]));
        assert_eq!(
            compilation.native_size().unwrap_err(),
            CompilationError::MissingNativeSize { ordinal: 1 }
        );
    }

    #[test]
    fn test_native_size_malformed_attribute_is_error() {
        let mut compilation = Compilation::new(2);
        compilation.attach_task_done(tag("task_done", &[("nmsize", "huge")]));
        assert_eq!(
            compilation.native_size().unwrap_err(),
            CompilationError::InvalidNativeSize {
                ordinal: 3,
                value: "huge".to_string()
            }
        );
    }

    #[test]
    fn test_signature_full_descriptor() {
        let mut compilation = Compilation::new(6);
        compilation.attach_nmethod(tag(
            "nmethod",
            &[("compiler", "C2"), ("compile_kind", "osr"), ("level", "4")],
        ));
        assert_eq!(compilation.signature(), "#7  (C2 / OSR / Level 4)");
    }

    #[test]
    fn test_signature_partial_descriptors() {
        let mut only_compiler = Compilation::new(0);
        only_compiler.attach_nmethod(tag("nmethod", &[("compiler", "C1")]));
        assert_eq!(only_compiler.signature(), "#1  (C1)");

        let mut only_kind = Compilation::new(0);
        only_kind.attach_nmethod(tag("nmethod", &[("compile_kind", "c2n")]));
        assert_eq!(only_kind.signature(), "#1  (C2N)");

        let mut only_level = Compilation::new(0);
        only_level.attach_nmethod(tag("nmethod", &[("level", "3")]));
        assert_eq!(only_level.signature(), "#1  ( / Level 3)");

        let mut bare = Compilation::new(0);
        bare.attach_nmethod(tag("nmethod", &[]));
        assert_eq!(bare.signature(), "#1  ()");
    }

    #[test]
    fn test_compiler_description() {
        let mut compilation = Compilation::new(0);
        assert_eq!(compilation.compiler_description(), None);

        compilation.attach_nmethod(tag(
            "nmethod",
            &[("compiler", "C2"), ("compile_kind", "osr")],
        ));
        assert_eq!(
            compilation.compiler_description(),
            Some("C2 OSR".to_string())
        );

        let mut bare = Compilation::new(0);
        bare.attach_nmethod(tag("nmethod", &[]));
        assert_eq!(bare.compiler_description(), Some(String::new()));
    }

    #[test]
    fn test_tier_description() {
        let mut compilation = Compilation::new(0);
        assert_eq!(compilation.tier_description(), None);

        compilation.attach_nmethod(tag("nmethod", &[("level", "4")]));
        assert_eq!(compilation.tier_description(), Some("Level 4".to_string()));

        let mut unleveled = Compilation::new(0);
        unleveled.attach_nmethod(tag("nmethod", &[("compiler", "C2")]));
        assert_eq!(unleveled.tier_description(), Some(String::new()));
    }

    #[test]
    fn test_method_falls_back_to_task_record() {
        let mut compilation = Compilation::new(0);
        assert_eq!(compilation.method(), None);

        compilation.attach_task(tag("task", &[("method", "com/acme/Widget spin ()V")]));
        assert_eq!(compilation.method(), Some("com/acme/Widget spin ()V"));

        compilation.attach_queued(queued_tag("1", "0.1"));
        assert_eq!(compilation.method(), Some("java/lang/String hashCode ()I"));
    }

    #[test]
    fn test_dump_skips_unattached_records() {
        let mut compilation = Compilation::new(0);
        compilation.attach_queued(queued_tag("1", "0.1"));
        compilation.attach_task(tag("task", &[("compile_id", "1")]));

        let dump = compilation.to_string();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("<task_queued"));
        assert!(lines[1].starts_with("<task"));
    }

    #[test]
    fn test_accessors_are_stable_between_attachments() {
        let mut compilation = Compilation::new(3);
        compilation.attach_queued(queued_tag("8", "0.1"));
        compilation.attach_nmethod(tag(
            "nmethod",
            &[("compiler", "C1"), ("level", "1"), ("stamp", "0.3")],
        ));

        assert_eq!(compilation.signature(), compilation.signature());
        assert_eq!(compilation.compile_time(), compilation.compile_time());
        assert_eq!(
            compilation.compiler_description(),
            compilation.compiler_description()
        );
        assert_eq!(compilation.native_size().ok(), compilation.native_size().ok());
    }

    #[test]
    fn test_assembly_round_trip() {
        let mut compilation = Compilation::new(0);
        let assembly = NativeAssembly::new().with_native_address("0xdeadbeef");
        compilation.attach_assembly(assembly.clone());
        assert_eq!(compilation.assembly(), Some(&assembly));
    }

    #[test]
    fn test_set_native_address_overrides() {
        let mut compilation = Compilation::new(0);
        compilation.attach_nmethod(tag("nmethod", &[("address", "0x1000")]));
        assert_eq!(compilation.native_address(), Some("0x1000"));

        compilation.set_native_address("0x2000");
        assert_eq!(compilation.native_address(), Some("0x2000"));
    }

    #[test]
    fn test_compilation_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Compilation>();
    }
}
