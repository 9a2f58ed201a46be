//! JSON output format for compilation reports
//!
//! Sprint 5: --format json implementation

use serde::{Deserialize, Serialize};

use crate::compilation::Compilation;
use crate::tag::ATTR_COMPILE_KIND;

/// A single compilation record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonCompilation {
    /// Display signature, e.g. "#7  (C2 / OSR / Level 4)"
    pub signature: String,
    /// compile_id shared by the log records (if a task_queued was seen)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compile_id: Option<String>,
    /// Method being compiled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Compiler description, e.g. "C2 OSR"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiler: Option<String>,
    /// Tier description, e.g. "Level 4"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    /// Raw compile_kind attribute ("osr", "c2n")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compile_kind: Option<String>,
    /// Queue-entry stamp in milliseconds (0 = unknown)
    pub queued_stamp_ms: i64,
    /// Code-emission stamp in milliseconds (0 = unknown)
    pub compiled_stamp_ms: i64,
    /// Elapsed compile time in milliseconds; absent when never measured,
    /// negative when the log's stamps are inconsistent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compile_time_ms: Option<i64>,
    /// Native code size in bytes from task_done
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native_size: Option<u64>,
    /// Native code address from the nmethod record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native_address: Option<String>,
}

impl JsonCompilation {
    /// Build the JSON view of one compilation
    pub fn from_compilation(compilation: &Compilation) -> Self {
        let compile_time_ms = match compilation.compile_time() {
            0 => None,
            elapsed => Some(elapsed),
        };

        // None both when the compile never finished and when the nmsize
        // attribute is unreadable; the stats layer reports the latter
        let native_size = match compilation.task_done() {
            Some(_) => compilation.native_size().ok(),
            None => None,
        };

        Self {
            signature: compilation.signature(),
            compile_id: compilation.compile_id().map(str::to_owned),
            method: compilation.method().map(str::to_owned),
            compiler: compilation
                .compiler_description()
                .filter(|description| !description.is_empty()),
            tier: compilation
                .tier_description()
                .filter(|tier| !tier.is_empty()),
            compile_kind: compilation
                .nmethod()
                .and_then(|tag| tag.attribute(ATTR_COMPILE_KIND))
                .map(str::to_owned),
            queued_stamp_ms: compilation.queued_stamp(),
            compiled_stamp_ms: compilation.compiled_stamp(),
            compile_time_ms,
            native_size,
            native_address: compilation.native_address().map(str::to_owned),
        }
    }
}

/// Summary statistics for the report
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonSummary {
    /// Total number of compilations in the report
    pub total_compilations: u64,
    /// Compilations with an nmethod record
    pub compiled: u64,
    /// Compilations never observed compiled
    pub incomplete: u64,
    /// Sum of measured elapsed compile times (milliseconds)
    pub total_compile_time_ms: u64,
    /// Sum of emitted native code sizes (bytes)
    pub total_native_bytes: u64,
    /// Compilations with a negative elapsed time (inconsistent stamps)
    pub negative_compile_times: u64,
    /// task_done records with an unreadable nmsize
    pub invalid_native_sizes: u64,
}

/// Root JSON output structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonOutput {
    /// Format version identifier
    pub version: String,
    /// Format name
    pub format: String,
    /// List of compilation records
    pub compilations: Vec<JsonCompilation>,
    /// Summary statistics
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Create a new JSON output structure
    pub fn new() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: "fragua-json-v1".to_string(),
            compilations: Vec::new(),
            summary: JsonSummary::default(),
        }
    }

    /// Add a compilation to the output
    pub fn add_compilation(&mut self, compilation: &Compilation) {
        self.summary.total_compilations += 1;
        if compilation.nmethod().is_some() {
            self.summary.compiled += 1;
        } else {
            self.summary.incomplete += 1;
        }

        let elapsed = compilation.compile_time();
        if elapsed > 0 {
            self.summary.total_compile_time_ms += elapsed as u64;
        } else if elapsed < 0 {
            self.summary.negative_compile_times += 1;
        }

        if compilation.task_done().is_some() {
            match compilation.native_size() {
                Ok(size) => self.summary.total_native_bytes += size,
                Err(_) => self.summary.invalid_native_sizes += 1,
            }
        }

        self.compilations
            .push(JsonCompilation::from_compilation(compilation));
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Default for JsonOutput {
    fn default() -> Self {
        Self::new()
    }
}
