//! CSV output format for compilation reports
//!
//! Sprint 5: CSV output for spreadsheet analysis and machine parsing

use crate::compilation::Compilation;
use crate::tag::{ATTR_COMPILE_KIND, ATTR_COMPILER, ATTR_LEVEL};

/// CSV record for a single compilation
#[derive(Debug, Clone)]
pub struct CsvCompilation {
    pub signature: String,
    pub method: Option<String>,
    pub compiler: Option<String>,
    pub level: Option<String>,
    pub kind: Option<String>,
    pub queued_stamp_ms: i64,
    pub compiled_stamp_ms: i64,
    pub compile_time_ms: Option<i64>,
    pub native_size: Option<u64>,
    pub native_address: Option<String>,
}

impl CsvCompilation {
    /// Build the CSV view of one compilation
    pub fn from_compilation(compilation: &Compilation) -> Self {
        let nmethod_attribute = |key: &str| {
            compilation
                .nmethod()
                .and_then(|tag| tag.attribute(key))
                .map(str::to_owned)
        };

        Self {
            signature: compilation.signature(),
            method: compilation.method().map(str::to_owned),
            compiler: nmethod_attribute(ATTR_COMPILER),
            level: nmethod_attribute(ATTR_LEVEL),
            kind: nmethod_attribute(ATTR_COMPILE_KIND),
            queued_stamp_ms: compilation.queued_stamp(),
            compiled_stamp_ms: compilation.compiled_stamp(),
            compile_time_ms: match compilation.compile_time() {
                0 => None,
                elapsed => Some(elapsed),
            },
            native_size: match compilation.task_done() {
                Some(_) => compilation.native_size().ok(),
                None => None,
            },
            native_address: compilation.native_address().map(str::to_owned),
        }
    }
}

/// CSV output formatter
#[derive(Debug)]
pub struct CsvOutput {
    compilations: Vec<CsvCompilation>,
    include_timing: bool,
}

impl CsvOutput {
    /// Create a new CSV output formatter
    pub fn new(include_timing: bool) -> Self {
        Self {
            compilations: Vec::new(),
            include_timing,
        }
    }

    /// Add a compilation to the output
    pub fn add_compilation(&mut self, compilation: CsvCompilation) {
        self.compilations.push(compilation);
    }

    /// Generate CSV header row based on enabled flags
    fn header(&self) -> String {
        let mut headers = vec![
            "signature",
            "method",
            "compiler",
            "level",
            "kind",
            "queued_ms",
            "compiled_ms",
            "nmsize",
            "address",
        ];

        if self.include_timing {
            headers.push("compile_time_ms");
        }

        headers.join(",")
    }

    /// Escape CSV field (handle commas, quotes, newlines)
    fn escape_field(field: &str) -> String {
        // If field contains comma, quote, or newline, wrap in quotes and escape quotes
        if field.contains(',') || field.contains('"') || field.contains('\n') {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    /// Format a compilation as CSV row
    fn format_compilation(&self, compilation: &CsvCompilation) -> String {
        let optional = |value: &Option<String>| match value {
            Some(value) => Self::escape_field(value),
            None => String::new(),
        };

        let mut fields = vec![
            Self::escape_field(&compilation.signature),
            optional(&compilation.method),
            optional(&compilation.compiler),
            optional(&compilation.level),
            optional(&compilation.kind),
            compilation.queued_stamp_ms.to_string(),
            compilation.compiled_stamp_ms.to_string(),
            compilation
                .native_size
                .map(|size| size.to_string())
                .unwrap_or_default(),
            optional(&compilation.native_address),
        ];

        if self.include_timing {
            fields.push(
                compilation
                    .compile_time_ms
                    .map(|elapsed| elapsed.to_string())
                    .unwrap_or_default(),
            );
        }

        fields.join(",")
    }

    /// Generate CSV output as string
    pub fn to_csv(&self) -> String {
        let mut output = String::new();

        // Add header
        output.push_str(&self.header());
        output.push('\n');

        // Add each compilation
        for compilation in &self.compilations {
            output.push_str(&self.format_compilation(compilation));
            output.push('\n');
        }

        output
    }
}

/// CSV statistics output formatter (for -c mode)
#[derive(Debug)]
pub struct CsvStatsOutput {
    stats: Vec<CsvCompilerStat>,
}

#[derive(Debug, Clone)]
pub struct CsvCompilerStat {
    pub compiler: String,
    pub compiles: u64,
    pub native_bytes: u64,
    pub total_time_ms: Option<u64>,
}

impl CsvStatsOutput {
    /// Create a new CSV stats output formatter
    pub fn new() -> Self {
        Self { stats: Vec::new() }
    }

    /// Add a statistic
    pub fn add_stat(&mut self, stat: CsvCompilerStat) {
        self.stats.push(stat);
    }

    /// Generate CSV output for statistics
    pub fn to_csv(&self, include_timing: bool) -> String {
        let mut output = String::new();

        // Header
        if include_timing {
            output.push_str("compiler,compiles,native_bytes,total_time_ms\n");
        } else {
            output.push_str("compiler,compiles,native_bytes\n");
        }

        // Stats rows
        for stat in &self.stats {
            output.push_str(&CsvOutput::escape_field(&stat.compiler));
            output.push(',');
            output.push_str(&stat.compiles.to_string());
            output.push(',');
            output.push_str(&stat.native_bytes.to_string());

            if include_timing {
                output.push(',');
                match stat.total_time_ms {
                    Some(time_ms) => output.push_str(&time_ms.to_string()),
                    None => output.push('0'),
                }
            }

            output.push('\n');
        }

        output
    }
}

impl Default for CsvStatsOutput {
    fn default() -> Self {
        Self::new()
    }
}
