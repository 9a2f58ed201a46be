//! Compilation filtering for -e FIELD=SPEC expressions
//!
//! Sprint 6: expression filtering
//! Supports:
//! - Method substring: -e method=hashCode
//! - Method regex: -e method=/String\.(hash|equals)/
//! - Value sets: -e compiler=C1,C2  -e kind=osr,c2n  -e level=3,4
//! - kind=std selects compiled records with no compile_kind attribute

use anyhow::{bail, Result};
use regex::Regex;
use std::collections::HashSet;

use crate::compilation::Compilation;
use crate::tag::{ATTR_COMPILER, ATTR_COMPILE_KIND, ATTR_LEVEL};

/// Filter-language token selecting standard (non-osr, non-wrapper)
/// compilations, which carry no compile_kind attribute in the log
const KIND_STANDARD: &str = "std";

/// One parsed FIELD=SPEC constraint
#[derive(Debug, Clone)]
enum Criterion {
    /// method=TEXT, substring match on the method signature
    MethodSubstring(String),
    /// method=/REGEX/, pattern match on the method signature
    MethodPattern(Regex),
    /// compiler=A,B (case-insensitive)
    Compiler(HashSet<String>),
    /// kind=A,B (case-insensitive; `std` = no compile_kind attribute)
    Kind(HashSet<String>),
    /// level=N,M (exact)
    Level(HashSet<String>),
}

impl Criterion {
    /// Total over any record state: a slot that is not attached never
    /// satisfies a positive constraint (except `kind=std`, which requires
    /// a compiled record without a kind attribute).
    fn matches(&self, compilation: &Compilation) -> bool {
        match self {
            Criterion::MethodSubstring(needle) => compilation
                .method()
                .is_some_and(|method| method.contains(needle.as_str())),
            Criterion::MethodPattern(regex) => compilation
                .method()
                .is_some_and(|method| regex.is_match(method)),
            Criterion::Compiler(set) => match compilation
                .nmethod()
                .and_then(|tag| tag.attribute(ATTR_COMPILER))
            {
                Some(compiler) => set.contains(&compiler.to_lowercase()),
                None => false,
            },
            Criterion::Kind(set) => match compilation.nmethod() {
                Some(tag) => match tag.attribute(ATTR_COMPILE_KIND) {
                    Some(kind) => set.contains(&kind.to_lowercase()),
                    None => set.contains(KIND_STANDARD),
                },
                None => false,
            },
            Criterion::Level(set) => match compilation
                .nmethod()
                .and_then(|tag| tag.attribute(ATTR_LEVEL))
            {
                Some(level) => set.contains(level.trim()),
                None => false,
            },
        }
    }
}

/// Filter that determines which compilations to report
#[derive(Debug, Clone, Default)]
pub struct CompilationFilter {
    /// All criteria must match (empty = every compilation matches)
    criteria: Vec<Criterion>,
}

impl CompilationFilter {
    /// Create a filter that matches all compilations
    pub fn all() -> Self {
        Self::default()
    }

    /// Parse one filter expression like "method=hashCode" or "kind=osr"
    pub fn from_expr(expr: &str) -> Result<Self> {
        Ok(Self {
            criteria: vec![parse_criterion(expr)?],
        })
    }

    /// Parse several expressions; a compilation must satisfy every one
    pub fn from_exprs<S: AsRef<str>>(exprs: &[S]) -> Result<Self> {
        let criteria = exprs
            .iter()
            .map(|expr| parse_criterion(expr.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { criteria })
    }

    /// Check if a compilation should be reported
    pub fn matches(&self, compilation: &Compilation) -> bool {
        self.criteria
            .iter()
            .all(|criterion| criterion.matches(compilation))
    }
}

fn parse_criterion(expr: &str) -> Result<Criterion> {
    let (field, spec) = match expr.split_once('=') {
        Some(pair) => pair,
        None => bail!(
            "Invalid filter expression: {}. Expected format: FIELD=SPEC",
            expr
        ),
    };

    match field.trim() {
        "method" => {
            let spec = spec.trim();
            match spec
                .strip_prefix('/')
                .and_then(|inner| inner.strip_suffix('/'))
            {
                Some(pattern) => match Regex::new(pattern) {
                    Ok(regex) => Ok(Criterion::MethodPattern(regex)),
                    Err(e) => bail!("Invalid method pattern /{}/: {}", pattern, e),
                },
                None => Ok(Criterion::MethodSubstring(spec.to_string())),
            }
        }
        "compiler" => Ok(Criterion::Compiler(value_set(spec, true))),
        "kind" => Ok(Criterion::Kind(value_set(spec, true))),
        "level" => Ok(Criterion::Level(value_set(spec, false))),
        other => bail!(
            "Unknown filter field: {}. Expected one of: method, compiler, kind, level",
            other
        ),
    }
}

fn value_set(spec: &str, lowercase: bool) -> HashSet<String> {
    spec.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            if lowercase {
                part.to_lowercase()
            } else {
                part.to_string()
            }
        })
        .collect()
}
