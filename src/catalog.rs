//! Capture rule catalogs and section boundary predicates.
//!
//! A [`ReportLayout`] holds everything the scan loop needs to know about a
//! report dialect: for each section type, the enter/exit predicates, the
//! ordered named field extractors and the fields allowed to be empty.
//! Layouts are built once and never mutated afterwards.

use crate::error::{GfipError, Result};
use crate::models::SectionKind;
use regex::Regex;
use std::collections::HashSet;

/// Raw field name of the header period, replaced by `month`/`year` on output.
pub const PERIOD_FIELD: &str = "competencia";

/// A named pattern extracting one field from a line
#[derive(Debug, Clone)]
pub struct CaptureRule {
    name: String,
    pattern: Regex,
}

impl CaptureRule {
    /// Compile a rule. The pattern must have exactly one capture group.
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self> {
        let name = name.into();
        let pattern = Regex::new(pattern).map_err(|source| GfipError::InvalidPattern {
            name: name.clone(),
            source,
        })?;

        // captures_len counts the implicit whole-match group
        if pattern.captures_len() != 2 {
            return Err(GfipError::configuration(format!(
                "Capture rule '{}' must have exactly one capture group, found {}",
                name,
                pattern.captures_len() - 1
            )));
        }

        Ok(Self { name, pattern })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the raw captured text if the rule matches the line
    pub fn extract<'l>(&self, line: &'l str) -> Option<&'l str> {
        self.pattern
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

/// Enter and exit predicates for one section type
#[derive(Debug, Clone)]
pub struct Boundary {
    enter: Regex,
    exit: Regex,
}

impl Boundary {
    pub fn new(enter: &str, exit: &str) -> Result<Self> {
        let compile = |label: &str, pattern: &str| {
            Regex::new(pattern).map_err(|source| GfipError::InvalidPattern {
                name: label.to_string(),
                source,
            })
        };

        Ok(Self {
            enter: compile("enter boundary", enter)?,
            exit: compile("exit boundary", exit)?,
        })
    }

    pub fn opens(&self, line: &str) -> bool {
        self.enter.is_match(line)
    }

    pub fn closes(&self, line: &str) -> bool {
        self.exit.is_match(line)
    }
}

/// Immutable description of one section type
#[derive(Debug, Clone)]
pub struct SectionSpec {
    kind: SectionKind,
    boundary: Boundary,
    rules: Vec<CaptureRule>,
    nullable: HashSet<String>,
}

impl SectionSpec {
    pub fn builder(kind: SectionKind, boundary: Boundary) -> SectionSpecBuilder {
        SectionSpecBuilder {
            kind,
            boundary,
            rules: Vec::new(),
            nullable: Vec::new(),
        }
    }

    pub fn kind(&self) -> SectionKind {
        self.kind
    }

    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    pub fn rules(&self) -> &[CaptureRule] {
        &self.rules
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(CaptureRule::name)
    }

    pub fn declares(&self, field: &str) -> bool {
        self.rules.iter().any(|rule| rule.name == field)
    }

    pub fn is_nullable(&self, field: &str) -> bool {
        self.nullable.contains(field)
    }
}

/// Builder for [`SectionSpec`] that validates the catalog on `build`
#[derive(Debug)]
pub struct SectionSpecBuilder {
    kind: SectionKind,
    boundary: Boundary,
    rules: Vec<CaptureRule>,
    nullable: Vec<String>,
}

impl SectionSpecBuilder {
    pub fn rule(mut self, rule: CaptureRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn field(self, name: &str, pattern: &str) -> Result<Self> {
        Ok(self.rule(CaptureRule::new(name, pattern)?))
    }

    pub fn nullable(mut self, field: impl Into<String>) -> Self {
        self.nullable.push(field.into());
        self
    }

    pub fn build(self) -> Result<SectionSpec> {
        if self.rules.is_empty() {
            return Err(GfipError::configuration(format!(
                "{} catalog declares no capture rules",
                self.kind
            )));
        }

        let mut seen = HashSet::new();
        for rule in &self.rules {
            if !seen.insert(rule.name.as_str()) {
                return Err(GfipError::configuration(format!(
                    "Duplicate field '{}' in {} catalog",
                    rule.name, self.kind
                )));
            }
        }

        let mut nullable = HashSet::new();
        for field in self.nullable {
            if !seen.contains(field.as_str()) {
                return Err(GfipError::configuration(format!(
                    "Nullable field '{}' is not declared in {} catalog",
                    field, self.kind
                )));
            }
            nullable.insert(field);
        }

        Ok(SectionSpec {
            kind: self.kind,
            boundary: self.boundary,
            rules: self.rules,
            nullable,
        })
    }
}

/// Header and worker section descriptions for one report dialect
#[derive(Debug, Clone)]
pub struct ReportLayout {
    header: SectionSpec,
    worker: SectionSpec,
}

impl ReportLayout {
    pub fn new(header: SectionSpec, worker: SectionSpec) -> Result<Self> {
        if header.kind() != SectionKind::Header || worker.kind() != SectionKind::Worker {
            return Err(GfipError::configuration(
                "Report layout needs one header and one worker section",
            ));
        }
        if !header.declares(PERIOD_FIELD) {
            return Err(GfipError::configuration(format!(
                "Header catalog must declare the '{}' period field",
                PERIOD_FIELD
            )));
        }

        Ok(Self { header, worker })
    }

    pub fn header(&self) -> &SectionSpec {
        &self.header
    }

    pub fn worker(&self) -> &SectionSpec {
        &self.worker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn boundary() -> Boundary {
        Boundary::new(r"^BEGIN$", r"^END$").unwrap()
    }

    #[test]
    fn test_rule_requires_single_group() {
        assert!(CaptureRule::new("pis", r"PIS\s+(\d+)").is_ok());

        let err = CaptureRule::new("pis", r"PIS\s+\d+").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let err = CaptureRule::new("pis", r"(PIS)\s+(\d+)").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        // non-capturing groups don't count
        assert!(CaptureRule::new("mes", r"Mês\s+((?:\w+) de \d{4})").is_ok());
    }

    #[test]
    fn test_rule_invalid_regex() {
        let err = CaptureRule::new("broken", r"(unclosed").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPattern);
    }

    #[test]
    fn test_rule_extract_searches_anywhere() {
        let rule = CaptureRule::new("fap", r"FAP\s+(\d+,\d+)").unwrap();
        assert_eq!(rule.extract("   FAP    1,0000  "), Some("1,0000"));
        assert_eq!(rule.extract("RAT 2,00"), None);
    }

    #[test]
    fn test_boundary_predicates() {
        let boundary = Boundary::new(r"^\d+ - GFIP$", "Totais da GFIP").unwrap();
        assert!(boundary.opens("1 - GFIP"));
        assert!(!boundary.opens("1 - GFIP extra"));
        assert!(boundary.closes("   Totais da GFIP   "));
    }

    #[test]
    fn test_builder_rejects_duplicate_fields() {
        let err = SectionSpec::builder(SectionKind::Worker, boundary())
            .field("pis", r"PIS\s+(\d+)")
            .unwrap()
            .field("pis", r"PASEP\s+(\d+)")
            .unwrap()
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_builder_rejects_unknown_nullable() {
        let err = SectionSpec::builder(SectionKind::Worker, boundary())
            .field("pis", r"PIS\s+(\d+)")
            .unwrap()
            .nullable("ocorrencia")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("ocorrencia"));
    }

    #[test]
    fn test_builder_keeps_rule_order() {
        let spec = SectionSpec::builder(SectionKind::Worker, boundary())
            .field("b", r"B=(\w*)")
            .unwrap()
            .field("a", r"A=(\w*)")
            .unwrap()
            .nullable("a")
            .build()
            .unwrap();

        let names: Vec<_> = spec.field_names().collect();
        assert_eq!(names, vec!["b", "a"]);
        assert!(spec.is_nullable("a"));
        assert!(!spec.is_nullable("b"));
    }

    #[test]
    fn test_layout_requires_period_field() {
        let header = SectionSpec::builder(SectionKind::Header, boundary())
            .field("cnpj", r"CNPJ\s+(\S+)")
            .unwrap()
            .build()
            .unwrap();
        let worker = SectionSpec::builder(SectionKind::Worker, boundary())
            .field("pis", r"PIS\s+(\d+)")
            .unwrap()
            .build()
            .unwrap();

        let err = ReportLayout::new(header, worker).unwrap_err();
        assert!(err.to_string().contains(PERIOD_FIELD));
    }

    #[test]
    fn test_layout_rejects_swapped_sections() {
        let header = SectionSpec::builder(SectionKind::Header, boundary())
            .field(PERIOD_FIELD, r"Mês\s+(.*)")
            .unwrap()
            .build()
            .unwrap();
        let other_header = header.clone();

        let err = ReportLayout::new(header, other_header).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
