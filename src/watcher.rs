//! Section boundary detection and field capture.
//!
//! A section is tracked as an explicit [`WatcherState`] value that the scan
//! loop threads through two functions per line, always in this order:
//!
//! 1. [`SectionWatcher::observe_transition`] opens an idle section on an
//!    enter match, or closes an active one on an exit match and flushes it.
//! 2. [`SectionWatcher::capture`] runs the catalog against the line if the
//!    section is active *after* step 1.
//!
//! The ordering makes capture eligibility asymmetric: the line that opens a
//! section is captured, the line that closes it is not.
//!
//! Within one active window every match of a rule overwrites the previous
//! value, so the last matching line wins.

use crate::catalog::SectionSpec;
use crate::error::{GfipError, Result};
use crate::constants::MISSING_SENTINEL;
use crate::models::{FieldList, SectionKind};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Field values captured so far in the current active window
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedFields {
    values: HashMap<String, String>,
}

impl CapturedFields {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Store a value, replacing any earlier capture of the same field
    fn overwrite(&mut self, field: &str, value: String) -> Option<String> {
        self.values.insert(field.to_string(), value)
    }
}

/// Activation state of one section type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum WatcherState {
    #[default]
    Idle,
    Active(CapturedFields),
}

impl WatcherState {
    pub fn is_active(&self) -> bool {
        matches!(self, WatcherState::Active(_))
    }
}

/// Result of flushing a closed section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flushed {
    /// Field values in catalog order
    pub fields: FieldList,
    /// The single field substituted with the sentinel, if any
    pub tolerated: Option<String>,
}

/// Boundary event reported by [`SectionWatcher::observe_transition`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Opened,
    Closed(Flushed),
}

/// Transition and capture logic for one section type
#[derive(Debug, Clone, Copy)]
pub struct SectionWatcher<'a> {
    spec: &'a SectionSpec,
}

impl<'a> SectionWatcher<'a> {
    pub fn new(spec: &'a SectionSpec) -> Self {
        Self { spec }
    }

    pub fn kind(&self) -> SectionKind {
        self.spec.kind()
    }

    /// Evaluate the enter predicate when idle, or the exit predicate when
    /// active. A single observation never both opens and closes.
    pub fn observe_transition(
        &self,
        state: WatcherState,
        line: &str,
        line_no: usize,
    ) -> Result<(WatcherState, Option<Transition>)> {
        match state {
            WatcherState::Idle if self.spec.boundary().opens(line) => {
                debug!("{} section opened at line {}", self.kind(), line_no);
                Ok((
                    WatcherState::Active(CapturedFields::default()),
                    Some(Transition::Opened),
                ))
            }
            WatcherState::Active(captured) if self.spec.boundary().closes(line) => {
                let flushed = self.flush(captured, line_no)?;
                debug!(
                    "{} section closed at line {} with {} fields",
                    self.kind(),
                    line_no,
                    flushed.fields.len()
                );
                Ok((WatcherState::Idle, Some(Transition::Closed(flushed))))
            }
            state => Ok((state, None)),
        }
    }

    /// Run every capture rule against the line if the section is active.
    pub fn capture(&self, state: WatcherState, line: &str, line_no: usize) -> Result<WatcherState> {
        let WatcherState::Active(mut captured) = state else {
            return Ok(state);
        };

        for rule in self.spec.rules() {
            let Some(raw) = rule.extract(line) else {
                continue;
            };

            let value = raw.trim();
            if value.is_empty() && !self.spec.is_nullable(rule.name()) {
                return Err(GfipError::EmptyCapturedValue {
                    section: self.kind(),
                    field: rule.name().to_string(),
                    line: line_no,
                });
            }

            if let Some(previous) = captured.overwrite(rule.name(), value.to_string()) {
                debug!(
                    "{} field '{}' recaptured at line {} (was '{}')",
                    self.kind(),
                    rule.name(),
                    line_no,
                    previous
                );
            }
        }

        Ok(WatcherState::Active(captured))
    }

    /// Observe the transition, then capture, for one line.
    pub fn step(
        &self,
        state: WatcherState,
        line: &str,
        line_no: usize,
    ) -> Result<(WatcherState, Option<Transition>)> {
        let (state, transition) = self.observe_transition(state, line, line_no)?;
        let state = self.capture(state, line, line_no)?;
        Ok((state, transition))
    }

    /// Order the captured values by catalog, tolerating one missing field.
    /// Consuming the captured map leaves nothing behind for the next window.
    fn flush(&self, mut captured: CapturedFields, line_no: usize) -> Result<Flushed> {
        let missing: Vec<String> = self
            .spec
            .field_names()
            .filter(|name| captured.get(name).is_none())
            .map(str::to_string)
            .collect();

        if missing.len() >= 2 {
            return Err(GfipError::IncompleteSection {
                section: self.kind(),
                missing,
                line: line_no,
            });
        }

        let tolerated = missing.into_iter().next();
        if let Some(field) = &tolerated {
            warn!(
                "{} section closed at line {} without field '{}', using {}",
                self.kind(),
                line_no,
                field,
                MISSING_SENTINEL
            );
        }

        let fields = self
            .spec
            .field_names()
            .map(|name| {
                let value = captured
                    .values
                    .remove(name)
                    .unwrap_or_else(|| MISSING_SENTINEL.to_string());
                (name.to_string(), value)
            })
            .collect();

        Ok(Flushed { fields, tolerated })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Boundary;
    use crate::error::ErrorKind;

    fn spec() -> SectionSpec {
        SectionSpec::builder(
            SectionKind::Worker,
            Boundary::new(r"^BEGIN", r"^END").unwrap(),
        )
        .field("a", r"A=(.*)")
        .unwrap()
        .field("b", r"B=(.*)")
        .unwrap()
        .field("c", r"C=(.*)")
        .unwrap()
        .nullable("c")
        .build()
        .unwrap()
    }

    /// Feed lines through the watcher, collecting transitions
    fn run(spec: &SectionSpec, lines: &[&str]) -> Result<(WatcherState, Vec<Transition>)> {
        let watcher = SectionWatcher::new(spec);
        let mut state = WatcherState::Idle;
        let mut transitions = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            let (next, transition) = watcher.step(state, line, i + 1)?;
            state = next;
            transitions.extend(transition);
        }
        Ok((state, transitions))
    }

    fn closed(transitions: &[Transition]) -> Vec<&Flushed> {
        transitions
            .iter()
            .filter_map(|t| match t {
                Transition::Closed(flushed) => Some(flushed),
                Transition::Opened => None,
            })
            .collect()
    }

    fn value<'f>(flushed: &'f Flushed, name: &str) -> Option<&'f str> {
        flushed
            .fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_complete_window_flushes_trimmed_values() {
        let spec = spec();
        let (state, transitions) =
            run(&spec, &["BEGIN", "A=  one  ", "B=two", "C=three", "END"]).unwrap();

        assert_eq!(state, WatcherState::Idle);
        assert_eq!(transitions.len(), 2);
        assert_eq!(transitions[0], Transition::Opened);

        let flushed = closed(&transitions);
        assert_eq!(
            flushed[0].fields,
            vec![
                ("a".to_string(), "one".to_string()),
                ("b".to_string(), "two".to_string()),
                ("c".to_string(), "three".to_string()),
            ]
        );
        assert_eq!(flushed[0].tolerated, None);
    }

    #[test]
    fn test_last_match_wins() {
        let spec = spec();
        let (_, transitions) =
            run(&spec, &["BEGIN", "A=first", "B=b", "A=second", "C=c", "A=third", "END"]).unwrap();

        assert_eq!(value(closed(&transitions)[0], "a"), Some("third"));
    }

    #[test]
    fn test_single_missing_field_is_tolerated() {
        let spec = spec();
        let (_, transitions) = run(&spec, &["BEGIN", "A=x", "C=z", "END"]).unwrap();

        let flushed = closed(&transitions)[0];
        assert_eq!(value(flushed, "b"), Some(MISSING_SENTINEL));
        assert_eq!(flushed.tolerated.as_deref(), Some("b"));
    }

    #[test]
    fn test_two_missing_fields_fail() {
        let spec = spec();
        let err = run(&spec, &["BEGIN", "A=x", "END"]).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::IncompleteSection);
        match err {
            GfipError::IncompleteSection {
                section,
                missing,
                line,
            } => {
                assert_eq!(section, SectionKind::Worker);
                assert_eq!(missing, vec!["b".to_string(), "c".to_string()]);
                assert_eq!(line, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_opening_line_is_captured() {
        let spec = spec();
        let (_, transitions) = run(&spec, &["BEGIN A=opener", "B=b", "C=c", "END"]).unwrap();

        assert_eq!(value(closed(&transitions)[0], "a"), Some("opener"));
    }

    #[test]
    fn test_closing_line_is_not_captured() {
        let spec = spec();
        let (_, transitions) = run(&spec, &["BEGIN", "A=a", "B=b", "C=c", "END A=closer"]).unwrap();
        assert_eq!(value(closed(&transitions)[0], "a"), Some("a"));

        // the closing line cannot supply a missing field either
        let err = run(&spec, &["BEGIN", "A=a", "END B=b C=c"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IncompleteSection);
    }

    #[test]
    fn test_idle_lines_are_ignored() {
        let spec = spec();
        let (state, transitions) = run(&spec, &["A=outside", "END", "B=outside"]).unwrap();

        assert_eq!(state, WatcherState::Idle);
        assert!(transitions.is_empty());
    }

    #[test]
    fn test_enter_match_while_active_does_not_reopen() {
        let spec = spec();
        let (state, transitions) = run(&spec, &["BEGIN", "BEGIN", "A=a"]).unwrap();

        assert_eq!(transitions, vec![Transition::Opened]);
        match state {
            WatcherState::Active(captured) => assert_eq!(captured.get("a"), Some("a")),
            WatcherState::Idle => panic!("section should still be active"),
        }
    }

    #[test]
    fn test_empty_capture_fails_unless_nullable() {
        let spec = spec();
        let err = run(&spec, &["BEGIN", "B=   "]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyCapturedValue);
        assert!(err.to_string().contains("'b'"));
        assert!(err.to_string().contains("line 2"));

        let (_, transitions) = run(&spec, &["BEGIN", "A=a", "B=b", "C=  ", "END"]).unwrap();
        assert_eq!(value(closed(&transitions)[0], "c"), Some(""));
    }

    #[test]
    fn test_windows_do_not_share_fields() {
        let spec = spec();
        let lines = ["BEGIN", "A=1", "B=1", "C=1", "END", "BEGIN", "A=2", "C=2", "END"];
        let (_, transitions) = run(&spec, &lines).unwrap();

        let flushed = closed(&transitions);
        assert_eq!(flushed.len(), 2);
        assert_eq!(value(flushed[1], "a"), Some("2"));
        assert_eq!(value(flushed[1], "b"), Some(MISSING_SENTINEL));
    }

    #[test]
    fn test_observe_without_capture_leaves_fields_empty() {
        let spec = spec();
        let watcher = SectionWatcher::new(&spec);

        let (state, transition) = watcher
            .observe_transition(WatcherState::Idle, "BEGIN A=x", 1)
            .unwrap();
        assert_eq!(transition, Some(Transition::Opened));
        assert_eq!(state, WatcherState::Active(CapturedFields::default()));

        let state = watcher.capture(state, "BEGIN A=x", 1).unwrap();
        assert!(state.is_active());
    }
}
