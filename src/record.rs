//! Change records produced by a comparison.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::rules::RuleId;
use crate::types::Severity;

/// Location of a node inside one document, as a sequence of segments.
///
/// Serialized as an array of strings; displayed as an RFC 6901 JSON Pointer
/// (e.g. `/paths/~1pets/get`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pointer(Vec<String>);

impl Pointer {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Returns a new pointer one level deeper.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }
}

impl<S: Into<String>> FromIterator<S> for Pointer {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.0 {
            write!(f, "/{}", segment.replace('~', "~0").replace('/', "~1"))?;
        }
        Ok(())
    }
}

/// A single detected change between the old and the new document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub severity: Severity,
    /// Stable identifier of the rule that fired.
    pub rule: RuleId,
    pub message: String,
    /// Location in the old document; absent for pure additions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_location: Option<Pointer>,
    /// Location in the new document; absent for pure removals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_location: Option<Pointer>,
}

impl ChangeRecord {
    /// The most specific location available, preferring the new document.
    pub fn location(&self) -> Option<&Pointer> {
        self.new_location.as_ref().or(self.old_location.as_ref())
    }
}

impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let location = self
            .location()
            .map(ToString::to_string)
            .unwrap_or_else(|| "/".to_string());
        write!(
            f,
            "{}[{}]: {} - {}",
            self.severity, self.rule, location, self.message
        )
    }
}

/// Record counts per severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
}

impl Summary {
    pub fn of(records: &[ChangeRecord]) -> Self {
        let mut summary = Summary::default();
        for record in records {
            match record.severity {
                Severity::Error => summary.errors += 1,
                Severity::Warning => summary.warnings += 1,
                Severity::Info => summary.infos += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.errors + self.warnings + self.infos
    }

    /// Highest severity present, if any record exists.
    pub fn highest(&self) -> Option<Severity> {
        if self.errors > 0 {
            Some(Severity::Error)
        } else if self.warnings > 0 {
            Some(Severity::Warning)
        } else if self.infos > 0 {
            Some(Severity::Info)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(severity: Severity) -> ChangeRecord {
        ChangeRecord {
            severity,
            rule: RuleId::PathRemoved,
            message: "The path '/pets' was removed.".into(),
            old_location: Some(["paths", "/pets"].into_iter().collect()),
            new_location: None,
        }
    }

    #[test]
    fn pointer_display_escapes_segments() {
        let pointer: Pointer = ["paths", "/pets/{id}", "get"].into_iter().collect();
        assert_eq!(pointer.to_string(), "/paths/~1pets~1{id}/get");

        let pointer: Pointer = ["components", "schemas", "a~b"].into_iter().collect();
        assert_eq!(pointer.to_string(), "/components/schemas/a~0b");
        assert_eq!(Pointer::root().to_string(), "/");
    }

    #[test]
    fn pointer_serializes_as_segment_array() {
        let pointer = Pointer::root().child("paths").child("/pets");
        assert_eq!(
            serde_json::to_value(&pointer).unwrap(),
            serde_json::json!(["paths", "/pets"])
        );
    }

    #[test]
    fn record_display() {
        assert_eq!(
            record(Severity::Error).to_string(),
            "error[path-removed]: /paths/~1pets - The path '/pets' was removed."
        );
    }

    #[test]
    fn record_json_omits_missing_location() {
        let json = serde_json::to_value(record(Severity::Error)).unwrap();
        assert_eq!(json["rule"], "path-removed");
        assert_eq!(json["severity"], "error");
        assert!(json.get("new_location").is_none());
    }

    #[test]
    fn summary_counts_and_highest() {
        let records = vec![
            record(Severity::Info),
            record(Severity::Warning),
            record(Severity::Warning),
        ];
        let summary = Summary::of(&records);
        assert_eq!(summary.warnings, 2);
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.highest(), Some(Severity::Warning));
        assert_eq!(Summary::of(&[]).highest(), None);
    }
}
