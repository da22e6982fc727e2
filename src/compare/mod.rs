//! The comparison engine: walks two documents in lock-step and classifies
//! every difference against a [`RuleTable`].
//!
//! Evaluators are split by structural kind:
//!
//! - `paths`: paths, operations and operation metadata
//! - `parameters`: effective parameter sets
//! - `content`: request bodies, responses, media types and headers
//! - `schema`: recursive schema comparison
//! - `security`: security requirements
//!
//! Servers are compared here since they appear at every level.

mod content;
mod parameters;
mod paths;
mod schema;
mod security;

use std::sync::OnceLock;

use crate::error::ResolveError;
use crate::matcher::{partition, Pairing};
use crate::model::{Document, RefOr, Schema, Server};
use crate::record::{ChangeRecord, Pointer};
use crate::resolver::{resolve, Component, Resolved, VisitedPairs};
use crate::rules::{RuleContext, RuleId, RuleTable};

/// Compare two documents using the default rule table.
///
/// Records come back in walk order: document servers, security and
/// security scheme definitions first, then paths in the new document's
/// order, with removals after additions.
pub fn compare(old: &Document, new: &Document) -> Vec<ChangeRecord> {
    compare_with(old, new, &RuleTable::default())
}

/// Compare two documents using a configured rule table.
pub fn compare_with(old: &Document, new: &Document, rules: &RuleTable) -> Vec<ChangeRecord> {
    tracing::debug!(
        old_paths = old.paths.len(),
        new_paths = new.paths.len(),
        "comparing documents"
    );
    let mut comparator = Comparator::new(old, new, rules);
    comparator.compare_document();
    tracing::debug!(
        records = comparator.records.len(),
        reference_pairs = comparator.visited.entered(),
        "comparison finished"
    );
    comparator.records
}

/// Which document a node came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Old,
    New,
}

/// The location of one matched element in both documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Loc {
    pub old: Pointer,
    pub new: Pointer,
}

impl Loc {
    pub fn root() -> Self {
        Loc {
            old: Pointer::root(),
            new: Pointer::root(),
        }
    }

    pub fn child(&self, segment: &str) -> Self {
        Loc {
            old: self.old.child(segment),
            new: self.new.child(segment),
        }
    }

    /// Location after resolving a pair of nodes that may be references.
    pub fn resolved<T: Component>(&self, old: &Resolved<'_, T>, new: &Resolved<'_, T>) -> Self {
        Loc {
            old: old.pointer(&self.old),
            new: new.pointer(&self.new),
        }
    }
}

/// Shared empty schema, standing in for an absent one.
pub(crate) fn empty_schema() -> &'static RefOr<Schema> {
    static EMPTY: OnceLock<RefOr<Schema>> = OnceLock::new();
    EMPTY.get_or_init(|| RefOr::Item(Schema::default()))
}

/// State of one comparison pass.
pub(crate) struct Comparator<'a> {
    old: &'a Document,
    new: &'a Document,
    rules: &'a RuleTable,
    visited: VisitedPairs,
    records: Vec<ChangeRecord>,
}

impl<'a> Comparator<'a> {
    pub fn new(old: &'a Document, new: &'a Document, rules: &'a RuleTable) -> Self {
        Comparator {
            old,
            new,
            rules,
            visited: VisitedPairs::new(),
            records: Vec::new(),
        }
    }

    fn document(&self, side: Side) -> &'a Document {
        match side {
            Side::Old => self.old,
            Side::New => self.new,
        }
    }

    fn compare_document(&mut self) {
        let (old, new) = (self.old, self.new);
        let loc = Loc::root();
        self.compare_servers(&old.servers, &new.servers, &loc.child("servers"));
        self.compare_security(&old.security, &new.security, &loc.child("security"));
        self.compare_security_schemes(&loc.child("components").child("securitySchemes"));
        self.compare_paths(&loc.child("paths"));
    }

    // --- emission -------------------------------------------------------

    fn emit(
        &mut self,
        rule: RuleId,
        context: RuleContext,
        old: Option<&Pointer>,
        new: Option<&Pointer>,
        args: &[&str],
    ) {
        let Some(severity) = self.rules.severity(rule, context) else {
            return;
        };
        self.records.push(ChangeRecord {
            severity,
            rule,
            message: rule.render(args),
            old_location: old.cloned(),
            new_location: new.cloned(),
        });
    }

    /// A modification present in both documents.
    fn changed(&mut self, rule: RuleId, context: RuleContext, loc: &Loc, args: &[&str]) {
        self.emit(rule, context, Some(&loc.old), Some(&loc.new), args);
    }

    /// An element only the new document has.
    fn added(&mut self, rule: RuleId, context: RuleContext, new: &Pointer, args: &[&str]) {
        self.emit(rule, context, None, Some(new), args);
    }

    /// An element only the old document has.
    fn removed(&mut self, rule: RuleId, context: RuleContext, old: &Pointer, args: &[&str]) {
        self.emit(rule, context, Some(old), None, args);
    }

    fn compare_flag(
        &mut self,
        old: bool,
        new: bool,
        (set, cleared): (RuleId, RuleId),
        context: RuleContext,
        loc: &Loc,
        args: &[&str],
    ) {
        match (old, new) {
            (false, true) => self.changed(set, context, loc, args),
            (true, false) => self.changed(cleared, context, loc, args),
            _ => {}
        }
    }

    fn compare_deprecated(&mut self, old: bool, new: bool, loc: &Loc, subject: &str) {
        self.compare_flag(
            old,
            new,
            (RuleId::DeprecatedAdded, RuleId::DeprecatedRemoved),
            RuleContext::default(),
            loc,
            &[subject],
        );
    }

    // --- resolution -----------------------------------------------------

    fn report_failure(&mut self, error: &ResolveError, old: Option<&Pointer>, new: Option<&Pointer>) {
        tracing::debug!(%error, "branch not compared");
        let rule = failure_rule(error);
        self.emit(rule, RuleContext::default(), old, new, &[&error.to_string()]);
    }

    /// Settle a pair of lookups, reporting failures. When both sides fail
    /// the same way, one record carries both pointers.
    fn settle_pair<T>(
        &mut self,
        old: Result<T, ResolveError>,
        new: Result<T, ResolveError>,
        loc: &Loc,
    ) -> Option<(T, T)> {
        match (old, new) {
            (Ok(old), Ok(new)) => Some((old, new)),
            (Err(old), Err(new)) if failure_rule(&old) == failure_rule(&new) => {
                self.report_failure(&old, Some(&loc.old), Some(&loc.new));
                None
            }
            (old, new) => {
                if let Err(error) = &old {
                    self.report_failure(error, Some(&loc.old), None);
                }
                if let Err(error) = &new {
                    self.report_failure(error, None, Some(&loc.new));
                }
                None
            }
        }
    }

    fn settle_one<T>(
        &mut self,
        result: Result<T, ResolveError>,
        side: Side,
        pointer: &Pointer,
    ) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                match side {
                    Side::Old => self.report_failure(&error, Some(pointer), None),
                    Side::New => self.report_failure(&error, None, Some(pointer)),
                }
                None
            }
        }
    }

    /// Resolve a matched pair of nodes that may be references.
    fn resolve_pair<T: Component>(
        &mut self,
        old: &'a RefOr<T>,
        new: &'a RefOr<T>,
        loc: &Loc,
    ) -> Option<(Resolved<'a, T>, Resolved<'a, T>)> {
        let old = resolve(self.old, old);
        let new = resolve(self.new, new);
        self.settle_pair(old, new, loc)
    }

    /// Resolve a node present in only one document.
    fn resolve_one<T: Component>(
        &mut self,
        side: Side,
        node: &'a RefOr<T>,
        pointer: &Pointer,
    ) -> Option<Resolved<'a, T>> {
        let result = resolve(self.document(side), node);
        self.settle_one(result, side, pointer)
    }

    /// Unwrap a matched pair of nodes that can only be defined inline.
    fn inline_pair<T>(
        &mut self,
        old: &'a RefOr<T>,
        new: &'a RefOr<T>,
        loc: &Loc,
    ) -> Option<(&'a T, &'a T)> {
        self.settle_pair(inline(old), inline(new), loc)
    }

    // --- servers --------------------------------------------------------

    /// Servers are keyed by URL. Unmatched servers on both sides are paired
    /// in declaration order and reported as URL changes.
    fn compare_servers(&mut self, old: &'a [Server], new: &'a [Server], loc: &Loc) {
        if old.is_empty() && new.is_empty() {
            return;
        }
        let position = |servers: &'a [Server]| {
            servers
                .iter()
                .enumerate()
                .map(|(i, server)| (server.url.as_str(), i))
        };

        let mut added = Vec::new();
        let mut removed = Vec::new();
        for pairing in partition(position(old), position(new)) {
            match pairing {
                Pairing::Matched { .. } => {}
                Pairing::Added { key, new } => added.push((key, new)),
                Pairing::Removed { key, old } => removed.push((key, old)),
            }
        }

        let replaced = added.len().min(removed.len());
        for (&(old_url, old_index), &(new_url, new_index)) in removed.iter().zip(&added) {
            let loc = Loc {
                old: loc.old.child(old_index.to_string()),
                new: loc.new.child(new_index.to_string()),
            };
            self.changed(
                RuleId::ServerUrlChanged,
                RuleContext::default(),
                &loc,
                &[old_url, new_url],
            );
        }
        for &(url, index) in &added[replaced..] {
            self.added(
                RuleId::ServerAdded,
                RuleContext::default(),
                &loc.new.child(index.to_string()),
                &[url],
            );
        }
        for &(url, index) in &removed[replaced..] {
            self.removed(
                RuleId::ServerRemoved,
                RuleContext::default(),
                &loc.old.child(index.to_string()),
                &[url],
            );
        }
    }
}

fn failure_rule(error: &ResolveError) -> RuleId {
    match error {
        ResolveError::StructuralMismatch { .. } => RuleId::StructuralMismatch,
        ResolveError::DanglingReference { .. }
        | ResolveError::ExternalReference { .. }
        | ResolveError::CircularReference { .. } => RuleId::UnresolvedReference,
    }
}

fn inline<T>(node: &RefOr<T>) -> Result<&T, ResolveError> {
    match node {
        RefOr::Item(item) => Ok(item),
        RefOr::Ref(reference) => Err(ResolveError::StructuralMismatch {
            expected: "inline definition",
            found: format!("reference '{}'", reference.reference),
        }),
        RefOr::Malformed(m) => Err(ResolveError::StructuralMismatch {
            expected: m.expected,
            found: m.found.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Severity;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        Document::from_value(&value).unwrap()
    }

    fn rules(records: &[ChangeRecord]) -> Vec<&str> {
        records.iter().map(|r| r.rule.name()).collect()
    }

    #[test]
    fn cycle_visits_each_pair_once() {
        let value = json!({
            "paths": {
                "/tree": {
                    "get": {
                        "responses": {
                            "200": {
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Node" }
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Node": {
                        "type": "object",
                        "properties": {
                            "children": {
                                "type": "array",
                                "items": { "$ref": "#/components/schemas/Node" }
                            },
                            "parent": { "$ref": "#/components/schemas/Node" }
                        }
                    }
                }
            }
        });
        let (old, new) = (doc(value.clone()), doc(value));
        let table = RuleTable::default();
        let mut comparator = Comparator::new(&old, &new, &table);
        comparator.compare_document();

        assert!(comparator.records.is_empty());
        // Node/Node entered once at the top of the walk; both inner
        // references close the cycle immediately.
        assert_eq!(comparator.visited.entered(), 1);
    }

    #[test]
    fn servers_match_by_url() {
        let old = doc(json!({ "servers": [{ "url": "https://a" }, { "url": "https://b" }] }));
        let new = doc(json!({ "servers": [{ "url": "https://b" }, { "url": "https://a" }] }));
        assert!(compare(&old, &new).is_empty());
    }

    #[test]
    fn server_replacement_is_url_change() {
        let old = doc(json!({ "servers": [{ "url": "https://a" }, { "url": "https://old" }] }));
        let new = doc(json!({ "servers": [{ "url": "https://a" }, { "url": "https://new" }, { "url": "https://c" }] }));
        let records = compare(&old, &new);
        assert_eq!(rules(&records), vec!["server-url-changed", "server-added"]);
        assert_eq!(records[0].severity, Severity::Warning);
        assert_eq!(records[0].old_location.as_ref().unwrap().to_string(), "/servers/1");
        assert_eq!(records[1].new_location.as_ref().unwrap().to_string(), "/servers/2");
    }

    #[test]
    fn server_removed() {
        let old = doc(json!({ "servers": [{ "url": "https://a" }] }));
        let new = doc(json!({}));
        let records = compare(&old, &new);
        assert_eq!(rules(&records), vec!["server-removed"]);
        assert!(records[0].new_location.is_none());
    }

    #[test]
    fn ignored_rules_emit_nothing() {
        let old = doc(json!({ "paths": { "/a": {} } }));
        let new = doc(json!({}));
        let table = RuleTable::new().ignore(RuleId::PathRemoved);
        assert!(compare_with(&old, &new, &table).is_empty());
    }

    #[test]
    fn same_failure_on_both_sides_reported_once() {
        let value = json!({
            "paths": {
                "/a": {
                    "get": {
                        "parameters": [{ "$ref": "#/components/parameters/Missing" }],
                        "responses": {}
                    }
                }
            }
        });
        let records = compare(&doc(value.clone()), &doc(value));
        assert_eq!(rules(&records), vec!["unresolved-reference"]);
        assert!(records[0].old_location.is_some());
        assert!(records[0].new_location.is_some());
    }
}
