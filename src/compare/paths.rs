//! Paths, operations and per-operation metadata.

use crate::matcher::{partition, partition_maps, Pairing};
use crate::model::{Operation, PathItem};
use crate::rules::{RuleContext, RuleId};
use crate::types::HttpMethod;

use super::{Comparator, Loc};

/// Display label of an operation, e.g. `GET /pets`.
fn operation_label(method: HttpMethod, path: &str) -> String {
    format!("{} {}", method.as_str().to_uppercase(), path)
}

impl<'a> Comparator<'a> {
    pub(super) fn compare_paths(&mut self, loc: &Loc) {
        let (old, new) = (self.old, self.new);
        for pairing in partition_maps(&old.paths, &new.paths) {
            match pairing {
                Pairing::Matched { key, old, new } => {
                    let loc = loc.child(key);
                    if let Some((old, new)) = self.resolve_pair(old, new, &loc) {
                        let loc = loc.resolved(&old, &new);
                        self.compare_path_items(key, old.item, new.item, &loc);
                    }
                }
                Pairing::Added { key, .. } => {
                    self.added(
                        RuleId::PathAdded,
                        RuleContext::default(),
                        &loc.new.child(key),
                        &[key],
                    );
                }
                Pairing::Removed { key, .. } => {
                    self.removed(
                        RuleId::PathRemoved,
                        RuleContext::default(),
                        &loc.old.child(key),
                        &[key],
                    );
                }
            }
        }
    }

    fn compare_path_items(&mut self, path: &str, old: &'a PathItem, new: &'a PathItem, loc: &Loc) {
        self.compare_servers(&old.servers, &new.servers, &loc.child("servers"));
        self.report_shared_parameter_failures(&old.parameters, &new.parameters, loc);

        let methods = |item: &'a PathItem| item.operations.iter().map(|(m, op)| (*m, op));
        for pairing in partition(methods(old), methods(new)) {
            match pairing {
                Pairing::Matched {
                    key,
                    old: old_op,
                    new: new_op,
                } => {
                    let op_loc = loc.child(key.as_str());
                    if let Some((old_op, new_op)) = self.inline_pair(old_op, new_op, &op_loc) {
                        let label = operation_label(key, path);
                        self.compare_operations(
                            &label,
                            (old, old_op),
                            (new, new_op),
                            loc,
                            &op_loc,
                        );
                    }
                }
                Pairing::Added { key, .. } => {
                    self.added(
                        RuleId::OperationAdded,
                        RuleContext::default(),
                        &loc.new.child(key.as_str()),
                        &[operation_label(key, path).as_str()],
                    );
                }
                Pairing::Removed { key, .. } => {
                    self.removed(
                        RuleId::OperationRemoved,
                        RuleContext::default(),
                        &loc.old.child(key.as_str()),
                        &[operation_label(key, path).as_str()],
                    );
                }
            }
        }
    }

    /// Compare one matched operation. Each side comes with its path item,
    /// which supplies inherited parameters.
    fn compare_operations(
        &mut self,
        label: &str,
        (old_item, old): (&'a PathItem, &'a Operation),
        (new_item, new): (&'a PathItem, &'a Operation),
        item_loc: &Loc,
        loc: &Loc,
    ) {
        tracing::trace!(operation = label, "comparing operation");

        if let (Some(old_id), Some(new_id)) = (&old.operation_id, &new.operation_id) {
            if old_id != new_id {
                self.changed(
                    RuleId::OperationIdChanged,
                    RuleContext::default(),
                    loc,
                    &[old_id.as_str(), new_id.as_str()],
                );
            }
        }

        self.compare_deprecated(old.deprecated, new.deprecated, loc, label);
        self.compare_servers(&old.servers, &new.servers, &loc.child("servers"));

        if old.security.is_some() || new.security.is_some() {
            let (old_doc, new_doc) = (self.old, self.new);
            let old_security = old.security.as_deref().unwrap_or(&old_doc.security);
            let new_security = new.security.as_deref().unwrap_or(&new_doc.security);
            self.compare_security(old_security, new_security, &loc.child("security"));
        }

        self.compare_parameters(
            (old_item.parameters.as_slice(), old.parameters.as_slice()),
            (new_item.parameters.as_slice(), new.parameters.as_slice()),
            item_loc,
            loc,
        );

        self.compare_request_bodies(
            old.request_body.as_ref(),
            new.request_body.as_ref(),
            &loc.child("requestBody"),
            label,
        );
        self.compare_responses(&old.responses, &new.responses, &loc.child("responses"));
    }
}
