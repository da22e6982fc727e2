//! Security requirements.
//!
//! Alternatives are flattened to scheme name and the union of its scopes,
//! then matched by scheme name. Scheme definitions are compared separately,
//! once per document.

use indexmap::{IndexMap, IndexSet};

use crate::matcher::{partition, partition_maps, Pairing};
use crate::model::SecurityRequirement;
use crate::rules::{RuleContext, RuleId};

use super::{Comparator, Loc};

fn flatten(requirements: &[SecurityRequirement]) -> IndexMap<&str, IndexSet<&str>> {
    let mut schemes: IndexMap<&str, IndexSet<&str>> = IndexMap::new();
    for requirement in requirements {
        for (scheme, scopes) in requirement {
            schemes
                .entry(scheme.as_str())
                .or_default()
                .extend(scopes.iter().map(String::as_str));
        }
    }
    schemes
}

impl<'a> Comparator<'a> {
    pub(super) fn compare_security(
        &mut self,
        old: &'a [SecurityRequirement],
        new: &'a [SecurityRequirement],
        loc: &Loc,
    ) {
        let context = RuleContext::default();
        for pairing in partition(flatten(old), flatten(new)) {
            match pairing {
                Pairing::Matched {
                    key,
                    old: old_scopes,
                    new: new_scopes,
                } => {
                    let loc = loc.child(key);
                    for scope in new_scopes.difference(&old_scopes) {
                        self.changed(RuleId::SecurityScopeAdded, context, &loc, &[key, *scope]);
                    }
                    for scope in old_scopes.difference(&new_scopes) {
                        self.changed(RuleId::SecurityScopeRemoved, context, &loc, &[key, *scope]);
                    }
                }
                Pairing::Added { key, .. } => {
                    self.added(
                        RuleId::SecurityRequirementAdded,
                        context,
                        &loc.new.child(key),
                        &[key],
                    );
                }
                Pairing::Removed { key, .. } => {
                    self.removed(
                        RuleId::SecurityRequirementRemoved,
                        context,
                        &loc.old.child(key),
                        &[key],
                    );
                }
            }
        }
    }

    /// Report scheme definitions that changed kind, e.g. API key to bearer.
    /// Compared once per document, where the definitions live.
    pub(super) fn compare_security_schemes(&mut self, loc: &Loc) {
        let (old, new) = (self.old, self.new);
        let schemes = partition_maps(
            &old.components.security_schemes,
            &new.components.security_schemes,
        );
        for pairing in schemes {
            if let Pairing::Matched { key, old, new } = pairing {
                let (old_label, new_label) = (old.label(), new.label());
                if old_label != new_label {
                    self.changed(
                        RuleId::SecuritySchemeTypeChanged,
                        RuleContext::default(),
                        &loc.child(key),
                        &[key, old_label.as_str(), new_label.as_str()],
                    );
                }
            }
        }
    }
}
