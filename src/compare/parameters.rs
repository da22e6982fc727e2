//! Effective parameter sets of matched operations.
//!
//! An operation's effective parameters are its path item's parameters
//! overridden by its own, keyed by `(name, location)`.

use indexmap::IndexMap;

use crate::error::ResolveError;
use crate::matcher::{partition, Pairing};
use crate::model::{Parameter, ParameterShape, RefOr};
use crate::record::Pointer;
use crate::resolver::resolve;
use crate::rules::{RuleContext, RuleId};
use crate::types::{Direction, ParameterLocation};

use super::{failure_rule, Comparator, Loc, Side};

type ParameterKey<'a> = (&'a str, ParameterLocation);

/// A resolved parameter and where it was found.
struct Entry<'a> {
    param: &'a Parameter,
    /// Where the parameter is listed.
    usage: Pointer,
    /// Where the parameter is defined: the component when referenced.
    definition: Pointer,
}

type Failures = Vec<(ResolveError, Pointer)>;

fn shape_label(shape: &ParameterShape) -> &'static str {
    match shape {
        ParameterShape::Schema(_) => "schema",
        ParameterShape::Content(_) => "content",
        ParameterShape::Unspecified => "no schema",
    }
}

impl<'a> Comparator<'a> {
    /// Resolve a parameter list into `into`, later entries overriding
    /// earlier ones with the same key.
    fn collect_parameters(
        &self,
        side: Side,
        list: &'a [RefOr<Parameter>],
        base: &Pointer,
        into: &mut IndexMap<ParameterKey<'a>, Entry<'a>>,
        failures: &mut Failures,
    ) {
        let document = self.document(side);
        let base = base.child("parameters");
        for (index, node) in list.iter().enumerate() {
            match resolve(document, node) {
                Ok(resolved) => {
                    let param = resolved.item;
                    let usage = base.child(param.name.as_str());
                    into.insert(
                        (param.name.as_str(), param.location),
                        Entry {
                            param,
                            definition: resolved.pointer(&usage),
                            usage,
                        },
                    );
                }
                Err(error) => failures.push((error, base.child(index.to_string()))),
            }
        }
    }

    fn report_parameter_failures(&mut self, old: Failures, mut new: Failures) {
        for (error, pointer) in old {
            let twin = new.iter().position(|(other, other_pointer)| {
                other_pointer == &pointer && failure_rule(other) == failure_rule(&error)
            });
            match twin {
                Some(i) => {
                    let (_, new_pointer) = new.remove(i);
                    self.report_failure(&error, Some(&pointer), Some(&new_pointer));
                }
                None => self.report_failure(&error, Some(&pointer), None),
            }
        }
        for (error, pointer) in new {
            self.report_failure(&error, None, Some(&pointer));
        }
    }

    /// Path-level parameters are shared by every operation; report their
    /// resolution failures once, at the path item.
    pub(super) fn report_shared_parameter_failures(
        &mut self,
        old: &'a [RefOr<Parameter>],
        new: &'a [RefOr<Parameter>],
        loc: &Loc,
    ) {
        let (mut old_failures, mut new_failures) = (Vec::new(), Vec::new());
        self.collect_parameters(Side::Old, old, &loc.old, &mut IndexMap::new(), &mut old_failures);
        self.collect_parameters(Side::New, new, &loc.new, &mut IndexMap::new(), &mut new_failures);
        self.report_parameter_failures(old_failures, new_failures);
    }

    /// Compare effective parameters. Each side is given as
    /// `(path item parameters, operation parameters)`.
    pub(super) fn compare_parameters(
        &mut self,
        (old_shared, old_own): (&'a [RefOr<Parameter>], &'a [RefOr<Parameter>]),
        (new_shared, new_own): (&'a [RefOr<Parameter>], &'a [RefOr<Parameter>]),
        item_loc: &Loc,
        loc: &Loc,
    ) {
        let mut old_params = IndexMap::new();
        let mut new_params = IndexMap::new();
        let (mut old_failures, mut new_failures) = (Vec::new(), Vec::new());
        // Shared failures are reported with the path item.
        let mut ignored = Vec::new();

        self.collect_parameters(Side::Old, old_shared, &item_loc.old, &mut old_params, &mut ignored);
        self.collect_parameters(Side::Old, old_own, &loc.old, &mut old_params, &mut old_failures);
        self.collect_parameters(Side::New, new_shared, &item_loc.new, &mut new_params, &mut ignored);
        self.collect_parameters(Side::New, new_own, &loc.new, &mut new_params, &mut new_failures);
        self.report_parameter_failures(old_failures, new_failures);

        for pairing in partition(old_params, new_params) {
            match pairing {
                Pairing::Matched {
                    key: (name, location),
                    old,
                    new,
                } => self.compare_parameter(name, location, &old, &new),
                Pairing::Added {
                    key: (name, location),
                    new,
                } => {
                    let required = new.param.required;
                    let rule = if required {
                        RuleId::RequiredParameterAdded
                    } else {
                        RuleId::OptionalParameterAdded
                    };
                    self.added(
                        rule,
                        RuleContext::requirement(required),
                        &new.usage,
                        &[name, location.as_str()],
                    );
                }
                Pairing::Removed {
                    key: (name, location),
                    old,
                } => {
                    self.removed(
                        RuleId::ParameterRemoved,
                        RuleContext::requirement(old.param.required),
                        &old.usage,
                        &[name, location.as_str()],
                    );
                }
            }
        }
    }

    fn compare_parameter(
        &mut self,
        name: &str,
        location: ParameterLocation,
        old: &Entry<'a>,
        new: &Entry<'a>,
    ) {
        let (old_param, new_param) = (old.param, new.param);
        let loc = Loc {
            old: old.definition.clone(),
            new: new.definition.clone(),
        };
        let args = [name, location.as_str()];

        self.compare_flag(
            old_param.required,
            new_param.required,
            (RuleId::ParameterBecameRequired, RuleId::ParameterBecameOptional),
            RuleContext::default(),
            &loc,
            &args,
        );
        self.compare_deprecated(old_param.deprecated, new_param.deprecated, &loc, name);

        let (old_style, new_style) = (old_param.effective_style(), new_param.effective_style());
        if old_style != new_style {
            let detail = format!("style '{}' became '{}'", old_style, new_style);
            self.serialization_changed(&loc, &args, &detail);
        }
        let (old_explode, new_explode) = (old_param.effective_explode(), new_param.effective_explode());
        if old_explode != new_explode {
            let detail = format!("explode {} became {}", old_explode, new_explode);
            self.serialization_changed(&loc, &args, &detail);
        }

        match (&old_param.shape, &new_param.shape) {
            (ParameterShape::Schema(old), ParameterShape::Schema(new)) => {
                self.compare_schemas(old, new, &loc.child("schema"), Direction::Request);
            }
            (ParameterShape::Content(old), ParameterShape::Content(new)) => {
                self.compare_media_types(old, new, &loc.child("content"), Direction::Request);
            }
            (ParameterShape::Unspecified, ParameterShape::Unspecified) => {}
            (old, new) => {
                let detail = format!("{} became {}", shape_label(old), shape_label(new));
                self.serialization_changed(&loc, &args, &detail);
            }
        }
    }

    fn serialization_changed(&mut self, loc: &Loc, args: &[&str; 2], detail: &str) {
        self.changed(
            RuleId::ParameterSerializationChanged,
            RuleContext::default(),
            loc,
            &[args[0], args[1], detail],
        );
    }
}
