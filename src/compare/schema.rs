//! Recursive schema comparison.
//!
//! Every constraint is classified by whether the new schema accepts fewer
//! values (tightened) or more (loosened) than the old one; the rule table
//! then decides severity from the direction the schema travels in.

use indexmap::IndexSet;
use serde_json::Value;

use crate::matcher::{partition_maps, Pairing};
use crate::model::{AdditionalProperties, Bound, RefOr, Schema};
use crate::rules::{RuleContext, RuleId};
use crate::types::Direction;

use super::{empty_schema, Comparator, Loc};

fn or_none<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "none".to_string(), |v| v.to_string())
}

fn bound_text(bound: Option<Bound>) -> String {
    match bound {
        Some(Bound {
            value,
            exclusive: true,
        }) => format!("{} (exclusive)", value),
        Some(Bound { value, .. }) => value.to_string(),
        None => "none".to_string(),
    }
}

fn access_mode(schema: &Schema) -> &'static str {
    match (schema.read_only, schema.write_only) {
        (true, false) => "read-only",
        (false, true) => "write-only",
        _ => "read-write",
    }
}

/// Whether an upper bound went down, or became exclusive at the same value.
fn upper_tightened(old: Bound, new: Bound) -> bool {
    new.value < old.value || (new.value == old.value && new.exclusive && !old.exclusive)
}

fn lower_tightened(old: Bound, new: Bound) -> bool {
    new.value > old.value || (new.value == old.value && new.exclusive && !old.exclusive)
}

/// A limit on both sides, its ordering and the rules for each direction.
type Limit<T> = (Option<T>, Option<T>, fn(T, T) -> bool, (RuleId, RuleId));

/// Which way a limit moved. Adding a limit tightens, dropping one loosens.
fn limit_change<T: PartialEq + Copy>(
    old: Option<T>,
    new: Option<T>,
    tightened: fn(T, T) -> bool,
) -> Option<bool> {
    match (old, new) {
        (None, None) => None,
        (None, Some(_)) => Some(true),
        (Some(_), None) => Some(false),
        (Some(old), Some(new)) if old == new => None,
        (Some(old), Some(new)) => Some(tightened(old, new)),
    }
}

impl<'a> Comparator<'a> {
    /// Compare two schema nodes, following references.
    ///
    /// A reference pair already being compared further up the current
    /// branch is treated as equal, which closes recursive schemas. A pair of
    /// components already compared in the same direction is skipped.
    pub(super) fn compare_schemas(
        &mut self,
        old: &'a RefOr<Schema>,
        new: &'a RefOr<Schema>,
        loc: &Loc,
        direction: Direction,
    ) {
        let Some((old, new)) = self.resolve_pair(old, new, loc) else {
            return;
        };
        if old.name.is_none() && new.name.is_none() {
            self.compare_schema(old.item, new.item, loc, direction);
            return;
        }
        if self.visited.is_completed(old.name, new.name, direction) {
            return;
        }
        if !self.visited.enter(old.name, new.name) {
            tracing::trace!(old = ?old.name, new = ?new.name, "reference cycle closed");
            return;
        }
        let inner = loc.resolved(&old, &new);
        self.compare_schema(old.item, new.item, &inner, direction);
        self.visited.leave(old.name, new.name);
        self.visited.complete(old.name, new.name, direction);
    }

    /// Compare optional schemas; an absent schema accepts anything.
    pub(super) fn compare_optional_schemas(
        &mut self,
        old: Option<&'a RefOr<Schema>>,
        new: Option<&'a RefOr<Schema>>,
        loc: &Loc,
        direction: Direction,
    ) {
        if old.is_none() && new.is_none() {
            return;
        }
        self.compare_schemas(
            old.unwrap_or(empty_schema()),
            new.unwrap_or(empty_schema()),
            loc,
            direction,
        );
    }

    fn compare_schema(&mut self, old: &'a Schema, new: &'a Schema, loc: &Loc, direction: Direction) {
        let context = RuleContext::directional(direction);

        if old.types != new.types {
            // Nothing below a type change is meaningful on its own.
            self.changed(
                RuleId::TypeChanged,
                context,
                loc,
                &[&old.type_label(), &new.type_label()],
            );
            return;
        }
        if old.format != new.format {
            self.changed(
                RuleId::FormatChanged,
                context,
                loc,
                &[
                    old.format.as_deref().unwrap_or("none"),
                    new.format.as_deref().unwrap_or("none"),
                ],
            );
        }
        self.compare_flag(
            old.nullable,
            new.nullable,
            (RuleId::NullableAdded, RuleId::NullableRemoved),
            context,
            loc,
            &[],
        );

        self.compare_enums(old.enumeration.as_deref(), new.enumeration.as_deref(), loc, context);
        self.compare_limits(old, new, loc, context);
        self.compare_pattern(old.pattern.as_deref(), new.pattern.as_deref(), loc, context);

        if old.multiple_of != new.multiple_of {
            self.changed(
                RuleId::MultipleOfChanged,
                context,
                loc,
                &[&or_none(old.multiple_of), &or_none(new.multiple_of)],
            );
        }
        self.compare_flag(
            old.unique_items,
            new.unique_items,
            (RuleId::UniqueItemsAdded, RuleId::UniqueItemsRemoved),
            context,
            loc,
            &[],
        );
        if old.default != new.default {
            self.changed(
                RuleId::DefaultValueChanged,
                context,
                loc,
                &[
                    &or_none(old.default.as_ref().map(Value::to_string)),
                    &or_none(new.default.as_ref().map(Value::to_string)),
                ],
            );
        }
        let (old_mode, new_mode) = (access_mode(old), access_mode(new));
        if old_mode != new_mode {
            self.changed(RuleId::AccessModeChanged, context, loc, &[old_mode, new_mode]);
        }
        let subject = loc.new.segments().last().map_or("schema", String::as_str);
        self.compare_deprecated(old.deprecated, new.deprecated, loc, subject);
        if old.discriminator != new.discriminator {
            self.changed(
                RuleId::DiscriminatorChanged,
                context,
                loc,
                &[
                    old.discriminator.as_deref().unwrap_or("none"),
                    new.discriminator.as_deref().unwrap_or("none"),
                ],
            );
        }

        if old.items.is_some() || new.items.is_some() {
            self.compare_schemas(
                old.items.as_deref().unwrap_or(empty_schema()),
                new.items.as_deref().unwrap_or(empty_schema()),
                &loc.child("items"),
                direction,
            );
        }
        self.compare_properties(old, new, loc, direction);
        self.compare_additional_properties(
            &old.additional_properties,
            &new.additional_properties,
            &loc.child("additionalProperties"),
            direction,
        );
        for (keyword, old_list, new_list) in [
            ("allOf", &old.all_of, &new.all_of),
            ("oneOf", &old.one_of, &new.one_of),
            ("anyOf", &old.any_of, &new.any_of),
        ] {
            self.compare_composition(keyword, old_list, new_list, loc, direction);
        }
    }

    fn compare_enums(
        &mut self,
        old: Option<&'a [Value]>,
        new: Option<&'a [Value]>,
        loc: &Loc,
        context: RuleContext,
    ) {
        let list = |values: &[Value]| {
            let items: Vec<String> = values.iter().map(Value::to_string).collect();
            format!("[{}]", items.join(", "))
        };
        match (old, new) {
            (None, None) => {}
            (None, Some(new)) => {
                self.changed(RuleId::EnumConstraintAdded, context, loc, &[&list(new)]);
            }
            (Some(old), None) => {
                self.changed(RuleId::EnumConstraintRemoved, context, loc, &[&list(old)]);
            }
            (Some(old), Some(new)) => {
                for value in new.iter().filter(|v| !old.contains(v)) {
                    self.changed(RuleId::EnumValueAdded, context, loc, &[&value.to_string()]);
                }
                for value in old.iter().filter(|v| !new.contains(v)) {
                    self.changed(RuleId::EnumValueRemoved, context, loc, &[&value.to_string()]);
                }
            }
        }
    }

    fn compare_limits(&mut self, old: &Schema, new: &Schema, loc: &Loc, context: RuleContext) {
        let bounds: [Limit<Bound>; 2] = [
            (
                old.maximum,
                new.maximum,
                upper_tightened,
                (RuleId::MaximumTightened, RuleId::MaximumLoosened),
            ),
            (
                old.minimum,
                new.minimum,
                lower_tightened,
                (RuleId::MinimumTightened, RuleId::MinimumLoosened),
            ),
        ];
        for (old_bound, new_bound, tightened, rules) in bounds {
            if let Some(tighter) = limit_change(old_bound, new_bound, tightened) {
                let rule = if tighter { rules.0 } else { rules.1 };
                self.changed(rule, context, loc, &[&bound_text(old_bound), &bound_text(new_bound)]);
            }
        }

        let upper = |old: u64, new: u64| new < old;
        let lower = |old: u64, new: u64| new > old;
        let lengths: [Limit<u64>; 4] = [
            (
                old.max_length,
                new.max_length,
                upper,
                (RuleId::MaxLengthTightened, RuleId::MaxLengthLoosened),
            ),
            (
                old.min_length,
                new.min_length,
                lower,
                (RuleId::MinLengthTightened, RuleId::MinLengthLoosened),
            ),
            (
                old.max_items,
                new.max_items,
                upper,
                (RuleId::MaxItemsTightened, RuleId::MaxItemsLoosened),
            ),
            (
                old.min_items,
                new.min_items,
                lower,
                (RuleId::MinItemsTightened, RuleId::MinItemsLoosened),
            ),
        ];
        for (old_limit, new_limit, tightened, rules) in lengths {
            if let Some(tighter) = limit_change(old_limit, new_limit, tightened) {
                let rule = if tighter { rules.0 } else { rules.1 };
                self.changed(rule, context, loc, &[&or_none(old_limit), &or_none(new_limit)]);
            }
        }
    }

    fn compare_pattern(
        &mut self,
        old: Option<&str>,
        new: Option<&str>,
        loc: &Loc,
        context: RuleContext,
    ) {
        match (old, new) {
            (None, Some(new)) => self.changed(RuleId::PatternAdded, context, loc, &[new]),
            (Some(old), None) => self.changed(RuleId::PatternRemoved, context, loc, &[old]),
            (Some(old), Some(new)) if old != new => {
                self.changed(RuleId::PatternChanged, context, loc, &[old, new]);
            }
            _ => {}
        }
    }

    fn compare_properties(
        &mut self,
        old: &'a Schema,
        new: &'a Schema,
        loc: &Loc,
        direction: Direction,
    ) {
        let context = RuleContext::directional(direction);
        let properties = loc.child("properties");

        for pairing in partition_maps(&old.properties, &new.properties) {
            match pairing {
                Pairing::Matched {
                    key,
                    old: old_property,
                    new: new_property,
                } => {
                    self.compare_schemas(old_property, new_property, &properties.child(key), direction);
                }
                Pairing::Added { key, .. } => {
                    let rule = match (new.required.contains(key), direction) {
                        (false, _) => RuleId::PropertyAdded,
                        (true, Direction::Request) => RuleId::RequiredRequestPropertyAdded,
                        (true, Direction::Response) => RuleId::RequiredResponsePropertyAdded,
                    };
                    self.added(rule, context, &properties.new.child(key), &[key]);
                }
                Pairing::Removed { key, .. } => {
                    self.removed(RuleId::PropertyRemoved, context, &properties.old.child(key), &[key]);
                }
            }
        }

        // Required-set changes for properties present on both sides, or
        // declared elsewhere (e.g. through composition) on both sides.
        let names: IndexSet<&str> = new
            .required
            .iter()
            .chain(&old.required)
            .map(String::as_str)
            .collect();
        for name in names {
            let (was, is) = (old.required.contains(name), new.required.contains(name));
            if was == is
                || old.properties.contains_key(name) != new.properties.contains_key(name)
            {
                continue;
            }
            let rule = if is {
                RuleId::PropertyBecameRequired
            } else {
                RuleId::PropertyBecameOptional
            };
            self.changed(rule, context, &loc.child("required"), &[name]);
        }
    }

    fn compare_additional_properties(
        &mut self,
        old: &'a AdditionalProperties,
        new: &'a AdditionalProperties,
        loc: &Loc,
        direction: Direction,
    ) {
        let context = RuleContext::directional(direction);
        match (old, new) {
            (AdditionalProperties::Allowed, AdditionalProperties::Allowed)
            | (AdditionalProperties::Forbidden, AdditionalProperties::Forbidden) => {}
            (AdditionalProperties::Forbidden, _) => {
                self.changed(RuleId::AdditionalPropertiesAdded, context, loc, &[]);
            }
            (_, AdditionalProperties::Forbidden) => {
                self.changed(RuleId::AdditionalPropertiesRemoved, context, loc, &[]);
            }
            (AdditionalProperties::Schema(old), AdditionalProperties::Schema(new)) => {
                self.compare_schemas(old, new, loc, direction);
            }
            (AdditionalProperties::Allowed, AdditionalProperties::Schema(new)) => {
                self.compare_schemas(empty_schema(), new, loc, direction);
            }
            (AdditionalProperties::Schema(old), AdditionalProperties::Allowed) => {
                self.compare_schemas(old, empty_schema(), loc, direction);
            }
        }
    }

    /// Branches are compared by position. Lists of different length are
    /// reported as one replacement; set comparison would lose `oneOf` order.
    fn compare_composition(
        &mut self,
        keyword: &str,
        old: &'a [RefOr<Schema>],
        new: &'a [RefOr<Schema>],
        loc: &Loc,
        direction: Direction,
    ) {
        if old.len() != new.len() {
            self.changed(
                RuleId::CompositionChanged,
                RuleContext::directional(direction),
                &loc.child(keyword),
                &[keyword, &old.len().to_string(), &new.len().to_string()],
            );
            return;
        }
        let loc = loc.child(keyword);
        for (index, (old, new)) in old.iter().zip(new).enumerate() {
            self.compare_schemas(old, new, &loc.child(&index.to_string()), direction);
        }
    }
}
