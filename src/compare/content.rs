//! Request bodies, responses, media types and response headers.

use indexmap::IndexMap;

use crate::matcher::{partition_maps, Pairing};
use crate::model::{Header, MediaType, RefOr, RequestBody, Response};
use crate::rules::{RuleContext, RuleId};
use crate::types::Direction;

use super::{Comparator, Loc, Side};

impl<'a> Comparator<'a> {
    pub(super) fn compare_request_bodies(
        &mut self,
        old: Option<&'a RefOr<RequestBody>>,
        new: Option<&'a RefOr<RequestBody>>,
        loc: &Loc,
        operation: &str,
    ) {
        match (old, new) {
            (None, None) => {}
            (None, Some(new)) => {
                if let Some(body) = self.resolve_one(Side::New, new, &loc.new) {
                    self.added(
                        RuleId::RequestBodyAdded,
                        RuleContext::requirement(body.item.required),
                        &loc.new,
                        &[operation],
                    );
                }
            }
            (Some(_), None) => {
                self.removed(
                    RuleId::RequestBodyRemoved,
                    RuleContext::default(),
                    &loc.old,
                    &[operation],
                );
            }
            (Some(old), Some(new)) => {
                let Some((old, new)) = self.resolve_pair(old, new, loc) else {
                    return;
                };
                let loc = loc.resolved(&old, &new);
                self.compare_flag(
                    old.item.required,
                    new.item.required,
                    (RuleId::RequestBodyBecameRequired, RuleId::RequestBodyBecameOptional),
                    RuleContext::default(),
                    &loc,
                    &[operation],
                );
                self.compare_media_types(
                    &old.item.content,
                    &new.item.content,
                    &loc.child("content"),
                    Direction::Request,
                );
            }
        }
    }

    pub(super) fn compare_media_types(
        &mut self,
        old: &'a IndexMap<String, MediaType>,
        new: &'a IndexMap<String, MediaType>,
        loc: &Loc,
        direction: Direction,
    ) {
        for pairing in partition_maps(old, new) {
            match pairing {
                Pairing::Matched { key, old, new } => {
                    self.compare_optional_schemas(
                        old.schema.as_ref(),
                        new.schema.as_ref(),
                        &loc.child(key).child("schema"),
                        direction,
                    );
                }
                Pairing::Added { key, .. } => {
                    self.added(
                        RuleId::MediaTypeAdded,
                        RuleContext::directional(direction),
                        &loc.new.child(key),
                        &[key],
                    );
                }
                Pairing::Removed { key, .. } => {
                    self.removed(
                        RuleId::MediaTypeRemoved,
                        RuleContext::directional(direction),
                        &loc.old.child(key),
                        &[key],
                    );
                }
            }
        }
    }

    pub(super) fn compare_responses(
        &mut self,
        old: &'a IndexMap<String, RefOr<Response>>,
        new: &'a IndexMap<String, RefOr<Response>>,
        loc: &Loc,
    ) {
        for pairing in partition_maps(old, new) {
            match pairing {
                Pairing::Matched { key, old, new } => {
                    let loc = loc.child(key);
                    let Some((old, new)) = self.resolve_pair(old, new, &loc) else {
                        continue;
                    };
                    let loc = loc.resolved(&old, &new);
                    self.compare_media_types(
                        &old.item.content,
                        &new.item.content,
                        &loc.child("content"),
                        Direction::Response,
                    );
                    self.compare_headers(&old.item.headers, &new.item.headers, &loc.child("headers"));
                }
                Pairing::Added { key, .. } => {
                    self.added(
                        RuleId::ResponseAdded,
                        RuleContext::default(),
                        &loc.new.child(key),
                        &[key],
                    );
                }
                Pairing::Removed { key, .. } => {
                    self.removed(
                        RuleId::ResponseRemoved,
                        RuleContext::default(),
                        &loc.old.child(key),
                        &[key],
                    );
                }
            }
        }
    }

    fn compare_headers(
        &mut self,
        old: &'a IndexMap<String, RefOr<Header>>,
        new: &'a IndexMap<String, RefOr<Header>>,
        loc: &Loc,
    ) {
        for pairing in partition_maps(old, new) {
            match pairing {
                Pairing::Matched { key, old, new } => {
                    let loc = loc.child(key);
                    let Some((old, new)) = self.resolve_pair(old, new, &loc) else {
                        continue;
                    };
                    let loc = loc.resolved(&old, &new);
                    self.compare_flag(
                        old.item.required,
                        new.item.required,
                        (
                            RuleId::ResponseHeaderBecameRequired,
                            RuleId::ResponseHeaderBecameOptional,
                        ),
                        RuleContext::default(),
                        &loc,
                        &[key],
                    );
                    self.compare_deprecated(old.item.deprecated, new.item.deprecated, &loc, key);
                    self.compare_optional_schemas(
                        old.item.schema.as_ref(),
                        new.item.schema.as_ref(),
                        &loc.child("schema"),
                        Direction::Response,
                    );
                }
                Pairing::Added { key, .. } => {
                    self.added(
                        RuleId::ResponseHeaderAdded,
                        RuleContext::default(),
                        &loc.new.child(key),
                        &[key],
                    );
                }
                Pairing::Removed { key, old } => {
                    let pointer = loc.old.child(key);
                    if let Some(header) = self.resolve_one(Side::Old, old, &pointer) {
                        self.removed(
                            RuleId::ResponseHeaderRemoved,
                            RuleContext::requirement(header.item.required),
                            &pointer,
                            &[key],
                        );
                    }
                }
            }
        }
    }
}
