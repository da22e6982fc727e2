//! Reference resolution against a document's `components`, and the
//! visited-pair guard that keeps recursive schema comparison finite.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::error::ResolveError;
use crate::model::{
    Components, Document, Header, Parameter, PathItem, RefOr, RequestBody, Response, Schema,
};
use crate::record::Pointer;
use crate::types::Direction;

/// A node kind that can be stored in, and referenced from, `components`.
pub trait Component: Sized {
    /// Section name under `#/components/`.
    const SECTION: &'static str;
    /// Description used in structural mismatch messages.
    const KIND: &'static str;

    fn registry(components: &Components) -> &IndexMap<String, RefOr<Self>>;
}

impl Component for Schema {
    const SECTION: &'static str = "schemas";
    const KIND: &'static str = "schema";

    fn registry(components: &Components) -> &IndexMap<String, RefOr<Self>> {
        &components.schemas
    }
}

impl Component for Parameter {
    const SECTION: &'static str = "parameters";
    const KIND: &'static str = "parameter";

    fn registry(components: &Components) -> &IndexMap<String, RefOr<Self>> {
        &components.parameters
    }
}

impl Component for Response {
    const SECTION: &'static str = "responses";
    const KIND: &'static str = "response";

    fn registry(components: &Components) -> &IndexMap<String, RefOr<Self>> {
        &components.responses
    }
}

impl Component for RequestBody {
    const SECTION: &'static str = "requestBodies";
    const KIND: &'static str = "request body";

    fn registry(components: &Components) -> &IndexMap<String, RefOr<Self>> {
        &components.request_bodies
    }
}

impl Component for Header {
    const SECTION: &'static str = "headers";
    const KIND: &'static str = "header";

    fn registry(components: &Components) -> &IndexMap<String, RefOr<Self>> {
        &components.headers
    }
}

impl Component for PathItem {
    const SECTION: &'static str = "pathItems";
    const KIND: &'static str = "path item";

    fn registry(components: &Components) -> &IndexMap<String, RefOr<Self>> {
        &components.path_items
    }
}

/// A definition reached from a node, directly or through references.
#[derive(Debug)]
pub struct Resolved<'a, T> {
    pub item: &'a T,
    /// Name of the component the definition lives in, if a reference was followed.
    pub name: Option<&'a str>,
}

impl<'a, T: Component> Resolved<'a, T> {
    /// Where the definition lives: the component entry when a reference was
    /// followed, otherwise `inline`.
    pub fn pointer(&self, inline: &Pointer) -> Pointer {
        match self.name {
            Some(name) => Pointer::root()
                .child("components")
                .child(T::SECTION)
                .child(name),
            None => inline.clone(),
        }
    }
}

/// Split `#/components/<section>/<name>` into its parts.
///
/// Returns `None` for anything that isn't a local components reference.
pub fn parse_reference(reference: &str) -> Option<(String, String)> {
    let path = reference.strip_prefix("#/components/")?;
    let mut parts = path.split('/');
    let section = parts.next()?;
    let name = parts.next()?;
    if parts.next().is_some() || name.is_empty() {
        return None;
    }
    Some((unescape(section), unescape(name)))
}

/// Undo JSON Pointer escaping (`~1` = `/`, `~0` = `~`).
fn unescape(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Resolve a node to its definition, following chains of references.
///
/// # Errors
///
/// Returns `ResolveError` when the node is malformed, points outside the
/// document's components, points into the wrong section, names a missing
/// component, or loops through references without reaching a definition.
pub fn resolve<'a, T: Component>(
    document: &'a Document,
    node: &'a RefOr<T>,
) -> Result<Resolved<'a, T>, ResolveError> {
    let mut current = node;
    let mut name: Option<&'a str> = None;
    let mut seen: Vec<&'a str> = Vec::new();

    loop {
        match current {
            RefOr::Item(item) => return Ok(Resolved { item, name }),
            RefOr::Malformed(m) => {
                return Err(ResolveError::StructuralMismatch {
                    expected: m.expected,
                    found: m.found.clone(),
                })
            }
            RefOr::Ref(reference) => {
                let raw = reference.reference.as_str();
                let Some((section, target)) = parse_reference(raw) else {
                    return Err(ResolveError::ExternalReference {
                        reference: raw.to_string(),
                    });
                };
                if section != T::SECTION {
                    return Err(ResolveError::StructuralMismatch {
                        expected: T::KIND,
                        found: format!("reference into components/{}", section),
                    });
                }
                let Some((key, next)) = T::registry(&document.components).get_key_value(&target)
                else {
                    return Err(ResolveError::DanglingReference {
                        reference: raw.to_string(),
                    });
                };
                if seen.contains(&key.as_str()) {
                    return Err(ResolveError::CircularReference {
                        reference: raw.to_string(),
                    });
                }
                seen.push(key.as_str());
                name = Some(key.as_str());
                current = next;
            }
        }
    }
}

/// Reference pairs entered on the current recursion path, and pairs whose
/// comparison already finished.
///
/// Keyed by the component names on each side (`None` for an inline node).
/// Re-entering a pair that is already on the path means the comparison has
/// come full circle; the pair is treated as equal and the walk stops there.
/// A pair of named components compared to completion in one direction is
/// not compared again in that direction: its records point into
/// `components` and would be identical.
#[derive(Debug, Default)]
pub struct VisitedPairs {
    active: HashSet<(Option<String>, Option<String>)>,
    completed: HashSet<(String, String, Direction)>,
    entered: usize,
}

impl VisitedPairs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a pair as entered. Returns `false` if it is already on the path.
    pub fn enter(&mut self, old: Option<&str>, new: Option<&str>) -> bool {
        let inserted = self
            .active
            .insert((old.map(String::from), new.map(String::from)));
        if inserted {
            self.entered += 1;
        }
        inserted
    }

    pub fn leave(&mut self, old: Option<&str>, new: Option<&str>) {
        self.active
            .remove(&(old.map(String::from), new.map(String::from)));
    }

    /// Whether a pair of named components was already compared in `direction`.
    pub fn is_completed(&self, old: Option<&str>, new: Option<&str>, direction: Direction) -> bool {
        match (old, new) {
            (Some(old), Some(new)) => {
                self.completed
                    .contains(&(old.to_string(), new.to_string(), direction))
            }
            _ => false,
        }
    }

    /// Record a finished comparison. Pairs with an inline side are never
    /// recorded: the inline node differs per use site.
    pub fn complete(&mut self, old: Option<&str>, new: Option<&str>, direction: Direction) {
        if let (Some(old), Some(new)) = (old, new) {
            self.completed
                .insert((old.to_string(), new.to_string(), direction));
        }
    }

    /// Total number of successful `enter` calls.
    pub fn entered(&self) -> usize {
        self.entered
    }
}
