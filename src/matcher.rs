//! Pairing of old and new elements by semantic key.

use std::hash::Hash;

use indexmap::IndexMap;

/// How one key relates across the two documents.
#[derive(Debug, Clone, PartialEq)]
pub enum Pairing<K, V> {
    Matched { key: K, old: V, new: V },
    Added { key: K, new: V },
    Removed { key: K, old: V },
}

/// Result of matching two keyed collections.
///
/// Pairings are stored in output order: the new document's declaration order
/// for matched and added keys, then the old document's order for removals.
#[derive(Debug, Clone)]
pub struct Partition<K, V> {
    pairings: Vec<Pairing<K, V>>,
}

impl<K, V> IntoIterator for Partition<K, V> {
    type Item = Pairing<K, V>;
    type IntoIter = std::vec::IntoIter<Pairing<K, V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairings.into_iter()
    }
}

/// Partition two keyed sequences into matched, added and removed elements.
///
/// Duplicate keys within one side keep the position of the first occurrence
/// and the value of the last.
pub fn partition<K, V>(
    old: impl IntoIterator<Item = (K, V)>,
    new: impl IntoIterator<Item = (K, V)>,
) -> Partition<K, V>
where
    K: Eq + Hash,
{
    let mut old: IndexMap<K, V> = old.into_iter().collect();
    let new: IndexMap<K, V> = new.into_iter().collect();

    let mut pairings = Vec::with_capacity(old.len().max(new.len()));
    for (key, new_value) in new {
        match old.shift_remove(&key) {
            Some(old_value) => pairings.push(Pairing::Matched {
                key,
                old: old_value,
                new: new_value,
            }),
            None => pairings.push(Pairing::Added {
                key,
                new: new_value,
            }),
        }
    }
    for (key, old_value) in old {
        pairings.push(Pairing::Removed {
            key,
            old: old_value,
        });
    }

    Partition { pairings }
}

/// Partition two `IndexMap`s on their keys.
pub fn partition_maps<'a, V>(
    old: &'a IndexMap<String, V>,
    new: &'a IndexMap<String, V>,
) -> Partition<&'a str, &'a V> {
    partition(
        old.iter().map(|(k, v)| (k.as_str(), v)),
        new.iter().map(|(k, v)| (k.as_str(), v)),
    )
}
