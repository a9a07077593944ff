// Copyright (c) 2025 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions.
// For more details, see the LICENSE, LICENSE.additional, and CONTRIBUTING files.

use std::hash::Hash;

use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxBuildHasher;

/// An insertion-ordered set which merges structurally equal items,
/// `insert` keeps the first occurrence and its position.
pub type DedupSet<T> = IndexSet<T, FxBuildHasher>;

/// An insertion-ordered map keyed by structurally equal patterns.
///
/// Note that `IndexMap::insert` replaces the value of an existing key,
/// use `collect_first` where the earlier entry must be kept.
pub type DedupMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Collects entries in order, an entry whose key is already present is
/// dropped, so the iteration order reflects the priority of the entries.
pub fn collect_first<K, V, I>(entries: I) -> DedupMap<K, V>
where
    K: Eq + Hash,
    I: IntoIterator<Item = (K, V)>,
{
    let mut map = DedupMap::default();
    for (key, value) in entries {
        map.entry(key).or_insert(value);
    }
    map
}
