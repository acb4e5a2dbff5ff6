use fxhash::FxBuildHasher;

pub type Map<K, V> = hashbrown::HashMap<K, V, FxBuildHasher>;
pub type Set<T> = hashbrown::HashSet<T, FxBuildHasher>;

/// Returns the keys of `map` in ascending order.
///
/// Hash maps iterate in an unspecified order; callers that log, dump or pick
/// "the first" entry use this to stay deterministic.
pub fn sorted_keys<K: Ord + Clone, V>(map: &Map<K, V>) -> Vec<K> {
    let mut keys: Vec<K> = map.keys().cloned().collect();
    keys.sort_unstable();
    keys
}
