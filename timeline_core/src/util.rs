use std::collections::HashSet;
use std::hash::Hash;

/// De-duplicate a sequence while preserving first-appearance order.
pub fn unique_in_order<T>(items: impl IntoIterator<Item = T>) -> Vec<T>
where
    T: Clone + Eq + Hash,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        if seen.insert(item.clone()) {
            out.push(item);
        }
    }
    out
}
