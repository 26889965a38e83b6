//! Deep merge of decoded configuration trees.
//!
//! Later sources win at leaf granularity while mapping keys from different
//! sources are unioned. Sequences are replaced entirely, not concatenated.

use super::value::ValueTree;

/// Deep merge two trees, with `overlay` taking precedence over `base`.
///
/// - Mappings are merged recursively: keys in overlay override keys in base
/// - Sequences and scalars are replaced entirely
/// - If overlay is `Null`, the base value is preserved (null means "not specified")
/// - Differing kinds: overlay replaces base
pub fn deep_merge(base: ValueTree, overlay: ValueTree) -> ValueTree {
    match (base, overlay) {
        (ValueTree::Mapping(mut base_map), ValueTree::Mapping(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged_value = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged_value);
            }
            ValueTree::Mapping(base_map)
        }
        (base, ValueTree::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Merge trees in order, starting from an empty mapping.
///
/// Equivalent to folding `deep_merge` over the list.
pub fn merge(trees: impl IntoIterator<Item = ValueTree>) -> ValueTree {
    trees.into_iter().fold(ValueTree::empty(), deep_merge)
}
