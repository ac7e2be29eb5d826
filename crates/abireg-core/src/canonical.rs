//! ABI canonicalization: a stable, comparable form of an item list.
//!
//! The canonical form is invariant under member order, parameter order,
//! surrounding whitespace and the legacy `constant`/`payable` encoding, and
//! changes whenever a member is added, removed, renamed or retyped.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::item::{AbiItem, ItemKind, Parameter, StateMutability};

/// A normalized, canonically ordered ABI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalAbi(Vec<AbiItem>);

impl CanonicalAbi {
    pub fn items(&self) -> &[AbiItem] {
        &self.0
    }

    pub fn into_items(self) -> Vec<AbiItem> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Deterministic compact JSON encoding, the input of the content hash.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.0).expect("ABI items always serialize")
    }
}

/// Normalize every item and sort into canonical order.
///
/// Order: kind rank, then name, then signature key; items that still tie
/// are ordered by their full normalized content.
pub fn normalize(items: &[AbiItem]) -> CanonicalAbi {
    let mut keyed: Vec<(String, AbiItem)> = items
        .iter()
        .map(|item| {
            let normalized = normalize_item(item);
            (diff_key(&normalized), normalized)
        })
        .collect();

    keyed.sort_by(|(key_a, a), (key_b, b)| {
        a.kind
            .rank()
            .cmp(&b.kind.rank())
            .then_with(|| a.name_or_empty().cmp(b.name_or_empty()))
            .then_with(|| key_a.cmp(key_b))
            .then_with(|| a.cmp(b))
    });

    CanonicalAbi(keyed.into_iter().map(|(_, item)| item).collect())
}

/// Normalize a single item without reordering its siblings.
pub fn normalize_item(item: &AbiItem) -> AbiItem {
    let kind = item.kind;
    let is_event = kind == ItemKind::Event;

    let state_mutability = if kind.is_callable() {
        Some(
            item.state_mutability
                .unwrap_or_else(|| StateMutability::from_legacy(item.constant, item.payable)),
        )
    } else {
        None
    };

    AbiItem {
        kind,
        name: trimmed(item.name.as_deref()),
        inputs: normalize_params(&item.inputs, is_event),
        outputs: if kind == ItemKind::Function {
            normalize_params(&item.outputs, false)
        } else {
            Vec::new()
        },
        state_mutability,
        anonymous: is_event.then_some(item.anonymous.unwrap_or(false)),
        constant: None,
        payable: None,
    }
}

/// Normalize and sort a parameter list. `event_inputs` keeps the
/// `indexed` flag, which is meaningless anywhere else.
pub fn normalize_params(params: &[Parameter], event_inputs: bool) -> Vec<Parameter> {
    let mut normalized: Vec<Parameter> = params
        .iter()
        .map(|param| Parameter {
            name: param.name.trim().to_string(),
            ty: param.ty.trim().to_string(),
            internal_type: trimmed(param.internal_type.as_deref()),
            indexed: event_inputs.then_some(param.indexed.unwrap_or(false)),
            components: normalize_params(&param.components, false),
        })
        .collect();
    normalized.sort();
    normalized
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Signature key used for duplicate detection and diffing.
///
/// Named members key on `kind:name(type,type,...)` in declared input order;
/// constructor, receive and fallback key on their kind alone.
pub fn diff_key(item: &AbiItem) -> String {
    match item.kind {
        ItemKind::Function | ItemKind::Event | ItemKind::Error => {
            let types: Vec<&str> = item.inputs.iter().map(|p| p.ty.trim()).collect();
            format!(
                "{}:{}({})",
                item.kind,
                item.name_or_empty().trim(),
                types.join(",")
            )
        }
        ItemKind::Constructor | ItemKind::Receive | ItemKind::Fallback => item.kind.to_string(),
    }
}

/// A member present on one side only, with the key it was declared under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyedItem {
    pub key: String,
    pub item: AbiItem,
}

/// A member present on both sides whose normalized content changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifiedItem {
    pub key: String,
    pub old: AbiItem,
    pub new: AbiItem,
}

/// Structural difference between two item lists, keyed by [`diff_key`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiDiff {
    pub added: Vec<KeyedItem>,
    pub removed: Vec<KeyedItem>,
    pub modified: Vec<ModifiedItem>,
}

impl AbiDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }
}

/// Insertion-ordered map from signature key to normalized item. Keys come
/// from the item as declared, so overloads differing only in parameter
/// order stay apart. A repeated key keeps its first position and takes the
/// later value.
struct KeyedItems {
    order: Vec<String>,
    by_key: HashMap<String, AbiItem>,
}

impl KeyedItems {
    fn build(items: &[AbiItem]) -> Self {
        let mut order = Vec::with_capacity(items.len());
        let mut by_key = HashMap::with_capacity(items.len());
        for item in items {
            let key = diff_key(item);
            if by_key.insert(key.clone(), normalize_item(item)).is_none() {
                order.push(key);
            }
        }
        KeyedItems { order, by_key }
    }

    fn iter(&self) -> impl Iterator<Item = (&String, &AbiItem)> {
        self.order.iter().map(|key| (key, &self.by_key[key]))
    }
}

/// Compute added, removed and modified members between two item lists.
///
/// `added` and `modified` follow the order of `new`; `removed` follows the
/// order of `old`.
pub fn diff(old: &[AbiItem], new: &[AbiItem]) -> AbiDiff {
    let old_map = KeyedItems::build(old);
    let new_map = KeyedItems::build(new);
    let mut result = AbiDiff::default();

    for (key, new_item) in new_map.iter() {
        match old_map.by_key.get(key) {
            None => result.added.push(KeyedItem {
                key: key.clone(),
                item: new_item.clone(),
            }),
            Some(old_item) if old_item != new_item => result.modified.push(ModifiedItem {
                key: key.clone(),
                old: old_item.clone(),
                new: new_item.clone(),
            }),
            Some(_) => {}
        }
    }

    for (key, old_item) in old_map.iter() {
        if !new_map.by_key.contains_key(key) {
            result.removed.push(KeyedItem {
                key: key.clone(),
                item: old_item.clone(),
            });
        }
    }

    result
}
