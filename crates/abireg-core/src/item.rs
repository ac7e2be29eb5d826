//! ABI item model: the tagged members of a contract interface.
//!
//! Items use the wire shape of compiler-emitted ABI JSON (`type`,
//! `stateMutability`, `internalType`). The snake_case spellings and a `kind`
//! discriminator are accepted on input.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The member kind of an ABI item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Function,
    Constructor,
    Receive,
    Fallback,
    Event,
    Error,
}

impl ItemKind {
    /// All variants, in declaration order.
    pub const ALL: [ItemKind; 6] = [
        ItemKind::Function,
        ItemKind::Constructor,
        ItemKind::Receive,
        ItemKind::Fallback,
        ItemKind::Event,
        ItemKind::Error,
    ];

    /// Wire label of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Function => "function",
            ItemKind::Constructor => "constructor",
            ItemKind::Receive => "receive",
            ItemKind::Fallback => "fallback",
            ItemKind::Event => "event",
            ItemKind::Error => "error",
        }
    }

    /// Position of this kind in the canonical ordering.
    pub fn rank(&self) -> u8 {
        match self {
            ItemKind::Constructor => 0,
            ItemKind::Receive => 1,
            ItemKind::Fallback => 2,
            ItemKind::Function => 3,
            ItemKind::Event => 4,
            ItemKind::Error => 5,
        }
    }

    /// Whether items of this kind must carry a name.
    pub fn requires_name(&self) -> bool {
        matches!(self, ItemKind::Function | ItemKind::Event | ItemKind::Error)
    }

    /// Whether at most one item of this kind may appear in an ABI.
    pub fn is_singleton(&self) -> bool {
        matches!(
            self,
            ItemKind::Constructor | ItemKind::Receive | ItemKind::Fallback
        )
    }

    /// Whether items of this kind carry a state mutability.
    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            ItemKind::Function | ItemKind::Constructor | ItemKind::Receive | ItemKind::Fallback
        )
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "function" => Ok(ItemKind::Function),
            "constructor" => Ok(ItemKind::Constructor),
            "receive" => Ok(ItemKind::Receive),
            "fallback" => Ok(ItemKind::Fallback),
            "event" => Ok(ItemKind::Event),
            "error" => Ok(ItemKind::Error),
            other => Err(format!("unknown ABI item type '{other}'")),
        }
    }
}

/// Declared state mutability of a callable member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateMutability {
    Pure,
    View,
    Nonpayable,
    Payable,
}

impl StateMutability {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateMutability::Pure => "pure",
            StateMutability::View => "view",
            StateMutability::Nonpayable => "nonpayable",
            StateMutability::Payable => "payable",
        }
    }

    /// Derive mutability from the pre-0.4.16 `constant`/`payable` flags.
    pub fn from_legacy(constant: Option<bool>, payable: Option<bool>) -> Self {
        if constant == Some(true) {
            StateMutability::View
        } else if payable == Some(true) {
            StateMutability::Payable
        } else {
            StateMutability::Nonpayable
        }
    }
}

impl fmt::Display for StateMutability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StateMutability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pure" => Ok(StateMutability::Pure),
            "view" => Ok(StateMutability::View),
            "nonpayable" => Ok(StateMutability::Nonpayable),
            "payable" => Ok(StateMutability::Payable),
            other => Err(format!("unknown state mutability '{other}'")),
        }
    }
}

/// An input, output, event field or tuple component.
///
/// Field order here is the canonical serialization order. The derived
/// ordering (name first) is the canonical parameter order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(
        default,
        rename = "internalType",
        alias = "internal_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub internal_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Parameter>,
}

impl Parameter {
    /// A plain parameter with a name and a type.
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Parameter {
            name: name.into(),
            ty: ty.into(),
            internal_type: None,
            indexed: None,
            components: Vec::new(),
        }
    }

    /// Mark this parameter as an indexed event topic.
    pub fn indexed(mut self) -> Self {
        self.indexed = Some(true);
        self
    }

    /// Attach tuple components.
    pub fn with_components(mut self, components: Vec<Parameter>) -> Self {
        self.components = components;
        self
    }
}

/// One member of a contract interface.
///
/// Field order here is the canonical serialization order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AbiItem {
    #[serde(rename = "type", alias = "kind")]
    pub kind: ItemKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub inputs: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<Parameter>,
    #[serde(
        default,
        rename = "stateMutability",
        alias = "state_mutability",
        skip_serializing_if = "Option::is_none"
    )]
    pub state_mutability: Option<StateMutability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anonymous: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constant: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payable: Option<bool>,
}

impl AbiItem {
    /// An empty item of the given kind.
    pub fn new(kind: ItemKind) -> Self {
        AbiItem {
            kind,
            name: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            state_mutability: None,
            anonymous: None,
            constant: None,
            payable: None,
        }
    }

    /// A named function with the given inputs.
    pub fn function(name: impl Into<String>, inputs: Vec<Parameter>) -> Self {
        AbiItem {
            name: Some(name.into()),
            inputs,
            ..AbiItem::new(ItemKind::Function)
        }
    }

    /// A named event with the given fields.
    pub fn event(name: impl Into<String>, inputs: Vec<Parameter>) -> Self {
        AbiItem {
            name: Some(name.into()),
            inputs,
            ..AbiItem::new(ItemKind::Event)
        }
    }

    /// A named custom error with the given fields.
    pub fn error(name: impl Into<String>, inputs: Vec<Parameter>) -> Self {
        AbiItem {
            name: Some(name.into()),
            inputs,
            ..AbiItem::new(ItemKind::Error)
        }
    }

    /// A constructor with the given inputs.
    pub fn constructor(inputs: Vec<Parameter>) -> Self {
        AbiItem {
            inputs,
            ..AbiItem::new(ItemKind::Constructor)
        }
    }

    pub fn with_outputs(mut self, outputs: Vec<Parameter>) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_mutability(mut self, mutability: StateMutability) -> Self {
        self.state_mutability = Some(mutability);
        self
    }

    /// The item name, or the empty string for unnamed members.
    pub fn name_or_empty(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}

/// The item list inside an ABI document.
///
/// Accepts a bare item array or a compiler artifact carrying it under `abi`;
/// anything else is returned unchanged for the validator to reject.
pub fn abi_section(document: &serde_json::Value) -> &serde_json::Value {
    match document.get("abi") {
        Some(abi) if document.is_object() => abi,
        _ => document,
    }
}
