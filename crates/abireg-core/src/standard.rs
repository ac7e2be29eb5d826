//! Token standard classification by required-signature bundles.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::canonical::diff_key;
use crate::item::{AbiItem, ItemKind};

/// A known interface standard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Standard {
    /// Fungible token.
    #[serde(rename = "ERC20")]
    Erc20,
    /// Non-fungible token.
    #[serde(rename = "ERC721")]
    Erc721,
    /// Multi-token.
    #[serde(rename = "ERC1155")]
    Erc1155,
}

const ERC20_FUNCTIONS: &[&str] = &[
    "totalSupply()",
    "balanceOf(address)",
    "transfer(address,uint256)",
    "transferFrom(address,address,uint256)",
    "approve(address,uint256)",
    "allowance(address,address)",
];

const ERC20_EVENTS: &[&str] = &[
    "Transfer(address,address,uint256)",
    "Approval(address,address,uint256)",
];

const ERC721_FUNCTIONS: &[&str] = &[
    "balanceOf(address)",
    "ownerOf(uint256)",
    "safeTransferFrom(address,address,uint256)",
    "safeTransferFrom(address,address,uint256,bytes)",
    "transferFrom(address,address,uint256)",
    "approve(address,uint256)",
    "setApprovalForAll(address,bool)",
    "getApproved(uint256)",
    "isApprovedForAll(address,address)",
];

const ERC721_EVENTS: &[&str] = &[
    "Transfer(address,address,uint256)",
    "Approval(address,address,uint256)",
    "ApprovalForAll(address,address,bool)",
];

const ERC1155_FUNCTIONS: &[&str] = &[
    "balanceOf(address,uint256)",
    "balanceOfBatch(address[],uint256[])",
    "setApprovalForAll(address,bool)",
    "isApprovedForAll(address,address)",
    "safeTransferFrom(address,address,uint256,uint256,bytes)",
    "safeBatchTransferFrom(address,address,uint256[],uint256[],bytes)",
];

const ERC1155_EVENTS: &[&str] = &[
    "TransferSingle(address,address,address,uint256,uint256)",
    "TransferBatch(address,address,address,uint256[],uint256[])",
    "ApprovalForAll(address,address,bool)",
    "URI(string,uint256)",
];

impl Standard {
    /// Detection priority order.
    pub const ALL: [Standard; 3] = [Standard::Erc20, Standard::Erc721, Standard::Erc1155];

    pub fn label(&self) -> &'static str {
        match self {
            Standard::Erc20 => "ERC20",
            Standard::Erc721 => "ERC721",
            Standard::Erc1155 => "ERC1155",
        }
    }

    /// Required function signatures, `name(types)`.
    pub fn required_functions(&self) -> &'static [&'static str] {
        match self {
            Standard::Erc20 => ERC20_FUNCTIONS,
            Standard::Erc721 => ERC721_FUNCTIONS,
            Standard::Erc1155 => ERC1155_FUNCTIONS,
        }
    }

    /// Required event signatures, `name(types)`.
    pub fn required_events(&self) -> &'static [&'static str] {
        match self {
            Standard::Erc20 => ERC20_EVENTS,
            Standard::Erc721 => ERC721_EVENTS,
            Standard::Erc1155 => ERC1155_EVENTS,
        }
    }

    /// Required members as diff keys, functions first.
    pub fn required_keys(&self) -> impl Iterator<Item = (ItemKind, String)> {
        let functions = self
            .required_functions()
            .iter()
            .map(|sig| (ItemKind::Function, format!("{}:{sig}", ItemKind::Function)));
        let events = self
            .required_events()
            .iter()
            .map(|sig| (ItemKind::Event, format!("{}:{sig}", ItemKind::Event)));
        functions.chain(events)
    }
}

impl fmt::Display for Standard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Standard {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_uppercase();
        match compact.as_str() {
            "ERC20" => Ok(Standard::Erc20),
            "ERC721" => Ok(Standard::Erc721),
            "ERC1155" => Ok(Standard::Erc1155),
            _ => Err(format!("unknown standard '{s}'")),
        }
    }
}

fn present_keys(items: &[AbiItem]) -> HashSet<String> {
    items
        .iter()
        .filter(|item| matches!(item.kind, ItemKind::Function | ItemKind::Event))
        .map(diff_key)
        .collect()
}

/// Required members of `standard` that `items` lacks, as diff keys.
pub fn missing_members(items: &[AbiItem], standard: Standard) -> Vec<(ItemKind, String)> {
    let present = present_keys(items);
    standard
        .required_keys()
        .filter(|(_, key)| !present.contains(key))
        .collect()
}

/// Whether `items` provides every member `standard` requires.
pub fn satisfies(items: &[AbiItem], standard: Standard) -> bool {
    let present = present_keys(items);
    standard.required_keys().all(|(_, key)| present.contains(&key))
}

/// Classify an ABI as the first standard whose bundle it fully contains.
pub fn detect(items: &[AbiItem]) -> Option<Standard> {
    let present = present_keys(items);
    Standard::ALL.into_iter().find(|standard| {
        standard
            .required_keys()
            .all(|(_, key)| present.contains(&key))
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::item::{AbiItem, Parameter};

    fn params(types: &[&str]) -> Vec<Parameter> {
        types
            .iter()
            .enumerate()
            .map(|(i, ty)| Parameter::new(format!("arg{i}"), *ty))
            .collect()
    }

    /// Build items from `name(type,type)` signatures.
    pub fn from_signatures(functions: &[&str], events: &[&str]) -> Vec<AbiItem> {
        let split = |sig: &str| -> (String, Vec<Parameter>) {
            let (name, rest) = sig.split_once('(').unwrap();
            let types: Vec<&str> = rest
                .trim_end_matches(')')
                .split(',')
                .filter(|t| !t.is_empty())
                .collect();
            (name.to_string(), params(&types))
        };
        let mut items = Vec::new();
        for sig in functions {
            let (name, inputs) = split(sig);
            items.push(AbiItem::function(name, inputs));
        }
        for sig in events {
            let (name, inputs) = split(sig);
            items.push(AbiItem::event(name, inputs));
        }
        items
    }

    pub fn erc20() -> Vec<AbiItem> {
        from_signatures(super::ERC20_FUNCTIONS, super::ERC20_EVENTS)
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::item::Parameter;

    #[test]
    fn detects_minimal_erc20() {
        assert_eq!(detect(&erc20()), Some(Standard::Erc20));
    }

    #[test]
    fn missing_function_disqualifies() {
        let mut items = erc20();
        items.retain(|i| i.name.as_deref() != Some("allowance"));
        assert_eq!(detect(&items), None);
        assert_eq!(
            missing_members(&items, Standard::Erc20),
            vec![(
                ItemKind::Function,
                "function:allowance(address,address)".to_string()
            )]
        );
    }

    #[test]
    fn extra_members_do_not_disqualify() {
        let mut items = erc20();
        items.push(AbiItem::function("mint", vec![Parameter::new("to", "address")]));
        items.push(AbiItem::event("Paused", vec![]));
        assert_eq!(detect(&items), Some(Standard::Erc20));
    }

    #[test]
    fn detects_erc721_and_erc1155() {
        let nft = from_signatures(ERC721_FUNCTIONS, ERC721_EVENTS);
        assert_eq!(detect(&nft), Some(Standard::Erc721));
        assert!(!satisfies(&nft, Standard::Erc20));

        let multi = from_signatures(ERC1155_FUNCTIONS, ERC1155_EVENTS);
        assert_eq!(detect(&multi), Some(Standard::Erc1155));
    }

    #[test]
    fn event_must_be_an_event() {
        // Transfer declared as a function does not satisfy the event requirement.
        let mut items = erc20();
        for item in items.iter_mut() {
            if item.name.as_deref() == Some("Transfer") {
                item.kind = ItemKind::Function;
            }
        }
        assert_eq!(detect(&items), None);
    }

    #[test]
    fn labels_parse() {
        assert_eq!("erc20".parse::<Standard>().unwrap(), Standard::Erc20);
        assert_eq!("ERC-721".parse::<Standard>().unwrap(), Standard::Erc721);
        assert_eq!("Erc_1155".parse::<Standard>().unwrap(), Standard::Erc1155);
        assert!("ERC777".parse::<Standard>().is_err());
        assert_eq!(
            serde_json::to_string(&Standard::Erc1155).unwrap(),
            "\"ERC1155\""
        );
    }
}
