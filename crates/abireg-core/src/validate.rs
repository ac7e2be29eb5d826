//! ABI validation: structural shape checks and business rules.
//!
//! Every check appends to a shared error list so a single submission reports
//! all of its problems at once. Structural errors stop validation before
//! business rules run, since the rules need typed items.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::canonical::diff_key;
use crate::item::{AbiItem, ItemKind, Parameter, StateMutability};
use crate::standard::{missing_members, Standard};

/// Machine-readable validation error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidAbi,
    InvalidItem,
    MissingItemType,
    UnknownItemType,
    MissingName,
    InvalidField,
    InvalidStateMutability,
    MissingParameterType,
    DuplicateFunctionSignature,
    DuplicateEventSignature,
    MultipleConstructors,
    MultipleReceive,
    MultipleFallback,
    EmptyParameterName,
    #[serde(rename = "MISSING_ERC20_FUNCTION")]
    MissingErc20Function,
    #[serde(rename = "MISSING_ERC20_EVENT")]
    MissingErc20Event,
    #[serde(rename = "MISSING_ERC721_FUNCTION")]
    MissingErc721Function,
    #[serde(rename = "MISSING_ERC721_EVENT")]
    MissingErc721Event,
    #[serde(rename = "MISSING_ERC1155_FUNCTION")]
    MissingErc1155Function,
    #[serde(rename = "MISSING_ERC1155_EVENT")]
    MissingErc1155Event,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidAbi => "INVALID_ABI",
            ErrorCode::InvalidItem => "INVALID_ITEM",
            ErrorCode::MissingItemType => "MISSING_ITEM_TYPE",
            ErrorCode::UnknownItemType => "UNKNOWN_ITEM_TYPE",
            ErrorCode::MissingName => "MISSING_NAME",
            ErrorCode::InvalidField => "INVALID_FIELD",
            ErrorCode::InvalidStateMutability => "INVALID_STATE_MUTABILITY",
            ErrorCode::MissingParameterType => "MISSING_PARAMETER_TYPE",
            ErrorCode::DuplicateFunctionSignature => "DUPLICATE_FUNCTION_SIGNATURE",
            ErrorCode::DuplicateEventSignature => "DUPLICATE_EVENT_SIGNATURE",
            ErrorCode::MultipleConstructors => "MULTIPLE_CONSTRUCTORS",
            ErrorCode::MultipleReceive => "MULTIPLE_RECEIVE",
            ErrorCode::MultipleFallback => "MULTIPLE_FALLBACK",
            ErrorCode::EmptyParameterName => "EMPTY_PARAMETER_NAME",
            ErrorCode::MissingErc20Function => "MISSING_ERC20_FUNCTION",
            ErrorCode::MissingErc20Event => "MISSING_ERC20_EVENT",
            ErrorCode::MissingErc721Function => "MISSING_ERC721_FUNCTION",
            ErrorCode::MissingErc721Event => "MISSING_ERC721_EVENT",
            ErrorCode::MissingErc1155Function => "MISSING_ERC1155_FUNCTION",
            ErrorCode::MissingErc1155Event => "MISSING_ERC1155_EVENT",
        }
    }

    fn missing_member(standard: Standard, kind: ItemKind) -> Self {
        match (standard, kind == ItemKind::Event) {
            (Standard::Erc20, false) => ErrorCode::MissingErc20Function,
            (Standard::Erc20, true) => ErrorCode::MissingErc20Event,
            (Standard::Erc721, false) => ErrorCode::MissingErc721Function,
            (Standard::Erc721, true) => ErrorCode::MissingErc721Event,
            (Standard::Erc1155, false) => ErrorCode::MissingErc1155Function,
            (Standard::Erc1155, true) => ErrorCode::MissingErc1155Event,
        }
    }

    fn duplicate_singleton(kind: ItemKind) -> Option<Self> {
        match kind {
            ItemKind::Constructor => Some(ErrorCode::MultipleConstructors),
            ItemKind::Receive => Some(ErrorCode::MultipleReceive),
            ItemKind::Fallback => Some(ErrorCode::MultipleFallback),
            ItemKind::Function | ItemKind::Event | ItemKind::Error => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One validation finding, located by a JSON-path-like field name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    pub code: ErrorCode,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>, code: ErrorCode) -> Self {
        FieldError {
            field: field.into(),
            message: message.into(),
            code,
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field.is_empty() {
            write!(f, "{} [{}]", self.message, self.code)
        } else {
            write!(f, "{}: {} [{}]", self.field, self.message, self.code)
        }
    }
}

/// All findings of a failed validation. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("ABI validation failed with {} error(s)", .0.len())]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    pub fn has_code(&self, code: ErrorCode) -> bool {
        self.0.iter().any(|e| e.code == code)
    }

    fn single(field: &str, message: impl Into<String>, code: ErrorCode) -> Self {
        ValidationErrors(vec![FieldError::new(field, message, code)])
    }

    fn check(errors: Vec<FieldError>) -> Result<(), Self> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors(errors))
        }
    }
}

/// Toggles for the business rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationRules {
    /// Reject parameters with an empty name at any depth. Compiler output
    /// routinely leaves return values unnamed, so this is stricter than
    /// most real ABIs.
    pub require_parameter_names: bool,
}

impl Default for ValidationRules {
    fn default() -> Self {
        ValidationRules {
            require_parameter_names: true,
        }
    }
}

/// ABI validator.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbiValidator {
    rules: ValidationRules,
}

impl AbiValidator {
    pub fn new(rules: ValidationRules) -> Self {
        AbiValidator { rules }
    }

    pub fn rules(&self) -> ValidationRules {
        self.rules
    }

    /// Check that `raw` has the shape of an ABI item list and return the
    /// typed items.
    pub fn validate_structure(&self, raw: &Value) -> Result<Vec<AbiItem>, ValidationErrors> {
        let Some(elements) = raw.as_array() else {
            return Err(ValidationErrors::single(
                "",
                "ABI must be a JSON array of items",
                ErrorCode::InvalidAbi,
            ));
        };

        let mut errors = Vec::new();
        for (index, element) in elements.iter().enumerate() {
            check_item(element, &format!("[{index}]"), &mut errors);
        }
        ValidationErrors::check(errors)?;

        serde_json::from_value(raw.clone())
            .map_err(|e| ValidationErrors::single("", e.to_string(), ErrorCode::InvalidAbi))
    }

    /// Structural validation followed by every business rule.
    pub fn validate_business_rules(&self, raw: &Value) -> Result<Vec<AbiItem>, ValidationErrors> {
        let items = self.validate_structure(raw)?;
        self.validate_items(&items)?;
        Ok(items)
    }

    /// Business rules over already typed items.
    pub fn validate_items(&self, items: &[AbiItem]) -> Result<(), ValidationErrors> {
        let mut errors = Vec::new();
        check_duplicate_signatures(items, &mut errors);
        check_singletons(items, &mut errors);
        if self.rules.require_parameter_names {
            check_parameter_names(items, &mut errors);
        }
        ValidationErrors::check(errors)
    }

    /// Check that `items` provides every member `standard` requires.
    pub fn validate_standard(
        &self,
        items: &[AbiItem],
        standard: Standard,
    ) -> Result<(), ValidationErrors> {
        let errors = missing_members(items, standard)
            .into_iter()
            .map(|(kind, key)| {
                let signature = key.split_once(':').map_or(key.as_str(), |(_, sig)| sig);
                FieldError::new(
                    "abi",
                    format!("missing {standard} {kind} {signature}"),
                    ErrorCode::missing_member(standard, kind),
                )
            })
            .collect();
        ValidationErrors::check(errors)
    }
}

/// Structural validation with the default rules.
pub fn validate_structure(raw: &Value) -> Result<Vec<AbiItem>, ValidationErrors> {
    AbiValidator::default().validate_structure(raw)
}

/// Structural and business-rule validation with the default rules.
pub fn validate_business_rules(raw: &Value) -> Result<Vec<AbiItem>, ValidationErrors> {
    AbiValidator::default().validate_business_rules(raw)
}

/// Standard membership validation.
pub fn validate_standard(items: &[AbiItem], standard: Standard) -> Result<(), ValidationErrors> {
    AbiValidator::default().validate_standard(items, standard)
}

// --- structural checks ---

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn expect_optional(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
    wanted: &str,
    accepts: fn(&Value) -> bool,
    errors: &mut Vec<FieldError>,
) {
    if let Some(value) = obj.get(key) {
        if !value.is_null() && !accepts(value) {
            errors.push(FieldError::new(
                format!("{path}.{key}"),
                format!("must be {wanted}, found {}", describe(value)),
                ErrorCode::InvalidField,
            ));
        }
    }
}

fn check_item(element: &Value, path: &str, errors: &mut Vec<FieldError>) {
    let Some(obj) = element.as_object() else {
        errors.push(FieldError::new(
            path,
            format!("ABI item must be an object, found {}", describe(element)),
            ErrorCode::InvalidItem,
        ));
        return;
    };

    let kind = check_discriminator(obj, path, errors);

    match obj.get("name") {
        Some(Value::String(name)) if !name.trim().is_empty() => {}
        Some(Value::String(_)) | Some(Value::Null) | None => {
            if let Some(kind) = kind.filter(ItemKind::requires_name) {
                errors.push(FieldError::new(
                    format!("{path}.name"),
                    format!("{kind} requires a non-empty name"),
                    ErrorCode::MissingName,
                ));
            }
        }
        Some(other) => errors.push(FieldError::new(
            format!("{path}.name"),
            format!("must be a string, found {}", describe(other)),
            ErrorCode::InvalidField,
        )),
    }

    for key in ["inputs", "outputs"] {
        check_parameter_list(obj, key, path, errors);
    }

    for key in ["stateMutability", "state_mutability"] {
        match obj.get(key) {
            None | Some(Value::Null) => {}
            Some(Value::String(s)) if s.parse::<StateMutability>().is_ok() => {}
            Some(other) => errors.push(FieldError::new(
                format!("{path}.{key}"),
                format!(
                    "must be one of pure, view, nonpayable, payable; found {}",
                    other
                ),
                ErrorCode::InvalidStateMutability,
            )),
        }
    }

    for key in ["anonymous", "constant", "payable"] {
        expect_optional(obj, key, path, "a boolean", Value::is_boolean, errors);
    }
}

fn check_discriminator(
    obj: &Map<String, Value>,
    path: &str,
    errors: &mut Vec<FieldError>,
) -> Option<ItemKind> {
    let (key, value) = match (obj.get("type"), obj.get("kind")) {
        (Some(_), Some(_)) => {
            errors.push(FieldError::new(
                path,
                "item has both 'type' and 'kind'; use one discriminator",
                ErrorCode::InvalidItem,
            ));
            return None;
        }
        (Some(value), None) => ("type", value),
        (None, Some(value)) => ("kind", value),
        (None, None) => {
            errors.push(FieldError::new(
                format!("{path}.type"),
                "item type is required",
                ErrorCode::MissingItemType,
            ));
            return None;
        }
    };

    let Some(label) = value.as_str() else {
        errors.push(FieldError::new(
            format!("{path}.{key}"),
            format!("must be a string, found {}", describe(value)),
            ErrorCode::InvalidField,
        ));
        return None;
    };

    match label.parse::<ItemKind>() {
        Ok(kind) => Some(kind),
        Err(message) => {
            errors.push(FieldError::new(
                format!("{path}.{key}"),
                message,
                ErrorCode::UnknownItemType,
            ));
            None
        }
    }
}

fn check_parameter_list(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
    errors: &mut Vec<FieldError>,
) {
    let Some(value) = obj.get(key) else {
        return;
    };
    let list_path = format!("{path}.{key}");
    let Some(params) = value.as_array() else {
        errors.push(FieldError::new(
            list_path,
            format!("must be an array, found {}", describe(value)),
            ErrorCode::InvalidField,
        ));
        return;
    };
    for (index, param) in params.iter().enumerate() {
        check_parameter(param, &format!("{list_path}[{index}]"), errors);
    }
}

fn check_parameter(value: &Value, path: &str, errors: &mut Vec<FieldError>) {
    let Some(obj) = value.as_object() else {
        errors.push(FieldError::new(
            path,
            format!("parameter must be an object, found {}", describe(value)),
            ErrorCode::InvalidField,
        ));
        return;
    };

    match obj.get("type") {
        Some(Value::String(ty)) if !ty.trim().is_empty() => {}
        Some(Value::String(_)) | Some(Value::Null) | None => errors.push(FieldError::new(
            format!("{path}.type"),
            "parameter type is required",
            ErrorCode::MissingParameterType,
        )),
        Some(other) => errors.push(FieldError::new(
            format!("{path}.type"),
            format!("must be a string, found {}", describe(other)),
            ErrorCode::InvalidField,
        )),
    }

    if let Some(name) = obj.get("name") {
        if !name.is_string() {
            errors.push(FieldError::new(
                format!("{path}.name"),
                format!("must be a string, found {}", describe(name)),
                ErrorCode::InvalidField,
            ));
        }
    }
    for key in ["internalType", "internal_type"] {
        expect_optional(obj, key, path, "a string", Value::is_string, errors);
    }
    expect_optional(obj, "indexed", path, "a boolean", Value::is_boolean, errors);

    check_parameter_list(obj, "components", path, errors);
}

// --- business rules ---

fn check_duplicate_signatures(items: &[AbiItem], errors: &mut Vec<FieldError>) {
    let mut first_seen: HashMap<String, usize> = HashMap::new();
    for (index, item) in items.iter().enumerate() {
        let code = match item.kind {
            ItemKind::Function => ErrorCode::DuplicateFunctionSignature,
            ItemKind::Event => ErrorCode::DuplicateEventSignature,
            _ => continue,
        };
        let key = diff_key(item);
        if let Some(first) = first_seen.get(&key) {
            let signature = key.split_once(':').map_or(key.as_str(), |(_, sig)| sig);
            errors.push(FieldError::new(
                format!("[{index}].name"),
                format!(
                    "duplicate {} signature {signature} (first declared at [{first}])",
                    item.kind
                ),
                code,
            ));
        } else {
            first_seen.insert(key, index);
        }
    }
}

fn check_singletons(items: &[AbiItem], errors: &mut Vec<FieldError>) {
    let mut seen: HashMap<ItemKind, usize> = HashMap::new();
    for (index, item) in items.iter().enumerate() {
        let Some(code) = ErrorCode::duplicate_singleton(item.kind) else {
            continue;
        };
        let count = seen.entry(item.kind).or_insert(0);
        *count += 1;
        if *count > 1 {
            errors.push(FieldError::new(
                format!("[{index}].type"),
                format!("at most one {} is allowed", item.kind),
                code,
            ));
        }
    }
}

fn check_parameter_names(items: &[AbiItem], errors: &mut Vec<FieldError>) {
    for (index, item) in items.iter().enumerate() {
        check_named(&item.inputs, &format!("[{index}].inputs"), errors);
        check_named(&item.outputs, &format!("[{index}].outputs"), errors);
    }
}

fn check_named(params: &[Parameter], path: &str, errors: &mut Vec<FieldError>) {
    for (index, param) in params.iter().enumerate() {
        let param_path = format!("{path}[{index}]");
        if param.name.trim().is_empty() {
            errors.push(FieldError::new(
                format!("{param_path}.name"),
                "parameter name must not be empty",
                ErrorCode::EmptyParameterName,
            ));
        }
        check_named(
            &param.components,
            &format!("{param_path}.components"),
            errors,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::standard::fixtures;
    use serde_json::json;

    fn codes(err: &ValidationErrors) -> Vec<ErrorCode> {
        err.errors().iter().map(|e| e.code).collect()
    }

    #[test]
    fn accepts_well_formed_abi() {
        let raw = json!([
            {"type": "constructor", "inputs": [{"name": "supply", "type": "uint256"}]},
            {"type": "function", "name": "transfer",
             "inputs": [{"name": "to", "type": "address"}, {"name": "value", "type": "uint256"}],
             "outputs": [{"name": "ok", "type": "bool"}], "stateMutability": "nonpayable"},
            {"type": "event", "name": "Transfer", "anonymous": false,
             "inputs": [{"name": "from", "type": "address", "indexed": true}]},
            {"kind": "receive", "stateMutability": "payable"}
        ]);
        let items = validate_business_rules(&raw).unwrap();
        assert_eq!(items.len(), 4);
        assert_eq!(items[3].kind, ItemKind::Receive);
    }

    #[test]
    fn rejects_non_array() {
        let err = validate_structure(&json!({"abi": []})).unwrap_err();
        assert_eq!(codes(&err), vec![ErrorCode::InvalidAbi]);
    }

    #[test]
    fn reports_every_structural_problem() {
        let raw = json!([
            42,
            {"name": "noType"},
            {"type": "modifier", "name": "onlyOwner"},
            {"type": "function", "inputs": {}},
            {"type": "event", "name": "E", "inputs": [{"name": "x"}]},
            {"type": "function", "name": "f", "stateMutability": "mutable"}
        ]);
        let err = validate_structure(&raw).unwrap_err();
        let fields: Vec<&str> = err.errors().iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"[0]"));
        assert!(fields.contains(&"[1].type"));
        assert!(fields.contains(&"[2].type"));
        assert!(fields.contains(&"[3].name"));
        assert!(fields.contains(&"[3].inputs"));
        assert!(fields.contains(&"[4].inputs[0].type"));
        assert!(fields.contains(&"[5].stateMutability"));
        assert!(err.has_code(ErrorCode::UnknownItemType));
        assert!(err.has_code(ErrorCode::MissingItemType));
        assert!(err.has_code(ErrorCode::MissingName));
        assert!(err.has_code(ErrorCode::MissingParameterType));
        assert!(err.has_code(ErrorCode::InvalidStateMutability));
    }

    #[test]
    fn nested_components_must_be_arrays() {
        let raw = json!([
            {"type": "function", "name": "fill",
             "inputs": [{"name": "o", "type": "tuple", "components": "bad"}]}
        ]);
        let err = validate_structure(&raw).unwrap_err();
        assert_eq!(err.errors()[0].field, "[0].inputs[0].components");
    }

    #[test]
    fn duplicate_function_signature() {
        let raw = json!([
            {"type": "function", "name": "transfer",
             "inputs": [{"name": "to", "type": "address"}, {"name": "v", "type": "uint256"}]},
            {"type": "function", "name": "transfer",
             "inputs": [{"name": "dest", "type": "address"}, {"name": "amt", "type": "uint256"}]}
        ]);
        let err = validate_business_rules(&raw).unwrap_err();
        assert_eq!(codes(&err), vec![ErrorCode::DuplicateFunctionSignature]);
        assert_eq!(err.errors()[0].field, "[1].name");
    }

    #[test]
    fn overloads_are_not_duplicates() {
        let raw = json!([
            {"type": "function", "name": "mint", "inputs": [{"name": "to", "type": "address"}]},
            {"type": "function", "name": "mint",
             "inputs": [{"name": "to", "type": "address"}, {"name": "n", "type": "uint256"}]}
        ]);
        assert!(validate_business_rules(&raw).is_ok());
    }

    #[test]
    fn duplicate_event_signature() {
        let raw = json!([
            {"type": "event", "name": "Ping", "inputs": []},
            {"type": "event", "name": "Ping", "inputs": []}
        ]);
        let err = validate_business_rules(&raw).unwrap_err();
        assert_eq!(codes(&err), vec![ErrorCode::DuplicateEventSignature]);
    }

    #[test]
    fn collects_all_rule_violations() {
        let raw = json!([
            {"type": "constructor", "inputs": []},
            {"type": "constructor", "inputs": []},
            {"type": "receive"},
            {"type": "receive"},
            {"type": "fallback"},
            {"type": "fallback"},
            {"type": "function", "name": "f", "outputs": [{"name": "", "type": "uint256"}]}
        ]);
        let err = validate_business_rules(&raw).unwrap_err();
        assert_eq!(
            codes(&err),
            vec![
                ErrorCode::MultipleConstructors,
                ErrorCode::MultipleReceive,
                ErrorCode::MultipleFallback,
                ErrorCode::EmptyParameterName,
            ]
        );
    }

    #[test]
    fn empty_nested_parameter_name() {
        let raw = json!([
            {"type": "function", "name": "fill", "inputs": [
                {"name": "order", "type": "tuple", "components": [
                    {"name": "maker", "type": "address"},
                    {"name": " ", "type": "uint256"}
                ]}
            ]}
        ]);
        let err = validate_business_rules(&raw).unwrap_err();
        assert_eq!(err.errors()[0].field, "[0].inputs[0].components[1].name");
    }

    #[test]
    fn relaxed_rules_allow_unnamed_parameters() {
        let raw = json!([
            {"type": "function", "name": "f", "outputs": [{"type": "uint256"}]}
        ]);
        let relaxed = AbiValidator::new(ValidationRules {
            require_parameter_names: false,
        });
        assert!(relaxed.validate_business_rules(&raw).is_ok());
        assert!(AbiValidator::default().validate_business_rules(&raw).is_err());
    }

    #[test]
    fn standard_reports_each_missing_member() {
        let mut items = fixtures::erc20();
        items.retain(|i| {
            !matches!(i.name.as_deref(), Some("allowance") | Some("Approval"))
        });
        let err = validate_standard(&items, Standard::Erc20).unwrap_err();
        assert_eq!(
            codes(&err),
            vec![ErrorCode::MissingErc20Function, ErrorCode::MissingErc20Event]
        );
        assert!(err.errors()[0].message.contains("allowance(address,address)"));
        assert!(validate_standard(&fixtures::erc20(), Standard::Erc20).is_ok());
    }

    #[test]
    fn error_codes_serialize_screaming() {
        assert_eq!(
            serde_json::to_string(&ErrorCode::MultipleConstructors).unwrap(),
            "\"MULTIPLE_CONSTRUCTORS\""
        );
        assert_eq!(
            serde_json::to_string(&ErrorCode::MissingErc1155Event).unwrap(),
            "\"MISSING_ERC1155_EVENT\""
        );
    }
}
