//! Parameter bindings and map decoding.
//!
//! A [`Parameter`] binds a name to a registered IOType id and adds an
//! optional default and a description. Decoding a raw JSON map against a
//! parameter schema substitutes defaults, rejects missing required names and
//! validates every value through the IOType registry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::iotype::{IoMap, IoType, IoTypeRegistry};

/// A named binding of an IOType with an optional default value.
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    /// Id of the IOType this parameter validates against. The full schema is
    /// interned in the registry at construction time.
    pub io_type: String,
    pub description: String,
    /// Raw default as authored; validated on substitution so that defaults
    /// and client-sent values canonicalise identically.
    pub default: Option<Value>,
}

impl Parameter {
    pub fn optional(&self) -> bool {
        self.default.is_some()
    }

    /// The wire shape served by the `in`/`out` facet endpoints.
    pub fn property(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "io": self.io_type,
            "optional": self.optional(),
            "default": self.default,
            "desc": self.description,
        })
    }
}

/// Declarative form of a parameter, as it appears in descriptor files:
/// an inline IOType schema plus default and description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub io_type: IoType,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub default_value: Option<Value>,
}

impl ParameterSpec {
    pub fn new(io_type: IoType, desc: impl Into<String>) -> Self {
        ParameterSpec {
            io_type,
            desc: desc.into(),
            default_value: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default_value = Some(default);
        self
    }

    /// Intern the referenced IOType and produce the runtime binding.
    pub fn bind(&self, name: &str, registry: &IoTypeRegistry) -> Result<Parameter, CoreError> {
        registry.register(self.io_type.clone())?;
        Ok(Parameter {
            name: name.to_string(),
            io_type: self.io_type.id.clone(),
            description: self.desc.clone(),
            default: self.default_value.clone(),
        })
    }
}

/// Decode a raw JSON object against a parameter schema.
///
/// Omitted optional parameters take their default (which is validated like
/// any other value); omitted required parameters fail with
/// [`CoreError::MissingParameter`]. Unknown incoming keys are ignored.
pub fn decode_map(
    schema: &BTreeMap<String, Parameter>,
    params: &serde_json::Map<String, Value>,
    registry: &IoTypeRegistry,
) -> Result<IoMap, CoreError> {
    let mut decoded = IoMap::new();
    for (name, param) in schema {
        let raw = match params.get(name) {
            Some(value) => value,
            None => match &param.default {
                Some(default) => default,
                None => return Err(CoreError::MissingParameter(name.clone())),
            },
        };
        let value = registry.validate(&param.io_type, name, raw)?;
        decoded.insert(name.clone(), value);
    }
    Ok(decoded)
}
