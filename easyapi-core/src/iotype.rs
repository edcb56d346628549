//! Named, versioned value schemas and the global registry that validates
//! incoming values against them.
//!
//! An [`IoType`] pairs a `meta` kind (`string`, `number`, `numarray`) with an
//! optional condition that parameterises validation. Validation coerces to a
//! canonical form: numbers become `f64`, arrays become flat `f64` sequences,
//! strings pass through.

use std::collections::BTreeMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

/// Validator kind selected by an IOType's `meta` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IoMeta {
    String,
    Number,
    Numarray,
}

/// Constraints attached to an IOType.
///
/// `min` applies to `number` (inclusive lower bound); `pattern` applies to
/// `string` (regular expression the value must match).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IoCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// A named, versioned value schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IoType {
    pub meta: IoMeta,
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub doc: String,
    #[serde(default)]
    pub condition: Option<IoCondition>,
    #[serde(default)]
    pub version: String,
}

impl IoType {
    pub fn new(meta: IoMeta, id: impl Into<String>, name: impl Into<String>) -> Self {
        IoType {
            meta,
            id: id.into(),
            name: name.into(),
            doc: String::new(),
            condition: None,
            version: "0.0.1".to_string(),
        }
    }

    /// The universal float type.
    pub fn number() -> Self {
        IoType::new(IoMeta::Number, "number", "float").with_doc("Universal float")
    }

    /// The universal string type.
    pub fn text() -> Self {
        IoType::new(IoMeta::String, "string", "string").with_doc("Universal string")
    }

    /// The universal float-array type.
    pub fn numarray() -> Self {
        IoType::new(IoMeta::Numarray, "numarray", "array[float]").with_doc("Float array")
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    pub fn with_condition(mut self, condition: IoCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Validate and coerce `value`, returning its canonical form.
    ///
    /// `field` names the value's position in the incoming map and is carried
    /// into the error so callers can report the offending path.
    pub fn validate(&self, field: &str, value: &Value) -> Result<IoValue, CoreError> {
        match self.meta {
            IoMeta::Number => {
                let n = coerce_number(field, value)?;
                if let Some(min) = self.condition.as_ref().and_then(|c| c.min) {
                    if n < min {
                        return Err(CoreError::validation(
                            field,
                            format!("{n} is below the minimum {min}"),
                        ));
                    }
                }
                Ok(IoValue::Number(n))
            }
            IoMeta::String => {
                let s = value.as_str().ok_or_else(|| {
                    CoreError::validation(field, format!("expected a string, got {value}"))
                })?;
                if let Some(pattern) = self.condition.as_ref().and_then(|c| c.pattern.as_deref()) {
                    let re = regex::Regex::new(pattern).map_err(|e| {
                        CoreError::validation(field, format!("invalid pattern '{pattern}': {e}"))
                    })?;
                    if !re.is_match(s) {
                        return Err(CoreError::validation(
                            field,
                            format!("value does not match pattern '{pattern}'"),
                        ));
                    }
                }
                Ok(IoValue::Text(s.to_string()))
            }
            IoMeta::Numarray => {
                let mut out = Vec::new();
                flatten_numbers(field, value, &mut out)?;
                Ok(IoValue::NumArray(out))
            }
        }
    }
}

fn coerce_number(field: &str, value: &Value) -> Result<f64, CoreError> {
    if let Some(n) = value.as_f64() {
        return Ok(n);
    }
    // Numeric strings coerce, matching the original wire behaviour.
    if let Some(s) = value.as_str() {
        if let Ok(n) = s.trim().parse::<f64>() {
            return Ok(n);
        }
    }
    Err(CoreError::validation(
        field,
        format!("expected a number, got {value}"),
    ))
}

fn flatten_numbers(field: &str, value: &Value, out: &mut Vec<f64>) -> Result<(), CoreError> {
    match value {
        Value::Array(items) => {
            for item in items {
                flatten_numbers(field, item, out)?;
            }
            Ok(())
        }
        other => {
            out.push(coerce_number(field, other)?);
            Ok(())
        }
    }
}

/// A validated value in canonical form.
///
/// Serialises to plain JSON (number / string / array), so a canonical input
/// or output map is an ordinary JSON object on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IoValue {
    Number(f64),
    Text(String),
    NumArray(Vec<f64>),
}

/// A canonical parameter map. `BTreeMap` keeps keys in lexicographic order,
/// which the cache signature relies on.
pub type IoMap = BTreeMap<String, IoValue>;

/// Conflict handling for same-id re-registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictMode {
    /// The first registration wins; later conflicting ones are discarded
    /// with a warning.
    #[default]
    FirstWins,
    /// A conflicting redefinition is an error.
    Strict,
}

/// The global catalogue of IO types.
///
/// Registration happens during startup (module loads may intern the types
/// their parameters reference); afterwards the registry is effectively
/// read-only.
pub struct IoTypeRegistry {
    types: RwLock<BTreeMap<String, IoType>>,
    mode: ConflictMode,
}

impl IoTypeRegistry {
    pub fn new() -> Self {
        Self::with_mode(ConflictMode::FirstWins)
    }

    pub fn with_mode(mode: ConflictMode) -> Self {
        IoTypeRegistry {
            types: RwLock::new(BTreeMap::new()),
            mode,
        }
    }

    /// Insert a schema, keyed by its id.
    ///
    /// Re-registering an identical schema is a no-op. A conflicting
    /// redefinition is discarded with a warning in first-wins mode and fails
    /// with [`CoreError::SchemaConflict`] in strict mode.
    pub fn register(&self, schema: IoType) -> Result<(), CoreError> {
        let mut types = self.types.write().unwrap();
        if let Some(existing) = types.get(&schema.id) {
            if *existing == schema {
                return Ok(());
            }
            match self.mode {
                ConflictMode::FirstWins => {
                    tracing::warn!(id = %schema.id, "IO type already registered, keeping the first definition");
                    return Ok(());
                }
                ConflictMode::Strict => return Err(CoreError::SchemaConflict(schema.id)),
            }
        }
        types.insert(schema.id.clone(), schema);
        Ok(())
    }

    /// Load a JSON map of `id -> schema` definitions, registering each.
    /// Returns the number of definitions processed.
    pub fn load_str(&self, json: &str) -> Result<usize, CoreError> {
        let defs: BTreeMap<String, IoType> = serde_json::from_str(json)
            .map_err(|e| CoreError::LoadFailure(format!("iolib: {e}")))?;
        let count = defs.len();
        for (_, schema) in defs {
            self.register(schema)?;
        }
        Ok(count)
    }

    pub fn lookup(&self, id: &str) -> Result<IoType, CoreError> {
        self.types
            .read()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("IO type '{id}'")))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.types.read().unwrap().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.types.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Validate `value` against the schema registered under `id`.
    pub fn validate(&self, id: &str, field: &str, value: &Value) -> Result<IoValue, CoreError> {
        self.lookup(id)?.validate(field, value)
    }

    /// Paginated id listing. `limit = None` means "to the end".
    pub fn list_ids(&self, skip: usize, limit: Option<usize>) -> Vec<String> {
        let types = self.types.read().unwrap();
        let iter = types.keys().skip(skip).cloned();
        match limit {
            Some(n) => iter.take(n).collect(),
            None => iter.collect(),
        }
    }

    /// Paginated schema listing. `limit = None` means "to the end".
    pub fn list_schemas(&self, skip: usize, limit: Option<usize>) -> Vec<IoType> {
        let types = self.types.read().unwrap();
        let iter = types.values().skip(skip).cloned();
        match limit {
            Some(n) => iter.take(n).collect(),
            None => iter.collect(),
        }
    }
}

impl Default for IoTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
