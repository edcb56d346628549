//! Algorithm records and the registry that serves them.
//!
//! An algorithm may be introduced by two routes which produce identical
//! runtime records: deserialising an [`AlgorithmDescriptor`] and pairing it
//! with an entry function, or fluent construction through
//! [`AlgorithmBuilder`]. The registry is populated once at startup and
//! read-only afterwards.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::CoreError;
use crate::iotype::{IoMap, IoType, IoTypeRegistry};
use crate::parameter::{decode_map, Parameter, ParameterSpec};

/// A mapping from resource name to quantity. On a lane it describes what the
/// lane provides; on a task, what the task needs (`-1` meaning "as much as
/// any lane provides").
pub type ResourceVector = BTreeMap<String, i64>;

/// Raw output of an entry point, decoded against `out_params` before it is
/// stored on the task.
pub type EntryOutput = serde_json::Map<String, Value>;

/// Context handed to an algorithm entry point: the executing lane's resource
/// vector and a cooperative cancellation token. Entries that honour the
/// token shorten the wait on cancellation; entries that ignore it run to
/// completion.
pub struct ExecContext {
    pub resources: ResourceVector,
    pub cancel: CancellationToken,
}

/// An algorithm entry point. Runs synchronously on a worker thread.
pub type Entry = Arc<dyn Fn(&IoMap, &ExecContext) -> Result<EntryOutput, CoreError> + Send + Sync>;

/// A registered computational routine with typed input and output schemas.
#[derive(Clone)]
pub struct Algorithm {
    pub id: String,
    pub name: String,
    pub description: String,
    pub version: String,
    pub references: Vec<String>,
    pub required_resources: ResourceVector,
    pub in_params: BTreeMap<String, Parameter>,
    pub out_params: BTreeMap<String, Parameter>,
    pub cache_disable: bool,
    entry: Entry,
}

impl Algorithm {
    pub fn builder(id: impl Into<String>) -> AlgorithmBuilder {
        AlgorithmBuilder::new(id)
    }

    /// Combine a declarative descriptor with an entry function.
    pub fn from_descriptor(
        descriptor: AlgorithmDescriptor,
        entry: Entry,
        registry: &IoTypeRegistry,
    ) -> Result<Self, CoreError> {
        let mut in_params = BTreeMap::new();
        for (name, spec) in &descriptor.in_params {
            in_params.insert(name.clone(), spec.bind(name, registry)?);
        }
        let mut out_params = BTreeMap::new();
        for (name, spec) in &descriptor.out_params {
            out_params.insert(name.clone(), spec.bind(name, registry)?);
        }
        Ok(Algorithm {
            id: descriptor.id,
            name: descriptor.name,
            description: descriptor.description,
            version: descriptor.version,
            references: descriptor.references,
            required_resources: descriptor.required_resources,
            in_params,
            out_params,
            cache_disable: descriptor.cache_disable,
            entry,
        })
    }

    /// Decode and validate a raw input map against `in_params`.
    pub fn decode_inputs(
        &self,
        raw: &serde_json::Map<String, Value>,
        registry: &IoTypeRegistry,
    ) -> Result<IoMap, CoreError> {
        decode_map(&self.in_params, raw, registry)
    }

    /// Run the entry point and decode its output against `out_params`.
    ///
    /// An entry that returns unknown or wrongly-typed outputs surfaces here
    /// as an error, which the runner records as a task failure.
    pub fn run(
        &self,
        inputs: &IoMap,
        ctx: &ExecContext,
        registry: &IoTypeRegistry,
    ) -> Result<IoMap, CoreError> {
        let raw = (self.entry)(inputs, ctx)?;
        decode_map(&self.out_params, &raw, registry)
    }

    /// The summary shape served by `GET /entries/{id}`.
    pub fn descriptor_json(&self) -> Value {
        serde_json::json!({
            "id": self.id,
            "name": self.name,
            "description": self.description,
            "version": self.version,
            "references": self.references,
        })
    }

    /// Wire shape of one parameter direction (`in`/`out` facets).
    pub fn params_json(params: &BTreeMap<String, Parameter>) -> Value {
        params
            .iter()
            .map(|(name, p)| (name.clone(), p.property()))
            .collect::<serde_json::Map<_, _>>()
            .into()
    }
}

/// Declarative algorithm record, typically deserialised from a JSON file.
#[derive(Debug, Clone, Deserialize)]
pub struct AlgorithmDescriptor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(default)]
    pub required_resources: ResourceVector,
    #[serde(default)]
    pub in_params: BTreeMap<String, ParameterSpec>,
    #[serde(default)]
    pub out_params: BTreeMap<String, ParameterSpec>,
    #[serde(default)]
    pub cache_disable: bool,
}

/// Fluent construction of an [`Algorithm`].
pub struct AlgorithmBuilder {
    id: String,
    name: String,
    description: String,
    version: String,
    references: Vec<String>,
    required_resources: ResourceVector,
    in_params: BTreeMap<String, ParameterSpec>,
    out_params: BTreeMap<String, ParameterSpec>,
    cache_disable: bool,
    entry: Option<Entry>,
}

impl AlgorithmBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        AlgorithmBuilder {
            name: id.clone(),
            id,
            description: String::new(),
            version: "0.0.1".to_string(),
            references: Vec::new(),
            required_resources: ResourceVector::new(),
            in_params: BTreeMap::new(),
            out_params: BTreeMap::new(),
            cache_disable: false,
            entry: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.references.push(reference.into());
        self
    }

    pub fn resource(mut self, name: impl Into<String>, quantity: i64) -> Self {
        self.required_resources.insert(name.into(), quantity);
        self
    }

    pub fn input(mut self, name: impl Into<String>, io_type: IoType, desc: impl Into<String>) -> Self {
        self.in_params
            .insert(name.into(), ParameterSpec::new(io_type, desc));
        self
    }

    /// An optional input: omitted values take `default`.
    pub fn input_default(
        mut self,
        name: impl Into<String>,
        io_type: IoType,
        desc: impl Into<String>,
        default: Value,
    ) -> Self {
        self.in_params
            .insert(name.into(), ParameterSpec::new(io_type, desc).with_default(default));
        self
    }

    pub fn output(mut self, name: impl Into<String>, io_type: IoType, desc: impl Into<String>) -> Self {
        self.out_params
            .insert(name.into(), ParameterSpec::new(io_type, desc));
        self
    }

    pub fn cache_disable(mut self, disable: bool) -> Self {
        self.cache_disable = disable;
        self
    }

    pub fn entry<F>(mut self, entry: F) -> Self
    where
        F: Fn(&IoMap, &ExecContext) -> Result<EntryOutput, CoreError> + Send + Sync + 'static,
    {
        self.entry = Some(Arc::new(entry));
        self
    }

    pub fn build(self, registry: &IoTypeRegistry) -> Result<Algorithm, CoreError> {
        let entry = self
            .entry
            .ok_or_else(|| CoreError::LoadFailure(format!("{}: no entry point", self.id)))?;
        Algorithm::from_descriptor(
            AlgorithmDescriptor {
                id: self.id,
                name: self.name,
                description: self.description,
                version: self.version,
                references: self.references,
                required_resources: self.required_resources,
                in_params: self.in_params,
                out_params: self.out_params,
                cache_disable: self.cache_disable,
            },
            entry,
            registry,
        )
    }
}

/// The collection of registered algorithms, keyed by id.
pub struct AlgorithmRegistry {
    algorithms: RwLock<BTreeMap<String, Arc<Algorithm>>>,
}

impl AlgorithmRegistry {
    pub fn new() -> Self {
        AlgorithmRegistry {
            algorithms: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn add(&self, algorithm: Algorithm) {
        let mut algorithms = self.algorithms.write().unwrap();
        if algorithms.contains_key(&algorithm.id) {
            tracing::warn!(id = %algorithm.id, "algorithm re-registered, replacing the previous record");
        }
        algorithms.insert(algorithm.id.clone(), Arc::new(algorithm));
    }

    pub fn contains(&self, id: &str) -> bool {
        self.algorithms.read().unwrap().contains_key(id)
    }

    pub fn get(&self, id: &str) -> Result<Arc<Algorithm>, CoreError> {
        self.algorithms
            .read()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("algorithm '{id}'")))
    }

    pub fn len(&self) -> usize {
        self.algorithms.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All registered ids, in lexicographic order.
    pub fn ids(&self) -> Vec<String> {
        self.algorithms.read().unwrap().keys().cloned().collect()
    }

    /// Paginated listing; entries are ids, or `{id, name}` pairs when
    /// `with_names` is set.
    pub fn list(&self, skip: usize, limit: Option<usize>, with_names: bool) -> Vec<Value> {
        let algorithms = self.algorithms.read().unwrap();
        let iter = algorithms.values().skip(skip);
        let take = limit.unwrap_or(usize::MAX);
        iter.take(take)
            .map(|a| {
                if with_names {
                    serde_json::json!({ "id": a.id, "name": a.name })
                } else {
                    Value::String(a.id.clone())
                }
            })
            .collect()
    }
}

impl Default for AlgorithmRegistry {
    fn default() -> Self {
        Self::new()
    }
}
