//! Local data model and conversions to and from the wire messages.
//!
//! The generated protobuf types leak `Option` everywhere and carry no
//! defaults; the types here are what callers hold. Conversions from the wire
//! are fallible and surface [`ClientError::InvalidResponse`] when the server
//! sends a structurally incomplete message.

use std::collections::HashMap;

use crate::error::ClientError;
use proxidb_proto::proxidb as pb;

/// Address of a record: namespace, optional set, user key.
///
/// The digest derived from a key is computed server-side; the client never
/// sees or computes it except on search results.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key {
    pub namespace: String,
    pub set: Option<String>,
    pub key: String,
}

impl Key {
    pub fn new<N: Into<String>, K: Into<String>>(namespace: N, key: K) -> Self {
        Self {
            namespace: namespace.into(),
            set: None,
            key: key.into(),
        }
    }

    pub fn with_set<N: Into<String>, S: Into<String>, K: Into<String>>(
        namespace: N,
        set: S,
        key: K,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            set: Some(set.into()),
            key: key.into(),
        }
    }
}

impl From<&Key> for pb::Key {
    fn from(key: &Key) -> Self {
        pb::Key {
            namespace: key.namespace.clone(),
            set: key.set.clone(),
            key: key.key.clone(),
        }
    }
}

impl From<pb::Key> for Key {
    fn from(key: pb::Key) -> Self {
        Self {
            namespace: key.namespace,
            set: key.set,
            key: key.key,
        }
    }
}

/// A single field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Vector(Vec<f32>),
    BoolVector(Vec<bool>),
    String(String),
    Int(i64),
    Double(f64),
    Bool(bool),
    Bytes(Vec<u8>),
}

impl From<Vec<f32>> for Value {
    fn from(v: Vec<f32>) -> Self {
        Value::Vector(v)
    }
}

impl From<Vec<bool>> for Value {
    fn from(v: Vec<bool>) -> Self {
        Value::BoolVector(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<&Value> for pb::Value {
    fn from(value: &Value) -> Self {
        let kind = match value {
            Value::Vector(v) => pb::value::Kind::Vector(pb::Vector { values: v.clone() }),
            Value::BoolVector(v) => {
                pb::value::Kind::BoolVector(pb::BoolVector { values: v.clone() })
            }
            Value::String(v) => pb::value::Kind::StringValue(v.clone()),
            Value::Int(v) => pb::value::Kind::IntValue(*v),
            Value::Double(v) => pb::value::Kind::DoubleValue(*v),
            Value::Bool(v) => pb::value::Kind::BoolValue(*v),
            Value::Bytes(v) => pb::value::Kind::BytesValue(v.clone()),
        };
        pb::Value { kind: Some(kind) }
    }
}

impl TryFrom<pb::Value> for Value {
    type Error = ClientError;

    fn try_from(value: pb::Value) -> Result<Self, Self::Error> {
        let kind = value
            .kind
            .ok_or_else(|| ClientError::InvalidResponse("field value has no kind".to_string()))?;
        Ok(match kind {
            pb::value::Kind::Vector(v) => Value::Vector(v.values),
            pb::value::Kind::BoolVector(v) => Value::BoolVector(v.values),
            pb::value::Kind::StringValue(v) => Value::String(v),
            pb::value::Kind::IntValue(v) => Value::Int(v),
            pb::value::Kind::DoubleValue(v) => Value::Double(v),
            pb::value::Kind::BoolValue(v) => Value::Bool(v),
            pb::value::Kind::BytesValue(v) => Value::Bytes(v),
        })
    }
}

/// A record: a mapping from field name to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub fields: HashMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<N: Into<String>, V: Into<Value>>(&mut self, name: N, value: V) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<N: Into<String>, V: Into<Value>> FromIterator<(N, V)> for Record {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        }
    }
}

pub(crate) fn fields_to_proto(record: &Record) -> Vec<pb::Field> {
    record
        .fields
        .iter()
        .map(|(name, value)| pb::Field {
            name: name.clone(),
            value: Some(value.into()),
        })
        .collect()
}

impl TryFrom<pb::Record> for Record {
    type Error = ClientError;

    fn try_from(record: pb::Record) -> Result<Self, Self::Error> {
        let mut fields = HashMap::with_capacity(record.fields.len());
        for field in record.fields {
            let value = field
                .value
                .ok_or_else(|| {
                    ClientError::InvalidResponse(format!("field '{}' has no value", field.name))
                })?
                .try_into()?;
            fields.insert(field.name, value);
        }
        Ok(Self { fields })
    }
}

/// Identity of an index: namespace plus index name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexId {
    pub namespace: String,
    pub name: String,
}

impl IndexId {
    pub fn new<N: Into<String>, S: Into<String>>(namespace: N, name: S) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl From<&IndexId> for pb::IndexId {
    fn from(id: &IndexId) -> Self {
        pb::IndexId {
            namespace: id.namespace.clone(),
            name: id.name.clone(),
        }
    }
}

impl From<pb::IndexId> for IndexId {
    fn from(id: pb::IndexId) -> Self {
        Self {
            namespace: id.namespace,
            name: id.name,
        }
    }
}

/// Server-side batching behavior for index merges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HnswBatchingParams {
    pub max_index_records: u32,
    pub index_interval: u32,
    pub max_reindex_records: u32,
    pub reindex_interval: u32,
    pub disabled: bool,
}

impl Default for HnswBatchingParams {
    fn default() -> Self {
        Self {
            max_index_records: 100_000,
            index_interval: 30_000,
            max_reindex_records: 100_000,
            reindex_interval: 30_000,
            disabled: false,
        }
    }
}

impl From<&HnswBatchingParams> for pb::HnswBatchingParams {
    fn from(params: &HnswBatchingParams) -> Self {
        pb::HnswBatchingParams {
            max_index_records: Some(params.max_index_records),
            index_interval: Some(params.index_interval),
            max_reindex_records: Some(params.max_reindex_records),
            reindex_interval: Some(params.reindex_interval),
            disabled: params.disabled,
        }
    }
}

impl From<pb::HnswBatchingParams> for HnswBatchingParams {
    fn from(params: pb::HnswBatchingParams) -> Self {
        let defaults = Self::default();
        Self {
            max_index_records: params.max_index_records.unwrap_or(defaults.max_index_records),
            index_interval: params.index_interval.unwrap_or(defaults.index_interval),
            max_reindex_records: params
                .max_reindex_records
                .unwrap_or(defaults.max_reindex_records),
            reindex_interval: params.reindex_interval.unwrap_or(defaults.reindex_interval),
            disabled: params.disabled,
        }
    }
}

/// Tunable HNSW graph parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HnswParams {
    pub m: u32,
    pub ef_construction: u32,
    pub ef: u32,
    pub batching_params: HnswBatchingParams,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            m: 16,
            ef_construction: 100,
            ef: 100,
            batching_params: HnswBatchingParams::default(),
        }
    }
}

impl From<&HnswParams> for pb::HnswParams {
    fn from(params: &HnswParams) -> Self {
        pb::HnswParams {
            m: Some(params.m),
            ef_construction: Some(params.ef_construction),
            ef: Some(params.ef),
            batching_params: Some((&params.batching_params).into()),
        }
    }
}

impl From<pb::HnswParams> for HnswParams {
    fn from(params: pb::HnswParams) -> Self {
        let defaults = Self::default();
        Self {
            m: params.m.unwrap_or(defaults.m),
            ef_construction: params.ef_construction.unwrap_or(defaults.ef_construction),
            ef: params.ef.unwrap_or(defaults.ef),
            batching_params: params
                .batching_params
                .map(Into::into)
                .unwrap_or_default(),
        }
    }
}

/// Per-query HNSW overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HnswSearchParams {
    pub ef: Option<u32>,
}

impl From<&HnswSearchParams> for pb::HnswSearchParams {
    fn from(params: &HnswSearchParams) -> Self {
        pb::HnswSearchParams { ef: params.ef }
    }
}

/// Where the index itself is stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStorage {
    pub namespace: Option<String>,
    pub set: Option<String>,
}

impl From<&IndexStorage> for pb::IndexStorage {
    fn from(storage: &IndexStorage) -> Self {
        pb::IndexStorage {
            namespace: storage.namespace.clone(),
            set: storage.set.clone(),
        }
    }
}

impl From<pb::IndexStorage> for IndexStorage {
    fn from(storage: pb::IndexStorage) -> Self {
        Self {
            namespace: storage.namespace,
            set: storage.set,
        }
    }
}

/// Full description of an index as the server reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDefinition {
    pub id: IndexId,
    pub field: String,
    pub dimensions: u32,
    pub set_filter: Option<String>,
    pub hnsw_params: HnswParams,
    pub storage: IndexStorage,
}

impl From<&IndexDefinition> for pb::IndexDefinition {
    fn from(def: &IndexDefinition) -> Self {
        pb::IndexDefinition {
            id: Some((&def.id).into()),
            field: def.field.clone(),
            dimensions: def.dimensions,
            set_filter: def.set_filter.clone(),
            hnsw_params: Some((&def.hnsw_params).into()),
            storage: Some((&def.storage).into()),
        }
    }
}

impl TryFrom<pb::IndexDefinition> for IndexDefinition {
    type Error = ClientError;

    fn try_from(def: pb::IndexDefinition) -> Result<Self, Self::Error> {
        let id = def
            .id
            .ok_or_else(|| ClientError::InvalidResponse("index definition has no id".to_string()))?;
        Ok(Self {
            id: id.into(),
            field: def.field,
            dimensions: def.dimensions,
            set_filter: def.set_filter,
            hnsw_params: def.hnsw_params.map(Into::into).unwrap_or_default(),
            storage: def.storage.map(Into::into).unwrap_or_default(),
        })
    }
}

/// A user and the roles granted to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub username: String,
    pub roles: Vec<String>,
}

impl From<pb::User> for User {
    fn from(user: pb::User) -> Self {
        Self {
            username: user.username,
            roles: user.roles,
        }
    }
}

/// A ranked search result.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub key: Key,
    pub digest: Vec<u8>,
    pub distance: f32,
    pub record: Record,
}

impl TryFrom<pb::Neighbor> for Neighbor {
    type Error = ClientError;

    fn try_from(neighbor: pb::Neighbor) -> Result<Self, Self::Error> {
        let key = neighbor
            .key
            .ok_or_else(|| ClientError::InvalidResponse("neighbor has no key".to_string()))?;
        Ok(Self {
            key: key.into(),
            digest: neighbor.digest,
            distance: neighbor.distance,
            record: neighbor.record.map(TryInto::try_into).transpose()?.unwrap_or_default(),
        })
    }
}
