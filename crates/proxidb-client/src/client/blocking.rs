//! Blocking front-ends over the async clients.
//!
//! Each blocking client owns a Tokio runtime and drives the async client
//! with `block_on`, so the full surface is available from synchronous code.
//! Do not construct these inside an async runtime; use the async clients
//! there instead.

use std::time::Duration;

use tokio::runtime::Runtime;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::types::{
    HnswParams, HnswSearchParams, IndexDefinition, IndexStorage, Key, Neighbor, Record, User,
};

/// Blocking flavor of [`crate::AdminClient`].
pub struct AdminClient {
    inner: crate::AdminClient,
    runtime: Runtime,
}

impl AdminClient {
    /// Create a new blocking admin client with the given configuration
    pub fn new(config: ClientConfig) -> Result<Self> {
        let runtime = Runtime::new()?;
        let inner = runtime.block_on(crate::AdminClient::new(config))?;
        Ok(Self { inner, runtime })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn index_create(
        &self,
        namespace: String,
        name: String,
        vector_field: String,
        dimensions: u32,
        params: Option<HnswParams>,
        set_filter: Option<String>,
        storage: Option<IndexStorage>,
        timeout: Option<Duration>,
    ) -> Result<()> {
        self.runtime.block_on(self.inner.index_create(
            namespace,
            name,
            vector_field,
            dimensions,
            params,
            set_filter,
            storage,
            timeout,
        ))
    }

    pub fn index_drop(
        &self,
        namespace: String,
        name: String,
        timeout: Option<Duration>,
    ) -> Result<()> {
        self.runtime
            .block_on(self.inner.index_drop(namespace, name, timeout))
    }

    pub fn index_get(
        &self,
        namespace: String,
        name: String,
        timeout: Option<Duration>,
    ) -> Result<IndexDefinition> {
        self.runtime
            .block_on(self.inner.index_get(namespace, name, timeout))
    }

    pub fn index_get_status(
        &self,
        namespace: String,
        name: String,
        timeout: Option<Duration>,
    ) -> Result<i64> {
        self.runtime
            .block_on(self.inner.index_get_status(namespace, name, timeout))
    }

    pub fn index_list(
        &self,
        apply_defaults: bool,
        timeout: Option<Duration>,
    ) -> Result<Vec<IndexDefinition>> {
        self.runtime
            .block_on(self.inner.index_list(apply_defaults, timeout))
    }

    pub fn add_user(
        &self,
        username: String,
        password: String,
        roles: Vec<String>,
        timeout: Option<Duration>,
    ) -> Result<()> {
        self.runtime
            .block_on(self.inner.add_user(username, password, roles, timeout))
    }

    pub fn update_credentials(
        &self,
        username: String,
        password: String,
        timeout: Option<Duration>,
    ) -> Result<()> {
        self.runtime
            .block_on(self.inner.update_credentials(username, password, timeout))
    }

    pub fn drop_user(&self, username: String, timeout: Option<Duration>) -> Result<()> {
        self.runtime.block_on(self.inner.drop_user(username, timeout))
    }

    pub fn get_user(&self, username: String, timeout: Option<Duration>) -> Result<User> {
        self.runtime.block_on(self.inner.get_user(username, timeout))
    }

    pub fn list_users(&self, timeout: Option<Duration>) -> Result<Vec<User>> {
        self.runtime.block_on(self.inner.list_users(timeout))
    }

    pub fn list_roles(&self, timeout: Option<Duration>) -> Result<Vec<String>> {
        self.runtime.block_on(self.inner.list_roles(timeout))
    }

    pub fn close(&self) {
        self.inner.close()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

/// Blocking flavor of [`crate::Client`].
pub struct Client {
    inner: crate::Client,
    runtime: Runtime,
}

impl Client {
    /// Create a new blocking data client with the given configuration
    pub fn new(config: ClientConfig) -> Result<Self> {
        let runtime = Runtime::new()?;
        let inner = runtime.block_on(crate::Client::new(config))?;
        Ok(Self { inner, runtime })
    }

    pub fn put(&self, key: &Key, record: &Record, timeout: Option<Duration>) -> Result<()> {
        self.runtime.block_on(self.inner.put(key, record, timeout))
    }

    pub fn upsert(&self, key: &Key, record: &Record, timeout: Option<Duration>) -> Result<()> {
        self.runtime.block_on(self.inner.upsert(key, record, timeout))
    }

    pub fn insert(&self, key: &Key, record: &Record, timeout: Option<Duration>) -> Result<()> {
        self.runtime.block_on(self.inner.insert(key, record, timeout))
    }

    pub fn get(
        &self,
        key: &Key,
        field_names: Option<Vec<String>>,
        timeout: Option<Duration>,
    ) -> Result<Record> {
        self.runtime
            .block_on(self.inner.get(key, field_names, timeout))
    }

    pub fn exists(&self, key: &Key, timeout: Option<Duration>) -> Result<bool> {
        self.runtime.block_on(self.inner.exists(key, timeout))
    }

    pub fn delete(&self, key: &Key, timeout: Option<Duration>) -> Result<()> {
        self.runtime.block_on(self.inner.delete(key, timeout))
    }

    pub fn is_indexed(
        &self,
        key: &Key,
        index_name: String,
        timeout: Option<Duration>,
    ) -> Result<bool> {
        self.runtime
            .block_on(self.inner.is_indexed(key, index_name, timeout))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn vector_search(
        &self,
        namespace: String,
        index_name: String,
        query: Vec<f32>,
        limit: u32,
        field_names: Option<Vec<String>>,
        search_params: Option<HnswSearchParams>,
        timeout: Option<Duration>,
    ) -> Result<Vec<Neighbor>> {
        self.runtime.block_on(self.inner.vector_search(
            namespace,
            index_name,
            query,
            limit,
            field_names,
            search_params,
            timeout,
        ))
    }

    pub fn indexes_in_sync(&self, timeout: Option<Duration>) -> Result<()> {
        self.runtime.block_on(self.inner.indexes_in_sync(timeout))
    }

    pub fn close(&self) {
        self.inner.close()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}
