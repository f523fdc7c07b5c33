//! In-process ProxiDB stand-in for integration tests.
//!
//! Holds records, indexes, and users in memory behind real gRPC services on
//! a loopback socket. Latency and transient-failure injection let tests
//! exercise deadline and retry behavior deterministically.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tonic::{Request, Response, Status};

use proxidb_client::{ClientConfig, HostPort};
use proxidb_proto::admin_service_server::{AdminService, AdminServiceServer};
use proxidb_proto::data_service_server::{DataService, DataServiceServer};
use proxidb_proto::proxidb as pb;

type RecordKey = (String, Option<String>, String);
type IndexKey = (String, String);

#[derive(Default)]
struct State {
    records: HashMap<RecordKey, HashMap<String, pb::Value>>,
    indexes: HashMap<IndexKey, pb::IndexDefinition>,
    unmerged: HashMap<IndexKey, i64>,
    users: HashMap<String, (String, Vec<String>)>,
}

#[derive(Clone, Default)]
pub struct FakeProxiDb {
    state: Arc<Mutex<State>>,
    latency: Option<Duration>,
    /// Records merged per status poll; zero freezes the unmerged counts.
    merge_step: i64,
    fail_unavailable: Arc<AtomicU32>,
}

impl FakeProxiDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    pub fn with_merge_step(merge_step: i64) -> Self {
        Self {
            merge_step,
            ..Self::default()
        }
    }

    /// Fail the next `n` RPCs with UNAVAILABLE.
    pub fn fail_next(&self, n: u32) {
        self.fail_unavailable.store(n, Ordering::SeqCst);
    }

    pub fn set_unmerged(&self, namespace: &str, index: &str, count: i64) {
        let mut state = self.state.lock().unwrap();
        state
            .unmerged
            .insert((namespace.to_string(), index.to_string()), count);
    }

    async fn gate(&self) -> Result<(), Status> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        loop {
            let remaining = self.fail_unavailable.load(Ordering::SeqCst);
            if remaining == 0 {
                return Ok(());
            }
            if self
                .fail_unavailable
                .compare_exchange(remaining, remaining - 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return Err(Status::unavailable("injected fault"));
            }
        }
    }
}

fn record_key(key: &pb::Key) -> RecordKey {
    (key.namespace.clone(), key.set.clone(), key.key.clone())
}

fn index_key(id: &pb::IndexId) -> IndexKey {
    (id.namespace.clone(), id.name.clone())
}

fn require<T>(value: Option<T>, what: &str) -> Result<T, Status> {
    value.ok_or_else(|| Status::invalid_argument(format!("missing {}", what)))
}

fn project(
    fields: &HashMap<String, pb::Value>,
    field_names: &[String],
) -> Vec<pb::Field> {
    fields
        .iter()
        .filter(|(name, _)| field_names.is_empty() || field_names.contains(*name))
        .map(|(name, value)| pb::Field {
            name: name.clone(),
            value: Some(value.clone()),
        })
        .collect()
}

fn apply_hnsw_defaults(def: &mut pb::IndexDefinition) {
    let params = def.hnsw_params.get_or_insert_with(pb::HnswParams::default);
    params.m.get_or_insert(16);
    params.ef_construction.get_or_insert(100);
    params.ef.get_or_insert(100);
    let batching = params
        .batching_params
        .get_or_insert_with(pb::HnswBatchingParams::default);
    batching.max_index_records.get_or_insert(100_000);
    batching.index_interval.get_or_insert(30_000);
    batching.max_reindex_records.get_or_insert(100_000);
    batching.reindex_interval.get_or_insert(30_000);
}

#[tonic::async_trait]
impl AdminService for FakeProxiDb {
    async fn index_create(
        &self,
        request: Request<pb::IndexCreateRequest>,
    ) -> Result<Response<pb::Empty>, Status> {
        self.gate().await?;
        let definition = require(request.into_inner().definition, "definition")?;
        let id = require(definition.id.clone(), "index id")?;
        let key = index_key(&id);
        let mut state = self.state.lock().unwrap();
        if state.indexes.contains_key(&key) {
            return Err(Status::already_exists(format!(
                "index {}/{} already exists",
                key.0, key.1
            )));
        }
        state.indexes.insert(key.clone(), definition);
        state.unmerged.entry(key).or_insert(0);
        Ok(Response::new(pb::Empty {}))
    }

    async fn index_drop(
        &self,
        request: Request<pb::IndexDropRequest>,
    ) -> Result<Response<pb::Empty>, Status> {
        self.gate().await?;
        let id = require(request.into_inner().index_id, "index id")?;
        let key = index_key(&id);
        let mut state = self.state.lock().unwrap();
        if state.indexes.remove(&key).is_none() {
            return Err(Status::not_found(format!(
                "index {}/{} does not exist",
                key.0, key.1
            )));
        }
        state.unmerged.remove(&key);
        Ok(Response::new(pb::Empty {}))
    }

    async fn index_get(
        &self,
        request: Request<pb::IndexGetRequest>,
    ) -> Result<Response<pb::IndexDefinition>, Status> {
        self.gate().await?;
        let id = require(request.into_inner().index_id, "index id")?;
        let state = self.state.lock().unwrap();
        let definition = state
            .indexes
            .get(&index_key(&id))
            .ok_or_else(|| Status::not_found(format!("index {}/{}", id.namespace, id.name)))?;
        Ok(Response::new(definition.clone()))
    }

    async fn index_get_status(
        &self,
        request: Request<pb::IndexStatusRequest>,
    ) -> Result<Response<pb::IndexStatusResponse>, Status> {
        self.gate().await?;
        let id = require(request.into_inner().index_id, "index id")?;
        let key = index_key(&id);
        let mut state = self.state.lock().unwrap();
        if !state.indexes.contains_key(&key) {
            return Err(Status::not_found(format!("index {}/{}", key.0, key.1)));
        }
        let count = state.unmerged.entry(key).or_insert(0);
        let current = *count;
        // Background merge makes progress between polls.
        *count = (current - self.merge_step).max(0);
        Ok(Response::new(pb::IndexStatusResponse {
            unmerged_record_count: current,
        }))
    }

    async fn index_list(
        &self,
        request: Request<pb::IndexListRequest>,
    ) -> Result<Response<pb::IndexListResponse>, Status> {
        self.gate().await?;
        let apply_defaults = request.into_inner().apply_defaults.unwrap_or(true);
        let state = self.state.lock().unwrap();
        let mut indices: Vec<pb::IndexDefinition> = state.indexes.values().cloned().collect();
        if apply_defaults {
            for def in &mut indices {
                apply_hnsw_defaults(def);
            }
        }
        Ok(Response::new(pb::IndexListResponse { indices }))
    }

    async fn add_user(
        &self,
        request: Request<pb::AddUserRequest>,
    ) -> Result<Response<pb::Empty>, Status> {
        self.gate().await?;
        let req = request.into_inner();
        let mut state = self.state.lock().unwrap();
        if state.users.contains_key(&req.username) {
            return Err(Status::already_exists(format!(
                "user {} already exists",
                req.username
            )));
        }
        state.users.insert(req.username, (req.password, req.roles));
        Ok(Response::new(pb::Empty {}))
    }

    async fn update_credentials(
        &self,
        request: Request<pb::UpdateCredentialsRequest>,
    ) -> Result<Response<pb::Empty>, Status> {
        self.gate().await?;
        let req = request.into_inner();
        let mut state = self.state.lock().unwrap();
        match state.users.get_mut(&req.username) {
            Some((password, _)) => {
                *password = req.password;
                Ok(Response::new(pb::Empty {}))
            }
            None => Err(Status::not_found(format!("user {}", req.username))),
        }
    }

    async fn drop_user(
        &self,
        request: Request<pb::DropUserRequest>,
    ) -> Result<Response<pb::Empty>, Status> {
        self.gate().await?;
        let req = request.into_inner();
        let mut state = self.state.lock().unwrap();
        if state.users.remove(&req.username).is_none() {
            return Err(Status::not_found(format!("user {}", req.username)));
        }
        Ok(Response::new(pb::Empty {}))
    }

    async fn get_user(
        &self,
        request: Request<pb::GetUserRequest>,
    ) -> Result<Response<pb::User>, Status> {
        self.gate().await?;
        let req = request.into_inner();
        let state = self.state.lock().unwrap();
        let (_, roles) = state
            .users
            .get(&req.username)
            .ok_or_else(|| Status::not_found(format!("user {}", req.username)))?;
        Ok(Response::new(pb::User {
            username: req.username,
            roles: roles.clone(),
        }))
    }

    async fn list_users(
        &self,
        request: Request<pb::Empty>,
    ) -> Result<Response<pb::ListUsersResponse>, Status> {
        let _ = request;
        self.gate().await?;
        let state = self.state.lock().unwrap();
        let users = state
            .users
            .iter()
            .map(|(username, (_, roles))| pb::User {
                username: username.clone(),
                roles: roles.clone(),
            })
            .collect();
        Ok(Response::new(pb::ListUsersResponse { users }))
    }

    async fn list_roles(
        &self,
        request: Request<pb::Empty>,
    ) -> Result<Response<pb::ListRolesResponse>, Status> {
        let _ = request;
        self.gate().await?;
        Ok(Response::new(pb::ListRolesResponse {
            roles: vec![
                "admin".to_string(),
                "read-write".to_string(),
                "read-only".to_string(),
            ],
        }))
    }
}

#[tonic::async_trait]
impl DataService for FakeProxiDb {
    async fn put(
        &self,
        request: Request<pb::PutRequest>,
    ) -> Result<Response<pb::Empty>, Status> {
        self.gate().await?;
        let req = request.into_inner();
        let key = record_key(&require(req.key, "key")?);
        let write_type = pb::WriteType::try_from(req.write_type)
            .map_err(|_| Status::invalid_argument("unknown write type"))?;

        let mut fields = HashMap::with_capacity(req.fields.len());
        for field in req.fields {
            let value = require(field.value, "field value")?;
            fields.insert(field.name, value);
        }

        let mut state = self.state.lock().unwrap();
        let exists = state.records.contains_key(&key);
        match write_type {
            pb::WriteType::InsertOnly if exists => {
                return Err(Status::already_exists(format!("record {:?} exists", key.2)))
            }
            pb::WriteType::Upsert => {
                state.records.entry(key).or_default().extend(fields);
            }
            _ => {
                state.records.insert(key, fields);
            }
        }
        Ok(Response::new(pb::Empty {}))
    }

    async fn get(
        &self,
        request: Request<pb::GetRequest>,
    ) -> Result<Response<pb::Record>, Status> {
        self.gate().await?;
        let req = request.into_inner();
        let key = record_key(&require(req.key, "key")?);
        let state = self.state.lock().unwrap();
        let fields = state
            .records
            .get(&key)
            .ok_or_else(|| Status::not_found(format!("record {:?} not found", key.2)))?;
        Ok(Response::new(pb::Record {
            fields: project(fields, &req.field_names),
        }))
    }

    async fn exists(
        &self,
        request: Request<pb::ExistsRequest>,
    ) -> Result<Response<pb::BoolResponse>, Status> {
        self.gate().await?;
        let key = record_key(&require(request.into_inner().key, "key")?);
        let state = self.state.lock().unwrap();
        Ok(Response::new(pb::BoolResponse {
            value: state.records.contains_key(&key),
        }))
    }

    async fn delete(
        &self,
        request: Request<pb::DeleteRequest>,
    ) -> Result<Response<pb::Empty>, Status> {
        self.gate().await?;
        let key = record_key(&require(request.into_inner().key, "key")?);
        let mut state = self.state.lock().unwrap();
        // Deleting an absent record is a success.
        state.records.remove(&key);
        Ok(Response::new(pb::Empty {}))
    }

    async fn is_indexed(
        &self,
        request: Request<pb::IsIndexedRequest>,
    ) -> Result<Response<pb::BoolResponse>, Status> {
        self.gate().await?;
        let req = request.into_inner();
        let key = record_key(&require(req.key, "key")?);
        let id = require(req.index_id, "index id")?;
        let index = index_key(&id);
        let state = self.state.lock().unwrap();
        if !state.indexes.contains_key(&index) {
            return Err(Status::not_found(format!("index {}/{}", index.0, index.1)));
        }
        let merged = state.unmerged.get(&index).copied().unwrap_or(0) == 0;
        Ok(Response::new(pb::BoolResponse {
            value: merged && state.records.contains_key(&key),
        }))
    }

    async fn vector_search(
        &self,
        request: Request<pb::VectorSearchRequest>,
    ) -> Result<Response<pb::VectorSearchResponse>, Status> {
        self.gate().await?;
        let req = request.into_inner();
        let id = require(req.index_id, "index id")?;
        let index = index_key(&id);
        let query = require(req.query, "query vector")?.values;

        let state = self.state.lock().unwrap();
        let definition = state
            .indexes
            .get(&index)
            .ok_or_else(|| Status::not_found(format!("index {}/{}", index.0, index.1)))?;
        let vector_field = definition.field.clone();

        let mut scored: Vec<(f32, RecordKey, Vec<pb::Field>)> = Vec::new();
        for (key, fields) in &state.records {
            if key.0 != index.0 {
                continue;
            }
            let Some(value) = fields.get(&vector_field) else {
                continue;
            };
            let Some(pb::value::Kind::Vector(vector)) = &value.kind else {
                continue;
            };
            if vector.values.len() != query.len() {
                continue;
            }
            let distance: f32 = vector
                .values
                .iter()
                .zip(&query)
                .map(|(a, b)| (a - b) * (a - b))
                .sum();
            scored.push((distance, key.clone(), project(fields, &req.field_names)));
        }

        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(req.limit as usize);

        let neighbors = scored
            .into_iter()
            .map(|(distance, key, fields)| pb::Neighbor {
                digest: format!("{}|{}|{}", key.0, key.1.as_deref().unwrap_or(""), key.2)
                    .into_bytes(),
                key: Some(pb::Key {
                    namespace: key.0,
                    set: key.1,
                    key: key.2,
                }),
                record: Some(pb::Record { fields }),
                distance,
            })
            .collect();

        Ok(Response::new(pb::VectorSearchResponse { neighbors }))
    }
}

/// Serve the fake on a random loopback port and return its address.
pub async fn spawn(fake: FakeProxiDb) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let incoming = TcpListenerStream::new(listener);
    tokio::spawn(async move {
        Server::builder()
            .add_service(AdminServiceServer::new(fake.clone()))
            .add_service(DataServiceServer::new(fake))
            .serve_with_incoming(incoming)
            .await
            .unwrap();
    });
    addr
}

pub fn config_for(addr: SocketAddr) -> ClientConfig {
    ClientConfig::new(HostPort::new("127.0.0.1", addr.port()))
}
