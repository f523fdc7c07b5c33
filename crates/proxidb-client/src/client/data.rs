//! Data client: record writes, reads, and vector search.

use std::time::Duration;

use futures::future::join_all;
use tonic::transport::Channel;

use crate::client::transport::Transport;
use crate::config::{ClientConfig, HostPort};
use crate::error::{ClientError, Result};
use crate::types::{fields_to_proto, HnswSearchParams, Key, Neighbor, Record};
use proxidb_proto::admin_service_client::AdminServiceClient;
use proxidb_proto::data_service_client::DataServiceClient;
use proxidb_proto::proxidb as pb;

/// How often `indexes_in_sync` polls the index statuses.
const SYNC_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Client for the ProxiDB data service.
///
/// All methods take `&self`; calls multiplex freely on the underlying
/// channel. Every method accepts an optional per-call timeout overriding the
/// configured default.
#[derive(Debug)]
pub struct Client {
    transport: Transport,
    stub: DataServiceClient<Channel>,
    // Index status polling for indexes_in_sync rides the same channel.
    admin_stub: AdminServiceClient<Channel>,
}

impl Client {
    /// Create a new data client with the given configuration
    pub async fn new(config: ClientConfig) -> Result<Self> {
        let transport = Transport::connect(&config).await?;
        let stub = DataServiceClient::new(transport.channel());
        let admin_stub = AdminServiceClient::new(transport.channel());
        Ok(Self {
            transport,
            stub,
            admin_stub,
        })
    }

    /// Create a new data client with default configuration
    pub async fn default() -> Result<Self> {
        Self::new(ClientConfig::default()).await
    }

    /// Create a new data client connected to the given `host:port` seed
    pub async fn connect(seed: &str) -> Result<Self> {
        let seed: HostPort = seed
            .parse()
            .map_err(ClientError::Configuration)?;
        Self::new(ClientConfig::new(seed)).await
    }

    async fn write(
        &self,
        key: &Key,
        record: &Record,
        write_type: pb::WriteType,
        timeout: Option<Duration>,
    ) -> Result<()> {
        let message = pb::PutRequest {
            key: Some(key.into()),
            write_type: write_type as i32,
            fields: fields_to_proto(record),
        };
        let stub = self.stub.clone();
        self.transport
            .invoke(timeout, || {
                let mut stub = stub.clone();
                let request = self.transport.prepare(message.clone(), timeout);
                async move { stub.put(request).await }
            })
            .await?;
        Ok(())
    }

    /// Write a full record, replacing any existing fields.
    pub async fn put(&self, key: &Key, record: &Record, timeout: Option<Duration>) -> Result<()> {
        self.write(key, record, pb::WriteType::Replace, timeout).await
    }

    /// Merge the given fields into the record, creating it if absent.
    pub async fn upsert(
        &self,
        key: &Key,
        record: &Record,
        timeout: Option<Duration>,
    ) -> Result<()> {
        self.write(key, record, pb::WriteType::Upsert, timeout).await
    }

    /// Write a new record. Fails with an already-exists status when the key
    /// is already present.
    pub async fn insert(
        &self,
        key: &Key,
        record: &Record,
        timeout: Option<Duration>,
    ) -> Result<()> {
        self.write(key, record, pb::WriteType::InsertOnly, timeout)
            .await
    }

    /// Read a record. An absent key is a not-found server error, never an
    /// empty record. An empty `field_names` projection returns all fields.
    pub async fn get(
        &self,
        key: &Key,
        field_names: Option<Vec<String>>,
        timeout: Option<Duration>,
    ) -> Result<Record> {
        let message = pb::GetRequest {
            key: Some(key.into()),
            field_names: field_names.unwrap_or_default(),
        };
        let stub = self.stub.clone();
        let record = self
            .transport
            .invoke(timeout, || {
                let mut stub = stub.clone();
                let request = self.transport.prepare(message.clone(), timeout);
                async move { stub.get(request).await }
            })
            .await?;
        record.try_into()
    }

    /// Whether a record exists under the key.
    pub async fn exists(&self, key: &Key, timeout: Option<Duration>) -> Result<bool> {
        let message = pb::ExistsRequest {
            key: Some(key.into()),
        };
        let stub = self.stub.clone();
        let response = self
            .transport
            .invoke(timeout, || {
                let mut stub = stub.clone();
                let request = self.transport.prepare(message.clone(), timeout);
                async move { stub.exists(request).await }
            })
            .await?;
        Ok(response.value)
    }

    /// Delete a record. Deleting an absent key succeeds; delete is
    /// idempotent.
    pub async fn delete(&self, key: &Key, timeout: Option<Duration>) -> Result<()> {
        let message = pb::DeleteRequest {
            key: Some(key.into()),
        };
        let stub = self.stub.clone();
        self.transport
            .invoke(timeout, || {
                let mut stub = stub.clone();
                let request = self.transport.prepare(message.clone(), timeout);
                async move { stub.delete(request).await }
            })
            .await?;
        Ok(())
    }

    /// Whether the record has been merged into the named index in the key's
    /// namespace.
    pub async fn is_indexed(
        &self,
        key: &Key,
        index_name: String,
        timeout: Option<Duration>,
    ) -> Result<bool> {
        let message = pb::IsIndexedRequest {
            key: Some(key.into()),
            index_id: Some(pb::IndexId {
                namespace: key.namespace.clone(),
                name: index_name,
            }),
        };
        let stub = self.stub.clone();
        let response = self
            .transport
            .invoke(timeout, || {
                let mut stub = stub.clone();
                let request = self.transport.prepare(message.clone(), timeout);
                async move { stub.is_indexed(request).await }
            })
            .await?;
        Ok(response.value)
    }

    /// Nearest-neighbor search, ranked nearest first.
    #[allow(clippy::too_many_arguments)]
    pub async fn vector_search(
        &self,
        namespace: String,
        index_name: String,
        query: Vec<f32>,
        limit: u32,
        field_names: Option<Vec<String>>,
        search_params: Option<HnswSearchParams>,
        timeout: Option<Duration>,
    ) -> Result<Vec<Neighbor>> {
        let message = pb::VectorSearchRequest {
            index_id: Some(pb::IndexId {
                namespace,
                name: index_name,
            }),
            query: Some(pb::Vector { values: query }),
            limit,
            field_names: field_names.unwrap_or_default(),
            search_params: search_params.as_ref().map(Into::into),
        };
        let stub = self.stub.clone();
        let response = self
            .transport
            .invoke(timeout, || {
                let mut stub = stub.clone();
                let request = self.transport.prepare(message.clone(), timeout);
                async move { stub.vector_search(request).await }
            })
            .await?;
        response
            .neighbors
            .into_iter()
            .map(TryInto::try_into)
            .collect()
    }

    /// Block until every index has merged all pending writes, bounded by the
    /// timeout. Sync is declared after two consecutive all-zero polls so a
    /// write racing a merge cycle is not reported as caught up.
    pub async fn indexes_in_sync(&self, timeout: Option<Duration>) -> Result<()> {
        self.transport.ensure_open()?;
        match self.transport.effective_timeout(timeout) {
            Some(deadline) => tokio::time::timeout(deadline, self.wait_for_merge())
                .await
                .unwrap_or_else(|_| {
                    Err(ClientError::Server(tonic::Status::deadline_exceeded(
                        "indexes did not catch up within the deadline",
                    )))
                }),
            None => self.wait_for_merge().await,
        }
    }

    async fn wait_for_merge(&self) -> Result<()> {
        let mut synced_polls = 0u32;
        loop {
            if self.unmerged_total().await? == 0 {
                synced_polls += 1;
                if synced_polls >= 2 {
                    return Ok(());
                }
            } else {
                synced_polls = 0;
            }
            tokio::time::sleep(SYNC_POLL_INTERVAL).await;
        }
    }

    async fn unmerged_total(&self) -> Result<i64> {
        let list_stub = self.admin_stub.clone();
        let response = self
            .transport
            .invoke(None, || {
                let mut stub = list_stub.clone();
                let request = self.transport.prepare(
                    pb::IndexListRequest {
                        apply_defaults: Some(false),
                    },
                    None,
                );
                async move { stub.index_list(request).await }
            })
            .await?;

        let ids: Vec<pb::IndexId> = response.indices.into_iter().filter_map(|def| def.id).collect();
        let statuses = join_all(ids.into_iter().map(|id| self.poll_status(id))).await;

        let mut total = 0i64;
        for status in statuses {
            match status {
                Ok(count) => total += count,
                // An index dropped between list and status is not a sync failure.
                Err(err) if err.is_not_found() => {}
                Err(err) => return Err(err),
            }
        }
        Ok(total)
    }

    async fn poll_status(&self, id: pb::IndexId) -> Result<i64> {
        let stub = self.admin_stub.clone();
        let message = pb::IndexStatusRequest { index_id: Some(id) };
        let status = self
            .transport
            .invoke(None, || {
                let mut stub = stub.clone();
                let request = self.transport.prepare(message.clone(), None);
                async move { stub.index_get_status(request).await }
            })
            .await?;
        Ok(status.unmerged_record_count)
    }

    /// Close the client. Subsequent calls fail with [`ClientError::Closed`]
    /// without touching the network.
    pub fn close(&self) {
        self.transport.close()
    }

    pub fn is_closed(&self) -> bool {
        self.transport.is_closed()
    }
}
