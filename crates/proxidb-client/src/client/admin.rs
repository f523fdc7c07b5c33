//! Admin client: index lifecycle and user management.

use std::time::Duration;

use tonic::transport::Channel;

use crate::client::transport::Transport;
use crate::config::{ClientConfig, HostPort};
use crate::error::{ClientError, Result};
use crate::types::{HnswParams, IndexDefinition, IndexStorage, User};
use proxidb_proto::admin_service_client::AdminServiceClient;
use proxidb_proto::proxidb as pb;

/// Client for the ProxiDB admin service.
///
/// All methods take `&self`; calls multiplex freely on the underlying
/// channel. Every method accepts an optional per-call timeout overriding the
/// configured default.
#[derive(Debug)]
pub struct AdminClient {
    transport: Transport,
    stub: AdminServiceClient<Channel>,
}

impl AdminClient {
    /// Create a new admin client with the given configuration
    pub async fn new(config: ClientConfig) -> Result<Self> {
        let transport = Transport::connect(&config).await?;
        let stub = AdminServiceClient::new(transport.channel());
        Ok(Self { transport, stub })
    }

    /// Create a new admin client with default configuration
    pub async fn default() -> Result<Self> {
        Self::new(ClientConfig::default()).await
    }

    /// Create a new admin client connected to the given `host:port` seed
    pub async fn connect(seed: &str) -> Result<Self> {
        let seed: HostPort = seed
            .parse()
            .map_err(ClientError::Configuration)?;
        Self::new(ClientConfig::new(seed)).await
    }

    /// Create an index over a vector field.
    #[allow(clippy::too_many_arguments)]
    pub async fn index_create(
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
        let message = pb::IndexCreateRequest {
            definition: Some(pb::IndexDefinition {
                id: Some(pb::IndexId { namespace, name }),
                field: vector_field,
                dimensions,
                set_filter,
                hnsw_params: params.as_ref().map(Into::into),
                storage: storage.as_ref().map(Into::into),
            }),
        };
        let stub = self.stub.clone();
        self.transport
            .invoke(timeout, || {
                let mut stub = stub.clone();
                let request = self.transport.prepare(message.clone(), timeout);
                async move { stub.index_create(request).await }
            })
            .await?;
        Ok(())
    }

    /// Drop an index. Dropping a nonexistent index is a server error.
    pub async fn index_drop(
        &self,
        namespace: String,
        name: String,
        timeout: Option<Duration>,
    ) -> Result<()> {
        let message = pb::IndexDropRequest {
            index_id: Some(pb::IndexId { namespace, name }),
        };
        let stub = self.stub.clone();
        self.transport
            .invoke(timeout, || {
                let mut stub = stub.clone();
                let request = self.transport.prepare(message.clone(), timeout);
                async move { stub.index_drop(request).await }
            })
            .await?;
        Ok(())
    }

    /// Fetch a single index definition.
    pub async fn index_get(
        &self,
        namespace: String,
        name: String,
        timeout: Option<Duration>,
    ) -> Result<IndexDefinition> {
        let message = pb::IndexGetRequest {
            index_id: Some(pb::IndexId { namespace, name }),
        };
        let stub = self.stub.clone();
        let definition = self
            .transport
            .invoke(timeout, || {
                let mut stub = stub.clone();
                let request = self.transport.prepare(message.clone(), timeout);
                async move { stub.index_get(request).await }
            })
            .await?;
        definition.try_into()
    }

    /// Number of records written but not yet merged into the index. Zero when
    /// the index has caught up.
    pub async fn index_get_status(
        &self,
        namespace: String,
        name: String,
        timeout: Option<Duration>,
    ) -> Result<i64> {
        let message = pb::IndexStatusRequest {
            index_id: Some(pb::IndexId { namespace, name }),
        };
        let stub = self.stub.clone();
        let status = self
            .transport
            .invoke(timeout, || {
                let mut stub = stub.clone();
                let request = self.transport.prepare(message.clone(), timeout);
                async move { stub.index_get_status(request).await }
            })
            .await?;
        Ok(status.unmerged_record_count)
    }

    /// List all indexes. With `apply_defaults` the server fills unset HNSW
    /// and batching parameters with its defaults.
    pub async fn index_list(
        &self,
        apply_defaults: bool,
        timeout: Option<Duration>,
    ) -> Result<Vec<IndexDefinition>> {
        let message = pb::IndexListRequest {
            apply_defaults: Some(apply_defaults),
        };
        let stub = self.stub.clone();
        let response = self
            .transport
            .invoke(timeout, || {
                let mut stub = stub.clone();
                let request = self.transport.prepare(message.clone(), timeout);
                async move { stub.index_list(request).await }
            })
            .await?;
        response
            .indices
            .into_iter()
            .map(TryInto::try_into)
            .collect()
    }

    /// Create a user with the given roles.
    pub async fn add_user(
        &self,
        username: String,
        password: String,
        roles: Vec<String>,
        timeout: Option<Duration>,
    ) -> Result<()> {
        let message = pb::AddUserRequest {
            username,
            password,
            roles,
        };
        let stub = self.stub.clone();
        self.transport
            .invoke(timeout, || {
                let mut stub = stub.clone();
                let request = self.transport.prepare(message.clone(), timeout);
                async move { stub.add_user(request).await }
            })
            .await?;
        Ok(())
    }

    /// Replace a user's password.
    pub async fn update_credentials(
        &self,
        username: String,
        password: String,
        timeout: Option<Duration>,
    ) -> Result<()> {
        let message = pb::UpdateCredentialsRequest { username, password };
        let stub = self.stub.clone();
        self.transport
            .invoke(timeout, || {
                let mut stub = stub.clone();
                let request = self.transport.prepare(message.clone(), timeout);
                async move { stub.update_credentials(request).await }
            })
            .await?;
        Ok(())
    }

    /// Remove a user.
    pub async fn drop_user(&self, username: String, timeout: Option<Duration>) -> Result<()> {
        let message = pb::DropUserRequest { username };
        let stub = self.stub.clone();
        self.transport
            .invoke(timeout, || {
                let mut stub = stub.clone();
                let request = self.transport.prepare(message.clone(), timeout);
                async move { stub.drop_user(request).await }
            })
            .await?;
        Ok(())
    }

    /// Fetch a user and its roles.
    pub async fn get_user(&self, username: String, timeout: Option<Duration>) -> Result<User> {
        let message = pb::GetUserRequest { username };
        let stub = self.stub.clone();
        let user = self
            .transport
            .invoke(timeout, || {
                let mut stub = stub.clone();
                let request = self.transport.prepare(message.clone(), timeout);
                async move { stub.get_user(request).await }
            })
            .await?;
        Ok(user.into())
    }

    /// List all users.
    pub async fn list_users(&self, timeout: Option<Duration>) -> Result<Vec<User>> {
        let stub = self.stub.clone();
        let response = self
            .transport
            .invoke(timeout, || {
                let mut stub = stub.clone();
                let request = self.transport.prepare(pb::Empty {}, timeout);
                async move { stub.list_users(request).await }
            })
            .await?;
        Ok(response.users.into_iter().map(Into::into).collect())
    }

    /// List all role names known to the server.
    pub async fn list_roles(&self, timeout: Option<Duration>) -> Result<Vec<String>> {
        let stub = self.stub.clone();
        let response = self
            .transport
            .invoke(timeout, || {
                let mut stub = stub.clone();
                let request = self.transport.prepare(pb::Empty {}, timeout);
                async move { stub.list_roles(request).await }
            })
            .await?;
        Ok(response.roles)
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
