//! # proxidb-client
//!
//! Client library for the ProxiDB vector search service. This crate provides
//! gRPC clients for the admin plane (index lifecycle, user management) and
//! the data plane (record writes, reads, vector search).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use proxidb_client::{Client, Key, Record, Value};
//! use std::error::Error;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn Error>> {
//!     // Create a client with default configuration (localhost:50051)
//!     let client = Client::default().await?;
//!
//!     let key = Key::with_set("prod", "items", "item-1");
//!     let record: Record = [("embedding", Value::from(vec![0.1f32, 0.4, 0.3]))]
//!         .into_iter()
//!         .collect();
//!     client.upsert(&key, &record, None).await?;
//!
//!     let neighbors = client
//!         .vector_search(
//!             "prod".to_string(),
//!             "item-index".to_string(),
//!             vec![0.1, 0.4, 0.3],
//!             10,
//!             None,
//!             None,
//!             None,
//!         )
//!         .await?;
//!     for neighbor in neighbors {
//!         println!("{} at distance {}", neighbor.key.key, neighbor.distance);
//!     }
//!
//!     client.close();
//!     Ok(())
//! }
//! ```
//!
//! A blocking flavor of both clients lives in the [`blocking`] module.

pub mod client;
pub mod config;
pub mod error;
pub mod types;

mod channel;
mod retry;

pub use client::admin::AdminClient;
pub use client::blocking;
pub use client::data::Client;
pub use config::{ClientConfig, Credentials, HostPort};
pub use error::{ClientError, Result};
pub use types::{
    HnswBatchingParams, HnswParams, HnswSearchParams, IndexDefinition, IndexId, IndexStorage, Key,
    Neighbor, Record, User, Value,
};

// Re-export messages from the proto crate for convenience
pub use proxidb_proto::proxidb::{
    BoolResponse, DeleteRequest, Empty, ExistsRequest, GetRequest, IndexCreateRequest,
    IndexDropRequest, IndexGetRequest, IndexListRequest, IndexListResponse, IndexStatusRequest,
    IndexStatusResponse, IsIndexedRequest, PutRequest, VectorSearchRequest, VectorSearchResponse,
    WriteType,
};
