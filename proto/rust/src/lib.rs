/// This crate contains the generated Protocol Buffer code for the ProxiDB
/// gRPC services.
///
/// It is generated from the `proxidb.proto` file.

// Include the generated code
pub mod proxidb {
    include!(concat!(env!("OUT_DIR"), "/proxidb.rs"));
}

// Re-export the services
pub use proxidb::admin_service_client;
pub use proxidb::admin_service_server;
pub use proxidb::data_service_client;
pub use proxidb::data_service_server;

// File descriptor set for reflection
pub const FILE_DESCRIPTOR_SET: &[u8] = include_bytes!(concat!(
    env!("OUT_DIR"),
    "/proxidb_descriptor.bin"
));
