use std::env;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if env::var_os("PROTOC").is_none() {
        env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
    }

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Tell cargo to rebuild if the proto file changes
    println!("cargo:rerun-if-changed=src/proto/proxidb.proto");

    // Configure tonic-build and chain calls
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .file_descriptor_set_path(out_dir.join("proxidb_descriptor.bin"))
        .compile_protos(&["src/proto/proxidb.proto"], &["src/proto"])?;

    Ok(())
}
