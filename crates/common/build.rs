//! Build script for generating the graph engine gRPC client

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=../../proto/semantic_engine.proto");

    tonic_build::configure()
        .build_server(false)
        .build_client(true)
        .compile_protos(&["../../proto/semantic_engine.proto"], &["../../proto"])?;

    Ok(())
}
