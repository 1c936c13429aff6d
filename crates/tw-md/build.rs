fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Only the client side of the downstream service is used.
    tonic_prost_build::configure()
        .build_server(false)
        .build_client(true)
        .compile_protos(&["../../proto/sync.proto"], &["../../proto"])?;

    println!("cargo:rerun-if-changed=../../proto");
    Ok(())
}
