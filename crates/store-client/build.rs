fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Client and server stubs; the server side is only used by mock stores in tests
    tonic_build::compile_protos("../../proto/stores.proto")?;
    println!("cargo:rerun-if-changed=../../proto/stores.proto");
    Ok(())
}
