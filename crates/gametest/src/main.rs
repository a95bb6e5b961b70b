//! Binary entry point for the gametest runner.

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    lib_gametest::init().await
}
