#[tokio::main]
async fn main() {
    if let Err(e) = realm_server::run_with_config().await {
        tracing::error!(error = %e, "server failed");
        std::process::exit(1);
    }
}
