fn main() -> anyhow::Result<()> {
    // Environment first so RUST_LOG from .env reaches the subscriber
    dotenvy::dotenv().ok();
    arix_server::init_tracing();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(arix_server::run_server())
}
