use audiomill_core::Config;

// Use mimalloc as the global allocator for better performance and lower
// fragmentation, especially when running on musl-based systems inside
// containers.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    audiomill_api::telemetry::init_tracing();

    // Initialize the application (database, services, routes, workers)
    let (_state, router, workers) = audiomill_api::setup::initialize_app(config.clone()).await?;

    // Start the server; workers are signalled to stop on shutdown
    audiomill_api::setup::server::start_server(&config, router, workers).await?;

    Ok(())
}
