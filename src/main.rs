use grapher_web::config::{Config, DEFAULT_CONFIG_FILE};
use grapher_web::server::{signal, Server};
use grapher_web::{logger, Result};

fn main() {
    if let Err(e) = run() {
        eprintln!("[ERROR] {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Optional positional argument: config file path without extension
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());
    let cfg = Config::load_from(&config_path)?;
    logger::init(&cfg)?;

    // One connection at a time, so a single-threaded runtime is all we need
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<()> {
    let server = Server::start(cfg)?;
    let shutdown = server.shutdown_handle();

    tokio::spawn(async move {
        match signal::wait_for_shutdown().await {
            Ok(name) => {
                logger::log_warning(&format!("{name} received, shutting down"));
                shutdown.stop();
            }
            Err(e) => logger::log_error(&format!("Failed to register signal handlers: {e}")),
        }
    });

    server.run().await
}
