//! edgeserve - Small Parameterized Edge Services
//!
//! This is the entry point for an edgeserve service instance. It parses the
//! service selection from the command line, resolves the startup secret
//! bundle from Vault, optionally starts the background file-creation task,
//! and runs the accept loop until shutdown.

use edgeserve::files::{FileCreator, FileCreatorConfig};
use edgeserve::{Dispatcher, LogSink, SecretBundle, ServiceConfig, VaultClient};
use tokio::signal;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Parses the service selection and overrides from command-line arguments
fn config_from_args() -> ServiceConfig {
    let mut service = None;
    let mut host = None;
    let mut port = None;
    let args: Vec<String> = std::env::args().collect();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--service" | "-s" => {
                if i + 1 < args.len() {
                    service = Some(match args[i + 1].as_str() {
                        "custom-client" => ServiceConfig::custom_client(),
                        "service-sink" => ServiceConfig::service_sink(),
                        other => {
                            eprintln!("Error: unknown service '{other}'");
                            std::process::exit(1);
                        }
                    });
                    i += 2;
                } else {
                    eprintln!("Error: --service requires a value");
                    std::process::exit(1);
                }
            }
            "--host" | "-h" => {
                if i + 1 < args.len() {
                    host = Some(args[i + 1].clone());
                    i += 2;
                } else {
                    eprintln!("Error: --host requires a value");
                    std::process::exit(1);
                }
            }
            "--port" | "-p" => {
                if i + 1 < args.len() {
                    port = Some(args[i + 1].parse().unwrap_or_else(|_| {
                        eprintln!("Error: invalid port number");
                        std::process::exit(1);
                    }));
                    i += 2;
                } else {
                    eprintln!("Error: --port requires a value");
                    std::process::exit(1);
                }
            }
            "--help" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-v" => {
                println!("edgeserve version {}", edgeserve::VERSION);
                std::process::exit(0);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
    }

    let mut service = service.unwrap_or_else(ServiceConfig::custom_client);
    if let Some(host) = host {
        service.host = host;
    }
    if let Some(port) = port {
        service.port = port;
    }
    service
}

fn print_help() {
    println!(
        r#"
edgeserve - Small Parameterized Edge Services

USAGE:
    edgeserve [OPTIONS]

OPTIONS:
    -s, --service <NAME>    Service preset: custom-client | service-sink
                            (default: custom-client)
    -h, --host <HOST>       Host to bind to (default: 0.0.0.0)
    -p, --port <PORT>       Port to listen on (default: per preset)
    -v, --version           Print version information
        --help              Print this help message

ENVIRONMENT:
    VAULT_ADDR              Vault address
    VAULT_TOKEN             Static Vault token for the fallback tier
    LOGTHON_HOST/PORT       Log collector endpoint
    FILE_STORAGE_URL        File storage API (custom-client only)

EXAMPLES:
    edgeserve                              # custom-client on 0.0.0.0:1337
    edgeserve --service service-sink       # service-sink on 0.0.0.0:8080
    edgeserve -s service-sink -p 9090      # override the port
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let service = config_from_args();

    // Set up logging
    let _subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    info!(
        service = %service.name,
        version = edgeserve::VERSION,
        "Service starting up"
    );

    let sink = LogSink::from_env(service.name.clone());
    sink.send("INFO", &format!("{} service starting up", service.name))
        .await;

    // Resolve the startup secret bundle; defaults keep us going when Vault
    // is unreachable.
    let vault = VaultClient::from_env(format!("{}-role", service.name));
    let secrets = SecretBundle::fetch(&vault, &service.name).await;
    secrets.log_summary();
    if !secrets.complete {
        warn!("Continuing with default values for unresolved secrets");
    }

    // Pre-create the request capture directory; the writer also creates it
    // on demand.
    if let Err(e) = tokio::fs::create_dir_all(&service.capture_dir).await {
        warn!(error = %e, "Failed to create request capture directory");
    }

    // The custom-client preset runs the periodic file-creation task
    // alongside the accept loop. It shares no state with it.
    let _file_creator = if service.name == "custom-client" {
        Some(FileCreator::start(FileCreatorConfig::from_env()))
    } else {
        None
    };

    let dispatcher = Dispatcher::new(service, sink);

    // Set up graceful shutdown
    let shutdown = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Shutdown signal received, stopping service...");
    };

    tokio::select! {
        result = dispatcher.run() => { result?; }
        _ = shutdown => {}
    }

    info!("Service shutdown complete");
    Ok(())
}
