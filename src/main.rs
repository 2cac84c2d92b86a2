use clap::Parser;
use deploy_runtime::{DeploySettings, DeploymentService, ProcessRunner};
use deploy_server::{create_app, run_server, RateLimit, RateLimits, ServerConfig};
use std::{fs::OpenOptions, net::SocketAddr, path::PathBuf, sync::Arc, sync::Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to listen on
    #[arg(short, long, default_value = "0.0.0.0:5000")]
    addr: SocketAddr,

    /// Shared secret expected as `Authorization: Bearer <key>`
    #[arg(long, env = "KEY", hide_env_values = true)]
    key: Option<String>,

    /// Container runtime binary
    #[arg(long, default_value = "podman")]
    runtime: String,

    /// Image reference, `{}` is replaced by the deployment reference
    #[arg(long, default_value = "ghcr.io/corewar-teamprojekt/aio:{}")]
    image_template: String,

    /// Domain the per-reference subdomains live under
    #[arg(long, default_value = "corewar.shonk.software")]
    domain_suffix: String,

    /// Network containers are attached to
    #[arg(long, default_value = "web")]
    network: String,

    /// Port the application listens on inside the container
    #[arg(long, default_value = "80")]
    container_port: u16,

    /// Append-only audit log
    #[arg(long, default_value = "deployment.log")]
    log_file: PathBuf,

    /// Requests per client per day, across deployment routes
    #[arg(long, default_value = "250")]
    daily_limit: u32,

    /// Requests per client per hour, across deployment routes
    #[arg(long, default_value = "15")]
    hourly_limit: u32,

    /// Deletions per client per hour
    #[arg(long, default_value = "1")]
    delete_hourly_limit: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&args.log_file)?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(Mutex::new(log_file)),
        )
        .init();

    let settings = DeploySettings::new(args.image_template, args.domain_suffix)?
        .with_runtime(args.runtime)
        .with_network(args.network)
        .with_container_port(args.container_port);
    tracing::info!(?settings, "Loaded deployment settings");

    let config = ServerConfig::new(args.key).with_rate_limits(RateLimits {
        global: vec![
            RateLimit::per_day(args.daily_limit),
            RateLimit::per_hour(args.hourly_limit),
        ],
        delete: vec![RateLimit::per_hour(args.delete_hourly_limit)],
    });

    let service = DeploymentService::new(settings, Arc::new(ProcessRunner::new()));
    let app = create_app(service, config);
    run_server(app, args.addr).await?;

    Ok(())
}
