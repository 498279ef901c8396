use anyhow::Result;
use clap::Parser;
use tracing::{debug, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use kernel_connectors::cli::{Commands, MemoryBackend, Provider};
use kernel_connectors::connector::api::{Container, ContainerConfig, Router};

#[derive(Parser)]
#[command(name = "kconnect")]
#[command(author, version, about = "Chat, embedding, media and vector-memory connectors", long_about = None)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    #[arg(short, long, global = true, value_enum, default_value = "openai")]
    provider: Provider,

    #[arg(short, long, global = true, value_enum, default_value = "volatile")]
    memory: MemoryBackend,

    /// Use deterministic local embeddings instead of the provider's
    #[arg(long, global = true)]
    mock_embeddings: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    debug!("Provider: {:?}, memory: {:?}", cli.provider, cli.memory);

    let container = Container::new(ContainerConfig {
        provider: cli.provider,
        memory: cli.memory,
        mock_embeddings: cli.mock_embeddings,
    })?;
    let router = Router::new(&container);

    let output = router.route(cli.command).await?;
    if !output.is_empty() {
        println!("{}", output);
    }

    Ok(())
}
