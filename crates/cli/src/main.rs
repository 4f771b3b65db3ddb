use clap::{Parser, Subcommand};
use octogate_core::config::AppConfig;
use octogate_github::transport::HttpTransport;
use octogate_github::{Gateway, ToolRegistry};
use octogate_server::McpServer;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

const VERSION: &str = "0.1.0";

#[derive(Parser)]
#[command(name = "octogate")]
#[command(version = VERSION)]
#[command(about = "GitHub tool gateway speaking MCP over stdio")]
struct Cli {
    /// Path to the config file (defaults to ~/.octogate/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the stdio server (default)
    Serve,
    /// List the registered tools
    Tools,
    /// Invoke a single tool and print the result
    Call {
        /// Tool name
        tool: String,
        /// Tool arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr: stdout belongs to the protocol.
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()),
        );

    tracing_subscriber::registry().with(stderr_layer).init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Tools => {
            let registry = ToolRegistry::new();
            for def in registry.list_definitions() {
                println!(
                    "{:<24} {}",
                    def["name"].as_str().unwrap_or_default(),
                    def["description"].as_str().unwrap_or_default()
                );
            }
            Ok(())
        }
        Commands::Serve => {
            let gateway = build_gateway(cli.config)?;
            McpServer::new(Arc::new(gateway)).run().await
        }
        Commands::Call { tool, args } => {
            let gateway = build_gateway(cli.config)?;
            let raw: serde_json::Value = serde_json::from_str(&args)
                .map_err(|e| anyhow::anyhow!("--args must be a JSON object: {}", e))?;
            match gateway.dispatch(&tool, raw).await {
                Ok(value) => {
                    println!("{}", serde_json::to_string_pretty(&value)?);
                    Ok(())
                }
                Err(e) => Err(anyhow::anyhow!(e)),
            }
        }
    }
}

fn build_gateway(config_path: Option<PathBuf>) -> anyhow::Result<Gateway> {
    let config = AppConfig::load(config_path)
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    if config.github.token.is_empty() {
        anyhow::bail!(
            "No GitHub token configured. Set GITHUB_PERSONAL_ACCESS_TOKEN or github.token in the config file."
        );
    }

    info!("GitHub API base: {}", config.github.api_base);

    let transport = HttpTransport::new(config.github.token, config.github.api_base)
        .map_err(|e| anyhow::anyhow!("Failed to build HTTP transport: {}", e))?;
    Ok(Gateway::new(ToolRegistry::new(), Arc::new(transport)))
}
