use clap::{Parser, Subcommand};
use indicatif::ProgressBar;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;
use stripe_mcp_client::config::Config;
use stripe_mcp_client::server::PaymentServer;
use stripe_mcp_client::{Result, SessionConfig, StripeMcpClient, StripeMcpError};
use tokio::io::BufReader;

#[derive(Parser)]
#[command(name = "stripe-mcp")]
#[command(about = "Create Stripe payment links through Stripe's MCP server", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate example configuration file
    Init {
        /// Output path for config file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List tools exposed by the Stripe MCP server
    ListTools,

    /// Create a payment link
    Create {
        /// Price id for a single line item
        #[arg(long, required_unless_present = "payload", conflicts_with = "payload")]
        price: Option<String>,

        /// Quantity of the line item
        #[arg(long, default_value_t = 1)]
        quantity: u64,

        /// Redirect here after checkout completes
        #[arg(long, conflicts_with = "payload")]
        redirect_url: Option<String>,

        /// Raw JSON arguments for paymentLinks.create
        #[arg(long)]
        payload: Option<String>,
    },

    /// Run an MCP server on stdio exposing create_checkout_link
    Serve,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout is reserved for command output and, under `serve`, protocol traffic
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "stripe_mcp_client={0},stripe_mcp={0}",
            log_level
        ))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init { output } => {
            let output_path = match output.or_else(Config::default_path) {
                Some(path) => path,
                None => {
                    return Err(StripeMcpError::Config(
                        "Cannot determine home directory, pass --output".to_string(),
                    ))
                }
            };

            if let Some(parent) = output_path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            std::fs::write(&output_path, Config::example()?)
                .map_err(|e| StripeMcpError::Config(format!("Failed to write config: {}", e)))?;

            println!("✅ Created example config at: {}", output_path.display());
            println!("Edit this file and add your Stripe API key");
            Ok(())
        }

        Commands::ListTools => {
            let config = Config::load(cli.config)?;
            let client = build_client(&config, cli.verbose)?;

            let tools = client.list_tools().await;
            client.close().await;
            let tools = tools?;

            println!("Found {} tools:", tools.len());
            println!();
            for tool in tools {
                println!("📦 {}", tool.name);
                if let Some(description) = tool.description {
                    println!("   {}", description);
                }
                println!();
            }

            Ok(())
        }

        Commands::Create {
            price,
            quantity,
            redirect_url,
            payload,
        } => {
            let params = match payload {
                Some(raw) => serde_json::from_str::<Value>(&raw)?,
                None => line_item_payload(price, quantity, redirect_url)?,
            };

            let config = Config::load(cli.config)?;
            let client = build_client(&config, cli.verbose)?;

            let spinner = ProgressBar::new_spinner();
            spinner.set_message("Connecting to Stripe MCP server...");
            spinner.enable_steady_tick(Duration::from_millis(100));

            let connected = client.connect().await;
            spinner.finish_and_clear();

            let created = match connected {
                Ok(()) => client.create_payment_link(params).await,
                Err(e) => Err(e),
            };
            client.close().await;
            let response = created?;

            println!("{}", serde_json::to_string_pretty(&response)?);
            if let Some(link) = response.payment_link() {
                println!();
                println!("🔗 {}", link.url);
            }

            Ok(())
        }

        Commands::Serve => {
            let config = Config::load(cli.config)?;
            let verbose = cli.verbose;
            let server = PaymentServer::new(move || build_client(&config, verbose));

            server
                .serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
                .await
        }

        Commands::Version => {
            println!("stripe-mcp v{}", env!("CARGO_PKG_VERSION"));
            println!("Create Stripe payment links through Stripe's MCP server");
            Ok(())
        }
    }
}

fn build_client(config: &Config, verbose: bool) -> Result<StripeMcpClient> {
    let mut options = config.stripe.clone();
    options.debug |= verbose;

    let session = SessionConfig::resolve(options)?.with_launcher(config.launcher.clone());
    Ok(StripeMcpClient::from_config(session))
}

fn line_item_payload(
    price: Option<String>,
    quantity: u64,
    redirect_url: Option<String>,
) -> Result<Value> {
    let price = price.ok_or_else(|| {
        StripeMcpError::Config("Either --price or --payload is required".to_string())
    })?;

    let mut params = json!({
        "line_items": [{ "price": price, "quantity": quantity }]
    });

    if let Some(url) = redirect_url {
        params["after_completion"] = json!({
            "type": "redirect",
            "redirect": { "url": url }
        });
    }

    Ok(params)
}
