use product_search_agent::agent::Agent;
use product_search_agent::auth;
use product_search_agent::config::{self, ModelConfig, SearchConfig};
use product_search_agent::models::GeminiProvider;
use product_search_agent::product_agent;
use product_search_agent::search::DiscoveryEngineClient;
use product_search_agent::tools::builtins::product_search::{ProductSearch, DEFAULT_MAX_RESULTS};

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "product-search-agent",
    version,
    about = "Product recommendations from a Vertex AI Search data store"
)]
struct Cli {
    /// Load environment variables from this file instead of ./.env
    #[arg(long, global = true, env = "PRODUCT_SEARCH_ENV_FILE")]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask the agent a question and print its final answer
    Ask {
        /// The question, e.g. "wireless earbuds under $100"
        query: String,
    },
    /// Run the product search tool directly, without the model
    Search {
        query: String,
        /// Maximum number of products to return
        #[arg(long, default_value_t = DEFAULT_MAX_RESULTS)]
        max_results: i32,
    },
    /// Print the resolved configuration
    Config,
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // stdout carries answers only
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn build_product_search(cfg: &SearchConfig) -> anyhow::Result<ProductSearch> {
    let client = DiscoveryEngineClient::new(cfg, auth::token_source_from_env())
        .context("failed to build Discovery Engine client")?;
    Ok(ProductSearch::new(Arc::new(client), cfg.serving_config.clone()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // before tracing so RUST_LOG may come from the env file
    config::load_dotenv(cli.env_file.as_deref())?;
    init_tracing();

    let search_cfg = SearchConfig::from_env().context("invalid search configuration")?;
    info!(
        project = %search_cfg.project_id,
        location = %search_cfg.location,
        datastore = %search_cfg.datastore_id,
        "configuration loaded"
    );

    match cli.command {
        Command::Ask { query } => {
            let model_cfg = ModelConfig::from_env().context("invalid model configuration")?;
            let provider = GeminiProvider::from_config(&model_cfg)?;
            let search = build_product_search(&search_cfg)?;
            let agent: Agent = product_agent::build_root_agent(Arc::new(provider), search);
            if product_agent::call_agent_async(Arc::new(agent), &query)
                .await?
                .is_none()
            {
                anyhow::bail!("agent finished without a final answer");
            }
        }
        Command::Search { query, max_results } => {
            let search = build_product_search(&search_cfg)?;
            let summary = search
                .retrieve_product_details_from_search(&query, max_results)
                .await;
            println!("{summary}");
        }
        Command::Config => {
            println!("project:        {}", search_cfg.project_id);
            println!("location:       {}", search_cfg.location);
            println!("datastore:      {}", search_cfg.datastore_id);
            println!("serving config: {}", search_cfg.serving_config);
            println!("endpoint:       {}", search_cfg.api_endpoint);
            match ModelConfig::from_env() {
                Ok(m) => {
                    println!("model:          {}", m.model);
                    println!("model endpoint: {}", m.endpoint);
                }
                Err(e) => println!("model:          unavailable ({e})"),
            }
        }
    }

    Ok(())
}
