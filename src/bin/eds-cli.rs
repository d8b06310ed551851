use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "eds-cli")]
#[command(about = "Management CLI for the weighted-eds control plane", long_about = None)]
struct Cli {
    #[arg(short, long, env = "WEIGHTED_EDS_URL", default_value = "http://localhost:18000")]
    url: String,

    #[arg(short, long, env = "WEIGHTED_EDS_ADMIN_KEY", default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check control plane status
    Status,
    /// List nodes and their snapshot versions
    Snapshots,
    /// Show the full snapshot served to one node
    Snapshot { node: String },
    /// Show reconciler state and counters
    Reconciler,
    /// Fetch resources as a proxy would (no admin key needed)
    Discover {
        /// clusters, listeners, routes or endpoints
        #[arg(default_value = "endpoints")]
        resource: String,
        #[arg(short, long, default_value = "envoy-node")]
        node: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let res = match &cli.command {
        Commands::Status => admin_get(&client, base, "status", headers).await?,
        Commands::Snapshots => admin_get(&client, base, "snapshots", headers).await?,
        Commands::Snapshot { node } => {
            admin_get(&client, base, &format!("snapshots/{}", node), headers).await?
        }
        Commands::Reconciler => admin_get(&client, base, "reconciler", headers).await?,
        Commands::Discover { resource, node } => {
            client
                .post(format!("{}/v3/discovery:{}", base, resource))
                .json(&json!({ "node": { "id": node } }))
                .send()
                .await?
        }
    };
    print_response(res).await
}

async fn admin_get(
    client: &reqwest::Client,
    base: &str,
    path: &str,
    headers: HeaderMap,
) -> Result<reqwest::Response, reqwest::Error> {
    client
        .get(format!("{}/admin/{}", base, path))
        .headers(headers)
        .send()
        .await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: control plane returned status {}", status);
        if let Ok(text) = res.text().await {
            if !text.is_empty() {
                eprintln!("Response: {}", text);
            }
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
