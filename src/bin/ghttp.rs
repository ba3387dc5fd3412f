use std::process::ExitCode;

use clap::{Parser, Subcommand};
use reqwest::Method;
use serde_json::Value;

use graceful_http::http::{join_url, new_request, send};

#[derive(Parser)]
#[command(name = "ghttp")]
#[command(about = "Send JSON requests and pretty-print JSON responses", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// GET a path
    Get { path: String },
    /// POST a JSON body to a path
    Post {
        path: String,
        #[arg(short, long)]
        data: Option<String>,
    },
    /// PUT a JSON body to a path
    Put {
        path: String,
        #[arg(short, long)]
        data: Option<String>,
    },
    /// DELETE a path
    Delete { path: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let client = reqwest::Client::new();

    let (method, path, data) = match cli.command {
        Commands::Get { path } => (Method::GET, path, None),
        Commands::Post { path, data } => (Method::POST, path, data),
        Commands::Put { path, data } => (Method::PUT, path, data),
        Commands::Delete { path } => (Method::DELETE, path, None),
    };

    let body: Option<Value> = data.as_deref().map(|d| serde_json::from_str(d)).transpose()?;
    let url = join_url(&cli.url, &path)?;
    let request = new_request(method, url.as_str(), body.as_ref())?;

    let exchange = send(&client, request).await?.error_for_status().await?;
    let json: Value = exchange.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
