//! Classlens CLI - Command-line interface for the analysis daemon

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tabled::{Table, Tabled};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9641";

#[derive(Parser)]
#[command(name = "classlens")]
#[command(about = "Classlens analysis service CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, env = "CLASSLENS_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit an analysis job
    Submit {
        /// Analysis kind (relationship, overview, student_group,
        /// announcement, safety_notice, record_remark, test)
        #[arg(short, long)]
        kind: String,

        /// Class id
        #[arg(short, long)]
        class: String,

        /// Requesting teacher id
        #[arg(short, long)]
        requester: String,

        /// Payload as JSON string
        #[arg(long, default_value = "{}")]
        payload: String,
    },

    /// Show a job's current status
    Status {
        /// Job ID
        job_id: String,

        /// Class id the job belongs to
        #[arg(short, long)]
        class: String,
    },

    /// Poll a job until it finishes and print the result
    Watch {
        /// Job ID
        job_id: String,

        /// Class id the job belongs to
        #[arg(short, long)]
        class: String,

        /// Poll interval in seconds
        #[arg(short, long, default_value = "2")]
        interval: u64,
    },

    /// Show queue statistics
    Stats,
}

#[derive(Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: serde_json::Value,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[allow(dead_code)]
    jsonrpc: String,
    #[allow(dead_code)]
    id: u64,
    result: Option<serde_json::Value>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

#[derive(Deserialize, Tabled)]
struct SubmitResult {
    job_id: String,
    status: String,
}

async fn call_rpc(url: &str, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
    let request = JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        method: method.to_string(),
        params,
        id: 1,
    };

    let client = reqwest::Client::new();
    let response: JsonRpcResponse = client
        .post(url)
        .json(&request)
        .send()
        .await
        .context("Failed to connect to daemon")?
        .json()
        .await
        .context("Failed to parse response")?;

    if let Some(error) = response.error {
        anyhow::bail!("RPC error ({}): {}", error.code, error.message);
    }

    response
        .result
        .ok_or_else(|| anyhow::anyhow!("No result in response"))
}

fn print_status(status: &serde_json::Value) {
    let state = status["status"].as_str().unwrap_or("unknown");
    let colored_state = match state {
        "completed" => state.green().bold(),
        "failed" => state.red().bold(),
        "processing" => state.yellow().bold(),
        _ => state.normal(),
    };

    println!("  {} {}", "Job:".bold(), status["job_id"]);
    println!("  {} {}", "Kind:".bold(), status["kind"]);
    println!("  {} {}", "Status:".bold(), colored_state);

    if let Some(result) = status["result"].as_str() {
        println!();
        println!("{}", "Result:".cyan().bold());
        println!("{}", result);
    }
    if let Some(error) = status["error"].as_str() {
        println!();
        println!("{} {}", "Error:".red().bold(), error);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Submit {
            kind,
            class,
            requester,
            payload,
        } => {
            let payload_json: serde_json::Value =
                serde_json::from_str(&payload).context("Invalid JSON payload")?;

            let params = json!({
                "kind": kind,
                "class_id": class,
                "requested_by": requester,
                "payload": payload_json,
            });

            let result = call_rpc(&cli.rpc_url, "analysis.submit.v1", params).await?;
            let submit_result: SubmitResult = serde_json::from_value(result)?;

            println!("{}", "✓ Analysis job submitted".green().bold());
            println!();

            let table = Table::new(vec![submit_result]).to_string();
            println!("{}", table);
        }

        Commands::Status { job_id, class } => {
            let params = json!({
                "job_id": job_id,
                "class_id": class,
            });

            let status = call_rpc(&cli.rpc_url, "analysis.status.v1", params).await?;
            print_status(&status);
        }

        Commands::Watch {
            job_id,
            class,
            interval,
        } => {
            println!(
                "{}",
                format!("Watching job {} (Ctrl+C to stop)...", job_id).cyan()
            );

            loop {
                let params = json!({
                    "job_id": job_id,
                    "class_id": class,
                });

                let status = call_rpc(&cli.rpc_url, "analysis.status.v1", params).await?;
                let state = status["status"].as_str().unwrap_or("unknown");

                if state == "completed" || state == "failed" {
                    println!();
                    print_status(&status);
                    break;
                }

                println!("  {} {}", "…".dimmed(), state);
                tokio::time::sleep(std::time::Duration::from_secs(interval)).await;
            }
        }

        Commands::Stats => {
            println!("{}", "Queue Status".cyan().bold());
            println!();

            match call_rpc(&cli.rpc_url, "admin.stats.v1", json!({})).await {
                Ok(stats) => {
                    println!("  {} {}", "RPC URL:".bold(), cli.rpc_url);
                    println!("  {} {}", "Status:".bold(), "ONLINE".green());
                    println!();
                    println!("  {} {}", "Pending:".bold(), stats["pending_jobs"]);
                    println!("  {} {}", "Processing:".bold(), stats["processing_jobs"]);
                    println!("  {} {}", "Completed:".bold(), stats["completed_jobs"]);
                    println!("  {} {}", "Failed:".bold(), stats["failed_jobs"]);
                    println!();
                    println!("  {} {} seconds", "Uptime:".bold(), stats["uptime_seconds"]);
                }
                Err(e) => {
                    println!("  {} {}", "Status:".bold(), "ERROR".red());
                    println!("  {} {}", "Error:".bold(), e);
                }
            }
        }
    }

    Ok(())
}
