//! callsight-cli — command-line client for the Callsight dashboard API
//!
//! # Subcommands
//! - `predict --agent <A> --topic <T> --speed <S> --duration <D> [--json]`
//! - `add-session --agent <A> --topic <T> --speed <S> --duration <D> --rating <R>`
//! - `categories [--json]` — list known agents and topics
//! - `stats [--json]`      — historical satisfaction aggregates
//! - `status`              — show server health

use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};

const DEFAULT_SERVER: &str = "http://127.0.0.1:8501";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "callsight-cli",
    version,
    about = "Callsight call-center dashboard — command-line client"
)]
struct Cli {
    /// Callsight HTTP server URL (overrides CALLSIGHT_HTTP_URL env var)
    #[arg(long, env = "CALLSIGHT_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Predict the satisfaction rating for a session
    Predict {
        #[command(flatten)]
        session: SessionArgs,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// Append a session to the dataset
    AddSession {
        #[command(flatten)]
        session: SessionArgs,

        /// Satisfaction rating, 1-5
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
        rating: u8,
    },

    /// List the agents and topics the model accepts
    Categories {
        #[arg(long)]
        json: bool,
    },

    /// Show historical satisfaction aggregates
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Show Callsight server status
    Status,
}

#[derive(Debug, Args)]
struct SessionArgs {
    /// Agent name, exactly as it appears in the dataset
    #[arg(long)]
    agent: String,

    /// Call topic, exactly as it appears in the dataset
    #[arg(long)]
    topic: String,

    /// Speed of answer in seconds
    #[arg(long)]
    speed: u32,

    /// Average talk duration in seconds
    #[arg(long)]
    duration: f64,
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct PredictBody {
    pub agent: String,
    pub topic: String,
    pub speed_of_answer: u32,
    pub avg_talk_duration: f64,
}

#[derive(Debug, Serialize)]
pub struct SessionBody {
    pub agent: String,
    pub topic: String,
    pub speed_of_answer: u32,
    pub avg_talk_duration: f64,
    pub satisfaction_rating: u8,
}

#[derive(Debug, Deserialize)]
pub struct PredictResponse {
    pub prediction: i64,
    pub model: String,
}

#[derive(Debug, Deserialize)]
pub struct CategoriesResponse {
    pub agents: Vec<String>,
    pub topics: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct GroupMean {
    pub name: String,
    pub mean_rating: f64,
    pub sessions: usize,
}

#[derive(Debug, Deserialize)]
pub struct RatingCount {
    pub rating: u8,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct StatsResponse {
    pub rating_counts: Vec<RatingCount>,
    pub by_agent: Vec<GroupMean>,
    pub by_topic: Vec<GroupMean>,
}

impl From<SessionArgs> for PredictBody {
    fn from(a: SessionArgs) -> Self {
        PredictBody {
            agent: a.agent,
            topic: a.topic,
            speed_of_answer: a.speed,
            avg_talk_duration: a.duration,
        }
    }
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

fn client(timeout_secs: u64) -> anyhow::Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()?)
}

/// Send a request and return the JSON body, exiting on transport or HTTP errors.
fn send_json(req: reqwest::blocking::RequestBuilder, url: &str) -> anyhow::Result<serde_json::Value> {
    let resp = match req.send() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("callsight-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };

    let status = resp.status();
    let body: serde_json::Value = resp.json().unwrap_or_default();
    if !status.is_success() {
        eprintln!("callsight-cli: {}", error_message(status.as_u16(), &body));
        std::process::exit(1);
    }
    Ok(body)
}

/// Human-readable message for an error response body.
pub fn error_message(status: u16, body: &serde_json::Value) -> String {
    match body["error"].as_str() {
        Some(msg) => format!("server returned {}: {}", status, msg),
        None => format!("server returned {}", status),
    }
}

fn do_predict(server: &str, body: PredictBody, json_output: bool) -> anyhow::Result<()> {
    let url = format!("{}/api/predict", server);
    let value = send_json(client(30)?.post(&url).json(&body), &url)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let resp: PredictResponse = serde_json::from_value(value)?;
    println!(
        "Predicted Satisfaction Rating: {} ({} model)",
        resp.prediction, resp.model
    );
    Ok(())
}

fn do_add_session(server: &str, body: SessionBody) -> anyhow::Result<()> {
    let url = format!("{}/api/sessions", server);
    let value = send_json(client(30)?.post(&url).json(&body), &url)?;
    println!(
        "Session added successfully! Dataset now has {} rows.",
        value["rows"].as_u64().unwrap_or(0)
    );
    Ok(())
}

fn do_categories(server: &str, json_output: bool) -> anyhow::Result<()> {
    let url = format!("{}/api/categories", server);
    let value = send_json(client(10)?.get(&url), &url)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let resp: CategoriesResponse = serde_json::from_value(value)?;
    println!("Agents:");
    for a in &resp.agents {
        println!("  {}", a);
    }
    println!("Topics:");
    for t in &resp.topics {
        println!("  {}", t);
    }
    Ok(())
}

fn do_stats(server: &str, json_output: bool) -> anyhow::Result<()> {
    let url = format!("{}/api/stats", server);
    let value = send_json(client(30)?.get(&url), &url)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let resp: StatsResponse = serde_json::from_value(value)?;
    println!("{}", format_stats(&resp));
    Ok(())
}

pub fn format_stats(stats: &StatsResponse) -> String {
    let mut out = String::from("Rating  Count\n");
    for c in &stats.rating_counts {
        out.push_str(&format!("{:>6}  {}\n", c.rating, c.count));
    }
    for (heading, groups) in [("Agent", &stats.by_agent), ("Topic", &stats.by_topic)] {
        out.push_str(&format!("\nAverage satisfaction by {}\n", heading.to_lowercase()));
        for g in groups.iter() {
            out.push_str(&format!("  {:<24} {:.2}  ({} sessions)\n", g.name, g.mean_rating, g.sessions));
        }
    }
    out
}

/// Show the server status by calling GET /health.
fn do_status(server: &str) -> anyhow::Result<()> {
    let url = format!("{}/health", server);
    let resp = client(10)?.get(&url).send();

    match resp {
        Ok(r) if r.status().is_success() => {
            let body: serde_json::Value = r.json().unwrap_or_default();
            println!("Callsight server: {}", body["status"].as_str().unwrap_or("unknown"));
            println!("Version:          {}", body["version"].as_str().unwrap_or("?"));
            println!("Dataset:          {}", body["dataset"].as_str().unwrap_or("?"));
            println!("Sessions:         {}", body["sessions"].as_u64().unwrap_or(0));
            println!("Agents / topics:  {} / {}",
                body["agents"].as_u64().unwrap_or(0),
                body["topics"].as_u64().unwrap_or(0));
            println!("Model:            {} ({})",
                body["model_path"].as_str().unwrap_or("?"),
                body["model_backend"].as_str().unwrap_or("?"));
        }
        Ok(r) => {
            let status = r.status();
            eprintln!("callsight-cli: server unhealthy (HTTP {})", status);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("callsight-cli: cannot reach {} — {}", url, e);
            std::process::exit(1);
        }
    }

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    let result = match cli.command {
        Commands::Predict { session, json } => do_predict(&server, session.into(), json),
        Commands::AddSession { session, rating } => do_add_session(
            &server,
            SessionBody {
                agent: session.agent,
                topic: session.topic,
                speed_of_answer: session.speed,
                avg_talk_duration: session.duration,
                satisfaction_rating: rating,
            },
        ),
        Commands::Categories { json } => do_categories(&server, json),
        Commands::Stats { json } => do_stats(&server, json),
        Commands::Status => do_status(&server),
    };

    if let Err(e) = result {
        eprintln!("callsight-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
