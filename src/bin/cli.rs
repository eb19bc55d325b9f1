//! rrdgate CLI
//!
//! Command-line client for a running rrdgate server:
//! - Run DEF/CDEF queries
//! - Autocomplete metric paths
//! - Check status
//! - Print a default config file

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rrdgate-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Client for the rrdgate query gateway")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Server URL
    #[arg(long, default_value = "http://localhost:8085", global = true)]
    pub api_url: String,

    /// Basic auth as user:password
    #[arg(long, global = true)]
    pub auth: Option<String>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a query
    Query {
        /// DEF/CDEF tokens, e.g. DEF:rx=server1/if_octets:rx:AVERAGE
        #[arg(required = true)]
        queries: Vec<String>,
        /// Window start: now, epoch, date, time of day or offset like -1h
        #[arg(short, long, default_value = "-1h")]
        start: String,
        /// Window end
        #[arg(short, long, default_value = "now")]
        end: String,
        /// Step, e.g. 60 or 5m
        #[arg(long)]
        step: Option<String>,
        /// Names of definitions to leave out of the result
        #[arg(long)]
        hide: Vec<String>,
    },

    /// Autocomplete a metric path
    Suggest {
        /// Path prefix, optionally followed by :<datasource prefix>
        #[arg(default_value = "")]
        query: String,
        /// List every file below the prefix
        #[arg(short, long)]
        recursive: bool,
        /// Leave out datasource names
        #[arg(long)]
        no_ds: bool,
    },

    /// Show server status
    Status,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match &cli.command {
        Commands::Query {
            queries,
            start,
            end,
            step,
            hide,
        } => {
            let mut url = format!(
                "{}/query?start={}&end={}",
                cli.api_url,
                urlencoding::encode(start),
                urlencoding::encode(end)
            );
            if let Some(step) = step {
                url.push_str(&format!("&step={}", urlencoding::encode(step)));
            }
            for query in queries {
                url.push_str(&format!(
                    "&query={}&hidden={}",
                    urlencoding::encode(query),
                    is_hidden(query, hide)
                ));
            }

            let data = get_json(&client, &cli, &url).await?;

            match cli.format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&data)?),
                _ => print_series_table(&data),
            }
        }

        Commands::Suggest {
            query,
            recursive,
            no_ds,
        } => {
            let url = format!(
                "{}/suggest/metrics?query={}&recursive={}&withds={}",
                cli.api_url,
                urlencoding::encode(query),
                recursive,
                !no_ds
            );

            let data = get_json(&client, &cli, &url).await?;

            match cli.format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&data)?),
                _ => print_suggest_table(&data),
            }
        }

        Commands::Status => {
            let url = format!("{}/health", cli.api_url);
            let health = get_json(&client, &cli, &url).await.with_context(|| {
                format!(
                    "Cannot reach rrdgate at {}. Make sure the server is running: cargo run --bin rrdgate",
                    cli.api_url
                )
            })?;

            println!(
                "rrdgate v{}",
                health["version"].as_str().unwrap_or("unknown")
            );
            println!();
            println!("Status:   {}", health["status"].as_str().unwrap_or("unknown"));
            println!("Store:    {}", health["store"].as_str().unwrap_or("unknown"));
            println!("Data dir: {}", health["data_dir"].as_str().unwrap_or("unknown"));
            if let Some(uptime) = health["uptime_seconds"].as_u64() {
                println!("Uptime:   {}", format_duration(uptime));
            }
        }

        Commands::Config { output } => {
            let config = rrdgate::config::generate_default_config();

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => print!("{}", config),
            }
        }
    }

    Ok(())
}

/// GET a URL and decode the JSON body, failing with the server's message
async fn get_json(client: &reqwest::Client, cli: &Cli, url: &str) -> anyhow::Result<Value> {
    let mut request = client.get(url);
    if let Some(auth) = &cli.auth {
        let (user, password) = auth
            .split_once(':')
            .context("--auth must be given as user:password")?;
        request = request.basic_auth(user, Some(password));
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
            .unwrap_or(text);
        bail!("Request failed ({}): {}", status, message);
    }

    Ok(response.json().await?)
}

/// Whether the token defines one of the hidden names
fn is_hidden(token: &str, hide: &[String]) -> bool {
    let token = rrdgate::query::unquote(token);
    token
        .split_once(':')
        .and_then(|(_, rest)| rest.split_once('='))
        .map_or(false, |(name, _)| hide.iter().any(|h| h == name))
}

fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else if seconds < 86400 {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    } else {
        format!("{}d {}h", seconds / 86400, (seconds % 86400) / 3600)
    }
}

/// One row per timestamp, one column per series; `null` prints as `-`
fn print_series_table(data: &Value) {
    let series = match data["result"].as_array() {
        Some(s) if !s.is_empty() => s,
        _ => {
            println!("No data");
            return;
        }
    };

    let names: Vec<&str> = series
        .iter()
        .map(|s| s["name"].as_str().unwrap_or("-"))
        .collect();

    let mut timestamps: Vec<i64> = series
        .iter()
        .filter_map(|s| s["dps"].as_object())
        .flat_map(|dps| dps.keys().filter_map(|k| k.parse().ok()))
        .collect();
    timestamps.sort_unstable();
    timestamps.dedup();

    print!("{:<20}", "Time");
    for name in &names {
        print!(" | {:>14}", name);
    }
    println!();
    println!("{}", "-".repeat(20 + names.len() * 17));

    for ts in timestamps {
        let time = chrono::DateTime::from_timestamp(ts, 0)
            .map(|dt| {
                dt.with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string()
            })
            .unwrap_or_else(|| ts.to_string());

        print!("{:<20}", time);
        for s in series {
            let val = s["dps"][ts.to_string()]
                .as_f64()
                .map(|v| format!("{:.3}", v))
                .unwrap_or_else(|| "-".to_string());
            print!(" | {:>14}", val);
        }
        println!();
    }
}

fn print_suggest_table(data: &Value) {
    let entries = match data.as_array() {
        Some(e) if !e.is_empty() => e,
        _ => {
            println!("No matches");
            return;
        }
    };

    for entry in entries {
        let metric = entry["metric"].as_str().unwrap_or("-");
        let ds: Vec<&str> = entry["ds"]
            .as_array()
            .map(|a| a.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        if ds.is_empty() {
            println!("{}", metric);
        } else {
            println!("{:<50} {}", metric, ds.join(", "));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_hidden() {
        let hide = vec!["RX".to_string()];
        assert!(is_hidden("DEF:RX=a/b:rx:AVERAGE", &hide));
        assert!(is_hidden("\"DEF:RX=a/b:rx:AVERAGE\"", &hide));
        assert!(is_hidden("‘DEF:RX=a/b:rx:AVERAGE’", &hide));
        assert!(!is_hidden("DEF:TX=a/b:tx:AVERAGE", &hide));
        assert!(!is_hidden("CDEF:SUM=RX,TX,+", &hide));
        assert!(!is_hidden("garbage", &hide));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(42), "42s");
        assert_eq!(format_duration(125), "2m 5s");
        assert_eq!(format_duration(7260), "2h 1m");
        assert_eq!(format_duration(90000), "1d 1h");
    }
}
