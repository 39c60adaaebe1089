//! geonews-cli: terminal client for the GeoNews REST API
//!
//! # Subcommands
//! - `query <text> [--lat <lat> --lon <lon>] [-n <limit>] [--radius <km>] [--json]`
//! - `trending --lat <lat> --lon <lon> [-n <limit>] [--radius <km>] [--json]`
//! - `nearby --lat <lat> --lon <lon> [-n <limit>] [--radius <km>] [--json]`
//! - `status`: show server health
//!
//! `--json` prints the server payload untouched; otherwise a numbered listing.

use clap::{Args, Parser, Subcommand};
use serde::Deserialize;

const DEFAULT_SERVER: &str = "http://127.0.0.1:8000";
const DEFAULT_LIMIT: u32 = 5;
const DEFAULT_RADIUS_KM: f64 = 10.0;
const SUMMARY_PREVIEW_CHARS: usize = 160;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "geonews-cli",
    version,
    about = "Query the GeoNews contextual news API"
)]
struct Cli {
    /// GeoNews HTTP server URL (overrides GEONEWS_HTTP_URL env var)
    #[arg(long, env = "GEONEWS_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Args)]
struct GeoArgs {
    /// Latitude of the reader
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,

    /// Longitude of the reader
    #[arg(long, allow_hyphen_values = true)]
    lon: f64,

    /// Search radius in kilometres
    #[arg(long, default_value_t = DEFAULT_RADIUS_KM)]
    radius: f64,

    /// Maximum number of articles
    #[arg(short = 'n', long, default_value_t = DEFAULT_LIMIT)]
    limit: u32,

    /// Print the raw JSON payload
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Ask for news in plain language
    Query {
        /// Natural-language query
        query: String,

        /// Latitude of the reader
        #[arg(long, allow_hyphen_values = true, requires = "lon")]
        lat: Option<f64>,

        /// Longitude of the reader
        #[arg(long, allow_hyphen_values = true, requires = "lat")]
        lon: Option<f64>,

        /// Radius used by location-based intents
        #[arg(long, default_value_t = DEFAULT_RADIUS_KM)]
        radius: f64,

        /// Maximum number of articles
        #[arg(short = 'n', long, default_value_t = DEFAULT_LIMIT)]
        limit: u32,

        /// Print the raw JSON payload
        #[arg(long)]
        json: bool,
    },

    /// Articles ranked by engagement around a location
    Trending(GeoArgs),

    /// Articles within a radius, nearest first
    Nearby(GeoArgs),

    /// Show GeoNews server status
    Status,
}

// ============================================================================
// API Response Types
// ============================================================================

/// The subset of an article the listing shows.
#[derive(Debug, Deserialize)]
pub struct ArticleView {
    pub id: String,
    pub title: String,
    pub source_name: String,
    pub publication_date: String,
    pub relevance_score: f64,
    #[serde(default)]
    pub llm_summary: Option<String>,
}

/// Body of the query/nearby endpoints.
#[derive(Debug, Deserialize)]
pub struct NewsResponse {
    pub articles: Vec<ArticleView>,
    pub total_count: usize,
    pub query_used: String,
    pub intent: String,
}

/// Body of the trending endpoint.
#[derive(Debug, Deserialize)]
pub struct TrendingResponse {
    pub articles: Vec<ArticleView>,
    pub trending_scores: Vec<f64>,
    pub total_count: usize,
}

// ============================================================================
// Formatting
// ============================================================================

/// Cut to `max` characters, marking the cut with "...".
pub fn preview(text: &str, max: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{}...", cut.trim_end())
}

/// One numbered entry. The score line shows the trending score when given,
/// the relevance score otherwise.
pub fn format_article(index: usize, article: &ArticleView, trending_score: Option<f64>) -> String {
    let date = article
        .publication_date
        .split('T')
        .next()
        .unwrap_or(&article.publication_date);

    let score = match trending_score {
        Some(s) => format!("trending {:.3}", s),
        None => format!("relevance {:.2}", article.relevance_score),
    };

    let mut out = format!(
        "{}. {}\n   {} | {} | {}\n",
        index + 1,
        article.title,
        article.source_name,
        date,
        score
    );
    if let Some(summary) = article.llm_summary.as_deref().filter(|s| !s.trim().is_empty()) {
        out.push_str(&format!("   {}\n", preview(summary, SUMMARY_PREVIEW_CHARS)));
    }
    out
}

pub fn format_news(resp: &NewsResponse) -> String {
    let mut out = format!(
        "{} article(s) for \"{}\" [{}]\n\n",
        resp.total_count, resp.query_used, resp.intent
    );
    for (i, a) in resp.articles.iter().enumerate() {
        out.push_str(&format_article(i, a, None));
        out.push('\n');
    }
    out
}

pub fn format_trending(resp: &TrendingResponse) -> String {
    let mut out = format!(
        "{} trending article(s) ({} scored)\n\n",
        resp.articles.len(),
        resp.total_count
    );
    for (i, a) in resp.articles.iter().enumerate() {
        out.push_str(&format_article(i, a, resp.trending_scores.get(i).copied()));
        out.push('\n');
    }
    out
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

fn client(timeout_secs: u64) -> anyhow::Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()?)
}

/// Read a successful JSON body or exit with the server's error message.
fn read_json(resp: reqwest::Result<reqwest::blocking::Response>, url: &str) -> serde_json::Value {
    let resp = match resp {
        Ok(r) => r,
        Err(e) => {
            eprintln!("geonews-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };

    let status = resp.status();
    let body: serde_json::Value = resp.json().unwrap_or_default();
    if !status.is_success() {
        let message = body["error"].as_str().unwrap_or("unknown error");
        eprintln!("geonews-cli: server returned {}: {}", status, message);
        std::process::exit(1);
    }
    body
}

fn print_output<T, F>(body: serde_json::Value, json_output: bool, render: F) -> anyhow::Result<()>
where
    T: for<'de> Deserialize<'de>,
    F: Fn(&T) -> String,
{
    if json_output {
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }
    let parsed: T = serde_json::from_value(body)?;
    print!("{}", render(&parsed));
    Ok(())
}

fn do_query(
    server: &str,
    query: &str,
    location: Option<(f64, f64)>,
    radius: f64,
    limit: u32,
    json_output: bool,
) -> anyhow::Result<()> {
    let url = format!("{}/api/v1/news/query", server);
    let mut body = serde_json::json!({
        "query": query,
        "limit": limit,
        "radius_km": radius,
    });
    if let Some((lat, lon)) = location {
        body["location"] = serde_json::json!({ "latitude": lat, "longitude": lon });
    }

    // LLM analysis plus summaries can take a while
    let resp = client(60)?.post(&url).json(&body).send();
    print_output(read_json(resp, &url), json_output, format_news)
}

fn do_geo(server: &str, endpoint: &str, args: &GeoArgs) -> anyhow::Result<()> {
    let url = format!("{}/api/v1/news/{}", server, endpoint);
    let query = [
        ("latitude", args.lat.to_string()),
        ("longitude", args.lon.to_string()),
        ("radius_km", args.radius.to_string()),
        ("limit", args.limit.to_string()),
    ];
    let resp = client(60)?.get(&url).query(&query).send();
    let body = read_json(resp, &url);

    if endpoint == "trending" {
        print_output(body, args.json, format_trending)
    } else {
        print_output(body, args.json, format_news)
    }
}

/// Show the server status by calling GET /health.
fn do_status(server: &str) -> anyhow::Result<()> {
    let url = format!("{}/health", server);
    let resp = client(10)?.get(&url).send();

    match resp {
        Ok(r) if r.status().is_success() => {
            let body: serde_json::Value = r.json().unwrap_or_default();
            println!("GeoNews server: {}", body["status"].as_str().unwrap_or("unknown"));
            println!("Version:        {}", body["version"].as_str().unwrap_or("?"));
            println!("Database:       {}", connected(&body["database_connected"]));
            println!("Cache:          {}", connected(&body["cache_connected"]));
        }
        Ok(r) => {
            eprintln!("geonews-cli: server unhealthy (HTTP {})", r.status());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("geonews-cli: cannot reach {}: {}", url, e);
            std::process::exit(1);
        }
    }

    Ok(())
}

fn connected(flag: &serde_json::Value) -> &'static str {
    if flag.as_bool().unwrap_or(false) {
        "connected"
    } else {
        "unavailable"
    }
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    let result = match cli.command {
        Commands::Query {
            query,
            lat,
            lon,
            radius,
            limit,
            json,
        } => do_query(&server, &query, lat.zip(lon), radius, limit, json),
        Commands::Trending(args) => do_geo(&server, "trending", &args),
        Commands::Nearby(args) => do_geo(&server, "nearby", &args),
        Commands::Status => do_status(&server),
    };

    if let Err(e) = result {
        eprintln!("geonews-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn view(title: &str, summary: Option<&str>) -> ArticleView {
        ArticleView {
            id: "a1".to_string(),
            title: title.to_string(),
            source_name: "Reuters".to_string(),
            publication_date: "2025-03-14T09:30:00Z".to_string(),
            relevance_score: 0.8123,
            llm_summary: summary.map(str::to_string),
        }
    }

    // ========================================================================
    // TEST 1: clap definition is consistent
    // ========================================================================
    #[test]
    fn test_cli_definition_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_trending_negative_longitude() {
        let cli = Cli::try_parse_from([
            "geonews-cli",
            "trending",
            "--lat",
            "37.77",
            "--lon",
            "-122.42",
            "-n",
            "3",
        ])
        .unwrap();
        match cli.command {
            Commands::Trending(args) => {
                assert_eq!(args.lon, -122.42);
                assert_eq!(args.limit, 3);
                assert_eq!(args.radius, DEFAULT_RADIUS_KM);
                assert!(!args.json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_query_lat_requires_lon() {
        let err = Cli::try_parse_from(["geonews-cli", "query", "news near me", "--lat", "10"]);
        assert!(err.is_err());
    }

    // ========================================================================
    // TEST 2: preview truncation is char-based
    // ========================================================================
    #[test]
    fn test_preview_truncation() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("abcdefghij", 4), "abcd...");
        assert_eq!(preview("éééééé", 3), "ééé...");
    }

    // ========================================================================
    // TEST 3: article listing
    // ========================================================================
    #[test]
    fn test_format_article_relevance_line() {
        let out = format_article(0, &view("Bridge reopens", Some("Traffic resumes.")), None);
        assert_eq!(
            out,
            "1. Bridge reopens\n   Reuters | 2025-03-14 | relevance 0.81\n   Traffic resumes.\n"
        );
    }

    #[test]
    fn test_format_article_trending_without_summary() {
        let out = format_article(2, &view("Storm warning", None), Some(4.25));
        assert!(out.starts_with("3. Storm warning\n"));
        assert!(out.contains("trending 4.250"));
        assert_eq!(out.lines().count(), 2);
    }

    #[test]
    fn test_format_trending_pairs_scores_with_articles() {
        let resp: TrendingResponse = serde_json::from_value(serde_json::json!({
            "articles": [
                { "id": "a", "title": "First", "source_name": "CNN",
                  "publication_date": "2025-01-01T00:00:00Z", "relevance_score": 0.5 },
                { "id": "b", "title": "Second", "source_name": "BBC",
                  "publication_date": "2025-01-02T00:00:00Z", "relevance_score": 0.4 }
            ],
            "trending_scores": [9.5, 2.0],
            "location": { "latitude": 1.0, "longitude": 2.0 },
            "radius_km": 10.0,
            "total_count": 4
        }))
        .unwrap();

        let out = format_trending(&resp);
        assert!(out.starts_with("2 trending article(s) (4 scored)"));
        assert!(out.contains("1. First\n   CNN | 2025-01-01 | trending 9.500"));
        assert!(out.contains("2. Second\n   BBC | 2025-01-02 | trending 2.000"));
    }

    #[test]
    fn test_format_news_header() {
        let resp = NewsResponse {
            articles: vec![view("Bridge reopens", None)],
            total_count: 1,
            query_used: "category: national".to_string(),
            intent: "category".to_string(),
        };
        let out = format_news(&resp);
        assert!(out.starts_with("1 article(s) for \"category: national\" [category]\n\n1. Bridge reopens"));
    }
}
