//! `early-hints`: inspect what the middleware would send for a page.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use early_hints_core::{
    Contributors, DefaultHeaders, HintsConfig, LinkSet, ResponseView, ResultCache, open_store,
};
use early_hints_extract::{BodyLinks, FetchConfig, PageFetcher};
use http::{HeaderMap, StatusCode};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "early-hints", version, about = "Inspect and manage HTTP 103 Early Hints")]
struct Cli {
    /// TOML configuration file, layered under `EARLY_HINTS_*` variables
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the Link header generated for a local HTML file or a URL
    Inspect(InspectArgs),
    /// Parse raw Link header fragments and print them normalized
    Parse {
        #[arg(required = true)]
        fragments: Vec<String>,
    },
    /// Drop the cached headers for a normalized URL
    Forget { url: String },
    /// Remove expired entries from the cache store
    Purge,
}

#[derive(Debug, Args)]
struct InspectArgs {
    /// Path to an HTML file, or an http(s) URL
    target: String,

    #[arg(long)]
    base_path: Option<String>,

    #[arg(long)]
    size_limit: Option<usize>,

    /// Exclude candidates containing this keyword (repeatable)
    #[arg(long = "exclude")]
    exclude: Vec<String>,

    /// Raw Link fragment to contribute first (repeatable)
    #[arg(long = "default-header")]
    default_headers: Vec<String>,

    /// Print the retained links as JSON instead of a header value
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => HintsConfig::load_from(path),
        None => HintsConfig::load(),
    }
    .context("loading configuration")?;

    match cli.command {
        Command::Inspect(args) => inspect(config, args).await,
        Command::Parse { fragments } => {
            println!("{}", parse(&fragments));
            Ok(())
        }
        Command::Forget { url } => {
            let removed = cache(&config).await?.forget(&url).await?;
            println!("{}", if removed { "forgotten" } else { "not cached" });
            Ok(())
        }
        Command::Purge => {
            let purged = cache(&config).await?.purge_expired().await?;
            println!("purged {purged} expired entries");
            Ok(())
        }
    }
}

async fn cache(config: &HintsConfig) -> Result<ResultCache> {
    let store = open_store(config).await.context("opening cache store")?;
    Ok(ResultCache::new(store, config.cache_ttl()))
}

async fn inspect(mut config: HintsConfig, args: InspectArgs) -> Result<()> {
    if let Some(base_path) = args.base_path {
        config.base_path = base_path;
    }
    config.exclude_keywords.extend(args.exclude);
    config.default_headers.extend(args.default_headers);

    let (headers, body) = load_document(&args.target).await?;

    let mut contributors = Contributors::new();
    contributors.register(DefaultHeaders::from_config(&config));
    contributors.register(BodyLinks::from_config(&config)?);

    let uri = if is_url(&args.target) { args.target.as_str() } else { "/" };
    let request = http::Request::builder()
        .uri(uri)
        .body(())
        .context("building request")?
        .into_parts()
        .0;
    let response = ResponseView::new(StatusCode::OK, &headers, &body);

    let (links, header) = contributors.generate(&request, &response, config.effective_size_limit(args.size_limit));

    if args.json {
        println!("{}", serde_json::to_string_pretty(&links)?);
    } else {
        println!("{header}");
    }

    Ok(())
}

async fn load_document(target: &str) -> Result<(HeaderMap, Vec<u8>)> {
    if is_url(target) {
        let page = PageFetcher::new(FetchConfig::default())?.fetch(target).await?;
        tracing::debug!(url = %page.url, status = %page.status, "fetched page");
        return Ok((page.headers, page.body.to_vec()));
    }

    let body = tokio::fs::read(target).await.with_context(|| format!("reading {target}"))?;
    Ok((HeaderMap::new(), body))
}

fn is_url(target: &str) -> bool {
    target.starts_with("http://") || target.starts_with("https://")
}

fn parse(fragments: &[String]) -> String {
    let mut links = LinkSet::new();
    for fragment in fragments {
        links.add_from_str(fragment);
    }
    links.make_unique();
    links.to_header_value()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_and_dedups() {
        let fragments = vec![
            r#"</a.css>; rel="preload"; as="style", </b.js>; rel=preload; as=script"#.to_string(),
            r#"</a.css>; rel="preload"; as="style""#.to_string(),
        ];

        assert_eq!(
            parse(&fragments),
            r#"</a.css>; rel="preload"; as="style",</b.js>; rel="preload"; as="script""#
        );
    }

    #[test]
    fn test_cli_parses_inspect_flags() {
        let cli = Cli::parse_from([
            "early-hints",
            "inspect",
            "page.html",
            "--exclude",
            "analytics",
            "--exclude",
            "ads",
            "--size-limit",
            "100",
        ]);

        let Command::Inspect(args) = cli.command else {
            panic!("expected inspect");
        };
        assert_eq!(args.target, "page.html");
        assert_eq!(args.exclude, vec!["analytics", "ads"]);
        assert_eq!(args.size_limit, Some(100));
    }

    #[tokio::test]
    async fn test_load_local_document() {
        let path = std::env::temp_dir().join(format!("early-hints-cli-{}.html", std::process::id()));
        tokio::fs::write(&path, "<html></html>").await.unwrap();

        let (headers, body) = load_document(path.to_str().unwrap()).await.unwrap();
        assert!(headers.is_empty());
        assert_eq!(body, b"<html></html>");

        tokio::fs::remove_file(&path).await.unwrap();
    }
}
