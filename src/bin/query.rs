//! Command-line client: one merged page over the configured sources.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use osfed::{AppConfig, Federation};
use osfed_search::params::{COUNT, SEARCH_TERMS, START_INDEX, START_PAGE};
use osfed_search::{ItemComparer, QueryParameters, SortCriterion};
use tracing::info;

/// osfed: query many OpenSearch sources as one paginated result set.
#[derive(Parser)]
#[command(name = "osfed-query", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Fetch one merged page and print it as JSON.
    Search(SearchArgs),

    /// List the configured sources.
    Sources,
}

#[derive(clap::Args)]
struct SearchArgs {
    /// Query only these sources (repeatable); all sources by default.
    #[arg(short, long = "source")]
    sources: Vec<String>,

    /// Items per page.
    #[arg(long)]
    count: Option<u64>,

    /// Page number, starting at 1.
    #[arg(long)]
    start_page: Option<u64>,

    /// Position of the first item of page 1, starting at 1.
    #[arg(long)]
    start_index: Option<u64>,

    /// Extra query parameter forwarded to every source (repeatable).
    #[arg(short, long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    params: Vec<(String, String)>,

    /// Sort criteria, e.g. `key:desc`, `title:asc`, `field:score`.
    #[arg(long, value_delimiter = ',')]
    sort: Vec<SortCriterion>,

    /// Search terms.
    terms: Vec<String>,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_owned(), value.to_owned())),
        _ => Err(format!("expected KEY=VALUE, got `{raw}`")),
    }
}

impl SearchArgs {
    fn query_parameters(&self) -> QueryParameters {
        let mut params = QueryParameters::new();
        for (key, value) in &self.params {
            params.append(key.as_str(), value.as_str());
        }
        if !self.terms.is_empty() {
            params.set(SEARCH_TERMS, self.terms.join(" "));
        }
        let paging = [
            (COUNT, self.count),
            (START_PAGE, self.start_page),
            (START_INDEX, self.start_index),
        ];
        for (key, value) in paging {
            if let Some(value) = value {
                params.set(key, value.to_string());
            }
        }
        params
    }

    fn comparer(&self) -> ItemComparer {
        if self.sort.is_empty() {
            ItemComparer::default()
        } else {
            ItemComparer::new(self.sort.clone())
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AppConfig> {
    if let Some(path) = path {
        return Ok(AppConfig::from_file(path)?);
    }
    let default = AppConfig::default_config_path();
    if default.exists() {
        Ok(AppConfig::from_file(&default)?)
    } else {
        Ok(AppConfig::default())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    let _guard = osfed::logging::init(&config.logging)?;
    config.validate()?;

    match cli.command {
        Command::Sources => {
            for source in &config.sources {
                println!("{}", source.name());
            }
            Ok(())
        }
        Command::Search(args) => {
            let federation = Federation::from_config(&config, args.comparer()).await?;
            let params = args.query_parameters();
            info!(query = %params.to_query_string(), "running search");
            let page = federation.page(&params, &args.sources).await?;
            println!("{}", serde_json::to_string_pretty(&page)?);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_search_arguments() {
        let cli = Cli::try_parse_from([
            "osfed-query",
            "search",
            "--count",
            "5",
            "--start-page",
            "2",
            "-s",
            "a",
            "-s",
            "b",
            "-p",
            "lang=en",
            "--sort",
            "key:asc,title",
            "rust",
            "async",
        ])
        .expect("parse");
        let Command::Search(args) = cli.command else {
            panic!("expected search");
        };
        assert_eq!(args.sources, ["a", "b"]);
        assert_eq!(args.sort.len(), 2);

        let params = args.query_parameters();
        assert_eq!(params.get(SEARCH_TERMS), Some("rust async"));
        assert_eq!(params.get(COUNT), Some("5"));
        assert_eq!(params.get(START_PAGE), Some("2"));
        assert_eq!(params.get(START_INDEX), None);
        assert_eq!(params.get("lang"), Some("en"));
    }

    #[test]
    fn rejects_malformed_param() {
        assert!(parse_param("novalue").is_err());
        assert!(parse_param("=x").is_err());
        assert_eq!(parse_param("a=b=c"), Ok(("a".to_owned(), "b=c".to_owned())));
    }

    #[test]
    fn rejects_unknown_sort_criterion() {
        let result = Cli::try_parse_from(["osfed-query", "search", "--sort", "colour"]);
        assert!(result.is_err());
    }
}
