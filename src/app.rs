//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - sets up logging
//! - builds the OSHA client and runs the fetch pipeline
//! - prints the run summary

use std::time::Duration;

use chrono::Local;
use clap::Parser;
use tracing::info;

use crate::cli::Cli;
use crate::data::OshaClient;
use crate::domain::{FetchConfig, QueryFilter};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `osha-disasters` binary.
pub fn run() -> Result<(), AppError> {
    // `.env` first so clap's `env = ...` defaults can see it.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    crate::logging::init();

    let config = fetch_config_from_args(&cli);
    if !config.accept_invalid_certs {
        info!("TLS certificate verification enabled");
    }

    let client = OshaClient::new(&config)?;
    let today = Local::now().date_naive();
    let run = pipeline::run_fetch(&config, &client, today)?;

    println!("{}", crate::report::format_run_summary(&run));
    Ok(())
}

pub fn fetch_config_from_args(cli: &Cli) -> FetchConfig {
    FetchConfig {
        api_url: cli.api_url.clone(),
        start: cli.start,
        end: cli.end,
        window_months: cli.window_months,
        page_cap: cli.page_cap,
        split_on_cap: !cli.no_split,
        filters: filters_from_args(&cli.addrs, cli.keyword.as_deref()),
        data_dir: cli.data_dir.clone(),
        request_delay: Duration::from_millis(cli.delay_ms),
        timeout: Duration::from_secs(cli.timeout_secs),
        accept_invalid_certs: !cli.verify_tls,
    }
}

/// One filter per address, each carrying the keyword; a bare keyword is one filter.
fn filters_from_args(addrs: &[String], keyword: Option<&str>) -> Vec<QueryFilter> {
    let keyword = keyword.map(str::to_string);
    if addrs.is_empty() {
        return match keyword {
            Some(k) => vec![QueryFilter {
                addr: None,
                keyword: Some(k),
            }],
            None => Vec::new(),
        };
    }
    addrs
        .iter()
        .map(|addr| QueryFilter {
            addr: Some(addr.clone()),
            keyword: keyword.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_args_map_to_default_config() {
        let cli = Cli::try_parse_from(["osha-disasters", "--data-dir", "data", "--api-url", crate::domain::DEFAULT_API_URL])
            .unwrap();
        let cfg = fetch_config_from_args(&cli);
        let default = FetchConfig::default();

        assert_eq!(cfg.api_url, default.api_url);
        assert_eq!(cfg.start, default.start);
        assert_eq!(cfg.end, None);
        assert_eq!(cfg.window_months, default.window_months);
        assert_eq!(cfg.page_cap, default.page_cap);
        assert_eq!(cfg.split_on_cap, default.split_on_cap);
        assert!(cfg.filters.is_empty());
        assert_eq!(cfg.data_dir, default.data_dir);
        assert_eq!(cfg.request_delay, default.request_delay);
        assert_eq!(cfg.timeout, default.timeout);
        assert!(cfg.accept_invalid_certs);
    }

    #[test]
    fn filters_combine_addresses_with_keyword() {
        let addrs = vec!["臺北市".to_string(), "臺中市".to_string()];
        let filters = filters_from_args(&addrs, Some("感電"));
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[1].addr.as_deref(), Some("臺中市"));
        assert_eq!(filters[1].keyword.as_deref(), Some("感電"));

        let only_keyword = filters_from_args(&[], Some("感電"));
        assert_eq!(only_keyword, vec![QueryFilter { addr: None, keyword: Some("感電".to_string()) }]);

        assert!(filters_from_args(&[], None).is_empty());
    }
}
