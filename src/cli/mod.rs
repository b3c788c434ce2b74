//! Command-line parsing.
//!
//! Every flag is optional; running the binary with no arguments performs the
//! full default collection (2018-01-01 through today, half-year windows).

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;

use crate::domain::{API_DATE_FORMAT, DEFAULT_API_URL, DEFAULT_DATA_DIR, DEFAULT_PAGE_CAP, DEFAULT_WINDOW_MONTHS};

/// Top-level CLI.
#[derive(Debug, Parser, Clone)]
#[command(
    name = "osha-disasters",
    version,
    about = "Download Taiwan OSHA major occupational-disaster records to JSON and CSV"
)]
pub struct Cli {
    /// First day to collect (YYYY-MM-DD or YYYYMMDD).
    #[arg(long, value_parser = parse_date, default_value = "2018-01-01")]
    pub start: NaiveDate,

    /// Last day to collect (defaults to today).
    #[arg(long, value_parser = parse_date)]
    pub end: Option<NaiveDate>,

    /// Calendar months per query window.
    #[arg(long, default_value_t = DEFAULT_WINDOW_MONTHS, value_parser = clap::value_parser!(u32).range(1..))]
    pub window_months: u32,

    /// Per-request record cap of the API.
    #[arg(long, default_value_t = DEFAULT_PAGE_CAP)]
    pub page_cap: usize,

    /// Do not bisect windows whose response hits the cap (only warn).
    #[arg(long)]
    pub no_split: bool,

    /// Restrict to a city/county (repeat for several; one pass per value).
    #[arg(long = "addr", value_name = "CITY")]
    pub addrs: Vec<String>,

    /// Free-text keyword filter.
    #[arg(long)]
    pub keyword: Option<String>,

    /// Output root; raw JSON goes to `<dir>/raw`, CSV to `<dir>/processed`.
    #[arg(long, env = "OSHA_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Incident API endpoint.
    #[arg(long, env = "OSHA_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Pause between requests, in milliseconds.
    #[arg(long, default_value_t = 500)]
    pub delay_ms: u64,

    /// Per-request timeout, in seconds.
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Verify the server's TLS certificate (the upstream certificate is
    /// currently broken, so this is off by default).
    #[arg(long)]
    pub verify_tls: bool,
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, API_DATE_FORMAT))
        .map_err(|_| format!("invalid date '{raw}' (expected YYYY-MM-DD or YYYYMMDD)"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_arguments_gives_defaults() {
        let cli = Cli::try_parse_from(["osha-disasters"]).unwrap();
        assert_eq!(cli.start, NaiveDate::from_ymd_opt(2018, 1, 1).unwrap());
        assert_eq!(cli.end, None);
        assert_eq!(cli.window_months, 6);
        assert_eq!(cli.page_cap, 200);
        assert!(cli.addrs.is_empty());
        assert!(!cli.no_split);
        assert!(!cli.verify_tls);
    }

    #[test]
    fn accepts_both_date_formats_and_filters() {
        let cli = Cli::try_parse_from([
            "osha-disasters",
            "--start",
            "20200101",
            "--end",
            "2020-12-31",
            "--addr",
            "臺北市",
            "--addr",
            "高雄市",
            "--keyword",
            "墜落",
        ])
        .unwrap();
        assert_eq!(cli.start, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        assert_eq!(cli.end, NaiveDate::from_ymd_opt(2020, 12, 31));
        assert_eq!(cli.addrs, vec!["臺北市", "高雄市"]);
        assert_eq!(cli.keyword.as_deref(), Some("墜落"));
    }

    #[test]
    fn rejects_zero_window_and_bad_dates() {
        assert!(Cli::try_parse_from(["osha-disasters", "--window-months", "0"]).is_err());
        assert!(Cli::try_parse_from(["osha-disasters", "--start", "2020/01/01"]).is_err());
    }
}
