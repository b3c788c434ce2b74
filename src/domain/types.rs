//! Shared domain types.
//!
//! These types are kept small and cheap to clone so they can move freely
//! between the fetcher, the pipeline, the writers and the report.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AppError;

pub const DEFAULT_API_URL: &str = "https://pacs.osha.gov.tw/api/v1/getdangerocupation";

/// Half a year keeps every window comfortably under the per-call cap.
pub const DEFAULT_WINDOW_MONTHS: u32 = 6;

/// The API silently truncates responses at this many records.
pub const DEFAULT_PAGE_CAP: usize = 200;

pub const DEFAULT_DATA_DIR: &str = "data";
pub const RAW_SUBDIR: &str = "raw";
pub const PROCESSED_SUBDIR: &str = "processed";
pub const PROCESSED_FILE_NAME: &str = "重大職業災害_2018至今.csv";

/// Reporting year (ROC or Gregorian, as the API sends it).
pub const FIELD_YEAR: &str = "年度";
/// Incident date, `YYYYMMDD` on the wire.
pub const FIELD_DATE: &str = "發生日期";
/// Leading row-number column in the processed CSV.
pub const ROW_NUMBER_HEADER: &str = "編號";

/// Date format used by the API query parameters and raw file names.
pub const API_DATE_FORMAT: &str = "%Y%m%d";

/// First day covered by the collection.
pub fn default_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2018, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// One occupational-disaster report, exactly as the API returned it.
///
/// The schema is owned by upstream and varies over time, so records are kept
/// as ordered JSON objects rather than a fixed struct.
pub type IncidentRecord = Map<String, Value>;

/// Inclusive date range bounding a single API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl QueryWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, AppError> {
        if end < start {
            return Err(AppError::config(format!(
                "Invalid window: end {end} is before start {start}."
            )));
        }
        Ok(Self { start, end })
    }

    /// Number of calendar days covered, both ends included.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Split into two contiguous halves. `None` for a single-day window.
    pub fn split(&self) -> Option<(QueryWindow, QueryWindow)> {
        let days = self.days();
        if days < 2 {
            return None;
        }
        let left_end = self.start + chrono::Duration::days(days / 2 - 1);
        let right_start = left_end.succ_opt()?;
        Some((
            QueryWindow {
                start: self.start,
                end: left_end,
            },
            QueryWindow {
                start: right_start,
                end: self.end,
            },
        ))
    }

    pub fn api_start(&self) -> String {
        self.start.format(API_DATE_FORMAT).to_string()
    }

    pub fn api_end(&self) -> String {
        self.end.format(API_DATE_FORMAT).to_string()
    }
}

impl std::fmt::Display for QueryWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ~ {}", self.api_start(), self.api_end())
    }
}

/// Optional narrowing of a query by location and/or keyword.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFilter {
    /// City or county name, sent as `info_addr`.
    pub addr: Option<String>,
    /// Free-text keyword, sent as `info_q`.
    pub keyword: Option<String>,
}

impl QueryFilter {
    pub fn is_empty(&self) -> bool {
        self.addr.is_none() && self.keyword.is_none()
    }

    /// Extra query parameters for this filter, in a stable order.
    pub fn query_params(&self) -> Vec<(&'static str, &str)> {
        let mut params = Vec::new();
        if let Some(addr) = &self.addr {
            params.push(("info_addr", addr.as_str()));
        }
        if let Some(keyword) = &self.keyword {
            params.push(("info_q", keyword.as_str()));
        }
        params
    }

    /// Short label used in logs and raw file names; `None` for the empty filter.
    pub fn label(&self) -> Option<String> {
        let parts: Vec<&str> = [self.addr.as_deref(), self.keyword.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("_"))
        }
    }
}

/// Everything a run needs to know. `Default` is the no-argument run.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub api_url: String,
    pub start: NaiveDate,
    /// Last day to collect; `None` means "today" at run time.
    pub end: Option<NaiveDate>,
    pub window_months: u32,
    pub page_cap: usize,
    /// Bisect windows whose response hits `page_cap`.
    pub split_on_cap: bool,
    /// One pass over all windows per filter. Empty means a single unfiltered pass.
    pub filters: Vec<QueryFilter>,
    pub data_dir: PathBuf,
    /// Pause between consecutive requests.
    pub request_delay: Duration,
    pub timeout: Duration,
    /// Skip certificate validation on the OSHA client only.
    pub accept_invalid_certs: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            start: default_start(),
            end: None,
            window_months: DEFAULT_WINDOW_MONTHS,
            page_cap: DEFAULT_PAGE_CAP,
            split_on_cap: true,
            filters: Vec::new(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            request_delay: Duration::from_millis(500),
            timeout: Duration::from_secs(30),
            accept_invalid_certs: true,
        }
    }
}

impl FetchConfig {
    pub fn raw_dir(&self) -> PathBuf {
        self.data_dir.join(RAW_SUBDIR)
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.data_dir.join(PROCESSED_SUBDIR)
    }

    pub fn processed_path(&self) -> PathBuf {
        self.processed_dir().join(PROCESSED_FILE_NAME)
    }

    /// Filters to iterate; always at least one (the empty filter).
    pub fn effective_filters(&self) -> Vec<QueryFilter> {
        if self.filters.is_empty() {
            vec![QueryFilter::default()]
        } else {
            self.filters.clone()
        }
    }

    pub fn resolve_end(&self, today: NaiveDate) -> NaiveDate {
        self.end.unwrap_or(today)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.window_months == 0 {
            return Err(AppError::config("Window size must be at least one month."));
        }
        if self.page_cap == 0 {
            return Err(AppError::config("Page cap must be at least 1."));
        }
        if self.api_url.trim().is_empty() {
            return Err(AppError::config("API URL must not be empty."));
        }
        if let Some(end) = self.end {
            if end < self.start {
                return Err(AppError::config(format!(
                    "End date {end} is before start date {}.",
                    self.start
                )));
            }
        }
        Ok(())
    }
}

/// Records fetched for one window under one filter.
#[derive(Debug, Clone)]
pub struct WindowResult {
    pub window: QueryWindow,
    pub filter: QueryFilter,
    pub records: Vec<IncidentRecord>,
    /// Raw JSON file written for this window (none for empty windows).
    pub raw_path: Option<PathBuf>,
    /// True when this window came from bisecting a capped parent window.
    pub from_split: bool,
    /// True when the response still hit the cap and could not be split further.
    pub at_cap: bool,
}

impl WindowResult {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Year a record belongs to: the `年度` field if present, else the year of `發生日期`.
pub fn record_year(record: &IncidentRecord) -> Option<String> {
    if let Some(year) = record.get(FIELD_YEAR).and_then(scalar_text) {
        if !year.is_empty() {
            return Some(year);
        }
    }
    let date = record.get(FIELD_DATE).and_then(scalar_text)?;
    parse_incident_date(&date).map(|d| d.year().to_string())
}

/// Parse `YYYYMMDD` or `YYYY-MM-DD`.
pub fn parse_incident_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, API_DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y-%m-%d"))
        .ok()
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn window_rejects_inverted_range() {
        let err = QueryWindow::new(d(2020, 2, 1), d(2020, 1, 1)).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn split_halves_are_contiguous() {
        let w = QueryWindow::new(d(2020, 1, 1), d(2020, 6, 30)).unwrap();
        let (a, b) = w.split().unwrap();
        assert_eq!(a.start, w.start);
        assert_eq!(b.end, w.end);
        assert_eq!(a.end.succ_opt().unwrap(), b.start);
        assert_eq!(a.days() + b.days(), w.days());
        assert!(a.contains(a.end) && !a.contains(b.start));
        assert!(w.contains(d(2020, 6, 30)) && !w.contains(d(2020, 7, 1)));
    }

    #[test]
    fn two_day_window_splits_into_single_days() {
        let w = QueryWindow::new(d(2020, 1, 1), d(2020, 1, 2)).unwrap();
        let (a, b) = w.split().unwrap();
        assert_eq!(a.days(), 1);
        assert_eq!(b.days(), 1);
        assert!(a.split().is_none());
    }

    #[test]
    fn window_formats_api_dates() {
        let w = QueryWindow::new(d(2018, 1, 1), d(2018, 6, 30)).unwrap();
        assert_eq!(w.api_start(), "20180101");
        assert_eq!(w.api_end(), "20180630");
        assert_eq!(w.to_string(), "20180101 ~ 20180630");
    }

    #[test]
    fn filter_params_and_label() {
        assert!(QueryFilter::default().is_empty());
        assert!(QueryFilter::default().label().is_none());

        let f = QueryFilter {
            addr: Some("臺中市".to_string()),
            keyword: Some("墜落".to_string()),
        };
        assert_eq!(f.query_params(), vec![("info_addr", "臺中市"), ("info_q", "墜落")]);
        assert_eq!(f.label().as_deref(), Some("臺中市_墜落"));
    }

    #[test]
    fn default_config_matches_no_argument_run() {
        let cfg = FetchConfig::default();
        assert_eq!(cfg.start, d(2018, 1, 1));
        assert_eq!(cfg.window_months, 6);
        assert_eq!(cfg.page_cap, 200);
        assert_eq!(
            cfg.processed_path(),
            PathBuf::from("data").join("processed").join("重大職業災害_2018至今.csv")
        );
        assert_eq!(cfg.effective_filters(), vec![QueryFilter::default()]);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_window() {
        let cfg = FetchConfig {
            window_months: 0,
            ..FetchConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn record_year_falls_back_to_incident_date() {
        let with_year = json!({"年度": "112", "發生日期": "20230105"});
        let without_year = json!({"發生日期": "20230105"});
        assert_eq!(record_year(with_year.as_object().unwrap()).as_deref(), Some("112"));
        assert_eq!(record_year(without_year.as_object().unwrap()).as_deref(), Some("2023"));
        assert_eq!(record_year(&IncidentRecord::new()), None);
    }
}
