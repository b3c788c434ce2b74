//! The fetch pipeline, independent of how it is invoked.
//!
//! windows -> fetch (per window, per filter) -> raw archive -> aggregate
//! -> normalize + flatten -> CSV
//!
//! Everything runs sequentially on the calling thread. Any error aborts the
//! run; raw files already written stay on disk.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::data::IncidentSource;
use crate::domain::{FIELD_DATE, FetchConfig, IncidentRecord, QueryFilter, QueryWindow, WindowResult, parse_incident_date};
use crate::error::AppError;
use crate::io::{FlatTable, flatten_records, normalize_record, write_incidents_csv, write_raw_json};
use crate::window::WindowPlan;

/// All outputs of one run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub source: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Windows from the plan, before any cap-driven splitting.
    pub planned_windows: usize,
    /// One entry per request that was kept, in fetch order.
    pub results: Vec<WindowResult>,
    /// Every record across all results, in window order, as fetched.
    pub records: Vec<IncidentRecord>,
    /// Flattened dataset; empty when nothing was fetched.
    pub table: FlatTable,
    /// CSV written by this run. `None` when every window came back empty and
    /// the previous export was left in place.
    pub csv_path: Option<PathBuf>,
    pub raw_dir: PathBuf,
}

impl RunOutput {
    pub fn total_records(&self) -> usize {
        self.records.len()
    }

    /// Results that still hit the cap after splitting.
    pub fn capped(&self) -> impl Iterator<Item = &WindowResult> {
        self.results.iter().filter(|r| r.at_cap)
    }
}

/// Execute the full pipeline against `source`. `today` bounds the last window
/// when the config has no explicit end date.
pub fn run_fetch<S: IncidentSource + ?Sized>(
    config: &FetchConfig,
    source: &S,
    today: NaiveDate,
) -> Result<RunOutput, AppError> {
    config.validate()?;

    let end = config.resolve_end(today);
    let plan = WindowPlan::new(config.start, end, config.window_months)?;
    let planned_windows = plan.iter().count();

    info!(
        source = %source.describe(),
        start = %plan.start(),
        end = %plan.end(),
        windows = planned_windows,
        months = plan.months(),
        "starting collection"
    );

    let results = collect_windows(config, source, &plan)?;
    let records = aggregate(&results);
    info!(records = records.len(), "all windows fetched");

    let (table, csv_path) = if records.is_empty() {
        warn!(
            path = %config.processed_path().display(),
            "no records fetched from any window; keeping the existing CSV"
        );
        (FlatTable::default(), None)
    } else {
        let path = config.processed_path();
        let table = write_processed(&path, &records)?;
        (table, Some(path))
    };

    Ok(RunOutput {
        source: source.describe(),
        start: plan.start(),
        end: plan.end(),
        planned_windows,
        results,
        records,
        table,
        csv_path,
        raw_dir: config.raw_dir(),
    })
}

/// Fetch every window of `plan` once per filter, archiving raw responses.
pub fn collect_windows<S: IncidentSource + ?Sized>(
    config: &FetchConfig,
    source: &S,
    plan: &WindowPlan,
) -> Result<Vec<WindowResult>, AppError> {
    let filters = config.effective_filters();
    let total = plan.iter().count() * filters.len();
    let mut pacer = Pacer::new(config.request_delay);
    let mut out = Vec::with_capacity(total);

    let mut n = 0usize;
    for filter in &filters {
        for window in plan {
            n += 1;
            match filter.label() {
                Some(label) => info!("[{n}/{total}] {window} ({label})"),
                None => info!("[{n}/{total}] {window}"),
            }
            fetch_into(config, source, window, filter, false, &mut pacer, &mut out)?;
        }
    }

    Ok(out)
}

/// Fetch one window; bisect and recurse when the response hits the cap.
fn fetch_into<S: IncidentSource + ?Sized>(
    config: &FetchConfig,
    source: &S,
    window: QueryWindow,
    filter: &QueryFilter,
    from_split: bool,
    pacer: &mut Pacer,
    out: &mut Vec<WindowResult>,
) -> Result<(), AppError> {
    pacer.wait();
    let page = source.fetch_window(&window, filter)?;
    let count = page.records.len();
    info!(%window, count, "received");

    let mut at_cap = false;
    if count >= config.page_cap {
        if config.split_on_cap {
            if let Some((left, right)) = window.split() {
                warn!(%window, count, cap = config.page_cap, "response hit the cap; splitting window");
                fetch_into(config, source, left, filter, true, pacer, out)?;
                fetch_into(config, source, right, filter, true, pacer, out)?;
                return Ok(());
            }
        }
        warn!(%window, count, cap = config.page_cap, "response hit the cap; records may be truncated");
        at_cap = true;
    }

    let outside = records_outside(&window, &page.records);
    if outside > 0 {
        // The API filters on post date, so a late-posted incident can predate its window.
        warn!(%window, outside, "records with an incident date outside the query window");
    }

    let raw_path = if page.records.is_empty() {
        None
    } else {
        let path = write_raw_json(&config.raw_dir(), &window, filter, &page.body)?;
        info!(path = %path.display(), "saved raw response");
        Some(path)
    };

    out.push(WindowResult {
        window,
        filter: filter.clone(),
        records: page.records,
        raw_path,
        from_split,
        at_cap,
    });
    Ok(())
}

/// Count records whose parseable incident date falls outside `window`.
fn records_outside(window: &QueryWindow, records: &[IncidentRecord]) -> usize {
    records
        .iter()
        .filter_map(|r| r.get(FIELD_DATE).and_then(|v| v.as_str()))
        .filter_map(parse_incident_date)
        .filter(|date| !window.contains(*date))
        .count()
}

/// Concatenate all results, keeping window order.
pub fn aggregate(results: &[WindowResult]) -> Vec<IncidentRecord> {
    let total = results.iter().map(WindowResult::len).sum();
    let mut out = Vec::with_capacity(total);
    for result in results {
        out.extend(result.records.iter().cloned());
    }
    out
}

/// Normalize, flatten and write the combined CSV. Returns the written table.
pub fn write_processed(path: &std::path::Path, records: &[IncidentRecord]) -> Result<FlatTable, AppError> {
    let normalized: Vec<IncidentRecord> = records.iter().map(normalize_record).collect();
    let table = flatten_records(&normalized);
    write_incidents_csv(path, &table)?;
    info!(path = %path.display(), rows = table.len(), columns = table.columns.len(), "wrote processed CSV");
    Ok(table)
}

/// Spaces consecutive requests by a fixed delay. The first request goes out immediately.
struct Pacer {
    delay: Duration,
    started: bool,
}

impl Pacer {
    fn new(delay: Duration) -> Self {
        Self { delay, started: false }
    }

    fn wait(&mut self) {
        if self.started && !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        self.started = true;
    }
}
