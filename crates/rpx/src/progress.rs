//! 📊 progress.rs: "Are we there yet?" Now asked of event files instead of road trips.
//!
//! Two things live here:
//! - [`ProgressMetrics`]: an `indicatif` bar that follows bytes read from the events file,
//!   with a small `comfy-table` of event counts and rates as its message.
//! - [`RunSummary`]: what the pump did, rendered as a table at the very end.
//!
//! ⚠️ Watching the bar does not make reports render faster. We checked. 🦆

use std::fmt;
use std::time::{Duration, Instant};

use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::NOTHING};
use indicatif::{ProgressBar, ProgressStyle};

/// 🔢 "1000000" → "1,000,000". Eyes everywhere rejoice.
pub(crate) fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// ⏱️ MM:SS, or HH:MM:SS for the long hauls.
pub(crate) fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// 📊 Tracks how far through the events file we are.
///
/// `total_size` is the file length in bytes, 0 when unknown. The bar position is bytes,
/// the message counts events and pages.
pub(crate) struct ProgressMetrics {
    source_name: String,
    total_size: u64,
    total_bytes: u64,
    total_events: u64,
    total_pages: u64,
    progress_bar: ProgressBar,
    start_time: Instant,
}

impl fmt::Debug for ProgressMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // -- ProgressBar has no Debug, and nobody wants it in one anyway
        f.debug_struct("ProgressMetrics")
            .field("source_name", &self.source_name)
            .field("total_size", &self.total_size)
            .field("total_bytes", &self.total_bytes)
            .field("total_events", &self.total_events)
            .field("total_pages", &self.total_pages)
            .finish()
    }
}

impl ProgressMetrics {
    pub(crate) fn new(source_name: String, total_size: u64) -> Self {
        let progress_bar = ProgressBar::new(total_size);
        // -- a bad template falls back to the plain bar instead of taking the run down with it
        let style = ProgressStyle::with_template("{msg}\n| [{bar:40.cyan/blue}] {percent}%")
            .map(|style| style.progress_chars("=>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style);

        Self {
            source_name,
            total_size,
            total_bytes: 0,
            total_events: 0,
            total_pages: 0,
            progress_bar,
            start_time: Instant::now(),
        }
    }

    /// 🔄 One page read: `bytes` off disk, `events` into the page.
    pub(crate) fn update(&mut self, bytes: u64, events: u64) {
        self.total_bytes += bytes;
        self.total_events += events;
        if events > 0 {
            self.total_pages += 1;
        }
        self.progress_bar.set_position(self.total_bytes);
        self.progress_bar.set_message(self.render());
    }

    pub(crate) fn total_events(&self) -> u64 {
        self.total_events
    }

    /// ✅ EOF. Ring the bell.
    pub(crate) fn finish(&self) {
        self.progress_bar.finish();
    }

    fn events_per_sec(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.total_events as f64 / elapsed
        } else {
            0.0
        }
    }

    fn render(&self) -> String {
        let mut table = Table::new();
        table.load_preset(NOTHING);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.add_row(vec![
            Cell::new(format!("{} Events/s", format_number(self.events_per_sec() as u64)))
                .set_alignment(CellAlignment::Right),
            Cell::new(format!("{} Events", format_number(self.total_events)))
                .set_alignment(CellAlignment::Right),
        ]);
        table.add_row(vec![
            Cell::new(format!("{} elapsed", format_duration(self.start_time.elapsed())))
                .set_alignment(CellAlignment::Right),
            Cell::new(format!("{} Pages", format_number(self.total_pages)))
                .set_alignment(CellAlignment::Right),
        ]);
        format!("source: {}\n{}", self.source_name, table)
    }
}

/// 🧾 What one run of the pump amounted to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// 📦 pages handed to the sink (query mode: triggers fired)
    pub batches: u64,
    /// 📄 events read from the input file
    pub events: u64,
    /// 🖨️ report files written
    pub reports: u64,
    /// 💀 publishes that failed and were skipped
    pub failed: u64,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.load_preset(NOTHING);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        let rows = [
            ("batches", format_number(self.batches)),
            ("events", format_number(self.events)),
            ("reports", format_number(self.reports)),
            ("failed", format_number(self.failed)),
            ("elapsed", format_duration(self.elapsed)),
        ];
        for (label, value) in rows {
            table.add_row(vec![
                Cell::new(label),
                Cell::new(value).set_alignment(CellAlignment::Right),
            ]);
        }
        table
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_table())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_big_numbers_get_their_commas() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1_000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn the_one_where_an_hour_shows_up_only_when_earned() {
        assert_eq!(format_duration(Duration::from_secs(75)), "01:15");
        assert_eq!(format_duration(Duration::from_secs(3_661)), "01:01:01");
    }

    #[test]
    fn the_one_where_empty_pages_do_not_count() {
        let mut progress = ProgressMetrics::new("events.ndjson".into(), 100);
        progress.update(40, 2);
        progress.update(0, 0);
        assert_eq!(progress.total_events(), 2);
        assert_eq!(progress.total_pages, 1);
        progress.finish();
    }

    #[test]
    fn the_one_where_the_summary_reads_like_a_receipt() {
        let summary = RunSummary {
            batches: 3,
            events: 1_200,
            reports: 2,
            failed: 1,
            elapsed: Duration::from_secs(5),
        };
        let rendered = summary.to_string();
        assert!(rendered.contains("1,200"));
        assert!(rendered.contains("failed"));
        assert!(rendered.contains("00:05"));
        assert!(!summary.is_clean());
    }
}
