//! 🧾 The end-of-run summary, rendered as a table so comfy it has lumbar support.
//!
//! Because "36507222016 bytes" is a war crime in a terminal.

use std::time::Duration;

use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::NOTHING};

use crate::stats::RunStats;

const SI_UNITS: [&str; 7] = ["B", "kB", "MB", "GB", "TB", "PB", "EB"];

/// 📦 Bytes in SI units with one significant decimal below 10: `35 B`, `1.2 kB`, `36 GB`.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 10 {
        return format!("{} B", bytes);
    }
    // -- integer division picks the unit; log10 floats love landing on 2.9999999
    let mut exponent = 0usize;
    let mut remaining = bytes;
    while remaining >= 1000 && exponent < SI_UNITS.len() - 1 {
        remaining /= 1000;
        exponent += 1;
    }
    let scaled = bytes as f64 / 1000f64.powi(exponent as i32);
    // -- round to one decimal, then decide if that decimal earns its keep
    let rounded = (scaled * 10.0 + 0.5).floor() / 10.0;
    if rounded < 10.0 {
        format!("{:.1} {}", rounded, SI_UNITS[exponent])
    } else {
        format!("{:.0} {}", rounded, SI_UNITS[exponent])
    }
}

/// 🔢 "1000000" → "1,000,000". You're welcome, eyes.
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// ⏱️ Sub-minute runs get milliseconds; anything longer gets MM:SS or HH:MM:SS.
/// If it shows HH:MM:SS, you should probably call your mom. It's been a while.
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    if total_secs < 60 {
        return format!("{:.3}s", duration.as_secs_f64());
    }
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// 🍽️ Render the run summary.
///
/// The "total size" row is the listing-time sum. Fetched bytes and failures get
/// their own rows, so a bucket full of 403s can't hide behind a big number.
pub fn render_summary(stats: &RunStats, source_label: &str) -> String {
    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let rows = [
        ("source", source_label.to_string()),
        ("objects listed", format_number(stats.object_count)),
        ("total size (listed)", format_bytes(stats.total_bytes)),
        ("fetched ok", format_number(stats.fetch.succeeded)),
        ("fetch failures", format_number(stats.fetch.failed)),
        ("bytes fetched", format_bytes(stats.fetch.bytes_read)),
        ("elapsed", format_duration(stats.elapsed())),
    ];
    for (name, value) in rows {
        table.add_row(vec![
            Cell::new(name).set_alignment(CellAlignment::Right),
            Cell::new(value).set_alignment(CellAlignment::Left),
        ]);
    }

    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::FetchOutcome;

    #[test]
    fn the_one_where_bytes_speak_human() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(9), "9 B");
        assert_eq!(format_bytes(35), "35 B");
        assert_eq!(format_bytes(999), "999 B");
        assert_eq!(format_bytes(1_000), "1.0 kB");
        assert_eq!(format_bytes(1_234), "1.2 kB");
        assert_eq!(format_bytes(12_345), "12 kB");
        assert_eq!(format_bytes(82_854_982), "83 MB");
        assert_eq!(format_bytes(1_500_000_000), "1.5 GB");
        assert_eq!(format_bytes(u64::MAX), "18 EB");
    }

    #[test]
    fn the_one_where_numbers_get_their_commas() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1_000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn the_one_where_durations_pick_the_right_outfit() {
        assert_eq!(format_duration(Duration::from_millis(1_234)), "1.234s");
        assert_eq!(format_duration(Duration::from_secs(61)), "01:01");
        assert_eq!(format_duration(Duration::from_secs(3_661)), "01:01:01");
    }

    #[test]
    fn the_one_where_the_summary_tells_both_sides_of_the_story() {
        let mut the_stats = RunStats::start();
        for size in [10, 20, 5] {
            the_stats.record_listed(size);
        }
        the_stats.finish(FetchOutcome {
            processed: 3,
            succeeded: 2,
            failed: 1,
            bytes_read: 30,
        });

        let the_summary = render_summary(&the_stats, "s3://dspm-s3-test-1/");
        assert!(the_summary.contains("s3://dspm-s3-test-1/"));
        assert!(the_summary.contains("35 B"));
        assert!(the_summary.contains("30 B"));
        assert!(the_summary.contains("fetch failures"));
    }
}
