// src/report/markdown.rs

//! Markdown renderers for the run report and the global summary.

use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::models::QuoteEntry;
use crate::pipeline::RunReport;
use crate::report::stats::{QuoteStats, Ranked};

/// Render the per-run report. At most `sample_size` new quotations are
/// listed; changed and disappeared quotations are listed in full.
pub fn render_run_report(
    report: &RunReport,
    generated_at: DateTime<Utc>,
    sample_size: usize,
) -> String {
    let mut md = String::new();

    let _ = writeln!(md, "# QuotePulse Run Report\n");
    let _ = writeln!(md, "- **Run ID:** {}", report.run_id);
    let _ = writeln!(md, "- **Timestamp:** {}", generated_at.to_rfc3339());
    let _ = writeln!(md, "- **Pages Scraped:** {}", report.pages_scraped);
    let _ = writeln!(md, "- **Total Quotes Seen:** {}\n", report.total_seen);

    let _ = writeln!(md, "## Summary\n");
    let _ = writeln!(md, "- **New Quotes:** {}", report.new_quotes.len());
    let _ = writeln!(md, "- **Changed Quotes (Tags):** {}", report.changed_quotes.len());
    let _ = writeln!(md, "- **Disappeared Quotes:** {}", report.disappeared_quotes.len());
    let _ = writeln!(md, "- **Unchanged Quotes:** {}", report.unchanged_count);
    if !report.failed_pages.is_empty() {
        let pages: Vec<String> = report.failed_pages.iter().map(|p| p.to_string()).collect();
        let _ = writeln!(md, "- **Failed Pages:** {}", pages.join(", "));
    }
    if report.skipped_records > 0 {
        let _ = writeln!(md, "- **Skipped Records:** {}", report.skipped_records);
    }

    if !report.new_quotes.is_empty() {
        let _ = writeln!(md, "\n## New Quotes (Sample {})\n", sample_size);
        for quote in report.new_quotes.iter().take(sample_size) {
            let _ = writeln!(md, "{}", quote_line(quote, ""));
        }
    }

    if !report.changed_quotes.is_empty() {
        let _ = writeln!(md, "\n## Changed Quotes\n");
        for quote in &report.changed_quotes {
            let _ = writeln!(md, "{}", quote_line(quote, " (Tags updated)"));
        }
    }

    if !report.disappeared_quotes.is_empty() {
        let _ = writeln!(md, "\n## Disappeared Quotes\n");
        for quote in &report.disappeared_quotes {
            let _ = writeln!(md, "{}", quote_line(quote, ""));
        }
    }

    md
}

/// Render `summary.md` from global stats, listing `top_n` of each ranking.
pub fn render_summary(stats: &QuoteStats, top_n: usize) -> String {
    let mut md = String::new();

    let _ = writeln!(md, "# QuotePulse Global Summary\n");
    let _ = writeln!(md, "- **Total Unique Quotes:** {}\n", stats.total_quotes);

    let _ = writeln!(md, "## Top {} Authors\n", top_n);
    write_ranked(&mut md, &stats.top_authors, top_n, "quotes");

    let _ = writeln!(md, "\n## Top {} Tags\n", top_n);
    write_ranked(&mut md, &stats.top_tags, top_n, "occurrences");

    md
}

fn quote_line(quote: &QuoteEntry, suffix: &str) -> String {
    format!("- \"{}\" by **{}**{}", quote.quote_text, quote.author_name, suffix)
}

fn write_ranked(md: &mut String, ranked: &[Ranked], top_n: usize, unit: &str) {
    for entry in ranked.iter().take(top_n) {
        let _ = writeln!(md, "- {}: {} {}", entry.name, entry.count, unit);
    }
}
