use chrono::NaiveDate;
use colored::{control, Colorize};

use crate::core::models::report::DayReport;

/// Render a day report as a colored (or plain) string.
///
/// Layout:
/// ```text
///  Usage for 25-08-2026
///   10:30:00     100 tokens (60 prompt / 40 completion)  $0.0020
///   10:31:05      50 tokens (30 prompt / 20 completion)  $0.0010
///   Day cost   $0.0030 (2 calls)
/// ```
pub fn render_day_report(report: &DayReport, use_color: bool) -> String {
    control::set_override(use_color);

    let mut lines: Vec<String> = Vec::new();
    lines.push(
        format!(" Usage for {}", report.date.format("%d-%m-%Y"))
            .bold()
            .to_string(),
    );

    for record in &report.records {
        lines.push(format!(
            "  {}  {:>6} tokens ({} prompt / {} completion)  {}",
            record.time_stamp.cyan(),
            format_tokens(record.total_tokens),
            format_tokens(record.prompt_tokens),
            format_tokens(record.completion_tokens),
            format_usd(record.total_cost),
        ));
    }

    let calls = format!(
        "{} call{}",
        report.calls,
        if report.calls == 1 { "" } else { "s" }
    );
    lines.push(format!(
        "  {}   {} ({})",
        "Day cost".cyan(),
        format_usd(report.day_cost).bold(),
        calls
    ));

    lines.join("\n")
}

/// Render the one-line running total for a day.
pub fn render_day_total(date: NaiveDate, day_cost: f64, calls: usize, use_color: bool) -> String {
    control::set_override(use_color);
    format!(
        " {} spent on {} ({} call{})",
        format_usd(day_cost).bold(),
        date.format("%d-%m-%Y"),
        calls,
        if calls == 1 { "" } else { "s" }
    )
}

/// Friendly notice for a day with no ledger yet.
pub fn render_no_usage(date: NaiveDate, use_color: bool) -> String {
    control::set_override(use_color);
    format!(" No usage recorded for {}", date.format("%d-%m-%Y"))
        .dimmed()
        .to_string()
}

fn format_tokens(count: u64) -> String {
    if count >= 1_000_000 {
        format!("{:.1}M", count as f64 / 1_000_000.0)
    } else if count >= 1_000 {
        format!("{:.1}K", count as f64 / 1_000.0)
    } else {
        format!("{}", count)
    }
}

/// Dollar display that keeps sub-cent call costs visible.
fn format_usd(usd: f64) -> String {
    if usd >= 0.1 {
        format!("${:.2}", usd)
    } else {
        format!("${:.4}", usd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::usage::{CallUsage, DailyLedger, UsageRecord};

    fn make_report() -> DayReport {
        let mut ledger = DailyLedger::default();
        ledger.push(UsageRecord::from_usage(
            &CallUsage::from_split(60, 40, 0.002),
            "10:30:00".to_string(),
        ));
        ledger.push(UsageRecord::from_usage(
            &CallUsage::from_split(30, 20, 0.001),
            "10:31:05".to_string(),
        ));
        DayReport::from_ledger(NaiveDate::from_ymd_opt(2026, 8, 25).unwrap(), ledger)
    }

    #[test]
    fn report_contains_date_key() {
        let output = render_day_report(&make_report(), false);
        assert!(output.contains("25-08-2026"));
    }

    #[test]
    fn report_contains_timestamps_in_order() {
        let output = render_day_report(&make_report(), false);
        let first = output.find("10:30:00").unwrap();
        let second = output.find("10:31:05").unwrap();
        assert!(first < second);
    }

    #[test]
    fn report_contains_token_split_and_costs() {
        let output = render_day_report(&make_report(), false);
        assert!(output.contains("100 tokens"));
        assert!(output.contains("60 prompt / 40 completion"));
        assert!(output.contains("$0.0020"));
        assert!(output.contains("$0.0030"));
        assert!(output.contains("2 calls"));
    }

    #[test]
    fn report_no_ansi_when_color_false() {
        let output = render_day_report(&make_report(), false);
        assert!(!output.contains('\x1b'), "output should not contain ANSI codes");
    }

    #[test]
    fn total_line_uses_singular_for_one_call() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 25).unwrap();
        let output = render_day_total(date, 0.002, 1, false);
        assert!(output.contains("1 call"));
        assert!(!output.contains("1 calls"));
    }

    #[test]
    fn no_usage_notice_names_the_day() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 26).unwrap();
        let output = render_no_usage(date, false);
        assert!(output.contains("No usage recorded"));
        assert!(output.contains("26-08-2026"));
    }

    #[test]
    fn format_tokens_abbreviates() {
        assert_eq!(format_tokens(999), "999");
        assert_eq!(format_tokens(1_500), "1.5K");
        assert_eq!(format_tokens(2_000_000), "2.0M");
    }

    #[test]
    fn format_usd_keeps_subcent_precision() {
        assert_eq!(format_usd(0.002), "$0.0020");
        assert_eq!(format_usd(12.5), "$12.50");
        assert_eq!(format_usd(0.0), "$0.0000");
    }
}
