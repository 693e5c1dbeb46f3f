//! Preparation and evaluation summaries

use std::time::Duration;

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;

use crate::model::EvaluationReport;
use crate::pipeline::PrepareStats;

fn print_section(icon: &str, title: &str) {
    println!();
    println!("    {} {}", style(icon).cyan(), style(title).white().bold());
    println!("    {}", style("─".repeat(50)).dim());
    println!();
}

fn print_indented(table: &Table) {
    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}

fn format_duration(duration: Duration) -> String {
    format!("{:.2}s", duration.as_secs_f64())
}

fn metric_color(value: f64) -> Color {
    if value >= 0.8 {
        Color::Green
    } else if value >= 0.6 {
        Color::Yellow
    } else {
        Color::Red
    }
}

/// Row counts through the preparation stages
pub fn prepare_table(stats: &PrepareStats) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Stage").add_attribute(Attribute::Bold),
        Cell::new("Rows").add_attribute(Attribute::Bold),
        Cell::new("Time").add_attribute(Attribute::Bold),
    ]);

    let dropped_missing = stats.rows_loaded - stats.rows_after_missing;
    let dropped_outliers = stats.rows_after_missing - stats.rows_after_outliers;

    table.add_row(vec![
        Cell::new("📁 Loaded"),
        Cell::new(stats.rows_loaded),
        Cell::new("-"),
    ]);
    table.add_row(vec![
        Cell::new("🩹 Missing values"),
        Cell::new(format!("{} (-{})", stats.rows_after_missing, dropped_missing)).fg(
            if dropped_missing == 0 {
                Color::White
            } else {
                Color::Red
            },
        ),
        Cell::new(format_duration(stats.missing_time)),
    ]);
    table.add_row(vec![
        Cell::new("📉 Outliers"),
        Cell::new(format!("{} (-{})", stats.rows_after_outliers, dropped_outliers)).fg(
            if dropped_outliers == 0 {
                Color::White
            } else {
                Color::Red
            },
        ),
        Cell::new(format_duration(stats.outlier_time)),
    ]);
    table.add_row(vec![
        Cell::new("🔧 Transformed features"),
        Cell::new(stats.feature_count).fg(Color::Cyan),
        Cell::new(format_duration(stats.transform_time)),
    ]);
    table.add_row(vec![
        Cell::new("✂️  Train / Test"),
        Cell::new(format!("{} / {}", stats.train_rows, stats.test_rows))
            .fg(Color::Green)
            .add_attribute(Attribute::Bold),
        Cell::new(format_duration(stats.split_time)),
    ]);

    table
}

/// Columns with nulls in the raw data, or `None` when the data was complete
pub fn missing_table(stats: &PrepareStats) -> Option<Table> {
    let incomplete: Vec<&(String, f64)> = stats
        .missing_ratios
        .iter()
        .filter(|(_, ratio)| *ratio > 0.0)
        .collect();
    if incomplete.is_empty() {
        return None;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Column").add_attribute(Attribute::Bold),
        Cell::new("Missing").add_attribute(Attribute::Bold),
    ]);
    for (column, ratio) in incomplete {
        table.add_row(vec![
            Cell::new(column),
            Cell::new(format!("{:.2}%", ratio * 100.0)).fg(Color::Yellow),
        ]);
    }
    Some(table)
}

pub fn display_prepare_summary(stats: &PrepareStats) {
    print_section("📋", "PREPARATION SUMMARY");
    if let Some(table) = missing_table(stats) {
        print_indented(&table);
        println!();
    }
    print_indented(&prepare_table(stats));
}

/// Test-split metrics plus the training accuracy
pub fn evaluation_table(report: &EvaluationReport, train_accuracy: f64) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Metric").add_attribute(Attribute::Bold),
        Cell::new("Value").add_attribute(Attribute::Bold),
    ]);

    let rows = [
        ("Train accuracy", train_accuracy),
        ("Test accuracy", report.accuracy),
        ("Precision", report.precision),
        ("Recall", report.recall),
        ("F1 score", report.f1),
    ];
    for (name, value) in rows {
        table.add_row(vec![
            Cell::new(name),
            Cell::new(format!("{:.4}", value)).fg(metric_color(value)),
        ]);
    }

    table
}

/// Confusion counts laid out actual (rows) by predicted (columns)
pub fn confusion_table(report: &EvaluationReport) -> Table {
    let cm = &report.confusion_matrix;
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new(""),
        Cell::new("Predicted Retain").add_attribute(Attribute::Bold),
        Cell::new("Predicted Churn").add_attribute(Attribute::Bold),
    ]);
    table.add_row(vec![
        Cell::new("Actual Retain").add_attribute(Attribute::Bold),
        Cell::new(cm.true_negative).fg(Color::Green),
        Cell::new(cm.false_positive).fg(Color::Red),
    ]);
    table.add_row(vec![
        Cell::new("Actual Churn").add_attribute(Attribute::Bold),
        Cell::new(cm.false_negative).fg(Color::Red),
        Cell::new(cm.true_positive).fg(Color::Green),
    ]);
    table
}

pub fn display_evaluation(report: &EvaluationReport, train_accuracy: f64) {
    print_section("📊", "EVALUATION");
    print_indented(&evaluation_table(report, train_accuracy));
    println!();
    print_indented(&confusion_table(report));
}
