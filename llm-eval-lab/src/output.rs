//! Output formatting for the command line

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};
use indicatif::{ProgressBar, ProgressStyle};
use llm_eval_core::{EvaluationReport, JobProgress, JobStatus, JobSummary};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    Json,
    Yaml,
}

pub struct OutputWriter {
    format: OutputFormat,
}

impl OutputWriter {
    pub fn new(format: OutputFormat, no_color: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self { format }
    }

    pub fn is_table(&self) -> bool {
        self.format == OutputFormat::Table
    }

    pub fn write<T: Serialize + TableDisplay>(&self, item: &T) -> Result<()> {
        match self.format {
            OutputFormat::Table => item.display_single(),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(item)?),
            OutputFormat::Yaml => print!("{}", serde_yaml::to_string(item)?),
        }
        Ok(())
    }

    pub fn write_list<T: Serialize + TableDisplay>(&self, items: &[T], headers: &[&str]) -> Result<()> {
        match self.format {
            OutputFormat::Table => {
                if items.is_empty() {
                    println!("{}", "No items found.".dimmed());
                    return Ok(());
                }

                let mut table = Table::new();
                table.load_preset(UTF8_FULL);
                table.apply_modifier(UTF8_ROUND_CORNERS);
                table.set_header(headers.iter().map(|h| Cell::new(h).fg(Color::Cyan)));
                for item in items {
                    table.add_row(item.to_row());
                }

                println!("{table}");
                println!("\n{} {} item(s)", "Total:".bold(), items.len().to_string().green());
            }
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(items)?),
            OutputFormat::Yaml => print!("{}", serde_yaml::to_string(items)?),
        }
        Ok(())
    }

    pub fn warning(&self, message: &str) {
        if self.is_table() {
            eprintln!("{} {}", "⚠".yellow(), message);
        } else {
            eprintln!("Warning: {}", message);
        }
    }

    pub fn error(&self, message: &str) {
        if self.is_table() {
            eprintln!("{} {}", "✗".red(), message);
        } else {
            eprintln!("Error: {}", message);
        }
    }

    /// Item-count progress bar; hidden outside table output.
    pub fn progress_bar(&self, total: u64, message: &str) -> ProgressBar {
        if !self.is_table() {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(total);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏ "));
        }
        pb.set_message(message.to_string());
        pb
    }
}

pub trait TableDisplay {
    fn to_row(&self) -> Vec<Cell>;
    fn display_single(&self);
}

pub fn print_field(key: &str, value: &str) {
    println!("  {}: {}", key.cyan(), value);
}

pub fn print_section(title: &str) {
    println!("\n{}", title.bold().underline());
}

pub fn format_timestamp(dt: &chrono::DateTime<chrono::Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn format_optional_timestamp(dt: Option<&chrono::DateTime<chrono::Utc>>) -> String {
    dt.map(format_timestamp).unwrap_or_else(|| "-".to_string())
}

pub fn format_percent(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

pub fn format_ms(ms: f64) -> String {
    format!("{:.1} ms", ms)
}

pub fn status_badge(status: JobStatus) -> String {
    let label = status.as_str();
    match status {
        JobStatus::Pending => label.yellow().to_string(),
        JobStatus::Processing => label.blue().to_string(),
        JobStatus::Completed => label.green().to_string(),
        JobStatus::Failed => label.red().to_string(),
    }
}

impl TableDisplay for JobSummary {
    fn to_row(&self) -> Vec<Cell> {
        vec![
            Cell::new(self.id.to_string()),
            Cell::new(status_badge(self.status)),
            Cell::new(&self.model),
            Cell::new(self.dataset_name.as_deref().unwrap_or("-")),
            Cell::new(format!("{}/{}", self.completed_items, self.total_items)),
            Cell::new(self.pass_rate.map(format_percent).unwrap_or_else(|| "-".to_string())),
            Cell::new(format_timestamp(&self.created_at)),
        ]
    }

    fn display_single(&self) {
        print_section("Job");
        print_field("ID", &self.id.to_string());
        print_field("Status", &status_badge(self.status));
        print_field("Model", &self.model);
        print_field("Progress", &format!("{}/{}", self.completed_items, self.total_items));
    }
}

impl TableDisplay for JobProgress {
    fn to_row(&self) -> Vec<Cell> {
        vec![
            Cell::new(self.job_id.to_string()),
            Cell::new(status_badge(self.status)),
            Cell::new(format!("{:.1}%", self.progress_percent)),
        ]
    }

    fn display_single(&self) {
        print_section("Job Status");
        print_field("ID", &self.job_id.to_string());
        print_field("Status", &status_badge(self.status));
        print_field(
            "Progress",
            &format!(
                "{}/{} ({:.1}%)",
                self.completed_items, self.total_items, self.progress_percent
            ),
        );
        if let Some(error) = &self.error_message {
            print_field("Error", &error.red().to_string());
        }
    }
}

impl TableDisplay for EvaluationReport {
    fn to_row(&self) -> Vec<Cell> {
        vec![
            Cell::new(self.job_id.to_string()),
            Cell::new(status_badge(self.status)),
            Cell::new(format_percent(self.pass_rate)),
            Cell::new(format_ms(self.avg_latency_ms)),
        ]
    }

    fn display_single(&self) {
        print_section("Evaluation Report");
        print_field("ID", &self.job_id.to_string());
        print_field("Status", &status_badge(self.status));
        print_field("Model", &self.model);
        print_field("Dataset", self.dataset_name.as_deref().unwrap_or("-"));

        print_section("Quality");
        print_field(
            "Passed",
            &format!("{}/{}", self.passed_items.to_string().green(), self.total_items),
        );
        print_field("Failed", &self.failed_items.to_string());
        print_field("Pass rate", &format_percent(self.pass_rate));
        print_field(
            "Perplexity",
            &self
                .avg_perplexity
                .map(|p| format!("{:.3}", p))
                .unwrap_or_else(|| "-".to_string()),
        );

        print_section("Latency");
        print_field("Average", &format_ms(self.avg_latency_ms));
        print_field("Min", &format_ms(self.min_latency_ms));
        print_field("Max", &format_ms(self.max_latency_ms));

        print_section("Timing");
        print_field("Created", &format_timestamp(&self.created_at));
        print_field("Started", &format_optional_timestamp(self.started_at.as_ref()));
        print_field("Completed", &format_optional_timestamp(self.completed_at.as_ref()));

        if let Some(results) = &self.results {
            print_section("Items");
            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.apply_modifier(UTF8_ROUND_CORNERS);
            table.set_header(
                ["#", "Prompt", "Passed", "Latency", "Perplexity", "Reason"]
                    .iter()
                    .map(|h| Cell::new(h).fg(Color::Cyan)),
            );
            for (index, result) in results.iter().enumerate() {
                table.add_row(vec![
                    Cell::new(index + 1),
                    Cell::new(truncate(&result.input_prompt, 40)),
                    if result.passed {
                        Cell::new("yes").fg(Color::Green)
                    } else {
                        Cell::new("no").fg(Color::Red)
                    },
                    Cell::new(format_ms(result.latency_ms)),
                    Cell::new(
                        result
                            .perplexity
                            .map(|p| format!("{:.3}", p))
                            .unwrap_or_else(|| "-".to_string()),
                    ),
                    Cell::new(result.failure_reason.as_deref().unwrap_or("")),
                ]);
            }
            println!("{table}");
        }
    }
}

/// Shortens to at most `max` characters, marking the cut with `...`.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exactly ten", 11), "exactly ten");
        assert_eq!(truncate("a much longer prompt", 10), "a much ...");
        assert_eq!(truncate("héllo wörld", 8), "héllo...");
    }

    #[test]
    fn test_format_percent_and_ms() {
        assert_eq!(format_percent(2.0 / 3.0), "66.7%");
        assert_eq!(format_percent(0.0), "0.0%");
        assert_eq!(format_ms(12.345), "12.3 ms");
    }
}
