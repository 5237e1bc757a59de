//! Console reporter with colored output

use crate::dashboard::{Dashboard, DashboardStats, PanelReport};
use crate::panels::PanelDefinition;
use crate::query::{OptionSet, QueryResult};
use crate::Series;
use colored::{ColoredString, Colorize};

const BAR_WIDTH: usize = 24;

/// Reporter for terminal output
pub struct ConsoleReporter {
    /// Whether to use colors
    use_colors: bool,
    /// Whether to show verbose output
    verbose: bool,
}

impl ConsoleReporter {
    /// Create a new console reporter
    pub fn new() -> Self {
        Self {
            use_colors: true,
            verbose: false,
        }
    }

    /// Plain text everywhere: titles, emphasis and bars
    pub fn without_colors(mut self) -> Self {
        self.use_colors = false;
        self
    }

    /// Enable verbose output (option lists under each chart)
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    /// Report one chart
    pub fn report(&self, title: &str, result: &QueryResult) {
        print!("{}", self.render(title, result));
    }

    pub fn report_dashboard(&self, dashboard: &Dashboard) {
        for panel in &dashboard.panels {
            self.report_panel(panel);
            println!("{}", "─".repeat(60));
        }
        print!("{}", self.render_summary(&dashboard.stats));
    }

    /// One line per chart
    pub fn report_quiet(&self, title: &str, result: &QueryResult) {
        println!("{}", self.render_quiet(title, result));
    }

    pub fn report_options(&self, options: &OptionSet) {
        print!("{}", self.render_options(options));
    }

    pub fn report_catalog(&self, panels: &[PanelDefinition]) {
        print!("{}", self.render_catalog(panels));
    }

    fn report_panel(&self, panel: &PanelReport) {
        let title = format!("{} [{}]", panel.title, panel.chart);
        print!("{}", self.render(&title, &panel.result));
    }

    pub fn render(&self, title: &str, result: &QueryResult) -> String {
        let mut lines = vec![
            String::new(),
            self.paint(&format!("📊 {}", title), |s| s.bold()),
            format!(
                "   Rows: {} of {}",
                self.paint(&result.matched_rows.to_string(), |s| s.bold()),
                result.total_rows
            ),
            String::new(),
        ];

        if result.is_empty() {
            lines.push(format!(
                "   {}",
                self.paint("No reports match the current filters", |s| s.yellow())
            ));
            lines.push(String::new());
        }

        for series in &result.series {
            lines.extend(self.render_series(series));
        }

        if self.verbose && !result.options.is_empty() {
            lines.push(format!("   {}", self.paint("Filter options:", |s| s.bold())));
            for (field, values) in result.options.iter() {
                lines.push(format!(
                    "   {} {}",
                    self.paint(&format!("{}:", field.title()), |s| s.dimmed()),
                    values.join(", ")
                ));
            }
            lines.push(String::new());
        }

        lines.join("\n") + "\n"
    }

    fn render_series(&self, series: &Series) -> Vec<String> {
        let mut lines = vec![format!("   {}", self.paint(&series.name, |s| s.bold()))];
        if series.is_empty() {
            lines.push(format!("   {}", self.paint("(no data)", |s| s.dimmed())));
            lines.push(String::new());
            return lines;
        }

        let width = series
            .points
            .iter()
            .map(|p| p.label.chars().count())
            .max()
            .unwrap_or(0)
            .min(32);
        let max = series
            .points
            .iter()
            .map(|p| p.value.abs())
            .fold(0.0_f64, f64::max);

        for point in &series.points {
            let label: String = point.label.chars().take(width).collect();
            lines.push(format!(
                "   {:<width$} {} {}",
                label,
                self.create_bar(point.value, max),
                format_value(point.value),
                width = width
            ));
        }
        lines.push(String::new());
        lines
    }

    pub fn render_quiet(&self, title: &str, result: &QueryResult) -> String {
        let points: usize = result.series.iter().map(|s| s.len()).sum();
        format!(
            "{}: {}/{} rows, {} points",
            title, result.matched_rows, result.total_rows, points
        )
    }

    pub fn render_options(&self, options: &OptionSet) -> String {
        let mut out = String::new();
        for (field, values) in options.iter() {
            out.push_str(&format!(
                "{} ({})\n",
                self.paint(field.title(), |s| s.bold()),
                self.paint(&values.len().to_string(), |s| s.dimmed())
            ));
            for value in values {
                out.push_str(&format!("   {}\n", value));
            }
        }
        out
    }

    pub fn render_catalog(&self, panels: &[PanelDefinition]) -> String {
        let mut out = String::new();
        for panel in panels {
            let filters = if panel.filter_fields.is_empty() {
                self.paint("unfiltered", |s| s.dimmed())
            } else {
                panel
                    .filter_fields
                    .iter()
                    .map(|f| f.name())
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            out.push_str(&format!(
                "{} {:<32} {:<15} {}\n",
                self.paint(&format!("{:<22}", panel.id), |s| s.cyan()),
                panel.title,
                panel.chart.to_string(),
                filters
            ));
        }
        out
    }

    fn render_summary(&self, stats: &DashboardStats) -> String {
        let lines = [
            String::new(),
            "═".repeat(60),
            self.paint("Summary", |s| s.bold()),
            "═".repeat(60),
            format!("   Source:      {}", stats.origin),
            format!("   Fetched at:  {}", stats.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")),
            format!("   Fingerprint: {}", &stats.fingerprint[..12.min(stats.fingerprint.len())]),
            format!(
                "   Reports:     {}",
                self.paint(&stats.total_rows.to_string(), |s| s.bold())
            ),
            format!("   Panels:      {}", stats.panels),
            format!("   Empty:       {}", stats.empty_panels),
            String::new(),
        ];
        lines.join("\n")
    }

    fn create_bar(&self, value: f64, max: f64) -> String {
        let filled = if max > 0.0 {
            ((value.abs() / max) * BAR_WIDTH as f64).round() as usize
        } else {
            0
        }
        .min(BAR_WIDTH);
        let bar = format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled));

        self.paint(&bar, |s| s.cyan())
    }

    fn paint(&self, text: &str, style: impl Fn(&str) -> ColoredString) -> String {
        if self.use_colors {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Whole numbers print without decimals
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}
