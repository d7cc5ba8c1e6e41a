use posner_core::{ExperimentError, Reporter, Result};
use std::io::Write;
use tracing::info;

const BAR_WIDTH: usize = 40;

/// Prints condition means as a text bar chart.
pub struct ConsoleReporter<W: Write> {
    out: W,
}

impl ConsoleReporter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self {
            out: std::io::stdout(),
        }
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn report_means(&mut self, labels: &[&str], values: &[f64]) -> Result<()> {
        let longest = values.iter().copied().fold(0.0_f64, f64::max);
        let label_width = labels.iter().map(|l| l.len()).max().unwrap_or(0);

        let mut text = String::from("Mean RT (ms) by trial type\n");
        for (label, value) in labels.iter().zip(values) {
            info!(condition = label, mean_rt_ms = value, "condition mean");
            let len = if longest > 0.0 {
                ((value / longest) * BAR_WIDTH as f64).round() as usize
            } else {
                0
            };
            text.push_str(&format!(
                "  {label:<label_width$}  {}  {value:.1}\n",
                "#".repeat(len)
            ));
        }

        self.out
            .write_all(text.as_bytes())
            .and_then(|_| self.out.flush())
            .map_err(|e| ExperimentError::Report(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_bar_fills_the_width() {
        let mut reporter = ConsoleReporter::new(Vec::new());
        reporter
            .report_means(&["Valid", "Invalid"], &[200.0, 400.0])
            .unwrap();
        let text = String::from_utf8(reporter.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains(&"#".repeat(20)));
        assert!(!lines[1].contains(&"#".repeat(21)));
        assert!(lines[2].contains(&"#".repeat(40)));
        assert!(lines[2].ends_with("400.0"));
    }
}
