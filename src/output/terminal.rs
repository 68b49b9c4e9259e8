//! Terminal output formatting with colors and box drawing.

use colored::Colorize;

use crate::result::{RunResult, Termination};

/// Format a RunResult for human-readable terminal output.
pub fn format_result(result: &RunResult) -> String {
    let mut output = String::new();
    let sep = "\u{2500}".repeat(62);

    output.push_str("timing-engine\n");
    output.push_str(&sep);
    output.push('\n');
    output.push('\n');

    output.push_str(&format!("  {}\n\n", format_termination(result.metadata.termination)));

    output.push_str(&format!(
        "    Mean:   {} \u{00B1} {} ({:.2}%)\n",
        format_duration(result.mean_ns),
        format_duration(result.sigma_ns),
        result.relative_sigma_perc()
    ));
    output.push_str(&format!(
        "    Range:  {} \u{2013} {}\n",
        format_duration(result.min_ns),
        format_duration(result.max_ns)
    ));
    output.push_str(&format!(
        "    Batches: {} of {} retained ({} outliers), {} invocations each\n",
        result.batches,
        result.batches_all,
        result.outliers(),
        result.batch_size
    ));
    output.push('\n');

    output.push_str("    All samples:\n");
    output.push_str(&format!(
        "      Mean:  {} \u{00B1} {}\n",
        format_duration(result.mean_all_ns),
        format_duration(result.sigma_all_ns)
    ));
    output.push_str(&format!(
        "      Range: {} \u{2013} {}\n",
        format_duration(result.min_all_ns),
        format_duration(result.max_all_ns)
    ));
    output.push('\n');

    output.push_str(&sep);
    output.push('\n');
    output.push_str(&format!(
        "Clock: {} (overhead {}), {} iterations in {:.2}s\n",
        result.metadata.clock,
        format_duration(result.metadata.clock_time_ns),
        result.iterations,
        result.metadata.runtime_secs
    ));

    output
}

fn format_termination(termination: Termination) -> String {
    match termination {
        Termination::Converged => "\u{2713} Converged".green().bold().to_string(),
        Termination::SingleShot => "\u{2713} Single population".green().to_string(),
        Termination::TimedOut => "\u{26A0} Timed out before converging".yellow().bold().to_string(),
        Termination::NoRetainedSamples => "\u{2717} Every sample rejected as an outlier".red().bold().to_string(),
    }
}

/// Pick a unit so the integer part stays small.
fn format_duration(ns: f64) -> String {
    let abs = ns.abs();
    if abs >= 1e9 {
        format!("{:.3} s", ns / 1e9)
    } else if abs >= 1e6 {
        format!("{:.3} ms", ns / 1e6)
    } else if abs >= 1e3 {
        format!("{:.3} us", ns / 1e3)
    } else {
        format!("{:.2} ns", ns)
    }
}
