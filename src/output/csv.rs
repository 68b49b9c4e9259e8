//! Delimited text output.
//!
//! One header line, one row per result, and an optional dump of the raw
//! samples of the reported population. Results that did not converge are
//! refused unless [`CsvOptions::force_converged`] is turned off.

use std::io::Write;

use crate::error::Error;
use crate::result::RunResult;
use crate::types::TimeUnit;

/// Formatting options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    /// Unit for all durations.
    pub unit: TimeUnit,
    /// Refuse results that did not converge.
    pub force_converged: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            unit: TimeUnit::Nanoseconds,
            force_converged: true,
        }
    }
}

impl CsvOptions {
    /// Accept results that did not converge.
    pub fn allow_unconverged(mut self) -> Self {
        self.force_converged = false;
        self
    }

    /// Report durations in `unit`.
    pub fn unit(mut self, unit: TimeUnit) -> Self {
        self.unit = unit;
        self
    }

    fn check(&self, result: &RunResult) -> Result<(), Error> {
        if self.force_converged && !result.converged {
            return Err(Error::NotConverged {
                batches_all: result.batches_all,
                batch_size: result.batch_size,
            });
        }
        Ok(())
    }
}

/// Write the column header.
pub fn write_header<W: Write>(out: &mut W, opts: &CsvOptions) -> Result<(), Error> {
    let u = opts.unit;
    writeln!(
        out,
        "mean({u}),sigma({u}),min({u}),max({u}),batches,converged,\
         mean_all({u}),sigma_all({u}),min_all({u}),max_all({u}),batches_all"
    )?;
    Ok(())
}

/// Write one result row.
///
/// # Errors
///
/// [`Error::NotConverged`] if the result did not converge and
/// `force_converged` is set; [`Error::Io`] if writing fails.
pub fn write_row<W: Write>(out: &mut W, result: &RunResult, opts: &CsvOptions) -> Result<(), Error> {
    opts.check(result)?;
    let t = |ns: f64| opts.unit.from_ns(ns);
    writeln!(
        out,
        "{},{},{},{},{},{},{},{},{},{},{}",
        t(result.mean_ns),
        t(result.sigma_ns),
        t(result.min_ns),
        t(result.max_ns),
        result.batches,
        u8::from(result.converged),
        t(result.mean_all_ns),
        t(result.sigma_all_ns),
        t(result.min_all_ns),
        t(result.max_all_ns),
        result.batches_all,
    )?;
    Ok(())
}

/// Write the raw samples as `is_outlier,duration` lines, preceded by their
/// own header. Writes only the header if no samples were retained.
pub fn write_samples<W: Write>(out: &mut W, result: &RunResult, opts: &CsvOptions) -> Result<(), Error> {
    opts.check(result)?;
    writeln!(out, "is_outlier,duration({})", opts.unit)?;
    for sample in result.samples.iter().flatten() {
        writeln!(
            out,
            "{},{}",
            u8::from(sample.is_outlier),
            opts.unit.from_ns(sample.duration_ns)
        )?;
    }
    Ok(())
}

/// Header, row and samples in one string.
pub fn to_csv(result: &RunResult, opts: &CsvOptions) -> Result<String, Error> {
    let mut out = Vec::new();
    write_header(&mut out, opts)?;
    write_row(&mut out, result, opts)?;
    if result.samples.is_some() {
        write_samples(&mut out, result, opts)?;
    }
    Ok(String::from_utf8_lossy(&out).into_owned())
}
