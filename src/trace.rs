//
// Copyright © 2023 Arm Limited. All rights reserved.
// SPDX-License-Identifier: Apache-2.0
//

use crate::error::{GrapherError, Result};
use log::debug;
use regex::Regex;
use serde_json::{json, Value};
use std::{
    collections::HashMap,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

/// Lines starting with this token carry one simulation step each.
const ITERATION_MARKER: &str = "iteration";

// A complex name is made of ASCII word characters plus the separators used when
// printing agents and their sites, e.g. `A(x,y|1)`. Followed by its population count.
const COMPLEX_COUNT_PATTERN: &str = r"([[:word:],|()]+) -> ([0-9]+)";

// The simulated time printed at the end of every iteration line, e.g. `(t = 1.5e-3)`.
const TIME_PATTERN: &str = r"\(t = ([0-9.eE\-]+)\)";

/// Population counts and simulated time reported by a single iteration line.
#[derive(Clone, Debug, PartialEq)]
pub struct IterationRecord {
    pub counts: Vec<(String, u64)>,
    pub time: f64,
}

/// Extracts iteration records from trace lines.
pub struct LineParser {
    complex_count_re: Regex,
    time_re: Regex,
}

impl LineParser {
    pub fn new() -> Self {
        Self {
            complex_count_re: Regex::new(COMPLEX_COUNT_PATTERN)
                .expect("complex count pattern is valid"),
            time_re: Regex::new(TIME_PATTERN).expect("time pattern is valid"),
        }
    }

    /// Returns `None` for lines that are not iteration records. `line_no` is only used
    /// for error reporting.
    pub fn parse_line(&self, line: &str, line_no: usize) -> Result<Option<IterationRecord>> {
        if !line.starts_with(ITERATION_MARKER) {
            return Ok(None);
        }

        let mut counts = vec![];
        for captures in self.complex_count_re.captures_iter(line) {
            let complex = captures[1].to_string();
            let count = captures[2]
                .parse::<u64>()
                .map_err(|_| GrapherError::InvalidCount {
                    line: line_no,
                    complex: complex.clone(),
                    value: captures[2].to_string(),
                })?;
            counts.push((complex, count));
        }

        let time_str = self
            .time_re
            .captures(line)
            .ok_or(GrapherError::MissingTimestamp { line: line_no })?[1]
            .to_string();
        // Out of range values such as `1e999` parse to infinity, which cannot be plotted
        let time = time_str
            .parse::<f64>()
            .ok()
            .filter(|time| time.is_finite())
            .ok_or_else(|| GrapherError::InvalidTimestamp {
                line: line_no,
                value: time_str.clone(),
            })?;

        Ok(Some(IterationRecord { counts, time }))
    }
}

/// Population series of every complex seen in a trace, aligned on iteration index.
///
/// Every series has exactly one entry per iteration. A complex that is not reported
/// in an iteration counts as 0 for that iteration, including the iterations before
/// it was first seen.
#[derive(Debug, Default)]
pub struct PopulationTrace {
    times: Vec<f64>,
    // Complex names in order of first appearance, and their position in `counts`.
    names: Vec<String>,
    index: HashMap<String, usize>,
    counts: Vec<Vec<u64>>,
}

impl PopulationTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let file = BufReader::new(std::fs::File::open(path)?);
        Self::from_reader(file)
    }

    /// Builds the series in a single pass over `reader`. Aborts on the first malformed
    /// iteration line.
    pub fn from_reader<R: BufRead>(mut reader: R) -> Result<Self> {
        let parser = LineParser::new();
        let mut trace = Self::new();
        let mut buffer = vec![];
        let mut line_no = 0;
        loop {
            buffer.clear();
            if reader.read_until(b'\n', &mut buffer)? == 0 {
                break;
            }
            line_no += 1;

            // Text between iteration records is free-form and need not be valid UTF-8
            if !buffer.starts_with(ITERATION_MARKER.as_bytes()) {
                continue;
            }
            let line = String::from_utf8_lossy(&buffer);
            if let Some(record) = parser.parse_line(line.trim_end_matches(['\n', '\r']), line_no)? {
                trace.push_iteration(record);
            }
        }
        Ok(trace)
    }

    /// Appends one iteration. New complexes are backfilled with zeros for every earlier
    /// iteration before their first count is appended.
    pub fn push_iteration(&mut self, record: IterationRecord) {
        let iteration = self.times.len();
        // Which complexes have received a value for this iteration so far
        let mut mentioned = vec![false; self.counts.len()];

        for (complex, count) in record.counts {
            match self.index.get(&complex).copied() {
                Some(idx) if mentioned[idx] => {
                    debug!(
                        "Complex {} reported twice in iteration {}, keeping {}",
                        complex, iteration, count
                    );
                    if let Some(last) = self.counts[idx].last_mut() {
                        *last = count;
                    }
                }
                Some(idx) => {
                    self.counts[idx].push(count);
                    mentioned[idx] = true;
                }
                None => {
                    debug!("Complex {} first seen at iteration {}", complex, iteration);
                    let mut series = vec![0; iteration];
                    series.push(count);
                    self.index.insert(complex.clone(), self.counts.len());
                    self.names.push(complex);
                    self.counts.push(series);
                    mentioned.push(true);
                }
            }
        }

        for (series, _) in self
            .counts
            .iter_mut()
            .zip(&mentioned)
            .filter(|(_, mentioned)| !**mentioned)
        {
            series.push(0);
        }

        self.times.push(record.time);
    }

    pub fn iterations(&self) -> usize {
        self.times.len()
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Complex names in order of first appearance.
    pub fn complex_names(&self) -> &[String] {
        &self.names
    }

    pub fn series(&self, complex: &str) -> Option<&[u64]> {
        self.index.get(complex).map(|&idx| self.counts[idx].as_slice())
    }

    /// JSON view of the whole trace: the timestamps and one entry per complex.
    pub fn to_json(&self) -> Value {
        let complexes: Vec<Value> = self
            .names
            .iter()
            .zip(&self.counts)
            .map(|(name, counts)| json!({ "name": name, "counts": counts }))
            .collect();

        json!({
            "iterations": self.iterations(),
            "times": self.times,
            "complexes": complexes,
        })
    }

    /// Saves `to_json` as pretty-printed JSON, replacing any existing file at `path`.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let mut file = BufWriter::new(std::fs::File::create(path)?);
        serde_json::to_writer_pretty(&mut file, &self.to_json())?;
        file.flush()?;
        Ok(())
    }
}
