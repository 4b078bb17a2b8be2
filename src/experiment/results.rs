use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{IllusionError, Result};
use crate::experiment::variables::{StimulusParams, Variable};

pub const CSV_HEADER: [&str; 6] = [
    "trial",
    "line_length",
    "line_angle",
    "stim_radius",
    "stim_period",
    "rating",
];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d%H-%M-%S%.6f";

/// One rated experimental trial. Field order matches `CSV_HEADER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub trial: usize,
    pub line_length: u32,
    pub line_angle: u32,
    pub stim_radius: u32,
    pub stim_period: u32,
    pub rating: u8,
}

impl ResultRecord {
    pub fn new(trial: usize, params: &StimulusParams, rating: u8) -> Self {
        Self {
            trial,
            line_length: params.line_length,
            line_angle: params.line_angle,
            stim_radius: params.stim_radius,
            stim_period: params.stim_period,
            rating,
        }
    }

    pub fn value(&self, var: Variable) -> u32 {
        match var {
            Variable::LineLength => self.line_length,
            Variable::LineAngle => self.line_angle,
            Variable::StimRadius => self.stim_radius,
            Variable::StimPeriod => self.stim_period,
        }
    }
}

/// Append-only list of experimental results.
#[derive(Debug, Clone, Default)]
pub struct ResultLog {
    records: Vec<ResultRecord>,
}

impl ResultLog {
    pub fn push(&mut self, params: &StimulusParams, rating: u8) -> ResultRecord {
        let record = ResultRecord::new(self.records.len(), params, rating);
        self.records.push(record);
        record
    }

    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Header line followed by one row per record.
    pub fn write_csv<W: Write>(&self, out: W) -> std::result::Result<(), csv::Error> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(out);
        wtr.write_record(CSV_HEADER)?;
        for record in &self.records {
            wtr.serialize(record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Write `<dir>/<initials><timestamp>.csv`, creating `dir` if needed.
    pub fn save(&self, dir: &Path, initials: &str, timestamp: NaiveDateTime) -> Result<PathBuf> {
        fs::create_dir_all(dir).map_err(|e| IllusionError::io(dir, e))?;
        let path = dir.join(result_file_name(initials, timestamp));
        let file = File::create(&path).map_err(|e| IllusionError::io(&path, e))?;
        self.write_csv(file)
            .map_err(|e| IllusionError::csv(&path, e))?;
        info!("Saved {} results to {}", self.records.len(), path.display());
        Ok(path)
    }
}

/// Trimmed, lower-cased initials restricted to file-name-safe characters.
/// `None` when nothing usable remains.
pub fn normalize_initials(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

pub fn result_file_name(initials: &str, timestamp: NaiveDateTime) -> String {
    format!("{initials}{}.csv", timestamp.format(TIMESTAMP_FORMAT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn params(len: u32) -> StimulusParams {
        StimulusParams {
            line_length: len,
            line_angle: 40,
            stim_radius: 250,
            stim_period: 100,
        }
    }

    #[test]
    fn trial_index_follows_append_order() {
        let mut log = ResultLog::default();
        assert_eq!(log.push(&params(30), 12).trial, 0);
        assert_eq!(log.push(&params(60), 80).trial, 1);
        assert_eq!(log.records()[1].line_length, 60);
        assert_eq!(log.records()[1].value(Variable::StimRadius), 250);
    }

    #[test]
    fn csv_has_header_then_rows() {
        let mut log = ResultLog::default();
        log.push(&params(30), 12);
        log.push(&params(150), 100);
        let mut buf = Vec::new();
        log.write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "trial,line_length,line_angle,stim_radius,stim_period,rating");
        assert_eq!(lines[1], "0,30,40,250,100,12");
        assert_eq!(lines[2], "1,150,40,250,100,100");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn empty_log_still_writes_header() {
        let mut buf = Vec::new();
        ResultLog::default().write_csv(&mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap().trim_end(),
            CSV_HEADER.join(",")
        );
    }

    #[test]
    fn initials_are_normalized() {
        assert_eq!(normalize_initials("  EM \n").as_deref(), Some("em"));
        assert_eq!(normalize_initials("j/r").as_deref(), Some("jr"));
        assert_eq!(normalize_initials("   "), None);
        assert_eq!(normalize_initials("./"), None);
    }

    #[test]
    fn file_name_matches_session_timestamp() {
        let ts = NaiveDate::from_ymd_opt(2022, 7, 25)
            .unwrap()
            .and_hms_micro_opt(15, 45, 11, 880_430)
            .unwrap();
        assert_eq!(result_file_name("em", ts), "em2022-07-2515-45-11.880430.csv");
    }
}
