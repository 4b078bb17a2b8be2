use std::path::Path;

use tracing::debug;

use crate::error::{IllusionError, Result};
use crate::experiment::results::ResultRecord;

/// Read one result file.
pub fn load_results(path: &Path) -> Result<Vec<ResultRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| IllusionError::csv(path, e))?;
    let mut out = Vec::new();
    for row in rdr.deserialize() {
        let record: ResultRecord = row.map_err(|e| IllusionError::csv(path, e))?;
        out.push(record);
    }
    debug!("Loaded {} rows from {}", out.len(), path.display());
    Ok(out)
}

/// Read and concatenate several files in the given order.
pub fn load_many<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<ResultRecord>> {
    let mut out = Vec::new();
    for p in paths {
        out.extend(load_results(p.as_ref())?);
    }
    if out.is_empty() {
        return Err(IllusionError::EmptyData(format!(
            "{} file(s) contained no rows",
            paths.len()
        )));
    }
    Ok(out)
}
