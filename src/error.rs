//! Crate errors

use std::path::PathBuf;

use thiserror::Error;

use crate::experiment::variables::Variable;

/// Crate result type
pub type Result<T> = std::result::Result<T, IllusionError>;

#[derive(Debug, Error)]
pub enum IllusionError {
    #[error("io error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error in {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("invalid config: {0}")]
    Config(String),

    #[error("level table for {0} is empty")]
    InvalidLevels(Variable),

    #[error("default index {index} for {variable} is out of range (table has {len} levels)")]
    InvalidDefault {
        variable: Variable,
        index: usize,
        len: usize,
    },

    #[error("no data: {0}")]
    EmptyData(String),

    #[error("block layout does not fit the data: {0}")]
    Layout(String),
}

impl IllusionError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}
