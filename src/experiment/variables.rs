use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{IllusionError, Result};

/// Independent variable of the stimulus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variable {
    LineLength,
    LineAngle,
    StimRadius,
    StimPeriod,
}

impl Variable {
    pub const ALL: [Variable; 4] = [
        Variable::LineLength,
        Variable::LineAngle,
        Variable::StimRadius,
        Variable::StimPeriod,
    ];

    pub fn index(self) -> usize {
        match self {
            Variable::LineLength => 0,
            Variable::LineAngle => 1,
            Variable::StimRadius => 2,
            Variable::StimPeriod => 3,
        }
    }

    /// Column name in result files.
    pub fn column(self) -> &'static str {
        match self {
            Variable::LineLength => "line_length",
            Variable::LineAngle => "line_angle",
            Variable::StimRadius => "stim_radius",
            Variable::StimPeriod => "stim_period",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Variable::LineLength | Variable::StimRadius => "px",
            Variable::LineAngle => "°",
            Variable::StimPeriod => "frames",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Variable::LineLength => "line length",
            Variable::LineAngle => "line angle",
            Variable::StimRadius => "stimulus radius",
            Variable::StimPeriod => "animation period",
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for Variable {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace('-', "_");
        Variable::ALL
            .into_iter()
            .find(|v| v.column() == key)
            .ok_or_else(|| {
                format!(
                    "unknown variable `{s}` (expected one of: line_length, line_angle, stim_radius, stim_period)"
                )
            })
    }
}

/// Discrete levels for each variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelTables {
    #[serde(default = "LevelTables::default_line_length")]
    pub line_length: Vec<u32>,
    #[serde(default = "LevelTables::default_line_angle")]
    pub line_angle: Vec<u32>,
    #[serde(default = "LevelTables::default_stim_radius")]
    pub stim_radius: Vec<u32>,
    #[serde(default = "LevelTables::default_stim_period")]
    pub stim_period: Vec<u32>,
}

impl LevelTables {
    fn default_line_length() -> Vec<u32> {
        vec![30, 60, 90, 120, 150]
    }
    fn default_line_angle() -> Vec<u32> {
        vec![20, 30, 40, 50, 60, 70]
    }
    fn default_stim_radius() -> Vec<u32> {
        vec![150, 200, 250, 300, 350]
    }
    fn default_stim_period() -> Vec<u32> {
        vec![25, 50, 100, 150, 200]
    }

    pub fn get(&self, var: Variable) -> &[u32] {
        match var {
            Variable::LineLength => &self.line_length,
            Variable::LineAngle => &self.line_angle,
            Variable::StimRadius => &self.stim_radius,
            Variable::StimPeriod => &self.stim_period,
        }
    }

    pub fn len(&self, var: Variable) -> usize {
        self.get(var).len()
    }

    pub fn validate(&self) -> Result<()> {
        for var in Variable::ALL {
            if self.get(var).is_empty() {
                return Err(IllusionError::InvalidLevels(var));
            }
        }
        if self.stim_period.contains(&0) {
            return Err(IllusionError::Config(
                "stim_period levels must be at least one frame".into(),
            ));
        }
        Ok(())
    }
}

impl Default for LevelTables {
    fn default() -> Self {
        Self {
            line_length: Self::default_line_length(),
            line_angle: Self::default_line_angle(),
            stim_radius: Self::default_stim_radius(),
            stim_period: Self::default_stim_period(),
        }
    }
}

/// Level index used while a variable is not being varied. `None` picks the
/// middle of the table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultLevels {
    #[serde(default)]
    pub line_length: Option<usize>,
    #[serde(default)]
    pub line_angle: Option<usize>,
    #[serde(default)]
    pub stim_radius: Option<usize>,
    #[serde(default)]
    pub stim_period: Option<usize>,
}

impl DefaultLevels {
    fn get(&self, var: Variable) -> Option<usize> {
        match var {
            Variable::LineLength => self.line_length,
            Variable::LineAngle => self.line_angle,
            Variable::StimRadius => self.stim_radius,
            Variable::StimPeriod => self.stim_period,
        }
    }

    /// Resolve against the tables into one index per variable.
    pub fn resolve(&self, tables: &LevelTables) -> Result<[usize; 4]> {
        let mut out = [0usize; 4];
        for var in Variable::ALL {
            let len = tables.len(var);
            let index = self.get(var).unwrap_or(len / 2);
            if index >= len {
                return Err(IllusionError::InvalidDefault {
                    variable: var,
                    index,
                    len,
                });
            }
            out[var.index()] = index;
        }
        Ok(out)
    }
}

/// Realized parameter values of one trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StimulusParams {
    pub line_length: u32,
    pub line_angle: u32,
    pub stim_radius: u32,
    pub stim_period: u32,
}

impl StimulusParams {
    pub fn from_indices(tables: &LevelTables, levels: &[usize; 4]) -> Self {
        let pick = |var: Variable| tables.get(var)[levels[var.index()]];
        Self {
            line_length: pick(Variable::LineLength),
            line_angle: pick(Variable::LineAngle),
            stim_radius: pick(Variable::StimRadius),
            stim_period: pick(Variable::StimPeriod),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_parses_column_names() {
        for var in Variable::ALL {
            assert_eq!(var.column().parse::<Variable>().unwrap(), var);
        }
        assert_eq!("Stim-Period".parse::<Variable>().unwrap(), Variable::StimPeriod);
        assert!("speed".parse::<Variable>().is_err());
    }

    #[test]
    fn defaults_resolve_to_middle_level() {
        let tables = LevelTables::default();
        let idx = DefaultLevels::default().resolve(&tables).unwrap();
        assert_eq!(idx, [2, 3, 2, 2]);
        let params = StimulusParams::from_indices(&tables, &idx);
        assert_eq!(params.line_length, 90);
        assert_eq!(params.line_angle, 50);
        assert_eq!(params.stim_radius, 250);
        assert_eq!(params.stim_period, 100);
    }

    #[test]
    fn out_of_range_default_is_rejected() {
        let tables = LevelTables::default();
        let defaults = DefaultLevels {
            line_angle: Some(6),
            ..Default::default()
        };
        match defaults.resolve(&tables) {
            Err(IllusionError::InvalidDefault { variable, index, len }) => {
                assert_eq!(variable, Variable::LineAngle);
                assert_eq!(index, 6);
                assert_eq!(len, 6);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn empty_table_fails_validation() {
        let tables = LevelTables {
            stim_radius: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(
            tables.validate(),
            Err(IllusionError::InvalidLevels(Variable::StimRadius))
        ));
    }
}
