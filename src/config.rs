use serde::{Deserialize, Serialize};
use std::fs;
use std::ops::RangeInclusive;
use std::path::Path;
use tracing::warn;

use crate::error::{IllusionError, Result};
use crate::experiment::trials::{BlockSpec, Counterbalance};
use crate::experiment::variables::{DefaultLevels, LevelTables, Variable};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "DisplayConfig::default_frames_per_second")]
    pub frames_per_second: f32,
    #[serde(default = "DisplayConfig::default_n_lines")]
    pub n_lines: usize,
    #[serde(default = "DisplayConfig::default_line_width")]
    pub line_width: f32,
    #[serde(default = "DisplayConfig::default_fixation_size")]
    pub fixation_size: f32,
    #[serde(default = "DisplayConfig::default_fullscreen")]
    pub fullscreen: bool,
}

impl DisplayConfig {
    fn default_frames_per_second() -> f32 {
        100.0
    }
    fn default_n_lines() -> usize {
        120
    }
    fn default_line_width() -> f32 {
        5.0
    }
    fn default_fixation_size() -> f32 {
        10.0
    }
    fn default_fullscreen() -> bool {
        true
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            frames_per_second: Self::default_frames_per_second(),
            n_lines: Self::default_n_lines(),
            line_width: Self::default_line_width(),
            fixation_size: Self::default_fixation_size(),
            fullscreen: Self::default_fullscreen(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RatingScale {
    /// 0–100 slider confirmed with a button.
    #[default]
    Slider,
    /// Number keys 1–7.
    Keys,
}

impl RatingScale {
    pub fn range(self) -> RangeInclusive<u8> {
        match self {
            RatingScale::Slider => 0..=100,
            RatingScale::Keys => 1..=7,
        }
    }

    pub fn accepts(self, rating: u8) -> bool {
        self.range().contains(&rating)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialConfig {
    #[serde(default = "TrialConfig::default_play_seconds")]
    pub play_seconds: f32,
    #[serde(default)]
    pub rating_scale: RatingScale,
}

impl TrialConfig {
    fn default_play_seconds() -> f32 {
        5.0
    }
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            play_seconds: Self::default_play_seconds(),
            rating_scale: RatingScale::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignConfig {
    /// Presentations of each combination per block.
    #[serde(default = "DesignConfig::default_reps")]
    pub reps: usize,
    #[serde(default = "DesignConfig::default_practice_trials")]
    pub practice_trials: usize,
    /// Carry each block's best level into later blocks.
    #[serde(default = "DesignConfig::default_adaptive")]
    pub adaptive: bool,
    #[serde(default)]
    pub counterbalance: Counterbalance,
    /// Variables crossed by each block, in presentation order.
    #[serde(default = "DesignConfig::default_blocks")]
    pub blocks: Vec<Vec<Variable>>,
}

impl DesignConfig {
    fn default_reps() -> usize {
        5
    }
    fn default_practice_trials() -> usize {
        3
    }
    fn default_adaptive() -> bool {
        true
    }
    fn default_blocks() -> Vec<Vec<Variable>> {
        Variable::ALL.iter().map(|&v| vec![v]).collect()
    }

    pub fn block_specs(&self) -> Vec<BlockSpec> {
        self.blocks
            .iter()
            .map(|vary| BlockSpec { vary: vary.clone() })
            .collect()
    }
}

impl Default for DesignConfig {
    fn default() -> Self {
        Self {
            reps: Self::default_reps(),
            practice_trials: Self::default_practice_trials(),
            adaptive: Self::default_adaptive(),
            counterbalance: Counterbalance::default(),
            blocks: Self::default_blocks(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "OutputConfig::default_data_dir")]
    pub data_dir: String,
}

impl OutputConfig {
    fn default_data_dir() -> String {
        "data".to_string()
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: Self::default_data_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub trial: TrialConfig,
    #[serde(default)]
    pub levels: LevelTables,
    #[serde(default)]
    pub defaults: DefaultLevels,
    #[serde(default)]
    pub design: DesignConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl AppConfig {
    fn round_f32(x: f32) -> f32 {
        (x * 1_000_000.0).round() / 1_000_000.0
    }

    fn format_f32_compact(x: f32) -> String {
        let mut s = format!("{:.6}", x);
        while s.contains('.') && s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
        if s.is_empty() { "0".to_string() } else { s }
    }

    fn rounded(mut self) -> Self {
        self.display.frames_per_second = Self::round_f32(self.display.frames_per_second);
        self.display.line_width = Self::round_f32(self.display.line_width);
        self.display.fixation_size = Self::round_f32(self.display.fixation_size);
        self.trial.play_seconds = Self::round_f32(self.trial.play_seconds);
        self
    }

    /// Reject configurations the session cannot run.
    pub fn validate(&self) -> Result<()> {
        self.levels.validate()?;
        self.defaults.resolve(&self.levels)?;
        if self.design.blocks.is_empty() {
            return Err(IllusionError::Config("design.blocks is empty".into()));
        }
        if let Some(i) = self.design.blocks.iter().position(|b| b.is_empty()) {
            return Err(IllusionError::Config(format!(
                "design.blocks[{i}] varies no variable"
            )));
        }
        if self.design.reps == 0 {
            return Err(IllusionError::Config("design.reps must be at least 1".into()));
        }
        if !(self.display.frames_per_second > 0.0) {
            return Err(IllusionError::Config(
                "display.frames_per_second must be positive".into(),
            ));
        }
        if !(self.trial.play_seconds > 0.0) {
            return Err(IllusionError::Config(
                "trial.play_seconds must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Read and validate an existing config without writing anything.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| IllusionError::io(path, e))?;
        let cfg: Self = toml::from_str(&contents)
            .map_err(|e| IllusionError::Config(format!("{}: {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_or_default(path: &str) -> Self {
        let path_obj = Path::new(path);
        if path_obj.exists() {
            match fs::read_to_string(path_obj) {
                Ok(contents) => match toml::from_str(&contents) {
                    Ok(cfg) => return cfg,
                    Err(err) => {
                        warn!("Failed to parse config {path}: {err}. Using defaults.");
                    }
                },
                Err(err) => {
                    warn!("Failed to read config {path}: {err}. Using defaults.");
                }
            }
            return Self::default();
        }

        // File does not exist: write defaults and return them.
        let default_cfg = Self::default().rounded();
        if let Ok(text) = toml::to_string(&default_cfg) {
            let mut commented = String::new();
            for line in text.lines() {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    commented.push('\n');
                } else if trimmed.starts_with('[') && trimmed.ends_with(']') && !line.contains('=') {
                    commented.push_str(line);
                    commented.push('\n');
                } else {
                    let mut out_line = line.to_string();
                    if let Some((lhs, rhs)) = line.split_once('=') {
                        let rhs_trim = rhs.trim();
                        let has_decimal = rhs_trim.contains('.');
                        if (has_decimal || rhs_trim.contains('e') || rhs_trim.contains('E'))
                            && !rhs_trim.contains('"')
                            && !rhs_trim.starts_with('[')
                            && rhs_trim != "true"
                            && rhs_trim != "false"
                        {
                            if let Ok(val) = rhs_trim.parse::<f32>() {
                                let mut formatted = Self::format_f32_compact(val);
                                if has_decimal && !formatted.contains('.') {
                                    formatted.push_str(".0");
                                }
                                out_line = format!("{} = {}", lhs.trim(), formatted);
                            }
                        }
                    }
                    commented.push_str("# ");
                    commented.push_str(&out_line);
                    commented.push('\n');
                }
            }
            if let Err(err) = fs::write(path_obj, commented) {
                warn!("Failed to write default config to {path}: {err}");
            }
        } else {
            warn!("Failed to serialize default config; continuing with defaults");
        }
        default_cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn unique_path(name: &str) -> std::path::PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!(
            "illusion_config_test_{}_{}",
            name,
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        p
    }

    #[test]
    fn load_or_default_writes_defaults_cleanly() {
        let path = unique_path("defaults.toml");
        let path_str = path.to_string_lossy().to_string();
        let _ = fs::remove_file(&path);

        let cfg = AppConfig::load_or_default(&path_str);
        assert!(path.exists(), "config file should be created");
        assert_eq!(cfg.display.frames_per_second, 100.0);
        assert_eq!(cfg.display.n_lines, 120);
        assert_eq!(cfg.trial.play_seconds, 5.0);
        assert_eq!(cfg.trial.rating_scale, RatingScale::Slider);
        assert_eq!(cfg.design.reps, 5);
        assert_eq!(cfg.design.blocks.len(), 4);
        assert_eq!(cfg.output.data_dir, "data");

        let contents = fs::read_to_string(&path).expect("read written config");
        assert!(contents.contains("# play_seconds = 5.0"), "{contents}");
        assert!(contents.contains("# line_width = 5.0"), "{contents}");
        assert!(contents.contains("# adaptive = true"), "{contents}");
        assert!(contents.contains("[design]"), "{contents}");

        // Everything but section headers is commented, so it parses to defaults.
        let reparsed: AppConfig = toml::from_str(&contents).expect("commented file parses");
        assert_eq!(reparsed.design.reps, 5);
        assert_eq!(reparsed.levels, LevelTables::default());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn load_or_default_reads_existing() {
        let path = unique_path("custom.toml");
        let path_str = path.to_string_lossy().to_string();
        let text = r#"
[display]
frames_per_second = 60.0
fullscreen = false

[trial]
play_seconds = 2.5
rating_scale = "keys"

[levels]
line_length = [50, 100]

[defaults]
line_angle = 0

[design]
reps = 3
practice_trials = 0
adaptive = false
counterbalance = "rotate"
blocks = [["line_length"], ["line_length", "stim_radius"]]
"#;
        fs::write(&path, text).unwrap();

        let cfg = AppConfig::load_or_default(&path_str);
        assert_eq!(cfg.display.frames_per_second, 60.0);
        assert!(!cfg.display.fullscreen);
        assert_eq!(cfg.display.n_lines, 120);
        assert_eq!(cfg.trial.play_seconds, 2.5);
        assert_eq!(cfg.trial.rating_scale, RatingScale::Keys);
        assert_eq!(cfg.levels.line_length, vec![50, 100]);
        assert_eq!(cfg.levels.line_angle, vec![20, 30, 40, 50, 60, 70]);
        assert_eq!(cfg.defaults.line_angle, Some(0));
        assert_eq!(cfg.design.reps, 3);
        assert_eq!(cfg.design.practice_trials, 0);
        assert!(!cfg.design.adaptive);
        assert_eq!(cfg.design.counterbalance, Counterbalance::Rotate);
        assert_eq!(
            cfg.design.block_specs()[1].vary,
            vec![Variable::LineLength, Variable::StimRadius]
        );
        assert!(cfg.validate().is_ok());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn broken_file_falls_back_to_defaults() {
        let path = unique_path("broken.toml");
        fs::write(&path, "[design\nreps = ").unwrap();
        let cfg = AppConfig::load_or_default(&path.to_string_lossy());
        assert_eq!(cfg.design.reps, 5);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn validate_rejects_unrunnable_designs() {
        let mut cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());

        cfg.design.blocks = vec![vec![]];
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.design.reps = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.defaults.stim_period = Some(9);
        assert!(matches!(
            cfg.validate(),
            Err(IllusionError::InvalidDefault { .. })
        ));
    }

    #[test]
    fn rating_scales_bound_their_values() {
        assert!(RatingScale::Slider.accepts(0));
        assert!(RatingScale::Slider.accepts(100));
        assert!(!RatingScale::Slider.accepts(101));
        assert!(!RatingScale::Keys.accepts(0));
        assert!(RatingScale::Keys.accepts(7));
        assert!(!RatingScale::Keys.accepts(8));
    }
}
