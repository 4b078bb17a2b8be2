use crate::experiment::variables::Variable;

/// Conversion from stored units (px, degrees, frames) to reporting units
/// (degrees of visual angle and seconds).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayUnits {
    pub deg_per_px: f64,
    pub fps: f64,
    /// Report stored units unchanged.
    pub raw: bool,
}

impl Default for DisplayUnits {
    fn default() -> Self {
        Self {
            deg_per_px: std::f64::consts::PI / 180.0,
            fps: 100.0,
            raw: false,
        }
    }
}

impl DisplayUnits {
    pub fn convert(&self, var: Variable, value: u32) -> f64 {
        let v = value as f64;
        if self.raw {
            return v;
        }
        match var {
            Variable::LineLength | Variable::StimRadius => v * self.deg_per_px,
            Variable::LineAngle => v,
            Variable::StimPeriod => {
                if self.fps > 0.0 {
                    v / self.fps
                } else {
                    v
                }
            }
        }
    }

    pub fn unit(&self, var: Variable) -> &'static str {
        if self.raw {
            return var.unit();
        }
        match var {
            Variable::StimPeriod => "s",
            _ => "°",
        }
    }

    pub fn axis_label(&self, var: Variable) -> String {
        let title = var.title();
        let mut chars = title.chars();
        let capitalized = match chars.next() {
            Some(c) => c.to_uppercase().chain(chars).collect::<String>(),
            None => String::new(),
        };
        format!("{capitalized} ({})", self.unit(var))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn pixels_become_degrees() {
        let u = DisplayUnits::default();
        assert_abs_diff_eq!(u.convert(Variable::LineLength, 30), 0.52, epsilon = 0.005);
        assert_abs_diff_eq!(u.convert(Variable::StimRadius, 200), 3.49, epsilon = 0.005);
        assert_eq!(u.convert(Variable::LineAngle, 40), 40.0);
        assert_eq!(u.convert(Variable::StimPeriod, 25), 0.25);
    }

    #[test]
    fn raw_units_pass_through() {
        let u = DisplayUnits {
            raw: true,
            ..Default::default()
        };
        assert_eq!(u.convert(Variable::StimRadius, 200), 200.0);
        assert_eq!(u.axis_label(Variable::StimPeriod), "Animation period (frames)");
        assert_eq!(
            DisplayUnits::default().axis_label(Variable::LineLength),
            "Line length (°)"
        );
    }
}
