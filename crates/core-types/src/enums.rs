use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a fitted price trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
}

impl Trend {
    /// A strictly positive slope is `Up`; zero and negative slopes are `Down`.
    pub fn from_slope(slope: f64) -> Self {
        if slope > 0.0 { Trend::Up } else { Trend::Down }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Up => write!(f, "up"),
            Trend::Down => write!(f, "down"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_slope_is_down() {
        assert_eq!(Trend::from_slope(0.0), Trend::Down);
        assert_eq!(Trend::from_slope(1e-12), Trend::Up);
        assert_eq!(Trend::from_slope(-3.0), Trend::Down);
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Trend::Up).unwrap(), "\"up\"");
        assert_eq!(serde_json::to_string(&Trend::Down).unwrap(), "\"down\"");
    }
}
