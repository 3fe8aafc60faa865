//! Derived metrics: extrema over the buffer and their severity tiers.
//!
//! Tiers are a pure threshold lookup with no hysteresis; a value hovering on
//! a boundary flips tier on every recompute.

use motor_core::Reading;
use serde::Serialize;

/// Tier of the hottest reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemperatureHighTier {
    Normal,
    Warning,
    Critical,
}

impl TemperatureHighTier {
    pub fn classify(temperature: f64) -> Self {
        if temperature > 85.0 {
            Self::Critical
        } else if temperature > 75.0 {
            Self::Warning
        } else {
            Self::Normal
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

/// Tier of the coldest reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemperatureLowTier {
    Cold,
    Optimal,
    Warm,
}

impl TemperatureLowTier {
    pub fn classify(temperature: f64) -> Self {
        if temperature < 30.0 {
            Self::Cold
        } else if temperature < 50.0 {
            Self::Optimal
        } else {
            Self::Warm
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Cold => "cold",
            Self::Optimal => "optimal",
            Self::Warm => "warm",
        }
    }
}

/// Tier of the fastest reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpeedHighTier {
    Low,
    Optimal,
    High,
    Overload,
}

impl SpeedHighTier {
    pub fn classify(speed: f64) -> Self {
        if speed > 3000.0 {
            Self::Overload
        } else if speed > 2500.0 {
            Self::High
        } else if speed > 1500.0 {
            Self::Optimal
        } else {
            Self::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Optimal => "optimal",
            Self::High => "high",
            Self::Overload => "overload",
        }
    }
}

/// Tier of the slowest reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpeedLowTier {
    StallRisk,
    Low,
    Idle,
    Normal,
}

impl SpeedLowTier {
    pub fn classify(speed: f64) -> Self {
        if speed < 500.0 {
            Self::StallRisk
        } else if speed < 1000.0 {
            Self::Low
        } else if speed < 1500.0 {
            Self::Idle
        } else {
            Self::Normal
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::StallRisk => "stall-risk",
            Self::Low => "low",
            Self::Idle => "idle",
            Self::Normal => "normal",
        }
    }
}

/// An extremal reading and its tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extremum<T> {
    pub reading: Reading,
    pub tier: T,
}

/// Extrema of the current buffer. All four are computed together in one
/// pass; `None` when the buffer is empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedStats {
    pub max_temp: Option<Extremum<TemperatureHighTier>>,
    pub min_temp: Option<Extremum<TemperatureLowTier>>,
    pub max_speed: Option<Extremum<SpeedHighTier>>,
    pub min_speed: Option<Extremum<SpeedLowTier>>,
}

impl DerivedStats {
    /// Scan newest-first; strict comparisons make the first encountered
    /// (most recent) reading win ties.
    pub fn compute<'a>(readings: impl IntoIterator<Item = &'a Reading>) -> Self {
        let mut iter = readings.into_iter();
        let Some(first) = iter.next() else {
            return Self::default();
        };

        let (mut max_temp, mut min_temp, mut max_speed, mut min_speed) =
            (first, first, first, first);
        for reading in iter {
            if reading.temperature > max_temp.temperature {
                max_temp = reading;
            }
            if reading.temperature < min_temp.temperature {
                min_temp = reading;
            }
            if reading.speed > max_speed.speed {
                max_speed = reading;
            }
            if reading.speed < min_speed.speed {
                min_speed = reading;
            }
        }

        Self {
            max_temp: Some(Extremum {
                reading: max_temp.clone(),
                tier: TemperatureHighTier::classify(max_temp.temperature),
            }),
            min_temp: Some(Extremum {
                reading: min_temp.clone(),
                tier: TemperatureLowTier::classify(min_temp.temperature),
            }),
            max_speed: Some(Extremum {
                reading: max_speed.clone(),
                tier: SpeedHighTier::classify(max_speed.speed),
            }),
            min_speed: Some(Extremum {
                reading: min_speed.clone(),
                tier: SpeedLowTier::classify(min_speed.speed),
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.max_temp.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn reading(id: &str, speed: f64, temperature: f64) -> Reading {
        Reading::new(id, Utc.timestamp_opt(0, 0).unwrap(), speed, temperature)
    }

    #[test]
    fn test_empty_buffer() {
        let stats = DerivedStats::compute(std::iter::empty());
        assert!(stats.is_empty());
        assert_eq!(stats, DerivedStats::default());
    }

    #[test]
    fn test_tie_break_first_encountered() {
        let readings = vec![
            reading("first", 1000.0, 90.0),
            reading("cold", 1000.0, 20.0),
            reading("second", 1000.0, 90.0),
        ];
        let stats = DerivedStats::compute(&readings);

        assert_eq!(stats.max_temp.as_ref().unwrap().reading.id, "first");
        assert_eq!(stats.min_temp.as_ref().unwrap().reading.id, "cold");
        // All speeds equal: the front entry wins both speed extrema
        assert_eq!(stats.max_speed.as_ref().unwrap().reading.id, "first");
        assert_eq!(stats.min_speed.as_ref().unwrap().reading.id, "first");
    }

    #[test]
    fn test_extrema_and_tiers() {
        let readings = vec![
            reading("a", 3100.0, 78.0),
            reading("b", 450.0, 45.0),
            reading("c", 1800.0, 60.0),
        ];
        let stats = DerivedStats::compute(&readings);

        let max_temp = stats.max_temp.unwrap();
        assert_eq!(max_temp.reading.id, "a");
        assert_eq!(max_temp.tier, TemperatureHighTier::Warning);

        let min_temp = stats.min_temp.unwrap();
        assert_eq!(min_temp.reading.id, "b");
        assert_eq!(min_temp.tier, TemperatureLowTier::Optimal);

        let max_speed = stats.max_speed.unwrap();
        assert_eq!(max_speed.reading.id, "a");
        assert_eq!(max_speed.tier, SpeedHighTier::Overload);

        let min_speed = stats.min_speed.unwrap();
        assert_eq!(min_speed.reading.id, "b");
        assert_eq!(min_speed.tier, SpeedLowTier::StallRisk);
    }

    #[test]
    fn test_temperature_tier_boundaries() {
        assert_eq!(TemperatureHighTier::classify(85.0), TemperatureHighTier::Warning);
        assert_eq!(TemperatureHighTier::classify(85.1), TemperatureHighTier::Critical);
        assert_eq!(TemperatureHighTier::classify(75.0), TemperatureHighTier::Normal);

        assert_eq!(TemperatureLowTier::classify(29.9), TemperatureLowTier::Cold);
        assert_eq!(TemperatureLowTier::classify(30.0), TemperatureLowTier::Optimal);
        assert_eq!(TemperatureLowTier::classify(50.0), TemperatureLowTier::Warm);
    }

    #[test]
    fn test_speed_tier_boundaries() {
        assert_eq!(SpeedHighTier::classify(3000.0), SpeedHighTier::High);
        assert_eq!(SpeedHighTier::classify(2500.0), SpeedHighTier::Optimal);
        assert_eq!(SpeedHighTier::classify(1500.0), SpeedHighTier::Low);

        assert_eq!(SpeedLowTier::classify(499.0), SpeedLowTier::StallRisk);
        assert_eq!(SpeedLowTier::classify(500.0), SpeedLowTier::Low);
        assert_eq!(SpeedLowTier::classify(1000.0), SpeedLowTier::Idle);
        assert_eq!(SpeedLowTier::classify(1500.0), SpeedLowTier::Normal);
    }

    #[test]
    fn test_no_hysteresis() {
        let tiers: Vec<_> = [75.1, 74.9, 75.1]
            .into_iter()
            .map(TemperatureHighTier::classify)
            .collect();
        assert_eq!(
            tiers,
            vec![
                TemperatureHighTier::Warning,
                TemperatureHighTier::Normal,
                TemperatureHighTier::Warning
            ]
        );
    }

    #[test]
    fn test_tier_serialization() {
        assert_eq!(
            serde_json::to_string(&SpeedLowTier::StallRisk).unwrap(),
            "\"stall-risk\""
        );
        assert_eq!(SpeedLowTier::StallRisk.label(), "stall-risk");
    }
}
