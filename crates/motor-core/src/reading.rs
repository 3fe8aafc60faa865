//! Sensor readings.
//!
//! A `Reading` is identified by `id`; `timestamp` is the secondary key used
//! to recognise the same physical sample resent under a new id.

use crate::error::{CoreError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Operating status reported with each reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingStatus {
    #[default]
    Normal,
    Warning,
    Critical,
    Maintenance,
}

impl ReadingStatus {
    /// Map the device maintenance code (0=good, 1=warning, 2=critical,
    /// 3=maintenance due). Unknown codes are treated as critical.
    pub fn from_maintenance_code(code: i64) -> Self {
        match code {
            0 => Self::Normal,
            1 => Self::Warning,
            3 => Self::Maintenance,
            _ => Self::Critical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::Maintenance => "maintenance",
        }
    }
}

impl std::fmt::Display for ReadingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire names of the secondary sensor channels, in export column order.
pub const SENSOR_CHANNEL_NAMES: [&str; 30] = [
    "vibration",
    "vibrationX",
    "vibrationY",
    "vibrationZ",
    "oilPressure",
    "airPressure",
    "hydraulicPressure",
    "coolantFlowRate",
    "fuelFlowRate",
    "voltage",
    "current",
    "powerFactor",
    "powerConsumption",
    "rpm",
    "torque",
    "efficiency",
    "humidity",
    "ambientTemperature",
    "ambientPressure",
    "shaftPosition",
    "displacement",
    "strainGauge1",
    "strainGauge2",
    "strainGauge3",
    "soundLevel",
    "bearingHealth",
    "operatingHours",
    "operatingMinutes",
    "operatingSeconds",
    "systemHealth",
];

/// Secondary sensor channels. Every channel is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SensorChannels {
    /// Overall vibration magnitude (mm/s).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vibration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vibration_x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vibration_y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vibration_z: Option<f64>,
    /// Oil pressure (bar).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oil_pressure: Option<f64>,
    /// Air pressure (bar).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub air_pressure: Option<f64>,
    /// Hydraulic pressure (bar).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hydraulic_pressure: Option<f64>,
    /// Coolant flow (L/min).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coolant_flow_rate: Option<f64>,
    /// Fuel flow (L/h).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuel_flow_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voltage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_factor: Option<f64>,
    /// Power draw (kW).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_consumption: Option<f64>,
    /// Output shaft RPM (distinct from the drive `speed`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpm: Option<f64>,
    /// Torque (Nm).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub torque: Option<f64>,
    /// Efficiency (%).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub efficiency: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ambient_temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ambient_pressure: Option<f64>,
    /// Shaft angle (degrees, 0-360).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shaft_position: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub displacement: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strain_gauge1: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strain_gauge2: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strain_gauge3: Option<f64>,
    /// Sound level (dB).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound_level: Option<f64>,
    /// Bearing health index (0-100).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearing_health: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operating_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operating_minutes: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operating_seconds: Option<f64>,
    /// System health index (0-100).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_health: Option<f64>,
}

impl SensorChannels {
    /// Channel values in `SENSOR_CHANNEL_NAMES` order.
    pub fn values(&self) -> [Option<f64>; 30] {
        [
            self.vibration,
            self.vibration_x,
            self.vibration_y,
            self.vibration_z,
            self.oil_pressure,
            self.air_pressure,
            self.hydraulic_pressure,
            self.coolant_flow_rate,
            self.fuel_flow_rate,
            self.voltage,
            self.current,
            self.power_factor,
            self.power_consumption,
            self.rpm,
            self.torque,
            self.efficiency,
            self.humidity,
            self.ambient_temperature,
            self.ambient_pressure,
            self.shaft_position,
            self.displacement,
            self.strain_gauge1,
            self.strain_gauge2,
            self.strain_gauge3,
            self.sound_level,
            self.bearing_health,
            self.operating_hours,
            self.operating_minutes,
            self.operating_seconds,
            self.system_health,
        ]
    }
}

/// Reading as delivered by the snapshot endpoint or the push channel.
///
/// Identity fields are optional here; `Reading::try_from` rejects payloads
/// that lack them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReading {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// Drive speed (RPM).
    pub speed: f64,
    /// Winding temperature (°C).
    pub temperature: f64,
    #[serde(default)]
    pub status: ReadingStatus,
    #[serde(flatten)]
    pub sensors: SensorChannels,
}

/// Validated sensor reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawReading")]
pub struct Reading {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    /// Drive speed (RPM).
    pub speed: f64,
    /// Winding temperature (°C).
    pub temperature: f64,
    pub status: ReadingStatus,
    #[serde(flatten)]
    pub sensors: SensorChannels,
}

impl Reading {
    /// Create a reading with normal status and no secondary channels.
    pub fn new(
        id: impl Into<String>,
        timestamp: DateTime<Utc>,
        speed: f64,
        temperature: f64,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp,
            speed,
            temperature,
            status: ReadingStatus::Normal,
            sensors: SensorChannels::default(),
        }
    }

    pub fn with_status(mut self, status: ReadingStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_sensors(mut self, sensors: SensorChannels) -> Self {
        self.sensors = sensors;
        self
    }
}

impl TryFrom<RawReading> for Reading {
    type Error = CoreError;

    fn try_from(raw: RawReading) -> Result<Self> {
        let id = match raw.id {
            Some(id) if !id.trim().is_empty() => id,
            _ => return Err(CoreError::MissingIdentity { kind: "Reading" }),
        };
        let Some(timestamp) = raw.timestamp else {
            return Err(CoreError::MissingTimestamp { id });
        };
        if !raw.speed.is_finite() {
            return Err(CoreError::NonFinite { id, field: "speed" });
        }
        if !raw.temperature.is_finite() {
            return Err(CoreError::NonFinite {
                id,
                field: "temperature",
            });
        }

        Ok(Self {
            id,
            timestamp,
            speed: raw.speed,
            temperature: raw.temperature,
            status: raw.status,
            sensors: raw.sensors,
        })
    }
}

impl From<Reading> for RawReading {
    fn from(reading: Reading) -> Self {
        Self {
            id: Some(reading.id),
            timestamp: Some(reading.timestamp),
            speed: reading.speed,
            temperature: reading.temperature,
            status: reading.status,
            sensors: reading.sensors,
        }
    }
}
