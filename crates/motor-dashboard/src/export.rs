//! Buffer export.
//!
//! CSV uses a fixed 35-column schema: five primary columns followed by every
//! sensor channel in wire order. Absent channels are empty cells.

use motor_core::{Reading, SENSOR_CHANNEL_NAMES};

const PRIMARY_COLUMNS: [&str; 5] = ["id", "timestamp", "speed", "temperature", "status"];

/// Total column count of the CSV export.
pub const CSV_COLUMNS: usize = PRIMARY_COLUMNS.len() + SENSOR_CHANNEL_NAMES.len();

/// Render readings (newest-first, as buffered) to CSV.
pub fn readings_to_csv(readings: &[Reading]) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(PRIMARY_COLUMNS.iter().chain(SENSOR_CHANNEL_NAMES.iter()))?;

    for reading in readings {
        let mut record: Vec<String> = Vec::with_capacity(CSV_COLUMNS);
        record.push(reading.id.clone());
        record.push(reading.timestamp.to_rfc3339());
        record.push(reading.speed.to_string());
        record.push(reading.temperature.to_string());
        record.push(reading.status.as_str().to_string());
        record.extend(
            reading
                .sensors
                .values()
                .iter()
                .map(|v| v.map(|v| v.to_string()).unwrap_or_default()),
        );
        writer.write_record(&record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
