/// Field values of the CSV log: the header labels and one record per reading
use time::OffsetDateTime;

use crate::config::WindSpeedUnit;
use crate::models::{FieldId, SensorReading};
use crate::utils::format_timestamp;

/// One CSV record, one entry per column
pub type Record = Vec<String>;

fn column_label(field: FieldId, unit: WindSpeedUnit) -> String {
    let label = match field {
        FieldId::InsideTemperature => "Inside Temperature (celsius)",
        FieldId::OutsideTemperature => "Outside Temperature (celsius)",
        FieldId::InsideHumidity => "Inside Humidity (percent)",
        FieldId::OutsideHumidity => "Outside Humidity (percent)",
        FieldId::WindSpeed => return format!("Wind Speed ({})", unit.label()),
        FieldId::WindDirection => "Wind Direction (degrees)",
        FieldId::Barometer => "Barometer (hectopascals)",
        FieldId::SolarRadiation => "Solar Radiation (w/m^2)",
        FieldId::Uv => "UV Index",
        FieldId::RainRate => "Rain Rate (mm/hr)",
        FieldId::ConsoleBattery => "Console Battery (volts)",
        FieldId::SoilTemperature1 => "Soil Temperature 1 (celsius)",
        FieldId::SoilMoisture1 => "Soil Moisture 1 (centibar)",
        FieldId::SoilTemperature2 => "Soil Temperature 2 (celsius)",
        FieldId::SoilMoisture2 => "Soil Moisture 2 (centibar)",
        FieldId::SoilTemperature3 => "Soil Temperature 3 (celsius)",
        FieldId::SoilMoisture3 => "Soil Moisture 3 (centibar)",
        FieldId::SoilTemperature4 => "Soil Temperature 4 (celsius)",
        FieldId::SoilMoisture4 => "Soil Moisture 4 (centibar)",
    };
    label.to_string()
}

/// Header record for the log, starting with `#Datetime`. Only the wind speed
/// column depends on configuration.
pub fn csv_header(unit: WindSpeedUnit) -> Record {
    std::iter::once("#Datetime".to_string())
        .chain(FieldId::ALL.iter().map(|&field| column_label(field, unit)))
        .collect()
}

/// One CSV record: the timestamp followed by every field with two decimals.
/// Invalid fields are written as the sentinel value.
pub fn format_record(reading: &SensorReading, timestamp: &OffsetDateTime) -> Record {
    std::iter::once(format_timestamp(timestamp))
        .chain(
            FieldId::ALL
                .iter()
                .map(|&field| format!("{:.2}", reading.value_or_sentinel(field))),
        )
        .collect()
}
