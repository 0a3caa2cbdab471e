//! Decoded weather data shared by the decoder, formatter and main loop

/// Value written to the log in place of a field that failed validation
pub const ERROR_VALUE: f32 = -9999.9;

/// Number of sensor columns in a reading (everything except the timestamp)
pub const FIELD_COUNT: usize = 19;

/// Identifies one sensor column. Declaration order is the CSV column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldId {
    InsideTemperature,
    OutsideTemperature,
    InsideHumidity,
    OutsideHumidity,
    WindSpeed,
    WindDirection,
    Barometer,
    SolarRadiation,
    Uv,
    RainRate,
    ConsoleBattery,
    SoilTemperature1,
    SoilMoisture1,
    SoilTemperature2,
    SoilMoisture2,
    SoilTemperature3,
    SoilMoisture3,
    SoilTemperature4,
    SoilMoisture4,
}

impl FieldId {
    pub const ALL: [FieldId; FIELD_COUNT] = [
        FieldId::InsideTemperature,
        FieldId::OutsideTemperature,
        FieldId::InsideHumidity,
        FieldId::OutsideHumidity,
        FieldId::WindSpeed,
        FieldId::WindDirection,
        FieldId::Barometer,
        FieldId::SolarRadiation,
        FieldId::Uv,
        FieldId::RainRate,
        FieldId::ConsoleBattery,
        FieldId::SoilTemperature1,
        FieldId::SoilMoisture1,
        FieldId::SoilTemperature2,
        FieldId::SoilMoisture2,
        FieldId::SoilTemperature3,
        FieldId::SoilMoisture3,
        FieldId::SoilTemperature4,
        FieldId::SoilMoisture4,
    ];

    /// Column position of this field, not counting the timestamp
    pub fn index(self) -> usize {
        self as usize
    }

    /// Human readable name used in diagnostics
    pub fn label(self) -> &'static str {
        match self {
            FieldId::InsideTemperature => "inside temperature",
            FieldId::OutsideTemperature => "outside temperature",
            FieldId::InsideHumidity => "inside humidity",
            FieldId::OutsideHumidity => "outside humidity",
            FieldId::WindSpeed => "wind speed",
            FieldId::WindDirection => "wind direction",
            FieldId::Barometer => "barometer",
            FieldId::SolarRadiation => "solar radiation",
            FieldId::Uv => "UV index",
            FieldId::RainRate => "rain rate",
            FieldId::ConsoleBattery => "console battery",
            FieldId::SoilTemperature1 => "soil temperature 1",
            FieldId::SoilMoisture1 => "soil moisture 1",
            FieldId::SoilTemperature2 => "soil temperature 2",
            FieldId::SoilMoisture2 => "soil moisture 2",
            FieldId::SoilTemperature3 => "soil temperature 3",
            FieldId::SoilMoisture3 => "soil moisture 3",
            FieldId::SoilTemperature4 => "soil temperature 4",
            FieldId::SoilMoisture4 => "soil moisture 4",
        }
    }
}

/// One decoded LOOP packet. `None` marks a field that was unavailable or
/// outside its plausibility bounds; other fields are unaffected.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    values: [Option<f32>; FIELD_COUNT],
}

impl SensorReading {
    /// A reading with every field unavailable
    pub fn unavailable() -> Self {
        Self {
            values: [None; FIELD_COUNT],
        }
    }

    pub fn from_values(values: [Option<f32>; FIELD_COUNT]) -> Self {
        Self { values }
    }

    pub fn get(&self, field: FieldId) -> Option<f32> {
        self.values[field.index()]
    }

    /// Value as written to the log, with the sentinel standing in for invalid fields
    pub fn value_or_sentinel(&self, field: FieldId) -> f32 {
        self.get(field).unwrap_or(ERROR_VALUE)
    }

    pub fn invalid_fields(&self) -> impl Iterator<Item = FieldId> + '_ {
        FieldId::ALL
            .into_iter()
            .filter(|field| self.get(*field).is_none())
    }
}
