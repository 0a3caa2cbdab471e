/// Field extraction, unit conversion and plausibility checks for LOOP packets
///
/// Every field is described by one [`FieldSpec`] row in [`FIELD_TABLE`]: where
/// its raw value lives in the frame, how it converts to engineering units and
/// which range is physically plausible. A field outside its range is reported
/// as unavailable without affecting any other field.
use log::{debug, trace};

use crate::config::{DecodeConfig, WindSpeedUnit};
use crate::davis::packet::RawFrame;
use crate::models::{FieldId, SensorReading, FIELD_COUNT};

const INHG_TO_HPA: f32 = 33.86;
const MPH_TO_MS: f32 = 0.44704;
const MS_TO_KMH: f32 = 3.6;
const SOIL_TEMPERATURE_OFFSET: f32 = 90.0;

/// Where a field's raw value is stored, relative to the packet marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawSource {
    Byte(usize),
    /// Little-endian word, low byte at the offset
    Word(usize),
}

/// Configuration-dependent step applied around the plausibility check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    None,
    /// Optional 180 degree rotation, before the check
    WindDirection,
    /// Optional km/h conversion, after the check
    WindSpeedUnit,
    /// Calibration multiplier, after the check
    BarometerCalibration,
}

impl Adjustment {
    fn before_check(self, value: f32, config: &DecodeConfig) -> f32 {
        match self {
            Adjustment::WindDirection if config.rotate_wind_direction => {
                let rotated = value + 180.0;
                if rotated > 360.0 {
                    rotated - 360.0
                } else {
                    rotated
                }
            }
            _ => value,
        }
    }

    fn after_check(self, value: f32, config: &DecodeConfig) -> f32 {
        match self {
            Adjustment::WindSpeedUnit
                if config.wind_speed_unit == WindSpeedUnit::KilometresPerHour =>
            {
                value * MS_TO_KMH
            }
            Adjustment::BarometerCalibration => value * config.barometer_calibration,
            _ => value,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub field: FieldId,
    pub source: RawSource,
    pub convert: fn(f32) -> f32,
    /// Inclusive plausibility range; `None` accepts any decoded value
    pub bounds: Option<(f32, f32)>,
    pub adjustment: Adjustment,
}

fn identity(raw: f32) -> f32 {
    raw
}

/// Thousandths of an inch of mercury to hectopascals
fn barometer_hpa(raw: f32) -> f32 {
    raw / 1000.0 * INHG_TO_HPA
}

fn tenths_fahrenheit_to_celsius(raw: f32) -> f32 {
    (raw / 10.0 - 32.0) * 5.0 / 9.0
}

fn mph_to_ms(raw: f32) -> f32 {
    raw * MPH_TO_MS
}

fn uv_index(raw: f32) -> f32 {
    raw / 10.0
}

fn battery_volts(raw: f32) -> f32 {
    raw * 300.0 / 512.0 / 100.0
}

fn rain_rate_mm(raw: f32) -> f32 {
    raw * 0.25
}

fn soil_celsius(raw: f32) -> f32 {
    (raw - SOIL_TEMPERATURE_OFFSET - 32.0) * 5.0 / 9.0
}

const fn spec(
    field: FieldId,
    source: RawSource,
    convert: fn(f32) -> f32,
    bounds: Option<(f32, f32)>,
    adjustment: Adjustment,
) -> FieldSpec {
    FieldSpec {
        field,
        source,
        convert,
        bounds,
        adjustment,
    }
}

const TEMPERATURE_BOUNDS: Option<(f32, f32)> = Some((-80.0, 100.0));
const HUMIDITY_BOUNDS: Option<(f32, f32)> = Some((0.0, 100.0));

/// Offsets from the LOOP marker, in CSV column order
pub static FIELD_TABLE: [FieldSpec; FIELD_COUNT] = {
    use Adjustment as A;
    use FieldId as F;
    use RawSource::{Byte, Word};
    [
        spec(F::InsideTemperature, Word(9), tenths_fahrenheit_to_celsius, TEMPERATURE_BOUNDS, A::None),
        spec(F::OutsideTemperature, Word(12), tenths_fahrenheit_to_celsius, TEMPERATURE_BOUNDS, A::None),
        spec(F::InsideHumidity, Byte(11), identity, HUMIDITY_BOUNDS, A::None),
        spec(F::OutsideHumidity, Byte(33), identity, HUMIDITY_BOUNDS, A::None),
        spec(F::WindSpeed, Byte(14), mph_to_ms, Some((0.0, 50.0)), A::WindSpeedUnit),
        spec(F::WindDirection, Word(16), identity, Some((0.0, 360.0)), A::WindDirection),
        spec(F::Barometer, Word(7), barometer_hpa, Some((800.0, 1100.0)), A::BarometerCalibration),
        spec(F::SolarRadiation, Word(44), identity, Some((0.0, 1800.0)), A::None),
        spec(F::Uv, Byte(43), uv_index, Some((0.0, 50.0)), A::None),
        spec(F::RainRate, Word(46), rain_rate_mm, Some((0.0, 300.0)), A::None),
        spec(F::ConsoleBattery, Word(87), battery_volts, Some((-10.0, 50.0)), A::None),
        spec(F::SoilTemperature1, Byte(25), soil_celsius, None, A::None),
        spec(F::SoilMoisture1, Byte(62), identity, None, A::None),
        spec(F::SoilTemperature2, Byte(26), soil_celsius, None, A::None),
        spec(F::SoilMoisture2, Byte(63), identity, None, A::None),
        spec(F::SoilTemperature3, Byte(27), soil_celsius, None, A::None),
        spec(F::SoilMoisture3, Byte(64), identity, None, A::None),
        spec(F::SoilTemperature4, Byte(28), soil_celsius, None, A::None),
        spec(F::SoilMoisture4, Byte(65), identity, None, A::None),
    ]
};

fn read_raw(frame: &RawFrame, source: RawSource) -> Option<f32> {
    match source {
        RawSource::Byte(offset) => frame.byte(offset).map(f32::from),
        RawSource::Word(offset) => frame.word(offset).map(f32::from),
    }
}

/// Decode a single field. `None` when the bytes are missing or the value is
/// outside the field's bounds.
pub fn decode_field(spec: &FieldSpec, frame: &RawFrame, config: &DecodeConfig) -> Option<f32> {
    let raw = read_raw(frame, spec.source)?;
    let value = spec.adjustment.before_check((spec.convert)(raw), config);

    if let Some((low, high)) = spec.bounds {
        if !(low..=high).contains(&value) {
            return None;
        }
    }

    Some(spec.adjustment.after_check(value, config))
}

/// Decode every field of a LOOP packet. Never fails: implausible fields are
/// left unavailable and the rest of the reading is kept.
pub fn decode(frame: &RawFrame, config: &DecodeConfig) -> SensorReading {
    let mut values = [None; FIELD_COUNT];
    if config.verbosity > 1 {
        trace!("LOOP frame ({} bytes): {:02x?}", frame.len(), frame.as_bytes());
    }

    for spec in FIELD_TABLE.iter() {
        let value = decode_field(spec, frame, config);

        if config.verbosity > 1 {
            trace!("Raw {} at {:?}: {:?}", spec.field.label(), spec.source, read_raw(frame, spec.source));
        }
        if config.verbosity > 0 {
            match value {
                Some(v) => debug!("{}: {:.2}", spec.field.label(), v),
                None => debug!("{}: out of range, logged as unavailable", spec.field.label()),
            }
        }

        values[spec.field.index()] = value;
    }

    SensorReading::from_values(values)
}
