use std::fmt::{Display, Formatter};
use std::str::FromStr;

use super::constants::ADC_GAIN;
use super::error::CalibrationError;

/// The sensor channel groups carried by an instrument.
///
/// Each variant knows the number of raw channel values its calibration formula
/// requires. Dispatch is by enum match, so a missing formula is a compile error
/// rather than a runtime surprise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorType {
    Voc,
    No,
    No2,
    Co,
    Ox,
    Co2,
}

impl SensorType {
    /// The number of raw channel values the calibration formula consumes.
    pub fn arity(&self) -> usize {
        match self {
            SensorType::Voc => 8,
            _ => 6,
        }
    }
}

impl FromStr for SensorType {
    type Err = CalibrationError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VOC" => Ok(SensorType::Voc),
            "NO" => Ok(SensorType::No),
            "NO2" => Ok(SensorType::No2),
            "CO" => Ok(SensorType::Co),
            "OX" => Ok(SensorType::Ox),
            "CO2" => Ok(SensorType::Co2),
            _ => Err(CalibrationError::UnknownSensorType(s.to_string())),
        }
    }
}

impl Display for SensorType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorType::Voc => write!(f, "VOC"),
            SensorType::No => write!(f, "NO"),
            SensorType::No2 => write!(f, "NO2"),
            SensorType::Co => write!(f, "CO"),
            SensorType::Ox => write!(f, "OX"),
            SensorType::Co2 => write!(f, "CO2"),
        }
    }
}

/// Convert a fixed-arity slice of raw channel counts into a calibrated physical value.
///
/// All sensors except CO2 scale every raw count by the ADC gain before applying
/// their formula. Returns `ArityMismatch` if the slice length does not match the
/// sensor's required channel count.
pub fn calibrate(sensor: SensorType, raw: &[f64]) -> Result<f64, CalibrationError> {
    if raw.len() != sensor.arity() {
        return Err(CalibrationError::ArityMismatch(
            sensor,
            sensor.arity(),
            raw.len(),
        ));
    }
    let value = match sensor {
        SensorType::Voc => {
            let scaled: Vec<f64> = raw.iter().map(|v| v * ADC_GAIN).collect();
            median(&scaled) / 1000.0
        }
        SensorType::No => electrochemical(raw, 225.0, 245.0, 309.0) + 276.0,
        SensorType::No2 => electrochemical(raw, 225.0, 245.0, 309.0),
        SensorType::Co => electrochemical(raw, 270.0, 340.0, 420.0) + 1660.0,
        SensorType::Ox => electrochemical(raw, 260.0, 300.0, 298.0) - 100.0,
        SensorType::Co2 => {
            // NDIR channels are not gain scaled; only the measurement channels
            // (even indices) carry signal, the reference channels are ignored.
            let ppm: Vec<f64> = raw
                .iter()
                .step_by(2)
                .map(|m| (1350.0 + 3500.0 * m) / 1000.0)
                .collect();
            median(&ppm) + 370.0
        }
    };
    Ok(value)
}

/// Parse a sensor type keyword and calibrate in one step.
pub fn calibrate_named(sensor: &str, raw: &[f64]) -> Result<f64, CalibrationError> {
    calibrate(SensorType::from_str(sensor)?, raw)
}

/// Median of (working, auxiliary) electrode pair differentials.
///
/// The raw slice is consumed as 3 consecutive pairs. Each pair yields
/// `((working - w_offset) - (aux - aux_offset)) / sensitivity * 1000` after gain
/// scaling; the median across the 3 pairs rejects a single misbehaving electrode.
fn electrochemical(raw: &[f64], w_offset: f64, aux_offset: f64, sensitivity: f64) -> f64 {
    let deltas: Vec<f64> = raw
        .chunks_exact(2)
        .map(|pair| {
            let working = pair[0] * ADC_GAIN;
            let aux = pair[1] * ADC_GAIN;
            ((working - w_offset) - (aux - aux_offset)) / sensitivity * 1000.0
        })
        .collect();
    median(&deltas)
}

/// Median with the middle pair averaged for even-length input.
fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(value: f64, expected: f64) {
        assert!(
            (value - expected).abs() < 1.0e-9,
            "expected {expected}, got {value}"
        );
    }

    #[test]
    fn test_median_even_count() {
        assert_close(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn test_voc_gain() {
        let value = calibrate(SensorType::Voc, &[1000.0; 8]).unwrap();
        assert_close(value, 0.0625);
    }

    #[test]
    fn test_no_pairwise_median() {
        // Scaled working electrodes at 225, 225 + 309, 225 + 618 give pair
        // differentials of 0, 1000 and 2000 ppb; median 1000 plus offset.
        let raw = [
            225.0 / ADC_GAIN,
            245.0 / ADC_GAIN,
            534.0 / ADC_GAIN,
            245.0 / ADC_GAIN,
            843.0 / ADC_GAIN,
            245.0 / ADC_GAIN,
        ];
        assert_close(calibrate(SensorType::No, &raw).unwrap(), 1276.0);
    }

    #[test]
    fn test_no2_has_no_offset() {
        let raw = [
            225.0 / ADC_GAIN,
            245.0 / ADC_GAIN,
            225.0 / ADC_GAIN,
            245.0 / ADC_GAIN,
            225.0 / ADC_GAIN,
            245.0 / ADC_GAIN,
        ];
        assert_close(calibrate(SensorType::No2, &raw).unwrap(), 0.0);
    }

    #[test]
    fn test_co_zero_differential_is_offset() {
        let raw = [
            270.0 / ADC_GAIN,
            340.0 / ADC_GAIN,
            270.0 / ADC_GAIN,
            340.0 / ADC_GAIN,
            270.0 / ADC_GAIN,
            340.0 / ADC_GAIN,
        ];
        assert_close(calibrate(SensorType::Co, &raw).unwrap(), 1660.0);
    }

    #[test]
    fn test_ox_zero_differential_is_offset() {
        let raw = [
            260.0 / ADC_GAIN,
            300.0 / ADC_GAIN,
            260.0 / ADC_GAIN,
            300.0 / ADC_GAIN,
            260.0 / ADC_GAIN,
            300.0 / ADC_GAIN,
        ];
        assert_close(calibrate(SensorType::Ox, &raw).unwrap(), -100.0);
    }

    #[test]
    fn test_co2_ignores_reference_channels() {
        let first = calibrate(SensorType::Co2, &[1.0, 0.0, 1.0, 0.0, 1.0, 0.0]).unwrap();
        let second =
            calibrate(SensorType::Co2, &[1.0, 99.0, 1.0, -42.0, 1.0, 7.5]).unwrap();
        assert_close(first, second);
        assert_close(first, (1350.0 + 3500.0) / 1000.0 + 370.0);
    }

    #[test]
    fn test_arity_mismatch() {
        match calibrate(SensorType::Voc, &[1.0; 6]) {
            Err(CalibrationError::ArityMismatch(SensorType::Voc, 8, 6)) => (),
            other => panic!("expected arity mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_sensor_type() {
        match calibrate_named("PM10", &[1.0; 6]) {
            Err(CalibrationError::UnknownSensorType(s)) => assert_eq!(s, "PM10"),
            other => panic!("expected unknown sensor type, got {other:?}"),
        }
    }
}
