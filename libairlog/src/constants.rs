//! Constants used throughout the ingestion pipeline.

use std::time::Duration;

use time::format_description::FormatItem;
use time::macros::format_description;

/// All instruments talk at the same fixed rate.
pub const BAUD_RATE: u32 = 9600;

/// Serial reads give up after this long; a timeout is "no data this cycle".
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Delay between attempts to reopen a serial port that failed mid-run.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// ADC gain factor applied to raw channel counts before calibration (all sensors except CO2).
pub const ADC_GAIN: f64 = 0.0625;

/// Date component of data log file names, e.g. `2021-01-01`.
pub const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// The fixed 67-column header written as the first row of every data log.
pub const DATA_HEADER: &str = "timestamp,voc_voltage,voc_current,voc_power,heater_voltage,heater_current,heater_power,voc_1,voc_2,voc_3,voc_4,voc_5,voc_6,voc_7,voc_8,no_voltage,no_current,no_power,no_1_working,no_1_aux,no_2_working,no_2_aux,no_3_working,no_3_aux,co_voltage,co_current,co_power,co_1_working,co_1_aux,co_2_working,co_2_aux,co_3_working,co_3_aux,ox_voltage,ox_current,ox_power,ox_1_working,ox_1_aux,ox_2_working,ox_2_aux,ox_3_working,ox_3_aux,no2_voltage,no2_current,no2_power,no2_1_working,no2_1_aux,no2_2_working,no2_2_aux,no2_3_working,no2_3_aux,co2_voltage,co2_current,co2_power,co2_1_measurement,co2_1_reference,co2_2_measurement,co2_2_reference,co2_3_measurement,co2_3_reference,pump_voltage,pump_current,pump_power,pressure,flow_rate,relative_humidity,temperature";
