//! # airlog
//!
//! airlog is a logging daemon for serial-attached air-quality instruments,
//! written in Rust. It continuously reads line-oriented measurements from each
//! configured instrument, funnels them through a shared transit queue, and a
//! single writer classifies, timestamps, and appends them into per-instrument,
//! per-day data logs. A companion archive step finalises a completed day's log
//! for storage or transfer.
//!
//! ## Design
//!
//! One reader thread exists per instrument plus a single router (writer)
//! thread, all inside one process using plain blocking I/O. The only structure
//! shared across threads is the transit queue, an unbounded multi-producer
//! single-consumer channel; every log file is touched by the router thread
//! alone, so no file locking is needed. Per-instrument submission order is
//! preserved end to end. Queued-but-unwritten lines are lost if the process
//! dies; durability starts at the log file.
//!
//! A reader whose port is missing at startup is skipped without affecting its
//! siblings, and a port that fails mid-run is reopened with a fixed backoff.
//! Malformed records (undecodable bytes, unparseable timestamps) are expected
//! line noise and are dropped whole; a record is never partially written.
//!
//! ## Configuration
//!
//! Configuration is a YAML file mapping instruments to serial devices.
//! A template can be generated with the CLI's `new` subcommand:
//!
//! ```yml
//! log_path: ./logs
//! instruments:
//! - name: SENSOR_ARRAY_1
//!   device: /dev/SENSOR_ARRAY_1
//! ```
//!
//! All instruments are read at 9600 baud with a 1 second read timeout.
//!
//! ## Output
//!
//! Data rows land in `<log_path>/<instrument>/<instrument>_<YYYY-MM-DD>_data.log`,
//! newline-delimited UTF-8, first row a fixed 67-column header. In-band error
//! transmissions land in `<log_path>/<instrument>/<instrument>_error.log`. The
//! date is taken from the instrument's own Unix-seconds timestamp field
//! (UTC); lines from unrecognised instrument identifiers fall back to the
//! host clock.
//!
//! ## Calibration
//!
//! The [`calibrate`] module converts raw per-channel ADC counts from the
//! persisted rows into physical units (VOC, NO, NO2, CO, OX, CO2). It is used
//! by downstream consumers of the log files, not by the ingestion path itself.
pub mod archive;
pub mod calibrate;
pub mod config;
pub mod constants;
pub mod error;
pub mod line;
pub mod process;
pub mod queue;
pub mod reader;
pub mod router;
