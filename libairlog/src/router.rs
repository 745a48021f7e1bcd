use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use time::{Date, OffsetDateTime};

use super::config::Config;
use super::constants::{DATA_HEADER, DATE_FORMAT};
use super::error::RouterError;
use super::line::TaggedLine;
use super::queue::Consumer;

/// How often the router wakes from an empty queue to check the stop flag.
const POP_INTERVAL: Duration = Duration::from_millis(250);

/// LogRouter is the single consumer of the transit queue.
///
/// Each tagged line is classified (error vs. data), timestamped, and appended
/// to the matching per-instrument, per-day file. No persistent file handle is
/// held between records, and no record failure ever terminates the loop; a bad
/// record is logged and dropped whole.
pub struct LogRouter {
    config: Config,
    queue: Consumer<TaggedLine>,
    warned_unknown: HashSet<String>,
}

impl LogRouter {
    pub fn new(config: &Config, queue: Consumer<TaggedLine>) -> Self {
        log::info!("Initialising data logging");
        LogRouter {
            config: config.clone(),
            queue,
            warned_unknown: HashSet::new(),
        }
    }

    /// Create the log directory for every configured instrument.
    ///
    /// A failure here is logged and skipped: that instrument's writes will fail
    /// individually later, but routing for the others continues.
    pub fn prepare_directories(&self) {
        for instrument in self.config.instruments.iter() {
            let dir = self.config.instrument_directory(&instrument.name);
            if let Err(e) = std::fs::create_dir_all(&dir) {
                log::error!("Unable to create log directory {dir:?}: {e}");
            }
        }
    }

    /// The writer loop. Drains the queue until `stop` is raised and the queue
    /// is idle, or every producer has disconnected.
    pub fn run(&mut self, stop: &AtomicBool) {
        log::info!("Starting data writing loop");
        self.prepare_directories();
        loop {
            match self.queue.pop_timeout(POP_INTERVAL) {
                Ok(line) => self.write_record(&line),
                Err(RecvTimeoutError::Timeout) => {
                    if stop.load(Ordering::Relaxed) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        log::info!("Data writing loop stopping");
    }

    /// Classify one tagged line and append it to the right file.
    fn write_record(&mut self, line: &TaggedLine) {
        let first_field = match line.text.split(',').next() {
            Some(f) => f,
            None => return,
        };

        if first_field.starts_with("ERROR") {
            log::error!(
                "Error in received transmission from {}; check its error log for details",
                line.instrument
            );
            if let Err(e) = self.append_error(&line.instrument, &line.text) {
                log::error!("Unable to append to error log for {}: {e}", line.instrument);
            }
            return;
        }

        let date = if self.config.is_known_instrument(&line.instrument) {
            match parse_timestamp(first_field) {
                Some(date) => date,
                None => {
                    // Expected background noise from flaky transmissions.
                    log::debug!(
                        "Unable to decode date from instrument timestamp: {first_field}"
                    );
                    return;
                }
            }
        } else {
            if self.warned_unknown.insert(line.instrument.clone()) {
                log::warn!(
                    "{} isn't a recognised instrument identifier, taking timestamp from system clock",
                    line.instrument
                );
            }
            OffsetDateTime::now_utc().date()
        };

        if let Err(e) = self.append_data(&line.instrument, date, &line.text) {
            log::error!("Unable to append to data log for {}: {e}", line.instrument);
        }
    }

    fn append_error(&self, instrument: &str, text: &str) -> Result<(), RouterError> {
        let path = self.config.error_log_path(instrument);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().append(true).create(true).open(path)?;
        writeln!(file, "{text}")?;
        Ok(())
    }

    /// Append one data row, creating the file with its header on first touch.
    /// The handle is closed as soon as the write completes.
    fn append_data(&self, instrument: &str, date: Date, text: &str) -> Result<(), RouterError> {
        let date_str = date.format(DATE_FORMAT)?;
        let path = self.config.data_log_path(instrument, &date_str);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let is_new = !path.exists();
        let mut file = OpenOptions::new().append(true).create(true).open(&path)?;
        if is_new {
            writeln!(file, "{DATA_HEADER}")?;
        }
        writeln!(file, "{text}")?;
        Ok(())
    }
}

/// Parse an integer Unix-seconds field into a UTC calendar date.
fn parse_timestamp(field: &str) -> Option<Date> {
    let seconds = field.parse::<i64>().ok()?;
    OffsetDateTime::from_unix_timestamp(seconds)
        .ok()
        .map(|dt| dt.date())
}
