use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::config::Config;
use super::error::PipelineError;
use super::queue::transit_queue;
use super::reader::PortReader;
use super::router::LogRouter;

/// The main loop of the ingestion pipeline.
///
/// Spawns one reader thread per configured instrument and a single router
/// thread consuming the shared queue, then blocks until everything has joined.
/// An instrument whose port cannot be opened is logged and skipped without
/// affecting its siblings; the run only fails outright if no instrument at all
/// could be opened. Raise `stop` to make every loop exit between iterations.
pub fn run(config: &Config, stop: Arc<AtomicBool>) -> Result<(), PipelineError> {
    let (producer, consumer) = transit_queue();

    let mut reader_handles: Vec<JoinHandle<()>> = Vec::new();
    for instrument in config.instruments.iter() {
        let mut reader =
            match PortReader::new(&instrument.name, &instrument.device, producer.clone()) {
                Ok(reader) => reader,
                Err(e) => {
                    log::error!(
                        "Unable to connect to {}: {e}; continuing without it",
                        instrument.name
                    );
                    continue;
                }
            };
        let reader_stop = stop.clone();
        let name = instrument.name.clone();
        let spawned = thread::Builder::new()
            .name(format!("reader-{name}"))
            .spawn(move || {
                if let Err(e) = reader.run(&reader_stop) {
                    log::error!("Reader {name} terminated: {e}");
                }
            });
        match spawned {
            Ok(handle) => reader_handles.push(handle),
            Err(e) => {
                // Already-running readers must not be left looping with no
                // consumer ever coming.
                halt_threads(&stop, reader_handles);
                return Err(PipelineError::IOError(e));
            }
        }
    }
    // The router must see the channel disconnect once the readers are done.
    drop(producer);

    if reader_handles.is_empty() {
        return Err(PipelineError::NoActiveReaders);
    }

    let mut router = LogRouter::new(config, consumer);
    let router_stop = stop.clone();
    let spawned = thread::Builder::new()
        .name(String::from("log-router"))
        .spawn(move || router.run(&router_stop));
    let router_handle = match spawned {
        Ok(handle) => handle,
        Err(e) => {
            halt_threads(&stop, reader_handles);
            return Err(PipelineError::IOError(e));
        }
    };

    for handle in reader_handles {
        if handle.join().is_err() {
            log::error!("A reader thread panicked");
        }
    }
    if router_handle.join().is_err() {
        log::error!("The router thread panicked");
    }
    Ok(())
}

/// Raise the stop flag and wait for the given threads to wind down.
fn halt_threads(stop: &AtomicBool, handles: Vec<JoinHandle<()>>) {
    stop.store(true, Ordering::Relaxed);
    for handle in handles {
        if handle.join().is_err() {
            log::error!("A pipeline thread panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InstrumentConfig;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn test_no_openable_instruments_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            log_path: PathBuf::from(dir.path()),
            instruments: vec![InstrumentConfig {
                name: String::from("GHOST"),
                device: String::from("/dev/this-port-does-not-exist"),
            }],
        };
        let stop = Arc::new(AtomicBool::new(false));
        match run(&config, stop) {
            Err(PipelineError::NoActiveReaders) => (),
            other => panic!("expected no active readers, got {other:?}"),
        }
    }

    #[test]
    fn test_halt_threads_stops_and_joins() {
        let stop = Arc::new(AtomicBool::new(false));
        let mut handles = Vec::new();
        for _ in 0..3 {
            let thread_stop = stop.clone();
            handles.push(
                thread::Builder::new()
                    .spawn(move || {
                        while !thread_stop.load(Ordering::Relaxed) {
                            thread::sleep(Duration::from_millis(10));
                        }
                    })
                    .unwrap(),
            );
        }

        halt_threads(&stop, handles);
        assert!(stop.load(Ordering::Relaxed));
    }
}
