use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serialport::{ClearBuffer, SerialPort};

use super::constants::{BAUD_RATE, READ_TIMEOUT, RECONNECT_DELAY};
use super::error::PortReaderError;
use super::line::{LineAssembler, TaggedLine};
use super::queue::Producer;

/// How often a reader waiting out the reconnect delay checks the stop flag.
const RECONNECT_POLL: Duration = Duration::from_millis(250);

/// PortReader owns one serial connection and continuously produces tagged lines.
///
/// One PortReader exists per instrument. It validates that the device is
/// actually enumerated before opening it, reads newline-terminated records, and
/// pushes each complete line onto the shared transit queue. A reader that fails
/// to construct takes down only itself; its siblings are unaffected.
pub struct PortReader {
    name: String,
    device: String,
    /// None between a mid-run failure and a successful reopen.
    port: Option<Box<dyn SerialPort>>,
    assembler: LineAssembler,
    queue: Producer<TaggedLine>,
}

impl PortReader {
    /// Open the serial device for an instrument.
    ///
    /// Fails with `PortNotFound` if the device is not in the enumerated port
    /// set. On success the port is opened at the fixed baud rate with a 1 s
    /// read timeout, and any stale input buffered by the OS is discarded.
    pub fn new(
        name: &str,
        device: &str,
        queue: Producer<TaggedLine>,
    ) -> Result<Self, PortReaderError> {
        log::info!("Initialising serial reader {name} on port {device}");
        Self::check_port_available(device)?;

        let port = serialport::new(device, BAUD_RATE)
            .timeout(READ_TIMEOUT)
            .open()?;
        port.clear(ClearBuffer::Input)?;

        Ok(PortReader {
            name: name.to_string(),
            device: device.to_string(),
            port: Some(port),
            assembler: LineAssembler::new(),
            queue,
        })
    }

    /// Check that the device path refers to a serial port exposed by the system.
    fn check_port_available(device: &str) -> Result<(), PortReaderError> {
        let ports = serialport::available_ports()?;
        if ports.iter().any(|p| p.port_name == device) {
            Ok(())
        } else {
            Err(PortReaderError::PortNotFound(device.to_string()))
        }
    }

    /// The reader loop. Runs until `stop` is raised.
    ///
    /// Timeouts produce nothing for that cycle. Lines that fail to decode as
    /// UTF-8 are dropped as line noise. Any harder serial failure hands off to
    /// the reconnect policy rather than killing the thread.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<(), PortReaderError> {
        while !stop.load(Ordering::Relaxed) {
            let read = match self.port.as_mut() {
                Some(port) => self.assembler.read_line(port),
                None => {
                    self.reopen(stop);
                    continue;
                }
            };
            match read {
                Ok(Some(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) if text.is_empty() => (), // blank keepalive line
                    Ok(text) => {
                        log::debug!("{} enqueueing data to shared queue", self.name);
                        if self
                            .queue
                            .push(TaggedLine::new(&self.name, &text))
                            .is_err()
                        {
                            return Err(PortReaderError::QueueClosed);
                        }
                    }
                    Err(_) => {
                        log::error!("{} caught some garbage; ignoring data line", self.name)
                    }
                },
                Ok(None) => (), // no complete line this cycle
                Err(e) => {
                    log::warn!(
                        "{} serial read failed ({e}); will retry opening {}",
                        self.name,
                        self.device
                    );
                    // The port is held in exclusive mode, so the stale handle
                    // must be closed before a reopen of the same node can
                    // succeed, and before a replugged adapter can reclaim it.
                    self.port = None;
                    self.assembler.clear();
                }
            }
        }
        log::info!("Reader {} stopping", self.name);
        Ok(())
    }

    /// Mid-run failure policy: retry-with-backoff.
    ///
    /// One reopen attempt per call, after waiting out the reconnect delay. The
    /// stale handle has already been released by the run loop. A silent
    /// permanent stall is not an acceptable failure mode for an unattended
    /// logger, so this keeps trying until the device returns or `stop` is raised.
    fn reopen(&mut self, stop: &AtomicBool) {
        let mut waited = Duration::ZERO;
        while waited < RECONNECT_DELAY {
            if stop.load(Ordering::Relaxed) {
                return;
            }
            std::thread::sleep(RECONNECT_POLL);
            waited += RECONNECT_POLL;
        }
        if stop.load(Ordering::Relaxed) {
            return;
        }
        match serialport::new(&self.device, BAUD_RATE)
            .timeout(READ_TIMEOUT)
            .open()
        {
            Ok(port) => {
                if let Err(e) = port.clear(ClearBuffer::Input) {
                    log::warn!("{} could not clear reopened port: {e}", self.name);
                }
                self.port = Some(port);
                self.assembler.clear();
                log::info!("{} reopened {}", self.name, self.device);
            }
            Err(e) => log::warn!("{} reopen of {} failed: {e}", self.name, self.device),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::transit_queue;
    use serialport::{DataBits, FlowControl, Parity, StopBits};
    use std::io::{Read, Write};
    use std::sync::Arc;
    use std::time::Instant;

    /// A port whose reads always fail hard, and which records when its handle
    /// is dropped (i.e. when its exclusive claim on the device is released).
    struct BrokenPort {
        released: Arc<AtomicBool>,
    }

    impl Drop for BrokenPort {
        fn drop(&mut self) {
            self.released.store(true, Ordering::Relaxed);
        }
    }

    impl Read for BrokenPort {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "device unplugged",
            ))
        }
    }

    impl Write for BrokenPort {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SerialPort for BrokenPort {
        fn name(&self) -> Option<String> {
            None
        }
        fn baud_rate(&self) -> serialport::Result<u32> {
            Ok(BAUD_RATE)
        }
        fn data_bits(&self) -> serialport::Result<DataBits> {
            Ok(DataBits::Eight)
        }
        fn flow_control(&self) -> serialport::Result<FlowControl> {
            Ok(FlowControl::None)
        }
        fn parity(&self) -> serialport::Result<Parity> {
            Ok(Parity::None)
        }
        fn stop_bits(&self) -> serialport::Result<StopBits> {
            Ok(StopBits::One)
        }
        fn timeout(&self) -> Duration {
            READ_TIMEOUT
        }
        fn set_baud_rate(&mut self, _baud_rate: u32) -> serialport::Result<()> {
            Ok(())
        }
        fn set_data_bits(&mut self, _data_bits: DataBits) -> serialport::Result<()> {
            Ok(())
        }
        fn set_flow_control(&mut self, _flow_control: FlowControl) -> serialport::Result<()> {
            Ok(())
        }
        fn set_parity(&mut self, _parity: Parity) -> serialport::Result<()> {
            Ok(())
        }
        fn set_stop_bits(&mut self, _stop_bits: StopBits) -> serialport::Result<()> {
            Ok(())
        }
        fn set_timeout(&mut self, _timeout: Duration) -> serialport::Result<()> {
            Ok(())
        }
        fn write_request_to_send(&mut self, _level: bool) -> serialport::Result<()> {
            Ok(())
        }
        fn write_data_terminal_ready(&mut self, _level: bool) -> serialport::Result<()> {
            Ok(())
        }
        fn read_clear_to_send(&mut self) -> serialport::Result<bool> {
            Ok(false)
        }
        fn read_data_set_ready(&mut self) -> serialport::Result<bool> {
            Ok(false)
        }
        fn read_ring_indicator(&mut self) -> serialport::Result<bool> {
            Ok(false)
        }
        fn read_carrier_detect(&mut self) -> serialport::Result<bool> {
            Ok(false)
        }
        fn bytes_to_read(&self) -> serialport::Result<u32> {
            Ok(0)
        }
        fn bytes_to_write(&self) -> serialport::Result<u32> {
            Ok(0)
        }
        fn clear(&self, _buffer_to_clear: ClearBuffer) -> serialport::Result<()> {
            Ok(())
        }
        fn try_clone(&self) -> serialport::Result<Box<dyn SerialPort>> {
            Err(serialport::Error::new(
                serialport::ErrorKind::Unknown,
                "not supported",
            ))
        }
        fn set_break(&self) -> serialport::Result<()> {
            Ok(())
        }
        fn clear_break(&self) -> serialport::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_port_released_before_reopen() {
        let released = Arc::new(AtomicBool::new(false));
        let (producer, _consumer) = transit_queue();
        let mut reader = PortReader {
            name: String::from("INSTR"),
            device: String::from("/dev/this-port-does-not-exist"),
            port: Some(Box::new(BrokenPort {
                released: released.clone(),
            })),
            assembler: LineAssembler::new(),
            queue: producer,
        };

        let stop = Arc::new(AtomicBool::new(false));
        let run_stop = stop.clone();
        let handle = std::thread::spawn(move || {
            reader.run(&run_stop).unwrap();
            reader
        });

        // The first read fails hard; the stale handle must be dropped before
        // any reopen attempt, or the exclusive claim would pin the device.
        let deadline = Instant::now() + Duration::from_secs(2);
        while !released.load(Ordering::Relaxed) {
            assert!(Instant::now() < deadline, "stale port handle never released");
            std::thread::sleep(Duration::from_millis(10));
        }

        stop.store(true, Ordering::Relaxed);
        let reader = handle.join().unwrap();
        assert!(reader.port.is_none());
    }
}
