/// Serial line to the Davis console: wake-up, LOOP request and bounded reads
use std::io::{self, Read, Write};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};

use crate::davis::{scan, RawFrame};
use crate::error::StationError;

pub const BAUD_RATE: u32 = 19_200;
pub const READ_TIMEOUT: Duration = Duration::from_secs(15);
pub const BUFFER_SIZE: usize = 255;
/// A read attempt returns once this many bytes arrived (about two LOOP packets)
pub const MIN_CHARS: usize = 200;
/// One LOOP packet plus the leading ACK
pub const LOOP_LENGTH: usize = 100;
pub const READ_ATTEMPTS: usize = 2;

const WAKEUP: &[u8] = b"\n";
const LOOP_REQUEST: &[u8] = b"LPS 0 30\r";
const CANCEL: &[u8] = b"\r";

#[derive(Debug, Clone)]
pub struct PollSettings {
    pub attempts: usize,
    /// Pause after each wake-up line feed
    pub wake_delay: Duration,
    pub read_timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            attempts: READ_ATTEMPTS,
            wake_delay: Duration::from_secs(1),
            read_timeout: READ_TIMEOUT,
        }
    }
}

/// Serial line whose per-read timeout can be changed between reads
pub trait ConsolePort: Read + Write {
    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()>;
}

impl ConsolePort for Box<dyn SerialPort> {
    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.set_timeout(timeout).map_err(io::Error::from)
    }
}

/// Open and configure the console's serial device
pub fn open_console(device: &str) -> Result<Box<dyn SerialPort>, StationError> {
    let open_error = |e: serialport::Error| StationError::SerialOpen {
        device: device.to_string(),
        source: e,
    };

    let port = serialport::new(device, BAUD_RATE)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::Hardware)
        .timeout(READ_TIMEOUT)
        .open()
        .map_err(open_error)?;

    port.clear(ClearBuffer::Input).map_err(open_error)?;
    Ok(port)
}

/// Wake the console with two line feeds, then ask it for a stream of LOOP packets
pub fn wake_console<P: Write>(port: &mut P, settings: &PollSettings, verbosity: u8) -> io::Result<()> {
    for _ in 0..2 {
        port.write_all(WAKEUP)?;
        port.flush()?;
        if verbosity > 0 {
            debug!("LF written");
        }
        thread::sleep(settings.wake_delay);
    }

    port.write_all(LOOP_REQUEST)?;
    port.flush()?;
    if verbosity > 0 {
        debug!("LPS 0 30 written");
    }
    Ok(())
}

/// Fill `buffer` until `min_chars` bytes arrived, the port times out or
/// `timeout` has elapsed. Each read may only wait for what is left of
/// `timeout`. Returns the number of valid bytes.
pub fn read_burst<P: ConsolePort>(
    port: &mut P,
    buffer: &mut [u8],
    min_chars: usize,
    timeout: Duration,
) -> io::Result<usize> {
    let wanted = min_chars.min(buffer.len());
    let deadline = Instant::now() + timeout;
    let mut count = 0;

    while count < wanted {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        port.set_read_timeout(remaining)?;

        match port.read(&mut buffer[count..]) {
            Ok(0) => break,
            Ok(n) => count += n,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(count)
}

/// Run the full exchange with the console and return the first LOOP packet
/// found. `None` means every attempt came back short or without a marker.
pub fn poll_console<P: ConsolePort>(
    port: &mut P,
    settings: &PollSettings,
    verbosity: u8,
) -> io::Result<Option<RawFrame>> {
    wake_console(port, settings, verbosity)?;
    let result = read_attempts(port, settings, verbosity);
    cancel_loops(port, verbosity);
    result
}

fn read_attempts<P: ConsolePort>(port: &mut P, settings: &PollSettings, verbosity: u8) -> io::Result<Option<RawFrame>> {
    for attempt in 1..=settings.attempts {
        let mut buffer = [0u8; BUFFER_SIZE];
        let count = read_burst(port, &mut buffer, MIN_CHARS, settings.read_timeout)?;
        if verbosity > 0 {
            debug!("Attempt {}: chars received = {}", attempt, count);
        }

        if count <= LOOP_LENGTH {
            debug!("Too few characters received or read timeout. Chars read: {}", count);
            continue;
        }

        match scan(&buffer[..count]) {
            Some(frame) => return Ok(Some(frame)),
            None => debug!("No LOOP packet in {} bytes", count),
        }
    }

    Ok(None)
}

/// Stop any remaining LOOP packets. Failure only costs a noisy line.
fn cancel_loops<P: Write>(port: &mut P, verbosity: u8) {
    match port.write_all(CANCEL).and_then(|_| port.flush()) {
        Ok(()) => {
            if verbosity > 0 {
                debug!("CR written");
            }
        }
        Err(e) => warn!("Could not cancel LOOP stream: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::davis::packet::LOOP_MARKER;
    use std::collections::VecDeque;

    /// In-memory port replaying scripted reads; an empty script times out
    struct ScriptedPort {
        reads: VecDeque<io::Result<Vec<u8>>>,
        written: Vec<u8>,
        timeouts: Vec<Duration>,
    }

    impl ScriptedPort {
        fn new(reads: Vec<io::Result<Vec<u8>>>) -> Self {
            Self {
                reads: reads.into(),
                written: Vec::new(),
                timeouts: Vec::new(),
            }
        }
    }

    impl ConsolePort for ScriptedPort {
        fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
            self.timeouts.push(timeout);
            Ok(())
        }
    }

    impl Read for ScriptedPort {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.reads.pop_front() {
                Some(Ok(mut chunk)) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    if n < chunk.len() {
                        self.reads.push_front(Ok(chunk.split_off(n)));
                    }
                    Ok(n)
                }
                Some(Err(e)) => Err(e),
                None => Err(io::Error::from(io::ErrorKind::TimedOut)),
            }
        }
    }

    impl Write for ScriptedPort {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn settings() -> PollSettings {
        PollSettings {
            wake_delay: Duration::ZERO,
            ..PollSettings::default()
        }
    }

    /// ACK followed by one 99 byte LOOP packet with a recognisable payload
    fn ack_and_packet() -> Vec<u8> {
        let mut bytes = vec![0x06];
        let mut packet = vec![0u8; 99];
        packet[..3].copy_from_slice(LOOP_MARKER);
        packet[7] = 0xE0;
        packet[8] = 0x74;
        bytes.extend(packet);
        bytes
    }

    #[test]
    fn packet_split_over_reads_is_found() {
        let bytes = ack_and_packet();
        let mut port = ScriptedPort::new(vec![
            Ok(bytes[..40].to_vec()),
            Ok(bytes[40..].to_vec()),
            Ok(vec![0u8; 20]),
        ]);

        let frame = poll_console(&mut port, &settings(), 0).unwrap().unwrap();
        assert_eq!(frame.word(7), Some(29920));
        assert_eq!(port.written, b"\n\nLPS 0 30\r\r");
    }

    #[test]
    fn short_reads_yield_nothing_but_still_cancel() {
        let mut port = ScriptedPort::new(vec![
            Ok(vec![0u8; 50]),
            Err(io::Error::from(io::ErrorKind::TimedOut)),
            Ok(vec![0u8; 100]),
        ]);

        assert!(poll_console(&mut port, &settings(), 1).unwrap().is_none());
        assert!(port.written.ends_with(b"\r\r"));
    }

    #[test]
    fn second_attempt_used_when_first_has_no_marker() {
        let mut port = ScriptedPort::new(vec![
            Ok(vec![0x55; 150]),
            Err(io::Error::from(io::ErrorKind::TimedOut)),
            Ok(ack_and_packet()),
            Ok(vec![0u8; 20]),
        ]);

        let frame = poll_console(&mut port, &settings(), 0).unwrap();
        assert!(frame.is_some());
    }

    #[test]
    fn burst_stops_at_min_chars() {
        let mut port = ScriptedPort::new(vec![Ok(vec![1u8; 150]), Ok(vec![2u8; 150])]);
        let mut buffer = [0u8; BUFFER_SIZE];
        let count = read_burst(&mut port, &mut buffer, MIN_CHARS, READ_TIMEOUT).unwrap();
        assert!(count >= MIN_CHARS);
        assert!(count <= BUFFER_SIZE);
    }

    #[test]
    fn reads_never_wait_past_the_attempt_deadline() {
        let mut port = ScriptedPort::new(vec![Ok(vec![1u8; 50]), Ok(vec![2u8; 50]), Ok(vec![3u8; 50])]);
        let mut buffer = [0u8; BUFFER_SIZE];
        let timeout = Duration::from_secs(2);

        read_burst(&mut port, &mut buffer, MIN_CHARS, timeout).unwrap();

        // three data reads plus the one that timed out
        assert_eq!(port.timeouts.len(), 4);
        assert!(port.timeouts.iter().all(|t| *t <= timeout && !t.is_zero()));
        assert!(port.timeouts.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn elapsed_deadline_skips_reading() {
        let mut port = ScriptedPort::new(vec![Ok(vec![1u8; 50])]);
        let mut buffer = [0u8; BUFFER_SIZE];

        let count = read_burst(&mut port, &mut buffer, MIN_CHARS, Duration::ZERO).unwrap();
        assert_eq!(count, 0);
        assert!(port.timeouts.is_empty());
        assert_eq!(port.reads.len(), 1);
    }

    #[test]
    fn hard_read_error_is_propagated() {
        let mut port = ScriptedPort::new(vec![Err(io::Error::from(io::ErrorKind::BrokenPipe))]);
        let err = poll_console(&mut port, &settings(), 0).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert!(port.written.ends_with(b"\r"));
    }
}
