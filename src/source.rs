//! Sample sources: where raw ADC readings come from.
//!
//! The wire protocol is newline-delimited decimal integers, one reading per
//! line. [`SampleSource`] is the seam between the acquisition thread and
//! the transport; [`LineSource`] parses the protocol over any `io::Read`
//! (serial port in production, in-memory buffers in tests).

use std::io::{BufRead, BufReader, Read};
use std::time::Duration;

use crate::config::EcgConfig;

/// Something that can yield one sample at a time.
pub trait SampleSource: Send {
    /// Next accepted sample.
    ///
    /// `Ok(Some(v))` is a parsed reading, `Ok(None)` means no data this
    /// poll (timeout, blank read) and the caller should try again,
    /// `Err` means the transport is gone.
    fn next_sample(&mut self) -> std::io::Result<Option<f64>>;
}

/// Line-oriented decimal parser over any reader.
///
/// A malformed line is dropped silently and does not produce a sample;
/// read timeouts surface as `Ok(None)` so the caller can poll its stop
/// flag between reads.
pub struct LineSource<R: Read> {
    reader: BufReader<R>,
    line: String,
}

impl<R: Read + Send> LineSource<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            line: String::new(),
        }
    }
}

impl<R: Read + Send> SampleSource for LineSource<R> {
    fn next_sample(&mut self) -> std::io::Result<Option<f64>> {
        self.line.clear();
        match self.reader.read_line(&mut self.line) {
            Ok(0) => Err(std::io::ErrorKind::UnexpectedEof.into()),
            Ok(_) => Ok(self.line.trim().parse::<i64>().ok().map(|v| v as f64)),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(None),
            // Partial line interrupted by the port timeout: drop it.
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Open the configured serial port as a sample source.
///
/// The read timeout keeps the acquisition loop responsive to the stop
/// flag even when the sensor goes quiet.
pub fn serial_source(cfg: &EcgConfig) -> serialport::Result<LineSource<Box<dyn serialport::SerialPort>>> {
    let port = serialport::new(cfg.port.as_str(), cfg.baud_rate)
        .timeout(Duration::from_millis(cfg.read_timeout_ms))
        .open()?;
    Ok(LineSource::new(port))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(src: &mut impl SampleSource) -> Vec<f64> {
        let mut out = Vec::new();
        loop {
            match src.next_sample() {
                Ok(Some(v)) => out.push(v),
                Ok(None) => continue,
                Err(_) => break,
            }
        }
        out
    }

    #[test]
    fn parses_decimal_lines() {
        let mut src = LineSource::new("512\n-3\n1024\n".as_bytes());
        assert_eq!(drain(&mut src), vec![512.0, -3.0, 1024.0]);
    }

    #[test]
    fn malformed_lines_are_dropped() {
        let mut src = LineSource::new("100\nnoise\n\n1.5\n200\n".as_bytes());
        assert_eq!(drain(&mut src), vec![100.0, 200.0]);
    }

    #[test]
    fn whitespace_is_tolerated() {
        let mut src = LineSource::new("  42 \r\n".as_bytes());
        assert_eq!(drain(&mut src), vec![42.0]);
    }
}
