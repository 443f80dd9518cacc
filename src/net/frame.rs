//! Record-framed reader for the acquisition data socket.
//!
//! The daemon delivers frame bytes as a sequence of length-prefixed records
//! and terminates the stream with an all-ones length word.

use std::io::{ErrorKind, Read};

use tracing::{debug, warn};

use crate::error::{Result, SaneError};
use crate::listener::ScanListener;
use crate::net::image::Frame;
use crate::net::types::{FrameParameters, Status};
use crate::net::wire::WireReader;

/// Byte-order word sent by START for big-endian frame data.
pub const BIG_ENDIAN_WIRE: i32 = 0x4321;

/// End-of-records sentinel on the data socket.
const END_OF_RECORDS: u32 = 0xFFFF_FFFF;

/// Reads one frame from a data socket.
pub(crate) struct FrameReader<'a> {
    parameters: FrameParameters,
    big_endian: bool,
    device: &'a str,
    listener: &'a mut dyn ScanListener,
}

impl<'a> FrameReader<'a> {
    pub fn new(
        parameters: FrameParameters,
        big_endian: bool,
        device: &'a str,
        listener: &'a mut dyn ScanListener,
    ) -> Self {
        Self {
            parameters,
            big_endian,
            device,
            listener,
        }
    }

    /// Drain the record stream and return the finished frame.
    pub fn read<R: Read>(mut self, stream: R) -> Result<Frame> {
        let mut reader = WireReader::new(stream);
        let expected = self.parameters.expected_image_bytes();
        let mut buffer = Vec::with_capacity(expected.unwrap_or(0));

        loop {
            let length = self.read_record(&mut reader, &mut buffer)?;
            if length.is_none() {
                break;
            }
            self.listener.record_read(self.device, buffer.len(), expected);
        }

        self.check_stray_status_byte(reader.get_mut())?;

        if let Some(expected) = expected {
            if buffer.len() < expected {
                warn!(
                    received = buffer.len(),
                    expected, "frame shorter than advertised, padding with zeros"
                );
                buffer.resize(expected, 0);
            }
        }

        if self.parameters.depth == 16 && !self.big_endian {
            if buffer.len() % 2 != 0 {
                return Err(SaneError::protocol(format!(
                    "cannot byte-swap 16-bit frame of {} bytes",
                    buffer.len()
                )));
            }
            for pair in buffer.chunks_exact_mut(2) {
                pair.swap(0, 1);
            }
        }

        let mut parameters = self.parameters;
        if parameters.lines <= 0 {
            if parameters.bytes_per_line <= 0 {
                return Err(SaneError::protocol(format!(
                    "cannot infer line count from {} bytes per line",
                    parameters.bytes_per_line
                )));
            }
            parameters.lines = (buffer.len() / parameters.bytes_per_line as usize) as i32;
            debug!(lines = parameters.lines, "inferred frame height from received bytes");
        }

        Ok(Frame {
            parameters,
            bytes: buffer,
        })
    }

    /// Read one record into `buffer`; `None` on the end-of-records sentinel.
    fn read_record<R: Read>(&mut self, reader: &mut WireReader<R>, buffer: &mut Vec<u8>) -> Result<Option<usize>> {
        let length = reader.read_word()?.as_i32() as u32;
        if length == END_OF_RECORDS {
            return Ok(None);
        }
        if length > i32::MAX as u32 {
            return Err(SaneError::protocol(format!("record length {length:#x} unsupported")));
        }

        let payload = reader.read_bytes(length as usize)?;
        buffer.extend_from_slice(&payload);
        Ok(Some(length as usize))
    }

    /// Some backends emit one status byte after the sentinel. EOF is
    /// discarded; anything else fails the frame; a closed or quiet socket
    /// counts as absent.
    fn check_stray_status_byte<R: Read>(&mut self, stream: &mut R) -> Result<()> {
        let mut byte = [0u8; 1];
        match stream.read(&mut byte) {
            Ok(0) => Ok(()),
            Ok(_) => {
                let status = Status::from_wire(i32::from(byte[0]));
                if status == Status::Eof {
                    debug!("discarding stray EOF status byte after end of records");
                    Ok(())
                } else {
                    Err(SaneError::from_status("frame read", status))
                }
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::UnexpectedEof) => {
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
