//! An open device: typed option negotiation and image acquisition.

use std::collections::HashMap;
use std::net::{Shutdown, SocketAddr, TcpStream};

use tracing::{debug, info, warn};

use crate::error::{Result, SaneError};
use crate::listener::ScanListener;
use crate::net::frame::{FrameReader, BIG_ENDIAN_WIRE};
use crate::net::image::{Frame, ImageAssembler, SaneImage};
use crate::net::option::{read_option_descriptor, OptionDescriptor, OptionGroup};
use crate::net::session::SaneSession;
use crate::net::types::{FrameParameters, Opcode, SetInfo, ValueKind};
use crate::net::wire::{latin1_to_string, string_to_latin1, Word, WireWriter};

/// CONTROL_OPTION action words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControlAction {
    Get = 0,
    Set = 1,
    SetAuto = 2,
}

/// Value container of a CONTROL_OPTION exchange.
#[derive(Debug, Clone, PartialEq)]
enum OptionValue {
    /// Word array: booleans, integers, fixed-precision numbers.
    Words(Vec<Word>),
    /// String payload, NUL terminator and padding included.
    Bytes(Vec<u8>),
    /// No value (buttons, null reply pointer).
    Absent,
}

struct ControlReply {
    info: SetInfo,
    value: OptionValue,
}

/// A device held open within a session.
///
/// Borrows the session mutably for its lifetime, so at most one device is
/// open per session. The option descriptor list is cached here and
/// invalidated when a write reports `RELOAD_OPTIONS`.
#[derive(Debug)]
pub struct OpenDevice<'s> {
    session: &'s mut SaneSession,
    name: String,
    handle: Word,
    descriptors: Option<Vec<OptionDescriptor>>,
    by_name: HashMap<String, usize>,
    groups: Vec<OptionGroup>,
    closed: bool,
}

impl<'s> OpenDevice<'s> {
    pub(crate) fn new(session: &'s mut SaneSession, name: String, handle: Word) -> Self {
        Self {
            session,
            name,
            handle,
            descriptors: None,
            by_name: HashMap::new(),
            groups: Vec::new(),
            closed: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> i32 {
        self.handle.as_i32()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(SaneError::precondition(format!("device {} is closed", self.name)));
        }
        Ok(())
    }

    /// Close the device handle. A second call is a precondition error.
    pub fn close(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.closed = true;
        self.session.handle_rpc(Opcode::Close, self.handle, "CLOSE")?;
        info!(device = %self.name, "device closed");
        Ok(())
    }

    /// Abort a scan in progress. Between scans this is a no-op for the
    /// caller.
    pub fn cancel(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.session.handle_rpc(Opcode::Cancel, self.handle, "CANCEL")
    }

    /// The device's visible options, fetching the descriptor table if the
    /// cache is empty or was invalidated.
    pub fn list_options(&mut self) -> Result<&[OptionDescriptor]> {
        self.ensure_open()?;
        self.ensure_options()?;
        match &self.descriptors {
            Some(descriptors) => Ok(descriptors),
            None => Err(SaneError::protocol("descriptor cache empty after fetch")),
        }
    }

    /// Option groups in daemon order, with their member option names.
    pub fn option_groups(&mut self) -> Result<&[OptionGroup]> {
        self.ensure_open()?;
        self.ensure_options()?;
        Ok(&self.groups)
    }

    /// Typed accessor for one option.
    pub fn option<'d>(&'d mut self, name: &str) -> Result<DeviceOption<'d, 's>> {
        self.ensure_open()?;
        self.ensure_options()?;
        if !self.by_name.contains_key(name) {
            return Err(SaneError::precondition(format!(
                "device {} has no option named {name}",
                self.name
            )));
        }
        Ok(DeviceOption {
            device: self,
            name: name.to_string(),
        })
    }

    /// Current option count, read from the pseudo option at index 0.
    pub fn option_count(&mut self) -> Result<i32> {
        self.ensure_open()?;
        self.ensure_options()?;
        let descriptor = self
            .descriptor_at(0)
            .ok_or_else(|| SaneError::protocol("no option descriptor at index 0"))?
            .clone();
        if descriptor.value_kind != ValueKind::Int {
            return Err(SaneError::protocol(format!(
                "option count descriptor has kind {:?}",
                descriptor.value_kind
            )));
        }
        let reply = self.control(&descriptor, ControlAction::Get, RequestValue::zeroed(&descriptor))?;
        Ok(expect_words(reply.value, 1)?[0].as_i32())
    }

    fn descriptor_at(&self, index: i32) -> Option<&OptionDescriptor> {
        self.descriptors.as_ref()?.iter().find(|d| d.index == index)
    }

    fn descriptor_by_name(&self, name: &str) -> Result<OptionDescriptor> {
        let position = self
            .by_name
            .get(name)
            .copied()
            .ok_or_else(|| SaneError::precondition(format!("option {name} disappeared after reload")))?;
        match self.descriptors.as_ref().and_then(|d| d.get(position)) {
            Some(descriptor) => Ok(descriptor.clone()),
            None => Err(SaneError::protocol("descriptor cache empty")),
        }
    }

    fn ensure_options(&mut self) -> Result<()> {
        if self.descriptors.is_none() {
            self.fetch_options()?;
        }
        Ok(())
    }

    /// GET_OPTION_DESCRIPTORS: rebuild the descriptor cache and groups.
    fn fetch_options(&mut self) -> Result<()> {
        let mut request = WireWriter::buffered();
        request.write_i32(Opcode::GetOptionDescriptors.to_wire())?;
        request.write_word(self.handle)?;
        self.session.send(request.into_bytes())?;

        let mut descriptors = Vec::new();
        let mut groups: Vec<OptionGroup> = Vec::new();
        {
            let mut reply = self.session.reader();
            let length = reply.read_i32()?;
            if length < 1 {
                return Err(SaneError::protocol(format!("option descriptor count {length}")));
            }

            for index in 0..length - 1 {
                let mut descriptor = read_option_descriptor(&mut reply, index)?;

                if descriptor.value_kind == ValueKind::Group {
                    groups.push(OptionGroup {
                        title: descriptor.title,
                        members: Vec::new(),
                    });
                    continue;
                }
                // Certain backends emit nameless placeholder options.
                if index > 0 && descriptor.name.is_empty() {
                    debug!(index, "skipping nameless option descriptor");
                    continue;
                }
                if !descriptor.is_visible() {
                    debug!(option = %descriptor.name, "skipping option with unusable capabilities");
                    continue;
                }
                if let Some(group) = groups.last_mut() {
                    descriptor.group = Some(group.title.clone());
                    group.members.push(descriptor.name.clone());
                }
                descriptors.push(descriptor);
            }
        }

        debug!(
            device = %self.name,
            options = descriptors.len(),
            groups = groups.len(),
            "option descriptors fetched"
        );

        self.by_name = descriptors
            .iter()
            .enumerate()
            .filter(|(_, d)| !d.name.is_empty())
            .map(|(position, d)| (d.name.clone(), position))
            .collect();
        self.descriptors = Some(descriptors);
        self.groups = groups;
        Ok(())
    }

    /// One CONTROL_OPTION exchange, including the authorization dance and
    /// reload-info handling.
    fn control(&mut self, descriptor: &OptionDescriptor, action: ControlAction, value: RequestValue) -> Result<ControlReply> {
        let mut request = WireWriter::buffered();
        request.write_i32(Opcode::ControlOption.to_wire())?;
        request.write_word(self.handle)?;
        request.write_i32(descriptor.index)?;
        request.write_i32(action as i32)?;
        request.write_i32(descriptor.value_kind.to_wire())?;
        value.write(&mut request)?;
        self.session.send(request.into_bytes())?;

        let reply = loop {
            let (status, info, value_size, value, resource) = {
                let mut reply = self.session.reader();
                let status = reply.read_status()?;
                let info = SetInfo::from_bits_truncate(reply.read_i32()? as u32);
                let kind_word = reply.read_i32()?;
                let value_size = reply.read_i32()?;
                let value = if reply.read_pointer()? {
                    match ValueKind::from_wire(kind_word) {
                        Some(ValueKind::String) => {
                            let length = reply.read_i32()?;
                            if length < 0 {
                                return Err(SaneError::protocol(format!("string value length {length}")));
                            }
                            OptionValue::Bytes(reply.read_bytes(length as usize)?)
                        }
                        Some(ValueKind::Button) | Some(ValueKind::Group) => OptionValue::Absent,
                        Some(_) => {
                            let count = reply.read_i32()?;
                            if count < 0 {
                                return Err(SaneError::protocol(format!("value element count {count}")));
                            }
                            let mut words = Vec::with_capacity(count as usize);
                            for _ in 0..count {
                                words.push(reply.read_word()?);
                            }
                            OptionValue::Words(words)
                        }
                        None => {
                            return Err(SaneError::protocol(format!("unknown value kind {kind_word} in reply")))
                        }
                    }
                } else {
                    OptionValue::Absent
                };
                let resource = reply.read_string()?;
                (status, info, value_size, value, resource)
            };

            if !resource.is_empty() {
                // The daemon paused mid-reply; after AUTHORIZE the reply is
                // re-sent from its beginning.
                self.session.authorize(&resource)?;
                continue;
            }
            if !status.is_good() {
                return Err(SaneError::from_status("CONTROL_OPTION", status));
            }
            debug!(
                option = %descriptor.name,
                ?action,
                info = info.bits(),
                value_size,
                "CONTROL_OPTION complete"
            );
            break ControlReply { info, value };
        };

        if action != ControlAction::Get && reply.info.contains(SetInfo::RELOAD_OPTIONS) {
            debug!(option = %descriptor.name, "write invalidated the option descriptors");
            self.descriptors = None;
            self.by_name.clear();
            self.groups.clear();
            if reply.info.contains(SetInfo::RELOAD_PARAMETERS) {
                self.fetch_options()?;
            }
        }

        Ok(reply)
    }

    /// Acquire one image, assembling however many frames the device sends.
    ///
    /// The per-frame data socket is released on every path, success or not.
    pub fn acquire_image(&mut self, listener: &mut dyn ScanListener) -> Result<SaneImage> {
        self.ensure_open()?;
        info!(device = %self.name, "acquisition starting");
        listener.scanning_started(&self.name);

        let mut assembler = ImageAssembler::new();
        let mut frame_index = 0usize;
        let mut likely_total = 0usize;

        loop {
            let (port, byte_order) = self.start_frame()?;
            let big_endian = byte_order == BIG_ENDIAN_WIRE;

            let data_socket = self.connect_data_socket(port)?;
            let outcome = self.read_one_frame(&data_socket, big_endian, frame_index, &mut likely_total, listener);
            let _ = data_socket.shutdown(Shutdown::Both);
            drop(data_socket);

            let frame = outcome?;
            let last = frame.parameters.last_frame;
            assembler.add_frame(frame)?;
            frame_index += 1;
            if last {
                break;
            }
        }

        let image = assembler.build()?;
        info!(
            device = %self.name,
            width = image.width(),
            height = image.height(),
            frames = image.frames().len(),
            "acquisition finished"
        );
        listener.scanning_finished(&self.name);
        Ok(image)
    }

    /// START: returns the data port and the byte-order word.
    fn start_frame(&mut self) -> Result<(u16, i32)> {
        let mut request = WireWriter::buffered();
        request.write_i32(Opcode::Start.to_wire())?;
        request.write_word(self.handle)?;
        self.session.send(request.into_bytes())?;

        loop {
            let (status, port, byte_order, resource) = {
                let mut reply = self.session.reader();
                (
                    reply.read_status()?,
                    reply.read_i32()?,
                    reply.read_i32()?,
                    reply.read_string()?,
                )
            };
            if !resource.is_empty() {
                self.session.authorize(&resource)?;
                continue;
            }
            if !status.is_good() {
                return Err(SaneError::from_status("START", status));
            }
            if !(1..=i32::from(u16::MAX)).contains(&port) {
                return Err(SaneError::protocol(format!("data port {port} out of range")));
            }
            return Ok((port as u16, byte_order));
        }
    }

    fn connect_data_socket(&self, port: u16) -> Result<TcpStream> {
        let address = SocketAddr::new(self.session.peer_ip(), port);
        let timeout = self.session.timeout();
        debug!(%address, "opening data socket");

        let stream = if timeout.is_zero() {
            TcpStream::connect(address)
        } else {
            TcpStream::connect_timeout(&address, timeout)
        }
        .map_err(|e| SaneError::ConnectionFailed(format!("data socket {address}: {e}")))?;
        stream.set_read_timeout((!timeout.is_zero()).then_some(timeout))?;
        Ok(stream)
    }

    fn read_one_frame(
        &mut self,
        data_socket: &TcpStream,
        big_endian: bool,
        frame_index: usize,
        likely_total: &mut usize,
        listener: &mut dyn ScanListener,
    ) -> Result<Frame> {
        let parameters = self.get_parameters()?;
        if *likely_total == 0 {
            *likely_total = if parameters.frame.is_singleton() { 1 } else { 3 };
        }
        listener.frame_acquisition_started(&self.name, &parameters, frame_index, *likely_total);

        FrameReader::new(parameters, big_endian, &self.name, listener).read(data_socket)
    }

    /// GET_PARAMETERS for the frame now in progress.
    fn get_parameters(&mut self) -> Result<FrameParameters> {
        let mut request = WireWriter::buffered();
        request.write_i32(Opcode::GetParameters.to_wire())?;
        request.write_word(self.handle)?;
        self.session.send(request.into_bytes())?;

        let mut reply = self.session.reader();
        let status = reply.read_status()?;
        if !status.is_good() {
            return Err(SaneError::from_status("GET_PARAMETERS", status));
        }
        let parameters = reply.read_parameters()?;
        debug!(?parameters, "frame parameters");
        Ok(parameters)
    }
}

impl Drop for OpenDevice<'_> {
    fn drop(&mut self) {
        if !self.closed {
            self.closed = true;
            if let Err(e) = self.session.handle_rpc(Opcode::Close, self.handle, "CLOSE") {
                warn!(device = %self.name, "close on drop failed: {e}");
            }
        }
    }
}

/// Request-side value container.
enum RequestValue {
    /// Word array; `element_count` is the array length.
    Words(Vec<Word>),
    /// String in SANE string format; `size` is the transmitted byte count.
    StringBytes { size: i32, bytes: Vec<u8> },
    /// Buttons and SET_AUTO: size zero, no elements.
    Empty,
}

impl RequestValue {
    /// Zero-filled placeholder of the descriptor's size, for GET.
    fn zeroed(descriptor: &OptionDescriptor) -> Self {
        match descriptor.value_kind {
            ValueKind::Int | ValueKind::Fixed | ValueKind::Bool => {
                RequestValue::Words(vec![Word::new(0); descriptor.element_count() as usize])
            }
            ValueKind::String => RequestValue::StringBytes {
                size: descriptor.size,
                bytes: vec![0; descriptor.size.max(0) as usize],
            },
            ValueKind::Button | ValueKind::Group => RequestValue::Empty,
        }
    }

    /// Write `size`, `element_count`, and the payload.
    fn write(&self, w: &mut WireWriter<Vec<u8>>) -> Result<()> {
        match self {
            RequestValue::Words(words) => {
                w.write_i32(words.len() as i32 * Word::SIZE as i32)?;
                w.write_i32(words.len() as i32)?;
                for word in words {
                    w.write_word(*word)?;
                }
            }
            RequestValue::StringBytes { size, bytes } => {
                w.write_i32(*size)?;
                w.write_i32(1)?;
                w.write_i32(bytes.len() as i32)?;
                w.write_bytes(bytes)?;
            }
            RequestValue::Empty => {
                w.write_i32(0)?;
                w.write_i32(0)?;
            }
        }
        Ok(())
    }
}

fn expect_words(value: OptionValue, expected: usize) -> Result<Vec<Word>> {
    match value {
        OptionValue::Words(words) if words.len() == expected => Ok(words),
        OptionValue::Words(words) => Err(SaneError::protocol(format!(
            "expected {expected} value element(s), daemon sent {}",
            words.len()
        ))),
        other => Err(SaneError::protocol(format!(
            "expected a word value, daemon sent {other:?}"
        ))),
    }
}

fn expect_string(value: OptionValue) -> Result<String> {
    match value {
        OptionValue::Bytes(bytes) => {
            let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
            Ok(latin1_to_string(&bytes[..end]))
        }
        other => Err(SaneError::protocol(format!(
            "expected a string value, daemon sent {other:?}"
        ))),
    }
}

/// Typed read/write access to a single option.
///
/// Produced by [`OpenDevice::option`]; every accessor checks the option's
/// kind and capabilities against the current descriptor before any bytes
/// reach the daemon.
#[derive(Debug)]
pub struct DeviceOption<'d, 's> {
    device: &'d mut OpenDevice<'s>,
    name: String,
}

impl DeviceOption<'_, '_> {
    /// Snapshot of the option's current descriptor.
    pub fn descriptor(&mut self) -> Result<OptionDescriptor> {
        self.device.ensure_options()?;
        self.device.descriptor_by_name(&self.name)
    }

    fn readable_descriptor(&mut self, kind: ValueKind, singleton: bool) -> Result<OptionDescriptor> {
        let descriptor = self.descriptor()?;
        if descriptor.value_kind != kind {
            return Err(SaneError::precondition(format!(
                "option {} is {:?}, not {kind:?}",
                self.name, descriptor.value_kind
            )));
        }
        if singleton && descriptor.element_count() != 1 {
            return Err(SaneError::precondition(format!(
                "option {} holds {} elements, expected a single value",
                self.name,
                descriptor.element_count()
            )));
        }
        if !descriptor.is_readable() {
            return Err(SaneError::precondition(format!("option {} is not readable", self.name)));
        }
        if !descriptor.is_active() {
            return Err(SaneError::precondition(format!("option {} is inactive", self.name)));
        }
        Ok(descriptor)
    }

    fn writable_descriptor(&mut self, kind: ValueKind, singleton: bool) -> Result<OptionDescriptor> {
        let descriptor = self.descriptor()?;
        if descriptor.value_kind != kind {
            return Err(SaneError::precondition(format!(
                "option {} is {:?}, not {kind:?}",
                self.name, descriptor.value_kind
            )));
        }
        if singleton && descriptor.element_count() != 1 {
            return Err(SaneError::precondition(format!(
                "option {} holds {} elements, expected a single value",
                self.name,
                descriptor.element_count()
            )));
        }
        if !descriptor.is_writable() {
            return Err(SaneError::precondition(format!("option {} is not writable", self.name)));
        }
        if !descriptor.is_active() {
            return Err(SaneError::precondition(format!("option {} is inactive", self.name)));
        }
        Ok(descriptor)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        let descriptor = self.readable_descriptor(ValueKind::Bool, true)?;
        let reply = self
            .device
            .control(&descriptor, ControlAction::Get, RequestValue::zeroed(&descriptor))?;
        Ok(expect_words(reply.value, 1)?[0].as_i32() != 0)
    }

    pub fn read_int(&mut self) -> Result<i32> {
        let descriptor = self.readable_descriptor(ValueKind::Int, true)?;
        let reply = self
            .device
            .control(&descriptor, ControlAction::Get, RequestValue::zeroed(&descriptor))?;
        Ok(expect_words(reply.value, 1)?[0].as_i32())
    }

    pub fn read_int_array(&mut self) -> Result<Vec<i32>> {
        let descriptor = self.readable_descriptor(ValueKind::Int, false)?;
        let count = descriptor.element_count() as usize;
        let reply = self
            .device
            .control(&descriptor, ControlAction::Get, RequestValue::zeroed(&descriptor))?;
        Ok(expect_words(reply.value, count)?.iter().map(|w| w.as_i32()).collect())
    }

    pub fn read_fixed(&mut self) -> Result<f64> {
        let descriptor = self.readable_descriptor(ValueKind::Fixed, true)?;
        let reply = self
            .device
            .control(&descriptor, ControlAction::Get, RequestValue::zeroed(&descriptor))?;
        Ok(expect_words(reply.value, 1)?[0].to_fixed())
    }

    pub fn read_fixed_array(&mut self) -> Result<Vec<f64>> {
        let descriptor = self.readable_descriptor(ValueKind::Fixed, false)?;
        let count = descriptor.element_count() as usize;
        let reply = self
            .device
            .control(&descriptor, ControlAction::Get, RequestValue::zeroed(&descriptor))?;
        Ok(expect_words(reply.value, count)?.iter().map(|w| w.to_fixed()).collect())
    }

    pub fn read_string(&mut self) -> Result<String> {
        let descriptor = self.readable_descriptor(ValueKind::String, false)?;
        let reply = self
            .device
            .control(&descriptor, ControlAction::Get, RequestValue::zeroed(&descriptor))?;
        expect_string(reply.value)
    }

    pub fn write_bool(&mut self, value: bool) -> Result<bool> {
        let descriptor = self.writable_descriptor(ValueKind::Bool, true)?;
        let words = RequestValue::Words(vec![Word::new(i32::from(value))]);
        let reply = self.device.control(&descriptor, ControlAction::Set, words)?;
        Ok(expect_words(reply.value, 1)?[0].as_i32() != 0)
    }

    pub fn write_int(&mut self, value: i32) -> Result<i32> {
        let descriptor = self.writable_descriptor(ValueKind::Int, true)?;
        let words = RequestValue::Words(vec![Word::new(value)]);
        let reply = self.device.control(&descriptor, ControlAction::Set, words)?;
        Ok(expect_words(reply.value, 1)?[0].as_i32())
    }

    pub fn write_int_array(&mut self, values: &[i32]) -> Result<Vec<i32>> {
        let descriptor = self.writable_descriptor(ValueKind::Int, false)?;
        if values.len() != descriptor.element_count() as usize {
            return Err(SaneError::precondition(format!(
                "option {} holds {} elements, got {}",
                self.name,
                descriptor.element_count(),
                values.len()
            )));
        }
        let words = RequestValue::Words(values.iter().map(|&v| Word::new(v)).collect());
        let reply = self.device.control(&descriptor, ControlAction::Set, words)?;
        Ok(expect_words(reply.value, values.len())?
            .iter()
            .map(|w| w.as_i32())
            .collect())
    }

    pub fn write_fixed(&mut self, value: f64) -> Result<f64> {
        let descriptor = self.writable_descriptor(ValueKind::Fixed, true)?;
        let words = RequestValue::Words(vec![Word::from_fixed(value)?]);
        let reply = self.device.control(&descriptor, ControlAction::Set, words)?;
        Ok(expect_words(reply.value, 1)?[0].to_fixed())
    }

    pub fn write_fixed_array(&mut self, values: &[f64]) -> Result<Vec<f64>> {
        let descriptor = self.writable_descriptor(ValueKind::Fixed, false)?;
        if values.len() != descriptor.element_count() as usize {
            return Err(SaneError::precondition(format!(
                "option {} holds {} elements, got {}",
                self.name,
                descriptor.element_count(),
                values.len()
            )));
        }
        let mut words = Vec::with_capacity(values.len());
        for &value in values {
            words.push(Word::from_fixed(value)?);
        }
        let reply = self
            .device
            .control(&descriptor, ControlAction::Set, RequestValue::Words(words))?;
        Ok(expect_words(reply.value, values.len())?
            .iter()
            .map(|w| w.to_fixed())
            .collect())
    }

    /// Write a string value; the NUL terminator occupies the final byte of
    /// the option's size.
    pub fn write_string(&mut self, value: &str) -> Result<String> {
        let descriptor = self.writable_descriptor(ValueKind::String, false)?;
        let bytes = string_to_latin1(value);
        if bytes.len() as i32 >= descriptor.size {
            return Err(SaneError::precondition(format!(
                "value of {} bytes does not fit option {} of size {}",
                bytes.len(),
                self.name,
                descriptor.size
            )));
        }

        let mut payload = bytes;
        payload.push(0);
        let size = payload.len() as i32;
        let reply = self
            .device
            .control(&descriptor, ControlAction::Set, RequestValue::StringBytes { size, bytes: payload })?;

        let returned = expect_string(reply.value)?;
        if !reply.info.contains(SetInfo::INEXACT) && returned != value {
            return Err(SaneError::protocol(format!(
                "daemon altered option {} to {returned:?} without reporting an inexact write",
                self.name
            )));
        }
        Ok(returned)
    }

    /// Trigger a button option.
    pub fn press_button(&mut self) -> Result<()> {
        let descriptor = self.writable_descriptor(ValueKind::Button, false)?;
        self.device.control(&descriptor, ControlAction::Set, RequestValue::Empty)?;
        Ok(())
    }

    /// Ask the backend to choose the value automatically.
    pub fn set_auto(&mut self) -> Result<()> {
        let descriptor = self.descriptor()?;
        if !descriptor.is_writable() {
            return Err(SaneError::precondition(format!("option {} is not writable", self.name)));
        }
        self.device
            .control(&descriptor, ControlAction::SetAuto, RequestValue::Empty)?;
        Ok(())
    }
}
