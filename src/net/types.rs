//! SANE wire enumerations and frame parameters.

use std::fmt;

use bitflags::bitflags;

/// Status word returned by the daemon for every RPC.
///
/// Wire values outside the defined range are preserved in `Unknown` so they
/// can be surfaced with their integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Good,
    Unsupported,
    Cancelled,
    DeviceBusy,
    Invalid,
    Eof,
    Jammed,
    NoDocs,
    CoverOpen,
    IoError,
    NoMem,
    AccessDenied,
    Unknown(i32),
}

impl Status {
    pub fn from_wire(word: i32) -> Self {
        match word {
            0 => Status::Good,
            1 => Status::Unsupported,
            2 => Status::Cancelled,
            3 => Status::DeviceBusy,
            4 => Status::Invalid,
            5 => Status::Eof,
            6 => Status::Jammed,
            7 => Status::NoDocs,
            8 => Status::CoverOpen,
            9 => Status::IoError,
            10 => Status::NoMem,
            11 => Status::AccessDenied,
            other => Status::Unknown(other),
        }
    }

    pub fn to_wire(self) -> i32 {
        match self {
            Status::Good => 0,
            Status::Unsupported => 1,
            Status::Cancelled => 2,
            Status::DeviceBusy => 3,
            Status::Invalid => 4,
            Status::Eof => 5,
            Status::Jammed => 6,
            Status::NoDocs => 7,
            Status::CoverOpen => 8,
            Status::IoError => 9,
            Status::NoMem => 10,
            Status::AccessDenied => 11,
            Status::Unknown(other) => other,
        }
    }

    pub fn is_good(self) -> bool {
        self == Status::Good
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Good => write!(f, "GOOD"),
            Status::Unsupported => write!(f, "UNSUPPORTED"),
            Status::Cancelled => write!(f, "CANCELLED"),
            Status::DeviceBusy => write!(f, "DEVICE_BUSY"),
            Status::Invalid => write!(f, "INVAL"),
            Status::Eof => write!(f, "EOF"),
            Status::Jammed => write!(f, "JAMMED"),
            Status::NoDocs => write!(f, "NO_DOCS"),
            Status::CoverOpen => write!(f, "COVER_OPEN"),
            Status::IoError => write!(f, "IO_ERROR"),
            Status::NoMem => write!(f, "NO_MEM"),
            Status::AccessDenied => write!(f, "ACCESS_DENIED"),
            Status::Unknown(word) => write!(f, "UNKNOWN({word})"),
        }
    }
}

/// RPC opcodes on the control socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Opcode {
    Init = 0,
    GetDevices = 1,
    Open = 2,
    Close = 3,
    GetOptionDescriptors = 4,
    ControlOption = 5,
    GetParameters = 6,
    Start = 7,
    Cancel = 8,
    Authorize = 9,
    Exit = 10,
}

impl Opcode {
    pub fn to_wire(self) -> i32 {
        self as i32
    }

    pub fn from_wire(word: i32) -> Option<Self> {
        match word {
            0 => Some(Opcode::Init),
            1 => Some(Opcode::GetDevices),
            2 => Some(Opcode::Open),
            3 => Some(Opcode::Close),
            4 => Some(Opcode::GetOptionDescriptors),
            5 => Some(Opcode::ControlOption),
            6 => Some(Opcode::GetParameters),
            7 => Some(Opcode::Start),
            8 => Some(Opcode::Cancel),
            9 => Some(Opcode::Authorize),
            10 => Some(Opcode::Exit),
            _ => None,
        }
    }
}

/// Value kind of an option descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Int,
    Fixed,
    String,
    Button,
    Group,
}

impl ValueKind {
    pub fn from_wire(word: i32) -> Option<Self> {
        match word {
            0 => Some(ValueKind::Bool),
            1 => Some(ValueKind::Int),
            2 => Some(ValueKind::Fixed),
            3 => Some(ValueKind::String),
            4 => Some(ValueKind::Button),
            5 => Some(ValueKind::Group),
            _ => None,
        }
    }

    pub fn to_wire(self) -> i32 {
        match self {
            ValueKind::Bool => 0,
            ValueKind::Int => 1,
            ValueKind::Fixed => 2,
            ValueKind::String => 3,
            ValueKind::Button => 4,
            ValueKind::Group => 5,
        }
    }
}

/// Physical unit of an option value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    None,
    Pixel,
    Bit,
    Millimeter,
    Dpi,
    Percent,
    Microsecond,
}

impl Unit {
    pub fn from_wire(word: i32) -> Option<Self> {
        match word {
            0 => Some(Unit::None),
            1 => Some(Unit::Pixel),
            2 => Some(Unit::Bit),
            3 => Some(Unit::Millimeter),
            4 => Some(Unit::Dpi),
            5 => Some(Unit::Percent),
            6 => Some(Unit::Microsecond),
            _ => None,
        }
    }

    pub fn to_wire(self) -> i32 {
        match self {
            Unit::None => 0,
            Unit::Pixel => 1,
            Unit::Bit => 2,
            Unit::Millimeter => 3,
            Unit::Dpi => 4,
            Unit::Percent => 5,
            Unit::Microsecond => 6,
        }
    }
}

/// Constraint kind carried by an option descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    None,
    Range,
    WordList,
    StringList,
}

impl ConstraintKind {
    pub fn from_wire(word: i32) -> Option<Self> {
        match word {
            0 => Some(ConstraintKind::None),
            1 => Some(ConstraintKind::Range),
            2 => Some(ConstraintKind::WordList),
            3 => Some(ConstraintKind::StringList),
            _ => None,
        }
    }

    pub fn to_wire(self) -> i32 {
        match self {
            ConstraintKind::None => 0,
            ConstraintKind::Range => 1,
            ConstraintKind::WordList => 2,
            ConstraintKind::StringList => 3,
        }
    }
}

/// Channel layout of one frame of image data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FrameKind {
    Gray,
    Rgb,
    Red,
    Green,
    Blue,
}

impl FrameKind {
    pub fn from_wire(word: i32) -> Option<Self> {
        match word {
            0 => Some(FrameKind::Gray),
            1 => Some(FrameKind::Rgb),
            2 => Some(FrameKind::Red),
            3 => Some(FrameKind::Green),
            4 => Some(FrameKind::Blue),
            _ => None,
        }
    }

    pub fn to_wire(self) -> i32 {
        match self {
            FrameKind::Gray => 0,
            FrameKind::Rgb => 1,
            FrameKind::Red => 2,
            FrameKind::Green => 3,
            FrameKind::Blue => 4,
        }
    }

    /// A singleton frame carries the complete image on its own.
    pub fn is_singleton(self) -> bool {
        matches!(self, FrameKind::Gray | FrameKind::Rgb)
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameKind::Gray => write!(f, "GRAY"),
            FrameKind::Rgb => write!(f, "RGB"),
            FrameKind::Red => write!(f, "RED"),
            FrameKind::Green => write!(f, "GREEN"),
            FrameKind::Blue => write!(f, "BLUE"),
        }
    }
}

bitflags! {
    /// Capability bits of an option descriptor.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capability: u32 {
        const SOFT_SELECT = 1;
        const HARD_SELECT = 2;
        const SOFT_DETECT = 4;
        const EMULATED = 8;
        const AUTOMATIC = 16;
        const INACTIVE = 32;
        const ADVANCED = 64;
    }
}

bitflags! {
    /// Info bits returned by a successful option write.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SetInfo: u32 {
        const INEXACT = 1;
        const RELOAD_OPTIONS = 2;
        const RELOAD_PARAMETERS = 4;
    }
}

/// Parameters of the frame an acquisition is about to deliver.
///
/// `lines == -1` means the height is unknown until the data stream ends
/// (hand-held scanners); the frame reader fills it in afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameParameters {
    pub frame: FrameKind,
    pub last_frame: bool,
    pub bytes_per_line: i32,
    pub pixels_per_line: i32,
    pub lines: i32,
    pub depth: i32,
}

impl FrameParameters {
    /// Total image bytes this frame should deliver, or `None` while the
    /// line count is unknown.
    pub fn expected_image_bytes(&self) -> Option<usize> {
        if self.lines < 0 {
            None
        } else {
            Some(self.bytes_per_line as usize * self.lines as usize)
        }
    }
}
