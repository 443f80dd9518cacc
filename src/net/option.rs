//! Option descriptors, constraints, and their wire format.

use std::io::Read;

use tracing::warn;

use crate::error::{Result, SaneError};
use crate::net::types::{Capability, ConstraintKind, Unit, ValueKind};
use crate::net::wire::{Word, WireReader};

/// Constraint attached to an option descriptor.
///
/// Range and word-list values are kept as raw words; whether they read as
/// integers or fixed-precision numbers depends on the option's value kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    None,
    Range { min: Word, max: Word, quant: Word },
    WordList(Vec<Word>),
    StringList(Vec<String>),
}

impl Constraint {
    /// Range projected as integers, if this is a range constraint.
    pub fn range_int(&self) -> Option<(i32, i32, i32)> {
        match self {
            Constraint::Range { min, max, quant } => Some((min.as_i32(), max.as_i32(), quant.as_i32())),
            _ => None,
        }
    }

    /// Range projected as fixed-precision numbers.
    pub fn range_fixed(&self) -> Option<(f64, f64, f64)> {
        match self {
            Constraint::Range { min, max, quant } => Some((min.to_fixed(), max.to_fixed(), quant.to_fixed())),
            _ => None,
        }
    }

    pub fn kind(&self) -> ConstraintKind {
        match self {
            Constraint::None => ConstraintKind::None,
            Constraint::Range { .. } => ConstraintKind::Range,
            Constraint::WordList(_) => ConstraintKind::WordList,
            Constraint::StringList(_) => ConstraintKind::StringList,
        }
    }
}

/// Metadata for one tunable device parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionDescriptor {
    /// Position in the daemon's option table, used by CONTROL_OPTION.
    pub index: i32,
    pub name: String,
    pub title: String,
    pub description: String,
    /// Title of the group this option belongs to, if any.
    pub group: Option<String>,
    pub value_kind: ValueKind,
    pub unit: Unit,
    /// Value size in bytes.
    pub size: i32,
    pub capabilities: Capability,
    pub constraint: Constraint,
}

impl OptionDescriptor {
    /// Number of value elements: `size / 4` for numeric kinds, one for
    /// booleans and strings, none for buttons and groups.
    pub fn element_count(&self) -> i32 {
        match self.value_kind {
            ValueKind::Int | ValueKind::Fixed => self.size / Word::SIZE as i32,
            ValueKind::Bool | ValueKind::String => 1,
            ValueKind::Button | ValueKind::Group => 0,
        }
    }

    pub fn is_readable(&self) -> bool {
        self.capabilities.contains(Capability::SOFT_DETECT)
    }

    pub fn is_writable(&self) -> bool {
        self.capabilities.contains(Capability::SOFT_SELECT)
    }

    pub fn is_active(&self) -> bool {
        !self.capabilities.contains(Capability::INACTIVE)
    }

    /// Whether this option belongs in the client-facing listing.
    ///
    /// Write-only options, options both soft- and hard-selectable, and
    /// options with no select/detect capability at all are hidden.
    pub(crate) fn is_visible(&self) -> bool {
        let soft_select = self.capabilities.contains(Capability::SOFT_SELECT);
        let hard_select = self.capabilities.contains(Capability::HARD_SELECT);
        let soft_detect = self.capabilities.contains(Capability::SOFT_DETECT);

        if soft_select && hard_select {
            return false;
        }
        if soft_select && !soft_detect {
            return false;
        }
        if !soft_select && !soft_detect && !hard_select {
            return false;
        }
        true
    }
}

/// Named group of options, in daemon order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionGroup {
    pub title: String,
    /// Names of the member options, in listing order.
    pub members: Vec<String>,
}

/// Whether a value kind may legally carry a constraint kind.
fn combination_is_valid(value_kind: ValueKind, constraint_kind: ConstraintKind) -> bool {
    match constraint_kind {
        ConstraintKind::None => true,
        ConstraintKind::StringList => value_kind == ValueKind::String,
        ConstraintKind::Range | ConstraintKind::WordList => {
            matches!(value_kind, ValueKind::Int | ValueKind::Fixed)
        }
    }
}

/// Read one option descriptor, including its constraint payload.
///
/// The `index` is the caller's position in the descriptor table.
pub(crate) fn read_option_descriptor<R: Read>(r: &mut WireReader<R>, index: i32) -> Result<OptionDescriptor> {
    if !r.read_pointer()? {
        return Err(SaneError::protocol(format!(
            "null pointer for option descriptor {index}"
        )));
    }

    let name = r.read_string()?;
    let title = r.read_string()?;
    let description = r.read_string()?;

    let kind_word = r.read_i32()?;
    let value_kind = ValueKind::from_wire(kind_word)
        .ok_or_else(|| SaneError::protocol(format!("unknown option value kind {kind_word}")))?;

    let unit_word = r.read_i32()?;
    let unit =
        Unit::from_wire(unit_word).ok_or_else(|| SaneError::protocol(format!("unknown option unit {unit_word}")))?;

    let size = r.read_i32()?;
    if matches!(value_kind, ValueKind::Int | ValueKind::Fixed) && (size < 0 || size % Word::SIZE as i32 != 0) {
        return Err(SaneError::protocol(format!(
            "numeric option {name} has size {size}, not a multiple of {}",
            Word::SIZE
        )));
    }
    let capabilities = Capability::from_bits_truncate(r.read_i32()? as u32);

    let constraint_word = r.read_i32()?;
    let constraint_kind = ConstraintKind::from_wire(constraint_word)
        .ok_or_else(|| SaneError::protocol(format!("unknown constraint kind {constraint_word}")))?;

    // The payload is consumed even when the combination is bogus, so the
    // stream stays aligned.
    let constraint = read_constraint(r, constraint_kind)?;
    let constraint = if combination_is_valid(value_kind, constraint_kind) {
        constraint
    } else {
        warn!(
            option = %name,
            value_kind = ?value_kind,
            constraint_kind = ?constraint_kind,
            "invalid value/constraint combination, treating option as unconstrained"
        );
        Constraint::None
    };

    Ok(OptionDescriptor {
        index,
        name,
        title,
        description,
        group: None,
        value_kind,
        unit,
        size,
        capabilities,
        constraint,
    })
}

fn read_constraint<R: Read>(r: &mut WireReader<R>, kind: ConstraintKind) -> Result<Constraint> {
    match kind {
        ConstraintKind::None => Ok(Constraint::None),
        ConstraintKind::Range => {
            if !r.read_pointer()? {
                return Ok(Constraint::None);
            }
            let min = r.read_word()?;
            let max = r.read_word()?;
            let quant = r.read_word()?;
            Ok(Constraint::Range { min, max, quant })
        }
        ConstraintKind::WordList => {
            let count = r.read_i32()?;
            if count < 1 {
                return Err(SaneError::protocol(format!("word list length {count}")));
            }
            // The first element repeats the length word; drop it.
            let mut words = Vec::with_capacity(count as usize - 1);
            for position in 0..count {
                let word = r.read_word()?;
                if position > 0 {
                    words.push(word);
                }
            }
            Ok(Constraint::WordList(words))
        }
        ConstraintKind::StringList => {
            let count = r.read_i32()?;
            if count < 1 {
                return Err(SaneError::protocol(format!("string list length {count}")));
            }
            // The final entry is the empty terminator; drop it.
            let mut strings = Vec::with_capacity(count as usize - 1);
            for position in 0..count {
                let value = r.read_string()?;
                if position < count - 1 {
                    strings.push(value);
                }
            }
            Ok(Constraint::StringList(strings))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use crate::net::wire::WireWriter;

    fn descriptor_bytes(
        name: &str,
        value_kind: i32,
        unit: i32,
        size: i32,
        caps: u32,
        constraint: impl FnOnce(&mut WireWriter<Vec<u8>>),
    ) -> Vec<u8> {
        let mut w = WireWriter::buffered();
        w.write_i32(1).unwrap(); // pointer
        w.write_string(name).unwrap();
        w.write_string("Title").unwrap();
        w.write_string("Description").unwrap();
        w.write_i32(value_kind).unwrap();
        w.write_i32(unit).unwrap();
        w.write_i32(size).unwrap();
        w.write_i32(caps as i32).unwrap();
        constraint(&mut w);
        w.into_bytes()
    }

    fn parse(bytes: &[u8]) -> Result<OptionDescriptor> {
        let mut r = WireReader::new(Cursor::new(bytes));
        read_option_descriptor(&mut r, 7)
    }

    #[test]
    fn test_read_descriptor_no_constraint() {
        let bytes = descriptor_bytes("resolution", 1, 4, 4, 5, |w| {
            w.write_i32(0).unwrap();
        });
        let d = parse(&bytes).unwrap();
        assert_eq!(d.index, 7);
        assert_eq!(d.name, "resolution");
        assert_eq!(d.value_kind, ValueKind::Int);
        assert_eq!(d.unit, Unit::Dpi);
        assert_eq!(d.size, 4);
        assert_eq!(d.element_count(), 1);
        assert_eq!(d.constraint, Constraint::None);
        assert!(d.is_readable());
        assert!(d.is_writable());
    }

    #[test]
    fn test_read_descriptor_range_constraint() {
        let bytes = descriptor_bytes("resolution", 1, 4, 4, 5, |w| {
            w.write_i32(1).unwrap(); // RANGE
            w.write_i32(1).unwrap(); // range pointer
            w.write_i32(50).unwrap();
            w.write_i32(600).unwrap();
            w.write_i32(10).unwrap();
        });
        let d = parse(&bytes).unwrap();
        assert_eq!(d.constraint.range_int(), Some((50, 600, 10)));
    }

    #[test]
    fn test_read_descriptor_null_range_pointer() {
        let bytes = descriptor_bytes("resolution", 1, 4, 4, 5, |w| {
            w.write_i32(1).unwrap();
            w.write_i32(0).unwrap(); // absent range
        });
        let d = parse(&bytes).unwrap();
        assert_eq!(d.constraint, Constraint::None);
    }

    #[test]
    fn test_read_descriptor_fixed_range_projection() {
        let bytes = descriptor_bytes("br-x", 2, 3, 4, 5, |w| {
            w.write_i32(1).unwrap();
            w.write_i32(1).unwrap();
            w.write_i32(0).unwrap();
            w.write_i32(215 * 65536).unwrap();
            w.write_i32(0).unwrap();
        });
        let d = parse(&bytes).unwrap();
        let (min, max, quant) = d.constraint.range_fixed().unwrap();
        assert_eq!(min, 0.0);
        assert_eq!(max, 215.0);
        assert_eq!(quant, 0.0);
    }

    #[test]
    fn test_read_descriptor_word_list_drops_leading_count() {
        let bytes = descriptor_bytes("resolution", 1, 4, 4, 5, |w| {
            w.write_i32(2).unwrap(); // WORD_LIST
            w.write_i32(4).unwrap(); // n
            w.write_i32(4).unwrap(); // first element repeats n
            w.write_i32(100).unwrap();
            w.write_i32(200).unwrap();
            w.write_i32(300).unwrap();
        });
        let d = parse(&bytes).unwrap();
        match &d.constraint {
            Constraint::WordList(words) => {
                let values: Vec<i32> = words.iter().map(|w| w.as_i32()).collect();
                assert_eq!(values, [100, 200, 300]);
            }
            other => panic!("expected word list, got {other:?}"),
        }
    }

    #[test]
    fn test_read_descriptor_string_list_drops_terminator() {
        let bytes = descriptor_bytes("mode", 3, 0, 10, 5, |w| {
            w.write_i32(3).unwrap(); // STRING_LIST
            w.write_i32(3).unwrap(); // n
            w.write_string("Gray").unwrap();
            w.write_string("Color").unwrap();
            w.write_string("").unwrap();
        });
        let d = parse(&bytes).unwrap();
        assert_eq!(
            d.constraint,
            Constraint::StringList(vec!["Gray".to_string(), "Color".to_string()])
        );
    }

    #[test]
    fn test_invalid_combination_degrades_and_consumes_payload() {
        // A STRING option carrying a RANGE payload; the range words must be
        // consumed so the trailing marker stays readable.
        let mut bytes = descriptor_bytes("mode", 3, 0, 10, 5, |w| {
            w.write_i32(1).unwrap();
            w.write_i32(1).unwrap();
            w.write_i32(1).unwrap();
            w.write_i32(2).unwrap();
            w.write_i32(3).unwrap();
        });
        bytes.extend_from_slice(&Word::new(0x5A5A).to_be_bytes());

        let mut r = WireReader::new(Cursor::new(&bytes[..]));
        let d = read_option_descriptor(&mut r, 1).unwrap();
        assert_eq!(d.constraint, Constraint::None);
        assert_eq!(r.read_i32().unwrap(), 0x5A5A);
    }

    #[test]
    fn test_numeric_descriptor_with_unaligned_size_rejected() {
        let bytes = descriptor_bytes("resolution", 1, 4, 6, 5, |w| {
            w.write_i32(0).unwrap();
        });
        assert!(matches!(parse(&bytes), Err(SaneError::Protocol(_))));
    }

    #[test]
    fn test_null_descriptor_pointer_is_protocol_error() {
        let mut w = WireWriter::buffered();
        w.write_i32(0).unwrap();
        let bytes = w.into_bytes();
        assert!(matches!(parse(&bytes), Err(SaneError::Protocol(_))));
    }

    #[test]
    fn test_element_counts_per_kind() {
        let mut d = OptionDescriptor {
            index: 1,
            name: "x".into(),
            title: String::new(),
            description: String::new(),
            group: None,
            value_kind: ValueKind::Int,
            unit: Unit::None,
            size: 12,
            capabilities: Capability::SOFT_DETECT,
            constraint: Constraint::None,
        };
        assert_eq!(d.element_count(), 3);
        d.value_kind = ValueKind::Fixed;
        assert_eq!(d.element_count(), 3);
        d.value_kind = ValueKind::String;
        assert_eq!(d.element_count(), 1);
        d.value_kind = ValueKind::Bool;
        assert_eq!(d.element_count(), 1);
        d.value_kind = ValueKind::Button;
        assert_eq!(d.element_count(), 0);
    }

    #[test]
    fn test_visibility_filter() {
        let base = OptionDescriptor {
            index: 1,
            name: "x".into(),
            title: String::new(),
            description: String::new(),
            group: None,
            value_kind: ValueKind::Int,
            unit: Unit::None,
            size: 4,
            capabilities: Capability::empty(),
            constraint: Constraint::None,
        };

        let with = |caps: Capability| OptionDescriptor {
            capabilities: caps,
            ..base.clone()
        };

        // Readable, writable, hardware-only: visible
        assert!(with(Capability::SOFT_DETECT).is_visible());
        assert!(with(Capability::SOFT_SELECT | Capability::SOFT_DETECT).is_visible());
        assert!(with(Capability::HARD_SELECT).is_visible());

        // Soft+hard select, write-only, no capabilities: hidden
        assert!(!with(Capability::SOFT_SELECT | Capability::HARD_SELECT | Capability::SOFT_DETECT).is_visible());
        assert!(!with(Capability::SOFT_SELECT).is_visible());
        assert!(!with(Capability::empty()).is_visible());
        assert!(!with(Capability::EMULATED | Capability::ADVANCED).is_visible());
    }
}
