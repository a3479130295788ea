use crate::Error;

use byteorder::{ByteOrder, LittleEndian};

/// Cluster revision sentinel, the revision of the peer is not known
pub const UNKNOWN_REVISION: u16 = 0xffff;

extended_enum!(
    /// Attribute data type
    AttributeDataType, u8,
    None => 0x00,
    Data8 => 0x08,
    Data16 => 0x09,
    Data24 => 0x0a,
    Data32 => 0x0b,
    Data40 => 0x0c,
    Data48 => 0x0d,
    Data56 => 0x0e,
    Data64 => 0x0f,
    Boolean => 0x10,
    Bitmap8 => 0x18,
    Bitmap16 => 0x19,
    Bitmap24 => 0x1a,
    Bitmap32 => 0x1b,
    Bitmap40 => 0x1c,
    Bitmap48 => 0x1d,
    Bitmap56 => 0x1e,
    Bitmap64 => 0x1f,
    Unsigned8 => 0x20,
    Unsigned16 => 0x21,
    Unsigned24 => 0x22,
    Unsigned32 => 0x23,
    Unsigned40 => 0x24,
    Unsigned48 => 0x25,
    Unsigned56 => 0x26,
    Unsigned64 => 0x27,
    Signed8 => 0x28,
    Signed16 => 0x29,
    Signed24 => 0x2a,
    Signed32 => 0x2b,
    Signed40 => 0x2c,
    Signed48 => 0x2d,
    Signed56 => 0x2e,
    Signed64 => 0x2f,
    Enumeration8 => 0x30,
    Enumeration16 => 0x31,
    FloatingPoint16 => 0x38,
    FloatingPoint32 => 0x39,
    FloatingPoint64 => 0x3a,
    OctetString => 0x41,
    CharacterString => 0x42,
    LongOctetString => 0x43,
    LongCharacterString => 0x44,
    Array => 0x48,
    /// Array of 16-bit words, the count prefix counts words
    CustomArray16 => 0x49,
    /// Array of 32-bit words, the count prefix counts words
    CustomArray32 => 0x4a,
    Structure => 0x4c,
    Set => 0x50,
    Bag => 0x51,
    TimeOfDay => 0xe0,
    Date => 0xe1,
    UtcTime => 0xe2,
    ClusterIdentifier => 0xe8,
    AttributeIdentifier => 0xe9,
    BuildingAutomationControlNetworkObjectIdentifier => 0xea,
    IeeeAddress => 0xf0,
    Key128 => 0xf1,
    Unknown => 0xff,
);

/// How changes of an attribute are detected by reporting
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DataTypeClass {
    /// Numeric value, reported when the change reaches the reportable change
    Analog,
    /// Any other value, reported on every change
    Discrete,
}

impl AttributeDataType {
    /// Size of the value on the wire, `None` for types with a length prefix
    pub fn num_octets(self) -> Option<usize> {
        match self {
            AttributeDataType::None | AttributeDataType::Unknown => Some(0),
            AttributeDataType::Data8
            | AttributeDataType::Boolean
            | AttributeDataType::Bitmap8
            | AttributeDataType::Unsigned8
            | AttributeDataType::Signed8
            | AttributeDataType::Enumeration8 => Some(1),
            AttributeDataType::Data16
            | AttributeDataType::Bitmap16
            | AttributeDataType::Unsigned16
            | AttributeDataType::Signed16
            | AttributeDataType::Enumeration16
            | AttributeDataType::FloatingPoint16
            | AttributeDataType::ClusterIdentifier
            | AttributeDataType::AttributeIdentifier => Some(2),
            AttributeDataType::Data24
            | AttributeDataType::Bitmap24
            | AttributeDataType::Unsigned24
            | AttributeDataType::Signed24 => Some(3),
            AttributeDataType::Data32
            | AttributeDataType::Bitmap32
            | AttributeDataType::Unsigned32
            | AttributeDataType::Signed32
            | AttributeDataType::FloatingPoint32
            | AttributeDataType::TimeOfDay
            | AttributeDataType::Date
            | AttributeDataType::UtcTime
            | AttributeDataType::BuildingAutomationControlNetworkObjectIdentifier => Some(4),
            AttributeDataType::Data40
            | AttributeDataType::Bitmap40
            | AttributeDataType::Unsigned40
            | AttributeDataType::Signed40 => Some(5),
            AttributeDataType::Data48
            | AttributeDataType::Bitmap48
            | AttributeDataType::Unsigned48
            | AttributeDataType::Signed48 => Some(6),
            AttributeDataType::Data56
            | AttributeDataType::Bitmap56
            | AttributeDataType::Unsigned56
            | AttributeDataType::Signed56 => Some(7),
            AttributeDataType::Data64
            | AttributeDataType::Bitmap64
            | AttributeDataType::Unsigned64
            | AttributeDataType::Signed64
            | AttributeDataType::FloatingPoint64
            | AttributeDataType::IeeeAddress => Some(8),
            AttributeDataType::Key128 => Some(16),
            AttributeDataType::OctetString
            | AttributeDataType::CharacterString
            | AttributeDataType::LongOctetString
            | AttributeDataType::LongCharacterString
            | AttributeDataType::Array
            | AttributeDataType::CustomArray16
            | AttributeDataType::CustomArray32
            | AttributeDataType::Structure
            | AttributeDataType::Set
            | AttributeDataType::Bag => None,
        }
    }

    /// Size of the length prefix for variable sized types
    pub fn length_prefix(self) -> Option<usize> {
        match self {
            AttributeDataType::OctetString | AttributeDataType::CharacterString => Some(1),
            AttributeDataType::LongOctetString
            | AttributeDataType::LongCharacterString
            | AttributeDataType::Array
            | AttributeDataType::CustomArray16
            | AttributeDataType::CustomArray32
            | AttributeDataType::Structure
            | AttributeDataType::Set
            | AttributeDataType::Bag => Some(2),
            _ => None,
        }
    }

    /// Analog types are numbers and points in time, everything else is discrete
    pub fn class(self) -> DataTypeClass {
        match self {
            AttributeDataType::Unsigned8
            | AttributeDataType::Unsigned16
            | AttributeDataType::Unsigned24
            | AttributeDataType::Unsigned32
            | AttributeDataType::Unsigned40
            | AttributeDataType::Unsigned48
            | AttributeDataType::Unsigned56
            | AttributeDataType::Unsigned64
            | AttributeDataType::Signed8
            | AttributeDataType::Signed16
            | AttributeDataType::Signed24
            | AttributeDataType::Signed32
            | AttributeDataType::Signed40
            | AttributeDataType::Signed48
            | AttributeDataType::Signed56
            | AttributeDataType::Signed64
            | AttributeDataType::FloatingPoint16
            | AttributeDataType::FloatingPoint32
            | AttributeDataType::FloatingPoint64
            | AttributeDataType::TimeOfDay
            | AttributeDataType::Date
            | AttributeDataType::UtcTime => DataTypeClass::Analog,
            _ => DataTypeClass::Discrete,
        }
    }

    /// Is the type analog
    pub fn is_analog(self) -> bool {
        self.class() == DataTypeClass::Analog
    }
}

/// Elements of an array, set or bag, all of the same type
#[derive(Clone, Debug, PartialEq)]
pub struct CompositeValue {
    /// Type of every element
    pub element_type: AttributeDataType,
    /// The elements
    pub elements: Vec<AttributeValue>,
}

/// Attribute value, tagged with its data type
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    None,
    Data8(u8),
    Data16(u16),
    Data24(u32),
    Data32(u32),
    Data40(u64),
    Data48(u64),
    Data56(u64),
    Data64(u64),
    Boolean(u8),
    Bitmap8(u8),
    Bitmap16(u16),
    Bitmap24(u32),
    Bitmap32(u32),
    Bitmap40(u64),
    Bitmap48(u64),
    Bitmap56(u64),
    Bitmap64(u64),
    Unsigned8(u8),
    Unsigned16(u16),
    Unsigned24(u32),
    Unsigned32(u32),
    Unsigned40(u64),
    Unsigned48(u64),
    Unsigned56(u64),
    Unsigned64(u64),
    Signed8(i8),
    Signed16(i16),
    Signed24(i32),
    Signed32(i32),
    Signed40(i64),
    Signed48(i64),
    Signed56(i64),
    Signed64(i64),
    Enumeration8(u8),
    Enumeration16(u16),
    /// Half precision float, kept as raw bits
    FloatingPoint16(u16),
    FloatingPoint32(f32),
    FloatingPoint64(f64),
    OctetString(Option<Vec<u8>>),
    CharacterString(Option<String>),
    LongOctetString(Option<Vec<u8>>),
    LongCharacterString(Option<String>),
    Array(Option<CompositeValue>),
    CustomArray16(Option<Vec<u16>>),
    CustomArray32(Option<Vec<u32>>),
    Structure(Option<Vec<AttributeValue>>),
    Set(Option<CompositeValue>),
    Bag(Option<CompositeValue>),
    TimeOfDay(u32),
    Date(u32),
    UtcTime(u32),
    ClusterIdentifier(u16),
    AttributeIdentifier(u16),
    BuildingAutomationControlNetworkObjectIdentifier(u32),
    IeeeAddress(u64),
    Key128([u8; 16]),
}

fn mask(size: usize) -> u64 {
    if size >= 8 {
        u64::MAX
    } else {
        (1u64 << (size * 8)) - 1
    }
}

fn write_unsigned(data: &mut [u8], value: u64, size: usize) -> Result<usize, Error> {
    if data.len() < size {
        return Err(Error::NotEnoughSpace);
    }
    LittleEndian::write_uint(&mut data[..size], value & mask(size), size);
    Ok(size)
}

fn write_signed(data: &mut [u8], value: i64, size: usize) -> Result<usize, Error> {
    write_unsigned(data, value as u64, size)
}

fn read_unsigned(data: &[u8], size: usize) -> Result<u64, Error> {
    if data.len() < size {
        return Err(Error::WrongNumberOfBytes);
    }
    Ok(LittleEndian::read_uint(&data[..size], size))
}

fn read_signed(data: &[u8], size: usize) -> Result<i64, Error> {
    if data.len() < size {
        return Err(Error::WrongNumberOfBytes);
    }
    Ok(LittleEndian::read_int(&data[..size], size))
}

fn write_prefixed(data: &mut [u8], bytes: Option<&[u8]>, prefix: usize) -> Result<usize, Error> {
    let invalid = mask(prefix);
    match bytes {
        None => write_unsigned(data, invalid, prefix),
        Some(bytes) => {
            if bytes.len() as u64 >= invalid {
                return Err(Error::InvalidValue);
            }
            if data.len() < prefix + bytes.len() {
                return Err(Error::NotEnoughSpace);
            }
            write_unsigned(data, bytes.len() as u64, prefix)?;
            data[prefix..prefix + bytes.len()].copy_from_slice(bytes);
            Ok(prefix + bytes.len())
        }
    }
}

fn read_prefixed(data: &[u8], prefix: usize) -> Result<(Option<&[u8]>, usize), Error> {
    let length = read_unsigned(data, prefix)?;
    if length == mask(prefix) {
        return Ok((None, prefix));
    }
    let length = length as usize;
    if data.len() < prefix + length {
        return Err(Error::WrongNumberOfBytes);
    }
    Ok((Some(&data[prefix..prefix + length]), prefix + length))
}

fn to_string(bytes: &[u8]) -> Result<String, Error> {
    String::from_utf8(bytes.to_vec()).map_err(|_| Error::InvalidString)
}

fn pack_composite(
    data: &mut [u8],
    composite: &Option<CompositeValue>,
) -> Result<usize, Error> {
    if data.len() < 3 {
        return Err(Error::NotEnoughSpace);
    }
    match composite {
        None => {
            data[0] = u8::from(AttributeDataType::Unknown);
            write_unsigned(&mut data[1..], 0xffff, 2)?;
            Ok(3)
        }
        Some(composite) => {
            if composite.elements.len() >= 0xffff {
                return Err(Error::InvalidValue);
            }
            data[0] = u8::from(composite.element_type);
            write_unsigned(&mut data[1..], composite.elements.len() as u64, 2)?;
            let mut offset = 3;
            for element in composite.elements.iter() {
                if element.data_type() != composite.element_type {
                    return Err(Error::InvalidValue);
                }
                offset += element.pack(&mut data[offset..])?;
            }
            Ok(offset)
        }
    }
}

fn unpack_composite(data: &[u8]) -> Result<(Option<CompositeValue>, usize), Error> {
    if data.len() < 3 {
        return Err(Error::WrongNumberOfBytes);
    }
    let count = read_unsigned(&data[1..], 2)?;
    if count == 0xffff {
        return Ok((None, 3));
    }
    let element_type = AttributeDataType::try_from(data[0])?;
    let mut elements = Vec::with_capacity(count as usize);
    let mut offset = 3;
    for _ in 0..count {
        let (element, used) = AttributeValue::unpack(&data[offset..], element_type)?;
        elements.push(element);
        offset += used;
    }
    Ok((
        Some(CompositeValue {
            element_type,
            elements,
        }),
        offset,
    ))
}

/// Convert half precision float bits into a `f32`
pub fn semi_to_f32(bits: u16) -> f32 {
    let sign = if bits & 0x8000 != 0 { -1.0f32 } else { 1.0f32 };
    let exponent = ((bits >> 10) & 0x1f) as i32;
    let mantissa = (bits & 0x03ff) as f32;
    match exponent {
        0 => sign * mantissa * 2f32.powi(-24),
        0x1f => {
            if mantissa == 0.0 {
                sign * f32::INFINITY
            } else {
                f32::NAN
            }
        }
        _ => sign * (1.0 + mantissa / 1024.0) * 2f32.powi(exponent - 15),
    }
}

impl AttributeValue {
    /// Serialise the value, without the type tag, returns the number of bytes used
    pub fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        match self {
            AttributeValue::None => Ok(0),
            AttributeValue::Data8(v)
            | AttributeValue::Boolean(v)
            | AttributeValue::Bitmap8(v)
            | AttributeValue::Unsigned8(v)
            | AttributeValue::Enumeration8(v) => write_unsigned(data, u64::from(*v), 1),
            AttributeValue::Data16(v)
            | AttributeValue::Bitmap16(v)
            | AttributeValue::Unsigned16(v)
            | AttributeValue::Enumeration16(v)
            | AttributeValue::FloatingPoint16(v)
            | AttributeValue::ClusterIdentifier(v)
            | AttributeValue::AttributeIdentifier(v) => write_unsigned(data, u64::from(*v), 2),
            AttributeValue::Data24(v)
            | AttributeValue::Bitmap24(v)
            | AttributeValue::Unsigned24(v) => write_unsigned(data, u64::from(*v), 3),
            AttributeValue::Data32(v)
            | AttributeValue::Bitmap32(v)
            | AttributeValue::Unsigned32(v)
            | AttributeValue::TimeOfDay(v)
            | AttributeValue::Date(v)
            | AttributeValue::UtcTime(v)
            | AttributeValue::BuildingAutomationControlNetworkObjectIdentifier(v) => {
                write_unsigned(data, u64::from(*v), 4)
            }
            AttributeValue::Data40(v)
            | AttributeValue::Bitmap40(v)
            | AttributeValue::Unsigned40(v) => write_unsigned(data, *v, 5),
            AttributeValue::Data48(v)
            | AttributeValue::Bitmap48(v)
            | AttributeValue::Unsigned48(v) => write_unsigned(data, *v, 6),
            AttributeValue::Data56(v)
            | AttributeValue::Bitmap56(v)
            | AttributeValue::Unsigned56(v) => write_unsigned(data, *v, 7),
            AttributeValue::Data64(v)
            | AttributeValue::Bitmap64(v)
            | AttributeValue::Unsigned64(v)
            | AttributeValue::IeeeAddress(v) => write_unsigned(data, *v, 8),
            AttributeValue::Signed8(v) => write_signed(data, i64::from(*v), 1),
            AttributeValue::Signed16(v) => write_signed(data, i64::from(*v), 2),
            AttributeValue::Signed24(v) => write_signed(data, i64::from(*v), 3),
            AttributeValue::Signed32(v) => write_signed(data, i64::from(*v), 4),
            AttributeValue::Signed40(v) => write_signed(data, *v, 5),
            AttributeValue::Signed48(v) => write_signed(data, *v, 6),
            AttributeValue::Signed56(v) => write_signed(data, *v, 7),
            AttributeValue::Signed64(v) => write_signed(data, *v, 8),
            AttributeValue::FloatingPoint32(v) => {
                if data.len() < 4 {
                    return Err(Error::NotEnoughSpace);
                }
                LittleEndian::write_f32(&mut data[..4], *v);
                Ok(4)
            }
            AttributeValue::FloatingPoint64(v) => {
                if data.len() < 8 {
                    return Err(Error::NotEnoughSpace);
                }
                LittleEndian::write_f64(&mut data[..8], *v);
                Ok(8)
            }
            AttributeValue::OctetString(v) => write_prefixed(data, v.as_deref(), 1),
            AttributeValue::CharacterString(v) => {
                write_prefixed(data, v.as_ref().map(|s| s.as_bytes()), 1)
            }
            AttributeValue::LongOctetString(v) => write_prefixed(data, v.as_deref(), 2),
            AttributeValue::LongCharacterString(v) => {
                write_prefixed(data, v.as_ref().map(|s| s.as_bytes()), 2)
            }
            AttributeValue::Array(v) | AttributeValue::Set(v) | AttributeValue::Bag(v) => {
                pack_composite(data, v)
            }
            AttributeValue::CustomArray16(v) => match v {
                None => write_unsigned(data, 0xffff, 2),
                Some(words) => {
                    let size = 2 + words.len() * 2;
                    if data.len() < size {
                        return Err(Error::NotEnoughSpace);
                    }
                    write_unsigned(data, words.len() as u64, 2)?;
                    for (n, word) in words.iter().enumerate() {
                        LittleEndian::write_u16(&mut data[2 + n * 2..4 + n * 2], *word);
                    }
                    Ok(size)
                }
            },
            AttributeValue::CustomArray32(v) => match v {
                None => write_unsigned(data, 0xffff, 2),
                Some(words) => {
                    let size = 2 + words.len() * 4;
                    if data.len() < size {
                        return Err(Error::NotEnoughSpace);
                    }
                    write_unsigned(data, words.len() as u64, 2)?;
                    for (n, word) in words.iter().enumerate() {
                        LittleEndian::write_u32(&mut data[2 + n * 4..6 + n * 4], *word);
                    }
                    Ok(size)
                }
            },
            AttributeValue::Structure(v) => match v {
                None => write_unsigned(data, 0xffff, 2),
                Some(members) => {
                    write_unsigned(data, members.len() as u64, 2)?;
                    let mut offset = 2;
                    for member in members.iter() {
                        if data.len() <= offset {
                            return Err(Error::NotEnoughSpace);
                        }
                        data[offset] = u8::from(member.data_type());
                        offset += 1;
                        offset += member.pack(&mut data[offset..])?;
                    }
                    Ok(offset)
                }
            },
            AttributeValue::Key128(v) => {
                if data.len() < 16 {
                    return Err(Error::NotEnoughSpace);
                }
                data[..16].copy_from_slice(v);
                Ok(16)
            }
        }
    }

    /// Serialise the type tag followed by the value
    pub fn pack_with_type(&self, data: &mut [u8]) -> Result<usize, Error> {
        if data.is_empty() {
            return Err(Error::NotEnoughSpace);
        }
        data[0] = u8::from(self.data_type());
        Ok(1 + self.pack(&mut data[1..])?)
    }

    /// Read a value of `data_type`, returns the value and the number of bytes used
    pub fn unpack(data: &[u8], data_type: AttributeDataType) -> Result<(Self, usize), Error> {
        if let Some(num_octets) = data_type.num_octets() {
            if data.len() < num_octets {
                return Err(Error::WrongNumberOfBytes);
            }
        }
        let value = match data_type {
            AttributeDataType::None => return Ok((AttributeValue::None, 0)),
            AttributeDataType::Unknown => return Err(Error::UnsupportedAttributeValue),
            AttributeDataType::Data8 => AttributeValue::Data8(data[0]),
            AttributeDataType::Boolean => match data[0] {
                0x00 | 0x01 | 0xff => AttributeValue::Boolean(data[0]),
                _ => return Err(Error::InvalidValue),
            },
            AttributeDataType::Bitmap8 => AttributeValue::Bitmap8(data[0]),
            AttributeDataType::Unsigned8 => AttributeValue::Unsigned8(data[0]),
            AttributeDataType::Enumeration8 => AttributeValue::Enumeration8(data[0]),
            AttributeDataType::Signed8 => AttributeValue::Signed8(data[0] as i8),
            AttributeDataType::Data16 => AttributeValue::Data16(LittleEndian::read_u16(data)),
            AttributeDataType::Bitmap16 => AttributeValue::Bitmap16(LittleEndian::read_u16(data)),
            AttributeDataType::Unsigned16 => {
                AttributeValue::Unsigned16(LittleEndian::read_u16(data))
            }
            AttributeDataType::Enumeration16 => {
                AttributeValue::Enumeration16(LittleEndian::read_u16(data))
            }
            AttributeDataType::FloatingPoint16 => {
                AttributeValue::FloatingPoint16(LittleEndian::read_u16(data))
            }
            AttributeDataType::ClusterIdentifier => {
                AttributeValue::ClusterIdentifier(LittleEndian::read_u16(data))
            }
            AttributeDataType::AttributeIdentifier => {
                AttributeValue::AttributeIdentifier(LittleEndian::read_u16(data))
            }
            AttributeDataType::Signed16 => AttributeValue::Signed16(LittleEndian::read_i16(data)),
            AttributeDataType::Data24 => AttributeValue::Data24(LittleEndian::read_u24(data)),
            AttributeDataType::Bitmap24 => AttributeValue::Bitmap24(LittleEndian::read_u24(data)),
            AttributeDataType::Unsigned24 => {
                AttributeValue::Unsigned24(LittleEndian::read_u24(data))
            }
            AttributeDataType::Signed24 => AttributeValue::Signed24(LittleEndian::read_i24(data)),
            AttributeDataType::Data32 => AttributeValue::Data32(LittleEndian::read_u32(data)),
            AttributeDataType::Bitmap32 => AttributeValue::Bitmap32(LittleEndian::read_u32(data)),
            AttributeDataType::Unsigned32 => {
                AttributeValue::Unsigned32(LittleEndian::read_u32(data))
            }
            AttributeDataType::Signed32 => AttributeValue::Signed32(LittleEndian::read_i32(data)),
            AttributeDataType::TimeOfDay => AttributeValue::TimeOfDay(LittleEndian::read_u32(data)),
            AttributeDataType::Date => AttributeValue::Date(LittleEndian::read_u32(data)),
            AttributeDataType::UtcTime => AttributeValue::UtcTime(LittleEndian::read_u32(data)),
            AttributeDataType::BuildingAutomationControlNetworkObjectIdentifier => {
                AttributeValue::BuildingAutomationControlNetworkObjectIdentifier(
                    LittleEndian::read_u32(data),
                )
            }
            AttributeDataType::FloatingPoint32 => {
                AttributeValue::FloatingPoint32(LittleEndian::read_f32(data))
            }
            AttributeDataType::Data40 => AttributeValue::Data40(read_unsigned(data, 5)?),
            AttributeDataType::Bitmap40 => AttributeValue::Bitmap40(read_unsigned(data, 5)?),
            AttributeDataType::Unsigned40 => AttributeValue::Unsigned40(read_unsigned(data, 5)?),
            AttributeDataType::Signed40 => AttributeValue::Signed40(read_signed(data, 5)?),
            AttributeDataType::Data48 => AttributeValue::Data48(read_unsigned(data, 6)?),
            AttributeDataType::Bitmap48 => AttributeValue::Bitmap48(read_unsigned(data, 6)?),
            AttributeDataType::Unsigned48 => AttributeValue::Unsigned48(read_unsigned(data, 6)?),
            AttributeDataType::Signed48 => AttributeValue::Signed48(read_signed(data, 6)?),
            AttributeDataType::Data56 => AttributeValue::Data56(read_unsigned(data, 7)?),
            AttributeDataType::Bitmap56 => AttributeValue::Bitmap56(read_unsigned(data, 7)?),
            AttributeDataType::Unsigned56 => AttributeValue::Unsigned56(read_unsigned(data, 7)?),
            AttributeDataType::Signed56 => AttributeValue::Signed56(read_signed(data, 7)?),
            AttributeDataType::Data64 => AttributeValue::Data64(LittleEndian::read_u64(data)),
            AttributeDataType::Bitmap64 => AttributeValue::Bitmap64(LittleEndian::read_u64(data)),
            AttributeDataType::Unsigned64 => {
                AttributeValue::Unsigned64(LittleEndian::read_u64(data))
            }
            AttributeDataType::IeeeAddress => {
                AttributeValue::IeeeAddress(LittleEndian::read_u64(data))
            }
            AttributeDataType::Signed64 => AttributeValue::Signed64(LittleEndian::read_i64(data)),
            AttributeDataType::FloatingPoint64 => {
                AttributeValue::FloatingPoint64(LittleEndian::read_f64(data))
            }
            AttributeDataType::Key128 => {
                let mut key = [0u8; 16];
                key.copy_from_slice(&data[..16]);
                AttributeValue::Key128(key)
            }
            AttributeDataType::OctetString => {
                let (bytes, used) = read_prefixed(data, 1)?;
                return Ok((AttributeValue::OctetString(bytes.map(|b| b.to_vec())), used));
            }
            AttributeDataType::CharacterString => {
                let (bytes, used) = read_prefixed(data, 1)?;
                let value = match bytes {
                    Some(bytes) => Some(to_string(bytes)?),
                    None => None,
                };
                return Ok((AttributeValue::CharacterString(value), used));
            }
            AttributeDataType::LongOctetString => {
                let (bytes, used) = read_prefixed(data, 2)?;
                return Ok((
                    AttributeValue::LongOctetString(bytes.map(|b| b.to_vec())),
                    used,
                ));
            }
            AttributeDataType::LongCharacterString => {
                let (bytes, used) = read_prefixed(data, 2)?;
                let value = match bytes {
                    Some(bytes) => Some(to_string(bytes)?),
                    None => None,
                };
                return Ok((AttributeValue::LongCharacterString(value), used));
            }
            AttributeDataType::Array => {
                let (value, used) = unpack_composite(data)?;
                return Ok((AttributeValue::Array(value), used));
            }
            AttributeDataType::Set => {
                let (value, used) = unpack_composite(data)?;
                return Ok((AttributeValue::Set(value), used));
            }
            AttributeDataType::Bag => {
                let (value, used) = unpack_composite(data)?;
                return Ok((AttributeValue::Bag(value), used));
            }
            AttributeDataType::CustomArray16 => {
                let count = read_unsigned(data, 2)?;
                if count == 0xffff {
                    return Ok((AttributeValue::CustomArray16(None), 2));
                }
                let size = 2 + count as usize * 2;
                if data.len() < size {
                    return Err(Error::WrongNumberOfBytes);
                }
                let words = data[2..size]
                    .chunks_exact(2)
                    .map(LittleEndian::read_u16)
                    .collect();
                return Ok((AttributeValue::CustomArray16(Some(words)), size));
            }
            AttributeDataType::CustomArray32 => {
                let count = read_unsigned(data, 2)?;
                if count == 0xffff {
                    return Ok((AttributeValue::CustomArray32(None), 2));
                }
                let size = 2 + count as usize * 4;
                if data.len() < size {
                    return Err(Error::WrongNumberOfBytes);
                }
                let words = data[2..size]
                    .chunks_exact(4)
                    .map(LittleEndian::read_u32)
                    .collect();
                return Ok((AttributeValue::CustomArray32(Some(words)), size));
            }
            AttributeDataType::Structure => {
                let count = read_unsigned(data, 2)?;
                if count == 0xffff {
                    return Ok((AttributeValue::Structure(None), 2));
                }
                let mut members = Vec::with_capacity(count as usize);
                let mut offset = 2;
                for _ in 0..count {
                    if data.len() <= offset {
                        return Err(Error::WrongNumberOfBytes);
                    }
                    let member_type = AttributeDataType::try_from(data[offset])?;
                    let (member, used) = AttributeValue::unpack(&data[offset + 1..], member_type)?;
                    members.push(member);
                    offset += 1 + used;
                }
                return Ok((AttributeValue::Structure(Some(members)), offset));
            }
        };
        let used = data_type.num_octets().unwrap_or(0);
        Ok((value, used))
    }

    /// Read a type tag followed by a value
    pub fn unpack_with_type(data: &[u8]) -> Result<(Self, usize), Error> {
        if data.is_empty() {
            return Err(Error::WrongNumberOfBytes);
        }
        let data_type = AttributeDataType::try_from(data[0])?;
        let (value, used) = Self::unpack(&data[1..], data_type)?;
        Ok((value, used + 1))
    }

    /// Number of bytes used by the value on the wire, without the type tag
    pub fn encoded_size(&self) -> usize {
        if let Some(size) = self.data_type().num_octets() {
            return size;
        }
        match self {
            AttributeValue::OctetString(v) => 1 + v.as_ref().map_or(0, |v| v.len()),
            AttributeValue::CharacterString(v) => 1 + v.as_ref().map_or(0, |v| v.len()),
            AttributeValue::LongOctetString(v) => 2 + v.as_ref().map_or(0, |v| v.len()),
            AttributeValue::LongCharacterString(v) => 2 + v.as_ref().map_or(0, |v| v.len()),
            AttributeValue::Array(v) | AttributeValue::Set(v) | AttributeValue::Bag(v) => {
                3 + v.as_ref().map_or(0, |c| {
                    c.elements.iter().map(|e| e.encoded_size()).sum::<usize>()
                })
            }
            AttributeValue::CustomArray16(v) => 2 + v.as_ref().map_or(0, |w| w.len() * 2),
            AttributeValue::CustomArray32(v) => 2 + v.as_ref().map_or(0, |w| w.len() * 4),
            AttributeValue::Structure(v) => {
                2 + v.as_ref().map_or(0, |m| {
                    m.iter().map(|e| 1 + e.encoded_size()).sum::<usize>()
                })
            }
            _ => 0,
        }
    }

    /// Number of elements or characters for variable sized values
    pub fn element_count(&self) -> Option<usize> {
        match self {
            AttributeValue::OctetString(v) | AttributeValue::LongOctetString(v) => {
                Some(v.as_ref().map_or(0, |v| v.len()))
            }
            AttributeValue::CharacterString(v) | AttributeValue::LongCharacterString(v) => {
                Some(v.as_ref().map_or(0, |v| v.len()))
            }
            AttributeValue::Array(v) | AttributeValue::Set(v) | AttributeValue::Bag(v) => {
                Some(v.as_ref().map_or(0, |c| c.elements.len()))
            }
            AttributeValue::CustomArray16(v) => Some(v.as_ref().map_or(0, |w| w.len())),
            AttributeValue::CustomArray32(v) => Some(v.as_ref().map_or(0, |w| w.len())),
            AttributeValue::Structure(v) => Some(v.as_ref().map_or(0, |m| m.len())),
            _ => None,
        }
    }

    /// The data type of the value
    pub fn data_type(&self) -> AttributeDataType {
        match self {
            AttributeValue::None => AttributeDataType::None,
            AttributeValue::Data8(_) => AttributeDataType::Data8,
            AttributeValue::Data16(_) => AttributeDataType::Data16,
            AttributeValue::Data24(_) => AttributeDataType::Data24,
            AttributeValue::Data32(_) => AttributeDataType::Data32,
            AttributeValue::Data40(_) => AttributeDataType::Data40,
            AttributeValue::Data48(_) => AttributeDataType::Data48,
            AttributeValue::Data56(_) => AttributeDataType::Data56,
            AttributeValue::Data64(_) => AttributeDataType::Data64,
            AttributeValue::Boolean(_) => AttributeDataType::Boolean,
            AttributeValue::Bitmap8(_) => AttributeDataType::Bitmap8,
            AttributeValue::Bitmap16(_) => AttributeDataType::Bitmap16,
            AttributeValue::Bitmap24(_) => AttributeDataType::Bitmap24,
            AttributeValue::Bitmap32(_) => AttributeDataType::Bitmap32,
            AttributeValue::Bitmap40(_) => AttributeDataType::Bitmap40,
            AttributeValue::Bitmap48(_) => AttributeDataType::Bitmap48,
            AttributeValue::Bitmap56(_) => AttributeDataType::Bitmap56,
            AttributeValue::Bitmap64(_) => AttributeDataType::Bitmap64,
            AttributeValue::Unsigned8(_) => AttributeDataType::Unsigned8,
            AttributeValue::Unsigned16(_) => AttributeDataType::Unsigned16,
            AttributeValue::Unsigned24(_) => AttributeDataType::Unsigned24,
            AttributeValue::Unsigned32(_) => AttributeDataType::Unsigned32,
            AttributeValue::Unsigned40(_) => AttributeDataType::Unsigned40,
            AttributeValue::Unsigned48(_) => AttributeDataType::Unsigned48,
            AttributeValue::Unsigned56(_) => AttributeDataType::Unsigned56,
            AttributeValue::Unsigned64(_) => AttributeDataType::Unsigned64,
            AttributeValue::Signed8(_) => AttributeDataType::Signed8,
            AttributeValue::Signed16(_) => AttributeDataType::Signed16,
            AttributeValue::Signed24(_) => AttributeDataType::Signed24,
            AttributeValue::Signed32(_) => AttributeDataType::Signed32,
            AttributeValue::Signed40(_) => AttributeDataType::Signed40,
            AttributeValue::Signed48(_) => AttributeDataType::Signed48,
            AttributeValue::Signed56(_) => AttributeDataType::Signed56,
            AttributeValue::Signed64(_) => AttributeDataType::Signed64,
            AttributeValue::Enumeration8(_) => AttributeDataType::Enumeration8,
            AttributeValue::Enumeration16(_) => AttributeDataType::Enumeration16,
            AttributeValue::FloatingPoint16(_) => AttributeDataType::FloatingPoint16,
            AttributeValue::FloatingPoint32(_) => AttributeDataType::FloatingPoint32,
            AttributeValue::FloatingPoint64(_) => AttributeDataType::FloatingPoint64,
            AttributeValue::OctetString(_) => AttributeDataType::OctetString,
            AttributeValue::CharacterString(_) => AttributeDataType::CharacterString,
            AttributeValue::LongOctetString(_) => AttributeDataType::LongOctetString,
            AttributeValue::LongCharacterString(_) => AttributeDataType::LongCharacterString,
            AttributeValue::Array(_) => AttributeDataType::Array,
            AttributeValue::CustomArray16(_) => AttributeDataType::CustomArray16,
            AttributeValue::CustomArray32(_) => AttributeDataType::CustomArray32,
            AttributeValue::Structure(_) => AttributeDataType::Structure,
            AttributeValue::Set(_) => AttributeDataType::Set,
            AttributeValue::Bag(_) => AttributeDataType::Bag,
            AttributeValue::TimeOfDay(_) => AttributeDataType::TimeOfDay,
            AttributeValue::Date(_) => AttributeDataType::Date,
            AttributeValue::UtcTime(_) => AttributeDataType::UtcTime,
            AttributeValue::ClusterIdentifier(_) => AttributeDataType::ClusterIdentifier,
            AttributeValue::AttributeIdentifier(_) => AttributeDataType::AttributeIdentifier,
            AttributeValue::BuildingAutomationControlNetworkObjectIdentifier(_) => {
                AttributeDataType::BuildingAutomationControlNetworkObjectIdentifier
            }
            AttributeValue::IeeeAddress(_) => AttributeDataType::IeeeAddress,
            AttributeValue::Key128(_) => AttributeDataType::Key128,
        }
    }

    /// A zero, or empty, value of `data_type`
    pub fn default_for(data_type: AttributeDataType) -> Self {
        match data_type {
            AttributeDataType::OctetString => AttributeValue::OctetString(Some(Vec::new())),
            AttributeDataType::CharacterString => {
                AttributeValue::CharacterString(Some(String::new()))
            }
            AttributeDataType::LongOctetString => {
                AttributeValue::LongOctetString(Some(Vec::new()))
            }
            AttributeDataType::LongCharacterString => {
                AttributeValue::LongCharacterString(Some(String::new()))
            }
            AttributeDataType::Array => AttributeValue::Array(Some(CompositeValue {
                element_type: AttributeDataType::Unsigned8,
                elements: Vec::new(),
            })),
            AttributeDataType::Set => AttributeValue::Set(Some(CompositeValue {
                element_type: AttributeDataType::Unsigned8,
                elements: Vec::new(),
            })),
            AttributeDataType::Bag => AttributeValue::Bag(Some(CompositeValue {
                element_type: AttributeDataType::Unsigned8,
                elements: Vec::new(),
            })),
            AttributeDataType::CustomArray16 => AttributeValue::CustomArray16(Some(Vec::new())),
            AttributeDataType::CustomArray32 => AttributeValue::CustomArray32(Some(Vec::new())),
            AttributeDataType::Structure => AttributeValue::Structure(Some(Vec::new())),
            AttributeDataType::Key128 => AttributeValue::Key128([0u8; 16]),
            AttributeDataType::FloatingPoint32 => AttributeValue::FloatingPoint32(0.0),
            AttributeDataType::FloatingPoint64 => AttributeValue::FloatingPoint64(0.0),
            AttributeDataType::None | AttributeDataType::Unknown => AttributeValue::None,
            _ => {
                let zero = [0u8; 8];
                match AttributeValue::unpack(&zero, data_type) {
                    Ok((value, _)) => value,
                    Err(_) => AttributeValue::None,
                }
            }
        }
    }

    /// Integer view of integer, bitmap, enumeration, identifier and time values
    pub fn as_integer(&self) -> Option<i128> {
        match self {
            AttributeValue::Data8(v)
            | AttributeValue::Boolean(v)
            | AttributeValue::Bitmap8(v)
            | AttributeValue::Unsigned8(v)
            | AttributeValue::Enumeration8(v) => Some(i128::from(*v)),
            AttributeValue::Data16(v)
            | AttributeValue::Bitmap16(v)
            | AttributeValue::Unsigned16(v)
            | AttributeValue::Enumeration16(v)
            | AttributeValue::ClusterIdentifier(v)
            | AttributeValue::AttributeIdentifier(v) => Some(i128::from(*v)),
            AttributeValue::Data24(v)
            | AttributeValue::Data32(v)
            | AttributeValue::Bitmap24(v)
            | AttributeValue::Bitmap32(v)
            | AttributeValue::Unsigned24(v)
            | AttributeValue::Unsigned32(v)
            | AttributeValue::TimeOfDay(v)
            | AttributeValue::Date(v)
            | AttributeValue::UtcTime(v)
            | AttributeValue::BuildingAutomationControlNetworkObjectIdentifier(v) => {
                Some(i128::from(*v))
            }
            AttributeValue::Data40(v)
            | AttributeValue::Data48(v)
            | AttributeValue::Data56(v)
            | AttributeValue::Data64(v)
            | AttributeValue::Bitmap40(v)
            | AttributeValue::Bitmap48(v)
            | AttributeValue::Bitmap56(v)
            | AttributeValue::Bitmap64(v)
            | AttributeValue::Unsigned40(v)
            | AttributeValue::Unsigned48(v)
            | AttributeValue::Unsigned56(v)
            | AttributeValue::Unsigned64(v)
            | AttributeValue::IeeeAddress(v) => Some(i128::from(*v)),
            AttributeValue::Signed8(v) => Some(i128::from(*v)),
            AttributeValue::Signed16(v) => Some(i128::from(*v)),
            AttributeValue::Signed24(v) | AttributeValue::Signed32(v) => Some(i128::from(*v)),
            AttributeValue::Signed40(v)
            | AttributeValue::Signed48(v)
            | AttributeValue::Signed56(v)
            | AttributeValue::Signed64(v) => Some(i128::from(*v)),
            _ => None,
        }
    }

    /// Floating point view of numeric values
    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttributeValue::FloatingPoint16(v) => Some(f64::from(semi_to_f32(*v))),
            AttributeValue::FloatingPoint32(v) => Some(f64::from(*v)),
            AttributeValue::FloatingPoint64(v) => Some(*v),
            _ => self.as_integer().map(|v| v as f64),
        }
    }

    /// Unsigned view, `None` for negative or non-integer values
    pub fn as_unsigned(&self) -> Option<u64> {
        self.as_integer().and_then(|v| u64::try_from(v).ok())
    }

    /// Boolean view of a boolean value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Boolean(v) => Some(*v == 0x01),
            _ => None,
        }
    }

    /// Create a value of `data_type` from an integer, `None` if the type is not
    /// an integer type or the value does not fit
    pub fn from_integer(data_type: AttributeDataType, value: i128) -> Option<Self> {
        let size = data_type.num_octets()?;
        let signed = matches!(
            data_type,
            AttributeDataType::Signed8
                | AttributeDataType::Signed16
                | AttributeDataType::Signed24
                | AttributeDataType::Signed32
                | AttributeDataType::Signed40
                | AttributeDataType::Signed48
                | AttributeDataType::Signed56
                | AttributeDataType::Signed64
        );
        if size == 0 || size > 8 {
            return None;
        }
        let bits = (size * 8) as u32;
        let fits = if signed {
            let min = -(1i128 << (bits - 1));
            let max = (1i128 << (bits - 1)) - 1;
            value >= min && value <= max
        } else {
            value >= 0 && value <= (1i128 << bits) - 1
        };
        if !fits {
            return None;
        }
        let mut data = [0u8; 8];
        LittleEndian::write_uint(&mut data[..size], (value as u64) & mask(size), size);
        match data_type {
            AttributeDataType::FloatingPoint16
            | AttributeDataType::FloatingPoint32
            | AttributeDataType::FloatingPoint64
            | AttributeDataType::Key128 => None,
            _ => AttributeValue::unpack(&data[..size], data_type)
                .ok()
                .map(|(value, _)| value),
        }
    }

    /// Compare the change from `previous` to `self` with `change`, returns
    /// `None` when the values can not be compared
    pub fn change_reaches(&self, previous: &Self, change: &Self) -> Option<bool> {
        if self.data_type() != previous.data_type() {
            return None;
        }
        match (self.as_integer(), previous.as_integer(), change.as_integer()) {
            (Some(current), Some(previous), Some(change)) => {
                Some((current - previous).abs() >= change.abs())
            }
            _ => {
                let current = self.as_float()?;
                let previous = previous.as_float()?;
                let change = change.as_float()?;
                Some((current - previous).abs() >= change.abs())
            }
        }
    }

    /// Is the value a valid value, not one of the non-value sentinels
    pub fn is_valid(&self) -> bool {
        match self {
            AttributeValue::None
            | AttributeValue::Data8(_)
            | AttributeValue::Data16(_)
            | AttributeValue::Data24(_)
            | AttributeValue::Data32(_)
            | AttributeValue::Data40(_)
            | AttributeValue::Data48(_)
            | AttributeValue::Data56(_)
            | AttributeValue::Data64(_)
            | AttributeValue::Bitmap8(_)
            | AttributeValue::Bitmap16(_)
            | AttributeValue::Bitmap24(_)
            | AttributeValue::Bitmap32(_)
            | AttributeValue::Bitmap40(_)
            | AttributeValue::Bitmap48(_)
            | AttributeValue::Bitmap56(_)
            | AttributeValue::Bitmap64(_)
            | AttributeValue::Key128(_) => true,
            AttributeValue::Boolean(v) => *v == 0x00 || *v == 0x01,
            AttributeValue::Unsigned8(v) | AttributeValue::Enumeration8(v) => *v != u8::MAX,
            AttributeValue::Unsigned16(v)
            | AttributeValue::Enumeration16(v)
            | AttributeValue::ClusterIdentifier(v)
            | AttributeValue::AttributeIdentifier(v) => *v != u16::MAX,
            AttributeValue::Unsigned24(v) => *v < 0x00ff_ffff,
            AttributeValue::Unsigned32(v)
            | AttributeValue::TimeOfDay(v)
            | AttributeValue::Date(v)
            | AttributeValue::UtcTime(v)
            | AttributeValue::BuildingAutomationControlNetworkObjectIdentifier(v) => {
                *v != u32::MAX
            }
            AttributeValue::Unsigned40(v) => *v < mask(5),
            AttributeValue::Unsigned48(v) => *v < mask(6),
            AttributeValue::Unsigned56(v) => *v < mask(7),
            AttributeValue::Unsigned64(v) | AttributeValue::IeeeAddress(v) => *v != u64::MAX,
            AttributeValue::Signed8(v) => *v != i8::MIN,
            AttributeValue::Signed16(v) => *v != i16::MIN,
            AttributeValue::Signed24(v) => *v > -8_388_608 && *v <= 8_388_607,
            AttributeValue::Signed32(v) => *v != i32::MIN,
            AttributeValue::Signed40(v) => *v > -(1i64 << 39) && *v < (1i64 << 39),
            AttributeValue::Signed48(v) => *v > -(1i64 << 47) && *v < (1i64 << 47),
            AttributeValue::Signed56(v) => *v > -(1i64 << 55) && *v < (1i64 << 55),
            AttributeValue::Signed64(v) => *v != i64::MIN,
            AttributeValue::FloatingPoint16(v) => !semi_to_f32(*v).is_nan(),
            AttributeValue::FloatingPoint32(v) => !v.is_nan(),
            AttributeValue::FloatingPoint64(v) => !v.is_nan(),
            AttributeValue::OctetString(v) | AttributeValue::LongOctetString(v) => v.is_some(),
            AttributeValue::CharacterString(v) | AttributeValue::LongCharacterString(v) => {
                v.is_some()
            }
            AttributeValue::Array(v) | AttributeValue::Set(v) | AttributeValue::Bag(v) => {
                v.is_some()
            }
            AttributeValue::CustomArray16(v) => v.is_some(),
            AttributeValue::CustomArray32(v) => v.is_some(),
            AttributeValue::Structure(v) => v.is_some(),
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Boolean(value as u8)
    }
}

const STRING_INVALID: &str = "Invalid";

impl core::fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if !self.is_valid() {
            return write!(f, "{}", STRING_INVALID);
        }
        match self {
            AttributeValue::None => write!(f, "None"),
            AttributeValue::Boolean(v) => write!(f, "{}", *v == 0x01),
            AttributeValue::FloatingPoint16(v) => write!(f, "{}", semi_to_f32(*v)),
            AttributeValue::FloatingPoint32(v) => write!(f, "{}", v),
            AttributeValue::FloatingPoint64(v) => write!(f, "{}", v),
            AttributeValue::OctetString(Some(v)) | AttributeValue::LongOctetString(Some(v)) => {
                for b in v.iter() {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
            AttributeValue::CharacterString(Some(v))
            | AttributeValue::LongCharacterString(Some(v)) => write!(f, "{}", v),
            AttributeValue::Key128(v) => {
                for b in v.iter() {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
            AttributeValue::Array(Some(c)) | AttributeValue::Set(Some(c)) | AttributeValue::Bag(Some(c)) => {
                write!(f, "[")?;
                for (n, e) in c.elements.iter().enumerate() {
                    if n > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", e)?;
                }
                write!(f, "]")
            }
            AttributeValue::Structure(Some(m)) => {
                write!(f, "{{")?;
                for (n, e) in m.iter().enumerate() {
                    if n > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", e)?;
                }
                write!(f, "}}")
            }
            AttributeValue::CustomArray16(Some(w)) => write!(f, "{:?}", w),
            AttributeValue::CustomArray32(Some(w)) => write!(f, "{:?}", w),
            AttributeValue::TimeOfDay(v) => write!(
                f,
                "{:02}:{:02}:{:02}.{:02}",
                v & 0xff,
                (v >> 8) & 0xff,
                (v >> 16) & 0xff,
                (v >> 24) & 0xff
            ),
            AttributeValue::Date(v) => write!(
                f,
                "{}-{:02}-{:02}",
                (v & 0xff) + 1900,
                (v >> 8) & 0xff,
                (v >> 16) & 0xff
            ),
            AttributeValue::ClusterIdentifier(v) | AttributeValue::AttributeIdentifier(v) => {
                write!(f, "{:04x}", v)
            }
            AttributeValue::IeeeAddress(v) => write!(f, "{:016x}", v),
            _ => match self.as_integer() {
                Some(v) => write!(f, "{}", v),
                None => write!(f, "{}", STRING_INVALID),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_value_none() {
        let value = AttributeValue::None;
        assert_eq!(value.data_type(), AttributeDataType::None);
        assert_eq!(format!("{}", value), "None");
    }

    #[test]
    fn attribute_value_unsigned8() {
        for v in [0u8, 1, 127, 254, 255].iter() {
            let value = AttributeValue::Unsigned8(*v);
            assert_eq!(value.data_type(), AttributeDataType::Unsigned8);
            if *v == u8::MAX {
                assert_eq!(value.is_valid(), false);
                assert_eq!(format!("{}", value), "Invalid");
            } else {
                assert_eq!(value.is_valid(), true);
                assert_eq!(format!("{}", value), format!("{}", v));
            }
        }
    }

    #[test]
    fn attribute_value_signed24() {
        for v in [i32::MIN, -8_388_608, -1, 0x7f_ffff].iter() {
            let value = AttributeValue::Signed24(*v);
            if *v <= -8_388_608 {
                assert_eq!(value.is_valid(), false);
            } else {
                assert_eq!(value.is_valid(), true);
                assert_eq!(format!("{}", value), format!("{}", v));
            }
        }
    }

    #[test]
    fn attribute_value_bool() {
        for v in [0u8, 1u8, 2u8, 255u8].iter() {
            let value = AttributeValue::Boolean(*v);
            assert_eq!(value.data_type(), AttributeDataType::Boolean);
            match *v {
                0 => assert_eq!(format!("{}", value), "false"),
                1 => assert_eq!(format!("{}", value), "true"),
                _ => assert_eq!(format!("{}", value), "Invalid"),
            }
        }
        assert_eq!(
            AttributeValue::unpack(&[0x02], AttributeDataType::Boolean),
            Err(Error::InvalidValue)
        );
    }

    #[test]
    fn unpack_fixed_width() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x88];
        let (v, used) = AttributeValue::unpack(&data, AttributeDataType::Unsigned24).unwrap();
        assert_eq!((v, used), (AttributeValue::Unsigned24(0x030201), 3));
        let (v, used) = AttributeValue::unpack(&data, AttributeDataType::Unsigned40).unwrap();
        assert_eq!((v, used), (AttributeValue::Unsigned40(0x05_0403_0201), 5));
        let (v, _) = AttributeValue::unpack(&data[3..], AttributeDataType::Signed40).unwrap();
        assert_eq!(v, AttributeValue::Signed40(-0x77_f8f9_fafc));
        let (v, used) = AttributeValue::unpack(&data, AttributeDataType::IeeeAddress).unwrap();
        assert_eq!((v, used), (AttributeValue::IeeeAddress(0x8807_0605_0403_0201), 8));
        assert_eq!(
            AttributeValue::unpack(&data[..2], AttributeDataType::Unsigned32),
            Err(Error::WrongNumberOfBytes)
        );
    }

    #[test]
    fn pack_fixed_width() {
        let mut data = [0u8; 8];
        assert_eq!(AttributeValue::Signed16(-2).pack(&mut data).unwrap(), 2);
        assert_eq!(data[..2], [0xfe, 0xff]);
        assert_eq!(AttributeValue::Unsigned48(0x0605_0403_0201).pack(&mut data).unwrap(), 6);
        assert_eq!(data[..6], [0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
        assert_eq!(AttributeValue::Signed24(-1).pack(&mut data).unwrap(), 3);
        assert_eq!(data[..3], [0xff, 0xff, 0xff]);
        assert_eq!(
            AttributeValue::UtcTime(1).pack(&mut data[..3]),
            Err(Error::NotEnoughSpace)
        );
    }

    #[test]
    fn strings() {
        let data = [0x05, b'h', b'e', b'l', b'l', b'o', 0xaa];
        let (v, used) = AttributeValue::unpack(&data, AttributeDataType::CharacterString).unwrap();
        assert_eq!(used, 6);
        assert_eq!(v, AttributeValue::CharacterString(Some("hello".to_string())));
        let mut out = [0u8; 8];
        assert_eq!(v.pack(&mut out).unwrap(), 6);
        assert_eq!(out[..6], data[..6]);

        let (v, used) = AttributeValue::unpack(&[0xff], AttributeDataType::OctetString).unwrap();
        assert_eq!((v, used), (AttributeValue::OctetString(None), 1));

        let data = [0x03, 0x00, 0x01, 0x02, 0x03];
        let (v, used) = AttributeValue::unpack(&data, AttributeDataType::LongOctetString).unwrap();
        assert_eq!(used, 5);
        assert_eq!(v, AttributeValue::LongOctetString(Some(vec![1, 2, 3])));
        assert_eq!(v.encoded_size(), 5);

        assert_eq!(
            AttributeValue::unpack(&[0x04, 0x00, 0x41], AttributeDataType::LongCharacterString),
            Err(Error::WrongNumberOfBytes)
        );
        assert_eq!(
            AttributeValue::unpack(&[0x01, 0xff], AttributeDataType::CharacterString),
            Err(Error::InvalidString)
        );
    }

    #[test]
    fn composites() {
        // Array of two unsigned 16-bit values
        let data = [0x21, 0x02, 0x00, 0x34, 0x12, 0x78, 0x56];
        let (v, used) = AttributeValue::unpack(&data, AttributeDataType::Array).unwrap();
        assert_eq!(used, 7);
        assert_eq!(
            v,
            AttributeValue::Array(Some(CompositeValue {
                element_type: AttributeDataType::Unsigned16,
                elements: vec![
                    AttributeValue::Unsigned16(0x1234),
                    AttributeValue::Unsigned16(0x5678)
                ],
            }))
        );
        assert_eq!(v.encoded_size(), 7);
        let mut out = [0u8; 16];
        assert_eq!(v.pack(&mut out).unwrap(), 7);
        assert_eq!(out[..7], data);

        // Structure with a boolean and a string
        let data = [0x02, 0x00, 0x10, 0x01, 0x42, 0x01, b'x'];
        let (v, used) = AttributeValue::unpack(&data, AttributeDataType::Structure).unwrap();
        assert_eq!(used, 7);
        assert_eq!(v.element_count(), Some(2));
        assert_eq!(v.encoded_size(), 7);

        // Custom arrays count words
        let data = [0x02, 0x00, 0x01, 0x00, 0x02, 0x00];
        let (v, used) = AttributeValue::unpack(&data, AttributeDataType::CustomArray16).unwrap();
        assert_eq!(used, 6);
        assert_eq!(v, AttributeValue::CustomArray16(Some(vec![1, 2])));
        let data = [0x01, 0x00, 0x01, 0x02, 0x03, 0x04];
        let (v, used) = AttributeValue::unpack(&data, AttributeDataType::CustomArray32).unwrap();
        assert_eq!(used, 6);
        assert_eq!(v, AttributeValue::CustomArray32(Some(vec![0x0403_0201])));

        let (v, used) = AttributeValue::unpack(&[0x20, 0xff, 0xff], AttributeDataType::Bag).unwrap();
        assert_eq!((v, used), (AttributeValue::Bag(None), 3));
    }

    #[test]
    fn semi_precision() {
        assert_eq!(semi_to_f32(0x3c00), 1.0);
        assert_eq!(semi_to_f32(0xc000), -2.0);
        assert_eq!(semi_to_f32(0x0000), 0.0);
        assert!(semi_to_f32(0x7e00).is_nan());
        assert_eq!(AttributeValue::FloatingPoint16(0x7e00).is_valid(), false);
    }

    #[test]
    fn data_type_class() {
        assert!(AttributeDataType::Unsigned8.is_analog());
        assert!(AttributeDataType::UtcTime.is_analog());
        assert!(!AttributeDataType::Boolean.is_analog());
        assert!(!AttributeDataType::Bitmap16.is_analog());
        assert!(!AttributeDataType::Enumeration8.is_analog());
        assert_eq!(AttributeDataType::LongOctetString.length_prefix(), Some(2));
        assert_eq!(AttributeDataType::CharacterString.length_prefix(), Some(1));
        assert_eq!(AttributeDataType::Key128.num_octets(), Some(16));
    }

    #[test]
    fn integers() {
        assert_eq!(
            AttributeValue::from_integer(AttributeDataType::Unsigned16, 0x1234),
            Some(AttributeValue::Unsigned16(0x1234))
        );
        assert_eq!(
            AttributeValue::from_integer(AttributeDataType::Signed8, -5),
            Some(AttributeValue::Signed8(-5))
        );
        assert_eq!(AttributeValue::from_integer(AttributeDataType::Unsigned8, 256), None);
        assert_eq!(AttributeValue::from_integer(AttributeDataType::Unsigned8, -1), None);
        assert_eq!(AttributeValue::Signed16(-3).as_unsigned(), None);
        assert_eq!(AttributeValue::Enumeration8(3).as_unsigned(), Some(3));
        assert_eq!(AttributeValue::from(true).as_bool(), Some(true));
    }

    #[test]
    fn reportable_change() {
        let last = AttributeValue::Unsigned16(100);
        let change = AttributeValue::Unsigned16(10);
        assert_eq!(AttributeValue::Unsigned16(109).change_reaches(&last, &change), Some(false));
        assert_eq!(AttributeValue::Unsigned16(110).change_reaches(&last, &change), Some(true));
        assert_eq!(AttributeValue::Unsigned16(90).change_reaches(&last, &change), Some(true));
        let last = AttributeValue::FloatingPoint32(1.0);
        let change = AttributeValue::FloatingPoint32(0.5);
        assert_eq!(
            AttributeValue::FloatingPoint32(1.4).change_reaches(&last, &change),
            Some(false)
        );
        assert_eq!(
            AttributeValue::Unsigned8(1).change_reaches(&AttributeValue::Signed8(1), &change),
            None
        );
    }

    #[test]
    fn default_values() {
        assert_eq!(
            AttributeValue::default_for(AttributeDataType::Unsigned24),
            AttributeValue::Unsigned24(0)
        );
        assert_eq!(
            AttributeValue::default_for(AttributeDataType::CharacterString),
            AttributeValue::CharacterString(Some(String::new()))
        );
        assert_eq!(
            AttributeValue::default_for(AttributeDataType::Boolean),
            AttributeValue::Boolean(0)
        );
    }

    #[test]
    fn with_type_tag() {
        let mut out = [0u8; 4];
        let used = AttributeValue::Bitmap16(0x0102).pack_with_type(&mut out).unwrap();
        assert_eq!(out[..used], [0x19, 0x02, 0x01]);
        let (v, used) = AttributeValue::unpack_with_type(&out[..3]).unwrap();
        assert_eq!((v, used), (AttributeValue::Bitmap16(0x0102), 3));
    }
}
