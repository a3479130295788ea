/// Creates an enum with various traits.
/// Conversion from the underlying type fails with `Error::InvalidValue` for
/// values without a variant.
#[macro_export]
macro_rules! extended_enum {
    ($(#[$outer:meta])* $name:ident, $ty:ty, $($(#[$inner:meta])* $var:ident => $val:expr),+ $(,)*) => (

        $(#[$outer])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum $name {
            $(
                $(#[$inner])*
                $var,
            )*
        }

        impl core::convert::TryFrom<$ty> for $name {
            type Error = $crate::error::Error;

            fn try_from(v: $ty) -> Result<Self, Self::Error> {
                match v {
                    $( $val => Ok($name::$var),)*
                    _ => Err($crate::error::Error::InvalidValue),
                }
            }
        }

        impl From<$name> for $ty {
            fn from(v: $name) -> Self {
                match v {
                    $( $name::$var => $val, )*
                }
            }
        }

        impl PartialEq<$name> for $ty {
            fn eq(&self, other: &$name) -> bool {
                match *other {
                    $( $name::$var => *self == $val, )*
                }
            }
        }
    );
}

/// Ensure that `data` holds at least `length` bytes
pub(crate) fn check_length(data: &[u8], length: usize) -> Result<(), crate::Error> {
    if data.len() < length {
        Err(crate::Error::WrongNumberOfBytes)
    } else {
        Ok(())
    }
}

/// Little endian field reader over a command payload
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub(crate) fn u8(&mut self) -> Result<u8, crate::Error> {
        check_length(&self.data[self.offset..], 1)?;
        let value = self.data[self.offset];
        self.offset += 1;
        Ok(value)
    }

    pub(crate) fn u16(&mut self) -> Result<u16, crate::Error> {
        check_length(&self.data[self.offset..], 2)?;
        let value = u16::from_le_bytes([self.data[self.offset], self.data[self.offset + 1]]);
        self.offset += 2;
        Ok(value)
    }

    pub(crate) fn i16(&mut self) -> Result<i16, crate::Error> {
        Ok(self.u16()? as i16)
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }
}

/// Little endian field writer into a command payload
pub(crate) struct Writer<'a> {
    data: &'a mut [u8],
    offset: usize,
}

impl<'a> Writer<'a> {
    pub(crate) fn new(data: &'a mut [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub(crate) fn u8(&mut self, value: u8) -> Result<(), crate::Error> {
        if self.data.len() < self.offset + 1 {
            return Err(crate::Error::NotEnoughSpace);
        }
        self.data[self.offset] = value;
        self.offset += 1;
        Ok(())
    }

    pub(crate) fn u16(&mut self, value: u16) -> Result<(), crate::Error> {
        if self.data.len() < self.offset + 2 {
            return Err(crate::Error::NotEnoughSpace);
        }
        self.data[self.offset..self.offset + 2].copy_from_slice(&value.to_le_bytes());
        self.offset += 2;
        Ok(())
    }

    pub(crate) fn i16(&mut self, value: i16) -> Result<(), crate::Error> {
        self.u16(value as u16)
    }

    pub(crate) fn used(&self) -> usize {
        self.offset
    }
}
