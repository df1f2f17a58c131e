//! Primitive types.
//!
//! # References
//! - <https://kafka.apache.org/protocol#protocol_types>

use std::io::{Read, Write};

use super::traits::{ReadError, ReadType, WriteError, WriteType};

/// Upper bound for the up-front allocation when a length prefix claims a large payload.
///
/// Lengths come from the wire, so the buffer only grows as bytes actually arrive.
const MAX_PREALLOC: usize = 8 * 1024;

fn read_bytes<R: Read>(reader: &mut R, len: usize) -> Result<Vec<u8>, ReadError> {
    let mut buf = Vec::with_capacity(len.min(MAX_PREALLOC));
    reader.take(u64::try_from(len)?).read_to_end(&mut buf)?;
    if buf.len() != len {
        return Err(ReadError::IO(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("expected {len} bytes but got {}", buf.len()),
        )));
    }

    Ok(buf)
}

impl<R> ReadType<R> for i16
where
    R: Read,
{
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let mut buf = [0u8; 2];
        reader.read_exact(&mut buf)?;
        Ok(i16::from_be_bytes(buf))
    }
}

impl<W> WriteType<W> for i16
where
    W: Write,
{
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        let buf = self.to_be_bytes();
        writer.write_all(&buf)?;
        Ok(())
    }
}

impl<R: Read> ReadType<R> for i32 {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf)?;
        Ok(i32::from_be_bytes(buf))
    }
}

impl<W: Write> WriteType<W> for i32 {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        let buf = self.to_be_bytes();
        writer.write_all(&buf)?;
        Ok(())
    }
}

// STRING
impl<R: Read> ReadType<R> for String {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let len = i16::read(reader)?;
        let len = usize::try_from(len).map_err(|e| ReadError::Malformed(Box::new(e)))?;
        let buf = read_bytes(reader, len)?;
        let s = String::from_utf8(buf).map_err(|e| ReadError::Malformed(Box::new(e)))?;
        Ok(s)
    }
}

impl<W: Write> WriteType<W> for String {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        let len = i16::try_from(self.len()).map_err(WriteError::Overflow)?;
        len.write(writer)?;
        writer.write_all(self.as_bytes())?;
        Ok(())
    }
}

// NULLABLE_STRING
impl<R: Read> ReadType<R> for Option<String> {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let len = i16::read(reader)?;

        match len {
            l if l < -1 => Err(ReadError::Malformed(
                format!("Invalid negative length for nullable string: {}", l).into(),
            )),
            -1 => Ok(None),
            l => {
                let len = usize::try_from(l)?;
                let buf = read_bytes(reader, len)?;
                let s = String::from_utf8(buf).map_err(|e| ReadError::Malformed(Box::new(e)))?;
                Ok(Some(s))
            }
        }
    }
}

impl<W: Write> WriteType<W> for Option<String> {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        match &self {
            Some(s) => {
                let l =
                    i16::try_from(s.len()).map_err(|err| WriteError::Malformed(Box::new(err)))?;
                l.write(writer)?;
                writer.write_all(s.as_bytes())?;
                Ok(())
            }
            None => (-1i16).write(writer),
        }
    }
}

// BYTES
impl<R: Read> ReadType<R> for Vec<u8> {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let len = i32::read(reader)?;
        match len {
            l if l < -1 => Err(ReadError::Malformed(
                format!("Invalid length for bytes: {}", l).into(),
            )),
            // null user data is legal in the consumer protocol
            -1 | 0 => Ok(vec![]),
            l => {
                let len = usize::try_from(l)?;
                read_bytes(reader, len)
            }
        }
    }
}

impl<W: Write> WriteType<W> for Vec<u8> {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        let l = i32::try_from(self.len()).map_err(|err| WriteError::Malformed(Box::new(err)))?;
        l.write(writer)?;
        writer.write_all(self)?;
        Ok(())
    }
}

// ARRAY<STRING>
impl<R: Read> ReadType<R> for Vec<String> {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let len = i32::read(reader)?;
        if len == -1 {
            Ok(vec![])
        } else {
            let len = usize::try_from(len)?;
            let mut res = Vec::with_capacity(len.min(MAX_PREALLOC));
            for _ in 0..len {
                res.push(String::read(reader)?);
            }

            Ok(res)
        }
    }
}

impl<W> WriteType<W> for Vec<String>
where
    W: Write,
{
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        let len = i32::try_from(self.len())?;
        len.write(writer)?;

        for elmt in self {
            elmt.write(writer)?;
        }

        Ok(())
    }
}

// ARRAY<INT32>
impl<R: Read> ReadType<R> for Vec<i32> {
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let len = i32::read(reader)?;
        if len == -1 {
            Ok(vec![])
        } else {
            let len = usize::try_from(len)?;
            let mut res = Vec::with_capacity(len.min(MAX_PREALLOC));
            for _ in 0..len {
                res.push(i32::read(reader)?);
            }

            Ok(res)
        }
    }
}

impl<W: Write> WriteType<W> for Vec<i32> {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        let len = i32::try_from(self.len())?;
        len.write(writer)?;

        for elmt in self {
            elmt.write(writer)?;
        }

        Ok(())
    }
}
