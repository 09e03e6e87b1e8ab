use std::io::{self, Read, Write};

use crate::error::{Error, Result};

/// Unsigned LEB128.
pub fn write_u64<W: Write>(writer: &mut W, mut value: u64) -> io::Result<()> {
    let mut buf = [0u8; 10];
    let mut len = 0;
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf[len] = byte;
            len += 1;
            break;
        }
        buf[len] = byte | 0x80;
        len += 1;
    }
    writer.write_all(&buf[..len])
}

pub fn read_u64<R: Read>(reader: &mut R, what: &str) -> Result<u64> {
    let mut value = 0u64;
    for i in 0..10 {
        let mut byte = [0u8; 1];
        reader
            .read_exact(&mut byte)
            .map_err(|e| Error::from_read(e, what))?;
        let payload = (byte[0] & 0x7f) as u64;
        if i == 9 && payload > 1 {
            return Err(Error::corrupt(format!("{} overflows 64 bits", what)));
        }
        value |= payload << (7 * i);
        if byte[0] & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(Error::corrupt(format!("{} varint is too long", what)))
}

pub fn read_u32<R: Read>(reader: &mut R, what: &str) -> Result<u32> {
    let value = read_u64(reader, what)?;
    u32::try_from(value).map_err(|_| Error::corrupt(format!("{} {} is out of range", what, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode(value: u64) -> Vec<u8> {
        let mut buf = Vec::new();
        write_u64(&mut buf, value).unwrap();
        buf
    }

    #[test]
    fn known_encodings() {
        assert_eq!(encode(0), vec![0x00]);
        assert_eq!(encode(127), vec![0x7f]);
        assert_eq!(encode(128), vec![0x80, 0x01]);
        assert_eq!(encode(44100), vec![0xc4, 0xd8, 0x02]);
        assert_eq!(encode(u64::MAX).len(), 10);
    }

    #[test]
    fn reads_back_extremes() {
        for value in [0, 1, 300, u32::MAX as u64, u64::MAX] {
            let mut cursor = Cursor::new(encode(value));
            assert_eq!(read_u64(&mut cursor, "value").unwrap(), value);
        }
    }

    #[test]
    fn rejects_overlong_and_truncated_input() {
        let mut overlong = Cursor::new(vec![0xffu8; 11]);
        assert!(matches!(
            read_u64(&mut overlong, "value"),
            Err(Error::CorruptDocument(_))
        ));

        let mut truncated = Cursor::new(vec![0x80u8]);
        assert!(matches!(
            read_u64(&mut truncated, "value"),
            Err(Error::CorruptDocument(_))
        ));

        let mut too_big = Cursor::new(encode(u32::MAX as u64 + 1));
        assert!(matches!(
            read_u32(&mut too_big, "value"),
            Err(Error::CorruptDocument(_))
        ));
    }
}
