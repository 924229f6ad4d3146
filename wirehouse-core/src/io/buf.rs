use bytes::{Buf, Bytes};
use memchr::memchr;

use crate::error::Error;

/// Bounds-checked readers shared by every wire format.
///
/// Unlike the panicking getters on [`Buf`], each reader here fails with
/// [`Error::Truncated`] when the buffer ends before the field does.
pub trait BufExt: Buf {
    /// Read exactly `n` bytes.
    fn get_bytes(&mut self, n: usize) -> Result<Bytes, Error>;

    /// Read exactly `n` bytes as a UTF-8 string.
    fn get_str(&mut self, n: usize) -> Result<String, Error>;

    /// Read a NUL-terminated string, consuming the terminator.
    fn get_str_nul(&mut self) -> Result<String, Error>;

    /// Read a NUL-terminated byte string, consuming the terminator.
    fn get_bytes_nul(&mut self) -> Result<Bytes, Error>;

    /// Read the rest of the buffer as a UTF-8 string.
    fn get_str_eof(&mut self) -> Result<String, Error>;

    /// Read a little-endian unsigned integer of `width` bytes (1, 2, 3, 4 or 8).
    fn get_uint_n(&mut self, width: usize) -> Result<u64, Error>;
}

fn ensure(buf: &Bytes, needed: usize) -> Result<(), Error> {
    if buf.len() < needed {
        return Err(Error::Truncated {
            needed,
            remaining: buf.len(),
        });
    }

    Ok(())
}

fn to_string(bytes: Bytes) -> Result<String, Error> {
    String::from_utf8(bytes.to_vec()).map_err(|err| err_protocol!("{err}"))
}

impl BufExt for Bytes {
    fn get_bytes(&mut self, n: usize) -> Result<Bytes, Error> {
        ensure(self, n)?;

        Ok(self.split_to(n))
    }

    fn get_str(&mut self, n: usize) -> Result<String, Error> {
        let bytes = self.get_bytes(n)?;

        to_string(bytes)
    }

    fn get_str_nul(&mut self) -> Result<String, Error> {
        let bytes = self.get_bytes_nul()?;

        to_string(bytes)
    }

    fn get_bytes_nul(&mut self) -> Result<Bytes, Error> {
        let nul = memchr(b'\0', self).ok_or(Error::Truncated {
            needed: self.len() + 1,
            remaining: self.len(),
        })?;

        let bytes = self.split_to(nul);
        self.advance(1);

        Ok(bytes)
    }

    fn get_str_eof(&mut self) -> Result<String, Error> {
        let bytes = self.split_to(self.len());

        to_string(bytes)
    }

    fn get_uint_n(&mut self, width: usize) -> Result<u64, Error> {
        match width {
            1 | 2 | 3 | 4 | 8 => Ok(self.try_get_uint_le(width)?),
            _ => Err(err_protocol!("unsupported fixed integer width: {width}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::{Buf, Bytes};

    use super::BufExt;
    use crate::error::Error;

    #[test]
    fn test_get_str() -> Result<(), Error> {
        let mut buf = Bytes::from_static(b"Hello World\0");

        let s = buf.get_str(5)?;

        buf.advance(1);

        let s2 = buf.get_str(5)?;

        assert_eq!(&s, "Hello");
        assert_eq!(&s2, "World");

        Ok(())
    }

    #[test]
    fn test_get_str_nul() -> Result<(), Error> {
        let mut buf = Bytes::from_static(b"Hello\0 World\0");

        let s = buf.get_str_nul()?;

        buf.advance(1);

        let s2 = buf.get_str_nul()?;

        assert_eq!(&s, "Hello");
        assert_eq!(&s2, "World");
        assert!(buf.is_empty());

        Ok(())
    }

    #[test]
    fn test_get_str_nul_without_terminator() {
        let mut buf = Bytes::from_static(b"root");

        assert!(matches!(
            buf.get_str_nul(),
            Err(Error::Truncated {
                needed: 5,
                remaining: 4
            })
        ));
    }

    #[test]
    fn test_get_bytes_past_end() {
        let mut buf = Bytes::from_static(b"\x01\x02");

        assert!(matches!(
            buf.get_bytes(3),
            Err(Error::Truncated {
                needed: 3,
                remaining: 2
            })
        ));

        // nothing consumed on failure
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn test_get_uint_n() -> Result<(), Error> {
        let mut buf = Bytes::from_static(b"\x01\x02\x00\x03\x00\x00\x04\x00\x00\x00");

        assert_eq!(buf.get_uint_n(1)?, 1);
        assert_eq!(buf.get_uint_n(2)?, 2);
        assert_eq!(buf.get_uint_n(3)?, 3);
        assert_eq!(buf.get_uint_n(4)?, 4);
        assert!(matches!(buf.get_uint_n(8), Err(Error::Truncated { .. })));

        Ok(())
    }
}
