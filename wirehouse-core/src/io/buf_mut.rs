/// Writers shared by every wire format. All writers append.
pub trait BufMutExt {
    /// Write a string followed by a NUL terminator.
    fn put_str_nul(&mut self, s: &str);

    /// Write the low `width` bytes of `v`, little-endian.
    fn put_uint_le(&mut self, v: u64, width: usize);
}

impl BufMutExt for Vec<u8> {
    fn put_str_nul(&mut self, s: &str) {
        self.extend(s.as_bytes());
        self.push(0);
    }

    fn put_uint_le(&mut self, v: u64, width: usize) {
        let bytes = v.to_le_bytes();
        self.extend_from_slice(&bytes[..width.min(bytes.len())]);
    }
}

#[cfg(test)]
mod tests {
    use super::BufMutExt;

    #[test]
    fn test_put_str_nul() {
        let mut buf = Vec::new();
        buf.put_str_nul("mysql_native_password");

        assert_eq!(&buf[..], b"mysql_native_password\0");
    }

    #[test]
    fn test_put_uint_le() {
        let mut buf = Vec::new();
        buf.put_uint_le(0x00_12_34_56, 3);
        buf.put_uint_le(7, 2);

        assert_eq!(&buf[..], b"\x56\x34\x12\x07\x00");
    }
}
