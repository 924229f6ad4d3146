use crate::error::Error;

/// Encode a single packet payload, appending to `buf`.
pub trait ProtocolEncode<'en, Context = ()> {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), Error>
    where
        Self: ProtocolEncode<'en, ()>,
    {
        self.encode_with(buf, ())
    }

    fn encode_with(&self, buf: &mut Vec<u8>, context: Context) -> Result<(), Error>;
}

impl<C> ProtocolEncode<'_, C> for [u8] {
    fn encode_with(&self, buf: &mut Vec<u8>, _context: C) -> Result<(), Error> {
        buf.extend_from_slice(self);
        Ok(())
    }
}

impl<'en, C, T> ProtocolEncode<'en, C> for &'_ T
where
    T: ProtocolEncode<'en, C> + ?Sized,
{
    #[inline]
    fn encode_with(&self, buf: &mut Vec<u8>, context: C) -> Result<(), Error> {
        (**self).encode_with(buf, context)
    }
}
