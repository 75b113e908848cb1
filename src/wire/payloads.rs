use bytes::{Buf, BufMut};

use super::codec::{self, CodecError, WireDecode, WireEncode};

/// A request to read one log address.
///
/// `cacheable_on_server` travels with the request untouched; only the log
/// unit that serves the read interprets it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRequest {
    pub address: i64,
    pub cacheable_on_server: bool,
}

impl WireEncode for ReadRequest {
    fn encode<B: BufMut>(&self, buf: &mut B) {
        codec::put_i64(buf, self.address);
        codec::put_bool(buf, self.cacheable_on_server);
    }
}

impl WireDecode for ReadRequest {
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, CodecError> {
        Ok(ReadRequest {
            address: codec::get_i64(buf)?,
            cacheable_on_server: codec::get_bool(buf)?,
        })
    }
}

/// A request to read multiple log addresses in one shot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipleReadRequest {
    pub addresses: Vec<i64>,
    pub cacheable_on_server: bool,
}

impl WireEncode for MultipleReadRequest {
    fn encode<B: BufMut>(&self, buf: &mut B) {
        codec::put_list(buf, &self.addresses);
        codec::put_bool(buf, self.cacheable_on_server);
    }
}

impl WireDecode for MultipleReadRequest {
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, CodecError> {
        Ok(MultipleReadRequest {
            addresses: codec::get_list(buf)?,
            cacheable_on_server: codec::get_bool(buf)?,
        })
    }
}
