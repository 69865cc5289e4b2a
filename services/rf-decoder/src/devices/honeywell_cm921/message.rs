//! Decoded message layout
//!
//! ```text
//! header | device id x N | command (BE u16) | len | payload[len] | unparsed.. | checksum
//! ```
//! `N` is bits 2..3 of the header. The checksum makes the byte sum of the
//! whole message zero.

use super::device_id::DeviceId;
use crate::error::Rejection;
use crate::integrity::byte_sum;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: u8,
    pub device_ids: Vec<DeviceId>,
    pub command: u16,
    pub payload: Vec<u8>,
    /// Bytes between the payload and the checksum
    pub unparsed: Vec<u8>,
    pub checksum: u8,
}

impl Message {
    /// Validate the byte sum and split a decoded message into its parts
    pub fn parse(bytes: &[u8]) -> Result<Self, Rejection> {
        let (&checksum, body) = bytes.split_last().ok_or(Rejection::AbortLength)?;
        if byte_sum(bytes) != 0 {
            return Err(Rejection::FailIntegrity);
        }

        let mut cursor = Cursor::new(body);
        let header = cursor.u8()?;
        let id_count = usize::from((header >> 2) & 0x03);

        let device_ids = (0..id_count)
            .map(|_| cursor.array::<3>().map(DeviceId::new))
            .collect::<Result<Vec<_>, _>>()?;

        let command = u16::from_be_bytes(cursor.array::<2>()?);
        let payload_len = usize::from(cursor.u8()?);
        let payload = cursor.take(payload_len)?.to_vec();
        let unparsed = cursor.rest().to_vec();

        Ok(Self {
            header,
            device_ids,
            command,
            payload,
            unparsed,
            checksum,
        })
    }
}

struct Cursor<'a> {
    data: &'a [u8],
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], Rejection> {
        if n > self.data.len() {
            return Err(Rejection::FailSanity);
        }
        let (head, tail) = self.data.split_at(n);
        self.data = tail;
        Ok(head)
    }

    fn u8(&mut self) -> Result<u8, Rejection> {
        Ok(self.take(1)?[0])
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], Rejection> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn rest(&mut self) -> &'a [u8] {
        std::mem::take(&mut self.data)
    }
}
