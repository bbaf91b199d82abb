//! Packet framing and payload codec
//!
//! Integers, floats and string lengths are little-endian. Plain-data values
//! written with [`PacketWriter::write_pod`] keep their in-memory layout and are
//! meant for peers built for the same target.

use bytemuck::Pod;

/// Longest string a packet may carry
pub const MAX_STRING_LEN: usize = u16::MAX as usize;

/// Bytes in front of every encoded payload: id, channel, u32 length
pub const HEADER_LEN: usize = 6;

/// Packet errors
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    /// Ran out of input while reading
    #[error("Unexpected end of packet: needed {needed} bytes, {remaining} left")]
    UnexpectedEnd {
        /// Bytes the read wanted
        needed: usize,
        /// Bytes that were left
        remaining: usize,
    },

    /// A string was not valid UTF-8
    #[error("Invalid UTF-8 in packet string: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// A string exceeded [`MAX_STRING_LEN`]
    #[error("String of {len} bytes exceeds limit of {max}")]
    StringTooLong {
        /// Length of the string
        len: usize,
        /// Allowed maximum
        max: usize,
    },

    /// The header named a channel that does not exist
    #[error("Unknown channel {0}")]
    UnknownChannel(u8),
}

/// Application-defined packet type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacketId(pub u8);

/// Delivery guarantee requested for a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Channel {
    /// Resent until acknowledged, in order
    #[default]
    Reliable,
    /// Sent once, may be lost
    Unreliable,
}

impl Channel {
    fn to_byte(self) -> u8 {
        match self {
            Channel::Reliable => 0,
            Channel::Unreliable => 1,
        }
    }

    fn from_byte(byte: u8) -> Result<Self, PacketError> {
        match byte {
            0 => Ok(Channel::Reliable),
            1 => Ok(Channel::Unreliable),
            other => Err(PacketError::UnknownChannel(other)),
        }
    }
}

/// A framed message handed to or received from the network layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Packet type
    pub id: PacketId,
    /// Delivery guarantee
    pub channel: Channel,
    /// Encoded body
    pub payload: Vec<u8>,
}

impl Packet {
    /// Packet with an empty payload
    pub fn new(id: PacketId, channel: Channel) -> Self {
        Self {
            id,
            channel,
            payload: Vec::new(),
        }
    }

    /// Reader over the payload
    pub fn reader(&self) -> PacketReader<'_> {
        PacketReader::new(&self.payload)
    }

    /// Header plus payload, ready for the socket
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.reserve(HEADER_LEN + self.payload.len());
        out.push(self.id.0);
        out.push(self.channel.to_byte());
        out.extend_from_slice(&(self.payload.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.payload);
    }

    /// Decode one packet from the front of `bytes`, returning it and the bytes consumed
    pub fn decode(bytes: &[u8]) -> Result<(Self, usize), PacketError> {
        let mut reader = PacketReader::new(bytes);
        let id = PacketId(reader.read_u8()?);
        let channel = Channel::from_byte(reader.read_u8()?)?;
        let len = reader.read_u32()? as usize;
        let payload = reader.read_bytes(len)?.to_vec();
        Ok((Self { id, channel, payload }, reader.position()))
    }
}

/// Builds a packet payload
#[derive(Debug, Default)]
pub struct PacketWriter {
    buffer: Vec<u8>,
}

impl PacketWriter {
    /// Empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Writer with room for `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Bytes written so far
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing has been written
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Append raw bytes
    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buffer.extend_from_slice(bytes);
        self
    }

    /// Append a plain-data value in its in-memory layout
    pub fn write_pod<T: Pod>(&mut self, value: &T) -> &mut Self {
        self.write_bytes(bytemuck::bytes_of(value))
    }

    /// Append one byte
    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.buffer.push(value);
        self
    }

    /// Append a little-endian u16
    pub fn write_u16(&mut self, value: u16) -> &mut Self {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Append a little-endian u32
    pub fn write_u32(&mut self, value: u32) -> &mut Self {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Append a little-endian f32
    pub fn write_f32(&mut self, value: f32) -> &mut Self {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Append a u32 length prefix and the UTF-8 bytes of `value`
    pub fn write_string(&mut self, value: &str) -> Result<&mut Self, PacketError> {
        if value.len() > MAX_STRING_LEN {
            return Err(PacketError::StringTooLong {
                len: value.len(),
                max: MAX_STRING_LEN,
            });
        }
        self.write_u32(value.len() as u32);
        Ok(self.write_bytes(value.as_bytes()))
    }

    /// Wrap the payload in a packet
    pub fn finish(self, id: PacketId, channel: Channel) -> Packet {
        Packet {
            id,
            channel,
            payload: self.buffer,
        }
    }
}

/// Reads values back out of a payload
#[derive(Debug, Clone)]
pub struct PacketReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> PacketReader<'a> {
    /// Reader positioned at the start of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Bytes consumed
    pub fn position(&self) -> usize {
        self.position
    }

    /// Bytes left
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Whether everything has been read
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Take the next `len` bytes
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], PacketError> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(PacketError::UnexpectedEnd {
                needed: len,
                remaining,
            });
        }
        let bytes = &self.data[self.position..self.position + len];
        self.position += len;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], PacketError> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.read_bytes(N)?);
        Ok(array)
    }

    /// Read a plain-data value written by [`PacketWriter::write_pod`]
    pub fn read_pod<T: Pod>(&mut self) -> Result<T, PacketError> {
        let bytes = self.read_bytes(std::mem::size_of::<T>())?;
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    /// Read one byte
    pub fn read_u8(&mut self) -> Result<u8, PacketError> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Read a little-endian u16
    pub fn read_u16(&mut self) -> Result<u16, PacketError> {
        self.read_array().map(u16::from_le_bytes)
    }

    /// Read a little-endian u32
    pub fn read_u32(&mut self) -> Result<u32, PacketError> {
        self.read_array().map(u32::from_le_bytes)
    }

    /// Read a little-endian f32
    pub fn read_f32(&mut self) -> Result<f32, PacketError> {
        self.read_array().map(f32::from_le_bytes)
    }

    /// Read a string written by [`PacketWriter::write_string`]
    pub fn read_str(&mut self) -> Result<&'a str, PacketError> {
        let len = self.read_u32()? as usize;
        if len > MAX_STRING_LEN {
            return Err(PacketError::StringTooLong {
                len,
                max: MAX_STRING_LEN,
            });
        }
        Ok(std::str::from_utf8(self.read_bytes(len)?)?)
    }

    /// Owned form of [`read_str`](Self::read_str)
    pub fn read_string(&mut self) -> Result<String, PacketError> {
        self.read_str().map(str::to_owned)
    }
}
