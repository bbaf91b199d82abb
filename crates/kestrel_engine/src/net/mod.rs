//! Network boundary
//!
//! Only the packet format lives here. Sockets and connection state belong to
//! the networking layer, which hands packets to the scene through a bounded
//! queue or the message bus.

mod packet;

pub use packet::{Channel, Packet, PacketError, PacketId, PacketReader, PacketWriter, HEADER_LEN, MAX_STRING_LEN};
