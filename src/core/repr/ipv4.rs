use std;

use byteorder::{
    ByteOrder,
    NetworkEndian,
};

use core::check::internet_checksum;
use {
    Error,
    Result,
};

/// [IPv4 address](https://en.wikipedia.org/wiki/IPv4) in network byte order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 4]);

impl Address {
    /// Creates an IPv4 address from a network byte order buffer.
    pub fn new(addr: [u8; 4]) -> Address {
        Address(addr)
    }

    /// Creates an IPv4 address from a network byte order slice.
    pub fn try_new(addr: &[u8]) -> Result<Address> {
        if addr.len() != 4 {
            return Err(Error::Exhausted);
        }

        let mut _addr: [u8; 4] = [0; 4];
        _addr.copy_from_slice(addr);
        Ok(Address(_addr))
    }

    /// Creates an IPv4 address from its numeric form, e.g. 0x0A000001 for 10.0.0.1.
    pub fn from_u32(addr: u32) -> Address {
        let mut _addr: [u8; 4] = [0; 4];
        NetworkEndian::write_u32(&mut _addr, addr);
        Address(_addr)
    }

    /// Returns the numeric form of the address.
    pub fn as_u32(&self) -> u32 {
        NetworkEndian::read_u32(&self.0)
    }

    /// Returns a reference to the network byte order representation of the address.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<u32> for Address {
    fn from(addr: u32) -> Address {
        Address::from_u32(addr)
    }
}

impl From<Address> for u32 {
    fn from(addr: Address) -> u32 {
        addr.as_u32()
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}.{}.{}.{}", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

impl std::str::FromStr for Address {
    type Err = ();

    /// Parses an Ipv4 address from an A.B.C.D style string.
    fn from_str(addr: &str) -> std::result::Result<Address, Self::Err> {
        let bytes = addr.split(".")
            .map(|token| token.parse::<u8>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| ())?;

        Address::try_new(&bytes).map_err(|_| ())
    }
}

/// https://www.iana.org/assignments/protocol-numbers/protocol-numbers.xhtml
pub mod protocols {
    pub const ICMP: u8 = 1;

    pub const TCP: u8 = 6;

    pub const UDP: u8 = 17;
}

/// Values for the 3 bit flags field.
pub mod flags {
    pub const DONT_FRAGMENT: u8 = 0b010;
}

mod fields {
    use std::ops::Range;

    pub const VERSION_IHL: usize = 0;

    pub const TOS: usize = 1;

    pub const PACKET_LEN: Range<usize> = 2 .. 4;

    pub const IDENTIFICATION: Range<usize> = 4 .. 6;

    pub const FLAGS_FRAGMENT_OFFSET: Range<usize> = 6 .. 8;

    pub const TTL: usize = 8;

    pub const PROTOCOL: usize = 9;

    pub const CHECKSUM: Range<usize> = 10 .. 12;

    pub const SRC_ADDR: Range<usize> = 12 .. 16;

    pub const DST_ADDR: Range<usize> = 16 .. 20;

    pub const OPTIONS: usize = 20;
}

/// Safe representation of an IPv4 header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Repr {
    pub tos: u8,
    /// Total length of the datagram, header included.
    pub packet_len: u16,
    pub identification: u16,
    pub flags: u8,
    pub fragment_offset: u16,
    pub ttl: u8,
    pub protocol: u8,
    pub checksum: u16,
    pub src_addr: Address,
    pub dst_addr: Address,
    /// Raw options, a multiple of 4 bytes long.
    pub options: Vec<u8>,
}

impl Repr {
    pub const MIN_HEADER_LEN: usize = 20;

    pub const MAX_HEADER_LEN: usize = 60;

    pub const DEFAULT_TTL: u8 = 64;

    /// Returns the length of the serialized header, options included.
    pub fn header_len(&self) -> usize {
        Self::MIN_HEADER_LEN + self.options.len()
    }

    /// Tries to deserialize the header at the start of a buffer.
    ///
    /// The checksum is verified, but the total length is only checked to be
    /// consistent with the header length. See `Datagram::deserialize(...)`.
    pub fn deserialize(buffer: &[u8]) -> Result<Repr> {
        if buffer.len() < Self::MIN_HEADER_LEN {
            return Err(Error::Exhausted);
        }

        let version = buffer[fields::VERSION_IHL] >> 4;
        let header_len = ((buffer[fields::VERSION_IHL] & 0x0F) as usize) * 4;
        let packet_len = NetworkEndian::read_u16(&buffer[fields::PACKET_LEN]);

        if version != 4 || header_len < Self::MIN_HEADER_LEN || header_len > buffer.len()
            || (packet_len as usize) < header_len
        {
            return Err(Error::Malformed);
        }

        if internet_checksum(&buffer[.. header_len]) != 0 {
            return Err(Error::Checksum);
        }

        let flags_fragment_offset = NetworkEndian::read_u16(&buffer[fields::FLAGS_FRAGMENT_OFFSET]);

        Ok(Repr {
            tos: buffer[fields::TOS],
            packet_len,
            identification: NetworkEndian::read_u16(&buffer[fields::IDENTIFICATION]),
            flags: (flags_fragment_offset >> 13) as u8,
            fragment_offset: flags_fragment_offset & 0x1FFF,
            ttl: buffer[fields::TTL],
            protocol: buffer[fields::PROTOCOL],
            checksum: NetworkEndian::read_u16(&buffer[fields::CHECKSUM]),
            src_addr: Address::try_new(&buffer[fields::SRC_ADDR])?,
            dst_addr: Address::try_new(&buffer[fields::DST_ADDR])?,
            options: buffer[fields::OPTIONS .. header_len].to_vec(),
        })
    }

    /// Serializes the header, as is, into a buffer.
    ///
    /// The checksum is written verbatim; call compute_checksum() after
    /// mutating any field.
    pub fn serialize(&self, buffer: &mut [u8]) -> Result<()> {
        let header_len = self.header_len();

        if self.options.len() % 4 != 0 || header_len > Self::MAX_HEADER_LEN {
            return Err(Error::Malformed);
        }

        if header_len > buffer.len() {
            return Err(Error::Exhausted);
        }

        buffer[fields::VERSION_IHL] = 0x40 | (header_len / 4) as u8;
        buffer[fields::TOS] = self.tos;
        NetworkEndian::write_u16(&mut buffer[fields::PACKET_LEN], self.packet_len);
        NetworkEndian::write_u16(&mut buffer[fields::IDENTIFICATION], self.identification);
        NetworkEndian::write_u16(
            &mut buffer[fields::FLAGS_FRAGMENT_OFFSET],
            ((self.flags as u16 & 0x07) << 13) | (self.fragment_offset & 0x1FFF),
        );
        buffer[fields::TTL] = self.ttl;
        buffer[fields::PROTOCOL] = self.protocol;
        NetworkEndian::write_u16(&mut buffer[fields::CHECKSUM], self.checksum);
        buffer[fields::SRC_ADDR].copy_from_slice(self.src_addr.as_bytes());
        buffer[fields::DST_ADDR].copy_from_slice(self.dst_addr.as_bytes());
        buffer[fields::OPTIONS .. header_len].copy_from_slice(&self.options);

        Ok(())
    }

    /// Recomputes the header checksum in place.
    pub fn compute_checksum(&mut self) {
        self.checksum = 0;

        let mut buffer = [0; Self::MAX_HEADER_LEN];
        let header_len = self.header_len();

        match self.serialize(&mut buffer) {
            Ok(_) => self.checksum = internet_checksum(&buffer[.. header_len]),
            Err(err) => warn!(
                "Unable to checksum IPv4 header with {} option bytes: {:?}.",
                self.options.len(),
                err
            ),
        }
    }
}

/// An IPv4 datagram, i.e. a header plus an opaque payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Datagram {
    pub header: Repr,
    pub payload: Vec<u8>,
}

impl Datagram {
    /// Creates a datagram without options and with a valid checksum.
    ///
    /// Fails with `Error::Exhausted` if the payload does not fit within the
    /// 16 bit total length of a datagram.
    pub fn new(
        src_addr: Address,
        dst_addr: Address,
        protocol: u8,
        ttl: u8,
        payload: Vec<u8>,
    ) -> Result<Datagram> {
        let packet_len = Repr::MIN_HEADER_LEN + payload.len();
        if packet_len > u16::max_value() as usize {
            return Err(Error::Exhausted);
        }

        let mut header = Repr {
            tos: 0,
            packet_len: packet_len as u16,
            identification: 0,
            flags: flags::DONT_FRAGMENT,
            fragment_offset: 0,
            ttl,
            protocol,
            checksum: 0,
            src_addr,
            dst_addr,
            options: Vec::new(),
        };
        header.compute_checksum();

        Ok(Datagram { header, payload })
    }

    /// Returns the size of the datagram when serialized to a buffer.
    pub fn buffer_len(&self) -> usize {
        self.header.header_len() + self.payload.len()
    }

    /// Tries to deserialize a buffer into a datagram.
    ///
    /// Bytes past the total length in the header, e.g. link layer padding,
    /// are ignored.
    pub fn deserialize(buffer: &[u8]) -> Result<Datagram> {
        let header = Repr::deserialize(buffer)?;
        let packet_len = header.packet_len as usize;

        if packet_len > buffer.len() {
            return Err(Error::Malformed);
        }

        let payload = buffer[header.header_len() .. packet_len].to_vec();

        Ok(Datagram { header, payload })
    }

    /// Serializes the datagram into a buffer.
    ///
    /// You should ensure buffer has at least buffer_len() bytes to avoid errors.
    pub fn serialize(&self, buffer: &mut [u8]) -> Result<()> {
        if self.buffer_len() > buffer.len() {
            return Err(Error::Exhausted);
        }

        let header_len = self.header.header_len();
        self.header.serialize(buffer)?;
        buffer[header_len .. self.buffer_len()].copy_from_slice(&self.payload);

        Ok(())
    }
}
