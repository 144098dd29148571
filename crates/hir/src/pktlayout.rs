//! Wire-format layouts of the packet headers the lowering engine knows.
//!
//! Raw byte offsets into packet data are resolved against a stack of header
//! layouts, so that an access at offset 22 of an Ethernet-then-IPv4 packet
//! comes back as the IPv4 `ttl` field. Only accesses that start exactly on
//! a field boundary resolve; straddling reads stay raw.

/// One field of a packet header.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HeaderField {
    /// The field's name.
    pub name: String,

    /// The field's width in bytes.
    pub n_bytes: u64,
}

/// The wire layout of one packet header.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HeaderLayout {
    /// The header's name.
    pub name: String,

    /// The header's fields, in wire order.
    pub fields: Vec<HeaderField>,
}

impl HeaderLayout {
    fn new(name: &str, fields: &[(&str, u64)]) -> Self {
        Self {
            name:   name.into(),
            fields: fields
                .iter()
                .map(|(name, n_bytes)| HeaderField {
                    name:    (*name).into(),
                    n_bytes: *n_bytes,
                })
                .collect(),
        }
    }

    /// The Ethernet II header.
    #[must_use]
    pub fn ether() -> Self {
        Self::new("ether", &[("dst", 6), ("src", 6), ("ethertype", 2)])
    }

    /// The IPv4 header, without options.
    #[must_use]
    pub fn ipv4() -> Self {
        Self::new(
            "ipv4",
            &[
                ("vihl", 1),
                ("tos", 1),
                ("tot_len", 2),
                ("id", 2),
                ("frag_off", 2),
                ("ttl", 1),
                ("protocol", 1),
                ("check", 2),
                ("saddr", 4),
                ("daddr", 4),
            ],
        )
    }

    /// The ARP header for IPv4 over Ethernet.
    #[must_use]
    pub fn arp() -> Self {
        Self::new(
            "arp",
            &[
                ("htype", 2),
                ("ptype", 2),
                ("hlen", 1),
                ("plen", 1),
                ("oper", 2),
                ("sha", 6),
                ("spa", 4),
                ("tha", 6),
                ("tpa", 4),
            ],
        )
    }

    /// The TCP header, without options.
    #[must_use]
    pub fn tcp() -> Self {
        Self::new(
            "tcp",
            &[
                ("source", 2),
                ("dest", 2),
                ("seq", 4),
                ("ack_seq", 4),
                ("flags", 2),
                ("window", 2),
                ("check", 2),
                ("urg_ptr", 2),
            ],
        )
    }

    /// The UDP header.
    #[must_use]
    pub fn udp() -> Self {
        Self::new("udp", &[("src", 2), ("dest", 2), ("len", 2), ("check", 2)])
    }

    /// Gets the total size of the header in bytes.
    #[must_use]
    pub fn header_size(&self) -> u64 {
        self.fields.iter().map(|field| field.n_bytes).sum()
    }

    /// Gets the field starting exactly at `offset` bytes into the header,
    /// or [`None`] if no field starts there.
    #[must_use]
    pub fn field_at_offset(&self, offset: u64) -> Option<&HeaderField> {
        let mut start = 0;
        for field in &self.fields {
            if start == offset {
                return Some(field);
            }
            if start > offset {
                break;
            }
            start += field.n_bytes;
        }
        None
    }
}

/// A stack of headers, outermost first, describing the expected shape of
/// the packets an element processes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PacketLayout {
    /// The headers, in wire order.
    pub headers: Vec<HeaderLayout>,
}

impl PacketLayout {
    /// Creates a layout over the given header stack.
    #[must_use]
    pub fn new(headers: Vec<HeaderLayout>) -> Self {
        Self { headers }
    }

    /// Resolves an absolute byte offset into packet data to the header and
    /// field starting exactly there, or [`None`] if the offset is past the
    /// known headers or lands inside a field.
    #[must_use]
    pub fn find_field(&self, offset: u64) -> Option<(&HeaderLayout, &HeaderField)> {
        let mut base = 0;
        for header in &self.headers {
            let size = header.header_size();
            if offset < base + size {
                let field = header.field_at_offset(offset - base)?;
                return Some((header, field));
            }
            base += size;
        }
        None
    }
}

impl Default for PacketLayout {
    /// The layout elements most commonly see: Ethernet, then IPv4, then the
    /// transport headers.
    fn default() -> Self {
        Self::new(vec![
            HeaderLayout::ether(),
            HeaderLayout::ipv4(),
            HeaderLayout::tcp(),
            HeaderLayout::udp(),
        ])
    }
}
