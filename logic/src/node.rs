use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Instant;

use crate::consts::{ALLOWED_UNANSWERED, GOOD_INTERVAL};
use crate::error::Error;
use crate::id::Id;

/// Size in bytes of a packed (compact) node: 20-byte id, 4-byte IPv4,
/// 2-byte port, both network (big-endian) order.
pub const PACKED_NODE_LEN: usize = 26;

/// A single entry in the routing table: an id paired with the freshness
/// bookkeeping needed to classify it as good, questionable, or bad.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Node {
    id: Id,
    addr: SocketAddrV4,
    last_seen_good: Option<Instant>,
    unanswered_queries: u32,
}

impl Node {
    pub fn new(id: Id, addr: SocketAddrV4) -> Self {
        Node {
            id,
            addr,
            last_seen_good: None,
            unanswered_queries: 0,
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn addr(&self) -> SocketAddrV4 {
        self.addr
    }

    /// A node is good if it has replied to one of our queries (or sent us
    /// one) within the last [`GOOD_INTERVAL`].
    pub fn is_good_at(&self, now: Instant) -> bool {
        self.last_seen_good
            .map(|t| now.saturating_duration_since(t) < GOOD_INTERVAL)
            .unwrap_or(false)
    }

    /// A node is bad once [`ALLOWED_UNANSWERED`] consecutive queries have
    /// gone unanswered and it hasn't redeemed itself with a fresh reply
    /// since.
    pub fn is_bad_at(&self, now: Instant) -> bool {
        self.unanswered_queries > ALLOWED_UNANSWERED && !self.is_good_at(now)
    }

    /// Neither good nor bad: known, but stale.
    pub fn is_questionable_at(&self, now: Instant) -> bool {
        !self.is_good_at(now) && !self.is_bad_at(now)
    }

    /// Record a reply (or inbound query) from this node: resets both the
    /// freshness clock and the unanswered-query counter.
    pub fn set_good_at(&mut self, now: Instant) {
        self.last_seen_good = Some(now);
        self.unanswered_queries = 0;
    }

    /// Record that we sent a query and it went unanswered.
    pub fn note_unanswered(&mut self) {
        self.unanswered_queries = self.unanswered_queries.saturating_add(1);
    }

    pub fn unanswered_queries(&self) -> u32 {
        self.unanswered_queries
    }

    /// Encodes this node's id and address as a 26-byte packed node.
    pub fn to_packed(&self) -> [u8; PACKED_NODE_LEN] {
        let mut out = [0u8; PACKED_NODE_LEN];
        out[0..20].copy_from_slice(&self.id.to_bytes());
        out[20..24].copy_from_slice(&self.addr.ip().octets());
        out[24..26].copy_from_slice(&self.addr.port().to_be_bytes());
        out
    }

    /// Decodes a single 26-byte packed node.
    pub fn from_packed(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != PACKED_NODE_LEN {
            return Err(Error::MalformedMessage("packed node must be exactly 26 bytes"));
        }
        let id = Id::parse_bytes(&bytes[0..20])?;
        let ip = Ipv4Addr::new(bytes[20], bytes[21], bytes[22], bytes[23]);
        let port = u16::from_be_bytes([bytes[24], bytes[25]]);
        Ok(Node::new(id, SocketAddrV4::new(ip, port)))
    }

    /// Decodes a `nodes` blob: a concatenation of zero or more 26-byte
    /// packed nodes. The length must be a multiple of 26.
    pub fn decode_packed_many(bytes: &[u8]) -> Result<Vec<Node>, Error> {
        if bytes.len() % PACKED_NODE_LEN != 0 {
            return Err(Error::MalformedMessage(
                "nodes field length must be a multiple of 26",
            ));
        }
        bytes.chunks_exact(PACKED_NODE_LEN).map(Node::from_packed).collect()
    }

    pub fn encode_packed_many(nodes: &[Node]) -> Vec<u8> {
        let mut out = Vec::with_capacity(nodes.len() * PACKED_NODE_LEN);
        for node in nodes {
            out.extend_from_slice(&node.to_packed());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn addr() -> SocketAddrV4 {
        SocketAddrV4::new(Ipv4Addr::new(65, 52, 65, 52), 6881)
    }

    #[test]
    fn fresh_node_is_neither_good_nor_bad() {
        let n = Node::new(Id::random(), addr());
        let now = Instant::now();
        assert!(!n.is_good_at(now));
        assert!(!n.is_bad_at(now));
        assert!(n.is_questionable_at(now));
    }

    #[test]
    fn set_good_makes_it_good_until_interval_elapses() {
        let mut n = Node::new(Id::random(), addr());
        let t0 = Instant::now();
        n.set_good_at(t0);
        assert!(n.is_good_at(t0));
        assert!(n.is_good_at(t0 + GOOD_INTERVAL - Duration::from_secs(1)));
        assert!(!n.is_good_at(t0 + GOOD_INTERVAL + Duration::from_secs(1)));
    }

    #[test]
    fn exactly_allowed_unanswered_is_still_questionable() {
        // bad requires *more than* ALLOWED_UNANSWERED unanswered queries;
        // at exactly the threshold the contact is merely questionable.
        let mut n = Node::new(Id::random(), addr());
        let now = Instant::now();
        for _ in 0..ALLOWED_UNANSWERED {
            n.note_unanswered();
        }
        assert!(!n.is_bad_at(now));
        assert!(n.is_questionable_at(now));
    }

    #[test]
    fn bad_requires_both_unanswered_and_not_good() {
        let mut n = Node::new(Id::random(), addr());
        let now = Instant::now();
        for _ in 0..=ALLOWED_UNANSWERED {
            n.note_unanswered();
        }
        assert!(n.is_bad_at(now));

        n.set_good_at(now);
        assert!(!n.is_bad_at(now));
        assert!(n.is_good_at(now));
    }

    #[test]
    fn packed_node_roundtrip() {
        let n = Node::new(Id::random(), addr());
        let packed = n.to_packed();
        assert_eq!(packed.len(), PACKED_NODE_LEN);
        let back = Node::from_packed(&packed).unwrap();
        assert_eq!(back.id(), n.id());
        assert_eq!(back.addr(), n.addr());
    }

    #[test]
    fn decode_many_rejects_non_multiple_length() {
        let bytes = vec![0u8; PACKED_NODE_LEN + 1];
        assert!(Node::decode_packed_many(&bytes).is_err());
    }

    #[test]
    fn decode_many_accepts_empty() {
        assert_eq!(Node::decode_packed_many(&[]).unwrap(), Vec::new());
    }

    #[test]
    fn encode_decode_many_roundtrip() {
        let nodes = vec![
            Node::new(Id::random(), addr()),
            Node::new(Id::random(), SocketAddrV4::new(Ipv4Addr::new(1, 2, 3, 4), 80)),
            Node::new(Id::random(), SocketAddrV4::new(Ipv4Addr::new(255, 255, 255, 255), 65535)),
        ];
        let packed = Node::encode_packed_many(&nodes);
        assert_eq!(packed.len(), nodes.len() * PACKED_NODE_LEN);
        let decoded = Node::decode_packed_many(&packed).unwrap();
        assert_eq!(decoded.len(), nodes.len());
        for (a, b) in nodes.iter().zip(decoded.iter()) {
            assert_eq!(a.id(), b.id());
            assert_eq!(a.addr(), b.addr());
        }
    }
}
