use crate::bencode::{self, Encoder, Leaf};
use crate::error::Error;
use crate::id::Id;
use crate::node::Node;

/// Which of the two query methods this crate speaks a message belongs to,
/// independent of whether it's the query or the reply half.
///
/// Used by [`crate::callback::CallbackRegistry`] to filter a pending
/// callback by method, not just by transaction id and sender: the
/// transaction id alone is not unique across methods (`RoutingTable` draws
/// both ping and find_node transaction ids from the same counter).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Ping,
    FindNode,
}

/// A decoded or to-be-encoded KRPC-style DHT message.
///
/// Only the `ping` and `find_node` methods are modeled; an `e` (error)
/// top-level message, or a `q` whose `q` field names anything else, fails
/// to decode with [`Error::MalformedMessage`] rather than being silently
/// accepted and ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    PingQuery { id: Id, tid: Vec<u8> },
    PingReply { id: Id, tid: Vec<u8> },
    FindNodeQuery { id: Id, tid: Vec<u8>, target: Id },
    FindNodeReply { id: Id, tid: Vec<u8>, nodes: Vec<Node> },
}

impl Message {
    pub fn tid(&self) -> &[u8] {
        match self {
            Message::PingQuery { tid, .. }
            | Message::PingReply { tid, .. }
            | Message::FindNodeQuery { tid, .. }
            | Message::FindNodeReply { tid, .. } => tid,
        }
    }

    pub fn sender_id(&self) -> Id {
        match self {
            Message::PingQuery { id, .. }
            | Message::PingReply { id, .. }
            | Message::FindNodeQuery { id, .. }
            | Message::FindNodeReply { id, .. } => *id,
        }
    }

    /// Which method (`ping` or `find_node`) this message belongs to,
    /// regardless of whether it's the query or the reply half.
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::PingQuery { .. } | Message::PingReply { .. } => MessageKind::Ping,
            Message::FindNodeQuery { .. } | Message::FindNodeReply { .. } => MessageKind::FindNode,
        }
    }

    pub fn is_query(&self) -> bool {
        matches!(self, Message::PingQuery { .. } | Message::FindNodeQuery { .. })
    }

    pub fn is_reply(&self) -> bool {
        !self.is_query()
    }

    /// The `target` field of a `find_node` query.
    ///
    /// Fails with [`Error::MalformedMessage`] for every other message kind
    /// (in particular, asking a reply or a ping for its target is a caller
    /// bug, not something to silently default).
    pub fn target(&self) -> Result<Id, Error> {
        match self {
            Message::FindNodeQuery { target, .. } => Ok(*target),
            _ => Err(Error::MalformedMessage("target requested on a non-find_node-query message")),
        }
    }

    /// The `nodes` field of a `find_node` reply.
    pub fn nodes(&self) -> Result<&[Node], Error> {
        match self {
            Message::FindNodeReply { nodes, .. } => Ok(nodes),
            _ => Err(Error::MalformedMessage("nodes requested on a non-find_node-reply message")),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut e = Encoder::new();
        match self {
            Message::PingQuery { id, tid } => {
                e.start_dictionary();
                e.add_key(b"a").unwrap();
                e.start_dictionary();
                e.add_dictionary_string(b"id", &id.to_bytes()).unwrap();
                e.end_dictionary().unwrap();
                e.add_dictionary_string(b"q", b"ping").unwrap();
                e.add_dictionary_string(b"t", tid).unwrap();
                e.add_dictionary_string(b"y", b"q").unwrap();
                e.end_dictionary().unwrap();
            }
            Message::FindNodeQuery { id, tid, target } => {
                e.start_dictionary();
                e.add_key(b"a").unwrap();
                e.start_dictionary();
                e.add_dictionary_string(b"id", &id.to_bytes()).unwrap();
                e.add_dictionary_string(b"target", &target.to_bytes()).unwrap();
                e.end_dictionary().unwrap();
                e.add_dictionary_string(b"q", b"find_node").unwrap();
                e.add_dictionary_string(b"t", tid).unwrap();
                e.add_dictionary_string(b"y", b"q").unwrap();
                e.end_dictionary().unwrap();
            }
            Message::PingReply { id, tid } => {
                e.start_dictionary();
                e.add_key(b"r").unwrap();
                e.start_dictionary();
                e.add_dictionary_string(b"id", &id.to_bytes()).unwrap();
                e.end_dictionary().unwrap();
                e.add_dictionary_string(b"t", tid).unwrap();
                e.add_dictionary_string(b"y", b"r").unwrap();
                e.end_dictionary().unwrap();
            }
            Message::FindNodeReply { id, tid, nodes } => {
                e.start_dictionary();
                e.add_key(b"r").unwrap();
                e.start_dictionary();
                e.add_dictionary_string(b"id", &id.to_bytes()).unwrap();
                let packed = Node::encode_packed_many(nodes);
                e.add_dictionary_string(b"nodes", &packed).unwrap();
                e.end_dictionary().unwrap();
                e.add_dictionary_string(b"t", tid).unwrap();
                e.add_dictionary_string(b"y", b"r").unwrap();
                e.end_dictionary().unwrap();
            }
        }
        e.finish()
    }

    pub fn decode(bytes: &[u8]) -> Result<Message, Error> {
        let map = bencode::decode(bytes)?;

        let get_str = |path: &str| -> Result<&[u8], Error> {
            map.get(path)
                .and_then(Leaf::as_str_bytes)
                .ok_or(Error::MalformedMessage("missing required field"))
        };

        let tid = get_str("/t")?.to_vec();
        let kind = get_str("/y")?;

        match kind {
            b"q" => {
                let query = get_str("/q")?;
                let id = Id::parse_bytes(get_str("/a/id")?)?;
                match query {
                    b"ping" => Ok(Message::PingQuery { id, tid }),
                    b"find_node" => {
                        let target = Id::parse_bytes(get_str("/a/target")?)?;
                        Ok(Message::FindNodeQuery { id, tid, target })
                    }
                    _ => Err(Error::MalformedMessage("unsupported query method")),
                }
            }
            b"r" => {
                let id = Id::parse_bytes(get_str("/r/id")?)?;
                match map.get("/r/nodes").and_then(Leaf::as_str_bytes) {
                    Some(nodes_bytes) => {
                        let nodes = Node::decode_packed_many(nodes_bytes)?;
                        Ok(Message::FindNodeReply { id, tid, nodes })
                    }
                    None => Ok(Message::PingReply { id, tid }),
                }
            }
            _ => Err(Error::MalformedMessage("unsupported top-level message type")),
        }
    }
}
