#![forbid(unsafe_code)]

//! Identifier, routing-table, and wire-codec core for a Kademlia-style
//! BitTorrent DHT node.
//!
//! This crate owns the 160-bit id space, the dynamically-subdividing
//! bucket tree used to track known contacts, the BEncode/KRPC message
//! codec, and transaction correlation between a sent query and its
//! eventual reply. It does not own a socket, a bootstrap/lookup
//! traversal, or value storage (`get_peers`/`announce_peer`) — those are
//! either a caller's job (the socket, via [`transport::Sender`]) or
//! explicitly out of scope; see [`table::RoutingTable::bootstrap`] and
//! [`table::RoutingTable::look_for_node`].

pub mod bencode;
pub mod bucket;
pub mod callback;
pub mod config;
pub mod consts;
pub mod error;
pub mod id;
pub mod message;
pub mod node;
pub mod routing_tree;
pub mod table;
pub mod transport;

pub use bucket::{AddOutcome, Bucket};
pub use callback::CallbackRegistry;
pub use config::{RoutingConfig, SystemConfig};
pub use error::{Error, Result};
pub use id::Id;
pub use message::{Message, MessageKind};
pub use node::Node;
pub use routing_tree::RoutingTree;
pub use table::RoutingTable;
pub use transport::Sender;
