use std::net::SocketAddrV4;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Instant;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, instrument, warn};

use crate::callback::CallbackRegistry;
use crate::config::SystemConfig;
use crate::consts::{PERSISTENCE_VERSION, K};
use crate::error::{Error, Result};
use crate::id::Id;
use crate::message::{Message, MessageKind};
use crate::node::Node;
use crate::routing_tree::RoutingTree;
use crate::transport::Sender;

/// The DHT coordinator: owns the routing tree and the pending-callback
/// registry, frames and dispatches wire messages, and drives periodic
/// maintenance.
///
/// Generic over [`Sender`] so the coordinator logic can run against a real
/// socket or an in-memory double without change. The routing tree sits
/// behind a [`RwLock`] and the callback registry behind a [`Mutex`]; both
/// are held only for the duration of a single bucket/callback operation,
/// never across a network send.
pub struct RoutingTable<S: Sender> {
    self_id: Id,
    tree: RwLock<RoutingTree>,
    callbacks: Mutex<CallbackRegistry>,
    sender: S,
    next_tid: AtomicU16,
}

impl<S: Sender> RoutingTable<S> {
    pub fn new(self_id: Id, config: SystemConfig, sender: S) -> Self {
        RoutingTable {
            self_id,
            tree: RwLock::new(RoutingTree::new(self_id, config.routing.bucket_size)),
            callbacks: Mutex::new(CallbackRegistry::new()),
            sender,
            next_tid: AtomicU16::new(0),
        }
    }

    pub fn self_id(&self) -> Id {
        self.self_id
    }

    pub async fn known_contacts(&self) -> usize {
        self.tree.read().await.size()
    }

    fn fresh_tid(&self) -> Vec<u8> {
        let n = self.next_tid.fetch_add(1, Ordering::Relaxed);
        n.to_be_bytes().to_vec()
    }

    async fn remember(&self, id: Id, addr: SocketAddrV4, mark_good: bool) {
        let mut node = Node::new(id, addr);
        let now = Instant::now();
        if mark_good {
            node.set_good_at(now);
        }
        self.tree.write().await.add(node, now);
    }

    async fn send_message(&self, to: SocketAddrV4, message: Message) -> Result<()> {
        self.sender.send_datagram(to, message.encode()).await
    }

    /// Decodes and dispatches one inbound datagram.
    ///
    /// A malformed datagram is logged and dropped, never propagated: the
    /// coordinator must keep serving every other peer regardless of what
    /// garbage one of them sent. Only a genuine send failure while writing
    /// a reply is returned to the caller.
    #[instrument(skip(self, bytes), fields(self_id = %self.self_id, from = %from))]
    pub async fn on_datagram(&self, from: SocketAddrV4, bytes: &[u8]) -> Result<()> {
        let message = match Message::decode(bytes) {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, "dropping malformed datagram");
                return Ok(());
            }
        };

        let sender_id = message.sender_id();

        match &message {
            Message::PingQuery { tid, .. } => {
                debug!("ping query");
                self.remember(sender_id, from, true).await;
                self.send_message(from, Message::PingReply { id: self.self_id, tid: tid.clone() })
                    .await?;
            }
            Message::FindNodeQuery { tid, target, .. } => {
                debug!(target = %target, "find_node query");
                self.remember(sender_id, from, true).await;
                let nodes = self.tree.read().await.closest_nodes(target, K);
                self.send_message(
                    from,
                    Message::FindNodeReply { id: self.self_id, tid: tid.clone(), nodes },
                )
                .await?;
            }
            Message::PingReply { .. } | Message::FindNodeReply { .. } => {
                let matched = self.callbacks.lock().await.take_match(sender_id, &message, Instant::now());
                if matched {
                    self.remember(sender_id, from, true).await;
                } else {
                    debug!("unsolicited or stale reply");
                }
            }
        }
        Ok(())
    }

    /// Sends a ping and registers a callback awaiting its reply.
    ///
    /// `expected_peer` is `None` when the target's id isn't known yet (a
    /// bare bootstrap address): the callback then matches on transaction
    /// id alone, and the reply's `id` field is how the peer's id is first
    /// learned.
    #[instrument(skip(self))]
    pub async fn do_ping(&self, to: SocketAddrV4, expected_peer: Option<Id>) -> Result<()> {
        let tid = self.fresh_tid();
        self.callbacks
            .lock()
            .await
            .register(expected_peer, Some(MessageKind::Ping), tid.clone(), Instant::now());
        self.send_message(to, Message::PingQuery { id: self.self_id, tid }).await
    }

    /// Drops bad contacts and expired callbacks, then reports that the rest
    /// of maintenance (pinging aging/questionable nodes to refresh them) is
    /// not yet implemented.
    ///
    /// Meant to be driven by a periodic timer (the server binary uses a
    /// `tokio::time::interval`). The safe, fully-implemented half always
    /// runs first; per §7's error-handling policy, the unimplemented half
    /// must not be allowed to look like a silent no-op, so this returns
    /// `Err` rather than `()` once eviction/expiry have run.
    pub async fn maintenance_tick(&self) -> Result<()> {
        let now = Instant::now();
        let evicted = self.tree.write().await.evict_bad(now);
        let expired = self.callbacks.lock().await.expire(now);
        if evicted > 0 || expired > 0 {
            debug!(evicted, expired, "maintenance tick");
        }
        Err(Error::NotImplemented("maintenance_tick: ping aging nodes"))
    }

    /// Seeds the routing table from the well-known bootstrap hosts.
    ///
    /// The original implementation never finished this either: resolving
    /// the bootstrap hostnames and driving the ping-batch/backoff loop
    /// that would populate the table from them is a hard stub there
    /// (`tableMaintenance`/`lookForNode`/this all unconditionally throw),
    /// and is square outside what this crate's wire/routing core owns, so
    /// it stays a stub here too rather than a silent no-op.
    pub async fn bootstrap(&self) -> Result<()> {
        Err(Error::NotImplemented("bootstrap"))
    }

    /// Iterative closest-node lookup traversal. Out of scope for this
    /// crate; see module docs.
    pub async fn look_for_node(&self, _target: Id) -> Result<Vec<Node>> {
        Err(Error::NotImplemented("look_for_node"))
    }

    /// Loads persisted routing-table state.
    ///
    /// The original implementation rejects any version above what it
    /// knows, and even for the version it does know never defined a body
    /// (format version `0` has no documented on-disk layout). This
    /// preserves both halves of that behavior rather than inventing a
    /// format.
    pub fn load(&self, version: u32, _bytes: &[u8]) -> Result<()> {
        if version > PERSISTENCE_VERSION {
            return Err(Error::InvalidArgument("unsupported persistence format version"));
        }
        Err(Error::NotImplemented("load"))
    }

    pub fn save(&self) -> Result<Vec<u8>> {
        Err(Error::NotImplemented("save"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::net::Ipv4Addr;
    use std::pin::Pin;
    use std::sync::Arc;
    use tokio::sync::Mutex as AsyncMutex;

    /// An in-memory transport double that records every sent datagram
    /// instead of putting it on the wire.
    #[derive(Clone, Default)]
    struct RecordingSender {
        sent: Arc<AsyncMutex<Vec<(SocketAddrV4, Vec<u8>)>>>,
    }

    impl Sender for RecordingSender {
        type SendFut = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

        fn send_datagram(&self, to: SocketAddrV4, bytes: Vec<u8>) -> Self::SendFut {
            let sent = self.sent.clone();
            Box::pin(async move {
                sent.lock().await.push((to, bytes));
                Ok(())
            })
        }
    }

    fn addr(port: u16) -> SocketAddrV4 {
        SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 1), port)
    }

    fn make_table(self_id: Id) -> (RoutingTable<RecordingSender>, RecordingSender) {
        let sender = RecordingSender::default();
        let table = RoutingTable::new(self_id, SystemConfig::default(), sender.clone());
        (table, sender)
    }

    #[test_log::test(tokio::test)]
    async fn ping_query_is_answered_and_sender_is_remembered() {
        let (table, sender) = make_table(Id::random());
        let peer_id = Id::random();
        let query = Message::PingQuery { id: peer_id, tid: b"aa".to_vec() };
        table.on_datagram(addr(1), &query.encode()).await.unwrap();

        assert_eq!(table.known_contacts().await, 1);
        let sent = sender.sent.lock().await;
        assert_eq!(sent.len(), 1);
        let reply = Message::decode(&sent[0].1).unwrap();
        assert!(matches!(reply, Message::PingReply { id, ref tid } if id == table.self_id() && tid.as_slice() == b"aa"));
    }

    #[test_log::test(tokio::test)]
    async fn find_node_query_replies_with_closest_contacts() {
        let self_id = Id::random();
        let (table, sender) = make_table(self_id);

        // seed the table with one contact by receiving a ping from it.
        let known_peer = Id::random();
        let known_query = Message::PingQuery { id: known_peer, tid: b"seed".to_vec() };
        table.on_datagram(addr(2), &known_query.encode()).await.unwrap();

        let target = Id::random();
        let find_query = Message::FindNodeQuery { id: Id::random(), tid: b"bb".to_vec(), target };
        table.on_datagram(addr(3), &find_query.encode()).await.unwrap();

        let sent = sender.sent.lock().await;
        let reply = Message::decode(&sent.last().unwrap().1).unwrap();
        match reply {
            Message::FindNodeReply { tid, nodes, .. } => {
                assert_eq!(tid, b"bb");
                assert!(nodes.iter().any(|n| n.id() == known_peer));
            }
            other => panic!("expected find_node reply, got {:?}", other),
        }
    }

    #[test_log::test(tokio::test)]
    async fn ping_reply_without_registered_callback_is_not_remembered() {
        let (table, _sender) = make_table(Id::random());
        let reply = Message::PingReply { id: Id::random(), tid: b"zz".to_vec() };
        table.on_datagram(addr(4), &reply.encode()).await.unwrap();
        assert_eq!(table.known_contacts().await, 0);
    }

    #[test_log::test(tokio::test)]
    async fn matching_ping_reply_is_remembered() {
        let (table, sender) = make_table(Id::random());
        let peer_addr = addr(5);
        table.do_ping(peer_addr, None).await.unwrap();

        let sent = sender.sent.lock().await;
        let sent_query = Message::decode(&sent[0].1).unwrap();
        let tid = sent_query.tid().to_vec();
        drop(sent);

        let peer_id = Id::random();
        let reply = Message::PingReply { id: peer_id, tid };
        table.on_datagram(peer_addr, &reply.encode()).await.unwrap();
        assert_eq!(table.known_contacts().await, 1);
    }

    #[test_log::test(tokio::test)]
    async fn malformed_datagram_is_dropped_not_propagated() {
        let (table, sender) = make_table(Id::random());
        let result = table.on_datagram(addr(6), b"not bencode at all").await;
        assert!(result.is_ok());
        assert!(sender.sent.lock().await.is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn maintenance_tick_evicts_bad_contacts_then_reports_unimplemented() {
        let (table, _sender) = make_table(Id::random());
        {
            let mut tree = table.tree.write().await;
            let mut bad = Node::new(Id::random(), addr(7));
            for _ in 0..=crate::consts::ALLOWED_UNANSWERED {
                bad.note_unanswered();
            }
            tree.add(bad, Instant::now());
        }
        assert_eq!(table.known_contacts().await, 1);
        let result = table.maintenance_tick().await;
        assert_eq!(table.known_contacts().await, 0);
        assert!(matches!(result, Err(Error::NotImplemented(_))));
    }

    #[test]
    fn load_rejects_future_persistence_versions() {
        let (table, _sender) = make_table(Id::random());
        let err = table.load(PERSISTENCE_VERSION + 1, &[]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn load_of_current_version_is_not_implemented() {
        let (table, _sender) = make_table(Id::random());
        let err = table.load(PERSISTENCE_VERSION, &[]).unwrap_err();
        assert!(matches!(err, Error::NotImplemented(_)));
    }

    #[test_log::test(tokio::test)]
    async fn bootstrap_and_look_for_node_are_hard_stubs() {
        let (table, _sender) = make_table(Id::random());
        assert!(matches!(table.bootstrap().await, Err(Error::NotImplemented(_))));
        assert!(matches!(table.look_for_node(Id::random()).await, Err(Error::NotImplemented(_))));
    }
}
