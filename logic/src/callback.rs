use std::time::Instant;

use crate::consts::CALLBACK_TIME_LIMIT;
use crate::id::Id;
use crate::message::{Message, MessageKind};

/// A transaction id awaiting a matching reply.
///
/// Filters mirror the original implementation's `Callback`: a callback
/// only fires for a reply of the expected method, carrying the expected
/// transaction id, and (when the expected sender is known) from that
/// sender specifically. The sender filter is optional because a ping sent
/// to a bare address during bootstrap has no id to filter on yet; the
/// reply's id is how we learn it. The method filter exists because
/// transaction ids are drawn from a single shared counter across every
/// query kind, so tid+peer alone could let a `find_node` reply satisfy a
/// callback registered for a `ping`.
struct PendingCallback {
    tid: Vec<u8>,
    expected_peer: Option<Id>,
    expected_kind: Option<MessageKind>,
    registered_at: Instant,
}

impl PendingCallback {
    fn is_expired_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.registered_at) >= CALLBACK_TIME_LIMIT
    }

    fn matches(&self, sender: Id, message: &Message) -> bool {
        message.is_reply()
            && message.tid() == self.tid.as_slice()
            && self.expected_peer.map_or(true, |expected| expected == sender)
            && self.expected_kind.map_or(true, |expected| expected == message.kind())
    }
}

/// A multimap of transaction ids awaiting replies, keyed by the peer the
/// reply is expected from.
///
/// Registration happens when a query is sent; a match removes the
/// callback atomically (so a reply can satisfy at most one registration,
/// even if, pathologically, duplicate registrations exist for the same
/// peer and transaction id). Callbacks are also dropped once they are
/// older than [`CALLBACK_TIME_LIMIT`], whether or not they are ever
/// checked against an incoming reply.
#[derive(Default)]
pub struct CallbackRegistry {
    pending: Vec<PendingCallback>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        CallbackRegistry { pending: Vec::new() }
    }

    pub fn register(
        &mut self,
        expected_peer: Option<Id>,
        expected_kind: Option<MessageKind>,
        tid: Vec<u8>,
        now: Instant,
    ) {
        self.pending.push(PendingCallback {
            tid,
            expected_peer,
            expected_kind,
            registered_at: now,
        });
    }

    /// Looks for a registered callback matching `(sender, message)` and, if
    /// found, removes and returns it (as a simple "was there a match"
    /// signal; the original registration details aren't otherwise useful
    /// to the caller). Expired callbacks are purged as a side effect of
    /// every call, not on a separate timer.
    pub fn take_match(&mut self, sender: Id, message: &Message, now: Instant) -> bool {
        self.pending.retain(|c| !c.is_expired_at(now));

        if let Some(idx) = self.pending.iter().position(|c| c.matches(sender, message)) {
            self.pending.remove(idx);
            true
        } else {
            false
        }
    }

    /// Drops expired callbacks without checking for a match. Useful from a
    /// periodic maintenance tick so abandoned callbacks don't linger
    /// indefinitely between replies.
    pub fn expire(&mut self, now: Instant) -> usize {
        let before = self.pending.len();
        self.pending.retain(|c| !c.is_expired_at(now));
        before - self.pending.len()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
