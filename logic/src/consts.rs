//! Constants pulled straight from the original implementation's tuning.

use std::time::Duration;

/// Number of bytes in a [`crate::id::Id`].
pub const ID_LEN: usize = 20;
/// Number of bits in a [`crate::id::Id`].
pub const ID_LEN_BITS: usize = ID_LEN * 8;

/// Replication parameter `K`: max contacts held per bucket.
pub const K: usize = 8;

/// A contact is good if it answered within this interval.
pub const GOOD_INTERVAL: Duration = Duration::from_secs(15 * 60);
/// A contact is bad once it has this many consecutive unanswered queries
/// (and is not otherwise good).
pub const ALLOWED_UNANSWERED: u32 = 10;

/// A pending callback older than this is considered expired.
pub const CALLBACK_TIME_LIMIT: Duration = Duration::from_secs(3 * 60);

/// Spacing between ping batches while priming the table from persisted
/// addresses.
pub const INIT_PING_BATCH_INTERVAL: Duration = Duration::from_millis(1000 / 3);
/// Number of addresses pinged per batch during table priming.
pub const INIT_PING_BATCH_SIZE: usize = 5;

/// Below this many known contacts, the coordinator will (eventually) fall
/// back to the bootstrap rendezvous hosts.
pub const BOOTSTRAP_THRESHOLD: usize = 10;

/// Number of nodes that must return our own id as the closest one before we
/// consider ourselves unable to get any closer during a lookup.
pub const DHT_CLOSE_ENOUGH: usize = 10;

/// Well-known bootstrap rendezvous hosts (host, port). Resolving and
/// contacting these is an external collaborator's job; see
/// [`crate::table::RoutingTable::bootstrap`].
pub const BOOTSTRAP_HOSTS: &[(&str, u16)] = &[
    ("router.bittorrent.com", 6881),
    ("router.utorrent.com", 6881),
];

/// Current on-disk routing-table persistence format version. Anything other
/// than `0` is rejected outright; `0` itself has no body format defined yet.
pub const PERSISTENCE_VERSION: u32 = 0;
