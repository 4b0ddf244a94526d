use std::time::Duration;

use crate::consts;

/// Tunable parameters for a [`crate::table::RoutingTable`].
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct SystemConfig {
    pub routing: RoutingConfig,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RoutingConfig {
    // Replication parameter K: max contacts held per bucket before it must
    // split (if it contains self_id) or start refusing inserts.
    pub bucket_size: usize,

    // A contact is good if it answered within this interval.
    pub good_interval: Duration,

    // A contact is bad once it has this many consecutive unanswered
    // queries and is not otherwise good.
    pub allowed_unanswered: u32,

    // A pending callback older than this is considered expired.
    pub callback_time_limit: Duration,

    // Spacing between ping batches while priming the table from persisted
    // addresses.
    pub init_ping_batch_interval: Duration,

    // Number of addresses pinged per batch during table priming.
    pub init_ping_batch_size: usize,

    // Below this many known contacts, fall back to the bootstrap
    // rendezvous hosts.
    pub bootstrap_threshold: usize,

    // Number of nodes that must return our own id as the closest one
    // before a lookup gives up trying to get any closer.
    pub dht_close_enough: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            bucket_size: consts::K,
            good_interval: consts::GOOD_INTERVAL,
            allowed_unanswered: consts::ALLOWED_UNANSWERED,
            callback_time_limit: consts::CALLBACK_TIME_LIMIT,
            init_ping_batch_interval: consts::INIT_PING_BATCH_INTERVAL,
            init_ping_batch_size: consts::INIT_PING_BATCH_SIZE,
            bootstrap_threshold: consts::BOOTSTRAP_THRESHOLD,
            dht_close_enough: consts::DHT_CLOSE_ENOUGH,
        }
    }
}
