use std::future::Future;
use std::net::SocketAddrV4;

use crate::error::Error;

/// The external collaborator responsible for moving already-encoded
/// datagrams over the network.
///
/// [`crate::table::RoutingTable`] is generic over this trait so the
/// coordinator logic (message framing, bucket maintenance, callback
/// matching) can be exercised against an in-memory double in tests and
/// against a real `tokio::net::UdpSocket` in the server binary, without
/// the coordinator itself ever touching an OS socket.
pub trait Sender: Send + Sync + 'static {
    type SendFut: Future<Output = Result<(), Error>> + Send;

    /// Sends a raw datagram to `to`. Errors are this trait's only way of
    /// reporting a failed send; the coordinator logs and moves on rather
    /// than treating a single failed send as fatal.
    fn send_datagram(&self, to: SocketAddrV4, bytes: Vec<u8>) -> Self::SendFut;
}
