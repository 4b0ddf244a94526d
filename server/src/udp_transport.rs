use std::future::Future;
use std::net::SocketAddrV4;
use std::pin::Pin;
use std::sync::Arc;

use dht_logic::error::{Error, Result};
use dht_logic::Sender;
use tokio::net::UdpSocket;

/// The real-world [`Sender`]: a thin wrapper around a bound
/// `tokio::net::UdpSocket` shared between the receive loop and every
/// in-flight reply.
#[derive(Clone)]
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
}

impl UdpTransport {
    pub fn new(socket: Arc<UdpSocket>) -> Self {
        UdpTransport { socket }
    }
}

impl Sender for UdpTransport {
    type SendFut = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

    fn send_datagram(&self, to: SocketAddrV4, bytes: Vec<u8>) -> Self::SendFut {
        let socket = self.socket.clone();
        Box::pin(async move {
            socket.send_to(&bytes, to).await.map_err(Error::SystemIo)?;
            Ok(())
        })
    }
}
