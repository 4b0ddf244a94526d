use thiserror::Error;

/// The error taxonomy used throughout this crate.
///
/// Propagation policy: the codec and routing-tree layers surface these to
/// the coordinator; the coordinator never terminates the process on a
/// per-datagram error (it logs and drops), but persistence and bind errors
/// at startup are fatal.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Wire bytes fail the BEncode grammar, or a decoded message is missing
    /// a mandatory field, or a packed-node blob has the wrong length.
    #[error("malformed message: {0}")]
    MalformedMessage(&'static str),

    /// Programmer-facing misuse: a null/out-of-bounds contact insert, a hex
    /// string of the wrong length, a persisted-state version too new, ...
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// An encoder caller added dictionary entries out of lexicographic
    /// order.
    #[error("dictionary keys added out of order: '{0:?}' after '{1:?}'")]
    DictionaryOrderViolation(Vec<u8>, Vec<u8>),

    /// Bootstrap, full lookup, and persistence load/save are contract
    /// stubs: they must fail loudly rather than silently succeed.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    /// Socket open/bind/send failure from the OS layer.
    #[error("system I/O error: {0}")]
    SystemIo(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
