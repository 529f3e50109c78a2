//! Error types surfaced by every layer of this client, from the record framer
//! up through the NFSv3 procedure surface.
//!
//! Wire, framing and protocol errors are fatal to the [`RpcSession`](crate::protocol::rpc::RpcSession)
//! they occurred on: once one is observed the session is poisoned and every
//! subsequent call fails fast with [`ClientError::Transport`]. NFS/MOUNT
//! status errors are per-call and leave the session usable.

use std::sync::Arc;

use thiserror::Error;

use crate::protocol::xdr::mount::mountstat3;
use crate::protocol::xdr::nfs3::nfsstat3;
use crate::protocol::xdr::rpc::auth_stat;

/// The rejection detail carried by [`ClientError::ReplyDenied`], distinguishing
/// an RPC version mismatch from an authentication failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The peer only speaks an RPC version outside `[low, high]`.
    RpcMismatch { low: u32, high: u32 },
    /// The peer rejected our credentials or verifier.
    AuthError(auth_stat),
}

/// The non-`SUCCESS` accept status a peer can return for an otherwise
/// well-formed, authenticated CALL. See RFC 5531 §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptError {
    ProgUnavail,
    ProgMismatch { low: u32, high: u32 },
    ProcUnavail,
    GarbageArgs,
    SystemErr,
}

/// Every error this crate can return, from the record framer up through the
/// NFSv3 procedure surface.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The underlying byte stream failed, or the session was already
    /// poisoned by an earlier transport/framing/protocol error.
    #[error("transport error: {0}")]
    Transport(#[source] std::io::Error),

    /// A record-marking fragment header was malformed, or a fragment's
    /// declared length exceeded the configured ceiling.
    #[error("framing error: {0}")]
    Framing(String),

    /// We received a CALL on a connection where only REPLYs are expected, or
    /// a reply body could not be parsed into a recognizable shape.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// The peer rejected our RPC message outright (RFC 5531 `MSG_DENIED`).
    #[error("RPC call rejected by peer: {0:?}")]
    ReplyDenied(RejectReason),

    /// The peer accepted the message but could not execute it (RFC 5531
    /// `accept_stat` other than `SUCCESS`).
    #[error("RPC call not executed by peer: {0:?}")]
    CallRejected(AcceptError),

    /// `MOUNT3_MNT` returned a non-zero `mountstat3`.
    #[error("mount denied: {0:?}")]
    MountDenied(mountstat3),

    /// An NFSv3 procedure returned a non-zero `nfsstat3`. LOOKUP's
    /// not-found case is deliberately not represented this way: see
    /// [`crate::protocol::nfs3::lookup`].
    #[error("NFS error: {0:?}")]
    Nfs(nfsstat3),

    /// A caller passed a local handle token this session's registry has
    /// never issued.
    #[error("unknown local handle token {0}")]
    HandleUnknown(u64),

    /// PORTMAP GETPORT could not be reached at all.
    #[error("portmapper unavailable: {0}")]
    PortmapUnavailable(String),

    /// PORTMAP GETPORT succeeded but returned port 0 (service not
    /// registered).
    #[error("service (program {program}, version {version}) is not registered with the portmapper")]
    ServiceNotRegistered { program: u32, version: u32 },

    /// A fixed-length or length-prefixed field ran past the end of the
    /// reply bytes.
    #[error("truncated message: {0}")]
    TruncatedMessage(String),

    /// An out-of-range union tag or enum value was encountered while
    /// decoding.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// Used by the enumeration driver: the server rejected our cookieverf
    /// mid-walk (`NFS3ERR_BAD_COOKIE`). Carried separately from
    /// [`ClientError::Nfs`] only to let callers match on it without
    /// re-deriving the status code.
    #[error("readdirplus cookie rejected by server")]
    BadCookie,

    /// The session was already poisoned by an earlier transport, framing or
    /// protocol error; this call never went on the wire.
    #[error("session poisoned by earlier error: {0}")]
    Poisoned(Arc<ClientError>),
}

impl ClientError {
    /// Classifies a decode-time I/O error the way `xdr::Deserialize` impls
    /// produce it: `UnexpectedEof` is a short buffer, everything else
    /// (principally `InvalidData` from an out-of-range tag) is malformed.
    pub fn from_decode_error(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof => ClientError::TruncatedMessage(err.to_string()),
            std::io::ErrorKind::InvalidData => ClientError::MalformedMessage(err.to_string()),
            _ => ClientError::Transport(err),
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Transport(err)
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
