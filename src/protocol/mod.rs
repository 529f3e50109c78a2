//! Protocol module implements the client side of the NFS version 3 protocol
//! suite as specified in RFC 1813.
//!
//! This module contains four main components:
//!
//! - `xdr`: External Data Representation (XDR) for serialization and
//!   deserialization of data structures according to RFC 1832.
//!
//! - `rpc`: Remote Procedure Call transport (record-marking framing and the
//!   multiplexed session) as defined in RFC 5531.
//!
//! - `portmap`, `mount`: the bootstrap protocols used to find and mount an
//!   export before any NFSv3 call can be made (RFC 1833, the MOUNT protocol).
//!
//! - `nfs3`: the NFSv3 procedure surface itself (RFC 1813) — one thin client
//!   wrapper per procedure around [`rpc::RpcSession::call`].
//!
//! The NFS protocol is a network file system protocol originally designed by
//! Sun Microsystems. It is stateless, using file handles to identify files
//! rather than path names.

pub mod mount;
pub mod nfs3;
pub mod portmap;
pub mod rpc;
pub mod xdr;
