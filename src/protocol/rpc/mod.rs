//! RPC (Remote Procedure Call) transport as specified in RFC 5531 (previously RFC 1057).
//!
//! The RPC protocol enables programs to call procedures on remote systems as
//! if they were local calls. It forms the foundation for all NFS operations
//! by providing a standard mechanism for client-server communication.
//!
//! This module implements the client side of RPC version 2:
//!
//! 1. Message framing for TCP using the Record Marking Standard ([`framer`])
//! 2. A single-connection session that multiplexes concurrent calls by XID
//!    and poisons itself on any transport/framing/protocol error ([`RpcSession`])
//! 3. Authentication (AUTH_NONE, AUTH_UNIX) via [`crate::protocol::xdr::rpc`]
//!
//! The PORTMAP, MOUNT and NFSv3 service clients are all thin wrappers around
//! [`RpcSession::call`], encoding their arguments and decoding their results
//! but delegating every transport concern to this module.

mod framer;
mod session;

pub use framer::{read_message, write_message};
pub use session::RpcSession;
