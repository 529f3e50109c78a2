//! An asynchronous NFSv3 client library.
//!
//! This crate implements the client half of the protocol stack needed to
//! talk to a real NFS server: PORTMAP/rpcbind for service discovery, MOUNT
//! for exchanging an export path for a root file handle, and the full
//! NFSv3 procedure surface (RFC 1813) on top of ONC RPC (RFC 5531) and XDR
//! (RFC 1832) framing — all over Tokio.
//!
//! ## Layers
//!
//! - [`protocol::xdr`]: XDR primitive encode/decode plus the wire types for
//!   RPC, PORTMAP, MOUNT and NFSv3.
//! - [`protocol::rpc`]: record-marking framing and [`protocol::rpc::RpcSession`],
//!   the multiplexed connection every call goes through.
//! - [`protocol::portmap`], [`protocol::mount`], [`protocol::nfs3`]: thin,
//!   per-procedure wrappers over a session, operating on raw file handles.
//! - [`client`]: the [`client::Client`] applications actually hold — token
//!   -based handles backed by [`registry::HandleRegistry`], the
//!   connect/mount/disconnect lifecycle, and the recursive enumeration and
//!   bulk-download helpers built on top of the raw procedure wrappers.
//! - [`config`]: [`config::Target`]/[`config::ClientConfig`], the typed
//!   connection and identity settings a caller builds before connecting.
//! - [`error`]: [`error::ClientError`], the single error type every public
//!   function in this crate returns.
//!
//! ## Standards
//!
//! - RFC 5531: RPC: Remote Procedure Call Protocol Specification Version 2
//! - RFC 1832: XDR: External Data Representation Standard
//! - RFC 1833: Binding Protocols for ONC RPC Version 2 (PORTMAP/rpcbind)
//! - RFC 1813: NFS Version 3 Protocol Specification (NFSv3 and MOUNT)

pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod registry;

// The XDR codegen macros (`SerializeStruct!` etc.) expand references to
// `$crate::xdr::...`; this re-export is what makes that resolve from any
// crate that invokes them, matching the teacher's own `pub use protocol::xdr`.
pub use protocol::xdr;

pub use client::{Client, ClientState};
pub use config::{ClientConfig, Target};
pub use error::{ClientError, Result};
pub use registry::{HandleToken, ROOT_TOKEN};
