//! Connection configuration consumed by [`crate::protocol::rpc::RpcSession::connect`].
//!
//! This crate does not parse connection-string URLs itself (§6 treats that
//! as an external collaborator's job) but it owns the typed configuration
//! such a parser would build: host, port, transport protocol, a connect
//! timeout, and the outbound record-marking fragment size.

use std::time::Duration;

/// Reasonable internal ceiling for an outbound fragment, matching §6's
/// "1 MiB as a reasonable internal upper bound".
pub const MAX_FRAGMENT_SIZE: u32 = 1 << 20;

/// Default outbound fragment size when a [`Target`] does not specify one,
/// per §6 ("10 KiB when unspecified").
pub const DEFAULT_FRAGMENT_SIZE: u32 = 10 * 1024;

/// Default port of the PORTMAP/rpcbind service.
pub const PORTMAP_PORT: u16 = 111;

/// The host and port this session should connect to, and the knobs that
/// govern how it frames outbound messages and how long it will wait to
/// establish the TCP connection.
///
/// A port of `0` means "discover via PORTMAP" (see
/// [`RpcSession::connect`](crate::protocol::rpc::RpcSession::connect)).
#[derive(Debug, Clone)]
pub struct Target {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
    pub fragment_size: u32,
}

impl Target {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Target {
            host: host.into(),
            port,
            connect_timeout: Duration::from_secs(10),
            fragment_size: DEFAULT_FRAGMENT_SIZE,
        }
    }

    /// Port discovery is needed whenever the caller did not pin a port.
    pub fn needs_portmap(&self) -> bool {
        self.port == 0
    }

    pub fn with_fragment_size(mut self, size: u32) -> Self {
        self.fragment_size = size.min(MAX_FRAGMENT_SIZE);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Returns a copy of this target pinned to `port`, keeping every other
    /// knob. Used once PORTMAP has resolved a service's real port, to build
    /// the [`Target`] the follow-up connection is made against.
    pub fn with_port(&self, port: u16) -> Self {
        Target { port, ..self.clone() }
    }
}

/// Which credential flavor a [`crate::client::Client`] falls back to when a
/// call site does not pass an explicit override (§4.3: "The session holds a
/// default credential (AUTH_NONE unless the caller supplied AUTH_SYS)").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DefaultCredential {
    #[default]
    AuthNone,
    AuthSys,
}

/// Top-level client configuration: the server [`Target`] plus the identity
/// used for AUTH_SYS credentials when the caller does not override it
/// per-call.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub target: Target,
    pub machine_name: String,
    pub uid: u32,
    pub gid: u32,
    pub gids: Vec<u32>,
    pub default_credential: DefaultCredential,
}

impl ClientConfig {
    pub fn new(target: Target) -> Self {
        ClientConfig {
            target,
            machine_name: "localhost".to_string(),
            uid: 0,
            gid: 0,
            gids: Vec::new(),
            default_credential: DefaultCredential::AuthNone,
        }
    }

    /// Sets the identity used for AUTH_SYS and switches the default
    /// credential over to AUTH_SYS (a caller that bothers supplying an
    /// identity wants it used by default, not just available for override).
    pub fn with_identity(mut self, uid: u32, gid: u32) -> Self {
        self.uid = uid;
        self.gid = gid;
        self.default_credential = DefaultCredential::AuthSys;
        self
    }
}
