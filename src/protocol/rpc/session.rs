//! A single-connection ONC RPC session multiplexer.
//!
//! [`RpcSession`] owns one TCP connection and lets many concurrent callers
//! share it: each [`RpcSession::call`] allocates a fresh XID, registers a
//! completion slot for it, writes the request, and awaits its slot being
//! filled in by a background reader task. The reader task is the only thing
//! that ever reads from the socket; it demultiplexes replies by XID and has
//! no notion of what procedure was called.
//!
//! Any transport, framing or protocol-level error is fatal: it poisons the
//! session (see [`ClientError::Poisoned`]) so that every other in-flight and
//! future call fails fast instead of hanging on a connection that can no
//! longer make sense of its peer. NFS/MOUNT status errors never reach this
//! layer as failures; they come back as ordinary successful replies whose
//! payload bytes the procedure-specific caller decodes and interprets.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::io::{AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::framer;
use crate::config::Target;
use crate::error::{AcceptError, ClientError, RejectReason, Result};
use crate::protocol::xdr::rpc::{
    accept_body, call_message, opaque_auth, reply_body, rejected_reply, rpc_body, rpc_msg,
};
use crate::protocol::xdr::{Deserialize, Serialize};

/// First XID handed out by a freshly connected session. Chosen to match the
/// reference client's habit of reserving the low values rather than
/// starting at 0 or 1.
const FIRST_XID: u32 = 10;

type PendingReply = oneshot::Sender<std::result::Result<Vec<u8>, Arc<ClientError>>>;

struct SessionState {
    next_xid: u32,
    pending: HashMap<u32, PendingReply>,
    poison: Option<Arc<ClientError>>,
}

impl SessionState {
    fn new() -> Self {
        SessionState { next_xid: FIRST_XID, pending: HashMap::new(), poison: None }
    }

    /// Allocates the next XID, wrapping back to [`FIRST_XID`] on overflow so
    /// the reserved low range is never reused as a wraparound target.
    fn next_xid(&mut self) -> u32 {
        let xid = self.next_xid;
        self.next_xid = self.next_xid.checked_add(1).unwrap_or(FIRST_XID);
        xid
    }
}

/// A connected, multiplexed ONC RPC session over a single TCP stream.
///
/// Cloning a session clones the handle, not the connection: all clones share
/// the same socket, XID allocator and reader task.
#[derive(Clone)]
pub struct RpcSession {
    write_half: Arc<Mutex<WriteHalf<TcpStream>>>,
    state: Arc<Mutex<SessionState>>,
    fragment_size: u32,
    reader_task: Arc<JoinHandle<()>>,
}

impl RpcSession {
    /// Connects to `target` and spawns the background reader task. Does not
    /// speak any particular RPC program; callers build and send their own
    /// [`rpc_msg`] headers via [`RpcSession::call`].
    pub async fn connect(target: &Target) -> Result<Self> {
        let addr = (target.host.as_str(), target.port);
        let stream = tokio::time::timeout(target.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| {
                ClientError::Transport(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("connecting to {}:{} timed out", target.host, target.port),
                ))
            })??;
        stream.set_nodelay(true).ok();
        Ok(Self::from_stream(stream, target.fragment_size))
    }

    /// Wraps an already-connected stream (used by tests, and by the caller
    /// that resolves a port via PORTMAP and then dials the real service).
    pub fn from_stream(stream: TcpStream, fragment_size: u32) -> Self {
        let (read_half, write_half) = tokio::io::split(stream);
        let state = Arc::new(Mutex::new(SessionState::new()));
        let max_message_len = crate::config::MAX_FRAGMENT_SIZE as usize * 64;

        let reader_task = tokio::spawn(Self::reader_loop(read_half, state.clone(), max_message_len));

        RpcSession {
            write_half: Arc::new(Mutex::new(write_half)),
            state,
            fragment_size,
            reader_task: Arc::new(reader_task),
        }
    }

    /// Sends a CALL with body `prog`/`vers`/`proc`/`cred` and raw argument
    /// bytes `args`, and returns the raw payload bytes of a `SUCCESS` reply.
    /// Every other outcome becomes an error: `MSG_DENIED` -> `ReplyDenied`,
    /// a non-`SUCCESS` accept status -> `CallRejected`.
    pub async fn call(
        &self,
        prog: u32,
        vers: u32,
        proc: u32,
        cred: opaque_auth,
        args: &[u8],
    ) -> Result<Vec<u8>> {
        if let Some(poison) = self.poisoned().await {
            return Err(ClientError::Poisoned(poison));
        }

        let (xid, rx) = self.register_call().await?;

        let header = call_message(xid, prog, vers, proc, cred);
        let mut message = Vec::new();
        header.serialize(&mut message).map_err(ClientError::from)?;
        message.extend_from_slice(args);

        trace!(xid, prog, vers, proc, len = message.len(), "sending RPC call");

        if let Err(err) = self.send(&message).await {
            self.fail(&mut *self.state.lock().await, xid, &err);
            return Err(err);
        }

        match rx.await {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(poison)) => Err(ClientError::Poisoned(poison)),
            Err(_) => {
                // reader task dropped the sender without resolving the slot,
                // which only happens as part of poisoning the whole session.
                let poison = self
                    .poisoned()
                    .await
                    .unwrap_or_else(|| Arc::new(ClientError::ProtocolViolation(
                        "session reader exited without a reply".to_string(),
                    )));
                Err(ClientError::Poisoned(poison))
            }
        }
    }

    /// Registers a fresh XID's completion slot before the call is sent, so
    /// the reader task can never observe a reply for a slot that does not
    /// exist yet.
    async fn register_call(&self) -> Result<(u32, oneshot::Receiver<std::result::Result<Vec<u8>, Arc<ClientError>>>)> {
        let mut state = self.state.lock().await;
        if let Some(poison) = state.poison.clone() {
            return Err(ClientError::Poisoned(poison));
        }
        let xid = state.next_xid();
        let (tx, rx) = oneshot::channel();
        state.pending.insert(xid, tx);
        Ok((xid, rx))
    }

    async fn send(&self, message: &[u8]) -> Result<()> {
        let mut write_half = self.write_half.lock().await;
        framer::write_message(&mut *write_half, message, self.fragment_size).await
    }

    async fn poisoned(&self) -> Option<Arc<ClientError>> {
        self.state.lock().await.poison.clone()
    }

    /// Marks the session poisoned with `err` and fails every still-pending
    /// call, including `xid` if it has not already been resolved.
    fn fail(&self, state: &mut SessionState, xid: u32, err: &ClientError) {
        let poison = Arc::new(match err {
            ClientError::Poisoned(p) => return poison_with(state, p.clone()),
            other => clone_for_poison(other),
        });
        state.pending.remove(&xid);
        poison_with(state, poison);
    }

    /// Background task: the sole reader of the socket. Demultiplexes replies
    /// by XID until the connection closes or a transport/framing/protocol
    /// error occurs, at which point it poisons the session and returns.
    async fn reader_loop(
        mut read_half: ReadHalf<TcpStream>,
        state: Arc<Mutex<SessionState>>,
        max_message_len: usize,
    ) {
        loop {
            let message = match framer::read_message(&mut read_half, max_message_len).await {
                Ok(m) => m,
                Err(err) => {
                    debug!(error = %err, "RPC session reader stopping");
                    poison_all(&state, Arc::new(err)).await;
                    return;
                }
            };

            let mut cursor = std::io::Cursor::new(message.as_slice());
            let parsed = rpc_msg::deserialize(&mut cursor).map_err(ClientError::from_decode_error);

            let (xid, outcome) = match parsed {
                Ok(rpc_msg { xid, body: rpc_body::REPLY(reply) }) => {
                    (xid, decode_reply(reply, &message, cursor.position() as usize))
                }
                Ok(rpc_msg { xid, body: rpc_body::CALL(_) }) => (
                    xid,
                    Err(ClientError::ProtocolViolation(
                        "received a CALL on a client session".to_string(),
                    )),
                ),
                Err(err) => {
                    warn!(error = %err, "malformed RPC message, poisoning session");
                    poison_all(&state, Arc::new(err)).await;
                    return;
                }
            };

            let mut guard = state.lock().await;
            if let Some(sender) = guard.pending.remove(&xid) {
                let _ = sender.send(outcome.map_err(Arc::new));
            } else {
                trace!(xid, "reply for unknown or already-resolved xid, dropping");
            }
        }
    }

    /// Best-effort close: flushes, shuts the write half down, and aborts the
    /// reader task. Does not poison pending calls beyond what the socket
    /// closing will already surface to the reader loop.
    pub async fn disconnect(&self) {
        let mut write_half = self.write_half.lock().await;
        let _ = write_half.shutdown().await;
        self.reader_task.abort();
    }
}

/// Interprets a parsed `reply_body` as either the raw success payload or a
/// structured denial/rejection error. `message`/`payload_start` let us slice
/// out the remaining bytes after the reply header for the `SUCCESS` case.
fn decode_reply(reply: reply_body, message: &[u8], payload_start: usize) -> Result<Vec<u8>> {
    match reply {
        reply_body::MSG_ACCEPTED(accepted) => match accepted.reply_data {
            accept_body::SUCCESS => Ok(message[payload_start..].to_vec()),
            accept_body::PROG_UNAVAIL => Err(ClientError::CallRejected(AcceptError::ProgUnavail)),
            accept_body::PROG_MISMATCH(m) => {
                Err(ClientError::CallRejected(AcceptError::ProgMismatch { low: m.low, high: m.high }))
            }
            accept_body::PROC_UNAVAIL => Err(ClientError::CallRejected(AcceptError::ProcUnavail)),
            accept_body::GARBAGE_ARGS => Err(ClientError::CallRejected(AcceptError::GarbageArgs)),
            accept_body::SYSTEM_ERR => Err(ClientError::CallRejected(AcceptError::SystemErr)),
        },
        reply_body::MSG_DENIED(rejected_reply::RPC_MISMATCH(m)) => {
            Err(ClientError::ReplyDenied(RejectReason::RpcMismatch { low: m.low, high: m.high }))
        }
        reply_body::MSG_DENIED(rejected_reply::AUTH_ERROR(stat)) => {
            Err(ClientError::ReplyDenied(RejectReason::AuthError(stat)))
        }
    }
}

async fn poison_all(state: &Arc<Mutex<SessionState>>, err: Arc<ClientError>) {
    let mut guard = state.lock().await;
    poison_with(&mut guard, err);
}

fn poison_with(state: &mut SessionState, err: Arc<ClientError>) {
    if state.poison.is_none() {
        state.poison = Some(err.clone());
    }
    for (_, sender) in state.pending.drain() {
        let _ = sender.send(Err(err.clone()));
    }
}

/// `ClientError` has no `Clone` impl (its `io::Error`/`Arc<Self>` variants
/// don't need one elsewhere) but poisoning needs to stash one copy in
/// `SessionState` and hand another back to the immediate caller; this
/// re-renders non-Clone variants by their already-`Display`ed message.
fn clone_for_poison(err: &ClientError) -> ClientError {
    ClientError::ProtocolViolation(err.to_string())
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;

    use super::*;
    use crate::protocol::xdr::rpc::accepted_reply;

    #[tokio::test]
    async fn call_round_trips_success_payload() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = framer::read_message(&mut stream, 1 << 20).await.unwrap();
            let mut cursor = std::io::Cursor::new(request.as_slice());
            let msg = rpc_msg::deserialize(&mut cursor).unwrap();

            let reply = rpc_msg {
                xid: msg.xid,
                body: rpc_body::REPLY(reply_body::MSG_ACCEPTED(accepted_reply {
                    verf: opaque_auth::none(),
                    reply_data: accept_body::SUCCESS,
                })),
            };
            let mut out = Vec::new();
            reply.serialize(&mut out).unwrap();
            out.extend_from_slice(&[0xCA, 0xFE]);
            framer::write_message(&mut stream, &out, 1 << 20).await.unwrap();
        });

        let stream = TcpStream::connect(addr).await.unwrap();
        let session = RpcSession::from_stream(stream, 1 << 16);

        let payload = session.call(100000, 2, 0, opaque_auth::none(), &[]).await.unwrap();
        assert_eq!(payload, vec![0xCA, 0xFE]);

        server.await.unwrap();
    }

    #[tokio::test]
    async fn denied_reply_surfaces_as_reply_denied() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = framer::read_message(&mut stream, 1 << 20).await.unwrap();
            let mut cursor = std::io::Cursor::new(request.as_slice());
            let msg = rpc_msg::deserialize(&mut cursor).unwrap();

            let reply = rpc_msg {
                xid: msg.xid,
                body: rpc_body::REPLY(reply_body::MSG_DENIED(rejected_reply::AUTH_ERROR(
                    crate::protocol::xdr::rpc::auth_stat::AUTH_BADCRED,
                ))),
            };
            let mut out = Vec::new();
            reply.serialize(&mut out).unwrap();
            framer::write_message(&mut stream, &out, 1 << 20).await.unwrap();
        });

        let stream = TcpStream::connect(addr).await.unwrap();
        let session = RpcSession::from_stream(stream, 1 << 16);

        let err = session.call(100000, 2, 0, opaque_auth::none(), &[]).await.unwrap_err();
        assert!(matches!(err, ClientError::ReplyDenied(RejectReason::AuthError(_))));

        server.await.unwrap();
    }

    #[tokio::test]
    async fn peer_disconnect_poisons_pending_calls() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            drop(stream);
        });

        let stream = TcpStream::connect(addr).await.unwrap();
        let session = RpcSession::from_stream(stream, 1 << 16);

        let err = session.call(100000, 2, 0, opaque_auth::none(), &[]).await.unwrap_err();
        assert!(matches!(err, ClientError::Poisoned(_)));

        server.await.unwrap();
    }

    #[test]
    fn first_xid_starts_at_ten_and_wraps() {
        let mut state = SessionState::new();
        assert_eq!(state.next_xid(), 10);
        assert_eq!(state.next_xid(), 11);
        state.next_xid = u32::MAX;
        assert_eq!(state.next_xid(), u32::MAX);
        assert_eq!(state.next_xid(), FIRST_XID);
    }
}
