//! Shared fake-server helpers for the integration tests in this directory.
//! Mirrors the teacher's own `tests/support.rs` in spirit (a hand-rolled
//! stand-in for the other end of the wire) but plays the server role for a
//! client under test, rather than a `vfs::NFSFileSystem`.

use std::io::Cursor;

use nfs3_client::protocol::rpc::{read_message, write_message};
use nfs3_client::protocol::xdr::rpc::{accept_body, accepted_reply, opaque_auth, reply_body, rpc_body, rpc_msg};
use nfs3_client::protocol::xdr::{Deserialize, Serialize};
use tokio::net::TcpStream;

/// Reads one framed RPC CALL off `stream` and returns its xid, procedure
/// number, and the argument bytes following the call header.
pub async fn recv_call(stream: &mut TcpStream) -> (u32, u32, Vec<u8>) {
    let request = read_message(stream, 1 << 20).await.unwrap();
    let mut cursor = Cursor::new(request.as_slice());
    let msg = rpc_msg::deserialize(&mut cursor).unwrap();
    let proc = match msg.body {
        rpc_body::CALL(call) => call.proc,
        rpc_body::REPLY(_) => panic!("expected a CALL, got a REPLY"),
    };
    let remaining = request[cursor.position() as usize..].to_vec();
    (msg.xid, proc, remaining)
}

/// Sends a `SUCCESS` reply for `xid` carrying `payload` as its raw result
/// bytes.
pub async fn send_success(stream: &mut TcpStream, xid: u32, payload: Vec<u8>) {
    let reply = rpc_msg {
        xid,
        body: rpc_body::REPLY(reply_body::MSG_ACCEPTED(accepted_reply {
            verf: opaque_auth::none(),
            reply_data: accept_body::SUCCESS,
        })),
    };
    let mut out = Vec::new();
    reply.serialize(&mut out).unwrap();
    out.extend_from_slice(&payload);
    write_message(stream, &out, 1 << 20).await.unwrap();
}
