//! Byte-exact fixtures from the end-to-end scenarios: PORTMAP GETPORT
//! resolving NFSv3's port, and MOUNT MNT exchanging an export path for a
//! root handle. Unlike `client_bootstrap.rs` (which only checks the calls
//! round-trip), these assert the literal wire bytes the fake server
//! observes, not just the decoded result.

mod support;

use nfs3_client::protocol::mount::mnt;
use nfs3_client::protocol::portmap::get_port;
use nfs3_client::protocol::rpc::RpcSession;
use nfs3_client::protocol::xdr::mount::{mountres3, mountres3_ok};
use nfs3_client::protocol::xdr::Serialize;
use support::send_success;
use tokio::net::{TcpListener, TcpStream};

/// GETPORT(program=100003, version=3, protocol=6/TCP, port=0): four
/// big-endian `u32`s, no padding.
const GETPORT_REQUEST: [u8; 16] =
    [0x00, 0x01, 0x86, 0xA3, 0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x06, 0x00, 0x00, 0x00, 0x00];

#[tokio::test]
async fn get_port_matches_literal_scenario_1_fixture() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let (xid, _proc, args) = support::recv_call(&mut stream).await;
        assert_eq!(args, GETPORT_REQUEST);

        let port: u32 = 2049;
        let mut payload = Vec::new();
        port.serialize(&mut payload).unwrap();
        assert_eq!(payload, vec![0x00, 0x00, 0x08, 0x01]);
        send_success(&mut stream, xid, payload).await;
    });

    let stream = TcpStream::connect(addr).await.unwrap();
    let session = RpcSession::from_stream(stream, 1 << 16);
    let port = get_port(&session, 100003, 3).await.unwrap();
    assert_eq!(port, 2049);

    server.await.unwrap();
}

/// MNT("/export") encodes its argument as a length-prefixed, zero-padded
/// XDR opaque string: `00 00 00 07 2F 65 78 70 6F 72 74 00`.
const MNT_REQUEST: [u8; 12] = [0x00, 0x00, 0x00, 0x07, 0x2F, 0x65, 0x78, 0x70, 0x6F, 0x72, 0x74, 0x00];

#[tokio::test]
async fn mnt_matches_literal_scenario_2_fixture() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = vec![9u8, 9, 9, 9];
    let expected_handle = handle.clone();

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let (xid, _proc, args) = support::recv_call(&mut stream).await;
        assert_eq!(args, MNT_REQUEST);

        let mut payload = Vec::new();
        mountres3::Ok(mountres3_ok { fhandle: handle, auth_flavors: vec![0] }).serialize(&mut payload).unwrap();
        // Reply begins with the `mountstat3::MNT3_OK` discriminant (0).
        assert_eq!(&payload[..4], &[0x00, 0x00, 0x00, 0x00]);
        send_success(&mut stream, xid, payload).await;
    });

    let stream = TcpStream::connect(addr).await.unwrap();
    let session = RpcSession::from_stream(stream, 1 << 16);
    let returned = mnt(&session, b"/export").await.unwrap();
    assert_eq!(returned, expected_handle);

    server.await.unwrap();
}
