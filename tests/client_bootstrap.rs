//! End-to-end test of `Client::connect`'s bootstrap sequence against a fake
//! MOUNT+NFSv3 server: MNT on the first connection, a GETATTR round trip on
//! the second, then a clean `disconnect` (UMNTALL best-effort).

mod support;

use nfs3_client::client::ClientState;
use nfs3_client::config::{ClientConfig, Target};
use nfs3_client::protocol::xdr::mount::{mountres3, mountres3_ok};
use nfs3_client::protocol::xdr::nfs3::{fattr3, nfsstat3, GETATTR3resok};
use nfs3_client::protocol::xdr::Serialize;
use nfs3_client::Client;
use support::{recv_call, send_success};
use tokio::net::TcpListener;

const ROOT_HANDLE: [u8; 4] = [9, 9, 9, 9];

#[tokio::test]
async fn connect_mounts_and_bootstraps_nfs_session() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        // MOUNT connection: expect MNT, reply with the root handle.
        let (mut mount_stream, _) = listener.accept().await.unwrap();
        let (xid, _proc, _args) = recv_call(&mut mount_stream).await;
        let mut payload = Vec::new();
        mountres3::Ok(mountres3_ok { fhandle: ROOT_HANDLE.to_vec(), auth_flavors: vec![0] })
            .serialize(&mut payload)
            .unwrap();
        send_success(&mut mount_stream, xid, payload).await;

        // NFSv3 connection: expect GETATTR, reply with a fixed fattr3.
        let (mut nfs_stream, _) = listener.accept().await.unwrap();
        let (xid, proc, _args) = recv_call(&mut nfs_stream).await;
        assert_eq!(proc, 1, "expected GETATTR as the first NFSv3 call");
        let mut payload = Vec::new();
        nfsstat3::NFS3_OK.serialize(&mut payload).unwrap();
        GETATTR3resok { obj_attributes: fattr3::default() }.serialize(&mut payload).unwrap();
        send_success(&mut nfs_stream, xid, payload).await;

        // disconnect(): expect UMNTALL on the mount connection.
        let (xid, _proc, _args) = recv_call(&mut mount_stream).await;
        send_success(&mut mount_stream, xid, Vec::new()).await;

        (mount_stream, nfs_stream)
    });

    let config = ClientConfig::new(Target::new(addr.ip().to_string(), addr.port()));
    let client = Client::connect(config, b"/export".to_vec()).await.unwrap();
    assert_eq!(client.state().await, ClientState::Active);
    assert_eq!(client.path_of(client.root()).await, "/");

    let attrs = client.getattr(client.root(), None).await.unwrap();
    assert!(matches!(attrs.ftype, nfs3_client::protocol::xdr::nfs3::ftype3::NF3REG));

    client.disconnect().await;
    assert_eq!(client.state().await, ClientState::Init);

    server.await.unwrap();
}
