//! End-to-end test of the enumeration driver's partial-failure behavior
//! (§9): a fake server that denies READDIRPLUS on one subdirectory (`d2`)
//! but permits it on a sibling (`d1`) must still yield `d1`'s contents, and
//! the walk must surface `d2`'s failure as a single `Err` item rather than
//! losing everything discovered so far.

mod support;

use futures::StreamExt;
use nfs3_client::config::{ClientConfig, Target};
use nfs3_client::protocol::xdr::mount::{mountres3, mountres3_ok};
use nfs3_client::protocol::xdr::nfs3::{
    entryplus3, fattr3, ftype3, nfs_fh3, nfsstat3, post_op_attr, post_op_fh3, GETATTR3resok,
};
use nfs3_client::protocol::xdr::{Deserialize, Serialize};
use nfs3_client::Client;
use support::{recv_call, send_success};
use tokio::net::TcpListener;

const ROOT_HANDLE: [u8; 4] = [1, 1, 1, 1];
const D1_HANDLE: [u8; 4] = [2, 2, 2, 2];
const D2_HANDLE: [u8; 4] = [3, 3, 3, 3];

const NFSPROC3_GETATTR: u32 = 1;
const NFSPROC3_READDIRPLUS: u32 = 17;

fn dir_attrs() -> fattr3 {
    fattr3 { ftype: ftype3::NF3DIR, ..Default::default() }
}

fn file_attrs() -> fattr3 {
    fattr3 { ftype: ftype3::NF3REG, ..Default::default() }
}

/// Every GETATTR/READDIRPLUS argument struct starts with the handle it
/// operates on, so decoding just the leading `nfs_fh3` is enough to tell
/// which directory a call is about without modelling the whole args type.
fn decode_handle(args: &[u8]) -> nfs_fh3 {
    let mut cursor = std::io::Cursor::new(args);
    nfs_fh3::deserialize(&mut cursor).unwrap()
}

fn dir_entry(name: &[u8], cookie: u64, fileid: u64, handle: &[u8]) -> entryplus3 {
    entryplus3 {
        fileid,
        name: name.to_vec().into(),
        cookie,
        name_attributes: post_op_attr::attributes(dir_attrs()),
        name_handle: post_op_fh3::handle(nfs_fh3 { data: handle.to_vec() }),
    }
}

fn file_entry(name: &[u8], cookie: u64, fileid: u64, handle: &[u8]) -> entryplus3 {
    entryplus3 {
        fileid,
        name: name.to_vec().into(),
        cookie,
        name_attributes: post_op_attr::attributes(file_attrs()),
        name_handle: post_op_fh3::handle(nfs_fh3 { data: handle.to_vec() }),
    }
}

#[tokio::test]
async fn partial_readdirplus_failure_does_not_abort_sibling_walk() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        // MOUNT connection.
        let (mut mount_stream, _) = listener.accept().await.unwrap();
        let (xid, _proc, _args) = recv_call(&mut mount_stream).await;
        let mut payload = Vec::new();
        mountres3::Ok(mountres3_ok { fhandle: ROOT_HANDLE.to_vec(), auth_flavors: vec![0] })
            .serialize(&mut payload)
            .unwrap();
        send_success(&mut mount_stream, xid, payload).await;

        // NFSv3 connection: six calls total, driven by `client::enumerate::walk`'s
        // depth-first order (root, then d1's subtree, then d2's subtree).
        let (mut nfs_stream, _) = listener.accept().await.unwrap();

        // GETATTR(root) for root's directory_credential.
        let (xid, proc, _args) = recv_call(&mut nfs_stream).await;
        assert_eq!(proc, NFSPROC3_GETATTR);
        let mut payload = Vec::new();
        nfsstat3::NFS3_OK.serialize(&mut payload).unwrap();
        GETATTR3resok { obj_attributes: dir_attrs() }.serialize(&mut payload).unwrap();
        send_success(&mut nfs_stream, xid, payload).await;

        // READDIRPLUS(root) -> d1, d2.
        let (xid, proc, args) = recv_call(&mut nfs_stream).await;
        assert_eq!(proc, NFSPROC3_READDIRPLUS);
        assert_eq!(decode_handle(&args).data, ROOT_HANDLE);
        let mut payload = Vec::new();
        nfsstat3::NFS3_OK.serialize(&mut payload).unwrap();
        nfs3_client::protocol::xdr::nfs3::READDIRPLUS3resok {
            dir_attributes: post_op_attr::Void,
            cookieverf: Default::default(),
            reply: nfs3_client::protocol::xdr::nfs3::dirlistplus3 {
                entries: vec![
                    dir_entry(b"d1", 1, 101, &D1_HANDLE),
                    dir_entry(b"d2", 2, 102, &D2_HANDLE),
                ],
                eof: true,
            },
        }
        .serialize(&mut payload)
        .unwrap();
        send_success(&mut nfs_stream, xid, payload).await;

        // GETATTR(d1) for d1's directory_credential.
        let (xid, proc, args) = recv_call(&mut nfs_stream).await;
        assert_eq!(proc, NFSPROC3_GETATTR);
        assert_eq!(decode_handle(&args).data, D1_HANDLE);
        let mut payload = Vec::new();
        nfsstat3::NFS3_OK.serialize(&mut payload).unwrap();
        GETATTR3resok { obj_attributes: dir_attrs() }.serialize(&mut payload).unwrap();
        send_success(&mut nfs_stream, xid, payload).await;

        // READDIRPLUS(d1) -> one regular file, eof.
        let (xid, proc, args) = recv_call(&mut nfs_stream).await;
        assert_eq!(proc, NFSPROC3_READDIRPLUS);
        assert_eq!(decode_handle(&args).data, D1_HANDLE);
        let mut payload = Vec::new();
        nfsstat3::NFS3_OK.serialize(&mut payload).unwrap();
        nfs3_client::protocol::xdr::nfs3::READDIRPLUS3resok {
            dir_attributes: post_op_attr::Void,
            cookieverf: Default::default(),
            reply: nfs3_client::protocol::xdr::nfs3::dirlistplus3 {
                entries: vec![file_entry(b"f1", 1, 201, &[4, 4, 4, 4])],
                eof: true,
            },
        }
        .serialize(&mut payload)
        .unwrap();
        send_success(&mut nfs_stream, xid, payload).await;

        // GETATTR(d2) succeeds (only the follow-up READDIRPLUS is denied).
        let (xid, proc, args) = recv_call(&mut nfs_stream).await;
        assert_eq!(proc, NFSPROC3_GETATTR);
        assert_eq!(decode_handle(&args).data, D2_HANDLE);
        let mut payload = Vec::new();
        nfsstat3::NFS3_OK.serialize(&mut payload).unwrap();
        GETATTR3resok { obj_attributes: dir_attrs() }.serialize(&mut payload).unwrap();
        send_success(&mut nfs_stream, xid, payload).await;

        // READDIRPLUS(d2) -> permission denied.
        let (xid, proc, args) = recv_call(&mut nfs_stream).await;
        assert_eq!(proc, NFSPROC3_READDIRPLUS);
        assert_eq!(decode_handle(&args).data, D2_HANDLE);
        let mut payload = Vec::new();
        nfsstat3::NFS3ERR_ACCES.serialize(&mut payload).unwrap();
        send_success(&mut nfs_stream, xid, payload).await;

        // disconnect(): UMNTALL on the mount connection.
        let (xid, _proc, _args) = recv_call(&mut mount_stream).await;
        send_success(&mut mount_stream, xid, Vec::new()).await;
    });

    let config = ClientConfig::new(Target::new(addr.ip().to_string(), addr.port()));
    let client = Client::connect(config, b"/export".to_vec()).await.unwrap();

    let items: Vec<_> = Box::pin(client.enumerate(client.root(), None, None)).collect().await;

    let paths: Vec<String> = items.iter().filter_map(|item| item.as_ref().ok().map(|e| e.path.clone())).collect();
    assert!(paths.contains(&"/d1".to_string()));
    assert!(paths.contains(&"/d1/f1".to_string()));
    assert!(paths.contains(&"/d2".to_string()));
    assert!(!paths.iter().any(|p| p.starts_with("/d2/")), "walk should not have descended past the denied d2");

    let errors: Vec<_> = items.iter().filter(|item| item.is_err()).collect();
    assert_eq!(errors.len(), 1, "exactly one subtree (d2) should have failed");

    client.disconnect().await;
    server.await.unwrap();
}
