//! Client wrappers for the directory-shaped procedures: MKDIR, SYMLINK,
//! MKNOD, READDIR and READDIRPLUS (RFC 1813 §§3.3.9-3.3.11, 3.3.16-3.3.17).

use crate::error::{ClientError, Result};
use crate::protocol::nfs3::{call, expect_ok};
use crate::protocol::rpc::RpcSession;
use crate::protocol::xdr::nfs3::{
    diropargs3, entry3, entryplus3, mknoddata3, nfs_fh3, post_op_attr, post_op_fh3, sattr3,
    symlinkdata3, wcc_data, MKDIR3args, MKNOD3args, NFSProgram, READDIR3args, READDIR3resok,
    READDIRPLUS3args, SYMLINK3args,
};
pub use crate::protocol::xdr::nfs3::{cookieverf3, devicedata3, devicetype3};
use crate::protocol::xdr::rpc::opaque_auth;
use crate::protocol::xdr::{Deserialize, Serialize};

/// Creates a directory named `name` inside `dir` with the given initial
/// attributes. Returns the new directory's handle (the server may decline
/// to return one, in which case a follow-up LOOKUP is needed), its
/// attributes, and the parent's weak cache consistency data.
pub async fn mkdir(
    session: &RpcSession,
    cred: opaque_auth,
    dir: &nfs_fh3,
    name: impl Into<Vec<u8>>,
    attributes: sattr3,
) -> Result<(post_op_fh3, post_op_attr, wcc_data)> {
    let args = MKDIR3args { dirops: diropargs3 { dir: dir.clone(), name: name.into().into() }, attributes };
    let mut buf = Vec::new();
    args.serialize(&mut buf).map_err(ClientError::from)?;

    let reply = call(session, cred, NFSProgram::NFSPROC3_MKDIR, &buf).await?;
    let mut cursor = std::io::Cursor::new(reply.as_slice());
    expect_ok(&mut cursor)?;
    let ok =
        crate::protocol::xdr::nfs3::MKDIR3resok::deserialize(&mut cursor).map_err(ClientError::from_decode_error)?;
    Ok((ok.obj, ok.obj_attributes, ok.dir_wcc))
}

/// Creates a symbolic link named `name` inside `dir`, pointing at
/// `target_path`.
pub async fn symlink(
    session: &RpcSession,
    cred: opaque_auth,
    dir: &nfs_fh3,
    name: impl Into<Vec<u8>>,
    target_path: impl Into<Vec<u8>>,
    attributes: sattr3,
) -> Result<(post_op_fh3, post_op_attr, wcc_data)> {
    let args = SYMLINK3args {
        dirops: diropargs3 { dir: dir.clone(), name: name.into().into() },
        symlink: symlinkdata3 { symlink_attributes: attributes, symlink_data: target_path.into().into() },
    };
    let mut buf = Vec::new();
    args.serialize(&mut buf).map_err(ClientError::from)?;

    let reply = call(session, cred, NFSProgram::NFSPROC3_SYMLINK, &buf).await?;
    let mut cursor = std::io::Cursor::new(reply.as_slice());
    expect_ok(&mut cursor)?;
    let ok = crate::protocol::xdr::nfs3::SYMLINK3resok::deserialize(&mut cursor)
        .map_err(ClientError::from_decode_error)?;
    Ok((ok.obj, ok.obj_attributes, ok.dir_wcc))
}

/// Creates a special file (device, socket or FIFO) named `name` inside
/// `dir`. `what` picks the kind and, for character/block devices, the
/// major/minor numbers (see [`mknoddata3`]).
pub async fn mknod(
    session: &RpcSession,
    cred: opaque_auth,
    dir: &nfs_fh3,
    name: impl Into<Vec<u8>>,
    what: mknoddata3,
) -> Result<(post_op_fh3, post_op_attr, wcc_data)> {
    let args = MKNOD3args { where_dir: diropargs3 { dir: dir.clone(), name: name.into().into() }, what };
    let mut buf = Vec::new();
    args.serialize(&mut buf).map_err(ClientError::from)?;

    let reply = call(session, cred, NFSProgram::NFSPROC3_MKNOD, &buf).await?;
    let mut cursor = std::io::Cursor::new(reply.as_slice());
    expect_ok(&mut cursor)?;
    let ok = crate::protocol::xdr::nfs3::MKNOD3resok::deserialize(&mut cursor)
        .map_err(ClientError::from_decode_error)?;
    Ok((ok.obj, ok.obj_attributes, ok.dir_wcc))
}

/// One page of a plain READDIR listing: entries carry only a file id, name
/// and cookie, no attributes or handles. Most callers want
/// [`readdirplus`] instead; this is here because some servers export
/// READDIR on file systems where READDIRPLUS is disabled.
pub async fn readdir(
    session: &RpcSession,
    cred: opaque_auth,
    dir: &nfs_fh3,
    cookie: u64,
    cookieverf: cookieverf3,
    dircount: u32,
) -> Result<(Vec<entry3>, cookieverf3, bool)> {
    let args = READDIR3args { dir: dir.clone(), cookie, cookieverf, dircount };
    let mut buf = Vec::new();
    args.serialize(&mut buf).map_err(ClientError::from)?;

    let reply = call(session, cred, NFSProgram::NFSPROC3_READDIR, &buf).await?;
    let mut cursor = std::io::Cursor::new(reply.as_slice());
    expect_ok(&mut cursor)?;
    let ok = READDIR3resok::deserialize(&mut cursor).map_err(ClientError::from_decode_error)?;
    Ok((ok.reply.entries, ok.cookieverf, ok.reply.eof))
}

/// One page of a READDIRPLUS listing: each entry carries its own
/// attributes and (usually) file handle, avoiding a LOOKUP per name. This
/// is what the enumeration driver uses to walk a directory tree.
pub async fn readdirplus(
    session: &RpcSession,
    cred: opaque_auth,
    dir: &nfs_fh3,
    cookie: u64,
    cookieverf: cookieverf3,
    dircount: u32,
    maxcount: u32,
) -> Result<(Vec<entryplus3>, cookieverf3, bool)> {
    let args = READDIRPLUS3args { dir: dir.clone(), cookie, cookieverf, dircount, maxcount };
    let mut buf = Vec::new();
    args.serialize(&mut buf).map_err(ClientError::from)?;

    let reply = call(session, cred, NFSProgram::NFSPROC3_READDIRPLUS, &buf).await?;
    let mut cursor = std::io::Cursor::new(reply.as_slice());
    expect_ok(&mut cursor)?;
    let ok = crate::protocol::xdr::nfs3::READDIRPLUS3resok::deserialize(&mut cursor)
        .map_err(ClientError::from_decode_error)?;
    Ok((ok.reply.entries, ok.cookieverf, ok.reply.eof))
}

#[cfg(test)]
mod tests {
    use tokio::net::{TcpListener, TcpStream};

    use super::*;
    use crate::protocol::rpc::{read_message, write_message};
    use crate::protocol::xdr::nfs3::{dirlistplus3, nfsstat3, READDIRPLUS3resok};
    use crate::protocol::xdr::rpc::{accepted_reply, accept_body, reply_body, rpc_body, rpc_msg};

    async fn serve_reply(listener: TcpListener, payload: Vec<u8>) {
        let (mut stream, _) = listener.accept().await.unwrap();
        let request = read_message(&mut stream, 1 << 20).await.unwrap();
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
        out.extend_from_slice(&payload);
        write_message(&mut stream, &out, 1 << 20).await.unwrap();
    }

    #[tokio::test]
    async fn readdirplus_returns_entries_and_eof() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let entry = entryplus3 {
            fileid: 42,
            name: b"child".to_vec().into(),
            cookie: 1,
            name_attributes: post_op_attr::Void,
            name_handle: post_op_fh3::Void,
        };
        let mut payload = Vec::new();
        nfsstat3::NFS3_OK.serialize(&mut payload).unwrap();
        READDIRPLUS3resok {
            dir_attributes: post_op_attr::Void,
            cookieverf: Default::default(),
            reply: dirlistplus3 { entries: vec![entry], eof: true },
        }
        .serialize(&mut payload)
        .unwrap();

        let server = tokio::spawn(serve_reply(listener, payload));

        let stream = TcpStream::connect(addr).await.unwrap();
        let session = RpcSession::from_stream(stream, 1 << 16);
        let dir = nfs_fh3 { data: vec![0u8; 4] };
        let (entries, _verf, eof) =
            readdirplus(&session, opaque_auth::none(), &dir, 0, Default::default(), 4096, 8192)
                .await
                .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name.as_ref(), b"child");
        assert!(eof);

        server.await.unwrap();
    }
}
