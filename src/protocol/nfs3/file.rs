//! Client wrappers for the data-plane procedures: READ, WRITE, LINK and
//! COMMIT (RFC 1813 §§3.3.6, 3.3.7, 3.3.15, 3.3.21).

use crate::error::{ClientError, Result};
use crate::protocol::nfs3::{call, expect_ok};
use crate::protocol::rpc::RpcSession;
use crate::protocol::xdr::nfs3::{
    diropargs3, nfs_fh3, wcc_data, LINK3args, LINK3resok, NFSProgram, COMMIT3args, COMMIT3resok,
    READ3args, READ3resok, WRITE3args, WRITE3resok,
};
pub use crate::protocol::xdr::nfs3::stable_how;
use crate::protocol::xdr::rpc::opaque_auth;
use crate::protocol::xdr::{Deserialize, Serialize};

/// Reads up to `count` bytes of `file` starting at `offset`. The reply's
/// `eof` flag tells the caller whether the read reached the end of the
/// file; a short read with `eof == false` is possible and does not by
/// itself mean anything went wrong.
pub async fn read(
    session: &RpcSession,
    cred: opaque_auth,
    file: &nfs_fh3,
    offset: u64,
    count: u32,
) -> Result<(Vec<u8>, bool)> {
    let args = READ3args { file: file.clone(), offset, count };
    let mut buf = Vec::new();
    args.serialize(&mut buf).map_err(ClientError::from)?;

    let reply = call(session, cred, NFSProgram::NFSPROC3_READ, &buf).await?;
    let mut cursor = std::io::Cursor::new(reply.as_slice());
    expect_ok(&mut cursor)?;
    let ok = READ3resok::deserialize(&mut cursor).map_err(ClientError::from_decode_error)?;
    Ok((ok.data, ok.eof))
}

/// Writes `data` to `file` starting at `offset`, asking the server to
/// commit it as `stable`. Returns the count the server actually wrote and
/// how it was committed: a server is free to write fewer bytes than asked
/// or upgrade `UNSTABLE` to a stronger guarantee.
pub async fn write(
    session: &RpcSession,
    cred: opaque_auth,
    file: &nfs_fh3,
    offset: u64,
    data: Vec<u8>,
    stable: stable_how,
) -> Result<(u32, stable_how)> {
    let count = data.len() as u32;
    let args = WRITE3args { file: file.clone(), offset, count, stable, data };
    let mut buf = Vec::new();
    args.serialize(&mut buf).map_err(ClientError::from)?;

    let reply = call(session, cred, NFSProgram::NFSPROC3_WRITE, &buf).await?;
    let mut cursor = std::io::Cursor::new(reply.as_slice());
    expect_ok(&mut cursor)?;
    let ok = WRITE3resok::deserialize(&mut cursor).map_err(ClientError::from_decode_error)?;
    Ok((ok.count, ok.committed))
}

/// Creates a hard link named `link_name` inside `link_dir`, pointing at the
/// existing file `file`.
pub async fn link(
    session: &RpcSession,
    cred: opaque_auth,
    file: &nfs_fh3,
    link_dir: &nfs_fh3,
    link_name: impl Into<Vec<u8>>,
) -> Result<wcc_data> {
    let args = LINK3args {
        file: file.clone(),
        link: diropargs3 { dir: link_dir.clone(), name: link_name.into().into() },
    };
    let mut buf = Vec::new();
    args.serialize(&mut buf).map_err(ClientError::from)?;

    let reply = call(session, cred, NFSProgram::NFSPROC3_LINK, &buf).await?;
    let mut cursor = std::io::Cursor::new(reply.as_slice());
    expect_ok(&mut cursor)?;
    Ok(LINK3resok::deserialize(&mut cursor).map_err(ClientError::from_decode_error)?.linkdir_wcc)
}

/// Asks the server to flush previously `UNSTABLE`-written data for `file`
/// in the byte range `[offset, offset + count)` to stable storage. A
/// `count` of 0 means "from `offset` to the current end of file" (RFC 1813
/// §3.3.21). The returned `writeverf3` must match the verifier observed on
/// the writes being committed; a mismatch means the server restarted and
/// the data must be rewritten.
pub async fn commit(
    session: &RpcSession,
    cred: opaque_auth,
    file: &nfs_fh3,
    offset: u64,
    count: u32,
) -> Result<(wcc_data, crate::protocol::xdr::nfs3::writeverf3)> {
    let args = COMMIT3args { file: file.clone(), offset, count };
    let mut buf = Vec::new();
    args.serialize(&mut buf).map_err(ClientError::from)?;

    let reply = call(session, cred, NFSProgram::NFSPROC3_COMMIT, &buf).await?;
    let mut cursor = std::io::Cursor::new(reply.as_slice());
    expect_ok(&mut cursor)?;
    let ok = COMMIT3resok::deserialize(&mut cursor).map_err(ClientError::from_decode_error)?;
    Ok((ok.file_wcc, ok.verf))
}

#[cfg(test)]
mod tests {
    use tokio::net::{TcpListener, TcpStream};

    use super::*;
    use crate::protocol::rpc::{read_message, write_message};
    use crate::protocol::xdr::nfs3::{nfsstat3, post_op_attr};
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
    async fn read_reports_eof() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut payload = Vec::new();
        nfsstat3::NFS3_OK.serialize(&mut payload).unwrap();
        READ3resok { file_attributes: post_op_attr::Void, count: 3, eof: true, data: vec![1, 2, 3] }
            .serialize(&mut payload)
            .unwrap();

        let server = tokio::spawn(serve_reply(listener, payload));

        let stream = TcpStream::connect(addr).await.unwrap();
        let session = RpcSession::from_stream(stream, 1 << 16);
        let file = nfs_fh3 { data: vec![0u8; 4] };
        let (data, eof) = read(&session, opaque_auth::none(), &file, 0, 1024).await.unwrap();
        assert_eq!(data, vec![1, 2, 3]);
        assert!(eof);

        server.await.unwrap();
    }

    #[tokio::test]
    async fn write_returns_actual_count_and_commit_level() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut payload = Vec::new();
        nfsstat3::NFS3_OK.serialize(&mut payload).unwrap();
        WRITE3resok {
            file_wcc: wcc_data::default(),
            count: 3,
            committed: stable_how::FILE_SYNC,
            verf: Default::default(),
        }
        .serialize(&mut payload)
        .unwrap();

        let server = tokio::spawn(serve_reply(listener, payload));

        let stream = TcpStream::connect(addr).await.unwrap();
        let session = RpcSession::from_stream(stream, 1 << 16);
        let file = nfs_fh3 { data: vec![0u8; 4] };
        let (count, committed) =
            write(&session, opaque_auth::none(), &file, 0, vec![1, 2, 3], stable_how::UNSTABLE)
                .await
                .unwrap();
        assert_eq!(count, 3);
        assert!(matches!(committed, stable_how::FILE_SYNC));

        server.await.unwrap();
    }
}
