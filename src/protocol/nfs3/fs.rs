//! Client wrappers for the whole-file-system procedures: FSSTAT, FSINFO and
//! PATHCONF (RFC 1813 §§3.3.18-3.3.20). All three take just the object's
//! file handle as their argument — there is no dedicated `*3args` struct
//! for any of them.

use crate::error::{ClientError, Result};
use crate::protocol::nfs3::{call, expect_ok};
use crate::protocol::rpc::RpcSession;
use crate::protocol::xdr::nfs3::{fsinfo3, nfs_fh3, NFSProgram, FSSTAT3resok, PATHCONF3resok};
use crate::protocol::xdr::rpc::opaque_auth;
use crate::protocol::xdr::{Deserialize, Serialize};

/// Returns dynamic file system state: space and inode usage.
pub async fn fsstat(session: &RpcSession, cred: opaque_auth, object: &nfs_fh3) -> Result<FSSTAT3resok> {
    let mut buf = Vec::new();
    object.serialize(&mut buf).map_err(ClientError::from)?;

    let reply = call(session, cred, NFSProgram::NFSPROC3_FSSTAT, &buf).await?;
    let mut cursor = std::io::Cursor::new(reply.as_slice());
    expect_ok(&mut cursor)?;
    FSSTAT3resok::deserialize(&mut cursor).map_err(ClientError::from_decode_error)
}

/// Returns static file system properties: size/request limits and the
/// `FSF_*` capability bitmask. Typically called once, right after MOUNT,
/// to size subsequent READ/WRITE requests.
pub async fn fsinfo(session: &RpcSession, cred: opaque_auth, object: &nfs_fh3) -> Result<fsinfo3> {
    let mut buf = Vec::new();
    object.serialize(&mut buf).map_err(ClientError::from)?;

    let reply = call(session, cred, NFSProgram::NFSPROC3_FSINFO, &buf).await?;
    let mut cursor = std::io::Cursor::new(reply.as_slice());
    expect_ok(&mut cursor)?;
    fsinfo3::deserialize(&mut cursor).map_err(ClientError::from_decode_error)
}

/// Returns POSIX pathconf-style limits (max link count, max name length,
/// name truncation/case-folding behavior) for the file system containing
/// `object`.
pub async fn pathconf(session: &RpcSession, cred: opaque_auth, object: &nfs_fh3) -> Result<PATHCONF3resok> {
    let mut buf = Vec::new();
    object.serialize(&mut buf).map_err(ClientError::from)?;

    let reply = call(session, cred, NFSProgram::NFSPROC3_PATHCONF, &buf).await?;
    let mut cursor = std::io::Cursor::new(reply.as_slice());
    expect_ok(&mut cursor)?;
    PATHCONF3resok::deserialize(&mut cursor).map_err(ClientError::from_decode_error)
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
    async fn fsinfo_reports_properties_bitmask() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut payload = Vec::new();
        nfsstat3::NFS3_OK.serialize(&mut payload).unwrap();
        fsinfo3 {
            obj_attributes: post_op_attr::Void,
            rtmax: 65536,
            rtpref: 32768,
            rtmult: 4096,
            wtmax: 65536,
            wtpref: 32768,
            wtmult: 4096,
            dtpref: 8192,
            maxfilesize: u64::MAX,
            time_delta: Default::default(),
            properties: crate::protocol::xdr::nfs3::FSF_LINK | crate::protocol::xdr::nfs3::FSF_SYMLINK,
        }
        .serialize(&mut payload)
        .unwrap();

        let server = tokio::spawn(serve_reply(listener, payload));

        let stream = TcpStream::connect(addr).await.unwrap();
        let session = RpcSession::from_stream(stream, 1 << 16);
        let root = nfs_fh3 { data: vec![0u8; 4] };
        let info = fsinfo(&session, opaque_auth::none(), &root).await.unwrap();
        assert_eq!(info.rtmax, 65536);
        assert_eq!(info.properties & crate::protocol::xdr::nfs3::FSF_LINK, crate::protocol::xdr::nfs3::FSF_LINK);

        server.await.unwrap();
    }
}
