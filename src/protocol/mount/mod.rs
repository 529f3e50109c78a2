//! Client for the MOUNT protocol (RFC 1813 Appendix I, program `100005`).
//!
//! MOUNT is the bootstrap step between resolving NFSv3's port via PORTMAP
//! and making the first NFSv3 call: [`mnt`] exchanges an export path for the
//! root file handle NFSv3 operations are relative to.

use crate::error::{ClientError, Result};
use crate::protocol::rpc::RpcSession;
use crate::protocol::xdr::mount::{
    exportnode, mountbody, mountres3, mountstat3, MountProgram, PROGRAM, VERSION,
};
use crate::protocol::xdr::rpc::opaque_auth;
use crate::protocol::xdr::{read_nextlist, Deserialize, Serialize};

/// Pings the MOUNT service.
pub async fn null(session: &RpcSession) -> Result<()> {
    session
        .call(PROGRAM, VERSION, MountProgram::MOUNTPROC3_NULL as u32, opaque_auth::none(), &[])
        .await?;
    Ok(())
}

/// Mounts `export_path` and returns its root file handle (raw server bytes;
/// the caller's [`crate::registry::HandleRegistry`] wraps it as the session's
/// root token). A non-`MNT3_OK` status comes back as [`ClientError::MountDenied`].
pub async fn mnt(session: &RpcSession, export_path: &[u8]) -> Result<Vec<u8>> {
    let mut args = Vec::new();
    export_path.to_vec().serialize(&mut args).map_err(ClientError::from)?;

    let reply = session
        .call(PROGRAM, VERSION, MountProgram::MOUNTPROC3_MNT as u32, opaque_auth::none(), &args)
        .await?;

    let mut cursor = std::io::Cursor::new(reply.as_slice());
    match mountres3::deserialize(&mut cursor).map_err(ClientError::from_decode_error)? {
        mountres3::Ok(ok) => Ok(ok.fhandle),
        mountres3::Err(stat) => Err(ClientError::MountDenied(stat)),
    }
}

/// Lists the server's record of who has what mounted.
pub async fn dump(session: &RpcSession) -> Result<Vec<mountbody>> {
    let reply = session
        .call(PROGRAM, VERSION, MountProgram::MOUNTPROC3_DUMP as u32, opaque_auth::none(), &[])
        .await?;
    let mut cursor = std::io::Cursor::new(reply.as_slice());
    read_nextlist(&mut cursor).map_err(ClientError::from_decode_error)
}

/// Tells the server this client is no longer mounting `export_path`.
/// Best-effort from the caller's perspective: servers track this for
/// informational purposes only, nothing enforces it.
pub async fn umnt(session: &RpcSession, export_path: &[u8]) -> Result<()> {
    let mut args = Vec::new();
    export_path.to_vec().serialize(&mut args).map_err(ClientError::from)?;
    session
        .call(PROGRAM, VERSION, MountProgram::MOUNTPROC3_UMNT as u32, opaque_auth::none(), &args)
        .await?;
    Ok(())
}

/// Tells the server this client is not mounting anything from it at all.
/// Used as the best-effort cleanup call before a session's connection is
/// torn down (§4.5).
pub async fn umnt_all(session: &RpcSession) -> Result<()> {
    session
        .call(PROGRAM, VERSION, MountProgram::MOUNTPROC3_UMNTALL as u32, opaque_auth::none(), &[])
        .await?;
    Ok(())
}

/// Lists the exports the server offers and, for each, the client/netgroup
/// names allowed to mount it.
pub async fn export(session: &RpcSession) -> Result<Vec<exportnode>> {
    let reply = session
        .call(PROGRAM, VERSION, MountProgram::MOUNTPROC3_EXPORT as u32, opaque_auth::none(), &[])
        .await?;
    let mut cursor = std::io::Cursor::new(reply.as_slice());
    read_nextlist(&mut cursor).map_err(ClientError::from_decode_error)
}

#[cfg(test)]
mod tests {
    use tokio::net::{TcpListener, TcpStream};

    use super::*;
    use crate::protocol::rpc::{read_message, write_message};
    use crate::protocol::xdr::mount::mountres3_ok;
    use crate::protocol::xdr::rpc::{accepted_reply, accept_body, reply_body, rpc_body, rpc_msg};

    #[tokio::test]
    async fn mnt_returns_root_handle_on_ok() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_message(&mut stream, 1 << 20).await.unwrap();
            let mut cursor = std::io::Cursor::new(request.as_slice());
            let msg = rpc_msg::deserialize(&mut cursor).unwrap();

            let mut payload = Vec::new();
            mountres3::Ok(mountres3_ok { fhandle: vec![1, 2, 3, 4], auth_flavors: vec![0] })
                .serialize(&mut payload)
                .unwrap();

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
        });

        let stream = TcpStream::connect(addr).await.unwrap();
        let session = RpcSession::from_stream(stream, 1 << 16);
        let handle = mnt(&session, b"/export").await.unwrap();
        assert_eq!(handle, vec![1, 2, 3, 4]);

        server.await.unwrap();
    }

    #[tokio::test]
    async fn mnt_surfaces_denied_status() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_message(&mut stream, 1 << 20).await.unwrap();
            let mut cursor = std::io::Cursor::new(request.as_slice());
            let msg = rpc_msg::deserialize(&mut cursor).unwrap();

            let mut payload = Vec::new();
            mountres3::Err(mountstat3::MNT3ERR_ACCES).serialize(&mut payload).unwrap();

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
        });

        let stream = TcpStream::connect(addr).await.unwrap();
        let session = RpcSession::from_stream(stream, 1 << 16);
        let err = mnt(&session, b"/export").await.unwrap_err();
        assert!(matches!(err, ClientError::MountDenied(mountstat3::MNT3ERR_ACCES)));

        server.await.unwrap();
    }
}
