//! Client for the NFSv3 procedure surface (RFC 1813, program `100003`).
//!
//! Every function here takes an already-mounted [`RpcSession`] and the
//! caller's [`opaque_auth`] credential, writes its procedure-specific
//! arguments, and decodes the `nfsstat3`-prefixed reply. A non-`NFS3_OK`
//! status becomes [`ClientError::Nfs`] without attempting to parse the
//! failure-specific diagnostic body (`wcc_data`/`post_op_attr`) that some
//! procedures carry after it: a caller that needs the post-failure
//! attributes can always issue an explicit [`getattr`].
//!
//! File handles cross this boundary as raw [`nfs_fh3`] values; mapping them
//! to and from the session's local integer tokens is
//! [`crate::registry::HandleRegistry`]'s job, not this module's.

pub mod dir;
pub mod file;
pub mod fs;

use crate::error::{ClientError, Result};
use crate::protocol::rpc::RpcSession;
use crate::protocol::xdr::nfs3::{
    diropargs3, fattr3, nfs_fh3, nfsstat3, sattr3, sattrguard3, wcc_data, ACCESS3args, ACCESS3resok,
    CREATE3args, CREATE3resok, GETATTR3args, GETATTR3resok, LOOKUP3args, LOOKUP3resok, NFSProgram,
    READLINK3resok, RENAME3args, RENAME3wcc, SETATTR3args, PROGRAM, VERSION,
};
pub use crate::protocol::xdr::nfs3::{
    createhow3, createmode3, post_op_attr, ACCESS3_DELETE, ACCESS3_EXECUTE, ACCESS3_EXTEND,
    ACCESS3_LOOKUP, ACCESS3_MODIFY, ACCESS3_READ,
};
use crate::protocol::xdr::rpc::opaque_auth;
use crate::protocol::xdr::{Deserialize, Serialize};

/// Reads the `nfsstat3` every NFSv3 reply starts with and turns anything
/// other than `NFS3_OK` into [`ClientError::Nfs`].
pub(crate) fn expect_ok(cursor: &mut std::io::Cursor<&[u8]>) -> Result<()> {
    let stat = nfsstat3::deserialize(cursor).map_err(ClientError::from_decode_error)?;
    if stat == nfsstat3::NFS3_OK {
        Ok(())
    } else {
        Err(ClientError::Nfs(stat))
    }
}

pub(crate) async fn call(
    session: &RpcSession,
    cred: opaque_auth,
    proc: NFSProgram,
    args: &[u8],
) -> Result<Vec<u8>> {
    session.call(PROGRAM, VERSION, proc as u32, cred, args).await
}

/// Pings the NFSv3 service.
pub async fn null(session: &RpcSession, cred: opaque_auth) -> Result<()> {
    call(session, cred, NFSProgram::NFSPROC3_NULL, &[]).await?;
    Ok(())
}

/// Returns the attributes of `object`.
pub async fn getattr(session: &RpcSession, cred: opaque_auth, object: &nfs_fh3) -> Result<fattr3> {
    let args = GETATTR3args { object: object.clone() };
    let mut buf = Vec::new();
    args.serialize(&mut buf).map_err(ClientError::from)?;

    let reply = call(session, cred, NFSProgram::NFSPROC3_GETATTR, &buf).await?;
    let mut cursor = std::io::Cursor::new(reply.as_slice());
    expect_ok(&mut cursor)?;
    Ok(GETATTR3resok::deserialize(&mut cursor).map_err(ClientError::from_decode_error)?.obj_attributes)
}

/// Changes `object`'s attributes. `guard` lets the caller make the change
/// conditional on the object's ctime not having moved since it was last
/// observed (RFC 1813 §3.3.2).
pub async fn setattr(
    session: &RpcSession,
    cred: opaque_auth,
    object: &nfs_fh3,
    new_attributes: sattr3,
    guard: sattrguard3,
) -> Result<wcc_data> {
    let args = SETATTR3args { object: object.clone(), new_attribute: new_attributes, guard };
    let mut buf = Vec::new();
    args.serialize(&mut buf).map_err(ClientError::from)?;

    let reply = call(session, cred, NFSProgram::NFSPROC3_SETATTR, &buf).await?;
    let mut cursor = std::io::Cursor::new(reply.as_slice());
    expect_ok(&mut cursor)?;
    wcc_data::deserialize(&mut cursor).map_err(ClientError::from_decode_error)
}

/// The outcome of looking an entry up: either it exists, with a handle and
/// attributes, or it doesn't. `NFS3ERR_NOENT` is folded into
/// [`LookupResult::Absent`] rather than surfaced as an error: a missing name
/// is an ordinary, expected outcome of LOOKUP, not a protocol failure. Any
/// other non-OK status is still a real error.
#[derive(Debug, Clone)]
pub enum LookupResult {
    Found { object: nfs_fh3, obj_attributes: post_op_attr },
    Absent,
}

/// Looks up `name` inside `dir`.
pub async fn lookup(
    session: &RpcSession,
    cred: opaque_auth,
    dir: &nfs_fh3,
    name: impl Into<Vec<u8>>,
) -> Result<LookupResult> {
    let args: LOOKUP3args = diropargs3 { dir: dir.clone(), name: name.into().into() };
    let mut buf = Vec::new();
    args.serialize(&mut buf).map_err(ClientError::from)?;

    let reply = call(session, cred, NFSProgram::NFSPROC3_LOOKUP, &buf).await?;
    let mut cursor = std::io::Cursor::new(reply.as_slice());
    let stat = nfsstat3::deserialize(&mut cursor).map_err(ClientError::from_decode_error)?;
    match stat {
        nfsstat3::NFS3_OK => {
            let ok = LOOKUP3resok::deserialize(&mut cursor).map_err(ClientError::from_decode_error)?;
            Ok(LookupResult::Found { object: ok.object, obj_attributes: ok.obj_attributes })
        }
        nfsstat3::NFS3ERR_NOENT => Ok(LookupResult::Absent),
        other => Err(ClientError::Nfs(other)),
    }
}

/// Checks which of the requested `access` bits (the `ACCESS3_*` constants,
/// OR'd together) the caller is actually granted on `object`.
pub async fn access(
    session: &RpcSession,
    cred: opaque_auth,
    object: &nfs_fh3,
    access_bits: u32,
) -> Result<u32> {
    let args = ACCESS3args { object: object.clone(), access: access_bits };
    let mut buf = Vec::new();
    args.serialize(&mut buf).map_err(ClientError::from)?;

    let reply = call(session, cred, NFSProgram::NFSPROC3_ACCESS, &buf).await?;
    let mut cursor = std::io::Cursor::new(reply.as_slice());
    expect_ok(&mut cursor)?;
    Ok(ACCESS3resok::deserialize(&mut cursor).map_err(ClientError::from_decode_error)?.access)
}

/// Reads the target path of symlink `object`. READLINK's argument is just
/// the file handle itself (RFC 1813 §3.3.5), so there is no dedicated
/// `READLINK3args` struct to build.
pub async fn readlink(session: &RpcSession, cred: opaque_auth, object: &nfs_fh3) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    object.serialize(&mut buf).map_err(ClientError::from)?;

    let reply = call(session, cred, NFSProgram::NFSPROC3_READLINK, &buf).await?;
    let mut cursor = std::io::Cursor::new(reply.as_slice());
    expect_ok(&mut cursor)?;
    Ok(READLINK3resok::deserialize(&mut cursor).map_err(ClientError::from_decode_error)?.data.to_vec())
}

/// Creates a regular file named `name` in `dir`. Returns the new file's
/// handle (the server may decline to return one, in which case a
/// follow-up LOOKUP is needed), its attributes, and the parent's weak
/// cache consistency data.
pub async fn create(
    session: &RpcSession,
    cred: opaque_auth,
    dir: &nfs_fh3,
    name: impl Into<Vec<u8>>,
    how: createhow3,
) -> Result<(crate::protocol::xdr::nfs3::post_op_fh3, post_op_attr, wcc_data)> {
    let args = CREATE3args { where_dir: diropargs3 { dir: dir.clone(), name: name.into().into() }, how };
    let mut buf = Vec::new();
    args.serialize(&mut buf).map_err(ClientError::from)?;

    let reply = call(session, cred, NFSProgram::NFSPROC3_CREATE, &buf).await?;
    let mut cursor = std::io::Cursor::new(reply.as_slice());
    expect_ok(&mut cursor)?;
    let ok = CREATE3resok::deserialize(&mut cursor).map_err(ClientError::from_decode_error)?;
    Ok((ok.obj, ok.obj_attributes, ok.dir_wcc))
}

/// Removes the entry named `name` from `dir`. Works on any non-directory
/// entry, including the last link to a file (`remove` vs `rmdir` matches
/// POSIX `unlink`/`rmdir`, not a distinction NFSv3 makes by file type).
pub async fn remove(
    session: &RpcSession,
    cred: opaque_auth,
    dir: &nfs_fh3,
    name: impl Into<Vec<u8>>,
) -> Result<wcc_data> {
    let args: diropargs3 = diropargs3 { dir: dir.clone(), name: name.into().into() };
    let mut buf = Vec::new();
    args.serialize(&mut buf).map_err(ClientError::from)?;

    let reply = call(session, cred, NFSProgram::NFSPROC3_REMOVE, &buf).await?;
    let mut cursor = std::io::Cursor::new(reply.as_slice());
    expect_ok(&mut cursor)?;
    wcc_data::deserialize(&mut cursor).map_err(ClientError::from_decode_error)
}

/// Removes the empty directory named `name` from `dir`.
pub async fn rmdir(
    session: &RpcSession,
    cred: opaque_auth,
    dir: &nfs_fh3,
    name: impl Into<Vec<u8>>,
) -> Result<wcc_data> {
    let args: diropargs3 = diropargs3 { dir: dir.clone(), name: name.into().into() };
    let mut buf = Vec::new();
    args.serialize(&mut buf).map_err(ClientError::from)?;

    let reply = call(session, cred, NFSProgram::NFSPROC3_RMDIR, &buf).await?;
    let mut cursor = std::io::Cursor::new(reply.as_slice());
    expect_ok(&mut cursor)?;
    wcc_data::deserialize(&mut cursor).map_err(ClientError::from_decode_error)
}

/// Renames `from_name` in `from_dir` to `to_name` in `to_dir`, possibly
/// across directories.
pub async fn rename(
    session: &RpcSession,
    cred: opaque_auth,
    from_dir: &nfs_fh3,
    from_name: impl Into<Vec<u8>>,
    to_dir: &nfs_fh3,
    to_name: impl Into<Vec<u8>>,
) -> Result<RENAME3wcc> {
    let args = RENAME3args {
        from: diropargs3 { dir: from_dir.clone(), name: from_name.into().into() },
        to: diropargs3 { dir: to_dir.clone(), name: to_name.into().into() },
    };
    let mut buf = Vec::new();
    args.serialize(&mut buf).map_err(ClientError::from)?;

    let reply = call(session, cred, NFSProgram::NFSPROC3_RENAME, &buf).await?;
    let mut cursor = std::io::Cursor::new(reply.as_slice());
    expect_ok(&mut cursor)?;
    RENAME3wcc::deserialize(&mut cursor).map_err(ClientError::from_decode_error)
}

#[cfg(test)]
mod tests {
    use tokio::net::{TcpListener, TcpStream};

    use super::*;
    use crate::protocol::rpc::{read_message, write_message};
    use crate::protocol::xdr::nfs3::post_op_attr;
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
    async fn lookup_not_found_is_absent_not_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut payload = Vec::new();
        nfsstat3::NFS3ERR_NOENT.serialize(&mut payload).unwrap();
        post_op_attr::Void.serialize(&mut payload).unwrap();

        let server = tokio::spawn(serve_reply(listener, payload));

        let stream = TcpStream::connect(addr).await.unwrap();
        let session = RpcSession::from_stream(stream, 1 << 16);
        let dir = nfs_fh3 { data: vec![0u8; 4] };
        let result = lookup(&session, opaque_auth::none(), &dir, b"missing".to_vec()).await.unwrap();
        assert!(matches!(result, LookupResult::Absent));

        server.await.unwrap();
    }

    #[tokio::test]
    async fn getattr_surfaces_other_errors() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut payload = Vec::new();
        nfsstat3::NFS3ERR_STALE.serialize(&mut payload).unwrap();

        let server = tokio::spawn(serve_reply(listener, payload));

        let stream = TcpStream::connect(addr).await.unwrap();
        let session = RpcSession::from_stream(stream, 1 << 16);
        let object = nfs_fh3 { data: vec![0u8; 4] };
        let err = getattr(&session, opaque_auth::none(), &object).await.unwrap_err();
        assert!(matches!(err, ClientError::Nfs(nfsstat3::NFS3ERR_STALE)));

        server.await.unwrap();
    }
}
