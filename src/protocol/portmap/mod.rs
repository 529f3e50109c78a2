//! Client for the PORTMAP/rpcbind protocol (RFC 1833, program `100000`).
//!
//! Before a client can speak to an NFSv3 or MOUNT service at an unknown port
//! it asks the well-known portmapper (port 111) to resolve `(program,
//! version, protocol)` to a port number via [`get_port`]. This module also
//! exposes the rest of the portmapper's small procedure set: [`null`],
//! [`dump`], [`call_it`] and [`get_time`].

use crate::error::{ClientError, Result};
use crate::protocol::rpc::RpcSession;
use crate::protocol::xdr::portmap::{
    call_args, call_result, mapping, PortmapProgram, IPPROTO_TCP, PROGRAM, VERSION, VERSION_GETTIME,
};
use crate::protocol::xdr::rpc::opaque_auth;
use crate::protocol::xdr::{read_nextlist, write_nextlist, Deserialize, Serialize};

/// Pings the portmapper. Succeeds iff the service is reachable and speaks
/// RPC at all; carries no data.
pub async fn null(session: &RpcSession) -> Result<()> {
    session
        .call(PROGRAM, VERSION, PortmapProgram::PMAPPROC_NULL as u32, opaque_auth::none(), &[])
        .await?;
    Ok(())
}

/// Resolves the TCP port a `(program, version)` pair is registered on.
/// Returns [`ClientError::ServiceNotRegistered`] if the portmapper answers
/// but the service isn't registered (port 0), matching §4.4's distinction
/// between "portmapper unreachable" and "service not registered".
pub async fn get_port(session: &RpcSession, program: u32, version: u32) -> Result<u16> {
    let request = mapping { prog: program, vers: version, prot: IPPROTO_TCP, port: 0 };
    let mut args = Vec::new();
    request.serialize(&mut args).map_err(ClientError::from)?;

    let reply = session
        .call(PROGRAM, VERSION, PortmapProgram::PMAPPROC_GETPORT as u32, opaque_auth::none(), &args)
        .await?;

    let mut cursor = std::io::Cursor::new(reply.as_slice());
    let port = u32::deserialize(&mut cursor).map_err(ClientError::from_decode_error)?;

    if port == 0 {
        return Err(ClientError::ServiceNotRegistered { program, version });
    }
    u16::try_from(port)
        .map_err(|_| ClientError::MalformedMessage(format!("portmapper returned out-of-range port {port}")))
}

/// Lists every `(program, version, protocol, port)` mapping currently
/// registered with the portmapper.
pub async fn dump(session: &RpcSession) -> Result<Vec<mapping>> {
    let reply = session
        .call(PROGRAM, VERSION, PortmapProgram::PMAPPROC_DUMP as u32, opaque_auth::none(), &[])
        .await?;
    let mut cursor = std::io::Cursor::new(reply.as_slice());
    read_nextlist(&mut cursor).map_err(ClientError::from_decode_error)
}

/// Forwards `data` to `procedure` of `(program, version)` through the
/// portmapper's indirect-call facility, returning the port the call was
/// actually served on and the raw result payload.
pub async fn call_it(
    session: &RpcSession,
    program: u32,
    version: u32,
    procedure: u32,
    data: Vec<u8>,
) -> Result<(u16, Vec<u8>)> {
    let request = call_args { program, version, procedure, data };
    let mut args = Vec::new();
    request.serialize(&mut args).map_err(ClientError::from)?;

    let reply = session
        .call(PROGRAM, VERSION, PortmapProgram::PMAPPROC_CALLIT as u32, opaque_auth::none(), &args)
        .await?;
    let mut cursor = std::io::Cursor::new(reply.as_slice());
    let result = call_result::deserialize(&mut cursor).map_err(ClientError::from_decode_error)?;
    let port = u16::try_from(result.port)
        .map_err(|_| ClientError::MalformedMessage(format!("CALLIT returned out-of-range port {}", result.port)))?;
    Ok((port, result.data))
}

/// Asks for the server's notion of the current time (seconds since the
/// epoch). Only defined on the v4 rpcbind extension (RFC 1833), so this call
/// goes out at [`VERSION_GETTIME`] rather than the v2 used by everything
/// else in this module.
pub async fn get_time(session: &RpcSession) -> Result<u32> {
    let reply = session
        .call(PROGRAM, VERSION_GETTIME, PortmapProgram::PMAPPROC_GETTIME as u32, opaque_auth::none(), &[])
        .await?;
    let mut cursor = std::io::Cursor::new(reply.as_slice());
    u32::deserialize(&mut cursor).map_err(ClientError::from_decode_error)
}

/// Resolves `(program, version)` via the portmapper at `host`, opens a fresh
/// TCP connection to the resolved port, and returns a ready-to-use session.
/// This is the bootstrap step described in §5 for a [`Target`](crate::config::Target)
/// that does not pin a port.
pub async fn connect_via_portmap(
    host: &str,
    program: u32,
    version: u32,
    fragment_size: u32,
) -> Result<RpcSession> {
    use crate::config::{Target, PORTMAP_PORT};

    let portmap_target = Target::new(host, PORTMAP_PORT);
    let portmap_session = RpcSession::connect(&portmap_target)
        .await
        .map_err(|err| ClientError::PortmapUnavailable(err.to_string()))?;

    let port = get_port(&portmap_session, program, version).await?;
    portmap_session.disconnect().await;

    let target = Target::new(host, port).with_fragment_size(fragment_size);
    RpcSession::connect(&target).await
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;
    use tokio::net::TcpStream;

    use super::*;
    use crate::protocol::rpc::{read_message, write_message};
    use crate::protocol::xdr::rpc::{accepted_reply, accept_body, reply_body, rpc_body, rpc_msg};

    async fn serve_one(listener: TcpListener, port: u32) {
        let (mut stream, _) = listener.accept().await.unwrap();
        let request = read_message(&mut stream, 1 << 20).await.unwrap();
        let mut cursor = std::io::Cursor::new(request.as_slice());
        let msg = rpc_msg::deserialize(&mut cursor).unwrap();

        let mut payload = Vec::new();
        port.serialize(&mut payload).unwrap();

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
    async fn get_port_returns_resolved_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve_one(listener, 2049));

        let stream = TcpStream::connect(addr).await.unwrap();
        let session = RpcSession::from_stream(stream, 1 << 16);
        let port = get_port(&session, 100003, 3).await.unwrap();
        assert_eq!(port, 2049);

        server.await.unwrap();
    }

    #[tokio::test]
    async fn get_port_zero_is_service_not_registered() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve_one(listener, 0));

        let stream = TcpStream::connect(addr).await.unwrap();
        let session = RpcSession::from_stream(stream, 1 << 16);
        let err = get_port(&session, 100003, 3).await.unwrap_err();
        assert!(matches!(err, ClientError::ServiceNotRegistered { program: 100003, version: 3 }));

        server.await.unwrap();
    }
}
