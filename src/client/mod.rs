//! The high-level, token-based client (§2 item 5, §4.6, §9).
//!
//! Everything under [`crate::protocol`] speaks in raw [`nfs_fh3`] handles and
//! bare [`RpcSession`]s; [`Client`] is the layer that turns that into
//! something an application actually wants to hold onto: one MOUNT+NFSv3
//! connection pair, a [`HandleRegistry`] translating opaque handles to small
//! `Copy` tokens, and a default credential every call falls back to unless
//! the caller overrides it.
//!
//! A [`Client`] moves through the lifecycle described in §4.6: `Init` (never
//! connected), `PortmapResolved` (bootstrap under way), `Connected` (both
//! sessions up), `Mounted`/`Active` (root handle registered, ready for
//! calls). [`Client::connect`] drives the whole bootstrap in one call and
//! only ever hands back a [`Client`] already in `Active` state;
//! [`Client::disconnect`] sends MOUNT's UMNTALL best-effort, tears both
//! sessions down, and returns the handle to `Init` with every outstanding
//! token invalidated.

pub mod download;
pub mod enumerate;

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::config::{ClientConfig, DefaultCredential};
use crate::error::{ClientError, Result};
use crate::protocol::nfs3::dir::{cookieverf3, mkdir, mknod, readdir, readdirplus, symlink};
use crate::protocol::nfs3::file::{commit, link, read, stable_how, write};
use crate::protocol::nfs3::{
    access, create, createhow3, getattr, lookup, post_op_attr, readlink, remove, rename, rmdir, setattr,
    LookupResult,
};
use crate::protocol::rpc::RpcSession;
use crate::protocol::xdr::nfs3::{
    devicedata3, entry3, entryplus3, fattr3, mknoddata3, nfs_fh3, post_op_fh3, sattr3, sattrguard3, wcc_data,
    RENAME3wcc,
};
use crate::protocol::xdr::rpc::{auth_unix, opaque_auth};
use crate::protocol::{mount, portmap};
use crate::registry::{HandleRegistry, HandleToken, ROOT_TOKEN};

/// Where a [`Client`] is in the bootstrap/teardown lifecycle (§4.6).
/// `Client::connect` only ever returns a client already in `Active`; the
/// intermediate variants exist to name the state a half-finished bootstrap
/// failed in, for logging and for tests that drive the steps individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Init,
    PortmapResolved,
    Connected,
    Mounted,
    Active,
}

/// A mounted NFSv3 export: a MOUNT session, an NFSv3 session, the handle
/// registry seeded with the mount's root, and the identity new calls use by
/// default.
///
/// Cloning a `Client` clones the handle, not the connection: clones share
/// the same sessions and registry, mirroring [`RpcSession`]'s own Clone
/// semantics. This is what lets the enumeration driver (§4.6, §9) hand a
/// clone to a background task.
#[derive(Clone)]
pub struct Client {
    mount_session: RpcSession,
    nfs_session: RpcSession,
    registry: Arc<Mutex<HandleRegistry>>,
    config: ClientConfig,
    export_path: Vec<u8>,
    state: Arc<Mutex<ClientState>>,
}

impl Client {
    /// Runs the full bootstrap described in §4.6: resolve and connect to
    /// MOUNT, call MNT on `export_path`, resolve and connect to NFSv3, seed
    /// the handle registry with the returned root handle. Both services are
    /// resolved independently — real deployments commonly run mountd and
    /// nfsd on different ports — unless `config.target.port` is pinned, in
    /// which case both connect directly to that port.
    #[instrument(skip(config), fields(host = %config.target.host))]
    pub async fn connect(config: ClientConfig, export_path: impl Into<Vec<u8>>) -> Result<Self> {
        let export_path = export_path.into();

        let mount_session =
            Self::connect_service(&config, mount::PROGRAM, mount::VERSION).await?;
        info!("connected to MOUNT service");

        let root_handle = mount::mnt(&mount_session, &export_path).await?;
        info!(export = %String::from_utf8_lossy(&export_path), "mounted export");

        let nfs_session = Self::connect_service(
            &config,
            crate::protocol::xdr::nfs3::PROGRAM,
            crate::protocol::xdr::nfs3::VERSION,
        )
        .await?;
        info!("connected to NFSv3 service");

        let registry = Arc::new(Mutex::new(HandleRegistry::new(nfs_fh3 { data: root_handle })));

        Ok(Client {
            mount_session,
            nfs_session,
            registry,
            config,
            export_path,
            state: Arc::new(Mutex::new(ClientState::Active)),
        })
    }

    async fn connect_service(config: &ClientConfig, program: u32, version: u32) -> Result<RpcSession> {
        if config.target.needs_portmap() {
            portmap::connect_via_portmap(&config.target.host, program, version, config.target.fragment_size)
                .await
        } else {
            RpcSession::connect(&config.target).await
        }
    }

    /// Tears the client down: MOUNT UMNTALL best-effort (§4.5 — servers only
    /// track this informationally, so a failure here is logged, not
    /// propagated), then both sessions disconnected. The registry and every
    /// token it issued become meaningless once this returns; reconnecting
    /// means building a new `Client`.
    #[instrument(skip(self))]
    pub async fn disconnect(&self) {
        if let Err(err) = mount::umnt_all(&self.mount_session).await {
            tracing::warn!(error = %err, "UMNTALL failed during disconnect, continuing anyway");
        }
        self.mount_session.disconnect().await;
        self.nfs_session.disconnect().await;
        *self.state.lock().await = ClientState::Init;
    }

    /// Current lifecycle state (§4.6). Exposed mainly for logging and tests;
    /// ordinary callers don't need to check this before issuing a call.
    pub async fn state(&self) -> ClientState {
        *self.state.lock().await
    }

    /// The export path this client was mounted against.
    pub fn export_path(&self) -> &[u8] {
        &self.export_path
    }

    /// The token aliasing the mount's root directory. Always `0`.
    pub fn root(&self) -> HandleToken {
        ROOT_TOKEN
    }

    /// Reconstructs the virtual path of `token` by walking the registry's
    /// parent links (§3, §9).
    pub async fn path_of(&self, token: HandleToken) -> String {
        self.registry.lock().await.handle_to_path(token)
    }

    fn default_credential(&self) -> Result<opaque_auth> {
        match self.config.default_credential {
            DefaultCredential::AuthNone => Ok(opaque_auth::none()),
            DefaultCredential::AuthSys => self.auth_sys(self.config.uid, self.config.gid),
        }
    }

    /// Builds an AUTH_SYS credential for `(uid, gid)` using this client's
    /// machine name and supplementary groups. Used both as the default
    /// credential and by the enumeration driver, which authenticates each
    /// directory descent as its owner (§4.6, §9).
    pub fn auth_sys(&self, uid: u32, gid: u32) -> Result<opaque_auth> {
        let creds = auth_unix::new(self.config.machine_name.clone(), uid, gid, self.config.gids.clone());
        opaque_auth::auth_sys(&creds).map_err(ClientError::from)
    }

    async fn resolve(&self, token: HandleToken) -> Result<nfs_fh3> {
        self.registry.lock().await.resolve(token).cloned().ok_or(ClientError::HandleUnknown(token))
    }

    async fn register(&self, handle: nfs_fh3, name: &[u8], parent: HandleToken) -> HandleToken {
        self.registry.lock().await.register(handle, name, parent)
    }

    async fn register_fh(
        &self,
        handle: post_op_fh3,
        name: &[u8],
        parent: HandleToken,
    ) -> Option<HandleToken> {
        match handle {
            post_op_fh3::handle(h) => Some(self.register(h, name, parent).await),
            post_op_fh3::Void => None,
        }
    }

    fn cred(&self, over: Option<opaque_auth>) -> Result<opaque_auth> {
        match over {
            Some(cred) => Ok(cred),
            None => self.default_credential(),
        }
    }

    /// Pings the NFSv3 service.
    pub async fn null(&self) -> Result<()> {
        crate::protocol::nfs3::null(&self.nfs_session, self.cred(None)?).await
    }

    /// Returns `token`'s attributes.
    pub async fn getattr(&self, token: HandleToken, cred: Option<opaque_auth>) -> Result<fattr3> {
        let handle = self.resolve(token).await?;
        getattr(&self.nfs_session, self.cred(cred)?, &handle).await
    }

    /// Changes `token`'s attributes.
    pub async fn setattr(
        &self,
        token: HandleToken,
        new_attributes: sattr3,
        guard: sattrguard3,
        cred: Option<opaque_auth>,
    ) -> Result<wcc_data> {
        let handle = self.resolve(token).await?;
        setattr(&self.nfs_session, self.cred(cred)?, &handle, new_attributes, guard).await
    }

    /// Looks `name` up inside `dir`. `Ok(None)` is `NFS3ERR_NOENT` — an
    /// ordinary miss, not an error (§4.6, §9) — any entry found is
    /// registered and its token returned alongside its attributes.
    pub async fn lookup(
        &self,
        dir: HandleToken,
        name: impl Into<Vec<u8>>,
        cred: Option<opaque_auth>,
    ) -> Result<Option<(HandleToken, post_op_attr)>> {
        let dir_handle = self.resolve(dir).await?;
        let name = name.into();
        match lookup(&self.nfs_session, self.cred(cred)?, &dir_handle, name.clone()).await? {
            LookupResult::Found { object, obj_attributes } => {
                let token = self.register(object, &name, dir).await;
                Ok(Some((token, obj_attributes)))
            }
            LookupResult::Absent => Ok(None),
        }
    }

    /// Checks which of `access_bits` (the `ACCESS3_*` constants, OR'd
    /// together) the credential is granted on `token`.
    pub async fn access(&self, token: HandleToken, access_bits: u32, cred: Option<opaque_auth>) -> Result<u32> {
        let handle = self.resolve(token).await?;
        access(&self.nfs_session, self.cred(cred)?, &handle, access_bits).await
    }

    /// Reads the target path of symlink `token`.
    pub async fn readlink(&self, token: HandleToken, cred: Option<opaque_auth>) -> Result<Vec<u8>> {
        let handle = self.resolve(token).await?;
        readlink(&self.nfs_session, self.cred(cred)?, &handle).await
    }

    /// Reads up to `count` bytes of `token` starting at `offset`.
    pub async fn read(
        &self,
        token: HandleToken,
        offset: u64,
        count: u32,
        cred: Option<opaque_auth>,
    ) -> Result<(Vec<u8>, bool)> {
        let handle = self.resolve(token).await?;
        read(&self.nfs_session, self.cred(cred)?, &handle, offset, count).await
    }

    /// Writes `data` to `token` at `offset`, requesting `stable` commit
    /// semantics.
    pub async fn write(
        &self,
        token: HandleToken,
        offset: u64,
        data: Vec<u8>,
        stable: stable_how,
        cred: Option<opaque_auth>,
    ) -> Result<(u32, stable_how)> {
        let handle = self.resolve(token).await?;
        write(&self.nfs_session, self.cred(cred)?, &handle, offset, data, stable).await
    }

    /// Flushes previously `UNSTABLE` writes to `token` to stable storage.
    pub async fn commit(
        &self,
        token: HandleToken,
        offset: u64,
        count: u32,
        cred: Option<opaque_auth>,
    ) -> Result<(wcc_data, crate::protocol::xdr::nfs3::writeverf3)> {
        let handle = self.resolve(token).await?;
        commit(&self.nfs_session, self.cred(cred)?, &handle, offset, count).await
    }

    /// Creates a regular file named `name` in `dir`. Registers the new
    /// handle, if the server returned one; a `None` token means the caller
    /// needs a follow-up [`Client::lookup`].
    pub async fn create(
        &self,
        dir: HandleToken,
        name: impl Into<Vec<u8>>,
        how: createhow3,
        cred: Option<opaque_auth>,
    ) -> Result<(Option<HandleToken>, post_op_attr, wcc_data)> {
        let dir_handle = self.resolve(dir).await?;
        let name = name.into();
        let (handle, attrs, wcc) =
            create(&self.nfs_session, self.cred(cred)?, &dir_handle, name.clone(), how).await?;
        let token = self.register_fh(handle, &name, dir).await;
        Ok((token, attrs, wcc))
    }

    /// Creates a directory named `name` in `dir`.
    pub async fn mkdir(
        &self,
        dir: HandleToken,
        name: impl Into<Vec<u8>>,
        attributes: sattr3,
        cred: Option<opaque_auth>,
    ) -> Result<(Option<HandleToken>, post_op_attr, wcc_data)> {
        let dir_handle = self.resolve(dir).await?;
        let name = name.into();
        let (handle, attrs, wcc) =
            mkdir(&self.nfs_session, self.cred(cred)?, &dir_handle, name.clone(), attributes).await?;
        let token = self.register_fh(handle, &name, dir).await;
        Ok((token, attrs, wcc))
    }

    /// Creates a symbolic link named `name` in `dir`, pointing at
    /// `target_path`.
    pub async fn symlink(
        &self,
        dir: HandleToken,
        name: impl Into<Vec<u8>>,
        target_path: impl Into<Vec<u8>>,
        attributes: sattr3,
        cred: Option<opaque_auth>,
    ) -> Result<(Option<HandleToken>, post_op_attr, wcc_data)> {
        let dir_handle = self.resolve(dir).await?;
        let name = name.into();
        let (handle, attrs, wcc) = symlink(
            &self.nfs_session,
            self.cred(cred)?,
            &dir_handle,
            name.clone(),
            target_path,
            attributes,
        )
        .await?;
        let token = self.register_fh(handle, &name, dir).await;
        Ok((token, attrs, wcc))
    }

    /// Creates a device, socket or FIFO named `name` in `dir`.
    pub async fn mknod(
        &self,
        dir: HandleToken,
        name: impl Into<Vec<u8>>,
        what: mknoddata3,
        cred: Option<opaque_auth>,
    ) -> Result<(Option<HandleToken>, post_op_attr, wcc_data)> {
        let dir_handle = self.resolve(dir).await?;
        let name = name.into();
        let (handle, attrs, wcc) =
            mknod(&self.nfs_session, self.cred(cred)?, &dir_handle, name.clone(), what).await?;
        let token = self.register_fh(handle, &name, dir).await;
        Ok((token, attrs, wcc))
    }

    /// Creates a hard link named `link_name` in `link_dir`, pointing at
    /// `file`.
    pub async fn link(
        &self,
        file: HandleToken,
        link_dir: HandleToken,
        link_name: impl Into<Vec<u8>>,
        cred: Option<opaque_auth>,
    ) -> Result<wcc_data> {
        let file_handle = self.resolve(file).await?;
        let link_dir_handle = self.resolve(link_dir).await?;
        link(&self.nfs_session, self.cred(cred)?, &file_handle, &link_dir_handle, link_name).await
    }

    /// Removes the (non-directory) entry named `name` from `dir`.
    pub async fn remove(&self, dir: HandleToken, name: impl Into<Vec<u8>>, cred: Option<opaque_auth>) -> Result<wcc_data> {
        let dir_handle = self.resolve(dir).await?;
        remove(&self.nfs_session, self.cred(cred)?, &dir_handle, name).await
    }

    /// Removes the empty directory named `name` from `dir`.
    pub async fn rmdir(&self, dir: HandleToken, name: impl Into<Vec<u8>>, cred: Option<opaque_auth>) -> Result<wcc_data> {
        let dir_handle = self.resolve(dir).await?;
        rmdir(&self.nfs_session, self.cred(cred)?, &dir_handle, name).await
    }

    /// Renames `from_name` in `from_dir` to `to_name` in `to_dir`.
    pub async fn rename(
        &self,
        from_dir: HandleToken,
        from_name: impl Into<Vec<u8>>,
        to_dir: HandleToken,
        to_name: impl Into<Vec<u8>>,
        cred: Option<opaque_auth>,
    ) -> Result<RENAME3wcc> {
        let from_handle = self.resolve(from_dir).await?;
        let to_handle = self.resolve(to_dir).await?;
        rename(&self.nfs_session, self.cred(cred)?, &from_handle, from_name, &to_handle, to_name).await
    }

    /// One page of a plain READDIR listing (no handles or attributes per
    /// entry). Most callers want [`Client::readdirplus`] or
    /// [`Client::enumerate`] instead.
    pub async fn readdir(
        &self,
        dir: HandleToken,
        cookie: u64,
        cookieverf: cookieverf3,
        dircount: u32,
        cred: Option<opaque_auth>,
    ) -> Result<(Vec<entry3>, cookieverf3, bool)> {
        let dir_handle = self.resolve(dir).await?;
        readdir(&self.nfs_session, self.cred(cred)?, &dir_handle, cookie, cookieverf, dircount).await
    }

    /// One page of a READDIRPLUS listing. Every returned entry carrying a
    /// handle is registered against `dir` under its name before this
    /// returns, per §3/§9's "every operation that observes a handle
    /// registers it" rule.
    pub async fn readdirplus(
        &self,
        dir: HandleToken,
        cookie: u64,
        cookieverf: cookieverf3,
        dircount: u32,
        maxcount: u32,
        cred: Option<opaque_auth>,
    ) -> Result<(Vec<(Option<HandleToken>, entryplus3)>, cookieverf3, bool)> {
        let dir_handle = self.resolve(dir).await?;
        let (entries, verf, eof) =
            readdirplus(&self.nfs_session, self.cred(cred)?, &dir_handle, cookie, cookieverf, dircount, maxcount)
                .await?;

        let mut out = Vec::with_capacity(entries.len());
        for entry in entries {
            let token = self.register_fh(entry.name_handle.clone(), entry.name.as_ref(), dir).await;
            out.push((token, entry));
        }
        Ok((out, verf, eof))
    }

    /// Returns dynamic file system usage stats for `token`.
    pub async fn fsstat(
        &self,
        token: HandleToken,
        cred: Option<opaque_auth>,
    ) -> Result<crate::protocol::xdr::nfs3::FSSTAT3resok> {
        let handle = self.resolve(token).await?;
        crate::protocol::nfs3::fs::fsstat(&self.nfs_session, self.cred(cred)?, &handle).await
    }

    /// Returns static file system properties/limits for `token`.
    pub async fn fsinfo(
        &self,
        token: HandleToken,
        cred: Option<opaque_auth>,
    ) -> Result<crate::protocol::xdr::nfs3::fsinfo3> {
        let handle = self.resolve(token).await?;
        crate::protocol::nfs3::fs::fsinfo(&self.nfs_session, self.cred(cred)?, &handle).await
    }

    /// Returns POSIX pathconf-style limits for `token`'s file system.
    pub async fn pathconf(
        &self,
        token: HandleToken,
        cred: Option<opaque_auth>,
    ) -> Result<crate::protocol::xdr::nfs3::PATHCONF3resok> {
        let handle = self.resolve(token).await?;
        crate::protocol::nfs3::fs::pathconf(&self.nfs_session, self.cred(cred)?, &handle).await
    }
}

// Re-exported so call sites building a `mknoddata3` don't need a separate
// import of `devicedata3` just to name the type.
pub use devicedata3 as DeviceData;
