//! The opaque-handle registry (§3, §4.6, §9).
//!
//! NFSv3 addresses every object by an opaque, server-assigned file handle
//! (`nfs_fh3`) of up to 64 bytes. Handing those bytes back to callers as the
//! unit of identity is unpleasant to work with and expensive to hash and
//! compare, so every NFSv3 client wrapper in [`crate::client`] registers each
//! handle it observes here and deals in small, `Copy` local tokens instead.
//! Token `0` always aliases the mount's root file handle.

use std::collections::HashMap;

use crate::protocol::xdr::nfs3::nfs_fh3;

/// A stable, process-local identifier for a server file handle. Cheap to
/// copy and compare; carries no meaning outside the [`HandleRegistry`] that
/// issued it, and is not valid across a `disconnect`/reconnect cycle.
pub type HandleToken = u64;

/// The root token every session starts with (§3: "The token `0` is reserved
/// for the mount's root file handle").
pub const ROOT_TOKEN: HandleToken = 0;

struct Entry {
    handle: nfs_fh3,
    /// The name this handle was last observed under, or `None` for `.`/`..`
    /// and for the root itself (§3, §4.6: "`.` and `..`... are still
    /// registered, minus path-name tracking").
    name: Option<Vec<u8>>,
    parent: HandleToken,
}

/// Maps server-supplied [`nfs_fh3`] handles to [`HandleToken`]s and back,
/// and reconstructs virtual paths by walking parent links.
///
/// Registration is idempotent (§3, §8): re-observing a handle already known
/// to this registry returns its existing token rather than minting a new
/// one, regardless of what name or parent it shows up under this time.
pub struct HandleRegistry {
    by_token: Vec<Entry>,
    by_handle: HashMap<nfs_fh3, HandleToken>,
}

impl HandleRegistry {
    /// Builds a fresh registry seeded with `root` as token `0`.
    pub fn new(root: nfs_fh3) -> Self {
        let mut by_handle = HashMap::new();
        by_handle.insert(root.clone(), ROOT_TOKEN);
        HandleRegistry {
            by_token: vec![Entry { handle: root, name: None, parent: ROOT_TOKEN }],
            by_handle,
        }
    }

    /// Registers `handle` as having been observed under `name` inside
    /// `parent`. Returns the token for this handle: a fresh one on first
    /// sighting, the existing one otherwise (idempotent per §3/§8).
    ///
    /// `.` and `..` are recorded with no name, per §4.6: their handles still
    /// resolve to a token, but that token never becomes part of a
    /// reconstructed path.
    pub fn register(&mut self, handle: nfs_fh3, name: &[u8], parent: HandleToken) -> HandleToken {
        if let Some(&token) = self.by_handle.get(&handle) {
            return token;
        }
        let token = self.by_token.len() as HandleToken;
        let name = if name == b"." || name == b".." { None } else { Some(name.to_vec()) };
        self.by_handle.insert(handle.clone(), token);
        self.by_token.push(Entry { handle, name, parent });
        token
    }

    /// Looks up the server handle bytes for `token`.
    pub fn resolve(&self, token: HandleToken) -> Option<&nfs_fh3> {
        self.by_token.get(token as usize).map(|e| &e.handle)
    }

    /// Looks up the token already assigned to `handle`, if any, without
    /// registering it.
    pub fn token_for(&self, handle: &nfs_fh3) -> Option<HandleToken> {
        self.by_handle.get(handle).copied()
    }

    /// Reconstructs the virtual path of `token` by walking parent links back
    /// to the root, joining names with `/`.
    ///
    /// Defends against a malicious or buggy server aliasing handles into a
    /// parent cycle (§9): once a name has already been assembled into the
    /// path being built, the walk stops and returns what it has so far
    /// instead of recursing forever.
    pub fn handle_to_path(&self, token: HandleToken) -> String {
        let mut parts: Vec<&[u8]> = Vec::new();
        let mut current = token;
        loop {
            let Some(entry) = self.by_token.get(current as usize) else { break };
            if let Some(name) = &entry.name {
                if parts.iter().any(|p| *p == name.as_slice()) {
                    break;
                }
                parts.insert(0, name.as_slice());
            }
            if current == ROOT_TOKEN || current == entry.parent {
                break;
            }
            current = entry.parent;
        }
        let joined = parts
            .into_iter()
            .map(|p| String::from_utf8_lossy(p).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!("/{joined}")
    }

    /// Number of tokens issued so far, including the root.
    pub fn len(&self) -> usize {
        self.by_token.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fh(bytes: &[u8]) -> nfs_fh3 {
        nfs_fh3 { data: bytes.to_vec() }
    }

    // `registering_the_same_handle_twice_returns_the_same_token` and
    // `cycle_in_parent_links_terminates_and_returns_partial_path` live in
    // `tests/registry_fixtures.rs` instead of here: they cover the scenario
    // this crate's test-tooling commitments place under the integration-test
    // bullet, not the per-module unit-test one.

    #[test]
    fn path_reconstruction_joins_names_from_root() {
        let mut reg = HandleRegistry::new(fh(b"root"));
        let a = reg.register(fh(b"a"), b"a", ROOT_TOKEN);
        let b = reg.register(fh(b"b"), b"b", a);
        assert_eq!(reg.handle_to_path(ROOT_TOKEN), "/");
        assert_eq!(reg.handle_to_path(a), "/a");
        assert_eq!(reg.handle_to_path(b), "/a/b");
    }

    #[test]
    fn dot_and_dotdot_do_not_appear_in_paths() {
        let mut reg = HandleRegistry::new(fh(b"root"));
        let a = reg.register(fh(b"a"), b"a", ROOT_TOKEN);
        let dot = reg.register(fh(b"a-dot"), b".", a);
        let dotdot = reg.register(fh(b"a-dotdot"), b"..", a);
        assert_eq!(reg.handle_to_path(dot), "/a");
        assert_eq!(reg.handle_to_path(dotdot), "/a");
    }

    #[test]
    fn token_for_does_not_register() {
        let reg = HandleRegistry::new(fh(b"root"));
        assert_eq!(reg.token_for(&fh(b"never-seen")), None);
        assert_eq!(reg.token_for(&fh(b"root")), Some(ROOT_TOKEN));
    }
}
