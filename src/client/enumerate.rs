//! The recursive directory enumeration driver (§4.6, §9).
//!
//! Walks a directory tree through paginated READDIRPLUS calls and exposes it
//! as a lazy [`Stream`], rather than collecting the whole tree into memory
//! before the caller sees anything. The walk runs on a background task
//! (`tokio::spawn`) that feeds an unbounded channel; [`futures::stream::unfold`]
//! turns the receiving end back into a `Stream` the caller can poll like any
//! other. Recursion depth is bounded by an explicit `Box::pin`'d async
//! function (`BoxFuture`) rather than `async-stream`, since nothing already
//! in this crate's dependency tree pulls that crate in.
//!
//! `.` and `..` are never emitted. Symlinks are reported like any other
//! entry but never followed. An entry whose attributes came back `Void` has
//! no way to know its `ftype3`, so it is skipped rather than guessed at.
//! A READDIRPLUS failure partway into one subdirectory surfaces as a single
//! `Err` item for that subtree and stops that branch of the walk; it does
//! not abort entries already discovered in sibling directories (§9).

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::{self, Stream};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::Client;
use crate::error::{ClientError, Result};
use crate::protocol::xdr::nfs3::{cookieverf3, entryplus3, fattr3, ftype3, nfsstat3, post_op_attr};
use crate::registry::HandleToken;

/// One entry observed while walking the tree.
#[derive(Debug, Clone)]
pub struct EnumerateEntry {
    /// Virtual path reconstructed from the handle registry, rooted at `/`.
    pub path: String,
    pub name: Vec<u8>,
    /// Absent only if the server declined to hand back a handle for this
    /// entry; such entries can still be seen but can't be resolved further
    /// without a follow-up `lookup`.
    pub token: Option<HandleToken>,
    pub kind: ftype3,
    pub attributes: fattr3,
    pub depth: usize,
}

/// Either an entry, or the error that ended one subdirectory's walk.
pub type EnumerateItem = Result<EnumerateEntry>;

/// Per-directory hook deciding whether the walk should recurse into a
/// subdirectory it just found. Returning `false` still yields the directory
/// entry itself; the walk just doesn't expand it.
pub type DescendPredicate = Arc<dyn Fn(&EnumerateEntry) -> bool + Send + Sync>;

/// `dircount`/`maxcount` the driver asks for on every READDIRPLUS page.
/// Matches the fragment-size-scale byte budgets §6/§4.6 discuss as
/// reasonable defaults, independent of whatever fragment size the session
/// itself is configured with.
const READDIRPLUS_DIRCOUNT: u32 = 8 * 1024;
const READDIRPLUS_MAXCOUNT: u32 = 32 * 1024;

impl Client {
    /// Recursively lists everything reachable from `root`, depth-first, down
    /// to `max_depth` directory levels (`None` for unbounded). `descend`, if
    /// given, is consulted before expanding each subdirectory found; omit it
    /// to descend into everything `max_depth` allows.
    ///
    /// Each directory is read under an AUTH_SYS credential built from that
    /// directory's own owner attributes (falling back to uid/gid `0` if the
    /// server didn't report them), per §4.6's "the enumeration driver
    /// authenticates each descent as the directory's owner" behavior —
    /// listing a tree with mixed ownership doesn't require the caller to
    /// pre-enumerate every uid/gid pair up front.
    pub fn enumerate(
        &self,
        root: HandleToken,
        max_depth: Option<usize>,
        descend: Option<DescendPredicate>,
    ) -> impl Stream<Item = EnumerateItem> {
        let (tx, rx) = mpsc::unbounded_channel::<EnumerateItem>();
        let client = self.clone();

        tokio::spawn(async move {
            let root_path = client.path_of(root).await;
            walk(client, root, root_path, 0, max_depth, descend, tx).await;
        });

        stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) })
    }
}

fn walk(
    client: Client,
    dir_token: HandleToken,
    dir_path: String,
    depth: usize,
    max_depth: Option<usize>,
    descend: Option<DescendPredicate>,
    tx: mpsc::UnboundedSender<EnumerateItem>,
) -> BoxFuture<'static, ()> {
    Box::pin(async move {
        if let Some(max) = max_depth {
            if depth > max {
                return;
            }
        }

        let cred = match directory_credential(&client, dir_token).await {
            Ok(cred) => cred,
            Err(err) => {
                let _ = tx.send(Err(err));
                return;
            }
        };

        let mut cookie = 0u64;
        let mut cookieverf = cookieverf3::default();

        loop {
            let page = client
                .readdirplus(dir_token, cookie, cookieverf, READDIRPLUS_DIRCOUNT, READDIRPLUS_MAXCOUNT, Some(cred.clone()))
                .await;

            let (entries, next_verf, eof) = match page {
                Ok(page) => page,
                Err(err) => {
                    // A rejected cookieverf (§4.6: "aborts the enumeration with that
                    // error") gets its own variant so callers can match on it without
                    // re-deriving the status code from `ClientError::Nfs`.
                    let err = match err {
                        ClientError::Nfs(nfsstat3::NFS3ERR_BAD_COOKIE) => ClientError::BadCookie,
                        other => other,
                    };
                    warn!(path = %dir_path, error = %err, "READDIRPLUS failed, abandoning this subtree");
                    let _ = tx.send(Err(err));
                    return;
                }
            };

            let last_cookie = entries.last().map(|(_, e)| e.cookie);

            for (token, entry) in entries {
                if entry.name.as_ref() == b"." || entry.name.as_ref() == b".." {
                    continue;
                }

                let Some((kind, attrs)) = entry_type(&entry) else {
                    debug!(name = %String::from_utf8_lossy(entry.name.as_ref()), "skipping entry with no attributes");
                    continue;
                };

                let path = format!("{}/{}", dir_path.trim_end_matches('/'), String::from_utf8_lossy(entry.name.as_ref()));
                let observed = EnumerateEntry {
                    path: path.clone(),
                    name: entry.name.as_ref().to_vec(),
                    token,
                    kind,
                    attributes: attrs,
                    depth,
                };

                let should_descend = kind == ftype3::NF3DIR
                    && token.is_some()
                    && descend.as_ref().map(|pred| pred(&observed)).unwrap_or(true);

                if tx.send(Ok(observed)).is_err() {
                    // Receiver dropped (caller stopped polling the stream);
                    // no point continuing this branch or any other.
                    return;
                }

                if should_descend {
                    if let Some(child_token) = token {
                        walk(client.clone(), child_token, path, depth + 1, max_depth, descend.clone(), tx.clone())
                            .await;
                    }
                }
            }

            if eof {
                break;
            }
            cookie = last_cookie.unwrap_or(cookie);
            cookieverf = next_verf;
        }
    })
}

fn entry_type(entry: &entryplus3) -> Option<(ftype3, fattr3)> {
    match &entry.name_attributes {
        post_op_attr::attributes(attrs) => Some((attrs.ftype, attrs.clone())),
        post_op_attr::Void => None,
    }
}

/// AUTH_SYS credential for descending into `dir_token`, built from its own
/// owner attributes. Falls back to uid/gid `0` if GETATTR doesn't report
/// them (it always does for a real server, but the fallback keeps the walk
/// going against a minimal or misbehaving one rather than failing outright).
async fn directory_credential(client: &Client, dir_token: HandleToken) -> Result<crate::protocol::xdr::rpc::opaque_auth> {
    match client.getattr(dir_token, None).await {
        Ok(attrs) => client.auth_sys(attrs.uid, attrs.gid),
        Err(_) => client.auth_sys(0, 0),
    }
}
