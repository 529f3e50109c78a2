//! Handle registry coverage the scenario list (§8 scenario 4) commits to as
//! an integration test: idempotent registration, and cycle defense when a
//! (malicious or buggy) server's parent links loop back on themselves.
//! Driven entirely through [`HandleRegistry`]'s public API.

use nfs3_client::registry::{HandleRegistry, ROOT_TOKEN};
use nfs3_client::xdr::nfs3::nfs_fh3;

fn fh(bytes: &[u8]) -> nfs_fh3 {
    nfs_fh3 { data: bytes.to_vec() }
}

#[test]
fn registering_the_same_handle_twice_returns_the_same_token() {
    let mut reg = HandleRegistry::new(fh(b"root"));
    let a = reg.register(fh(b"child"), b"child", ROOT_TOKEN);
    let b = reg.register(fh(b"child"), b"child", ROOT_TOKEN);
    assert_eq!(a, b);
    assert_eq!(reg.len(), 2);
}

#[test]
fn cycle_in_parent_links_terminates_and_returns_partial_path() {
    let mut reg = HandleRegistry::new(fh(b"root"));

    // `register` never validates that `parent` already exists, so a cycle
    // can be built purely through the public API by predicting the token a
    // not-yet-registered handle is about to receive (tokens are handed out
    // sequentially, so `reg.len()` names it ahead of time): register `a`
    // pointing at the token `b` will get, then register `b` pointing back
    // at `a`.
    let b_token_to_be = reg.len() as u64 + 1;
    let a = reg.register(fh(b"a"), b"a", b_token_to_be);
    let b = reg.register(fh(b"b"), b"b", a);
    assert_eq!(b, b_token_to_be);

    let path = reg.handle_to_path(a);
    assert!(path == "/a" || path == "/b/a", "unexpected path: {path}");
}
