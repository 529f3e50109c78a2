//! Record-marking fixtures from §8 scenario 3: single- and multi-fragment
//! framing, the empty-message edge case, and the oversize-declared-length
//! rejection, driven entirely through the public `protocol::rpc` framing
//! functions.

use std::io::Cursor;

use nfs3_client::protocol::rpc::{read_message, write_message};
use nfs3_client::ClientError;

#[tokio::test]
async fn single_fragment_round_trip() {
    let mut buf = Vec::new();
    write_message(&mut buf, &[0xAA, 0xBB, 0xCC], 1 << 20).await.unwrap();
    assert_eq!(buf, vec![0x80, 0x00, 0x00, 0x03, 0xAA, 0xBB, 0xCC]);

    let mut cursor = Cursor::new(buf);
    let message = read_message(&mut cursor, 1 << 20).await.unwrap();
    assert_eq!(message, vec![0xAA, 0xBB, 0xCC]);
}

#[tokio::test]
async fn splits_across_fragment_size() {
    let mut buf = Vec::new();
    write_message(&mut buf, &[0xAA, 0xBB, 0xCC, 0xDD, 0xEE], 3).await.unwrap();
    assert_eq!(buf, vec![0x00, 0x00, 0x00, 0x03, 0xAA, 0xBB, 0xCC, 0x80, 0x00, 0x00, 0x02, 0xDD, 0xEE]);

    let mut cursor = Cursor::new(buf);
    let message = read_message(&mut cursor, 1 << 20).await.unwrap();
    assert_eq!(message, vec![0xAA, 0xBB, 0xCC, 0xDD, 0xEE]);
}

#[tokio::test]
async fn empty_message_is_single_empty_last_fragment() {
    let mut buf = Vec::new();
    write_message(&mut buf, &[], 1 << 20).await.unwrap();
    assert_eq!(buf, vec![0x80, 0x00, 0x00, 0x00]);

    let mut cursor = Cursor::new(buf);
    let message = read_message(&mut cursor, 1 << 20).await.unwrap();
    assert!(message.is_empty());
}

#[tokio::test]
async fn oversize_declared_length_is_rejected() {
    let mut cursor = Cursor::new(vec![0x80, 0x10, 0x00, 0x00]);
    let err = read_message(&mut cursor, 1024).await.unwrap_err();
    assert!(matches!(err, ClientError::Framing(_)));
}

#[tokio::test]
async fn reassembles_many_small_fragments() {
    let mut buf = Vec::new();
    write_message(&mut buf, &[1, 2, 3, 4, 5, 6, 7], 2).await.unwrap();
    let mut cursor = Cursor::new(buf);
    let message = read_message(&mut cursor, 1 << 20).await.unwrap();
    assert_eq!(message, vec![1, 2, 3, 4, 5, 6, 7]);
}
