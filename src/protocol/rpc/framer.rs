//! ONC RPC record marking (RFC 5531 §10) over an asynchronous byte stream.
//!
//! A logical RPC message is carried as one or more fragments. Each fragment
//! is prefixed by a 4-byte big-endian header: the high bit flags the last
//! fragment of the message, the low 31 bits are the fragment's payload
//! length. This module only concerns itself with reassembling/splitting
//! those fragments; it has no notion of what the payload bytes mean.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ClientError, Result};

/// High bit of the 4-byte fragment header.
const LAST_FRAGMENT_BIT: u32 = 1 << 31;
/// Remaining 31 bits carry the fragment length.
const LENGTH_MASK: u32 = LAST_FRAGMENT_BIT - 1;

/// Reads one complete logical message: fragments are appended to a buffer
/// until one arrives with the "last fragment" bit set. `max_message_len`
/// bounds the total reassembled length (not any single fragment) and guards
/// against a peer declaring an absurd length.
pub async fn read_message<R: AsyncRead + Unpin>(
    reader: &mut R,
    max_message_len: usize,
) -> Result<Vec<u8>> {
    let mut message = Vec::new();
    loop {
        let mut header_buf = [0u8; 4];
        reader
            .read_exact(&mut header_buf)
            .await
            .map_err(ClientError::Transport)?;
        let header = u32::from_be_bytes(header_buf);
        let is_last = header & LAST_FRAGMENT_BIT != 0;
        let length = (header & LENGTH_MASK) as usize;

        let new_len = message.len().saturating_add(length);
        if new_len > max_message_len {
            return Err(ClientError::Framing(format!(
                "record length {new_len} exceeds configured max {max_message_len}"
            )));
        }

        let start = message.len();
        message.resize(new_len, 0);
        reader
            .read_exact(&mut message[start..])
            .await
            .map_err(ClientError::Transport)?;

        if is_last {
            return Ok(message);
        }
    }
}

/// Splits `message` into fragments no larger than `max_fragment_size` and
/// writes them in order, setting the last-fragment bit only on the final
/// one. A zero-length message is written as a single empty last fragment
/// (header `0x8000_0000`).
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    message: &[u8],
    max_fragment_size: u32,
) -> Result<()> {
    let max_fragment_size = (max_fragment_size.max(1) as usize).min(LENGTH_MASK as usize);

    if message.is_empty() {
        writer
            .write_all(&LAST_FRAGMENT_BIT.to_be_bytes())
            .await
            .map_err(ClientError::Transport)?;
        return Ok(());
    }

    let mut offset = 0;
    while offset < message.len() {
        let remaining = message.len() - offset;
        let chunk_len = remaining.min(max_fragment_size);
        let is_last = offset + chunk_len == message.len();

        let mut header = chunk_len as u32;
        if is_last {
            header |= LAST_FRAGMENT_BIT;
        }

        writer
            .write_all(&header.to_be_bytes())
            .await
            .map_err(ClientError::Transport)?;
        writer
            .write_all(&message[offset..offset + chunk_len])
            .await
            .map_err(ClientError::Transport)?;

        offset += chunk_len;
    }
    writer.flush().await.map_err(ClientError::Transport)?;
    Ok(())
}

#[cfg(test)]
mod proptests {
    use std::io::Cursor;

    use proptest::prelude::*;

    use super::*;

    proptest! {
        // §8: "for any byte string `b` produced by the framer's split,
        // concatenating the payloads of the fragments equals the original
        // message" — exercised here end to end via read_message(write_message(m)).
        #[test]
        fn round_trips_for_arbitrary_message_and_fragment_size(
            message in proptest::collection::vec(any::<u8>(), 0..4096),
            max_fragment_size in 1u32..=64,
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let mut buf = Vec::new();
                write_message(&mut buf, &message, max_fragment_size).await.unwrap();

                let mut cursor = Cursor::new(buf);
                let decoded = read_message(&mut cursor, 1 << 20).await.unwrap();
                prop_assert_eq!(decoded, message);
                Ok(())
            })?;
        }
    }
}

// The scenario-3/boundary fixture tests that used to live here now live in
// `tests/framer_fixtures.rs`, driven through the public `protocol::rpc` API
// instead of `super::*` — this crate's test-tooling commitments place them
// under the integration-test bullet, not the per-module unit-test one.
