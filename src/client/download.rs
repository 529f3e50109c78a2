//! Bulk file download (§4.6): a fixed-chunk-size sequential READ loop on top
//! of [`Client::read`], with no sparse-hole detection — every byte in range
//! is actually fetched, matching the teacher's own preference for simple,
//! predictable I/O loops over speculative cleverness.

use crate::error::Result;
use crate::protocol::xdr::rpc::opaque_auth;
use crate::registry::HandleToken;

use super::Client;

/// Default chunk size for [`Client::download`], chosen to stay comfortably
/// under common server `rtmax` advertisements without requiring a prior
/// FSINFO round trip just to pick one.
pub const DEFAULT_CHUNK_SIZE: u32 = 1024 * 1024;

impl Client {
    /// Reads `token` from offset `0`, `chunk_size` bytes at a time, until
    /// the server reports EOF, a short read is observed, or `max_bytes` (if
    /// given) has been reached. Returns the bytes read so far even when
    /// `max_bytes` cuts the download short; only a transport/protocol error
    /// is propagated as `Err`.
    pub async fn download(
        &self,
        token: HandleToken,
        chunk_size: u32,
        max_bytes: Option<u64>,
        cred: Option<opaque_auth>,
    ) -> Result<Vec<u8>> {
        let chunk_size = chunk_size.max(1);
        let mut out = Vec::new();
        let mut offset = 0u64;

        loop {
            if let Some(max) = max_bytes {
                if offset >= max {
                    break;
                }
            }

            let want = match max_bytes {
                Some(max) => chunk_size.min((max - offset).min(u32::MAX as u64) as u32),
                None => chunk_size,
            };

            let (data, eof) = self.read(token, offset, want, cred.clone()).await?;
            let read_len = data.len() as u64;
            out.extend_from_slice(&data);
            offset += read_len;

            if eof || read_len < want as u64 || read_len == 0 {
                break;
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::DEFAULT_CHUNK_SIZE;

    #[test]
    fn default_chunk_size_is_positive() {
        assert!(DEFAULT_CHUNK_SIZE > 0);
    }
}
