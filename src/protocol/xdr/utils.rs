use std::io::{Read, Write};

use crate::xdr::{Deserialize, Serialize};

pub const ALIGMENT: usize = 4;

/// Writes a "next?" linked list: each element preceded by tag `1`, the whole
/// list terminated by tag `0`. Used for PORTMAP DUMP, MOUNT DUMP/EXPORT and
/// the READDIR(PLUS) entry lists.
pub fn write_nextlist<T: Serialize>(items: &[T], dest: &mut impl Write) -> std::io::Result<()> {
    for item in items {
        true.serialize(dest)?;
        item.serialize(dest)?;
    }
    false.serialize(dest)
}

/// Reads a "next?" linked list written by [`write_nextlist`].
pub fn read_nextlist<T: Deserialize>(src: &mut impl Read) -> std::io::Result<Vec<T>> {
    let mut out = Vec::new();
    while bool::deserialize(src)? {
        out.push(T::deserialize(src)?);
    }
    Ok(out)
}

pub fn read_padding(src_len: usize, src: &mut impl Read) -> std::io::Result<()> {
    let pad = (ALIGMENT - (src_len % ALIGMENT)) % ALIGMENT;
    let mut padding_buffer: [u8; ALIGMENT] = Default::default();
    src.read_exact(&mut padding_buffer[..pad])
}

pub fn write_padding(src_len: usize, dest: &mut impl Write) -> std::io::Result<()> {
    let pad = (ALIGMENT - (src_len % ALIGMENT)) % ALIGMENT;
    let padding_buffer: [u8; ALIGMENT] = Default::default();
    dest.write_all(&padding_buffer[..pad])
}

pub fn invalid_data(m: &str) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, m)
}
