//! The XDR (External Data Representation) module defines data structures and methods
//! for serializing/deserializing data according to RFC 1832 standard.
//!
//! XDR provides machine-independent data representation format,
//! which is critical for network protocols like NFS.
//!
//! All data structures that travel the wire implement [`Serialize`] (encode) and/or
//! [`Deserialize`] (decode) against a byte buffer with 4-byte alignment padding.

use std::io::{Read, Write};

use byteorder::BigEndian;
use byteorder::{ReadBytesExt, WriteBytesExt};
use num_traits::{FromPrimitive, ToPrimitive};

pub mod mount;
pub mod nfs3;
pub mod portmap;
pub mod rpc;
mod utils;

pub use utils::{invalid_data, read_nextlist, read_padding, write_nextlist, write_padding};

/// Type alias for the standard endianness used in XDR serialization (Big Endian).
pub type XDREndian = BigEndian;

/// Encodes a value into a writer.
///
/// Implemented directly for the XDR primitive types and generated by
/// [`SerializeStruct`], [`SerializeEnum`] and [`SerializeBoolUnion`] for the
/// composite wire types declared in the sibling modules.
pub trait Serialize {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()>;
}

/// Decodes a value from a reader.
///
/// Counterpart to [`Serialize`]. A short read while decoding a fixed or
/// length-prefixed field surfaces as `io::ErrorKind::UnexpectedEof`, which
/// callers at the RPC session boundary map onto `TruncatedMessage`; any other
/// decode failure (an out-of-range union tag, an invalid enum value) is
/// reported as `io::ErrorKind::InvalidData` and maps onto `MalformedMessage`.
pub trait Deserialize: Sized {
    fn deserialize<R: Read>(src: &mut R) -> std::io::Result<Self>;
}

/// Free-function form of [`Serialize::serialize`], for call sites that prefer
/// `serialize(&value, &mut out)` over the method form.
pub fn serialize<T: Serialize, W: Write>(value: &T, dest: &mut W) -> std::io::Result<()> {
    value.serialize(dest)
}

/// Free-function form of [`Deserialize::deserialize`]; the target type is
/// inferred from context or given explicitly as `deserialize::<T>(&mut src)`.
pub fn deserialize<T: Deserialize, R: Read>(src: &mut R) -> std::io::Result<T> {
    T::deserialize(src)
}

impl Serialize for bool {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_u32::<XDREndian>(*self as u32)
    }
}

impl Deserialize for bool {
    fn deserialize<R: Read>(src: &mut R) -> std::io::Result<Self> {
        Ok(src.read_u32::<XDREndian>()? != 0)
    }
}

impl Serialize for i32 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_i32::<XDREndian>(*self)
    }
}

impl Deserialize for i32 {
    fn deserialize<R: Read>(src: &mut R) -> std::io::Result<Self> {
        src.read_i32::<XDREndian>()
    }
}

impl Serialize for i64 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_i64::<XDREndian>(*self)
    }
}

impl Deserialize for i64 {
    fn deserialize<R: Read>(src: &mut R) -> std::io::Result<Self> {
        src.read_i64::<XDREndian>()
    }
}

impl Serialize for u32 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_u32::<XDREndian>(*self)
    }
}

impl Deserialize for u32 {
    fn deserialize<R: Read>(src: &mut R) -> std::io::Result<Self> {
        src.read_u32::<XDREndian>()
    }
}

impl Serialize for u64 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_u64::<XDREndian>(*self)
    }
}

impl Deserialize for u64 {
    fn deserialize<R: Read>(src: &mut R) -> std::io::Result<Self> {
        src.read_u64::<XDREndian>()
    }
}

/// Fixed-size byte arrays serialize as their raw bytes, unpadded (callers pick
/// `N` to already be 4-byte aligned, as every fixed-opaque NFSv3 field is:
/// `cookieverf3`, `createverf3`, `writeverf3`).
impl<const N: usize> Serialize for [u8; N] {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_all(self)
    }
}

impl<const N: usize> Deserialize for [u8; N] {
    fn deserialize<R: Read>(src: &mut R) -> std::io::Result<Self> {
        let mut buf = [0u8; N];
        src.read_exact(&mut buf)?;
        Ok(buf)
    }
}

/// Variable-length opaque: 4-byte length prefix, raw bytes, zero padding to
/// the next multiple of 4.
impl Serialize for Vec<u8> {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        assert!(self.len() < u32::MAX as usize);
        (self.len() as u32).serialize(dest)?;
        dest.write_all(self)?;
        write_padding(self.len(), dest)
    }
}

impl Deserialize for Vec<u8> {
    fn deserialize<R: Read>(src: &mut R) -> std::io::Result<Self> {
        let length = u32::deserialize(src)? as usize;
        let mut buf = vec![0u8; length];
        src.read_exact(&mut buf)?;
        read_padding(length, src)?;
        Ok(buf)
    }
}

/// Length-prefixed array of fixed-width elements (no per-element padding
/// needed since each `u32` is already 4-byte aligned).
impl Serialize for Vec<u32> {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        assert!(self.len() < u32::MAX as usize);
        (self.len() as u32).serialize(dest)?;
        for i in self {
            i.serialize(dest)?;
        }
        Ok(())
    }
}

impl Deserialize for Vec<u32> {
    fn deserialize<R: Read>(src: &mut R) -> std::io::Result<Self> {
        let length = u32::deserialize(src)? as usize;
        let mut out = Vec::with_capacity(length);
        for _ in 0..length {
            out.push(u32::deserialize(src)?);
        }
        Ok(out)
    }
}

/// Blanket `Serialize` for any type opting into enum-as-u32 encoding by
/// implementing the marker trait [`SerializeEnum`] (usually via the
/// [`SerializeEnum!`](crate::SerializeEnum) macro).
pub trait SerializeEnum: ToPrimitive + Copy {}

impl<T: SerializeEnum> Serialize for T {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        let v = self
            .to_u32()
            .ok_or_else(|| invalid_data("enum value out of u32 range"))?;
        dest.write_u32::<XDREndian>(v)
    }
}

/// Blanket `Deserialize` for any type opting into enum-as-u32 decoding via
/// the [`DeserializeEnum!`](crate::DeserializeEnum) macro. An out-of-range
/// tag is a `MalformedMessage`, not a panic.
pub trait DeserializeEnum: FromPrimitive + Sized {}

impl<T: DeserializeEnum> Deserialize for T {
    fn deserialize<R: Read>(src: &mut R) -> std::io::Result<Self> {
        let v = src.read_u32::<XDREndian>()?;
        T::from_u32(v).ok_or_else(|| invalid_data(&format!("invalid enum value {v}")))
    }
}

/// Implements [`Serialize`] for a struct by serializing each named field in
/// declaration order.
#[macro_export]
macro_rules! SerializeStruct {
    ($t:ident, $($element:ident),* $(,)?) => {
        impl $crate::xdr::Serialize for $t {
            fn serialize<W: std::io::Write>(&self, dest: &mut W) -> std::io::Result<()> {
                $($crate::xdr::Serialize::serialize(&self.$element, dest)?;)*
                Ok(())
            }
        }
    };
}

/// Implements [`Deserialize`] for a struct by deserializing each named field
/// in declaration order and constructing the struct literal.
#[macro_export]
macro_rules! DeserializeStruct {
    ($t:ident, $($element:ident),* $(,)?) => {
        impl $crate::xdr::Deserialize for $t {
            fn deserialize<R: std::io::Read>(src: &mut R) -> std::io::Result<Self> {
                Ok($t {
                    $($element: $crate::xdr::Deserialize::deserialize(src)?,)*
                })
            }
        }
    };
}

/// Marks `$t` as an enum encoded as a plain `u32` tag (see [`SerializeEnum`]).
#[macro_export]
macro_rules! SerializeEnum {
    ($t:ident) => {
        impl $crate::xdr::SerializeEnum for $t {}
    };
}

/// Marks `$t` as an enum decoded from a plain `u32` tag (see
/// [`DeserializeEnum`]).
#[macro_export]
macro_rules! DeserializeEnum {
    ($t:ident) => {
        impl $crate::xdr::DeserializeEnum for $t {}
    };
}

/// Implements [`Serialize`] for an XDR boolean union: `$t::Void` encodes as
/// `false`, `$t::$enumcase(v)` encodes as `true` followed by `v`.
#[macro_export]
macro_rules! SerializeBoolUnion {
    ($t:ident, $enumcase:ident, $enumtype:ty) => {
        impl $crate::xdr::Serialize for $t {
            fn serialize<W: std::io::Write>(&self, dest: &mut W) -> std::io::Result<()> {
                match self {
                    $t::Void => $crate::xdr::Serialize::serialize(&false, dest),
                    $t::$enumcase(v) => {
                        $crate::xdr::Serialize::serialize(&true, dest)?;
                        $crate::xdr::Serialize::serialize(v, dest)
                    }
                }
            }
        }
    };
}

/// Implements [`Deserialize`] for an XDR boolean union (see
/// [`SerializeBoolUnion!`]).
#[macro_export]
macro_rules! DeserializeBoolUnion {
    ($t:ident, $enumcase:ident, $enumtype:ty) => {
        impl $crate::xdr::Deserialize for $t {
            fn deserialize<R: std::io::Read>(src: &mut R) -> std::io::Result<Self> {
                let present: bool = $crate::xdr::Deserialize::deserialize(src)?;
                if present {
                    let v: $enumtype = $crate::xdr::Deserialize::deserialize(src)?;
                    Ok($t::$enumcase(v))
                } else {
                    Ok($t::Void)
                }
            }
        }
    };
}

pub use crate::DeserializeBoolUnion;
pub use crate::DeserializeEnum;
pub use crate::DeserializeStruct;
pub use crate::SerializeBoolUnion;
pub use crate::SerializeEnum;
pub use crate::SerializeStruct;

#[cfg(test)]
mod proptests {
    use std::io::Cursor;

    use proptest::prelude::*;

    use super::*;
    use crate::protocol::xdr::nfs3::nfs_fh3;

    fn round_trips<T: Serialize + Deserialize + PartialEq + std::fmt::Debug>(value: T) {
        let mut buf = Vec::new();
        value.serialize(&mut buf).unwrap();
        assert_eq!(buf.len() % 4, 0, "encoded length must be a multiple of 4 bytes");

        let mut cursor = Cursor::new(buf.as_slice());
        let decoded = T::deserialize(&mut cursor).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(cursor.position() as usize, buf.len());
    }

    proptest! {
        // §8: "for any value `v` of any defined wire type, decode(encode(v))
        // == v and the encoded length is a multiple of 4".
        #[test]
        fn bool_round_trips(v: bool) {
            round_trips(v);
        }

        #[test]
        fn u32_round_trips(v: u32) {
            round_trips(v);
        }

        #[test]
        fn u64_round_trips(v: u64) {
            round_trips(v);
        }

        #[test]
        fn i32_round_trips(v: i32) {
            round_trips(v);
        }

        #[test]
        fn i64_round_trips(v: i64) {
            round_trips(v);
        }

        // Variable-length opaque: length prefix + bytes + zero padding to a
        // 4-byte boundary (§3, §8).
        #[test]
        fn opaque_vec_round_trips(v in proptest::collection::vec(any::<u8>(), 0..256)) {
            round_trips(v);
        }

        // `nfs_fh3` is itself opaque-up-to-64-bytes (§3); exercised directly
        // since it's the one wire type callers actually hold onto as a key.
        #[test]
        fn file_handle_round_trips(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            round_trips(nfs_fh3 { data: bytes });
        }
    }

    #[test]
    fn empty_opaque_encodes_to_bare_length_prefix() {
        let mut buf = Vec::new();
        Vec::<u8>::new().serialize(&mut buf).unwrap();
        assert_eq!(buf, vec![0x00, 0x00, 0x00, 0x00]);
    }
}
