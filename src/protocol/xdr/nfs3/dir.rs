//! Module contains XDR data structures related to directories for NFS version 3 protocol
//! as defined in RFC 1813.
//!
//! This module includes data structures for the following directory operations:
//! - MKDIR: Create a directory (procedure 9)
//! - SYMLINK: Create a symbolic link (procedure 10)
//! - READDIR: Read from a directory (procedure 16)
//! - READDIRPLUS: Extended read from a directory (procedure 17)
//! - MKNOD: Create a special device (procedure 11)
//!
//! These structures implement the XDR serialization/deserialization interfaces for
//! the request arguments and response data of directory-related operations.

// Allow unused code warnings since we implement the complete RFC 1813 specification,
// including procedures that may not be used by all clients
#![allow(dead_code)]
// Preserve original RFC naming conventions (e.g. READDIR3args, MKDIR3resok)
// for consistency with the NFS version 3 protocol specification
#![allow(non_camel_case_types)]

use std::io::{Read, Write};

use num_derive::{FromPrimitive, ToPrimitive};

use crate::xdr::invalid_data;

use super::*;

/// Enumeration of device types for special files in NFS version 3
/// as defined in RFC 1813 section 3.3.11
/// Used to identify the type of device when creating special files
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, Default, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum devicetype3 {
    /// Character special device
    #[default]
    NF3CHR = 0,
    /// Block special device
    NF3BLK = 1,
    /// Socket
    NF3SOCK = 2,
    /// FIFO pipe
    NF3FIFO = 3,
}
impl SerializeEnum for devicetype3 {}
impl DeserializeEnum for devicetype3 {}

/// Arguments for the MKDIR procedure (procedure 9)
/// as defined in RFC 1813 section 3.3.9
/// Used to create a new directory
#[allow(non_camel_case_types)]
#[derive(Debug, Default)]
pub struct MKDIR3args {
    /// Directory where new directory should be created and its name
    pub dirops: diropargs3,
    /// Initial attributes for the new directory
    pub attributes: sattr3,
}
DeserializeStruct!(MKDIR3args, dirops, attributes);
SerializeStruct!(MKDIR3args, dirops, attributes);

/// Arguments for the SYMLINK procedure (procedure 10)
/// as defined in RFC 1813 section 3.3.10
/// Used to create a symbolic link
#[allow(non_camel_case_types)]
#[derive(Debug, Default)]
pub struct SYMLINK3args {
    /// Directory where symbolic link should be created and its name
    pub dirops: diropargs3,
    /// Target path and attributes for the symbolic link
    pub symlink: symlinkdata3,
}
DeserializeStruct!(SYMLINK3args, dirops, symlink);
SerializeStruct!(SYMLINK3args, dirops, symlink);

/// Directory entry returned by READDIR operation
/// as defined in RFC 1813 section 3.3.16
#[allow(non_camel_case_types)]
#[derive(Debug, Default)]
pub struct entry3 {
    /// File identifier (inode number)
    pub fileid: fileid3,
    /// Name of the directory entry
    pub name: filename3,
    /// Cookie for the next READDIR operation
    pub cookie: cookie3,
}
DeserializeStruct!(entry3, fileid, name, cookie);
SerializeStruct!(entry3, fileid, name, cookie);

/// Arguments for the READDIR procedure (procedure 16)
/// as defined in RFC 1813 section 3.3.16
/// Used to read entries from a directory. The server returns a variable number of directory entries,
/// up to the specified count limit.
#[allow(non_camel_case_types)]
#[derive(Debug, Default)]
pub struct READDIR3args {
    /// File handle for the directory to be read
    pub dir: nfs_fh3,
    /// Cookie indicating where to start reading directory entries
    /// A cookie value of 0 means start at beginning of directory
    pub cookie: cookie3,
    /// Cookie verifier to detect whether directory has changed
    pub cookieverf: cookieverf3,
    /// Maximum number of bytes of directory information to return
    pub dircount: count3,
}
DeserializeStruct!(READDIR3args, dir, cookie, cookieverf, dircount);
SerializeStruct!(READDIR3args, dir, cookie, cookieverf, dircount);

/// The entry list and end-of-file flag carried inside a successful READDIR
/// reply, as defined in RFC 1813 section 3.3.16. `entries` is encoded on
/// the wire as a "next?" linked list.
#[allow(non_camel_case_types)]
#[derive(Debug, Default)]
pub struct dirlist3 {
    pub entries: Vec<entry3>,
    pub eof: bool,
}

impl Serialize for dirlist3 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        crate::xdr::write_nextlist(&self.entries, dest)?;
        self.eof.serialize(dest)
    }
}

impl Deserialize for dirlist3 {
    fn deserialize<R: Read>(src: &mut R) -> std::io::Result<Self> {
        Ok(dirlist3 {
            entries: crate::xdr::read_nextlist(src)?,
            eof: bool::deserialize(src)?,
        })
    }
}

/// Successful READDIR reply: directory attributes, the cookie verifier the
/// client must echo back on the next call, and the entry list itself.
#[allow(non_camel_case_types)]
#[derive(Debug, Default)]
pub struct READDIR3resok {
    pub dir_attributes: post_op_attr,
    pub cookieverf: cookieverf3,
    pub reply: dirlist3,
}
DeserializeStruct!(READDIR3resok, dir_attributes, cookieverf, reply);
SerializeStruct!(READDIR3resok, dir_attributes, cookieverf, reply);

/// Directory entry with additional attributes for READDIRPLUS operation
/// as defined in RFC 1813 section 3.3.17
/// This structure represents a single directory entry with extended information
#[allow(non_camel_case_types)]
#[derive(Debug, Default)]
pub struct entryplus3 {
    /// File identifier (inode number) uniquely identifying the file within the filesystem
    pub fileid: fileid3,
    /// Name of the directory entry (filename)
    pub name: filename3,
    /// Cookie value that can be used in subsequent READDIRPLUS calls to resume listing
    pub cookie: cookie3,
    /// File attributes for this directory entry
    pub name_attributes: post_op_attr,
    /// File handle for this directory entry
    pub name_handle: post_op_fh3,
}
DeserializeStruct!(entryplus3, fileid, name, cookie, name_attributes, name_handle);
SerializeStruct!(entryplus3, fileid, name, cookie, name_attributes, name_handle);

/// Arguments for the READDIRPLUS procedure (procedure 17)
/// as defined in RFC 1813 section 3.3.17
/// READDIRPLUS returns directory entries along with their attributes and file handles.
#[allow(non_camel_case_types)]
#[derive(Debug, Default)]
pub struct READDIRPLUS3args {
    /// Directory file handle
    pub dir: nfs_fh3,
    /// Cookie from previous READDIRPLUS - where to start reading
    pub cookie: cookie3,
    /// Cookie verifier to detect changed directories
    pub cookieverf: cookieverf3,
    /// Maximum number of bytes of directory information to return
    pub dircount: count3,
    /// Maximum number of bytes of attribute information to return
    pub maxcount: count3,
}
DeserializeStruct!(READDIRPLUS3args, dir, cookie, cookieverf, dircount, maxcount);
SerializeStruct!(READDIRPLUS3args, dir, cookie, cookieverf, dircount, maxcount);

/// The entry list and end-of-file flag carried inside a successful
/// READDIRPLUS reply, as defined in RFC 1813 section 3.3.17. `entries` is
/// encoded on the wire as a "next?" linked list, same as [`dirlist3`].
#[allow(non_camel_case_types)]
#[derive(Debug, Default)]
pub struct dirlistplus3 {
    pub entries: Vec<entryplus3>,
    pub eof: bool,
}

impl Serialize for dirlistplus3 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        crate::xdr::write_nextlist(&self.entries, dest)?;
        self.eof.serialize(dest)
    }
}

impl Deserialize for dirlistplus3 {
    fn deserialize<R: Read>(src: &mut R) -> std::io::Result<Self> {
        Ok(dirlistplus3 {
            entries: crate::xdr::read_nextlist(src)?,
            eof: bool::deserialize(src)?,
        })
    }
}

/// Successful READDIRPLUS reply: directory attributes, the cookie
/// verifier to echo back on the next call, and the entry list itself.
#[allow(non_camel_case_types)]
#[derive(Debug, Default)]
pub struct READDIRPLUS3resok {
    pub dir_attributes: post_op_attr,
    pub cookieverf: cookieverf3,
    pub reply: dirlistplus3,
}
DeserializeStruct!(READDIRPLUS3resok, dir_attributes, cookieverf, reply);
SerializeStruct!(READDIRPLUS3resok, dir_attributes, cookieverf, reply);

/// Arguments for the MKNOD procedure (procedure 11)
/// as defined in RFC 1813 section 3.3.11
/// Used to create a special device file, FIFO, or socket
#[allow(non_camel_case_types)]
#[derive(Debug, Default)]
pub struct MKNOD3args {
    /// Directory where the special file should be created and its name
    pub where_dir: diropargs3,
    /// Type and device information for the special file
    pub what: mknoddata3,
}
DeserializeStruct!(MKNOD3args, where_dir, what);
SerializeStruct!(MKNOD3args, where_dir, what);

/// Device data for special files
/// as defined in RFC 1813 section 3.3.11
/// Contains the device type and device numbers
#[allow(non_camel_case_types)]
#[derive(Debug, Default)]
pub struct devicedata3 {
    /// Type of device (character, block, socket, or FIFO)
    pub dev_type: devicetype3,
    /// Major and minor device numbers for character and block devices
    pub device: specdata3,
}
DeserializeStruct!(devicedata3, dev_type, device);
SerializeStruct!(devicedata3, dev_type, device);

/// Discriminated union carried by MKNOD3args as defined in RFC 1813
/// section 3.3.11: character and block devices carry major/minor numbers,
/// sockets and FIFOs carry only the initial attributes, and any other
/// `ftype3` is rejected by the server with `NFS3ERR_BADTYPE` rather than
/// encoded here.
#[allow(non_camel_case_types)]
#[derive(Debug)]
pub enum mknoddata3 {
    chr(devicedata3),
    blk(devicedata3),
    sock(sattr3),
    fifo(sattr3),
}

impl Default for mknoddata3 {
    fn default() -> Self {
        mknoddata3::chr(devicedata3::default())
    }
}

impl Serialize for mknoddata3 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        match self {
            mknoddata3::chr(dev) => {
                ftype3::NF3CHR.serialize(dest)?;
                dev.serialize(dest)
            }
            mknoddata3::blk(dev) => {
                ftype3::NF3BLK.serialize(dest)?;
                dev.serialize(dest)
            }
            mknoddata3::sock(attr) => {
                ftype3::NF3SOCK.serialize(dest)?;
                attr.serialize(dest)
            }
            mknoddata3::fifo(attr) => {
                ftype3::NF3FIFO.serialize(dest)?;
                attr.serialize(dest)
            }
        }
    }
}

impl Deserialize for mknoddata3 {
    fn deserialize<R: Read>(src: &mut R) -> std::io::Result<Self> {
        Ok(match ftype3::deserialize(src)? {
            ftype3::NF3CHR => mknoddata3::chr(devicedata3::deserialize(src)?),
            ftype3::NF3BLK => mknoddata3::blk(devicedata3::deserialize(src)?),
            ftype3::NF3SOCK => mknoddata3::sock(sattr3::deserialize(src)?),
            ftype3::NF3FIFO => mknoddata3::fifo(sattr3::deserialize(src)?),
            other => return Err(invalid_data(&format!("invalid mknoddata3 type {:?}", other))),
        })
    }
}

/// MKDIR, SYMLINK and MKNOD share CREATE's reply shape: new object handle
/// and attributes plus the parent directory's wcc_data.
pub type MKDIR3resok = CREATE3resok;
pub type SYMLINK3resok = CREATE3resok;
pub type MKNOD3resok = CREATE3resok;
