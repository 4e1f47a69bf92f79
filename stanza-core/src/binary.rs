//! Compact binary serialization for elements.
//!
//! A flat little-endian framing for caching and inter-node transport:
//! every string is a `u32` length followed by its UTF-8 bytes, attributes
//! are counted with a `u16` and children with a `u32`, and children
//! recurse. Field lengths are bounded on decode so a corrupt or hostile
//! length prefix cannot drive an allocation, and the same bounds are
//! enforced on encode so every written stream is decodable.

use std::io::{Read, Write};
use std::sync::Arc;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use thiserror::Error;

use crate::element::{Attribute, Element, Inner};

/// Upper bound on any single decoded string.
const MAX_FIELD_LEN: u32 = 1 << 20;

/// Upper bound on a decoded child count.
const MAX_CHILDREN: u32 = 1 << 16;

#[derive(Debug, Error)]
pub enum BinaryError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid utf-8 in serialized element")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("serialized field length {0} exceeds limit")]
    FieldTooLarge(u64),

    #[error("serialized attribute count {0} exceeds limit")]
    TooManyAttributes(u64),

    #[error("serialized child count {0} exceeds limit")]
    TooManyChildren(u64),
}

impl Element {
    /// Serialize the element tree into `w`.
    ///
    /// Anything over the codec bounds is rejected here rather than
    /// written: a stream `from_bytes` would refuse is never produced.
    pub fn to_bytes<W: Write>(&self, w: &mut W) -> Result<(), BinaryError> {
        write_str(w, self.name())?;
        write_str(w, self.text())?;
        let attr_count = self.attribute_count();
        if attr_count > u16::MAX as usize {
            return Err(BinaryError::TooManyAttributes(attr_count as u64));
        }
        w.write_u16::<LittleEndian>(attr_count as u16)?;
        for attr in self.all_attributes() {
            write_str(w, &attr.label)?;
            write_str(w, &attr.value)?;
        }
        let child_count = self.children_count();
        if child_count > MAX_CHILDREN as usize {
            return Err(BinaryError::TooManyChildren(child_count as u64));
        }
        w.write_u32::<LittleEndian>(child_count as u32)?;
        for child in self.all_children() {
            child.to_bytes(w)?;
        }
        Ok(())
    }

    /// Decode an element tree from `r`.
    pub fn from_bytes<R: Read>(r: &mut R) -> Result<Element, BinaryError> {
        let name = read_str(r)?;
        let text = read_str(r)?;
        let attr_count = r.read_u16::<LittleEndian>()?;
        let mut attributes = Vec::with_capacity(attr_count as usize);
        for _ in 0..attr_count {
            let label = read_str(r)?;
            let value = read_str(r)?;
            attributes.push(Attribute { label, value });
        }
        let child_count = r.read_u32::<LittleEndian>()?;
        if child_count > MAX_CHILDREN {
            return Err(BinaryError::TooManyChildren(child_count as u64));
        }
        let mut children = Vec::with_capacity(child_count as usize);
        for _ in 0..child_count {
            children.push(Element::from_bytes(r)?);
        }
        Ok(Element(Arc::new(Inner {
            name,
            text,
            attributes,
            children,
        })))
    }
}

fn write_str<W: Write>(w: &mut W, s: &str) -> Result<(), BinaryError> {
    if s.len() > MAX_FIELD_LEN as usize {
        return Err(BinaryError::FieldTooLarge(s.len() as u64));
    }
    w.write_u32::<LittleEndian>(s.len() as u32)?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

fn read_str<R: Read>(r: &mut R) -> Result<String, BinaryError> {
    let len = r.read_u32::<LittleEndian>()?;
    if len > MAX_FIELD_LEN {
        return Err(BinaryError::FieldTooLarge(len as u64));
    }
    let mut buf = vec![0; len as usize];
    r.read_exact(&mut buf)?;
    Ok(String::from_utf8(buf)?)
}
