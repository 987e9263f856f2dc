//! Partition declarations and GPT partition type identifiers.

use std::fmt;

use anyhow::{anyhow, Result};
use uuid::Uuid;

use crate::content::Content;

/// Longest partition name a GPT entry can hold, in UTF-16 code units.
pub const MAX_NAME_LEN: usize = 36;

/// Well-known partition types, exposed to scripts as the `PartType` table.
pub const PART_TYPES: &[(&str, &str)] = &[
    ("Unused", "00000000-0000-0000-0000-000000000000"),
    ("ESP", "C12A7328-F81F-11D2-BA4B-00A0C93EC93B"),
    ("LegacyMBR", "024DEE41-33E7-11D3-9D69-0008C781F39F"),
    ("BiosBoot", "21686148-6449-6E6F-744E-656564454649"),
    ("LinuxFs", "0FC63DAF-8483-4772-8E79-3D69D8477DE4"),
    ("LinuxSwap", "0657FD6D-A4AB-43C4-84E5-0933C84B4F4F"),
    ("BasicData", "EBD0A0A2-B9E5-4433-87C0-68B6B72699C7"),
];

/// GPT partition type GUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionType(Uuid);

impl PartitionType {
    /// Resolve a type identifier given either as a GUID string or as one of
    /// the symbolic names in [`PART_TYPES`].
    pub fn parse(id: &str) -> Result<Self> {
        let id = id.trim();
        let guid = PART_TYPES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(id))
            .map(|(_, guid)| *guid)
            .unwrap_or(id);

        Uuid::parse_str(guid)
            .map(Self)
            .map_err(|e| anyhow!("invalid partition type '{}': {}", id, e))
    }

    pub fn guid(&self) -> Uuid {
        self.0
    }

    pub fn is_unused(&self) -> bool {
        self.0.is_nil()
    }

    /// Convert to the partition-table codec's representation.
    ///
    /// The codec holds type GUIDs as `&'static str`. Known GUIDs map to its
    /// constants; any other GUID string is leaked.
    pub fn to_gpt(self) -> gpt::partition_types::Type {
        gpt::partition_types::Type::from_uuid(&self.0).unwrap_or_else(|_| {
            gpt::partition_types::Type {
                guid: Box::leak(self.to_string().into_boxed_str()),
                os: gpt::partition_types::OperatingSystem::None,
            }
        })
    }
}

impl fmt::Display for PartitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = Uuid::encode_buffer();
        f.write_str(self.0.hyphenated().encode_upper(&mut buf))
    }
}

/// One partition of the image, in declaration order.
#[derive(Debug)]
pub struct Partition {
    pub name: String,
    pub part_type: PartitionType,
    pub content: Content,
}

impl Partition {
    pub fn new(name: impl Into<String>, part_type: PartitionType, content: Content) -> Self {
        Self {
            name: name.into(),
            part_type,
            content,
        }
    }
}
