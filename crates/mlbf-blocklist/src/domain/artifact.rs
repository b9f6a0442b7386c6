//! Published record shapes
//!
//! These are the JSON records handed to the publisher. Field names are part
//! of the client contract.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::entries::KEY_FORMAT;
use super::mlbf::Mlbf;
use super::stash::Stash;
use crate::error::FilterError;

pub const ATTACHMENT_TYPE_BASE: &str = "bloomfilter-base";
pub const ATTACHMENT_FILENAME: &str = "filter.bin";
pub const ATTACHMENT_MIMETYPE: &str = "application/octet-stream";

/// Metadata record for a base filter
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseFilterRecord {
    pub key_format: String,
    pub generation_time: u64,
    pub attachment_type: String,
}

/// Added/removed key lists as they appear on the wire
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StashBody {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

/// Metadata record for a stash
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StashRecord {
    pub key_format: String,
    pub stash_time: u64,
    pub stash: StashBody,
}

/// Binary payload attached to a base record
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub mimetype: String,
    pub data: Vec<u8>,
}

impl Attachment {
    /// Hex SHA-256 of the payload, for logs and integrity checks
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(&self.data))
    }
}

/// A base filter ready to publish
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BaseArtifact {
    pub record: BaseFilterRecord,
    pub attachment: Attachment,
}

impl BaseArtifact {
    pub fn from_filter(mlbf: &Mlbf) -> Result<Self, FilterError> {
        Ok(Self {
            record: BaseFilterRecord {
                key_format: mlbf.key_format().to_string(),
                generation_time: mlbf.generation_time(),
                attachment_type: ATTACHMENT_TYPE_BASE.to_string(),
            },
            attachment: Attachment {
                filename: ATTACHMENT_FILENAME.to_string(),
                mimetype: ATTACHMENT_MIMETYPE.to_string(),
                data: mlbf.to_bytes()?,
            },
        })
    }

    /// Decode the attached filter, checking it matches the record
    pub fn filter(&self) -> Result<Mlbf, FilterError> {
        if self.record.key_format != KEY_FORMAT {
            return Err(FilterError::KeyFormatMismatch {
                expected: KEY_FORMAT.to_string(),
                found: self.record.key_format.clone(),
            });
        }
        let mlbf = Mlbf::from_bytes(&self.attachment.data)?;
        if mlbf.generation_time() != self.record.generation_time {
            return Err(FilterError::InvalidParameters(format!(
                "attachment generation {} does not match record {}",
                mlbf.generation_time(),
                self.record.generation_time
            )));
        }
        Ok(mlbf)
    }
}

impl StashRecord {
    pub fn from_stash(stash: &Stash) -> Self {
        Self {
            key_format: KEY_FORMAT.to_string(),
            stash_time: stash.stash_time,
            stash: StashBody {
                added: stash.added.iter().cloned().collect(),
                removed: stash.removed.iter().cloned().collect(),
            },
        }
    }
}

/// What one generation cycle hands to the publisher
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Artifact {
    Base(BaseArtifact),
    Stash(StashRecord),
}

impl Artifact {
    pub fn generation_time(&self) -> u64 {
        match self {
            Artifact::Base(base) => base.record.generation_time,
            Artifact::Stash(stash) => stash.stash_time,
        }
    }

    pub fn is_base(&self) -> bool {
        matches!(self, Artifact::Base(_))
    }
}
