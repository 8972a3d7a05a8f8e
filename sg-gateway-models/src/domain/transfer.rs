//! File transfer model: upload requests, statuses and the binary packet
//! framing used by chunked downloads.

use serde::{Deserialize, Serialize};
use sg_gateway_utils::hash::sha256_raw;

/// Record of a fully downloaded file.
///
/// `hash` is the base64 encoding of the raw SHA-256 of the file contents,
/// exactly as the platform announced it in the upload initiate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub name: String,
    pub hash: String,
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileTransferStatus {
    FileTransfer,
    FileReady,
    Aborted,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileTransferError {
    UnspecifiedError,
    UnsupportedFileSize,
    FileHashMismatch,
    FileSystemError,
    RetryCountExceeded,
}

/// Status report for one file, sent to the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUploadStatus {
    pub file_name: String,
    pub status: FileTransferStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<FileTransferError>,
}

impl FileUploadStatus {
    pub fn ok(file_name: impl Into<String>, status: FileTransferStatus) -> Self {
        Self {
            file_name: file_name.into(),
            status,
            error: None,
        }
    }

    pub fn error(file_name: impl Into<String>, error: FileTransferError) -> Self {
        Self {
            file_name: file_name.into(),
            status: FileTransferStatus::Error,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUploadInitiate {
    pub file_name: String,
    pub file_size: u64,
    pub file_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUploadAbort {
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDelete {
    pub file_name: String,
}

/// Request for one chunk of a file being downloaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePacketRequest {
    pub file_name: String,
    pub chunk_index: u64,
    pub chunk_size: u64,
}

/// File list as published to the platform: one entry per stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileListEntry {
    pub file_name: String,
}

pub fn file_list(names: impl IntoIterator<Item = String>) -> Vec<FileListEntry> {
    names
        .into_iter()
        .map(|file_name| FileListEntry { file_name })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileListConfirm {
    pub result: String,
}

/// One binary packet of a chunked download.
///
/// Wire layout: 32 bytes previous-packet hash, payload data, 32 bytes SHA-256
/// of the data. The first packet of a transfer carries all zeros in the
/// previous-hash field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryData {
    pub previous_hash: [u8; 32],
    pub data: Vec<u8>,
    pub hash: [u8; 32],
}

impl BinaryData {
    pub const HASH_LEN: usize = 32;

    /// Split a raw payload into the packet parts. Returns `None` when the
    /// payload is too short to carry both hashes and at least one data byte.
    pub fn from_bytes(payload: &[u8]) -> Option<Self> {
        if payload.len() <= 2 * Self::HASH_LEN {
            return None;
        }

        let (previous, rest) = payload.split_at(Self::HASH_LEN);
        let (data, hash) = rest.split_at(rest.len() - Self::HASH_LEN);

        Some(Self {
            previous_hash: previous.try_into().ok()?,
            data: data.to_vec(),
            hash: hash.try_into().ok()?,
        })
    }

    /// True when the trailing hash matches the carried data.
    pub fn valid(&self) -> bool {
        sha256_raw(&self.data) == self.hash
    }

    #[inline]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2 * Self::HASH_LEN + self.data.len());
        out.extend_from_slice(&self.previous_hash);
        out.extend_from_slice(&self.data);
        out.extend_from_slice(&self.hash);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(data: &[u8], previous_hash: [u8; 32]) -> Vec<u8> {
        let mut payload = previous_hash.to_vec();
        payload.extend_from_slice(data);
        payload.extend_from_slice(&sha256_raw(data));
        payload
    }

    #[test]
    fn binary_data_round_trip() {
        let payload = packet(b"chunk-contents", [0u8; 32]);
        let parsed = BinaryData::from_bytes(&payload).unwrap();

        assert!(parsed.valid());
        assert_eq!(parsed.data, b"chunk-contents");
        assert_eq!(parsed.to_bytes(), payload);
    }

    #[test]
    fn corrupt_packet_is_invalid() {
        let mut payload = packet(b"chunk-contents", [0u8; 32]);
        payload[40] ^= 0xff;

        let parsed = BinaryData::from_bytes(&payload).unwrap();
        assert!(!parsed.valid());
    }

    #[test]
    fn short_payload_is_rejected() {
        assert!(BinaryData::from_bytes(&[0u8; 64]).is_none());
    }

    #[test]
    fn upload_status_serializes_without_null_error() {
        let status = FileUploadStatus::ok("f.bin", FileTransferStatus::FileReady);
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, r#"{"fileName":"f.bin","status":"FILE_READY"}"#);

        let error = FileUploadStatus::error("f.bin", FileTransferError::FileHashMismatch);
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains(r#""error":"FILE_HASH_MISMATCH""#));
    }
}
