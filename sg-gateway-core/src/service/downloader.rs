//! Chunked file downloader: one instance per in-flight transfer.
//!
//! The platform pushes the file in packets of `[previous hash | data | hash]`.
//! Each packet is verified against its own trailing hash and against the
//! previous packet's hash; a bad packet is re-requested a bounded number of
//! times. Once every byte has arrived, the assembled file must match the
//! SHA-256 announced at initiate time before it is written to disk.

use sg_gateway_models::domain::{BinaryData, FilePacketRequest, FileTransferError};
use sg_gateway_utils::hash::sha256_raw;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, info, warn};

const MAX_PACKET_RETRIES: u32 = 3;

pub type PacketRequestCallback = Box<dyn Fn(FilePacketRequest) + Send>;
pub type CompleteCallback = Box<dyn Fn(String) + Send>;
pub type FailCallback = Box<dyn Fn(FileTransferError) + Send>;

struct Transfer {
    file_name: String,
    file_size: u64,
    expected_hash: Vec<u8>,
    directory: PathBuf,
    data: Vec<u8>,
    chunk_index: u64,
    retries: u32,
    previous_packet_hash: [u8; 32],
    finished: bool,
    on_packet: PacketRequestCallback,
    on_complete: CompleteCallback,
    on_fail: FailCallback,
}

pub struct FileDownloader {
    max_packet_size: u64,
    transfer: Mutex<Option<Transfer>>,
}

impl FileDownloader {
    pub fn new(max_packet_size: u64) -> Self {
        Self {
            max_packet_size,
            transfer: Mutex::new(None),
        }
    }

    /// Begin a transfer and request the first packet.
    #[allow(clippy::too_many_arguments)]
    pub fn download(
        &self,
        file_name: impl Into<String>,
        file_size: u64,
        expected_hash: Vec<u8>,
        directory: impl Into<PathBuf>,
        on_packet: PacketRequestCallback,
        on_complete: CompleteCallback,
        on_fail: FailCallback,
    ) {
        let transfer = Transfer {
            file_name: file_name.into(),
            file_size,
            expected_hash,
            directory: directory.into(),
            data: Vec::new(),
            chunk_index: 0,
            retries: 0,
            previous_packet_hash: [0u8; 32],
            finished: false,
            on_packet,
            on_complete,
            on_fail,
        };

        request_packet(&transfer, self.max_packet_size);
        *self.transfer.lock().unwrap() = Some(transfer);
    }

    /// Feed one packet. Drives the transfer forward: verify, append and
    /// either ask for the next chunk or finalize.
    pub fn handle_data(&self, packet: BinaryData) {
        let mut guard = self.transfer.lock().unwrap();
        let Some(transfer) = guard.as_mut() else {
            warn!("Binary data without an active transfer");
            return;
        };
        if transfer.finished {
            debug!(file_name = transfer.file_name, "Binary data after completion");
            return;
        }

        if !packet.valid() || packet.previous_hash != transfer.previous_packet_hash {
            transfer.retries += 1;
            warn!(
                file_name = transfer.file_name,
                chunk_index = transfer.chunk_index,
                retries = transfer.retries,
                "Invalid packet"
            );

            if transfer.retries > MAX_PACKET_RETRIES {
                transfer.finished = true;
                (transfer.on_fail)(FileTransferError::RetryCountExceeded);
                return;
            }

            request_packet(transfer, self.max_packet_size);
            return;
        }

        transfer.retries = 0;
        transfer.previous_packet_hash = packet.hash;
        transfer.data.extend_from_slice(&packet.data);

        if (transfer.data.len() as u64) < transfer.file_size {
            transfer.chunk_index += 1;
            request_packet(transfer, self.max_packet_size);
            return;
        }

        transfer.finished = true;
        finalize(transfer);
    }

    /// Abort the transfer. Synchronous: once this returns no callback will be
    /// emitted anymore.
    pub fn abort(&self) {
        let mut guard = self.transfer.lock().unwrap();
        if let Some(transfer) = guard.as_mut() {
            info!(file_name = transfer.file_name, "Transfer aborted");
            transfer.finished = true;
        }
    }
}

fn request_packet(transfer: &Transfer, max_packet_size: u64) {
    let remaining = transfer.file_size - transfer.data.len() as u64;
    (transfer.on_packet)(FilePacketRequest {
        file_name: transfer.file_name.clone(),
        chunk_index: transfer.chunk_index,
        chunk_size: remaining.min(max_packet_size),
    });
}

fn finalize(transfer: &Transfer) {
    if sha256_raw(&transfer.data).as_slice() != transfer.expected_hash.as_slice() {
        warn!(file_name = transfer.file_name, "Assembled file hash mismatch");
        (transfer.on_fail)(FileTransferError::FileHashMismatch);
        return;
    }

    let path = transfer.directory.join(&transfer.file_name);
    if let Err(e) = std::fs::create_dir_all(&transfer.directory) {
        warn!(error = %e, "Failed to create download directory");
        (transfer.on_fail)(FileTransferError::FileSystemError);
        return;
    }
    if let Err(e) = std::fs::write(&path, &transfer.data) {
        warn!(error = %e, "Failed to write downloaded file");
        (transfer.on_fail)(FileTransferError::FileSystemError);
        return;
    }

    info!(
        file_name = transfer.file_name,
        path = %path.display(),
        "Download complete"
    );
    (transfer.on_complete)(path.to_string_lossy().into_owned());
}
