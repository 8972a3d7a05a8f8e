//! File download service.
//!
//! Tracks one slot per file being transferred, routes binary packets to the
//! currently active slot, and reports progress to the platform as
//! `file_upload_status` messages. A background reaper drops slots once they
//! are flagged complete, whether they finished, failed or were aborted.

use crate::command::CommandBuffer;
use crate::inbound::PlatformMessageListener;
use crate::outbound::OutboundMessageHandler;
use crate::service::downloader::FileDownloader;
use async_trait::async_trait;
use base64::Engine;
use sg_gateway_models::domain::{
    file_list, BinaryData, FileDelete, FileInfo, FileTransferError, FileTransferStatus,
    FileUploadAbort, FileUploadInitiate, FileUploadStatus, Message,
};
use sg_gateway_protocol::DownloadProtocol;
use sg_gateway_repository::FileRepository;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

struct DownloadSlot {
    expected_hash: String,
    downloader: Arc<FileDownloader>,
    completed: bool,
}

#[derive(Default)]
struct DownloadState {
    active_downloads: HashMap<String, DownloadSlot>,
    /// Binary packets carry no file name; they belong to this slot.
    current_active: String,
}

/// Everything the queued handlers and downloader callbacks need, cheap to
/// clone into them.
#[derive(Clone)]
struct Ctx {
    gateway_key: String,
    protocol: DownloadProtocol,
    max_file_size: u64,
    max_packet_size: u64,
    download_directory: PathBuf,
    platform_outbound: Arc<dyn OutboundMessageHandler>,
    file_repository: FileRepository,
    state: Arc<Mutex<DownloadState>>,
    cleanup: Arc<Notify>,
    command_buffer: CommandBuffer,
}

pub struct FileDownloadService {
    ctx: Ctx,
    reaper_token: CancellationToken,
}

impl FileDownloadService {
    pub fn new(
        gateway_key: impl Into<String>,
        protocol: DownloadProtocol,
        max_file_size: u64,
        max_packet_size: u64,
        download_directory: impl Into<PathBuf>,
        platform_outbound: Arc<dyn OutboundMessageHandler>,
        file_repository: FileRepository,
    ) -> Self {
        let ctx = Ctx {
            gateway_key: gateway_key.into(),
            protocol,
            max_file_size,
            max_packet_size,
            download_directory: download_directory.into(),
            platform_outbound,
            file_repository,
            state: Arc::new(Mutex::new(DownloadState::default())),
            cleanup: Arc::new(Notify::new()),
            command_buffer: CommandBuffer::new(),
        };

        let reaper_token = CancellationToken::new();
        spawn_reaper(
            Arc::clone(&ctx.state),
            Arc::clone(&ctx.cleanup),
            reaper_token.clone(),
        );

        Self { ctx, reaper_token }
    }

    pub fn stop(&self) {
        self.reaper_token.cancel();
        self.ctx.command_buffer.stop();
    }

    #[cfg(test)]
    fn active_download_count(&self) -> usize {
        self.ctx.state.lock().unwrap().active_downloads.len()
    }
}

impl Drop for FileDownloadService {
    fn drop(&mut self) {
        self.reaper_token.cancel();
    }
}

#[async_trait]
impl PlatformMessageListener for FileDownloadService {
    async fn platform_message_received(&self, message: Message) {
        let ctx = self.ctx.clone();

        if let Some(binary) = self.ctx.protocol.make_binary_data(&message) {
            self.ctx
                .command_buffer
                .push(async move { handle_binary(&ctx, binary) });
            return;
        }

        if let Some(initiate) = self.ctx.protocol.make_file_upload_initiate(&message) {
            self.ctx
                .command_buffer
                .push(async move { handle_initiate(&ctx, initiate).await });
            return;
        }

        if let Some(abort) = self.ctx.protocol.make_file_upload_abort(&message) {
            self.ctx
                .command_buffer
                .push(async move { handle_abort(&ctx, abort) });
            return;
        }

        if let Some(delete) = self.ctx.protocol.make_file_delete(&message) {
            self.ctx
                .command_buffer
                .push(async move { handle_delete(&ctx, delete).await });
            return;
        }

        if self.ctx.protocol.is_file_purge(&message) {
            self.ctx
                .command_buffer
                .push(async move { handle_purge(&ctx).await });
            return;
        }

        if self.ctx.protocol.is_file_list_request(&message) {
            self.ctx
                .command_buffer
                .push(async move { send_file_list_response(&ctx).await });
            return;
        }

        if let Some(confirm) = self.ctx.protocol.make_file_list_confirm(&message) {
            debug!(result = confirm.result, "File list confirmed");
            return;
        }

        warn!(
            channel = message.channel(),
            "Unable to parse file transfer message"
        );
    }
}

fn handle_binary(ctx: &Ctx, binary: BinaryData) {
    // Take the downloader out of the lock before feeding it: its completion
    // callbacks flag the slot, which needs the same lock.
    let downloader = {
        let state = ctx.state.lock().unwrap();
        let Some(slot) = state.active_downloads.get(&state.current_active) else {
            warn!("Unexpected binary data");
            return;
        };
        Arc::clone(&slot.downloader)
    };

    downloader.handle_data(binary);
}

async fn handle_initiate(ctx: &Ctx, request: FileUploadInitiate) {
    if request.file_name.is_empty() {
        warn!("Missing file name from file upload initiate");
        send_status(
            ctx,
            FileUploadStatus::error(request.file_name, FileTransferError::UnspecifiedError),
        );
        return;
    }

    if request.file_size == 0 {
        warn!(file_name = request.file_name, "Missing file size from file upload initiate");
        send_status(
            ctx,
            FileUploadStatus::error(request.file_name, FileTransferError::UnspecifiedError),
        );
        return;
    }

    if request.file_hash.is_empty() {
        warn!(file_name = request.file_name, "Missing file hash from file upload initiate");
        send_status(
            ctx,
            FileUploadStatus::error(request.file_name, FileTransferError::UnspecifiedError),
        );
        return;
    }

    if request.file_size > ctx.max_file_size {
        warn!(
            file_name = request.file_name,
            file_size = request.file_size,
            max_file_size = ctx.max_file_size,
            "File exceeds maximum size"
        );
        send_status(
            ctx,
            FileUploadStatus::error(request.file_name, FileTransferError::UnsupportedFileSize),
        );
        return;
    }

    let stored = ctx
        .file_repository
        .get_file_info(&request.file_name)
        .await
        .unwrap_or_else(|e| {
            warn!(file_name = request.file_name, error = %e, "File lookup failed");
            None
        });

    match stored {
        None => download_file(ctx, request),
        Some(info) if info.hash != request.file_hash => {
            send_status(
                ctx,
                FileUploadStatus::error(request.file_name, FileTransferError::FileHashMismatch),
            );
        }
        Some(_) => {
            send_status(
                ctx,
                FileUploadStatus::ok(request.file_name, FileTransferStatus::FileReady),
            );
        }
    }
}

fn download_file(ctx: &Ctx, request: FileUploadInitiate) {
    let file_name = request.file_name;

    {
        let state = ctx.state.lock().unwrap();
        if let Some(slot) = state.active_downloads.get(&file_name) {
            if slot.expected_hash != request.file_hash {
                warn!(file_name, "Download already active with a different hash");
                send_status(
                    ctx,
                    FileUploadStatus::error(file_name, FileTransferError::UnspecifiedError),
                );
            } else {
                info!(file_name, "Download already active");
                send_status(
                    ctx,
                    FileUploadStatus::ok(file_name, FileTransferStatus::FileTransfer),
                );
            }
            return;
        }
    }

    let expected_hash = match base64::engine::general_purpose::STANDARD.decode(&request.file_hash)
    {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(file_name, error = %e, "File hash is not valid base64");
            send_status(
                ctx,
                FileUploadStatus::error(file_name, FileTransferError::UnspecifiedError),
            );
            return;
        }
    };

    info!(file_name, "Downloading file");
    send_status(
        ctx,
        FileUploadStatus::ok(file_name.clone(), FileTransferStatus::FileTransfer),
    );

    let downloader = Arc::new(FileDownloader::new(ctx.max_packet_size));

    let on_packet = {
        let ctx = ctx.clone();
        Box::new(move |packet_request| {
            let Some(message) = ctx
                .protocol
                .make_packet_request_message(&ctx.gateway_key, &packet_request)
            else {
                warn!("Failed to build file packet request");
                return;
            };
            ctx.platform_outbound.add_message(message);
        })
    };

    let on_complete = {
        let ctx = ctx.clone();
        let file_name = file_name.clone();
        let file_hash = request.file_hash.clone();
        Box::new(move |path: String| {
            flag_completed(&ctx, &file_name);

            let buffer = ctx.command_buffer.clone();
            let ctx = ctx.clone();
            let file_name = file_name.clone();
            let file_hash = file_hash.clone();
            buffer.push(async move {
                let info = FileInfo {
                    name: file_name.clone(),
                    hash: file_hash,
                    path,
                };
                if let Err(e) = ctx.file_repository.store(&info).await {
                    warn!(file_name, error = %e, "Failed to persist file info");
                }
                send_status(
                    &ctx,
                    FileUploadStatus::ok(file_name, FileTransferStatus::FileReady),
                );
            });
        })
    };

    let on_fail = {
        let ctx = ctx.clone();
        let file_name = file_name.clone();
        Box::new(move |code| {
            flag_completed(&ctx, &file_name);
            send_status(&ctx, FileUploadStatus::error(file_name.clone(), code));
        })
    };

    {
        let mut state = ctx.state.lock().unwrap();
        state.active_downloads.insert(
            file_name.clone(),
            DownloadSlot {
                expected_hash: request.file_hash,
                downloader: Arc::clone(&downloader),
                completed: false,
            },
        );
        state.current_active = file_name.clone();
    }

    downloader.download(
        file_name,
        request.file_size,
        expected_hash,
        ctx.download_directory.clone(),
        on_packet,
        on_complete,
        on_fail,
    );
}

fn handle_abort(ctx: &Ctx, request: FileUploadAbort) {
    if request.file_name.is_empty() {
        warn!("Missing file name from file upload abort");
        send_status(
            ctx,
            FileUploadStatus::error(request.file_name, FileTransferError::UnspecifiedError),
        );
        return;
    }

    let file_name = request.file_name;
    let downloader = {
        let state = ctx.state.lock().unwrap();
        match state.active_downloads.get(&file_name) {
            Some(slot) => Arc::clone(&slot.downloader),
            None => {
                debug!(file_name, "Abort for a download that is not active");
                return;
            }
        }
    };

    info!(file_name, "Aborting download");
    downloader.abort();

    {
        let mut state = ctx.state.lock().unwrap();
        if let Some(slot) = state.active_downloads.get_mut(&file_name) {
            slot.completed = true;
        }
        state.current_active.clear();
    }
    ctx.cleanup.notify_one();

    send_status(
        ctx,
        FileUploadStatus::ok(file_name, FileTransferStatus::Aborted),
    );
}

async fn handle_delete(ctx: &Ctx, request: FileDelete) {
    if request.file_name.is_empty() {
        warn!("Missing file name from file delete");
        send_file_list_update(ctx).await;
        return;
    }

    delete_file(ctx, &request.file_name).await;
    send_file_list_update(ctx).await;
}

async fn handle_purge(ctx: &Ctx) {
    let names = match ctx.file_repository.get_all_file_names().await {
        Ok(names) => names,
        Err(e) => {
            error!(error = %e, "Failed to fetch file names");
            send_file_list_update(ctx).await;
            return;
        }
    };

    for name in names {
        delete_file(ctx, &name).await;
    }

    send_file_list_update(ctx).await;
}

async fn delete_file(ctx: &Ctx, file_name: &str) {
    let info = match ctx.file_repository.get_file_info(file_name).await {
        Ok(Some(info)) => info,
        Ok(None) => {
            warn!(file_name, "File info missing, can't delete");
            return;
        }
        Err(e) => {
            error!(file_name, error = %e, "File lookup failed");
            return;
        }
    };

    info!(path = info.path, "Deleting file");
    if let Err(e) = std::fs::remove_file(&info.path) {
        error!(path = info.path, error = %e, "Failed to delete file");
        return;
    }

    if let Err(e) = ctx.file_repository.remove(file_name).await {
        warn!(file_name, error = %e, "Failed to remove file info");
    }
}

fn flag_completed(ctx: &Ctx, file_name: &str) {
    {
        let mut state = ctx.state.lock().unwrap();
        if let Some(slot) = state.active_downloads.get_mut(file_name) {
            slot.completed = true;
        }
    }
    ctx.cleanup.notify_one();
}

fn send_status(ctx: &Ctx, status: FileUploadStatus) {
    let Some(message) = ctx
        .protocol
        .make_upload_status_message(&ctx.gateway_key, &status)
    else {
        error!("Failed to create file upload status");
        return;
    };
    ctx.platform_outbound.add_message(message);
}

async fn send_file_list_update(ctx: &Ctx) {
    let names = match ctx.file_repository.get_all_file_names().await {
        Ok(names) => names,
        Err(e) => {
            error!(error = %e, "Failed to fetch file names");
            return;
        }
    };

    let Some(message) = ctx
        .protocol
        .make_file_list_update_message(&ctx.gateway_key, &file_list(names))
    else {
        error!("Failed to create file list update");
        return;
    };
    ctx.platform_outbound.add_message(message);
}

async fn send_file_list_response(ctx: &Ctx) {
    let names = match ctx.file_repository.get_all_file_names().await {
        Ok(names) => names,
        Err(e) => {
            error!(error = %e, "Failed to fetch file names");
            return;
        }
    };

    let Some(message) = ctx
        .protocol
        .make_file_list_response_message(&ctx.gateway_key, &file_list(names))
    else {
        error!("Failed to create file list response");
        return;
    };
    ctx.platform_outbound.add_message(message);
}

fn spawn_reaper(
    state: Arc<Mutex<DownloadState>>,
    cleanup: Arc<Notify>,
    token: CancellationToken,
) {
    tokio::spawn(async move {
        loop {
            {
                let mut state = state.lock().unwrap();
                state.active_downloads.retain(|file_name, slot| {
                    if slot.completed {
                        debug!(file_name, "Removing completed download slot");
                    }
                    !slot.completed
                });
            }

            tokio::select! {
                _ = token.cancelled() => break,
                _ = cleanup.notified() => {}
            }
        }
        debug!("Download reaper stopped");
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbound::test_support::RecordingOutbound;
    use sg_gateway_repository::sqlite;
    use sg_gateway_utils::hash::sha256_raw;
    use std::time::Duration;

    const GATEWAY_KEY: &str = "gateway_key";

    struct Fixture {
        service: FileDownloadService,
        outbound: Arc<RecordingOutbound>,
        repository: FileRepository,
        _dir: tempfile::TempDir,
    }

    async fn fixture() -> Fixture {
        let db = sqlite::init_db(sqlite::memory_url()).await.unwrap();
        let repository = FileRepository::new(db);
        let outbound = Arc::new(RecordingOutbound::default());
        let dir = tempfile::tempdir().unwrap();

        let service = FileDownloadService::new(
            GATEWAY_KEY,
            DownloadProtocol,
            1024 * 1024,
            1024,
            dir.path(),
            Arc::clone(&outbound) as Arc<dyn OutboundMessageHandler>,
            repository.clone(),
        );

        Fixture {
            service,
            outbound,
            repository,
            _dir: dir,
        }
    }

    async fn drain() {
        tokio::time::sleep(Duration::from_millis(30)).await;
    }

    fn initiate_message(name: &str, size: u64, hash: &str) -> Message {
        Message::new(
            format!("p2d/file_upload_initiate/g/{GATEWAY_KEY}"),
            format!(r#"{{"fileName":"{name}","fileSize":{size},"fileHash":"{hash}"}}"#)
                .into_bytes(),
        )
    }

    fn binary_message(data: &[u8], previous_hash: [u8; 32]) -> Message {
        let packet = BinaryData {
            previous_hash,
            data: data.to_vec(),
            hash: sha256_raw(data),
        };
        Message::new(
            format!("p2d/file_binary_response/g/{GATEWAY_KEY}"),
            packet.to_bytes(),
        )
    }

    fn statuses(outbound: &RecordingOutbound) -> Vec<FileUploadStatus> {
        outbound
            .messages()
            .iter()
            .filter(|m| m.channel().starts_with("d2p/file_upload_status"))
            .map(|m| serde_json::from_slice(m.payload()).unwrap())
            .collect()
    }

    fn base64_of(data: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(sha256_raw(data))
    }

    #[tokio::test]
    async fn two_packet_upload_happy_path() {
        let fixture = fixture().await;
        let contents = [b'f'; 2048];
        let hash = base64_of(&contents);

        fixture
            .service
            .platform_message_received(initiate_message("file.bin", 2048, &hash))
            .await;
        drain().await;

        // FILE_TRANSFER went out, together with the first packet request.
        let sent = statuses(&fixture.outbound);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].status, FileTransferStatus::FileTransfer);
        assert!(fixture
            .outbound
            .messages()
            .iter()
            .any(|m| m.channel().starts_with("d2p/file_binary_request")));

        let first_hash = sha256_raw(&contents[..1024]);
        fixture
            .service
            .platform_message_received(binary_message(&contents[..1024], [0u8; 32]))
            .await;
        fixture
            .service
            .platform_message_received(binary_message(&contents[1024..], first_hash))
            .await;
        drain().await;

        let sent = statuses(&fixture.outbound);
        assert_eq!(sent.last().unwrap().status, FileTransferStatus::FileReady);

        let info = fixture
            .repository
            .get_file_info("file.bin")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(info.hash, hash);
        assert_eq!(std::fs::read(&info.path).unwrap(), contents);

        // The reaper collects the completed slot.
        drain().await;
        assert_eq!(fixture.service.active_download_count(), 0);
    }

    #[tokio::test]
    async fn hash_mismatch_on_stored_file_short_circuits() {
        let fixture = fixture().await;
        fixture
            .repository
            .store(&FileInfo {
                name: "file.bin".to_string(),
                hash: "aGFzaDE=".to_string(),
                path: "unused".to_string(),
            })
            .await
            .unwrap();

        fixture
            .service
            .platform_message_received(initiate_message("file.bin", 2048, "aGFzaDI="))
            .await;
        drain().await;

        let sent = statuses(&fixture.outbound);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].error, Some(FileTransferError::FileHashMismatch));
        assert_eq!(fixture.service.active_download_count(), 0);
    }

    #[tokio::test]
    async fn stored_file_with_matching_hash_is_already_ready() {
        let fixture = fixture().await;
        fixture
            .repository
            .store(&FileInfo {
                name: "file.bin".to_string(),
                hash: "aGFzaA==".to_string(),
                path: "unused".to_string(),
            })
            .await
            .unwrap();

        fixture
            .service
            .platform_message_received(initiate_message("file.bin", 2048, "aGFzaA=="))
            .await;
        drain().await;

        let sent = statuses(&fixture.outbound);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].status, FileTransferStatus::FileReady);
    }

    #[tokio::test]
    async fn invalid_initiate_fields_report_unspecified_error() {
        let fixture = fixture().await;

        fixture
            .service
            .platform_message_received(initiate_message("", 2048, "aGFzaA=="))
            .await;
        fixture
            .service
            .platform_message_received(initiate_message("file.bin", 0, "aGFzaA=="))
            .await;
        fixture
            .service
            .platform_message_received(initiate_message("file.bin", 2048, ""))
            .await;
        drain().await;

        let sent = statuses(&fixture.outbound);
        assert_eq!(sent.len(), 3);
        assert!(sent
            .iter()
            .all(|s| s.error == Some(FileTransferError::UnspecifiedError)));
    }

    #[tokio::test]
    async fn oversized_file_is_refused() {
        let fixture = fixture().await;

        fixture
            .service
            .platform_message_received(initiate_message("big.bin", 10 * 1024 * 1024, "aGFzaA=="))
            .await;
        drain().await;

        let sent = statuses(&fixture.outbound);
        assert_eq!(sent[0].error, Some(FileTransferError::UnsupportedFileSize));
    }

    #[tokio::test]
    async fn repeated_initiate_with_same_hash_reports_transfer_in_progress() {
        let fixture = fixture().await;
        let contents = [b'r'; 512];
        let hash = base64_of(&contents);

        fixture
            .service
            .platform_message_received(initiate_message("file.bin", 512, &hash))
            .await;
        fixture
            .service
            .platform_message_received(initiate_message("file.bin", 512, &hash))
            .await;
        drain().await;

        let sent = statuses(&fixture.outbound);
        assert_eq!(sent.len(), 2);
        assert!(sent
            .iter()
            .all(|s| s.status == FileTransferStatus::FileTransfer));
        assert_eq!(fixture.service.active_download_count(), 1);
    }

    #[tokio::test]
    async fn repeated_initiate_with_different_hash_is_an_error() {
        let fixture = fixture().await;
        let contents = [b'r'; 512];
        let hash = base64_of(&contents);

        fixture
            .service
            .platform_message_received(initiate_message("file.bin", 512, &hash))
            .await;
        fixture
            .service
            .platform_message_received(initiate_message("file.bin", 512, "b3RoZXI="))
            .await;
        drain().await;

        let sent = statuses(&fixture.outbound);
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].error, Some(FileTransferError::UnspecifiedError));
    }

    #[tokio::test]
    async fn abort_flags_the_slot_and_reports_aborted() {
        let fixture = fixture().await;
        let contents = [b'a'; 512];
        let hash = base64_of(&contents);

        fixture
            .service
            .platform_message_received(initiate_message("file.bin", 512, &hash))
            .await;
        drain().await;

        fixture
            .service
            .platform_message_received(Message::new(
                format!("p2d/file_upload_abort/g/{GATEWAY_KEY}"),
                br#"{"fileName":"file.bin"}"#.to_vec(),
            ))
            .await;
        drain().await;

        let sent = statuses(&fixture.outbound);
        assert_eq!(sent.last().unwrap().status, FileTransferStatus::Aborted);

        // Reaper dropped the slot; a late packet is ignored.
        assert_eq!(fixture.service.active_download_count(), 0);
        fixture
            .service
            .platform_message_received(binary_message(&contents, [0u8; 32]))
            .await;
        drain().await;
        assert_eq!(
            fixture
                .repository
                .get_file_info("file.bin")
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn delete_removes_file_and_publishes_updated_list() {
        let fixture = fixture().await;
        let path = fixture._dir.path().join("old.bin");
        std::fs::write(&path, b"stale").unwrap();
        fixture
            .repository
            .store(&FileInfo {
                name: "old.bin".to_string(),
                hash: "aA==".to_string(),
                path: path.to_string_lossy().into_owned(),
            })
            .await
            .unwrap();

        fixture
            .service
            .platform_message_received(Message::new(
                format!("p2d/file_delete/g/{GATEWAY_KEY}"),
                br#"{"fileName":"old.bin"}"#.to_vec(),
            ))
            .await;
        drain().await;

        assert!(!path.exists());
        assert!(fixture
            .repository
            .get_file_info("old.bin")
            .await
            .unwrap()
            .is_none());

        let update = fixture
            .outbound
            .messages()
            .into_iter()
            .find(|m| m.channel().starts_with("d2p/file_list_update"))
            .unwrap();
        assert_eq!(update.payload_str(), "[]");
    }

    #[tokio::test]
    async fn purge_clears_every_stored_file() {
        let fixture = fixture().await;
        for name in ["a.bin", "b.bin"] {
            let path = fixture._dir.path().join(name);
            std::fs::write(&path, b"data").unwrap();
            fixture
                .repository
                .store(&FileInfo {
                    name: name.to_string(),
                    hash: "aA==".to_string(),
                    path: path.to_string_lossy().into_owned(),
                })
                .await
                .unwrap();
        }

        fixture
            .service
            .platform_message_received(Message::new(
                format!("p2d/file_purge/g/{GATEWAY_KEY}"),
                Vec::new(),
            ))
            .await;
        drain().await;

        assert!(fixture
            .repository
            .get_all_file_names()
            .await
            .unwrap()
            .is_empty());

        let update = fixture
            .outbound
            .messages()
            .into_iter()
            .find(|m| m.channel().starts_with("d2p/file_list_update"))
            .unwrap();
        assert_eq!(update.payload_str(), "[]");
    }

    #[tokio::test]
    async fn list_request_gets_a_response() {
        let fixture = fixture().await;
        fixture
            .repository
            .store(&FileInfo {
                name: "kept.bin".to_string(),
                hash: "aA==".to_string(),
                path: "unused".to_string(),
            })
            .await
            .unwrap();

        fixture
            .service
            .platform_message_received(Message::new(
                format!("p2d/file_list_request/g/{GATEWAY_KEY}"),
                Vec::new(),
            ))
            .await;
        drain().await;

        let response = fixture
            .outbound
            .messages()
            .into_iter()
            .find(|m| m.channel().starts_with("d2p/file_list_response"))
            .unwrap();
        assert_eq!(response.payload_str(), r#"[{"fileName":"kept.bin"}]"#);
    }
}
