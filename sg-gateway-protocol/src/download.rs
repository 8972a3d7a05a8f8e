//! File download codec. All traffic is gateway-scoped: the platform pushes
//! files to the gateway, which forwards chunks requests and status reports.

use crate::{channel, GatewayProtocol};
use sg_gateway_models::domain::{
    BinaryData, FileDelete, FileListConfirm, FileListEntry, FilePacketRequest, FileUploadAbort,
    FileUploadInitiate, FileUploadStatus, Message,
};
use tracing::warn;

const UPLOAD_INITIATE_ROOT: &str = "file_upload_initiate";
const UPLOAD_ABORT_ROOT: &str = "file_upload_abort";
const UPLOAD_STATUS_ROOT: &str = "file_upload_status";
const BINARY_REQUEST_ROOT: &str = "file_binary_request";
const BINARY_RESPONSE_ROOT: &str = "file_binary_response";
const DELETE_ROOT: &str = "file_delete";
const PURGE_ROOT: &str = "file_purge";
const LIST_REQUEST_ROOT: &str = "file_list_request";
const LIST_RESPONSE_ROOT: &str = "file_list_response";
const LIST_CONFIRM_ROOT: &str = "file_list_confirm";
const LIST_UPDATE_ROOT: &str = "file_list_update";

const PLATFORM_ROOTS: [&str; 7] = [
    UPLOAD_INITIATE_ROOT,
    UPLOAD_ABORT_ROOT,
    BINARY_RESPONSE_ROOT,
    DELETE_ROOT,
    PURGE_ROOT,
    LIST_REQUEST_ROOT,
    LIST_CONFIRM_ROOT,
];

#[derive(Debug, Default, Clone, Copy)]
pub struct DownloadProtocol;

impl GatewayProtocol for DownloadProtocol {
    fn name(&self) -> &'static str {
        "FileDownloadProtocol"
    }

    fn inbound_platform_channels(&self) -> Vec<String> {
        PLATFORM_ROOTS
            .iter()
            .map(|root| {
                channel::gateway_channel(
                    channel::PLATFORM_TO_DEVICE,
                    root,
                    channel::SINGLE_LEVEL_WILDCARD,
                )
            })
            .collect()
    }

    fn inbound_platform_channels_for_gateway_key(&self, gateway_key: &str) -> Vec<String> {
        PLATFORM_ROOTS
            .iter()
            .map(|root| channel::gateway_channel(channel::PLATFORM_TO_DEVICE, root, gateway_key))
            .collect()
    }

    fn inbound_platform_channels_for_keys(
        &self,
        gateway_key: &str,
        _device_key: &str,
    ) -> Vec<String> {
        self.inbound_platform_channels_for_gateway_key(gateway_key)
    }

    fn inbound_device_channels(&self) -> Vec<String> {
        Vec::new()
    }

    fn inbound_device_channels_for_device_key(&self, _device_key: &str) -> Vec<String> {
        Vec::new()
    }
}

impl DownloadProtocol {
    pub fn is_file_purge(&self, message: &Message) -> bool {
        channel::root(message.channel()) == Some(PURGE_ROOT)
    }

    pub fn is_file_list_request(&self, message: &Message) -> bool {
        channel::root(message.channel()) == Some(LIST_REQUEST_ROOT)
    }

    pub fn make_binary_data(&self, message: &Message) -> Option<BinaryData> {
        if channel::root(message.channel()) != Some(BINARY_RESPONSE_ROOT) {
            return None;
        }

        BinaryData::from_bytes(message.payload())
    }

    pub fn make_file_upload_initiate(&self, message: &Message) -> Option<FileUploadInitiate> {
        self.parse_json(message, UPLOAD_INITIATE_ROOT)
    }

    pub fn make_file_upload_abort(&self, message: &Message) -> Option<FileUploadAbort> {
        self.parse_json(message, UPLOAD_ABORT_ROOT)
    }

    pub fn make_file_delete(&self, message: &Message) -> Option<FileDelete> {
        self.parse_json(message, DELETE_ROOT)
    }

    pub fn make_file_list_confirm(&self, message: &Message) -> Option<FileListConfirm> {
        self.parse_json(message, LIST_CONFIRM_ROOT)
    }

    fn parse_json<T: serde::de::DeserializeOwned>(
        &self,
        message: &Message,
        root: &str,
    ) -> Option<T> {
        if channel::root(message.channel()) != Some(root) {
            return None;
        }

        serde_json::from_slice(message.payload())
            .map_err(|e| {
                warn!(channel = message.channel(), error = %e, "Malformed file transfer payload")
            })
            .ok()
    }

    pub fn make_upload_status_message(
        &self,
        gateway_key: &str,
        status: &FileUploadStatus,
    ) -> Option<Message> {
        let payload = serde_json::to_vec(status).ok()?;
        Some(Message::new(
            channel::gateway_channel(channel::DEVICE_TO_PLATFORM, UPLOAD_STATUS_ROOT, gateway_key),
            payload,
        ))
    }

    pub fn make_packet_request_message(
        &self,
        gateway_key: &str,
        request: &FilePacketRequest,
    ) -> Option<Message> {
        let payload = serde_json::to_vec(request).ok()?;
        Some(Message::new(
            channel::gateway_channel(channel::DEVICE_TO_PLATFORM, BINARY_REQUEST_ROOT, gateway_key),
            payload,
        ))
    }

    pub fn make_file_list_response_message(
        &self,
        gateway_key: &str,
        list: &[FileListEntry],
    ) -> Option<Message> {
        let payload = serde_json::to_vec(list).ok()?;
        Some(Message::new(
            channel::gateway_channel(channel::DEVICE_TO_PLATFORM, LIST_RESPONSE_ROOT, gateway_key),
            payload,
        ))
    }

    pub fn make_file_list_update_message(
        &self,
        gateway_key: &str,
        list: &[FileListEntry],
    ) -> Option<Message> {
        let payload = serde_json::to_vec(list).ok()?;
        Some(Message::new(
            channel::gateway_channel(channel::DEVICE_TO_PLATFORM, LIST_UPDATE_ROOT, gateway_key),
            payload,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sg_gateway_models::domain::{file_list, FileTransferStatus};
    use sg_gateway_utils::hash::sha256_raw;

    #[test]
    fn platform_subscriptions_cover_all_inbound_roots() {
        let protocol = DownloadProtocol;
        let channels = protocol.inbound_platform_channels_for_gateway_key("GW");

        for root in PLATFORM_ROOTS {
            assert!(channels.contains(&format!("p2d/{root}/g/GW")), "{root}");
        }
        assert!(protocol.inbound_device_channels().is_empty());
    }

    #[test]
    fn upload_initiate_parses() {
        let protocol = DownloadProtocol;
        let message = Message::new(
            "p2d/file_upload_initiate/g/GW",
            br#"{"fileName":"file.bin","fileSize":2048,"fileHash":"aGFzaA=="}"#.to_vec(),
        );

        let initiate = protocol.make_file_upload_initiate(&message).unwrap();
        assert_eq!(initiate.file_name, "file.bin");
        assert_eq!(initiate.file_size, 2048);
    }

    #[test]
    fn binary_data_parses_only_on_binary_channel() {
        let protocol = DownloadProtocol;
        let mut payload = [0u8; 32].to_vec();
        payload.extend_from_slice(b"data");
        payload.extend_from_slice(&sha256_raw(b"data"));

        let message = Message::new("p2d/file_binary_response/g/GW", payload.clone());
        assert!(protocol.make_binary_data(&message).unwrap().valid());

        let wrong = Message::new("p2d/file_upload_initiate/g/GW", payload);
        assert!(protocol.make_binary_data(&wrong).is_none());
    }

    #[test]
    fn status_and_packet_request_channels() {
        let protocol = DownloadProtocol;

        let status = FileUploadStatus::ok("file.bin", FileTransferStatus::FileTransfer);
        let message = protocol.make_upload_status_message("GW", &status).unwrap();
        assert_eq!(message.channel(), "d2p/file_upload_status/g/GW");

        let request = FilePacketRequest {
            file_name: "file.bin".to_string(),
            chunk_index: 0,
            chunk_size: 1024,
        };
        let message = protocol.make_packet_request_message("GW", &request).unwrap();
        assert_eq!(message.channel(), "d2p/file_binary_request/g/GW");
    }

    #[test]
    fn file_list_payload_shape() {
        let protocol = DownloadProtocol;
        let list = file_list(vec!["a.bin".to_string(), "b.bin".to_string()]);

        let message = protocol.make_file_list_update_message("GW", &list).unwrap();
        assert_eq!(message.channel(), "d2p/file_list_update/g/GW");
        assert_eq!(
            message.payload_str(),
            r#"[{"fileName":"a.bin"},{"fileName":"b.bin"}]"#
        );
    }

    #[test]
    fn purge_and_list_request_classifiers() {
        let protocol = DownloadProtocol;
        assert!(protocol.is_file_purge(&Message::new("p2d/file_purge/g/GW", Vec::new())));
        assert!(
            protocol.is_file_list_request(&Message::new("p2d/file_list_request/g/GW", Vec::new()))
        );
        assert!(!protocol.is_file_purge(&Message::new("p2d/file_delete/g/GW", Vec::new())));
    }
}
