pub mod channel;
pub mod data;
pub mod download;
pub mod firmware;
pub mod registration;
pub mod status;
pub mod topic;

pub use data::DataProtocol;
pub use download::DownloadProtocol;
pub use firmware::FirmwareUpdateProtocol;
pub use registration::RegistrationProtocol;
pub use status::StatusProtocol;

/// Capabilities common to every protocol family: a stable name, the channel
/// sets a side must subscribe to, and device-key extraction from a channel.
pub trait GatewayProtocol: Send + Sync {
    fn name(&self) -> &'static str;

    /// Wildcard channels this codec consumes on the platform side.
    fn inbound_platform_channels(&self) -> Vec<String>;

    /// Platform-side channels narrowed to one gateway.
    fn inbound_platform_channels_for_gateway_key(&self, gateway_key: &str) -> Vec<String>;

    /// Platform-side channels narrowed to one gateway/device pair.
    fn inbound_platform_channels_for_keys(
        &self,
        gateway_key: &str,
        device_key: &str,
    ) -> Vec<String>;

    /// Wildcard channels this codec consumes on the local device side.
    fn inbound_device_channels(&self) -> Vec<String>;

    /// Device-side channels narrowed to one device.
    fn inbound_device_channels_for_device_key(&self, device_key: &str) -> Vec<String>;

    /// Device key referenced by a channel, if any.
    fn extract_device_key(&self, channel: &str) -> Option<String> {
        channel::device_key(channel).map(str::to_string)
    }
}
