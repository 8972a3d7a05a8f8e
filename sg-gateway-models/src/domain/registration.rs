use super::DeviceManifest;
use serde::{Deserialize, Serialize};

/// Subdevice (or gateway) registration request as carried on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRegistrationRequest {
    pub device_name: String,
    pub device_key: String,
    pub manifest: DeviceManifest,
}

impl DeviceRegistrationRequest {
    pub fn new(
        device_name: impl Into<String>,
        device_key: impl Into<String>,
        manifest: DeviceManifest,
    ) -> Self {
        Self {
            device_name: device_name.into(),
            device_key: device_key.into(),
            manifest,
        }
    }
}

/// Result code of a platform registration response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistrationResult {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "ERROR_GATEWAY_NOT_FOUND")]
    ErrorGatewayNotFound,
    #[serde(rename = "ERROR_KEY_CONFLICT")]
    ErrorKeyConflict,
    #[serde(rename = "ERROR_MANIFEST_CONFLICT")]
    ErrorManifestConflict,
    #[serde(rename = "ERROR_MAXIMUM_NUMBER_OF_DEVICES_EXCEEDED")]
    ErrorMaximumNumberOfDevicesExceeded,
    #[serde(rename = "ERROR_READING_PAYLOAD")]
    ErrorReadingPayload,
    #[serde(other, rename = "ERROR_UNKNOWN")]
    ErrorUnknown,
}

impl RegistrationResult {
    #[inline]
    pub fn is_success(self) -> bool {
        matches!(self, RegistrationResult::Ok)
    }
}

/// Platform response to a registration request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRegistrationResponse {
    pub result: RegistrationResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Gateway acknowledgment of a platform reregistration request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceReregistrationResponse {
    pub result: RegistrationResult,
}
