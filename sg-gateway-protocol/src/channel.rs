//! Channel grammar shared by the whole JSON protocol family.
//!
//! Layout: `<direction>/<topic-root>/<scope>` where direction is `d2p`
//! (device to platform) or `p2d` (platform to device) and scope is either
//! `g/<gatewayKey>` optionally followed by `/d/<deviceKey>`, or `d/<deviceKey>`
//! alone for messages on the local broker.

pub const DEVICE_TO_PLATFORM: &str = "d2p";
pub const PLATFORM_TO_DEVICE: &str = "p2d";

pub const DELIMITER: &str = "/";
pub const SINGLE_LEVEL_WILDCARD: &str = "+";
pub const MULTI_LEVEL_WILDCARD: &str = "#";

pub const GATEWAY_PATH_PREFIX: &str = "g";
pub const DEVICE_PATH_PREFIX: &str = "d";

/// `<direction>/<root>/g/<gatewayKey>`
pub fn gateway_channel(direction: &str, root: &str, gateway_key: &str) -> String {
    format!("{direction}/{root}/{GATEWAY_PATH_PREFIX}/{gateway_key}")
}

/// `<direction>/<root>/g/<gatewayKey>/d/<deviceKey>`
pub fn gateway_device_channel(
    direction: &str,
    root: &str,
    gateway_key: &str,
    device_key: &str,
) -> String {
    format!(
        "{direction}/{root}/{GATEWAY_PATH_PREFIX}/{gateway_key}/{DEVICE_PATH_PREFIX}/{device_key}"
    )
}

/// `<direction>/<root>/d/<deviceKey>`
pub fn device_channel(direction: &str, root: &str, device_key: &str) -> String {
    format!("{direction}/{root}/{DEVICE_PATH_PREFIX}/{device_key}")
}

/// Topic root of a channel (the level after the direction).
pub fn root(channel: &str) -> Option<&str> {
    channel.split(DELIMITER).nth(1)
}

/// Device key referenced by a channel.
///
/// The device-scope prefix wins over the gateway scope, so a
/// gateway+device-scoped channel yields the device key and a purely
/// gateway-scoped channel yields the gateway key.
pub fn device_key(channel: &str) -> Option<&str> {
    let mut levels = channel.split(DELIMITER).peekable();
    let mut gateway_scoped = None;

    while let Some(level) = levels.next() {
        if level == DEVICE_PATH_PREFIX {
            if let Some(&key) = levels.peek() {
                return Some(key);
            }
        } else if level == GATEWAY_PATH_PREFIX {
            if let Some(&key) = levels.peek() {
                gateway_scoped = Some(key);
            }
        }
    }

    gateway_scoped
}

/// Rewrite a device-originated local channel (`d2p/<root>/d/<key>`) into its
/// platform-bound form (`d2p/<root>/g/<gatewayKey>/d/<key>`). Returns `None`
/// for channels that are not in the local device form.
pub fn route_device_to_platform(channel: &str, gateway_key: &str) -> Option<String> {
    let local_prefix = format!("{DEVICE_TO_PLATFORM}/");
    let rest = channel.strip_prefix(&local_prefix)?;

    let (root, scope) = rest.split_once(DELIMITER)?;
    let device_key = scope.strip_prefix(&format!("{DEVICE_PATH_PREFIX}/"))?;
    if device_key.is_empty() || device_key.contains(DELIMITER) {
        return None;
    }

    Some(gateway_device_channel(
        DEVICE_TO_PLATFORM,
        root,
        gateway_key,
        device_key,
    ))
}

/// Rewrite a platform channel scoped to this gateway
/// (`p2d/<root>/g/<gatewayKey>/d/<key>`) into its local form
/// (`p2d/<root>/d/<key>`). Returns `None` when the channel is not scoped to
/// the given gateway.
pub fn route_platform_to_device(channel: &str, gateway_key: &str) -> Option<String> {
    let platform_prefix = format!("{PLATFORM_TO_DEVICE}/");
    let rest = channel.strip_prefix(&platform_prefix)?;

    let (root, scope) = rest.split_once(DELIMITER)?;
    let device_scope =
        scope.strip_prefix(&format!("{GATEWAY_PATH_PREFIX}/{gateway_key}/"))?;
    let device_key = device_scope.strip_prefix(&format!("{DEVICE_PATH_PREFIX}/"))?;
    if device_key.is_empty() || device_key.contains(DELIMITER) {
        return None;
    }

    Some(device_channel(PLATFORM_TO_DEVICE, root, device_key))
}
