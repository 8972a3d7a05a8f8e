use std::borrow::Cow;

/// One MQTT message as seen by handlers and codecs: the channel it arrived on
/// (or is bound for) and the raw payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    channel: String,
    payload: Vec<u8>,
}

impl Message {
    pub fn new(channel: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            channel: channel.into(),
            payload: payload.into(),
        }
    }

    #[inline]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Payload as text, with invalid UTF-8 replaced. Binary payloads should be
    /// read through `payload()` instead.
    #[inline]
    pub fn payload_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}
