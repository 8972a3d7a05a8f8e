//! Inbound message handlers, one per broker side.
//!
//! A handler keeps an ordered registry of `(channel pattern, listener)` pairs.
//! For every received message the first listener whose pattern matches wins;
//! delivery goes through the handler's command buffer so listeners see
//! messages in arrival order. Listeners are held weakly: a dropped service
//! needs no explicit deregistration, its queued deliveries simply evaporate.

use crate::command::CommandBuffer;
use async_trait::async_trait;
use sg_gateway_models::domain::Message;
use sg_gateway_protocol::topic;
use std::sync::{Mutex, Weak};
use tracing::{info, trace};

#[async_trait]
pub trait PlatformMessageListener: Send + Sync {
    async fn platform_message_received(&self, message: Message);
}

#[async_trait]
pub trait DeviceMessageListener: Send + Sync {
    async fn device_message_received(&self, message: Message);
}

pub struct InboundPlatformMessageHandler {
    command_buffer: CommandBuffer,
    channel_handlers: Mutex<Vec<(String, Weak<dyn PlatformMessageListener>)>>,
}

impl InboundPlatformMessageHandler {
    pub fn new() -> Self {
        Self {
            command_buffer: CommandBuffer::new(),
            channel_handlers: Mutex::new(Vec::new()),
        }
    }

    /// Register a listener for a set of channel patterns. Registration order
    /// is resolution order.
    pub fn add_listener(
        &self,
        channels: Vec<String>,
        listener: Weak<dyn PlatformMessageListener>,
    ) {
        let mut handlers = self.channel_handlers.lock().unwrap();
        for channel in channels {
            handlers.push((channel, listener.clone()));
        }
    }

    /// The channels this side must be subscribed to.
    pub fn channels(&self) -> Vec<String> {
        self.channel_handlers
            .lock()
            .unwrap()
            .iter()
            .map(|(channel, _)| channel.clone())
            .collect()
    }

    pub fn message_received(&self, channel: &str, payload: &[u8]) {
        trace!(channel, "Platform message received");

        let handlers = self.channel_handlers.lock().unwrap();
        let Some((_, listener)) = handlers
            .iter()
            .find(|(pattern, _)| topic::matches(pattern, channel))
        else {
            info!(channel, "Handler for platform channel not found");
            return;
        };

        let listener = listener.clone();
        let message = Message::new(channel, payload);
        self.command_buffer.push(async move {
            if let Some(listener) = listener.upgrade() {
                listener.platform_message_received(message).await;
            }
        });
    }

    pub fn stop(&self) {
        self.command_buffer.stop();
    }
}

impl Default for InboundPlatformMessageHandler {
    fn default() -> Self {
        Self::new()
    }
}

pub struct InboundDeviceMessageHandler {
    command_buffer: CommandBuffer,
    channel_handlers: Mutex<Vec<(String, Weak<dyn DeviceMessageListener>)>>,
}

impl InboundDeviceMessageHandler {
    pub fn new() -> Self {
        Self {
            command_buffer: CommandBuffer::new(),
            channel_handlers: Mutex::new(Vec::new()),
        }
    }

    pub fn add_listener(&self, channels: Vec<String>, listener: Weak<dyn DeviceMessageListener>) {
        let mut handlers = self.channel_handlers.lock().unwrap();
        for channel in channels {
            handlers.push((channel, listener.clone()));
        }
    }

    pub fn channels(&self) -> Vec<String> {
        self.channel_handlers
            .lock()
            .unwrap()
            .iter()
            .map(|(channel, _)| channel.clone())
            .collect()
    }

    pub fn message_received(&self, channel: &str, payload: &[u8]) {
        trace!(channel, "Device message received");

        let handlers = self.channel_handlers.lock().unwrap();
        let Some((_, listener)) = handlers
            .iter()
            .find(|(pattern, _)| topic::matches(pattern, channel))
        else {
            info!(channel, "Handler for device channel not found");
            return;
        };

        let listener = listener.clone();
        let message = Message::new(channel, payload);
        self.command_buffer.push(async move {
            if let Some(listener) = listener.upgrade() {
                listener.device_message_received(message).await;
            }
        });
    }

    pub fn stop(&self) {
        self.command_buffer.stop();
    }
}

impl Default for InboundDeviceMessageHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex as StdMutex};
    use std::time::Duration;

    struct Recorder {
        received: StdMutex<Vec<Message>>,
        tag: &'static str,
    }

    impl Recorder {
        fn new(tag: &'static str) -> Arc<Self> {
            Arc::new(Self {
                received: StdMutex::new(Vec::new()),
                tag,
            })
        }
    }

    #[async_trait]
    impl PlatformMessageListener for Recorder {
        async fn platform_message_received(&self, message: Message) {
            self.received.lock().unwrap().push(message);
        }
    }

    async fn drain() {
        // Give the command buffer worker a chance to run queued deliveries.
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn first_matching_listener_wins() {
        let handler = InboundPlatformMessageHandler::new();
        let first = Recorder::new("first");
        let second = Recorder::new("second");

        handler.add_listener(
            vec!["p2d/pong/g/+".to_string()],
            Arc::downgrade(&first) as Weak<dyn PlatformMessageListener>,
        );
        handler.add_listener(
            vec!["p2d/#".to_string()],
            Arc::downgrade(&second) as Weak<dyn PlatformMessageListener>,
        );

        handler.message_received("p2d/pong/g/GW", b"");
        drain().await;

        assert_eq!(first.received.lock().unwrap().len(), 1);
        assert!(second.received.lock().unwrap().is_empty());
        assert_eq!(first.tag, "first");
    }

    #[tokio::test]
    async fn unmatched_messages_are_dropped() {
        let handler = InboundPlatformMessageHandler::new();
        let listener = Recorder::new("only");

        handler.add_listener(
            vec!["p2d/pong/g/GW".to_string()],
            Arc::downgrade(&listener) as Weak<dyn PlatformMessageListener>,
        );

        handler.message_received("p2d/file_purge/g/GW", b"");
        drain().await;

        assert!(listener.received.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn dropped_listener_receives_nothing() {
        let handler = InboundPlatformMessageHandler::new();
        let listener = Recorder::new("gone");

        handler.add_listener(
            vec!["p2d/#".to_string()],
            Arc::downgrade(&listener) as Weak<dyn PlatformMessageListener>,
        );
        drop(listener);

        // Must not panic or deliver; the weak reference no longer upgrades.
        handler.message_received("p2d/pong/g/GW", b"");
        drain().await;
    }

    #[tokio::test]
    async fn subscription_list_reflects_registrations() {
        let handler = InboundPlatformMessageHandler::new();
        let listener = Recorder::new("subs");

        handler.add_listener(
            vec!["p2d/pong/g/GW".to_string(), "p2d/file_purge/g/GW".to_string()],
            Arc::downgrade(&listener) as Weak<dyn PlatformMessageListener>,
        );

        assert_eq!(
            handler.channels(),
            vec!["p2d/pong/g/GW", "p2d/file_purge/g/GW"]
        );
    }

    #[tokio::test]
    async fn delivery_preserves_arrival_order() {
        let handler = InboundPlatformMessageHandler::new();
        let listener = Recorder::new("ordered");

        handler.add_listener(
            vec!["p2d/#".to_string()],
            Arc::downgrade(&listener) as Weak<dyn PlatformMessageListener>,
        );

        for i in 0..10u8 {
            handler.message_received("p2d/pong/g/GW", &[i]);
        }
        drain().await;

        let received = listener.received.lock().unwrap();
        let payloads: Vec<u8> = received.iter().map(|m| m.payload()[0]).collect();
        assert_eq!(payloads, (0..10).collect::<Vec<_>>());
    }
}
