//! Buffered publisher, one per broker side.
//!
//! `add_message` never blocks: messages land in a FIFO queue and a worker
//! drains it whenever the connection is up. While disconnected everything is
//! buffered, and the backlog flushes in order on reconnect.

use crate::outbound::OutboundMessageHandler;
use async_trait::async_trait;
use sg_gateway_error::SGResult;
use sg_gateway_models::domain::Message;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// The transport seam: something that can push one message to a broker.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    async fn publish(&self, message: &Message) -> SGResult<()>;
}

pub struct PublishingService {
    inner: Arc<Inner>,
}

struct Inner {
    transport: Arc<dyn MessagePublisher>,
    queue: Mutex<VecDeque<Message>>,
    connected: AtomicBool,
    wake: Notify,
    token: CancellationToken,
}

impl PublishingService {
    pub fn new(transport: Arc<dyn MessagePublisher>) -> Self {
        let inner = Arc::new(Inner {
            transport,
            queue: Mutex::new(VecDeque::new()),
            connected: AtomicBool::new(false),
            wake: Notify::new(),
            token: CancellationToken::new(),
        });

        let worker = Arc::clone(&inner);
        tokio::spawn(async move {
            loop {
                if worker.token.is_cancelled() {
                    break;
                }

                let next = if worker.connected.load(Ordering::Acquire) {
                    worker.queue.lock().unwrap().pop_front()
                } else {
                    None
                };

                match next {
                    Some(message) => {
                        if let Err(e) = worker.transport.publish(&message).await {
                            warn!(channel = message.channel(), error = %e, "Publish failed, requeueing");
                            worker.queue.lock().unwrap().push_front(message);
                            worker.connected.store(false, Ordering::Release);
                        }
                    }
                    None => {
                        tokio::select! {
                            _ = worker.token.cancelled() => break,
                            _ = worker.wake.notified() => {}
                        }
                    }
                }
            }
            debug!("Publisher worker stopped");
        });

        Self { inner }
    }

    pub fn connected(&self) {
        self.inner.connected.store(true, Ordering::Release);
        self.inner.wake.notify_one();
    }

    pub fn disconnected(&self) {
        self.inner.connected.store(false, Ordering::Release);
    }

    pub fn stop(&self) {
        self.inner.token.cancel();
    }
}

impl OutboundMessageHandler for PublishingService {
    fn add_message(&self, message: Message) {
        self.inner.queue.lock().unwrap().push_back(message);
        self.inner.wake.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeTransport {
        published: Mutex<Vec<Message>>,
        fail: AtomicBool,
    }

    #[async_trait]
    impl MessagePublisher for FakeTransport {
        async fn publish(&self, message: &Message) -> SGResult<()> {
            if self.fail.load(Ordering::Acquire) {
                return Err("broker gone".into());
            }
            self.published.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    async fn drain() {
        tokio::time::sleep(Duration::from_millis(30)).await;
    }

    #[tokio::test]
    async fn messages_buffer_until_connected_then_flush_in_order() {
        let transport = Arc::new(FakeTransport::default());
        let publisher = PublishingService::new(Arc::clone(&transport) as Arc<dyn MessagePublisher>);

        for i in 0..5u8 {
            publisher.add_message(Message::new(format!("d2p/ping/g/{i}"), Vec::new()));
        }
        drain().await;
        assert!(transport.published.lock().unwrap().is_empty());

        publisher.connected();
        drain().await;

        let published = transport.published.lock().unwrap();
        let channels: Vec<&str> = published.iter().map(|m| m.channel()).collect();
        assert_eq!(
            channels,
            vec!["d2p/ping/g/0", "d2p/ping/g/1", "d2p/ping/g/2", "d2p/ping/g/3", "d2p/ping/g/4"]
        );
    }

    #[tokio::test]
    async fn failed_publish_is_retried_after_reconnect() {
        let transport = Arc::new(FakeTransport::default());
        let publisher = PublishingService::new(Arc::clone(&transport) as Arc<dyn MessagePublisher>);

        transport.fail.store(true, Ordering::Release);
        publisher.connected();
        publisher.add_message(Message::new("d2p/ping/g/GW", Vec::new()));
        drain().await;
        assert!(transport.published.lock().unwrap().is_empty());

        transport.fail.store(false, Ordering::Release);
        publisher.connected();
        drain().await;

        assert_eq!(transport.published.lock().unwrap().len(), 1);
    }
}
