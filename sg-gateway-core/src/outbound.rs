use sg_gateway_models::domain::Message;

/// Non-blocking sink for outbound messages. Implementations enqueue and
/// return immediately; delivery happens on the implementation's own worker.
pub trait OutboundMessageHandler: Send + Sync {
    fn add_message(&self, message: Message);
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::Mutex;

    /// Records every message it is handed; the outbound stand-in for service
    /// tests.
    #[derive(Default)]
    pub struct RecordingOutbound {
        messages: Mutex<Vec<Message>>,
    }

    impl RecordingOutbound {
        pub fn messages(&self) -> Vec<Message> {
            self.messages.lock().unwrap().clone()
        }

        pub fn take(&self) -> Vec<Message> {
            std::mem::take(&mut self.messages.lock().unwrap())
        }
    }

    impl OutboundMessageHandler for RecordingOutbound {
        fn add_message(&self, message: Message) {
            self.messages.lock().unwrap().push(message);
        }
    }
}
