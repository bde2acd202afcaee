//! Room connection builder

use cheer_core::{Clock, SystemClock, TopicKind};
use cheer_transport::EventLog;
use std::sync::Arc;
use std::time::Duration;

use crate::connection::{ConnectionConfig, RoomConnection};

/// How long presence registration may take before the connect times out
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Builder for [`RoomConnection`]
pub struct RoomConnectionBuilder {
    log: Arc<dyn EventLog>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
    topics: Vec<TopicKind>,
}

impl RoomConnectionBuilder {
    /// Create a new builder over `log`
    pub fn new(log: Arc<dyn EventLog>) -> Self {
        Self {
            log,
            clock: Arc::new(SystemClock),
            timeout: DEFAULT_CONNECT_TIMEOUT,
            topics: TopicKind::ALL.to_vec(),
        }
    }

    /// Clock used for the backlog cutoff and `createdAt`
    pub fn clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Set the registration timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Topics to stream once connected (all of them by default)
    pub fn topics(mut self, topics: &[TopicKind]) -> Self {
        self.topics = topics.to_vec();
        self
    }

    /// Build an idle connection
    pub fn build(self) -> RoomConnection {
        RoomConnection::from_config(ConnectionConfig {
            log: self.log,
            clock: self.clock,
            timeout: self.timeout,
            topics: self.topics,
        })
    }
}
