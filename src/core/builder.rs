use std::sync::Arc;

use crate::config::Config;
use crate::core::coordinator::Coordinator;
use crate::events::Bus;
use crate::registry::TaskRegistry;
use crate::scheduler::SchedulerPort;
use crate::subscribers::{Subscribe, SubscriberSet};

/// Builder for constructing a [`Coordinator`] with optional subscribers.
pub struct CoordinatorBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl CoordinatorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive lifecycle events through dedicated workers with
    /// bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds and returns the coordinator.
    ///
    /// Initializes the event bus, the subscriber workers and the internal
    /// bus-to-subscribers listener; must be called from within a Tokio
    /// runtime.
    pub fn build(
        self,
        registry: Arc<TaskRegistry>,
        scheduler: Arc<dyn SchedulerPort>,
    ) -> Arc<Coordinator> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers));

        let coord = Arc::new(Coordinator::new_internal(
            self.cfg, registry, scheduler, bus, subs,
        ));
        coord.spawn_subscriber_listener();
        coord
    }
}
