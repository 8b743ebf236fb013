//! Define the events that can be retrieved by the relayer.

use ibc_eureka_commitment::Height;
use ibc_eureka_router::RouterEvent;
use serde::{Deserialize, Serialize};

/// A router event and the height of the block that emitted it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EurekaEventWithHeight {
    /// The event
    pub event: RouterEvent,
    /// Height of the emitting block
    pub height: Height,
}

impl EurekaEventWithHeight {
    /// Tags every event with `height`
    #[must_use]
    pub fn at_height(events: Vec<RouterEvent>, height: Height) -> Vec<Self> {
        events
            .into_iter()
            .map(|event| Self { event, height })
            .collect()
    }
}
