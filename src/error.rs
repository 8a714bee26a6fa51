use crate::{
    ident::{ElementId, EndpointId},
    time::Time,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A parameter was rejected before the element was built.
    #[error("invalid configuration for {element}: {reason}")]
    Configuration { element: String, reason: String },

    /// A second time-triggered frame arrived while one was still pending.
    #[error("time-triggered schedule violated at element {element}, t={at}")]
    ScheduleViolation { element: ElementId, at: Time },

    /// An element asked to be woken before the current instant.
    #[error("element {element} requested a wake-up at t={at}, already at t={now}")]
    MissedWakeup {
        element: ElementId,
        at: Time,
        now: Time,
    },

    #[error("no port or route for endpoint {endpoint}")]
    UnresolvedRouting { endpoint: EndpointId },

    #[error("frame from endpoint {endpoint} carries no virtual link")]
    UnknownVirtualLink { endpoint: EndpointId },

    #[error("unknown element {0}")]
    UnknownElement(ElementId),

    #[error("serde error")]
    Serde(#[from] serde_json::Error),

    #[error("IO error")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn config(element: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            element: element.into(),
            reason: reason.into(),
        }
    }
}
