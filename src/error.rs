//! Failure modes of the bridge.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// The course list could not be fetched. Any previously installed cache
    /// snapshot stays in place.
    #[error("failed to fetch the course list from Ed")]
    UpstreamUnavailable(#[source] anyhow::Error),

    /// An event referenced a course that is missing from the current cache
    /// snapshot. Expected staleness, the event is dropped.
    #[error("course {0} is not in the current course snapshot")]
    CourseLookupMiss(u64),

    /// An outbound webhook call failed. Logged by the dispatcher, never
    /// retried.
    #[error("webhook delivery for course {course_id} failed")]
    DeliveryFailure {
        course_id: u64,
        #[source]
        source: reqwest::Error,
    },

    /// The realtime subscription could not be established. Fatal, the
    /// process cannot do its job without it.
    #[error("failed to establish the Ed realtime subscription")]
    SubscriptionFailure(#[source] anyhow::Error),
}
