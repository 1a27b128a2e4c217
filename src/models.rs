use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::ed::de;

/// A course the authenticated user is enrolled in, as returned by the Ed
/// API. Snapshot data, never mutated after deserialization.
#[derive(Clone, Debug, Deserialize)]
pub struct Course {
    pub id: u64,
    pub code: String,
    pub name: String,
}

/// A discussion thread as carried by a `thread.new` stream event.
#[derive(Clone, Debug, Deserialize)]
pub struct Thread {
    #[serde(deserialize_with = "de::flexible_id")]
    pub id: u64,
    pub number: u32,
    pub title: String,
    pub document: String,
    #[serde(deserialize_with = "de::flexible_id")]
    pub course_id: u64,
    pub category: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub is_anonymous: bool,
    pub created_at: DateTime<Utc>,
}

/// Message passed from the transport to the bridge over the event channel.
#[derive(Debug)]
pub enum Event {
    ThreadNew(Thread),
    Shutdown,
}
