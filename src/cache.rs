//! Course metadata cache with snapshot-replace refresh.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use parking_lot::RwLock;

use crate::error::BridgeError;
use crate::models::Course;

/// Upstream source of the user's course list.
#[async_trait]
pub trait CourseSource: Send + Sync {
    async fn get_courses(&self) -> Result<Vec<Course>>;
}

/// Cache of the user's courses, keyed by course id.
///
/// The whole mapping is replaced on every successful refresh, so readers
/// always see a complete snapshot from a single refresh cycle. Lookups only
/// take the read lock for the pointer clone and are never blocked by an
/// in-flight fetch.
pub struct CourseCache {
    snapshot: RwLock<Option<Arc<HashMap<u64, Course>>>>,
}

impl CourseCache {
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(None),
        }
    }

    /// Whether any refresh has completed successfully.
    pub fn is_initialized(&self) -> bool {
        self.snapshot.read().is_some()
    }

    /// Look up a course in the currently installed snapshot.
    pub fn lookup(&self, course_id: u64) -> Option<Course> {
        let snapshot = self.snapshot.read().clone();
        snapshot.and_then(|courses| courses.get(&course_id).cloned())
    }

    /// Fetch the course list and replace the snapshot in one step.
    ///
    /// On failure the previously installed snapshot is left untouched. The
    /// fetch happens before the write lock is taken, so readers keep seeing
    /// the old snapshot until the new one is fully built.
    pub async fn refresh<S>(&self, source: &S) -> Result<(), BridgeError>
    where
        S: CourseSource + ?Sized,
    {
        let courses = source
            .get_courses()
            .await
            .map_err(BridgeError::UpstreamUnavailable)?;

        let snapshot: HashMap<_, _> = courses.into_iter().map(|c| (c.id, c)).collect();
        debug!("installing course snapshot with {} entries", snapshot.len());
        *self.snapshot.write() = Some(Arc::new(snapshot));

        Ok(())
    }
}

impl Default for CourseCache {
    fn default() -> Self {
        Self::new()
    }
}
