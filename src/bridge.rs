//! Orchestration between the event stream, the course cache and the
//! webhook dispatcher.

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use tokio::sync::mpsc::Receiver;
use tokio::task::JoinHandle;

use crate::cache::{CourseCache, CourseSource};
use crate::discord::{self, Notify};
use crate::error::BridgeError;
use crate::models::{Event, Thread};

/// Connects new-thread events to webhook notifications.
///
/// Owns the cache refresh task and consumes the event channel fed by the
/// transport. The refresh loop and event handling run as separate tasks, so
/// a slow fetch never stalls event delivery and an event burst never starves
/// the refresh timer.
pub struct EventBridge<S, N> {
    cache: Arc<CourseCache>,
    source: Arc<S>,
    notifier: N,
}

impl<S, N> EventBridge<S, N>
where
    S: CourseSource + 'static,
    N: Notify + 'static,
{
    pub fn new(cache: Arc<CourseCache>, source: Arc<S>, notifier: N) -> Self {
        Self {
            cache,
            source,
            notifier,
        }
    }

    /// Spawn the periodic cache refresh. The first tick fires immediately
    /// and doubles as the initial population.
    pub fn spawn_refresh_loop(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(period);
            loop {
                timer.tick().await;
                if let Err(err) = self.cache.refresh(self.source.as_ref()).await {
                    warn!("scheduled course refresh failed: {:#}", anyhow::Error::new(err));
                }
            }
        })
    }

    /// Consume events until the channel closes or the transport reports a
    /// shutdown.
    ///
    /// Every thread event is handled on its own task, so a cold-start
    /// refresh or a slow webhook call only blocks that one event.
    pub async fn run(self: Arc<Self>, mut rx: Receiver<Event>) {
        while let Some(event) = rx.recv().await {
            match event {
                Event::ThreadNew(thread) => {
                    let bridge = Arc::clone(&self);
                    tokio::spawn(async move {
                        if let Err(err) = bridge.handle_thread(thread).await {
                            warn!("dropping event: {:#}", anyhow::Error::new(err));
                        }
                    });
                }
                Event::Shutdown => {
                    info!("event stream closed");
                    break;
                }
            }
        }
    }

    /// Resolve, build and dispatch a single new-thread event.
    ///
    /// An error means the event was dropped: either the cold-start refresh
    /// failed or the course is missing from the current snapshot. Neither is
    /// retried.
    pub async fn handle_thread(&self, thread: Thread) -> Result<(), BridgeError> {
        if !self.cache.is_initialized() {
            // The stream can deliver before the first scheduled refresh has
            // landed.
            self.cache.refresh(self.source.as_ref()).await?;
        }

        let course = self
            .cache
            .lookup(thread.course_id)
            .ok_or(BridgeError::CourseLookupMiss(thread.course_id))?;

        let payload = discord::build_payload(&thread, &course);
        self.notifier.send(thread.course_id, &payload).await;

        Ok(())
    }
}
