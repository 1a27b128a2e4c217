//! Client for the Ed API and its realtime event stream.

use anyhow::Result;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc::Sender;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::cache::CourseSource;
use crate::error::BridgeError;
use crate::models::{Course, Event, Thread};
use crate::settings;

pub mod de;

pub struct EdClient {
    http: reqwest::Client,
    api_token: String,
    api_url: String,
    ws_url: String,
}

impl EdClient {
    pub fn new(settings: &settings::Ed) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_token: settings.api_token.clone(),
            api_url: settings.api_url.clone(),
            ws_url: settings.ws_url.clone(),
        }
    }

    /// Open the realtime stream, subscribe to the given courses and forward
    /// every new-thread event into `tx`.
    ///
    /// A connect or handshake failure is returned as
    /// [`BridgeError::SubscriptionFailure`]. Once the stream is established
    /// this only returns when it ends, emitting [`Event::Shutdown`] last.
    pub async fn subscribe(&self, course_ids: &[u64], tx: Sender<Event>) -> Result<(), BridgeError> {
        let url = format!("{}?_token={}", self.ws_url, self.api_token);
        let (mut stream, _) = connect_async(url)
            .await
            .map_err(|e| BridgeError::SubscriptionFailure(e.into()))?;

        for course_id in course_ids {
            let frame = json!({ "type": "course.subscribe", "course_id": course_id });
            stream
                .send(Message::Text(frame.to_string()))
                .await
                .map_err(|e| BridgeError::SubscriptionFailure(e.into()))?;
        }

        info!("subscribed to {} courses", course_ids.len());

        while let Some(message) = stream.next().await {
            let text = match message {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(err) => {
                    warn!("realtime stream error: {}", err);
                    break;
                }
            };

            match serde_json::from_str::<StreamFrame>(&text) {
                Ok(StreamFrame::ThreadNew { data }) => {
                    if tx.send(Event::ThreadNew(data.thread)).await.is_err() {
                        // The consumer is gone, no point in reading further.
                        return Ok(());
                    }
                }
                Ok(StreamFrame::Ignored) => debug!("ignoring stream frame: {}", text),
                Err(err) => warn!("unparseable stream frame: {}", err),
            }
        }

        tx.send(Event::Shutdown).await.ok();
        Ok(())
    }
}

#[async_trait]
impl CourseSource for EdClient {
    /// Fetch all courses the authenticated user is enrolled in.
    async fn get_courses(&self) -> Result<Vec<Course>> {
        let response = self
            .http
            .get(format!("{}/user", self.api_url))
            .header("x-token", &self.api_token)
            .send()
            .await?
            .error_for_status()?;

        let user = response.json::<UserResponse>().await?;
        Ok(user.courses.into_iter().map(|e| e.course).collect())
    }
}

#[derive(Deserialize)]
struct UserResponse {
    courses: Vec<Enrollment>,
}

/// The user payload nests each course under an enrollment wrapper.
#[derive(Deserialize)]
struct Enrollment {
    course: Course,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum StreamFrame {
    #[serde(rename = "thread.new")]
    ThreadNew { data: ThreadData },
    #[serde(other)]
    Ignored,
}

#[derive(Deserialize)]
struct ThreadData {
    thread: Thread,
}
