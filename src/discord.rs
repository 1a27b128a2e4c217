//! Discord-facing side of the bridge: embed construction and webhook
//! delivery.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use log::{debug, error};
use serde::Serialize;

use crate::error::BridgeError;
use crate::models::{Course, Thread};

/// Base URL of the Ed frontend, used for the embed links.
const BASE_URL: &str = "https://edstem.org";
/// Identity Discord shows for every notification.
const USERNAME: &str = "Ed";
const ED_ICON: &str = "https://edstem.org/android-chrome-512x512.png";
const USER_ICON: &str = "https://static.edusercontent.com/avatars/anonymous.png";

/// Fallback accent color for thread kinds missing from the color table.
pub const UNKNOWN_COLOR: u32 = 0x95A5A6;

/// Embed accent color for a thread kind. Total, unknown kinds fall back to
/// [`UNKNOWN_COLOR`].
pub fn embed_color(kind: &str) -> u32 {
    match kind {
        "question" => 0xF59E0B,
        "post" => 0x3B82F6,
        "announcement" => 0x10B981,
        _ => UNKNOWN_COLOR,
    }
}

/// Body of a Discord webhook call, in the JSON shape the webhook endpoint
/// expects.
#[derive(Debug, Serialize)]
pub struct WebhookPayload {
    pub username: &'static str,
    pub avatar_url: &'static str,
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Serialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub url: String,
    pub color: u32,
    pub author: EmbedAuthor,
    pub footer: EmbedFooter,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct EmbedAuthor {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct EmbedFooter {
    pub text: &'static str,
    pub icon_url: &'static str,
}

/// Build the notification payload for a freshly created thread.
///
/// Deterministic in everything except the embedded timestamp, which is the
/// wall clock at call time. The thread body is passed through verbatim and
/// the embed link points at the specific thread, while the author link
/// points at the course's discussion listing.
pub fn build_payload(thread: &Thread, course: &Course) -> WebhookPayload {
    WebhookPayload {
        username: USERNAME,
        avatar_url: ED_ICON,
        embeds: vec![Embed {
            title: format!("#{} **{}**", thread.number, thread.title),
            description: thread.document.clone(),
            url: format!(
                "{}/courses/{}/discussion/{}",
                BASE_URL, thread.course_id, thread.id
            ),
            color: embed_color(&thread.kind),
            author: EmbedAuthor {
                name: format!("{} • {}", course.code, thread.category),
                url: format!("{}/courses/{}/discussion", BASE_URL, thread.course_id),
            },
            footer: EmbedFooter {
                text: if thread.is_anonymous {
                    "Anonymous User"
                } else {
                    "Name Hidden"
                },
                icon_url: USER_ICON,
            },
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }],
    }
}

/// Course → webhook URL routing table, built once at startup and immutable
/// afterwards.
pub struct WebhookRegistry {
    routes: HashMap<u64, String>,
}

impl WebhookRegistry {
    pub fn new(routes: HashMap<u64, String>) -> Self {
        Self { routes }
    }

    /// All configured course ids, routable or not. This doubles as the
    /// subscription list.
    pub fn course_ids(&self) -> Vec<u64> {
        self.routes.keys().copied().collect()
    }

    /// The destination URL for a course, or `None` when the course has no
    /// entry or an empty one ("do not notify").
    pub fn url_for(&self, course_id: u64) -> Option<&str> {
        self.routes
            .get(&course_id)
            .map(String::as_str)
            .filter(|url| !url.is_empty())
    }
}

/// Delivery seam between the bridge and the outbound webhook call.
#[async_trait]
pub trait Notify: Send + Sync {
    async fn send(&self, course_id: u64, payload: &WebhookPayload);
}

/// Posts payloads to the webhook configured for each course.
pub struct WebhookDispatcher {
    http: reqwest::Client,
    registry: WebhookRegistry,
}

impl WebhookDispatcher {
    pub fn new(registry: WebhookRegistry) -> Self {
        Self {
            http: reqwest::Client::new(),
            registry,
        }
    }
}

#[async_trait]
impl Notify for WebhookDispatcher {
    /// Fire-and-forget delivery: courses without a destination are skipped
    /// silently and a failed call is logged, not retried.
    async fn send(&self, course_id: u64, payload: &WebhookPayload) {
        let url = match self.registry.url_for(course_id) {
            Some(url) => url,
            None => {
                debug!("no webhook configured for course {}, skipping", course_id);
                return;
            }
        };

        let result = self
            .http
            .post(url)
            .json(payload)
            .send()
            .await
            .and_then(|response| response.error_for_status());

        match result {
            Ok(_) => debug!("delivered notification for course {}", course_id),
            Err(source) => {
                let err = BridgeError::DeliveryFailure { course_id, source };
                error!("{:#}", anyhow::Error::new(err));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course() -> Course {
        Course {
            id: 72681,
            code: "ECE 350".to_owned(),
            name: "Digital Systems".to_owned(),
        }
    }

    fn thread() -> Thread {
        Thread {
            id: 112233,
            number: 5,
            title: "Midterm".to_owned(),
            document: "When is the midterm?".to_owned(),
            course_id: 72681,
            category: "Exams".to_owned(),
            kind: "question".to_owned(),
            is_anonymous: true,
            created_at: "2026-02-03T04:05:06Z".parse().unwrap(),
        }
    }

    #[test]
    fn payload_reflects_thread_and_course() {
        let payload = build_payload(&thread(), &course());

        assert_eq!(payload.username, "Ed");
        assert_eq!(payload.embeds.len(), 1);

        let embed = &payload.embeds[0];
        assert_eq!(embed.title, "#5 **Midterm**");
        assert_eq!(embed.description, "When is the midterm?");
        assert_eq!(embed.url, "https://edstem.org/courses/72681/discussion/112233");
        assert_eq!(embed.color, embed_color("question"));
        assert_eq!(embed.author.name, "ECE 350 • Exams");
        assert_eq!(embed.author.url, "https://edstem.org/courses/72681/discussion");
    }

    #[test]
    fn footer_tracks_the_anonymity_flag() {
        let mut thread = thread();

        thread.is_anonymous = true;
        let payload = build_payload(&thread, &course());
        assert_eq!(payload.embeds[0].footer.text, "Anonymous User");

        thread.is_anonymous = false;
        let payload = build_payload(&thread, &course());
        assert_eq!(payload.embeds[0].footer.text, "Name Hidden");
    }

    #[test]
    fn unknown_kinds_fall_back_to_the_unknown_color() {
        assert_ne!(embed_color("question"), UNKNOWN_COLOR);
        assert_ne!(embed_color("announcement"), UNKNOWN_COLOR);
        assert_eq!(embed_color("private_thread"), UNKNOWN_COLOR);
        assert_eq!(embed_color(""), UNKNOWN_COLOR);
    }

    #[test]
    fn builds_are_identical_except_for_the_timestamp() {
        let thread = thread();
        let course = course();

        let first = build_payload(&thread, &course);
        let second = build_payload(&thread, &course);

        let a = &first.embeds[0];
        let b = &second.embeds[0];
        assert_eq!(a.title, b.title);
        assert_eq!(a.description, b.description);
        assert_eq!(a.url, b.url);
        assert_eq!(a.color, b.color);
        assert_eq!(a.author.name, b.author.name);
        assert_eq!(a.author.url, b.author.url);
        assert_eq!(a.footer.text, b.footer.text);
    }

    #[test]
    fn timestamp_is_utc_with_millisecond_precision() {
        let payload = build_payload(&thread(), &course());
        let timestamp = &payload.embeds[0].timestamp;

        // e.g. 2026-08-08T14:03:21.118Z
        assert_eq!(timestamp.len(), 24);
        assert!(timestamp.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
    }

    #[test]
    fn payload_serializes_into_the_webhook_shape() {
        let value = serde_json::to_value(build_payload(&thread(), &course())).unwrap();

        assert_eq!(value["username"], "Ed");
        assert!(value["avatar_url"].is_string());
        assert_eq!(value["embeds"].as_array().unwrap().len(), 1);
        assert_eq!(value["embeds"][0]["footer"]["text"], "Anonymous User");
        assert!(value["embeds"][0]["footer"]["icon_url"].is_string());
    }

    #[test]
    fn registry_resolves_only_nonempty_entries() {
        let registry = WebhookRegistry::new(HashMap::from([
            (72681, "https://discord.com/api/webhooks/1/abc".to_owned()),
            (72536, String::new()),
        ]));

        assert_eq!(
            registry.url_for(72681),
            Some("https://discord.com/api/webhooks/1/abc")
        );
        assert_eq!(registry.url_for(72536), None);
        assert_eq!(registry.url_for(99999), None);
    }
}
