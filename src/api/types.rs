use serde::{Deserialize, Serialize};

// ============================================================================
// Wire Types
// ============================================================================
//
// The server speaks a Spring-style JSON API: paginated responses arrive as
// `{ "content": [...], "last": bool }` and entity fields are camelCase.

/// A user reference as embedded in topics and returned by the login endpoint.
///
/// Opaque to the feed core — only `id` is compared (ownership gate for
/// delete) and the rest is display data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    /// Server-side image reference (filename), not fetched by this client.
    #[serde(default)]
    pub image: Option<String>,
}

/// File attached to a topic. Only the MIME type is inspected, to decide
/// whether an image marker applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,
    #[serde(default)]
    pub file_type: Option<String>,
}

impl Attachment {
    /// True when the attachment is an image (`fileType` starts with "image").
    pub fn is_image(&self) -> bool {
        self.file_type
            .as_deref()
            .is_some_and(|t| t.starts_with("image"))
    }
}

/// A single feed item. Immutable once fetched; the only mutation the client
/// ever performs is removal from the in-memory list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    /// Unique, descending-sorted ordering key.
    pub id: i64,
    pub content: String,
    /// Creation time in epoch milliseconds.
    pub date: i64,
    pub user: User,
    #[serde(default)]
    pub attachment: Option<Attachment>,
}

/// One page of topics, ordered by descending id.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopicPage {
    #[serde(default)]
    pub content: Vec<Topic>,
    /// True when there are no older topics beyond this page.
    #[serde(default)]
    pub last: bool,
}

/// Response body of the new-topic count endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct CountResponse {
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic_json() -> &'static str {
        r#"{
            "id": 10,
            "content": "hello feed",
            "date": 1714000000000,
            "user": {
                "id": 1,
                "username": "user1",
                "displayName": "display1",
                "image": "profile1.png"
            },
            "attachment": {
                "name": "upload.png",
                "fileType": "image/png"
            }
        }"#
    }

    #[test]
    fn test_topic_deserializes_camel_case_fields() {
        let topic: Topic = serde_json::from_str(topic_json()).unwrap();
        assert_eq!(topic.id, 10);
        assert_eq!(topic.user.display_name, "display1");
        assert_eq!(
            topic.attachment.as_ref().unwrap().file_type.as_deref(),
            Some("image/png")
        );
    }

    #[test]
    fn test_attachment_image_detection() {
        let image = Attachment {
            name: "a.png".into(),
            file_type: Some("image/png".into()),
        };
        let pdf = Attachment {
            name: "a.pdf".into(),
            file_type: Some("application/pdf".into()),
        };
        let unknown = Attachment {
            name: "a.bin".into(),
            file_type: None,
        };
        assert!(image.is_image());
        assert!(!pdf.is_image());
        assert!(!unknown.is_image());
    }

    #[test]
    fn test_page_defaults_for_missing_fields() {
        // An empty page body still deserializes (missing topics, missing last)
        let page: TopicPage = serde_json::from_str("{}").unwrap();
        assert!(page.content.is_empty());
        assert!(!page.last);
    }
}
