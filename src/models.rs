use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Editor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Client-facing user shape; password hashes never leave the store.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<&AdminUser> for UserSummary {
    fn from(user: &AdminUser) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Strictly-greater comparison: a session is invalid at its expiry instant.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPost {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub files: Vec<ContentFile>,
    pub pinned: bool,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentFile {
    pub id: Uuid,
    /// Generated storage filename, `<uuid><original extension>`.
    pub name: String,
    pub original_name: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
    pub mime_type: String,
    pub size: u64,
    /// Public URL path, e.g. `/uploads/<name>`.
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Image,
    Audio,
    Video,
    Document,
    Other,
}

impl FileKind {
    /// Coarse classification of a declared MIME type. The type is taken at
    /// face value; no content sniffing.
    pub fn from_mime(mime: &str) -> Self {
        if mime.starts_with("image/") {
            FileKind::Image
        } else if mime.starts_with("audio/") {
            FileKind::Audio
        } else if mime.starts_with("video/") {
            FileKind::Video
        } else if mime.starts_with("application/pdf")
            || mime.starts_with("text/")
            || mime.contains("document")
            || mime.contains("spreadsheet")
            || mime.contains("presentation")
        {
            FileKind::Document
        } else {
            FileKind::Other
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewContent,
    UpdateContent,
    DeleteContent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Singleton site copy, one fixed sub-document per public page section.
/// Updates replace whole sections, never individual fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteSettings {
    pub about: AboutSection,
    pub info: InfoSection,
    pub channels: ChannelsSection,
    pub report: ReportSection,
    pub rdpvps: RdpVpsSection,
    pub stats: StatsSection,
    pub gallery: GallerySection,
    pub downloads: DownloadsSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AboutSection {
    pub title: String,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoSection {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelsSection {
    pub title: String,
    pub description: String,
    pub links: Vec<ChannelLink>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelLink {
    pub name: String,
    pub url: String,
    pub platform: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSection {
    pub title: String,
    pub description: String,
    pub button_text: String,
    pub button_url: String,
    pub subtitle: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RdpVpsSection {
    pub title: String,
    pub description: String,
    pub links: Vec<ServiceLink>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceLink {
    pub name: String,
    pub url: String,
    pub icon: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSection {
    pub items: Vec<StatItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatItem {
    pub label: String,
    pub value: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GallerySection {
    pub title: String,
    pub images: Vec<GalleryImage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryImage {
    pub url: String,
    pub alt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadsSection {
    pub title: String,
    pub description: String,
    pub files: Vec<DownloadFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadFile {
    pub name: String,
    pub description: String,
    pub url: String,
    #[serde(rename = "type")]
    pub file_type: String,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            about: AboutSection {
                title: "About us".to_string(),
                features: vec![
                    Feature {
                        title: "Community".to_string(),
                        description: "A space run by and for its members.".to_string(),
                    },
                    Feature {
                        title: "Resources".to_string(),
                        description: "Guides, tools and files shared by the team.".to_string(),
                    },
                    Feature {
                        title: "Support".to_string(),
                        description: "Reach the staff through any of our channels.".to_string(),
                    },
                ],
            },
            info: InfoSection {
                title: "Information".to_string(),
                description: "Everything published here is curated by the site editors."
                    .to_string(),
            },
            channels: ChannelsSection {
                title: "Channels".to_string(),
                description: "Join the conversation.".to_string(),
                links: vec![],
            },
            report: ReportSection {
                title: "Report".to_string(),
                description: "Found a problem? Let us know.".to_string(),
                button_text: "Report".to_string(),
                button_url: "#".to_string(),
                subtitle: "Reports are reviewed by the staff.".to_string(),
            },
            rdpvps: RdpVpsSection {
                title: "RDP / VPS".to_string(),
                description: "Available services.".to_string(),
                links: vec![],
            },
            stats: StatsSection {
                items: vec![
                    StatItem {
                        label: "Members".to_string(),
                        value: 0,
                    },
                    StatItem {
                        label: "Posts".to_string(),
                        value: 0,
                    },
                ],
            },
            gallery: GallerySection {
                title: "Gallery".to_string(),
                images: vec![],
            },
            downloads: DownloadsSection {
                title: "Downloads".to_string(),
                description: "Files published by the team.".to_string(),
                files: vec![],
            },
        }
    }
}
