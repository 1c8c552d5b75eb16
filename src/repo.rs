use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::auth;
use crate::models::{AdminUser, ContentPost, Notification, NotificationKind, Session, SiteSettings};
use crate::store::{JsonStore, StoreError};

const USERS_FILE: &str = "users.json";
const CONTENT_FILE: &str = "content.json";
const NOTIFICATIONS_FILE: &str = "notifications.json";
const SETTINGS_FILE: &str = "settings.json";
const SESSIONS_FILE: &str = "sessions.json";

/// All collections behind one lock; handlers take the mutex for the span of
/// a read-modify-write cycle.
pub type SharedStorage = Arc<Mutex<Storage>>;

pub struct Storage {
    pub users: UserRepo,
    pub content: ContentRepo,
    pub notifications: NotificationRepo,
    pub settings: SettingsRepo,
    pub sessions: SessionRepo,
}

impl Storage {
    pub fn new(storage_dir: impl Into<PathBuf>, uploads_dir: impl Into<PathBuf>) -> Self {
        let store = JsonStore::new(storage_dir);
        Self {
            users: UserRepo { store: store.clone() },
            content: ContentRepo {
                store: store.clone(),
                uploads_dir: uploads_dir.into(),
            },
            notifications: NotificationRepo { store: store.clone() },
            settings: SettingsRepo { store: store.clone() },
            sessions: SessionRepo { store },
        }
    }
}

pub struct UserRepo {
    store: JsonStore,
}

impl UserRepo {
    pub fn all(&self) -> Result<Vec<AdminUser>, StoreError> {
        self.store.load(USERS_FILE, Vec::new()).map(|(users, _)| users)
    }

    pub fn save(&self, users: &[AdminUser]) -> Result<(), StoreError> {
        self.store.save(USERS_FILE, &users)
    }

    /// Usernames are unique case-insensitively.
    pub fn find_by_username(&self, username: &str) -> Result<Option<AdminUser>, StoreError> {
        let needle = username.to_lowercase();
        Ok(self
            .all()?
            .into_iter()
            .find(|u| u.username.to_lowercase() == needle))
    }

    pub fn find_by_id(&self, id: Uuid) -> Result<Option<AdminUser>, StoreError> {
        Ok(self.all()?.into_iter().find(|u| u.id == id))
    }
}

pub struct ContentRepo {
    store: JsonStore,
    uploads_dir: PathBuf,
}

impl ContentRepo {
    pub fn all(&self) -> Result<Vec<ContentPost>, StoreError> {
        self.store.load(CONTENT_FILE, Vec::new()).map(|(posts, _)| posts)
    }

    pub fn save(&self, posts: &[ContentPost]) -> Result<(), StoreError> {
        self.store.save(CONTENT_FILE, &posts)
    }

    pub fn find_by_id(&self, id: Uuid) -> Result<Option<ContentPost>, StoreError> {
        Ok(self.all()?.into_iter().find(|p| p.id == id))
    }

    /// Removes the post and unlinks its uploaded binaries. Cleanup is
    /// best-effort: a binary already gone does not fail the delete.
    /// Returns the removed post, or `None` when the id is unknown.
    pub fn delete_by_id(&self, id: Uuid) -> Result<Option<ContentPost>, StoreError> {
        let mut posts = self.all()?;
        let Some(index) = posts.iter().position(|p| p.id == id) else {
            return Ok(None);
        };
        let post = posts.remove(index);

        for file in &post.files {
            if let Some(name) = Path::new(&file.path).file_name() {
                let _ = fs::remove_file(self.uploads_dir.join(name));
            }
        }

        self.save(&posts)?;
        Ok(Some(post))
    }
}

pub struct NotificationRepo {
    store: JsonStore,
}

impl NotificationRepo {
    /// Newest-first activity log, truncated to this many entries.
    pub const MAX_KEPT: usize = 50;

    pub fn all(&self) -> Result<Vec<Notification>, StoreError> {
        self.store
            .load(NOTIFICATIONS_FILE, Vec::new())
            .map(|(notifications, _)| notifications)
    }

    pub fn save(&self, notifications: &[Notification]) -> Result<(), StoreError> {
        self.store.save(NOTIFICATIONS_FILE, &notifications)
    }

    pub fn add(
        &self,
        kind: NotificationKind,
        title: &str,
        message: String,
        content_id: Option<Uuid>,
    ) -> Result<Notification, StoreError> {
        let mut notifications = self.all()?;
        let notification = Notification {
            id: Uuid::new_v4(),
            kind,
            title: title.to_string(),
            message,
            content_id,
            created_at: Utc::now(),
        };
        notifications.insert(0, notification.clone());
        notifications.truncate(Self::MAX_KEPT);
        self.save(&notifications)?;
        Ok(notification)
    }
}

pub struct SettingsRepo {
    store: JsonStore,
}

impl SettingsRepo {
    pub fn get(&self) -> Result<SiteSettings, StoreError> {
        self.store
            .load(SETTINGS_FILE, SiteSettings::default())
            .map(|(settings, _)| settings)
    }

    pub fn save(&self, settings: &SiteSettings) -> Result<(), StoreError> {
        self.store.save(SETTINGS_FILE, settings)
    }
}

pub struct SessionRepo {
    store: JsonStore,
}

impl SessionRepo {
    /// Every read sweeps expired sessions; the pruned list is written back
    /// only when something was dropped.
    pub fn all(&self) -> Result<Vec<Session>, StoreError> {
        let (sessions, _) = self.store.load(SESSIONS_FILE, Vec::new())?;
        let before = sessions.len();
        let valid = auth::prune_expired(sessions, Utc::now());
        if valid.len() != before {
            self.save(&valid)?;
        }
        Ok(valid)
    }

    pub fn save(&self, sessions: &[Session]) -> Result<(), StoreError> {
        self.store.save(SESSIONS_FILE, &sessions)
    }

    pub fn find(&self, token: &str) -> Result<Option<Session>, StoreError> {
        Ok(self.all()?.into_iter().find(|s| s.token == token))
    }

    pub fn push(&self, session: Session) -> Result<(), StoreError> {
        let mut sessions = self.all()?;
        sessions.push(session);
        self.save(&sessions)
    }

    /// Idempotent: removing an absent token is a no-op.
    pub fn remove(&self, token: &str) -> Result<(), StoreError> {
        let sessions: Vec<Session> = self
            .all()?
            .into_iter()
            .filter(|s| s.token != token)
            .collect();
        self.save(&sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentFile, FileKind, Role};

    fn temp_storage() -> Storage {
        let root = std::env::temp_dir().join(format!("hubforce-repo-{}", Uuid::new_v4()));
        Storage::new(root.join("storage"), root.join("uploads"))
    }

    fn sample_post(files: Vec<ContentFile>) -> ContentPost {
        let now = Utc::now();
        ContentPost {
            id: Uuid::new_v4(),
            title: "T".to_string(),
            description: "D".to_string(),
            category: "General".to_string(),
            author: "editor".to_string(),
            created_at: now,
            updated_at: now,
            files,
            pinned: false,
            tags: vec![],
        }
    }

    #[test]
    fn username_lookup_is_case_insensitive() {
        let storage = temp_storage();
        let user = AdminUser {
            id: Uuid::new_v4(),
            username: "bAyHaCk".to_string(),
            password_hash: "x".to_string(),
            role: Role::Admin,
            created_at: Utc::now(),
        };
        storage.users.save(&[user]).unwrap();

        let found = storage.users.find_by_username("BAYHACK").unwrap().unwrap();
        assert_eq!(found.username, "bAyHaCk");
        assert!(storage.users.find_by_username("nobody").unwrap().is_none());
        assert!(storage.users.find_by_id(found.id).unwrap().is_some());
        assert!(storage.users.find_by_id(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn notifications_stay_capped_and_newest_first() {
        let storage = temp_storage();
        for i in 0..60 {
            storage
                .notifications
                .add(NotificationKind::NewContent, "New content", format!("post {i}"), None)
                .unwrap();
        }

        let notifications = storage.notifications.all().unwrap();
        assert_eq!(notifications.len(), NotificationRepo::MAX_KEPT);
        assert_eq!(notifications[0].message, "post 59");
        assert_eq!(notifications.last().unwrap().message, "post 10");
        for pair in notifications.windows(2) {
            assert!(pair[0].created_at >= pair[1].created_at);
        }
    }

    #[test]
    fn deleting_a_post_removes_its_binaries() {
        let storage = temp_storage();
        let uploads = storage.content.uploads_dir.clone();
        fs::create_dir_all(&uploads).unwrap();

        let on_disk = uploads.join("a.png");
        fs::write(&on_disk, b"png").unwrap();

        let files = vec![
            ContentFile {
                id: Uuid::new_v4(),
                name: "a.png".to_string(),
                original_name: "photo.png".to_string(),
                kind: FileKind::Image,
                mime_type: "image/png".to_string(),
                size: 3,
                path: "/uploads/a.png".to_string(),
            },
            // References a binary that was never written; delete still succeeds.
            ContentFile {
                id: Uuid::new_v4(),
                name: "gone.pdf".to_string(),
                original_name: "doc.pdf".to_string(),
                kind: FileKind::Document,
                mime_type: "application/pdf".to_string(),
                size: 9,
                path: "/uploads/gone.pdf".to_string(),
            },
        ];
        let post = sample_post(files);
        let id = post.id;
        storage.content.save(&[post]).unwrap();
        assert!(storage.content.find_by_id(id).unwrap().is_some());

        let removed = storage.content.delete_by_id(id).unwrap();
        assert_eq!(removed.unwrap().id, id);
        assert!(!on_disk.exists());
        assert!(storage.content.all().unwrap().is_empty());

        assert!(storage.content.delete_by_id(id).unwrap().is_none());
    }

    #[test]
    fn settings_seed_on_first_read_and_round_trip() {
        let storage = temp_storage();
        let mut settings = storage.settings.get().unwrap();
        assert_eq!(settings.about.features.len(), 3);

        settings.info.title = "Changed".to_string();
        storage.settings.save(&settings).unwrap();
        assert_eq!(storage.settings.get().unwrap().info.title, "Changed");
    }

    #[test]
    fn session_read_persists_the_pruned_list() {
        let storage = temp_storage();
        let now = Utc::now();
        let stale = Session {
            token: "old".to_string(),
            user_id: Uuid::new_v4(),
            username: "u".to_string(),
            role: Role::Editor,
            expires_at: now - chrono::Duration::hours(1),
        };
        let live = Session {
            token: "live".to_string(),
            user_id: Uuid::new_v4(),
            username: "u".to_string(),
            role: Role::Editor,
            expires_at: now + chrono::Duration::hours(1),
        };
        storage.sessions.save(&[stale, live]).unwrap();

        let sessions = storage.sessions.all().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].token, "live");

        // The sweep wrote through: the raw file no longer holds the stale entry.
        let raw = fs::read_to_string(storage.sessions.store.path(SESSIONS_FILE)).unwrap();
        assert!(!raw.contains("\"old\""));
    }
}
