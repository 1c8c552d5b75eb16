use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{AdminUser, Role, Session};
use crate::repo::{SessionRepo, UserRepo};
use crate::store::StoreError;

pub const DEFAULT_ADMIN_USERNAME: &str = "bAyHaCk";
const DEFAULT_ADMIN_PASSWORD: &str = "bAyHaCk";

const SESSION_TTL_HOURS: i64 = 24;
const TOKEN_LEN: usize = 32;

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    hash(password, DEFAULT_COST)
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    verify(password, hash).unwrap_or(false)
}

pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Case-insensitive lookup plus hash check. Returns `None` uniformly for an
/// unknown username or a wrong password.
pub fn verify_credentials(
    users: &UserRepo,
    username: &str,
    password: &str,
) -> Result<Option<AdminUser>, StoreError> {
    let Some(user) = users.find_by_username(username)? else {
        return Ok(None);
    };
    if verify_password(password, &user.password_hash) {
        Ok(Some(user))
    } else {
        Ok(None)
    }
}

pub fn create_session(sessions: &SessionRepo, user: &AdminUser) -> Result<Session, StoreError> {
    let session = Session {
        token: generate_token(),
        user_id: user.id,
        username: user.username.clone(),
        role: user.role,
        expires_at: Utc::now() + Duration::hours(SESSION_TTL_HOURS),
    };
    sessions.push(session.clone())?;
    info!("session created for {}", user.username);
    Ok(session)
}

pub fn find_valid_session(
    sessions: &SessionRepo,
    token: &str,
) -> Result<Option<Session>, StoreError> {
    sessions.find(token)
}

pub fn delete_session(sessions: &SessionRepo, token: &str) -> Result<(), StoreError> {
    sessions.remove(token)
}

/// Pure sweep; callable from read paths and tests alike.
pub fn prune_expired(sessions: Vec<Session>, now: DateTime<Utc>) -> Vec<Session> {
    sessions.into_iter().filter(|s| s.is_valid(now)).collect()
}

/// Seeds the well-known admin account when the user collection is empty.
pub fn ensure_default_admin(users: &UserRepo) -> Result<(), AppError> {
    if !users.all()?.is_empty() {
        return Ok(());
    }

    let admin = AdminUser {
        id: Uuid::new_v4(),
        username: DEFAULT_ADMIN_USERNAME.to_string(),
        password_hash: hash_password(DEFAULT_ADMIN_PASSWORD)?,
        role: Role::Admin,
        created_at: Utc::now(),
    };
    users.save(&[admin])?;
    warn!(
        "seeded default admin \"{DEFAULT_ADMIN_USERNAME}\" with a well-known password; \
         change it or disable bootstrap_admin"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::Storage;

    fn temp_storage() -> Storage {
        let root = std::env::temp_dir().join(format!("hubforce-auth-{}", Uuid::new_v4()));
        Storage::new(root.join("storage"), root.join("uploads"))
    }

    fn seeded_user(storage: &Storage, username: &str, password: &str) -> AdminUser {
        let user = AdminUser {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: hash_password(password).unwrap(),
            role: Role::Editor,
            created_at: Utc::now(),
        };
        storage.users.save(std::slice::from_ref(&user)).unwrap();
        user
    }

    #[test]
    fn tokens_are_long_alphanumeric_strings() {
        let token = generate_token();
        assert_eq!(token.len(), TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, generate_token());
    }

    #[test]
    fn credentials_fail_uniformly() {
        let storage = temp_storage();
        seeded_user(&storage, "editor", "secret");

        let ok = verify_credentials(&storage.users, "Editor", "secret").unwrap();
        assert_eq!(ok.unwrap().username, "editor");

        let bad_password = verify_credentials(&storage.users, "editor", "wrong").unwrap();
        let unknown_user = verify_credentials(&storage.users, "ghost", "secret").unwrap();
        assert!(bad_password.is_none());
        assert!(unknown_user.is_none());
    }

    #[test]
    fn created_sessions_are_retrievable_until_expiry() {
        let storage = temp_storage();
        let user = seeded_user(&storage, "editor", "secret");

        let session = create_session(&storage.sessions, &user).unwrap();
        let found = find_valid_session(&storage.sessions, &session.token).unwrap();
        assert_eq!(found.unwrap().user_id, user.id);

        // Rewind the stored expiry; the session becomes invisible.
        let mut sessions = storage.sessions.all().unwrap();
        sessions[0].expires_at = Utc::now() - Duration::seconds(1);
        storage.sessions.save(&sessions).unwrap();
        assert!(find_valid_session(&storage.sessions, &session.token)
            .unwrap()
            .is_none());
    }

    #[test]
    fn delete_session_is_idempotent() {
        let storage = temp_storage();
        let user = seeded_user(&storage, "editor", "secret");
        let session = create_session(&storage.sessions, &user).unwrap();

        delete_session(&storage.sessions, &session.token).unwrap();
        assert!(find_valid_session(&storage.sessions, &session.token)
            .unwrap()
            .is_none());
        delete_session(&storage.sessions, &session.token).unwrap();
    }

    #[test]
    fn prune_keeps_only_live_sessions() {
        let now = Utc::now();
        let make = |token: &str, delta: Duration| Session {
            token: token.to_string(),
            user_id: Uuid::new_v4(),
            username: "u".to_string(),
            role: Role::Editor,
            expires_at: now + delta,
        };
        let sessions = vec![
            make("live", Duration::hours(1)),
            make("edge", Duration::zero()),
            make("dead", Duration::hours(-1)),
        ];

        let kept = prune_expired(sessions, now);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].token, "live");
    }

    #[test]
    fn bootstrap_seeds_a_working_admin_once() {
        let storage = temp_storage();
        ensure_default_admin(&storage.users).unwrap();

        let admin = verify_credentials(&storage.users, "bAyHaCk", "bAyHaCk")
            .unwrap()
            .expect("bootstrap admin must be able to log in");
        assert_eq!(admin.role, Role::Admin);

        // Second call is a no-op once any user exists.
        ensure_default_admin(&storage.users).unwrap();
        assert_eq!(storage.users.all().unwrap().len(), 1);
    }
}
