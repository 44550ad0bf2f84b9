//! Local state that outlives a single invocation. Run mode and display
//! preferences are durable; the wallet credential used to reconnect lives in
//! a separate store under a per-login directory (`$XDG_RUNTIME_DIR`, or the
//! temp dir) that only the owner can enter.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::dashboard::Theme;
use crate::engine::RunMode;
use crate::types::PrivateKey;

const SESSION_TREE: &str = "session";
const PREFERENCES_TREE: &str = "preferences";
const CREDENTIAL_KEY: &str = "dice_bot_pk";
const RUN_MODE_KEY: &str = "run_mode";
const THEME_KEY: &str = "theme";
const SESSION_DIR_NAME: &str = "dicebot-dashboard";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("local store error: {0}")]
    Sled(#[from] sled::Error),

    #[error("corrupt value for {key}: {reason}")]
    Corrupt { key: &'static str, reason: String },

    #[error("session directory {path}: {source}")]
    SessionDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where the credential store goes when none is configured: below
/// `$XDG_RUNTIME_DIR` (cleared at logout), else a per-user temp directory.
pub fn default_session_dir() -> PathBuf {
    match std::env::var_os("XDG_RUNTIME_DIR").filter(|dir| !dir.is_empty()) {
        Some(runtime) => PathBuf::from(runtime).join(SESSION_DIR_NAME),
        None => {
            let user = std::env::var("USER").unwrap_or_else(|_| "user".to_string());
            std::env::temp_dir().join(format!("{}-{}", SESSION_DIR_NAME, user))
        }
    }
}

fn prepare_session_dir(path: &Path) -> Result<(), StorageError> {
    let io = |source| StorageError::SessionDir {
        path: path.to_path_buf(),
        source,
    };
    std::fs::create_dir_all(path).map_err(io)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700)).map_err(io)?;
    }
    Ok(())
}

#[derive(Clone)]
pub struct LocalStore {
    db: sled::Db,
    session: sled::Tree,
    preferences: sled::Tree,
    credentials: sled::Db,
}

impl LocalStore {
    pub fn open(path: &Path, session_dir: &Path) -> Result<Self, StorageError> {
        debug!(
            "Opening local store at {} (credentials in {})",
            path.display(),
            session_dir.display()
        );
        prepare_session_dir(session_dir)?;
        Self::from_dbs(sled::open(path)?, sled::open(session_dir.join("wallet"))?)
    }

    /// In-memory store removed on drop.
    #[cfg(test)]
    pub fn temporary() -> Result<Self, StorageError> {
        Self::from_dbs(
            sled::Config::new().temporary(true).open()?,
            sled::Config::new().temporary(true).open()?,
        )
    }

    fn from_dbs(db: sled::Db, credentials: sled::Db) -> Result<Self, StorageError> {
        let session = db.open_tree(SESSION_TREE)?;
        let preferences = db.open_tree(PREFERENCES_TREE)?;
        // Older versions kept the key next to the preferences.
        if session.remove(CREDENTIAL_KEY)?.is_some() {
            warn!("Removed wallet key from the durable store");
            session.flush()?;
        }
        Ok(Self {
            db,
            session,
            preferences,
            credentials,
        })
    }

    fn read_string(tree: &sled::Tree, key: &'static str) -> Result<Option<String>, StorageError> {
        match tree.get(key)? {
            Some(bytes) => String::from_utf8(bytes.to_vec())
                .map(Some)
                .map_err(|e| StorageError::Corrupt { key, reason: e.to_string() }),
            None => Ok(None),
        }
    }

    pub fn credential(&self) -> Result<Option<PrivateKey>, StorageError> {
        match Self::read_string(&self.credentials, CREDENTIAL_KEY)? {
            Some(raw) => PrivateKey::parse(&raw)
                .map(Some)
                .map_err(|reason| StorageError::Corrupt { key: CREDENTIAL_KEY, reason }),
            None => Ok(None),
        }
    }

    pub fn store_credential(&self, key: &PrivateKey) -> Result<(), StorageError> {
        self.credentials.insert(CREDENTIAL_KEY, key.expose().as_bytes())?;
        self.credentials.flush()?;
        Ok(())
    }

    pub fn clear_credential(&self) -> Result<(), StorageError> {
        self.credentials.remove(CREDENTIAL_KEY)?;
        self.credentials.flush()?;
        Ok(())
    }

    pub fn run_mode(&self) -> Result<RunMode, StorageError> {
        let mode = Self::read_string(&self.session, RUN_MODE_KEY)?;
        Ok(RunMode::from_flag(mode.as_deref() == Some("running")))
    }

    pub fn store_run_mode(&self, mode: RunMode) -> Result<(), StorageError> {
        let value = match mode {
            RunMode::Running => "running",
            RunMode::Stopped => "stopped",
        };
        self.session.insert(RUN_MODE_KEY, value.as_bytes())?;
        self.session.flush()?;
        Ok(())
    }

    pub fn theme(&self) -> Result<Theme, StorageError> {
        match Self::read_string(&self.preferences, THEME_KEY)? {
            Some(raw) => raw
                .parse()
                .map_err(|reason| StorageError::Corrupt { key: THEME_KEY, reason }),
            None => Ok(Theme::default()),
        }
    }

    pub fn store_theme(&self, theme: Theme) -> Result<(), StorageError> {
        self.preferences.insert(THEME_KEY, theme.as_str().as_bytes())?;
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    #[test]
    fn test_credential_lifecycle() {
        let store = LocalStore::temporary().unwrap();
        assert!(store.credential().unwrap().is_none());

        let key = PrivateKey::parse(KEY).unwrap();
        store.store_credential(&key).unwrap();
        assert_eq!(store.credential().unwrap(), Some(key));

        store.clear_credential().unwrap();
        assert!(store.credential().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_credential() {
        let store = LocalStore::temporary().unwrap();
        store.credentials.insert(CREDENTIAL_KEY, "0x1234".as_bytes()).unwrap();

        let err = store.credential().unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { key: CREDENTIAL_KEY, .. }));
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("dicebot-store-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_credential_stays_out_of_durable_store() {
        let durable = scratch_dir("durable");
        let login = scratch_dir("login");
        let key = PrivateKey::parse(KEY).unwrap();
        {
            let store = LocalStore::open(&durable, &login).unwrap();
            store.store_credential(&key).unwrap();
            store.store_theme(Theme::Dark).unwrap();
            store.store_run_mode(RunMode::Running).unwrap();
            assert_eq!(store.credential().unwrap(), Some(key.clone()));
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&login).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o700);
        }

        // A new login session starts without the key; preferences carry over.
        let next_login = scratch_dir("next-login");
        let store = LocalStore::open(&durable, &next_login).unwrap();
        assert!(store.credential().unwrap().is_none());
        assert_eq!(store.theme().unwrap(), Theme::Dark);
        assert_eq!(store.run_mode().unwrap(), RunMode::Running);
        drop(store);

        for dir in [durable, login, next_login] {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn test_legacy_durable_credential_is_removed() {
        let db = sled::Config::new().temporary(true).open().unwrap();
        db.open_tree(SESSION_TREE)
            .unwrap()
            .insert(CREDENTIAL_KEY, KEY.as_bytes())
            .unwrap();

        let store = LocalStore::from_dbs(db, sled::Config::new().temporary(true).open().unwrap()).unwrap();
        assert!(store.session.get(CREDENTIAL_KEY).unwrap().is_none());
        assert!(store.credential().unwrap().is_none());
    }

    #[test]
    fn test_default_session_dir_name() {
        let dir = default_session_dir();
        let name = dir.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(SESSION_DIR_NAME));
    }

    #[test]
    fn test_theme_defaults_to_light() {
        let store = LocalStore::temporary().unwrap();
        assert_eq!(store.theme().unwrap(), Theme::Light);

        store.store_theme(Theme::Dark).unwrap();
        assert_eq!(store.theme().unwrap(), Theme::Dark);
    }

    #[test]
    fn test_run_mode() {
        let store = LocalStore::temporary().unwrap();
        assert_eq!(store.run_mode().unwrap(), RunMode::Stopped);

        store.store_run_mode(RunMode::Running).unwrap();
        assert_eq!(store.run_mode().unwrap(), RunMode::Running);
    }
}
