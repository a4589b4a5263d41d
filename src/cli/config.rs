use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SERVER: &str = "http://localhost:3000";
const SESSION_FILE: &str = "session.json";

/// Token saved by `userhub login`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub server: String,
    pub email: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("USERHUB_CLI_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("userhub")
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

pub fn load_session() -> anyhow::Result<Option<Session>> {
    load_session_from(&get_config_dir()?)
}

pub fn save_session(session: &Session) -> anyhow::Result<()> {
    save_session_to(&get_config_dir()?, session)
}

fn load_session_from(dir: &Path) -> anyhow::Result<Option<Session>> {
    let file = dir.join(SESSION_FILE);
    if !file.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(file)?;
    Ok(Some(serde_json::from_str(&content)?))
}

fn save_session_to(dir: &Path, session: &Session) -> anyhow::Result<()> {
    let content = serde_json::to_string_pretty(session)?;
    fs::write(dir.join(SESSION_FILE), content)?;
    Ok(())
}

/// Explicit flag, then the saved session's server, then localhost
pub fn resolve_server(flag: Option<String>, session: Option<&Session>) -> String {
    flag.or_else(|| session.map(|s| s.server.clone()))
        .unwrap_or_else(|| DEFAULT_SERVER.to_string())
        .trim_end_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("userhub-cli-{}-{}", name, uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn session_survives_save_and_load() {
        let dir = scratch_dir("session");
        let session = Session {
            server: "http://localhost:9000".to_string(),
            email: "admin@example.com".to_string(),
            token: "abc.def.ghi".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        };

        assert_eq!(load_session_from(&dir).unwrap(), None);
        save_session_to(&dir, &session).unwrap();
        assert_eq!(load_session_from(&dir).unwrap(), Some(session));

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn server_resolution_prefers_flag() {
        let session = Session {
            server: "http://saved:1".to_string(),
            email: String::new(),
            token: String::new(),
            expires_at: Utc::now() - Duration::hours(1),
        };
        assert!(session.is_expired());
        assert_eq!(resolve_server(Some("http://flag:2/".into()), Some(&session)), "http://flag:2");
        assert_eq!(resolve_server(None, Some(&session)), "http://saved:1");
        assert_eq!(resolve_server(None, None), DEFAULT_SERVER);
    }
}
