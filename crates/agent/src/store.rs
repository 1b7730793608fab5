// Session persistence using SQLite

use std::path::Path;

use rusqlite::{params, Connection};

use crate::state::ConversationState;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
    thread_id TEXT PRIMARY KEY,
    state TEXT NOT NULL,       -- ConversationState as JSON
    updated_at TEXT NOT NULL   -- RFC 3339
);
"#;

/// One ConversationState per thread id. Entries never expire; lifecycle is
/// caller-managed.
pub struct SessionStore {
    conn: Connection,
}

impl SessionStore {
    pub fn open(path: &Path) -> Result<Self, String> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
            }
        }
        let conn = Connection::open(path).map_err(|e| e.to_string())?;
        conn.execute_batch(SCHEMA).map_err(|e| e.to_string())?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, String> {
        let conn = Connection::open_in_memory().map_err(|e| e.to_string())?;
        conn.execute_batch(SCHEMA).map_err(|e| e.to_string())?;
        Ok(Self { conn })
    }

    /// Default store path (~/.local/share/tablepilot/sessions.db or platform
    /// equivalent).
    pub fn default_path() -> std::path::PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| std::path::PathBuf::from("."))
            .join("tablepilot")
            .join("sessions.db")
    }

    pub fn save(&self, thread_id: &str, state: &ConversationState) -> Result<(), String> {
        let json = serde_json::to_string(state).map_err(|e| e.to_string())?;
        self.conn
            .execute(
                "INSERT INTO sessions (thread_id, state, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(thread_id) DO UPDATE SET state = ?2, updated_at = ?3",
                params![thread_id, json, chrono::Utc::now().to_rfc3339()],
            )
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    pub fn load(&self, thread_id: &str) -> Result<Option<ConversationState>, String> {
        let mut stmt = self
            .conn
            .prepare("SELECT state FROM sessions WHERE thread_id = ?1")
            .map_err(|e| e.to_string())?;
        let mut rows = stmt.query(params![thread_id]).map_err(|e| e.to_string())?;

        match rows.next().map_err(|e| e.to_string())? {
            Some(row) => {
                let json: String = row.get(0).map_err(|e| e.to_string())?;
                let state = serde_json::from_str(&json).map_err(|e| e.to_string())?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    /// All known thread ids, most recently updated first.
    pub fn threads(&self) -> Result<Vec<String>, String> {
        let mut stmt = self
            .conn
            .prepare("SELECT thread_id FROM sessions ORDER BY updated_at DESC")
            .map_err(|e| e.to_string())?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| e.to_string())?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| e.to_string())?;
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    #[test]
    fn test_load_unknown_thread_is_none() {
        let store = SessionStore::open_in_memory().unwrap();
        assert_eq!(store.load("nope").unwrap(), None);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let store = SessionStore::open_in_memory().unwrap();

        let mut state = ConversationState::default();
        state.push_message(Message::user("hello"));
        state.dataset_path = Some("d.csv".into());
        store.save("t1", &state).unwrap();

        let loaded = store.load("t1").unwrap().unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_save_overwrites_existing_thread() {
        let store = SessionStore::open_in_memory().unwrap();

        let mut state = ConversationState::default();
        state.push_message(Message::user("first"));
        store.save("t1", &state).unwrap();

        state.push_message(Message::assistant("second"));
        store.save("t1", &state).unwrap();

        let loaded = store.load("t1").unwrap().unwrap();
        assert_eq!(loaded.messages.len(), 2);
    }

    #[test]
    fn test_threads_are_independent() {
        let store = SessionStore::open_in_memory().unwrap();

        let mut a = ConversationState::default();
        a.push_message(Message::user("a"));
        store.save("ta", &a).unwrap();

        let mut b = ConversationState::default();
        b.push_message(Message::user("b"));
        b.push_message(Message::assistant("b2"));
        store.save("tb", &b).unwrap();

        assert_eq!(store.load("ta").unwrap().unwrap().messages.len(), 1);
        assert_eq!(store.load("tb").unwrap().unwrap().messages.len(), 2);
        assert_eq!(store.threads().unwrap().len(), 2);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.db");

        {
            let store = SessionStore::open(&path).unwrap();
            let mut state = ConversationState::default();
            state.push_message(Message::user("durable"));
            store.save("t1", &state).unwrap();
        }

        let store = SessionStore::open(&path).unwrap();
        let loaded = store.load("t1").unwrap().unwrap();
        assert_eq!(loaded.messages[0].content, "durable");
    }
}
