//! Demo database context with one entity type.

use autodb_core::{DbConfig, DbContext};

pub struct NotebookContext {
    config: DbConfig,
}

impl NotebookContext {
    pub fn new(config: DbConfig) -> Self {
        Self { config }
    }
}

impl DbContext for NotebookContext {
    fn namespace(&self) -> &'static str {
        module_path!()
    }

    fn config(&self) -> &DbConfig {
        &self.config
    }
}

pub mod entities {
    use autodb_core::{register_entity, Entity, RepoError, RepoResult};
    use rusqlite::types::Value;
    use rusqlite::Row;
    use serde::{Deserialize, Serialize};
    use std::time::{SystemTime, UNIX_EPOCH};
    use uuid::Uuid;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Note {
        pub id: Uuid,
        pub body: String,
        pub created_at_ms: i64,
    }

    impl Note {
        pub fn new(body: impl Into<String>) -> Self {
            let created_at_ms = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |elapsed| {
                    i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
                });
            Self {
                id: Uuid::new_v4(),
                body: body.into(),
                created_at_ms,
            }
        }
    }

    impl Entity for Note {
        const TABLE: &'static str = "notes";
        const KEY_COLUMN: &'static str = "id";
        const COLUMNS: &'static [&'static str] = &["body", "created_at_ms"];
        const CREATE_SQL: &'static str = "CREATE TABLE IF NOT EXISTS notes (
            id TEXT PRIMARY KEY,
            body TEXT NOT NULL,
            created_at_ms INTEGER NOT NULL
        );";

        fn key(&self) -> Value {
            Value::Text(self.id.to_string())
        }

        fn values(&self) -> Vec<Value> {
            vec![
                Value::Text(self.body.clone()),
                Value::Integer(self.created_at_ms),
            ]
        }

        fn from_row(row: &Row<'_>) -> RepoResult<Self> {
            let id: String = row.get("id")?;
            let id = Uuid::parse_str(&id)
                .map_err(|err| RepoError::InvalidData(format!("note id `{id}`: {err}")))?;
            Ok(Self {
                id,
                body: row.get("body")?,
                created_at_ms: row.get("created_at_ms")?,
            })
        }
    }

    register_entity!(Note);
}
