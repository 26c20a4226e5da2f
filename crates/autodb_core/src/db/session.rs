//! Short-lived database session with staged entity writes.
//!
//! # Responsibility
//! - Hold one connection for the duration of a single repository call.
//! - Stage inserts/updates/deletes and commit them in one transaction.
//!
//! # Invariants
//! - Staging stores a detached copy, never the caller's instance.
//! - `commit` reports the number of rows affected by all staged writes.
//! - Dropping a session releases its connection; uncommitted writes are lost.

use crate::db::DbContext;
use crate::model::entity::{detach, Entity};
use crate::repo::RepoResult;
use crate::sql::quote_ident;
use rusqlite::{params_from_iter, Connection, Transaction};

/// Pending write kind of a staged entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    Added,
    Modified,
    Deleted,
}

impl EntityState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
        }
    }
}

trait StagedWrite: Send {
    fn state(&self) -> EntityState;
    fn apply(&self, tx: &Transaction<'_>) -> rusqlite::Result<usize>;
}

struct Staged<E> {
    state: EntityState,
    entity: E,
}

impl<E: Entity> StagedWrite for Staged<E> {
    fn state(&self) -> EntityState {
        self.state
    }

    fn apply(&self, tx: &Transaction<'_>) -> rusqlite::Result<usize> {
        match self.state {
            EntityState::Added => {
                let mut values = Vec::with_capacity(E::COLUMNS.len() + 1);
                values.push(self.entity.key());
                values.extend(self.entity.values());
                tx.execute(&insert_sql::<E>(), params_from_iter(values))
            }
            EntityState::Modified => {
                let Some(sql) = update_sql::<E>() else {
                    return Ok(0);
                };
                let mut values = self.entity.values();
                values.push(self.entity.key());
                tx.execute(&sql, params_from_iter(values))
            }
            EntityState::Deleted => tx.execute(&delete_sql::<E>(), [self.entity.key()]),
        }
    }
}

/// One connection plus the writes staged against it.
pub struct DbSession {
    conn: Connection,
    staged: Vec<Box<dyn StagedWrite>>,
}

impl DbSession {
    /// Opens a fresh connection through `context`.
    pub fn open(context: &dyn DbContext) -> RepoResult<Self> {
        Ok(Self {
            conn: context.open()?,
            staged: Vec::new(),
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Stages a detached copy of `entity` for the given write.
    pub fn stage<E: Entity>(&mut self, entity: &E, state: EntityState) -> RepoResult<()> {
        let entity = detach(entity)?;
        self.staged.push(Box::new(Staged { state, entity }));
        Ok(())
    }

    pub fn staged_count(&self) -> usize {
        self.staged.len()
    }

    /// Returns how many staged writes are in `state`.
    pub fn staged_in(&self, state: EntityState) -> usize {
        self.staged
            .iter()
            .filter(|write| write.state() == state)
            .count()
    }

    /// Applies every staged write in one transaction.
    ///
    /// Returns the total rows affected. The staged list is emptied whether or
    /// not the commit succeeds; a failed commit rolls back completely.
    pub fn commit(&mut self) -> RepoResult<usize> {
        let staged = std::mem::take(&mut self.staged);
        if staged.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.transaction()?;
        let mut affected = 0;
        for write in &staged {
            affected += write.apply(&tx)?;
        }
        tx.commit()?;
        Ok(affected)
    }
}

fn insert_sql<E: Entity>() -> String {
    let columns = std::iter::once(E::KEY_COLUMN)
        .chain(E::COLUMNS.iter().copied())
        .map(quote_ident)
        .collect::<Vec<_>>();
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({placeholders});",
        quote_ident(E::TABLE),
        columns.join(", ")
    )
}

/// `None` for key-only entities: there is nothing to update.
fn update_sql<E: Entity>() -> Option<String> {
    if E::COLUMNS.is_empty() {
        return None;
    }
    let assignments = E::COLUMNS
        .iter()
        .map(|column| format!("{} = ?", quote_ident(column)))
        .collect::<Vec<_>>();
    Some(format!(
        "UPDATE {} SET {} WHERE {} = ?;",
        quote_ident(E::TABLE),
        assignments.join(", "),
        quote_ident(E::KEY_COLUMN)
    ))
}

fn delete_sql<E: Entity>() -> String {
    format!(
        "DELETE FROM {} WHERE {} = ?;",
        quote_ident(E::TABLE),
        quote_ident(E::KEY_COLUMN)
    )
}

#[cfg(test)]
mod tests {
    use super::{delete_sql, insert_sql, update_sql, DbSession, EntityState};
    use crate::config::DbConfig;
    use crate::db::DbContext;
    use crate::model::entity::Entity;
    use crate::repo::RepoResult;
    use rusqlite::types::Value;
    use rusqlite::Row;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Sensor {
        id: i64,
        label: String,
        reading: f64,
    }

    impl Entity for Sensor {
        const TABLE: &'static str = "sensors";
        const KEY_COLUMN: &'static str = "id";
        const COLUMNS: &'static [&'static str] = &["label", "reading"];
        const CREATE_SQL: &'static str = "CREATE TABLE IF NOT EXISTS sensors (
            id INTEGER PRIMARY KEY,
            label TEXT NOT NULL,
            reading REAL NOT NULL
        );";

        fn key(&self) -> Value {
            Value::Integer(self.id)
        }

        fn values(&self) -> Vec<Value> {
            vec![Value::Text(self.label.clone()), Value::Real(self.reading)]
        }

        fn from_row(row: &Row<'_>) -> RepoResult<Self> {
            Ok(Self {
                id: row.get("id")?,
                label: row.get("label")?,
                reading: row.get("reading")?,
            })
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Tag {
        id: i64,
    }

    impl Entity for Tag {
        const TABLE: &'static str = "tags";
        const KEY_COLUMN: &'static str = "id";
        const COLUMNS: &'static [&'static str] = &[];
        const CREATE_SQL: &'static str = "CREATE TABLE IF NOT EXISTS tags (id INTEGER PRIMARY KEY);";

        fn key(&self) -> Value {
            Value::Integer(self.id)
        }

        fn values(&self) -> Vec<Value> {
            Vec::new()
        }

        fn from_row(row: &Row<'_>) -> RepoResult<Self> {
            Ok(Self { id: row.get("id")? })
        }
    }

    struct FileContext {
        config: DbConfig,
    }

    impl DbContext for FileContext {
        fn namespace(&self) -> &'static str {
            module_path!()
        }

        fn config(&self) -> &DbConfig {
            &self.config
        }
    }

    fn context(dir: &tempfile::TempDir) -> FileContext {
        let context = FileContext {
            config: DbConfig::new(dir.path().join("session.db")),
        };
        context
            .open()
            .unwrap()
            .execute_batch(&format!("{}\n{}", Sensor::CREATE_SQL, Tag::CREATE_SQL))
            .unwrap();
        context
    }

    #[test]
    fn generated_sql_quotes_identifiers_in_column_order() {
        assert_eq!(
            insert_sql::<Sensor>(),
            "INSERT INTO \"sensors\" (\"id\", \"label\", \"reading\") VALUES (?, ?, ?);"
        );
        assert_eq!(
            update_sql::<Sensor>().as_deref(),
            Some("UPDATE \"sensors\" SET \"label\" = ?, \"reading\" = ? WHERE \"id\" = ?;")
        );
        assert_eq!(update_sql::<Tag>(), None);
        assert_eq!(
            delete_sql::<Sensor>(),
            "DELETE FROM \"sensors\" WHERE \"id\" = ?;"
        );
    }

    #[test]
    fn staged_copy_is_unaffected_by_later_caller_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let context = context(&dir);

        let mut sensor = Sensor {
            id: 7,
            label: "boiler".to_string(),
            reading: 71.5,
        };
        let mut session = DbSession::open(&context).unwrap();
        session.stage(&sensor, EntityState::Added).unwrap();
        sensor.label = "mutated after staging".to_string();

        assert_eq!(session.commit().unwrap(), 1);

        let label: String = session
            .connection()
            .query_row("SELECT label FROM sensors WHERE id = 7;", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(label, "boiler");
    }

    #[test]
    fn commit_applies_all_writes_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let context = context(&dir);
        let sensor = Sensor {
            id: 1,
            label: "intake".to_string(),
            reading: 1.0,
        };

        let mut session = DbSession::open(&context).unwrap();
        session.stage(&sensor, EntityState::Added).unwrap();
        session.stage(&sensor, EntityState::Added).unwrap();
        assert_eq!(session.staged_in(EntityState::Added), 2);
        assert!(session.commit().is_err());
        assert_eq!(session.staged_count(), 0);

        let rows: i64 = session
            .connection()
            .query_row("SELECT COUNT(*) FROM sensors;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 0);
    }

    #[test]
    fn commit_without_staged_writes_affects_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let context = context(&dir);
        let mut session = DbSession::open(&context).unwrap();
        assert_eq!(session.commit().unwrap(), 0);
    }

    #[test]
    fn modifying_a_key_only_entity_changes_no_rows() {
        let dir = tempfile::tempdir().unwrap();
        let context = context(&dir);
        let tag = Tag { id: 3 };

        let mut session = DbSession::open(&context).unwrap();
        session.stage(&tag, EntityState::Added).unwrap();
        assert_eq!(session.commit().unwrap(), 1);

        session.stage(&tag, EntityState::Modified).unwrap();
        assert_eq!(session.commit().unwrap(), 0);

        session.stage(&tag, EntityState::Deleted).unwrap();
        assert_eq!(session.commit().unwrap(), 1);
    }
}
