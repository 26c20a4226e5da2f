mod common;

use autodb_core::db::migrations::{current_user_version, latest_version};
use autodb_core::db::{open_db, open_db_in_memory};
use autodb_core::{DbConfig, DbContext, DbError, Migration};
use common::shop::{ShopContext, SHOP_MIGRATIONS};

const LEDGER: &[Migration] = &[
    Migration {
        version: 1,
        sql: "CREATE TABLE ledger (id INTEGER PRIMARY KEY, amount INTEGER NOT NULL);",
    },
    Migration {
        version: 2,
        sql: "ALTER TABLE ledger ADD COLUMN memo TEXT;",
    },
];

#[test]
fn in_memory_open_applies_every_step() {
    let conn = open_db_in_memory(LEDGER).unwrap();
    assert_eq!(current_user_version(&conn).unwrap(), latest_version(LEDGER));
    conn.execute("INSERT INTO ledger (amount, memo) VALUES (5, 'tip')", [])
        .unwrap();
}

#[test]
fn reopening_a_file_skips_applied_steps() {
    let (_dir, config) = common::temp_config();
    drop(open_db(&config, &LEDGER[..1]).unwrap());

    let conn = open_db(&config, LEDGER).unwrap();
    assert_eq!(current_user_version(&conn).unwrap(), 2);

    drop(conn);
    let conn = open_db(&config, LEDGER).unwrap();
    assert_eq!(current_user_version(&conn).unwrap(), 2);
}

#[test]
fn newer_database_is_rejected() {
    let (_dir, config) = common::temp_config();
    drop(open_db(&config, LEDGER).unwrap());

    let err = open_db(&config, &LEDGER[..1]).unwrap_err();
    assert!(matches!(
        err,
        DbError::UnsupportedSchemaVersion {
            db_version: 2,
            latest_supported: 1
        }
    ));
}

#[test]
fn context_open_applies_its_own_migrations() {
    let (_dir, config) = common::temp_config();
    let context = ShopContext::new(config);

    let conn = context.open().unwrap();
    assert_eq!(
        current_user_version(&conn).unwrap(),
        latest_version(SHOP_MIGRATIONS)
    );
}

#[test]
fn connection_pragmas_follow_config() {
    let (_dir, config) = common::temp_config();
    let config: DbConfig = config.with_foreign_keys(false).with_busy_timeout_ms(1_234);

    let conn = open_db(&config, &[]).unwrap();
    let foreign_keys: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    let busy_timeout: i64 = conn
        .query_row("PRAGMA busy_timeout;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(foreign_keys, 0);
    assert_eq!(busy_timeout, 1_234);
}
