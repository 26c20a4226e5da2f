#![allow(dead_code)]

use autodb_core::DbConfig;
use tempfile::TempDir;

/// Fresh database file in its own temporary directory.
pub fn temp_config() -> (TempDir, DbConfig) {
    let dir = tempfile::tempdir().unwrap();
    let config = DbConfig::new(dir.path().join("shop.db"));
    (dir, config)
}

pub mod shop {
    use autodb_core::{DbConfig, DbContext, Migration};

    pub static SHOP_MIGRATIONS: &[Migration] = &[Migration {
        version: 1,
        sql: "CREATE TABLE IF NOT EXISTS shop_settings (key TEXT PRIMARY KEY, value TEXT NOT NULL);",
    }];

    pub struct ShopContext {
        config: DbConfig,
    }

    impl ShopContext {
        pub fn new(config: DbConfig) -> Self {
            Self { config }
        }
    }

    impl DbContext for ShopContext {
        fn namespace(&self) -> &'static str {
            module_path!()
        }

        fn config(&self) -> &DbConfig {
            &self.config
        }

        fn migrations(&self) -> &'static [Migration] {
            SHOP_MIGRATIONS
        }
    }

    pub mod entities {
        use autodb_core::{register_entity, Entity, RepoResult};
        use rusqlite::types::Value;
        use rusqlite::Row;
        use serde::{Deserialize, Serialize};

        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub struct Customer {
            pub id: i64,
            pub name: String,
            pub tier: String,
            /// Filled by extenders, not stored.
            #[serde(default)]
            pub order_count: u32,
        }

        impl Customer {
            pub fn new(id: i64, name: &str, tier: &str) -> Self {
                Self {
                    id,
                    name: name.to_string(),
                    tier: tier.to_string(),
                    order_count: 0,
                }
            }
        }

        impl Entity for Customer {
            const TABLE: &'static str = "customers";
            const KEY_COLUMN: &'static str = "id";
            const COLUMNS: &'static [&'static str] = &["name", "tier"];
            const CREATE_SQL: &'static str = "CREATE TABLE IF NOT EXISTS customers (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                tier TEXT NOT NULL
            );";

            fn key(&self) -> Value {
                Value::Integer(self.id)
            }

            fn values(&self) -> Vec<Value> {
                vec![
                    Value::Text(self.name.clone()),
                    Value::Text(self.tier.clone()),
                ]
            }

            fn from_row(row: &Row<'_>) -> RepoResult<Self> {
                Ok(Self {
                    id: row.get("id")?,
                    name: row.get("name")?,
                    tier: row.get("tier")?,
                    order_count: 0,
                })
            }
        }

        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub struct Order {
            pub id: i64,
            pub customer_id: i64,
            pub total_cents: i64,
        }

        impl Entity for Order {
            const TABLE: &'static str = "orders";
            const KEY_COLUMN: &'static str = "id";
            const COLUMNS: &'static [&'static str] = &["customer_id", "total_cents"];
            const CREATE_SQL: &'static str = "CREATE TABLE IF NOT EXISTS orders (
                id INTEGER PRIMARY KEY,
                customer_id INTEGER NOT NULL,
                total_cents INTEGER NOT NULL
            );";

            fn key(&self) -> Value {
                Value::Integer(self.id)
            }

            fn values(&self) -> Vec<Value> {
                vec![
                    Value::Integer(self.customer_id),
                    Value::Integer(self.total_cents),
                ]
            }

            fn from_row(row: &Row<'_>) -> RepoResult<Self> {
                Ok(Self {
                    id: row.get("id")?,
                    customer_id: row.get("customer_id")?,
                    total_cents: row.get("total_cents")?,
                })
            }
        }

        register_entity!(Customer);
        register_entity!(Order);

        /// Registered one module too deep for the shop scan.
        pub mod archive {
            use autodb_core::{register_entity, Entity, RepoResult};
            use rusqlite::types::Value;
            use rusqlite::Row;
            use serde::{Deserialize, Serialize};

            #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
            pub struct Invoice {
                pub id: i64,
                pub number: String,
            }

            impl Entity for Invoice {
                const TABLE: &'static str = "invoices";
                const KEY_COLUMN: &'static str = "id";
                const COLUMNS: &'static [&'static str] = &["number"];
                const CREATE_SQL: &'static str = "CREATE TABLE IF NOT EXISTS invoices (
                    id INTEGER PRIMARY KEY,
                    number TEXT NOT NULL
                );";

                fn key(&self) -> Value {
                    Value::Integer(self.id)
                }

                fn values(&self) -> Vec<Value> {
                    vec![Value::Text(self.number.clone())]
                }

                fn from_row(row: &Row<'_>) -> RepoResult<Self> {
                    Ok(Self {
                        id: row.get("id")?,
                        number: row.get("number")?,
                    })
                }
            }

            register_entity!(Invoice);
        }
    }
}

/// A context whose module declares no entity types.
pub mod bare {
    use autodb_core::{DbConfig, DbContext};

    pub struct BareContext {
        config: DbConfig,
    }

    impl BareContext {
        pub fn new(config: DbConfig) -> Self {
            Self { config }
        }
    }

    impl DbContext for BareContext {
        fn namespace(&self) -> &'static str {
            module_path!()
        }

        fn config(&self) -> &DbConfig {
            &self.config
        }
    }
}
