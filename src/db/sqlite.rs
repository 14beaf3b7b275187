use crate::config::Config;
use crate::db::models::{Item, ItemChanges, NewItem};
use crate::db::schema::SQLITE_INIT;
use crate::error::ItemsError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

pub type SqlitePool = Pool<Sqlite>;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Pooled access to the `items` table. Cloning shares the pool.
#[derive(Clone)]
pub struct ItemsStorage {
    pool: SqlitePool,
    query_timeout: Duration,
}

impl ItemsStorage {
    pub fn new(pool: SqlitePool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }

    /// Open the pool described by `cfg` and make sure the schema exists.
    pub async fn connect(cfg: &Config) -> Result<Self, ItemsError> {
        let connect_opts = SqliteConnectOptions::from_str(cfg.database_url.as_str())?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(cfg.max_connections)
            .acquire_timeout(cfg.query_timeout())
            .connect_with(connect_opts)
            .await?;
        info!(
            database_url = %cfg.database_url,
            max_connections = cfg.max_connections,
            "opened sqlite pool"
        );

        let storage = Self::new(pool, cfg.query_timeout());
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), ItemsError> {
        // sqlx::query runs one statement at a time
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<Item>, ItemsError> {
        self.bounded(async {
            let items = sqlx::query_as::<_, Item>(
                "SELECT id, name, description FROM items ORDER BY id",
            )
            .fetch_all(&self.pool)
            .await?;
            Ok(items)
        })
        .await
    }

    pub async fn get(&self, id: i64) -> Result<Item, ItemsError> {
        self.bounded(async {
            sqlx::query_as::<_, Item>("SELECT id, name, description FROM items WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(ItemsError::NotFound(id))
        })
        .await
    }

    /// Insert a row. A `None` id lets SQLite assign the next rowid.
    pub async fn insert(&self, item: NewItem) -> Result<Item, ItemsError> {
        let requested_id = item.id;
        self.bounded(async {
            let result = sqlx::query_as::<_, Item>(
                r#"INSERT INTO items (id, name, description) VALUES (?, ?, ?)
                   RETURNING id, name, description"#,
            )
            .bind(requested_id)
            .bind(item.name)
            .bind(item.description)
            .fetch_one(&self.pool)
            .await;

            match result {
                Ok(created) => {
                    debug!(id = created.id, "inserted item");
                    Ok(created)
                }
                Err(sqlx::Error::Database(db_err)) => match requested_id {
                    Some(id) if db_err.is_unique_violation() => Err(ItemsError::Conflict(id)),
                    _ => Err(sqlx::Error::Database(db_err).into()),
                },
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    /// Overwrite the supplied fields of row `id` and return the result.
    pub async fn update(&self, id: i64, changes: ItemChanges) -> Result<Item, ItemsError> {
        if changes.is_empty() {
            return self.get(id).await;
        }
        self.bounded(async {
            let updated = sqlx::query_as::<_, Item>(
                r#"UPDATE items SET
                     name = COALESCE(?, name),
                     description = COALESCE(?, description)
                   WHERE id = ?
                   RETURNING id, name, description"#,
            )
            .bind(changes.name)
            .bind(changes.description)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ItemsError::NotFound(id))?;
            debug!(id, "updated item");
            Ok(updated)
        })
        .await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ItemsError> {
        self.bounded(async {
            let done = sqlx::query("DELETE FROM items WHERE id = ?")
                .bind(id)
                .execute(&self.pool)
                .await?;
            if done.rows_affected() == 0 {
                return Err(ItemsError::NotFound(id));
            }
            debug!(id, "deleted item");
            Ok(())
        })
        .await
    }

    /// Wait for checked-out connections to return, then close them all.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("sqlite pool closed");
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T, ItemsError>
    where
        F: Future<Output = Result<T, ItemsError>>,
    {
        match tokio::time::timeout(self.query_timeout, op).await {
            Ok(Err(ItemsError::Database(sqlx::Error::PoolTimedOut))) | Err(_) => {
                Err(ItemsError::Timeout)
            }
            Ok(res) => res,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_storage() -> ItemsStorage {
        let cfg = Config {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
            ..Config::default()
        };
        ItemsStorage::connect(&cfg)
            .await
            .expect("in-memory storage should open")
    }

    fn new_item(id: Option<i64>, name: &str, description: &str) -> NewItem {
        NewItem {
            id,
            name: name.to_string(),
            description: description.to_string(),
        }
    }

    #[tokio::test]
    async fn insert_keeps_client_id_and_assigns_missing_one() {
        let storage = memory_storage().await;
        let chosen = storage
            .insert(new_item(Some(42), "widget", "a widget"))
            .await
            .unwrap();
        assert_eq!(chosen.id, 42);

        let assigned = storage
            .insert(new_item(None, "gadget", "a gadget"))
            .await
            .unwrap();
        assert_eq!(assigned.id, 43);

        let ids: Vec<i64> = storage.list().await.unwrap().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![42, 43]);
    }

    #[tokio::test]
    async fn duplicate_id_is_a_conflict() {
        let storage = memory_storage().await;
        storage.insert(new_item(Some(1), "a", "first")).await.unwrap();
        let err = storage
            .insert(new_item(Some(1), "b", "second"))
            .await
            .unwrap_err();
        assert!(matches!(err, ItemsError::Conflict(1)));
        assert_eq!(storage.get(1).await.unwrap().description, "first");
    }

    #[tokio::test]
    async fn unique_violation_without_client_id_is_not_a_conflict() {
        let storage = memory_storage().await;
        sqlx::query("CREATE UNIQUE INDEX idx_items_name ON items(name)")
            .execute(&storage.pool)
            .await
            .unwrap();
        storage.insert(new_item(None, "same", "first")).await.unwrap();
        let err = storage
            .insert(new_item(None, "same", "second"))
            .await
            .unwrap_err();
        assert!(matches!(err, ItemsError::Database(_)));
    }

    #[tokio::test]
    async fn quotes_are_stored_verbatim() {
        let storage = memory_storage().await;
        let name = "O'Brien\"); DROP TABLE items; --";
        let created = storage.insert(new_item(None, name, "it's")).await.unwrap();
        let fetched = storage.get(created.id).await.unwrap();
        assert_eq!(fetched.name, name);
        assert_eq!(fetched.description, "it's");
    }

    #[tokio::test]
    async fn partial_update_keeps_other_fields() {
        let storage = memory_storage().await;
        storage.insert(new_item(Some(5), "widget", "old")).await.unwrap();
        let updated = storage
            .update(
                5,
                ItemChanges {
                    description: Some("new".to_string()),
                    ..ItemChanges::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(
            updated,
            Item {
                id: 5,
                name: "widget".to_string(),
                description: "new".to_string()
            }
        );
    }

    #[tokio::test]
    async fn missing_rows_are_not_found() {
        let storage = memory_storage().await;
        assert!(matches!(storage.get(9).await, Err(ItemsError::NotFound(9))));
        assert!(matches!(
            storage.update(9, ItemChanges::default()).await,
            Err(ItemsError::NotFound(9))
        ));
        assert!(matches!(
            storage
                .update(
                    9,
                    ItemChanges {
                        name: Some("x".into()),
                        ..ItemChanges::default()
                    }
                )
                .await,
            Err(ItemsError::NotFound(9))
        ));
        assert!(matches!(storage.delete(9).await, Err(ItemsError::NotFound(9))));
    }

    #[tokio::test]
    async fn delete_removes_row() {
        let storage = memory_storage().await;
        storage.insert(new_item(Some(3), "a", "b")).await.unwrap();
        storage.delete(3).await.unwrap();
        assert!(storage.list().await.unwrap().is_empty());
    }
}
