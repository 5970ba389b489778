//! SQLite repository implementation.
//!
//! Implements `UserRepository` from `usercache_core::storage` using SQLite.

use async_trait::async_trait;
use tokio_rusqlite::Connection;

use usercache_core::storage::{RepositoryError, Result, UserRepository};
use usercache_core::users::{NewUser, User};

use super::conversions::{new_users_to_params, row_to_user};
use super::error::map_tokio_rusqlite_error;
use super::schema;

/// Helper to wrap rusqlite errors for tokio_rusqlite closures.
fn wrap_err(e: rusqlite::Error) -> tokio_rusqlite::Error {
    tokio_rusqlite::Error::Rusqlite(e)
}

/// SQLite-based repository implementation.
///
/// All statements run on the dedicated `tokio-rusqlite` connection thread.
pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    /// Creates a new repository with a file-based database.
    ///
    /// The database file will be created if it doesn't exist.
    /// Schema tables are created automatically.
    pub async fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;

        Self::init_schema(&conn).await?;

        Ok(Self { conn })
    }

    /// Creates a new repository with an in-memory database.
    ///
    /// Useful for testing - data is lost when the connection is dropped.
    #[cfg(test)]
    pub async fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;

        Self::init_schema(&conn).await?;

        Ok(Self { conn })
    }

    /// Initialize the database schema.
    async fn init_schema(conn: &Connection) -> Result<()> {
        conn.call(|conn| {
            conn.execute_batch(schema::CREATE_TABLES)
                .map_err(wrap_err)?;
            Ok(())
        })
        .await
        .map_err(map_tokio_rusqlite_error)
    }
}

#[async_trait]
impl UserRepository for SqliteRepository {
    async fn find_all(&self) -> Result<Vec<User>> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare(schema::SELECT_ALL_USERS).map_err(wrap_err)?;
                let rows = stmt.query_map([], row_to_user).map_err(wrap_err)?;

                let mut users = Vec::new();
                for row_result in rows {
                    users.push(row_result.map_err(wrap_err)?);
                }
                Ok(users)
            })
            .await
            .map_err(map_tokio_rusqlite_error)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(schema::SELECT_USER_BY_ID).map_err(wrap_err)?;
                match stmt.query_row([id], row_to_user) {
                    Ok(user) => Ok(Some(user)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(wrap_err(e)),
                }
            })
            .await
            .map_err(map_tokio_rusqlite_error)
    }

    async fn find_by_name(&self, name: &str) -> Result<Vec<User>> {
        let name = name.to_string();

        self.conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(schema::SELECT_USERS_BY_NAME)
                    .map_err(wrap_err)?;
                let rows = stmt.query_map([&name], row_to_user).map_err(wrap_err)?;

                let mut users = Vec::new();
                for row_result in rows {
                    users.push(row_result.map_err(wrap_err)?);
                }
                Ok(users)
            })
            .await
            .map_err(map_tokio_rusqlite_error)
    }

    async fn update_name(&self, id: i64, name: &str) -> Result<u64> {
        let name = name.to_string();

        self.conn
            .call(move |conn| {
                let rows = conn
                    .execute(schema::UPDATE_USER_NAME, rusqlite::params![id, name])
                    .map_err(wrap_err)?;
                Ok(rows as u64)
            })
            .await
            .map_err(map_tokio_rusqlite_error)
    }

    async fn delete(&self, id: i64) -> Result<u64> {
        self.conn
            .call(move |conn| {
                let rows = conn
                    .execute(schema::DELETE_USER, [id])
                    .map_err(wrap_err)?;
                Ok(rows as u64)
            })
            .await
            .map_err(map_tokio_rusqlite_error)
    }

    async fn insert_batch(&self, rows: &[NewUser]) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let chunks: Vec<Vec<String>> = rows
            .chunks(schema::BULK_INSERT_CHUNK)
            .map(new_users_to_params)
            .collect();

        self.conn
            .call(move |conn| {
                // One transaction: either every chunk lands or none does.
                let tx = conn.transaction().map_err(wrap_err)?;
                let mut inserted = 0u64;
                for params in &chunks {
                    let sql = schema::bulk_insert_users(params.len() / schema::BULK_INSERT_COLUMNS);
                    let rows = tx
                        .execute(&sql, rusqlite::params_from_iter(params.iter()))
                        .map_err(wrap_err)?;
                    inserted += rows as u64;
                }
                tx.commit().map_err(wrap_err)?;
                Ok(inserted)
            })
            .await
            .map_err(map_tokio_rusqlite_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    async fn setup() -> SqliteRepository {
        SqliteRepository::new_in_memory()
            .await
            .expect("Failed to create in-memory database")
    }

    fn new_user(name: &str) -> NewUser {
        User::pending(name)
            .with_date_added(Utc.with_ymd_and_hms(2024, 6, 15, 10, 30, 0).unwrap())
            .to_new_user()
    }

    #[tokio::test]
    async fn test_insert_batch_and_find_all() {
        let repo = setup().await;
        let rows = vec![new_user("Ada"), new_user("Grace"), new_user("Linus")];

        let inserted = repo.insert_batch(&rows).await.unwrap();
        assert_eq!(inserted, 3);

        let users = repo.find_all().await.unwrap();
        assert_eq!(users.len(), 3);
        let names: Vec<&str> = users.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Ada", "Grace", "Linus"]);
        assert!(users.iter().all(User::is_committed));
        assert_eq!(users[0].external_id, rows[0].external_id);
        assert_eq!(users[0].date_added, rows[0].date_added);
    }

    #[tokio::test]
    async fn test_insert_batch_empty_is_noop() {
        let repo = setup().await;
        assert_eq!(repo.insert_batch(&[]).await.unwrap(), 0);
        assert!(repo.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_batch_redelivery_is_ignored() {
        let repo = setup().await;
        let rows = vec![new_user("Ada"), new_user("Grace")];

        assert_eq!(repo.insert_batch(&rows).await.unwrap(), 2);

        // Same batch again, plus one new row.
        let mut redelivered = rows.clone();
        redelivered.push(new_user("Linus"));
        assert_eq!(repo.insert_batch(&redelivered).await.unwrap(), 1);

        assert_eq!(repo.find_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_insert_batch_spans_multiple_chunks() {
        let repo = setup().await;
        let rows: Vec<NewUser> = (0..schema::BULK_INSERT_CHUNK + 10)
            .map(|i| new_user(&format!("user-{i}")))
            .collect();

        let inserted = repo.insert_batch(&rows).await.unwrap();

        assert_eq!(inserted as usize, rows.len());
        assert_eq!(repo.find_all().await.unwrap().len(), rows.len());
    }

    #[tokio::test]
    async fn test_find_by_id() {
        let repo = setup().await;
        repo.insert_batch(&[new_user("Ada")]).await.unwrap();
        let id = repo.find_all().await.unwrap()[0].id.unwrap();

        let found = repo.find_by_id(id).await.unwrap();
        assert_eq!(found.map(|u| u.name), Some("Ada".to_string()));

        assert!(repo.find_by_id(id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_by_name_exact_match() {
        let repo = setup().await;
        repo.insert_batch(&[new_user("Ada"), new_user("Ada Lovelace"), new_user("Ada")])
            .await
            .unwrap();

        let found = repo.find_by_name("Ada").await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|u| u.name == "Ada"));

        assert!(repo.find_by_name("ada").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_by_name_binds_input() {
        let repo = setup().await;
        repo.insert_batch(&[new_user("Ada")]).await.unwrap();

        let found = repo.find_by_name("' OR '1'='1").await.unwrap();
        assert!(found.is_empty());
        assert_eq!(repo.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_name_reports_affected_rows() {
        let repo = setup().await;
        repo.insert_batch(&[new_user("Ada")]).await.unwrap();
        let id = repo.find_all().await.unwrap()[0].id.unwrap();

        assert_eq!(repo.update_name(id, "Ada Lovelace").await.unwrap(), 1);
        assert_eq!(
            repo.find_by_id(id).await.unwrap().unwrap().name,
            "Ada Lovelace"
        );

        assert_eq!(repo.update_name(id + 100, "Nobody").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_reports_affected_rows() {
        let repo = setup().await;
        repo.insert_batch(&[new_user("Ada")]).await.unwrap();
        let id = repo.find_all().await.unwrap()[0].id.unwrap();

        assert_eq!(repo.delete(id).await.unwrap(), 1);
        assert_eq!(repo.delete(id).await.unwrap(), 0);
        assert!(repo.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ids_are_not_reused_after_delete() {
        let repo = setup().await;
        repo.insert_batch(&[new_user("Ada")]).await.unwrap();
        let first = repo.find_all().await.unwrap()[0].id.unwrap();
        repo.delete(first).await.unwrap();

        repo.insert_batch(&[new_user("Grace")]).await.unwrap();
        let second = repo.find_all().await.unwrap()[0].id.unwrap();

        assert!(second > first);
    }

    #[tokio::test]
    async fn test_file_database_persists_between_connections() {
        let path = std::env::temp_dir().join(format!("usercache-{}.db", Uuid::new_v4()));
        let path_str = path.to_string_lossy().to_string();

        {
            let repo = SqliteRepository::new(&path_str).await.unwrap();
            repo.insert_batch(&[new_user("Ada")]).await.unwrap();
        }

        let reopened = SqliteRepository::new(&path_str).await.unwrap();
        assert_eq!(reopened.find_all().await.unwrap().len(), 1);

        drop(reopened);
        let _ = std::fs::remove_file(&path);
    }
}
