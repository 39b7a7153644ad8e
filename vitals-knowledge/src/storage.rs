use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::errors::{KnowledgeError, KnowledgeResult};
use crate::models::KnowledgeSnippet;

/// SQLite-backed store of knowledge snippets.
///
/// Embeddings are persisted as a JSON array in a text column and decoded on
/// read, so rows written by other tools stay readable.
#[derive(Debug, Clone)]
pub struct KnowledgeStore {
    pool: SqlitePool,
}

/// A raw row as stored; the embedding is still JSON text.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SnippetRow {
    pub id: i64,
    pub content: String,
    pub embedding: String,
    pub source: Option<String>,
    pub meta_info: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl SnippetRow {
    /// Decode the stored JSON vector.
    pub fn decode(self) -> KnowledgeResult<KnowledgeSnippet> {
        let embedding: Vec<f32> =
            serde_json::from_str(&self.embedding).map_err(|err| KnowledgeError::MalformedVector {
                id: self.id,
                reason: err.to_string(),
            })?;
        Ok(KnowledgeSnippet {
            id: self.id,
            content: self.content,
            embedding,
            source: self.source,
            created_at: parse_timestamp(&self.created_at),
            updated_at: parse_timestamp(&self.updated_at),
        })
    }
}

impl KnowledgeStore {
    pub async fn open(db_path: &Path) -> KnowledgeResult<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .after_connect(move |conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA journal_mode = WAL")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA synchronous = NORMAL")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect_with(options)
            .await?;

        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Open a private in-memory store. Every connection to `:memory:` is its
    /// own database, so the pool is pinned to one connection that never idles out.
    pub async fn open_in_memory() -> KnowledgeResult<Self> {
        let options = SqliteConnectOptions::new().filename(":memory:");
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await?;

        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert one snippet and return its new id.
    pub async fn insert_snippet(
        &self,
        content: &str,
        embedding: &[f32],
        source: Option<&str>,
        meta_info: Option<&serde_json::Value>,
    ) -> KnowledgeResult<i64> {
        if content.trim().is_empty() {
            return Err(KnowledgeError::EmptyContent);
        }

        let embedding_json = serde_json::to_string(embedding)?;
        let meta_json = meta_info.map(serde_json::to_string).transpose()?;
        let now = Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "INSERT INTO knowledge_snippets (content, embedding, source, meta_info, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(content)
        .bind(&embedding_json)
        .bind(source)
        .bind(meta_json)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(result.last_insert_rowid())
    }

    /// Every stored row in insertion order, undecoded.
    pub async fn list_rows(&self) -> KnowledgeResult<Vec<SnippetRow>> {
        let rows = sqlx::query_as::<_, SnippetRow>(
            "SELECT id, content, embedding, source, meta_info, created_at, updated_at
             FROM knowledge_snippets
             ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_snippet(&self, id: i64) -> KnowledgeResult<Option<KnowledgeSnippet>> {
        let row = sqlx::query_as::<_, SnippetRow>(
            "SELECT id, content, embedding, source, meta_info, created_at, updated_at
             FROM knowledge_snippets
             WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(SnippetRow::decode).transpose()
    }

    pub async fn delete_snippet(&self, id: i64) -> KnowledgeResult<bool> {
        let result = sqlx::query("DELETE FROM knowledge_snippets WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count(&self) -> KnowledgeResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM knowledge_snippets")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

async fn run_migrations(pool: &SqlitePool) -> KnowledgeResult<()> {
    sqlx::migrate!("./migrations/knowledge").run(pool).await?;
    Ok(())
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_and_list_roundtrip() {
        let store = KnowledgeStore::open_in_memory().await.unwrap();
        let id = store
            .insert_snippet("每天喝水", &[0.5, -0.25, 1.0], Some("水分补充指南"), None)
            .await
            .unwrap();

        let rows = store.list_rows().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, id);

        let snippet = rows[0].clone().decode().unwrap();
        assert_eq!(snippet.embedding, vec![0.5, -0.25, 1.0]);
        assert_eq!(snippet.source.as_deref(), Some("水分补充指南"));
    }

    #[tokio::test]
    async fn empty_content_is_rejected() {
        let store = KnowledgeStore::open_in_memory().await.unwrap();
        let err = store
            .insert_snippet("   ", &[1.0], None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, KnowledgeError::EmptyContent));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn delete_reports_whether_row_existed() {
        let store = KnowledgeStore::open_in_memory().await.unwrap();
        let id = store.insert_snippet("a", &[1.0], None, None).await.unwrap();
        assert!(store.delete_snippet(id).await.unwrap());
        assert!(!store.delete_snippet(id).await.unwrap());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn malformed_vector_fails_decode() {
        let store = KnowledgeStore::open_in_memory().await.unwrap();
        sqlx::query(
            "INSERT INTO knowledge_snippets (content, embedding, created_at, updated_at)
             VALUES ('bad', 'not json', '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
        )
        .execute(store.pool())
        .await
        .unwrap();

        let rows = store.list_rows().await.unwrap();
        let err = rows[0].clone().decode().unwrap_err();
        assert!(matches!(err, KnowledgeError::MalformedVector { .. }));
    }

    #[tokio::test]
    async fn file_store_persists_across_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("knowledge.sqlite3");

        let store = KnowledgeStore::open(&path).await.unwrap();
        store
            .insert_snippet("保持规律作息", &[0.1, 0.2], Some("睡眠指南"), None)
            .await
            .unwrap();
        store.close().await;

        let reopened = KnowledgeStore::open(&path).await.unwrap();
        assert_eq!(reopened.count().await.unwrap(), 1);
    }
}
