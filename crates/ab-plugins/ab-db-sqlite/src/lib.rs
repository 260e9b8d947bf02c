//! # ab-db-sqlite Implementation
//!
//! This module maps the document model onto a single SQLite table. Bodies are
//! stored as JSON text; filters and sorts are pushed down with the JSON1
//! functions, while updates are applied in Rust inside a transaction so they
//! share semantics with every other engine.

use ab_core::document::{apply_all, id_value, Document, Direction, Filter, Kind, Sort, Update, ID_FIELD};
use ab_core::traits::DocumentStore;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Row, Sqlite};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS documents (
        kind TEXT NOT NULL,
        id   TEXT NOT NULL,
        body TEXT NOT NULL,
        PRIMARY KEY (kind, id)
    )",
    // Backs find_or_create for boards: at most one board per name.
    "CREATE UNIQUE INDEX IF NOT EXISTS documents_board_name
        ON documents (json_extract(body, '$.name')) WHERE kind = 'board'",
];

/// How long a writer waits for the lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    /// Connects to `url` (e.g. `sqlite:anonboard.db` or `sqlite::memory:`),
    /// creating the database file and schema if needed.
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        let in_memory = url.contains(":memory:");
        let mut options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        if !in_memory {
            // WAL mode for concurrent reads
            options = options
                .journal_mode(SqliteJournalMode::Wal)
                .busy_timeout(BUSY_TIMEOUT);
        }

        // Every pooled connection to `:memory:` would open its own database,
        // and closing the only one would drop it.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(8)
        };
        let pool = pool_options.connect_with(options).await?;

        let store = Self { pool };
        store.migrate().await?;
        info!(url, "sqlite document store ready");
        Ok(store)
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Field names end up inside JSON paths, so only plain identifiers pass.
fn json_path(field: &str) -> anyhow::Result<String> {
    let valid = !field.is_empty() && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    anyhow::ensure!(valid, "invalid field name `{field}`");
    Ok(format!("'$.{field}'"))
}

/// SQL expression reading `field` from a row.
fn column(field: &str) -> anyhow::Result<String> {
    if field == ID_FIELD {
        Ok("id".to_string())
    } else {
        Ok(format!("json_extract(body, {})", json_path(field)?))
    }
}

/// Binds a JSON scalar the way `json_extract` would return it.
fn push_value(query: &mut QueryBuilder<'_, Sqlite>, value: &Value) -> anyhow::Result<()> {
    match value {
        Value::String(s) => {
            query.push_bind(s.clone());
        }
        Value::Bool(b) => {
            query.push_bind(i64::from(*b));
        }
        Value::Number(n) => match n.as_i64() {
            Some(i) => {
                query.push_bind(i);
            }
            None => {
                query.push_bind(n.as_f64().unwrap_or_default());
            }
        },
        other => anyhow::bail!("cannot compare against {other}"),
    }
    Ok(())
}

fn push_filter(query: &mut QueryBuilder<'_, Sqlite>, filter: &Filter) -> anyhow::Result<()> {
    match filter {
        Filter::All => {
            query.push("1 = 1");
        }
        Filter::Eq(field, Value::Null) => {
            query.push(column(field)?).push(" IS NULL");
        }
        Filter::Eq(field, value) => {
            query.push(column(field)?).push(" = ");
            push_value(query, value)?;
        }
        Filter::In(_, values) if values.is_empty() => {
            query.push("0 = 1");
        }
        Filter::In(field, values) => {
            query.push(column(field)?).push(" IN (");
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    query.push(", ");
                }
                push_value(query, value)?;
            }
            query.push(")");
        }
        Filter::Contains { array, value } => {
            query
                .push("EXISTS (SELECT 1 FROM json_each(body, ")
                .push(json_path(array)?)
                .push(") AS e WHERE e.value = ");
            push_value(query, value)?;
            query.push(")");
        }
        Filter::HasElement { array, element_id } => {
            // Bare ids share the array with embedded objects; only objects carry `_id`.
            query
                .push("EXISTS (SELECT 1 FROM json_each(body, ")
                .push(json_path(array)?)
                .push(") AS e WHERE e.type = 'object' AND json_extract(e.value, '$._id') = ")
                .push_bind(element_id.to_string())
                .push(")");
        }
    }
    Ok(())
}

fn parse_body(body: &str) -> anyhow::Result<Document> {
    match serde_json::from_str(body)? {
        Value::Object(doc) => Ok(doc),
        other => anyhow::bail!("stored body is not an object: {other}"),
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn create(&self, kind: Kind, mut fields: Document) -> anyhow::Result<Uuid> {
        let id = Uuid::now_v7();
        fields.insert(ID_FIELD.to_string(), id_value(id));

        sqlx::query("INSERT INTO documents (kind, id, body) VALUES (?, ?, ?)")
            .bind(kind.as_str())
            .bind(id.to_string())
            .bind(Value::Object(fields).to_string())
            .execute(&self.pool)
            .await?;
        Ok(id)
    }

    async fn find_by_id(&self, kind: Kind, id: Uuid) -> anyhow::Result<Option<Document>> {
        let row = sqlx::query("SELECT body FROM documents WHERE kind = ? AND id = ?")
            .bind(kind.as_str())
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| parse_body(&row.get::<String, _>("body"))).transpose()
    }

    async fn find_one(&self, kind: Kind, filter: Filter) -> anyhow::Result<Option<Document>> {
        let mut docs = self.find_many(kind, filter, None, Some(1)).await?;
        Ok(docs.pop())
    }

    async fn find_many(
        &self,
        kind: Kind,
        filter: Filter,
        sort: Option<Sort>,
        limit: Option<usize>,
    ) -> anyhow::Result<Vec<Document>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT body FROM documents WHERE kind = ");
        query.push_bind(kind.as_str()).push(" AND ");
        push_filter(&mut query, &filter)?;

        let (field, direction) = match &sort {
            Some(sort) => (column(&sort.field)?, sort.direction),
            None => ("id".to_string(), Direction::Asc),
        };
        let direction = match direction {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        };
        query.push(format!(" ORDER BY {field} {direction}, id {direction}"));

        if let Some(limit) = limit {
            query.push(" LIMIT ").push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| parse_body(&row.get::<String, _>("body")))
            .collect()
    }

    /// Read, apply and write back under the write lock. `BEGIN IMMEDIATE`
    /// takes the lock up front, so concurrent writers queue on the busy
    /// timeout instead of failing on a read-to-write upgrade.
    async fn update(&self, kind: Kind, id: Uuid, updates: Vec<Update>) -> anyhow::Result<Option<Document>> {
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        let row = sqlx::query("SELECT body FROM documents WHERE kind = ? AND id = ?")
            .bind(kind.as_str())
            .bind(id.to_string())
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let current = parse_body(&row.get::<String, _>("body"))?;
        let next = apply_all(&current, &updates)?;

        sqlx::query("UPDATE documents SET body = ? WHERE kind = ? AND id = ?")
            .bind(Value::Object(next.clone()).to_string())
            .bind(kind.as_str())
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(next))
    }

    async fn delete_by_id(&self, kind: Kind, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE kind = ? AND id = ?")
            .bind(kind.as_str())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_or_create(
        &self,
        kind: Kind,
        key: String,
        value: Value,
        defaults: Document,
    ) -> anyhow::Result<Document> {
        let lookup = Filter::Eq(key.clone(), value.clone());
        if let Some(existing) = self.find_one(kind, lookup.clone()).await? {
            return Ok(existing);
        }

        let id = Uuid::now_v7();
        let mut fields = defaults;
        fields.insert(key, value);
        fields.insert(ID_FIELD.to_string(), id_value(id));

        // A racing creator trips the unique index; its document wins.
        let inserted = sqlx::query("INSERT OR IGNORE INTO documents (kind, id, body) VALUES (?, ?, ?)")
            .bind(kind.as_str())
            .bind(id.to_string())
            .bind(Value::Object(fields.clone()).to_string())
            .execute(&self.pool)
            .await?;
        if inserted.rows_affected() == 1 {
            return Ok(fields);
        }

        debug!(%kind, "lost find_or_create race, reloading");
        self.find_one(kind, lookup)
            .await?
            .ok_or_else(|| anyhow::anyhow!("{kind} vanished during find_or_create"))
    }
}
