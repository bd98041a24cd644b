//! tconn-db
//!
//! Durable storage of raw connection records and the range queries the read
//! path runs against them. Reconciliation itself lives in tconn-reconcile.

mod memory;
mod store;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use tconn_schemas::RawConnectionRecord;

pub use memory::MemoryConnectionStore;
pub use store::{ConnectionStore, PgConnectionStore};

pub const ENV_DB_URL: &str = "TCONN_DATABASE_URL";

/// Connect to Postgres using TCONN_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL)
        .with_context(|| format!("missing env var {ENV_DB_URL}"))?;
    connect(&url).await
}

pub async fn connect(url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_connections_table: bool,
}

/// Simple status query (connectivity + schema presence).
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='topic_connections'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok: one == 1,
        has_connections_table: exists,
    })
}

// ---------------------------------------------------------------------------
// Write path
// ---------------------------------------------------------------------------

/// Upsert one observation. Re-inserting the same (identity, version, bucket)
/// only refreshes `updated_at`. Returns rows affected.
pub async fn replace_connection(pool: &PgPool, rec: &RawConnectionRecord) -> Result<u64> {
    let res = sqlx::query(
        r#"
        insert into topic_connections (
          cluster_id, topic_name, app_id, ip, client_type, client_version, created_at
        ) values (
          $1, $2, $3, $4, $5, $6, $7
        )
        on conflict (cluster_id, topic_name, app_id, ip, client_type, client_version, created_at)
        do update set updated_at = now()
        "#,
    )
    .bind(rec.cluster_id)
    .bind(&rec.topic_name)
    .bind(&rec.app_id)
    .bind(&rec.ip)
    .bind(&rec.client_type)
    .bind(&rec.client_version)
    .bind(rec.created_at)
    .execute(pool)
    .await
    .context("replace_connection failed")?;

    Ok(res.rows_affected())
}

// ---------------------------------------------------------------------------
// Read path
// ---------------------------------------------------------------------------

/// Range filter shared by every read. Bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionFilter {
    pub cluster_id: Option<i64>,
    pub topic_name: Option<String>,
    pub app_id: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ConnectionFilter {
    pub fn validate(&self) -> Result<()> {
        if self.start > self.end {
            return Err(anyhow!("start must be <= end"));
        }
        Ok(())
    }

    pub fn matches(&self, rec: &RawConnectionRecord) -> bool {
        self.cluster_id.map_or(true, |c| rec.cluster_id == c)
            && self.topic_name.as_deref().map_or(true, |t| rec.topic_name == t)
            && self.app_id.as_deref().map_or(true, |a| rec.app_id == a)
            && rec.created_at >= self.start
            && rec.created_at <= self.end
    }
}

/// Rows in the window, one per (identity, version), carrying the latest bucket.
///
/// Ordered by latest bucket, then identity and version, so records of one
/// identity arrive oldest-first.
pub async fn fetch_connections(
    pool: &PgPool,
    filter: &ConnectionFilter,
) -> Result<Vec<RawConnectionRecord>> {
    filter.validate()?;

    let rows = sqlx::query(
        r#"
        select
            cluster_id,
            topic_name,
            app_id,
            ip,
            client_type,
            client_version,
            max(created_at) as created_at
        from topic_connections
        where ($1::bigint is null or cluster_id = $1)
          and ($2::text is null or topic_name = $2)
          and ($3::text is null or app_id = $3)
          and created_at >= $4
          and created_at <= $5
        group by cluster_id, topic_name, app_id, ip, client_type, client_version
        order by max(created_at) asc,
                 cluster_id asc, topic_name asc, app_id asc, ip asc,
                 client_type asc, client_version asc
        "#,
    )
    .bind(filter.cluster_id)
    .bind(filter.topic_name.as_deref())
    .bind(filter.app_id.as_deref())
    .bind(filter.start)
    .bind(filter.end)
    .fetch_all(pool)
    .await
    .context("fetch_connections query failed")?;

    let mut out = Vec::with_capacity(rows.len());
    for r in rows {
        out.push(RawConnectionRecord {
            cluster_id: r.try_get::<i64, _>("cluster_id")?,
            topic_name: r.try_get::<String, _>("topic_name")?,
            app_id: r.try_get::<String, _>("app_id")?,
            ip: r.try_get::<String, _>("ip")?,
            client_type: r.try_get::<String, _>("client_type")?,
            client_version: r.try_get::<String, _>("client_version")?,
            created_at: r.try_get::<DateTime<Utc>, _>("created_at")?,
        });
    }

    Ok(out)
}

/// Test-only pool from TCONN_DATABASE_URL with migrations applied.
pub async fn testkit_db_pool() -> Result<PgPool> {
    let pool = connect_from_env().await?;
    migrate(&pool).await?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn filter_bounds_are_inclusive() {
        let f = ConnectionFilter {
            cluster_id: Some(1),
            topic_name: Some("orders".to_string()),
            app_id: None,
            start: at(100),
            end: at(200),
        };
        let mut r = RawConnectionRecord::new(1, "orders", "a", "10.0.0.1", "fetch", "1.0", at(100));
        assert!(f.matches(&r));
        r.created_at = at(200);
        assert!(f.matches(&r));
        r.created_at = at(201);
        assert!(!f.matches(&r));
        r.created_at = at(150);
        r.cluster_id = 2;
        assert!(!f.matches(&r));
    }

    #[test]
    fn inverted_window_is_rejected() {
        let f = ConnectionFilter {
            cluster_id: None,
            topic_name: None,
            app_id: Some("a".to_string()),
            start: at(200),
            end: at(100),
        };
        assert!(f.validate().is_err());
    }
}
