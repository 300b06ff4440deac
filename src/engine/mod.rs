//! 本地分析查询引擎
//!
//! 单表 `reviews` 存放在内存 SQLite 中，数据加载完成后切换为 `query_only`。
//! 所有查询经 `spawn_blocking` 执行，结果行转为 JSON 对象（列名 -> 值）。
//! 额外注册的标量函数：
//! - `REGEXP`：`description REGEXP '(?i)noise'`
//! - `bin_of(coord, size)`：`floor(coord / size)`，与簇编号的计算方式一致
//! - `contains_ci(text, needle)`：按 Unicode 小写比较的子串匹配（内置 `lower()` 只处理 ASCII）

pub mod dataset;
pub mod guard;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use regex::Regex;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde_json::{Map, Value};
use thiserror::Error;

pub use dataset::ReviewRecord;
pub use guard::{validate_select, GuardViolation, FORBIDDEN_KEYWORDS};
pub use rusqlite::types::Value as SqlValue;

/// 一行查询结果
pub type Row = Map<String, Value>;

const SCHEMA: &str = "CREATE TABLE reviews (
    id INTEGER PRIMARY KEY,
    title TEXT,
    description TEXT,
    score REAL,
    price REAL,
    projection_x REAL,
    projection_y REAL,
    neighbors TEXT
)";

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("SQL error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dataset line {line}: {message}")]
    Dataset { line: usize, message: String },

    #[error("Query task failed: {0}")]
    Join(String),

    #[error("Engine lock poisoned")]
    Poisoned,
}

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    let flags = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;
    conn.create_scalar_function(
        "regexp",
        2,
        flags,
        |ctx| {
            let re: Arc<Regex> = ctx.get_or_create_aux(0, |vr| -> Result<_, BoxError> {
                Ok(Regex::new(vr.as_str()?)?)
            })?;
            let text = ctx
                .get_raw(1)
                .as_str_or_null()
                .map_err(|e| rusqlite::Error::UserFunctionError(e.into()))?;
            Ok(text.map(|t| re.is_match(t)).unwrap_or(false))
        },
    )?;
    conn.create_scalar_function("bin_of", 2, flags, |ctx| {
        let coord: Option<f64> = ctx.get(0)?;
        let size: f64 = ctx.get(1)?;
        if size <= 0.0 {
            return Err(rusqlite::Error::UserFunctionError(
                "bin size must be positive".into(),
            ));
        }
        Ok(coord.map(|c| (c / size).floor() as i64))
    })?;
    conn.create_scalar_function("contains_ci", 2, flags, |ctx| {
        let text = ctx
            .get_raw(0)
            .as_str_or_null()
            .map_err(|e| rusqlite::Error::UserFunctionError(e.into()))?;
        let needle = ctx
            .get_raw(1)
            .as_str_or_null()
            .map_err(|e| rusqlite::Error::UserFunctionError(e.into()))?;
        Ok(match (text, needle) {
            (Some(t), Some(n)) => t.to_lowercase().contains(&n.to_lowercase()),
            _ => false,
        })
    })
}

fn value_ref_to_json(v: ValueRef<'_>) -> Value {
    match v {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(format!("<blob {} bytes>", b.len())),
    }
}

fn run_query(conn: &Connection, sql: &str, params: &[SqlValue]) -> rusqlite::Result<Vec<Row>> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let mut rows = stmt.query(rusqlite::params_from_iter(params.iter()))?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut map = Map::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            map.insert(name.clone(), value_ref_to_json(row.get_ref(i)?));
        }
        out.push(map);
    }
    Ok(out)
}

/// 查询引擎：可廉价克隆，所有克隆共享同一连接
#[derive(Clone)]
pub struct QueryEngine {
    conn: Arc<Mutex<Connection>>,
    queries: Arc<AtomicU64>,
}

impl QueryEngine {
    /// 建表、写入记录并切换为只读
    pub fn from_records(records: &[ReviewRecord]) -> Result<Self, EngineError> {
        let mut conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        register_functions(&conn)?;
        {
            let tx = conn.transaction()?;
            {
                let mut insert = tx.prepare(
                    "INSERT INTO reviews (id, title, description, score, price, projection_x, projection_y, neighbors)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )?;
                for r in records {
                    insert.execute(rusqlite::params![
                        r.id,
                        r.title,
                        r.description,
                        r.score,
                        r.price,
                        r.projection_x,
                        r.projection_y,
                        r.neighbors_text(),
                    ])?;
                }
            }
            tx.commit()?;
        }
        conn.execute_batch("PRAGMA query_only = ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            queries: Arc::new(AtomicU64::new(0)),
        })
    }

    /// 执行查询，返回全部结果行
    pub async fn query(&self, sql: impl Into<String>, params: Vec<SqlValue>) -> Result<Vec<Row>, EngineError> {
        let sql = sql.into();
        let conn = Arc::clone(&self.conn);
        self.queries.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(sql = %sql, "engine query");
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| EngineError::Poisoned)?;
            run_query(&conn, &sql, &params).map_err(EngineError::from)
        })
        .await
        .map_err(|e| EngineError::Join(e.to_string()))?
    }

    /// 执行返回单个整数的查询（如 COUNT(*)）
    pub async fn query_count(&self, sql: impl Into<String>, params: Vec<SqlValue>) -> Result<u64, EngineError> {
        let rows = self.query(sql, params).await?;
        Ok(rows
            .first()
            .and_then(|row| row.values().next())
            .and_then(Value::as_u64)
            .unwrap_or(0))
    }

    /// 已执行的查询次数
    pub fn queries_issued(&self) -> u64 {
        self.queries.load(Ordering::SeqCst)
    }

    pub async fn row_count(&self) -> Result<u64, EngineError> {
        self.query_count("SELECT COUNT(*) FROM reviews", vec![]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::dataset::demo_records;

    #[tokio::test]
    async fn test_rows_become_json_objects() {
        let engine = QueryEngine::from_records(&demo_records()).unwrap();
        let rows = engine
            .query("SELECT id, score, title FROM reviews WHERE id = ?1", vec![SqlValue::Integer(1)])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], 1);
        assert_eq!(rows[0]["score"], 5.0);
        assert!(rows[0]["title"].is_string());
    }

    #[tokio::test]
    async fn test_regexp_function() {
        let engine = QueryEngine::from_records(&demo_records()).unwrap();
        let n = engine
            .query_count(
                "SELECT COUNT(*) FROM reviews WHERE description REGEXP ?1",
                vec![SqlValue::Text("(?i)NOISE".into())],
            )
            .await
            .unwrap();
        assert_eq!(n, 2);
    }

    #[tokio::test]
    async fn test_bin_of_matches_floor() {
        let engine = QueryEngine::from_records(&demo_records()).unwrap();
        let rows = engine
            .query(
                "SELECT bin_of(?1, ?2) AS a, bin_of(-0.05, 1.0) AS b, bin_of(NULL, 1.0) AS c",
                vec![SqlValue::Real(1.7), SqlValue::Real(0.1)],
            )
            .await
            .unwrap();
        // 17 * 0.1 = 1.7000000000000002 > 1.7，按区间比较会落到 16 号簇
        assert_eq!(rows[0]["a"], 17);
        assert_eq!(rows[0]["b"], -1);
        assert!(rows[0]["c"].is_null());
        assert!(engine.query("SELECT bin_of(1.0, 0.0)", vec![]).await.is_err());
    }

    #[tokio::test]
    async fn test_contains_ci_folds_unicode() {
        let engine = QueryEngine::from_records(&demo_records()).unwrap();
        let rows = engine
            .query(
                "SELECT contains_ci('Das FRÜHSTÜCK war kalt', ?1) AS hit, lower('Ü') = 'ü' AS builtin",
                vec![SqlValue::Text("frühstück".into())],
            )
            .await
            .unwrap();
        assert_eq!(rows[0]["hit"], 1);
        assert_eq!(rows[0]["builtin"], 0);
    }

    #[tokio::test]
    async fn test_engine_is_read_only() {
        let engine = QueryEngine::from_records(&demo_records()).unwrap();
        assert!(engine.query("DELETE FROM reviews", vec![]).await.is_err());
        assert_eq!(engine.row_count().await.unwrap(), demo_records().len() as u64);
    }

    #[tokio::test]
    async fn test_query_counter() {
        let engine = QueryEngine::from_records(&demo_records()).unwrap();
        assert_eq!(engine.queries_issued(), 0);
        engine.row_count().await.unwrap();
        assert_eq!(engine.queries_issued(), 1);
    }
}
