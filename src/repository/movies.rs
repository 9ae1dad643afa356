//! The `movies` table: schema, merge-upsert loading, and statistics.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;
use tracing::{info, warn};

use super::Result;
use crate::models::{MovieRow, ValidatedRecord};

/// Secondary indexes built after every load.
pub const INDEXES: [(&str, &str); 4] = [
    ("idx_tomatometer", "tomatometer_score"),
    ("idx_audience", "audience_score"),
    ("idx_genre", "genre"),
    ("idx_rating", "rating"),
];

const SELECT_COLUMNS: &str = "title, url, tomatometer_score, audience_score, genre, rating, \
     duration, release_date, director, original_language, box_office, distributor";

// Absent incoming values keep what is stored.
const UPSERT: &str = r#"
    INSERT INTO movies (
        title, url, tomatometer_score, audience_score, genre, rating,
        duration, release_date, director, original_language, box_office, distributor
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
    ON CONFLICT(url) DO UPDATE SET
        title = excluded.title,
        tomatometer_score = COALESCE(excluded.tomatometer_score, movies.tomatometer_score),
        audience_score = COALESCE(excluded.audience_score, movies.audience_score),
        genre = COALESCE(excluded.genre, movies.genre),
        rating = COALESCE(excluded.rating, movies.rating),
        duration = COALESCE(excluded.duration, movies.duration),
        release_date = COALESCE(excluded.release_date, movies.release_date),
        director = COALESCE(excluded.director, movies.director),
        original_language = COALESCE(excluded.original_language, movies.original_language),
        box_office = COALESCE(excluded.box_office, movies.box_office),
        distributor = COALESCE(excluded.distributor, movies.distributor)
"#;

/// One row could not be written. The load continues without it.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("record has an empty url")]
    MissingUrl,

    #[error("row {url} rejected: {field} {value:?} is not an integer")]
    Score {
        url: String,
        field: &'static str,
        value: String,
    },

    #[error("row {url} rejected: {source}")]
    Row {
        url: String,
        #[source]
        source: rusqlite::Error,
    },
}

/// Row counts for one load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub inserted: usize,
    pub updated: usize,
    pub failed: usize,
    pub rows_before: u64,
    pub rows_after: u64,
}

/// Table-wide coverage numbers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovieStats {
    pub rows: u64,
    pub with_tomatometer: u64,
    pub with_audience: u64,
    pub with_genre: u64,
    pub with_rating: u64,
    pub with_duration: u64,
    pub avg_tomatometer: Option<f64>,
    pub avg_audience: Option<f64>,
}

impl MovieStats {
    /// `(column, populated)` pairs in table order.
    pub fn coverage(&self) -> [(&'static str, u64); 5] {
        [
            ("tomatometer_score", self.with_tomatometer),
            ("audience_score", self.with_audience),
            ("genre", self.with_genre),
            ("rating", self.with_rating),
            ("duration", self.with_duration),
        ]
    }
}

/// SQLite-backed movie store keyed by url.
pub struct MovieRepository {
    db_path: PathBuf,
}

impl MovieRepository {
    /// Open (creating if needed) the database at `db_path`.
    pub fn new(db_path: &Path) -> Result<Self> {
        let repo = Self {
            db_path: db_path.to_path_buf(),
        };
        repo.init_schema()?;
        Ok(repo)
    }

    pub(crate) fn connect(&self) -> Result<Connection> {
        super::connect(&self.db_path)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS movies (
                title TEXT NOT NULL,
                url TEXT UNIQUE NOT NULL,
                tomatometer_score INTEGER CHECK(tomatometer_score BETWEEN 0 AND 100),
                audience_score INTEGER CHECK(audience_score BETWEEN 0 AND 100),
                genre TEXT,
                rating TEXT,
                duration TEXT,
                release_date TEXT,
                director TEXT,
                original_language TEXT,
                box_office TEXT,
                distributor TEXT
            );
        "#,
        )?;
        Ok(())
    }

    /// Create the secondary indexes if they do not exist.
    pub fn ensure_indexes(&self) -> Result<()> {
        let conn = self.connect()?;
        Self::create_indexes(&conn)
    }

    fn create_indexes(conn: &Connection) -> Result<()> {
        for (name, column) in INDEXES {
            conn.execute_batch(&format!(
                "CREATE INDEX IF NOT EXISTS {} ON movies({});",
                name, column
            ))?;
        }
        Ok(())
    }

    /// Names of the indexes currently defined on `movies`.
    pub fn index_names(&self) -> Result<Vec<String>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = 'movies' \
             AND name NOT LIKE 'sqlite_autoindex%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }

    pub fn count(&self) -> Result<u64> {
        let conn = self.connect()?;
        Self::count_rows(&conn)
    }

    fn count_rows(conn: &Connection) -> Result<u64> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM movies", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Fetch one movie by url.
    pub fn get(&self, url: &str) -> Result<Option<ValidatedRecord>> {
        let conn = self.connect()?;
        let record = conn
            .query_row(
                &format!("SELECT {} FROM movies WHERE url = ?1", SELECT_COLUMNS),
                params![url],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    /// All movies, best tomatometer first.
    pub fn top_rated(&self, limit: usize) -> Result<Vec<ValidatedRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM movies WHERE tomatometer_score IS NOT NULL \
             ORDER BY tomatometer_score DESC, audience_score DESC, title LIMIT ?1",
            SELECT_COLUMNS
        ))?;
        let records = stmt
            .query_map(params![limit as i64], row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Upsert `records` by url in one transaction, then build the indexes.
    pub fn load(&self, records: &[ValidatedRecord]) -> Result<LoadSummary> {
        let rows: Vec<MovieRow> = records.iter().map(MovieRow::from).collect();
        self.load_rows(&rows)
    }

    /// Upsert rows read back from the clean file.
    ///
    /// Rows with an unparseable score or that violate a constraint are
    /// logged, counted as failed, and skipped; the rest of the batch is
    /// still committed.
    pub fn load_rows(&self, rows: &[MovieRow]) -> Result<LoadSummary> {
        let mut conn = self.connect()?;
        let mut summary = LoadSummary {
            rows_before: Self::count_rows(&conn)?,
            ..Default::default()
        };

        let tx = conn.transaction()?;
        {
            let mut exists = tx.prepare("SELECT 1 FROM movies WHERE url = ?1")?;
            let mut upsert = tx.prepare(UPSERT)?;

            for row in rows {
                let result = (|| {
                    if row.detail_url.trim().is_empty() {
                        return Err(LoadError::MissingUrl);
                    }
                    let tomatometer =
                        parse_score(&row.detail_url, "tomatometer_score", &row.tomatometer_score)?;
                    let audience =
                        parse_score(&row.detail_url, "audience_score", &row.audience_score)?;
                    let row_error = |source| LoadError::Row {
                        url: row.detail_url.clone(),
                        source,
                    };
                    let existed = exists.exists(params![row.detail_url]).map_err(row_error)?;
                    upsert
                        .execute(params![
                            row.title,
                            row.detail_url,
                            tomatometer,
                            audience,
                            row.genre,
                            row.rating,
                            row.duration,
                            row.release_date,
                            row.director,
                            row.original_language,
                            row.box_office,
                            row.distributor,
                        ])
                        .map_err(row_error)?;
                    Ok(existed)
                })();

                match result {
                    Ok(true) => summary.updated += 1,
                    Ok(false) => summary.inserted += 1,
                    Err(e) => {
                        summary.failed += 1;
                        warn!(url = %row.detail_url, title = %row.title, "[LOAD] Row skipped: {}", e);
                    }
                }
            }
        }
        tx.commit()?;

        Self::create_indexes(&conn)?;
        summary.rows_after = Self::count_rows(&conn)?;

        if summary.rows_after < summary.rows_before {
            warn!(
                before = summary.rows_before,
                after = summary.rows_after,
                "[LOAD] Row count decreased during load"
            );
        }
        info!(
            "[LOAD] {} inserted, {} updated, {} failed ({} rows total)",
            summary.inserted, summary.updated, summary.failed, summary.rows_after
        );
        Ok(summary)
    }

    /// Coverage and averages over the whole table.
    pub fn stats(&self) -> Result<MovieStats> {
        let conn = self.connect()?;
        let stats = conn.query_row(
            "SELECT COUNT(*), COUNT(tomatometer_score), COUNT(audience_score), COUNT(genre), \
             COUNT(rating), COUNT(duration), AVG(tomatometer_score), AVG(audience_score) \
             FROM movies",
            [],
            |row| {
                Ok(MovieStats {
                    rows: row.get::<_, i64>(0)? as u64,
                    with_tomatometer: row.get::<_, i64>(1)? as u64,
                    with_audience: row.get::<_, i64>(2)? as u64,
                    with_genre: row.get::<_, i64>(3)? as u64,
                    with_rating: row.get::<_, i64>(4)? as u64,
                    with_duration: row.get::<_, i64>(5)? as u64,
                    avg_tomatometer: row.get(6)?,
                    avg_audience: row.get(7)?,
                })
            },
        )?;
        Ok(stats)
    }
}

/// Range is left to the table's CHECK constraint.
fn parse_score(
    url: &str,
    field: &'static str,
    value: &Option<String>,
) -> std::result::Result<Option<i64>, LoadError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => text.parse::<i64>().map(Some).map_err(|_| LoadError::Score {
            url: url.to_string(),
            field,
            value: text.to_string(),
        }),
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<ValidatedRecord> {
    Ok(ValidatedRecord {
        title: row.get(0)?,
        detail_url: row.get(1)?,
        tomatometer_score: row.get(2)?,
        audience_score: row.get(3)?,
        genre: row.get(4)?,
        rating: row.get(5)?,
        duration: row.get(6)?,
        release_date: row.get(7)?,
        director: row.get(8)?,
        original_language: row.get(9)?,
        box_office: row.get(10)?,
        distributor: row.get(11)?,
    })
}
