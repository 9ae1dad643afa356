//! Stage hand-off files: `movies_raw.csv` and `movies_clean.csv`.
//!
//! Files are written to a temporary sibling and renamed into place, so a
//! stage killed mid-write never leaves a truncated file for the next one.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

use crate::models::{Candidate, MovieRow, ValidatedRecord, MOVIE_COLUMNS};

/// Columns of `movies_raw.csv`.
pub const CANDIDATE_COLUMNS: [&str; 2] = ["title", "url"];

#[derive(Debug, Error)]
pub enum FileError {
    #[error("{} does not exist", path.display())]
    Missing { path: PathBuf },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl FileError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn csv(path: &Path, source: csv::Error) -> Self {
        Self::Csv {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub fn write_candidates(path: &Path, candidates: &[Candidate]) -> Result<(), FileError> {
    write_rows(path, &CANDIDATE_COLUMNS, candidates)
}

pub fn read_candidates(path: &Path) -> Result<Vec<Candidate>, FileError> {
    read_rows(path)
}

pub fn write_records(path: &Path, records: &[ValidatedRecord]) -> Result<(), FileError> {
    write_rows(path, &MOVIE_COLUMNS, records)
}

pub fn read_records(path: &Path) -> Result<Vec<ValidatedRecord>, FileError> {
    read_rows(path)
}

/// Read `movies_clean.csv` for loading, leaving scores unparsed.
pub fn read_movie_rows(path: &Path) -> Result<Vec<MovieRow>, FileError> {
    read_rows(path)
}

fn write_rows<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> Result<(), FileError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(|e| FileError::io(&dir, e))?;

    let tmp = NamedTempFile::new_in(&dir).map_err(|e| FileError::io(path, e))?;
    {
        // serde only emits a header alongside the first row
        let mut writer = csv::WriterBuilder::new()
            .has_headers(!rows.is_empty())
            .from_writer(tmp.as_file());
        if rows.is_empty() {
            writer.write_record(header).map_err(|e| FileError::csv(path, e))?;
        }
        for row in rows {
            writer.serialize(row).map_err(|e| FileError::csv(path, e))?;
        }
        writer.flush().map_err(|e| FileError::io(path, e))?;
    }
    tmp.as_file().sync_all().map_err(|e| FileError::io(path, e))?;
    tmp.persist(path).map_err(|e| FileError::io(path, e.error))?;

    debug!(path = %path.display(), rows = rows.len(), "Wrote CSV");
    Ok(())
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, FileError> {
    if !path.exists() {
        return Err(FileError::Missing {
            path: path.to_path_buf(),
        });
    }
    let file = File::open(path).map_err(|e| FileError::io(path, e))?;
    let mut reader = csv::Reader::from_reader(file);

    let rows = reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| FileError::csv(path, e))?;
    debug!(path = %path.display(), rows = rows.len(), "Read CSV");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_candidates_file_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("movies_raw.csv");
        let candidates = vec![
            Candidate::new("Heat", "https://example.com/m/heat"),
            Candidate::new("Crouching Tiger, Hidden Dragon", "https://example.com/m/crouching"),
        ];

        write_candidates(&path, &candidates).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("title,url\n"));
        assert!(text.contains("\"Crouching Tiger, Hidden Dragon\""));

        assert_eq!(read_candidates(&path).unwrap(), candidates);
    }

    #[test]
    fn test_records_absent_fields_are_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out/movies_clean.csv");
        let record = ValidatedRecord {
            title: "zootopia".to_string(),
            detail_url: "https://example.com/m/zootopia".to_string(),
            tomatometer_score: Some(98),
            duration: Some("1h 48m".to_string()),
            ..Default::default()
        };

        write_records(&path, std::slice::from_ref(&record)).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), MOVIE_COLUMNS.join(","));
        assert_eq!(
            lines.next().unwrap(),
            "zootopia,https://example.com/m/zootopia,98,,,,1h 48m,,,,,"
        );

        assert_eq!(read_records(&path).unwrap(), vec![record]);
    }

    #[test]
    fn test_empty_file_keeps_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("movies_raw.csv");
        write_candidates(&path, &[]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "title,url\n");
        assert!(read_candidates(&path).unwrap().is_empty());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let err = read_records(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, FileError::Missing { .. }));
    }

    #[test]
    fn test_movie_rows_keep_bad_scores_readable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("movies_clean.csv");
        std::fs::write(
            &path,
            format!(
                "{}\ngood,https://example.com/m/good,90,,,,,,,,,\nbad,https://example.com/m/bad,-5,abc,,,,,,,,\n",
                MOVIE_COLUMNS.join(",")
            ),
        )
        .unwrap();

        assert!(matches!(read_records(&path), Err(FileError::Csv { .. })));

        let rows = read_movie_rows(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].tomatometer_score.as_deref(), Some("90"));
        assert_eq!(rows[0].audience_score, None);
        assert_eq!(rows[1].tomatometer_score.as_deref(), Some("-5"));
        assert_eq!(rows[1].audience_score.as_deref(), Some("abc"));
    }
}
