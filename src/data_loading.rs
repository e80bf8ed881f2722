use anyhow::{Context, Result};
use csv::StringRecord;
use log::debug;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Tokens read as a missing value, on top of an empty field (pandas' default NA set)
const MISSING_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("No CSV files for Subject{subject} under {}", root.display())]
    NoSubjectFiles { subject: u32, root: PathBuf },

    #[error("{}: channel {channel} out of range, rows have {width} column(s)", path.display())]
    MissingChannel {
        path: PathBuf,
        channel: usize,
        width: usize,
    },

    #[error("{}: row {row}: non-numeric value {value:?} in channel {channel}", path.display())]
    BadValue {
        path: PathBuf,
        row: usize,
        channel: usize,
        value: String,
    },
}

/// Resolve the folder for a subject. `Subject<ID>` is preferred, `Subject <ID>` is the fallback.
pub fn subject_dir(data_root: &Path, subject_id: u32) -> PathBuf {
    let compact = data_root.join(format!("Subject{}", subject_id));
    if compact.is_dir() {
        compact
    } else {
        data_root.join(format!("Subject {}", subject_id))
    }
}

/// Case-insensitive `exg` prefix with a `.csv` extension, i.e. `[Ee][Xx][Gg]*.csv`
fn is_exg_csv(file_name: &str) -> bool {
    let bytes = file_name.as_bytes();
    bytes.len() >= "exg.csv".len()
        && bytes[..3].eq_ignore_ascii_case(b"exg")
        && file_name.ends_with(".csv")
}

/// Locate the ExG CSV files for a subject, sorted by path.
pub fn find_subject_files(data_root: &Path, subject_id: u32) -> Result<Vec<PathBuf>> {
    let dir = subject_dir(data_root, subject_id);
    let no_files = || LoadError::NoSubjectFiles {
        subject: subject_id,
        root: data_root.to_path_buf(),
    };

    if !dir.is_dir() {
        return Err(no_files().into());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
        let entry =
            entry.with_context(|| format!("Failed to list directory: {}", dir.display()))?;
        // Follows symlinks
        if !entry.path().is_file() {
            continue;
        }
        if entry.file_name().to_str().is_some_and(is_exg_csv) {
            files.push(entry.into_path());
        }
    }

    if files.is_empty() {
        return Err(no_files().into());
    }
    files.sort();

    debug!("Subject{} files in {}:", subject_id, dir.display());
    for path in &files {
        debug!("  {}", path.display());
    }

    Ok(files)
}

fn is_missing(field: &str) -> bool {
    let field = field.trim();
    field.is_empty() || MISSING_TOKENS.contains(&field)
}

/// A row is complete when it spans every column and holds no missing value
fn is_complete(record: &StringRecord, width: usize) -> bool {
    record.len() == width && !record.iter().any(is_missing)
}

/// Read one column (0-based) from a headerless CSV.
///
/// Rows at the end of the file are dropped while they contain a missing value,
/// which covers the blank trailing rows the acquisition software leaves behind.
/// Missing values in the middle of the file are kept as NaN.
pub fn read_exg_column(path: &Path, channel: usize) -> Result<Vec<f64>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true) // Trailing rows are often shorter
        .from_path(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;

    let records = rdr
        .records()
        .collect::<Result<Vec<StringRecord>, _>>()
        .with_context(|| format!("Failed to parse CSV: {}", path.display()))?;

    let width = records.iter().map(StringRecord::len).max().unwrap_or(0);
    if channel >= width {
        return Err(LoadError::MissingChannel {
            path: path.to_path_buf(),
            channel,
            width,
        }
        .into());
    }

    let mut kept = records.len();
    while kept > 0 && !is_complete(&records[kept - 1], width) {
        kept -= 1;
    }
    debug!(
        "{}: {} rows, {} trailing row(s) trimmed",
        path.display(),
        kept,
        records.len() - kept
    );

    records[..kept]
        .iter()
        .enumerate()
        .map(|(row, record)| {
            let field = record.get(channel).unwrap_or("");
            if is_missing(field) {
                return Ok(f64::NAN);
            }
            field.trim().parse::<f64>().map_err(|_| {
                anyhow::Error::from(LoadError::BadValue {
                    path: path.to_path_buf(),
                    row,
                    channel,
                    value: field.to_string(),
                })
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn glob_is_case_insensitive_on_prefix_only() {
        assert!(is_exg_csv("ExG_01.csv"));
        assert!(is_exg_csv("exg.csv"));
        assert!(is_exg_csv("EXG-session2.csv"));
        assert!(!is_exg_csv("ExG_01.CSV"));
        assert!(!is_exg_csv("ecg_01.csv"));
        assert!(!is_exg_csv("ex.csv"));
    }

    #[test]
    fn prefers_compact_subject_folder() {
        let root = TempDir::new().unwrap();
        fs::create_dir(root.path().join("Subject10")).unwrap();
        fs::create_dir(root.path().join("Subject 10")).unwrap();
        assert_eq!(subject_dir(root.path(), 10), root.path().join("Subject10"));
        assert_eq!(subject_dir(root.path(), 11), root.path().join("Subject 11"));
    }

    #[test]
    fn finds_sorted_files_in_spaced_folder() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("Subject 12");
        fs::create_dir(&dir).unwrap();
        write(&dir, "ExG_b.csv", "0,1\n");
        write(&dir, "exg_a.csv", "0,1\n");
        write(&dir, "notes.csv", "0,1\n");
        fs::create_dir(dir.join("exg_dir.csv")).unwrap();

        let files = find_subject_files(root.path(), 12).unwrap();
        assert_eq!(files, vec![dir.join("ExG_b.csv"), dir.join("exg_a.csv")]);
    }

    #[cfg(unix)]
    #[test]
    fn follows_symlinked_files() {
        let root = TempDir::new().unwrap();
        let raw = write(root.path(), "recording.csv", "0,1\n");
        let dir = root.path().join("Subject10");
        fs::create_dir(&dir).unwrap();
        std::os::unix::fs::symlink(&raw, dir.join("ExG_1.csv")).unwrap();
        write(&dir, "ExG_2.csv", "0,1\n");

        let files = find_subject_files(root.path(), 10).unwrap();
        assert_eq!(files, vec![dir.join("ExG_1.csv"), dir.join("ExG_2.csv")]);
    }

    #[test]
    fn missing_subject_is_descriptive() {
        let root = TempDir::new().unwrap();
        let err = find_subject_files(root.path(), 13).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LoadError>(),
            Some(LoadError::NoSubjectFiles { subject: 13, .. })
        ));
        assert!(err.to_string().starts_with("No CSV files for Subject13 under"));
    }

    #[test]
    fn empty_subject_folder_is_an_error() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("Subject10");
        fs::create_dir(&dir).unwrap();
        write(&dir, "other.csv", "1,2\n");
        assert!(find_subject_files(root.path(), 10).is_err());
    }

    #[test]
    fn trims_trailing_incomplete_rows() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "exg.csv",
            "0,1.5,9\n1,2.5,9\n2,3.5,9\n3,,\n,,\n4,5.5\n",
        );
        assert_eq!(read_exg_column(&path, 1).unwrap(), vec![1.5, 2.5, 3.5]);
    }

    #[test]
    fn interior_gaps_become_nan() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "exg.csv", "0,1\n1,\n2,NaN\n3,4\n");
        let col = read_exg_column(&path, 1).unwrap();
        assert_eq!(col.len(), 4);
        assert_eq!(col[0], 1.0);
        assert!(col[1].is_nan());
        assert!(col[2].is_nan());
        assert_eq!(col[3], 4.0);
    }

    #[test]
    fn pandas_na_tokens_are_missing() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "exg.csv",
            "0,1\n1,None\n2,n/a\n3,<NA>\n4,#N/A\n5,2\n",
        );
        let col = read_exg_column(&path, 1).unwrap();
        assert_eq!(col.len(), 6);
        assert!(col[1..5].iter().all(|v| v.is_nan()));
        assert_eq!(col[5], 2.0);
    }

    #[test]
    fn channel_out_of_range() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "exg.csv", "0,1\n1,2\n");
        let err = read_exg_column(&path, 2).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LoadError>(),
            Some(LoadError::MissingChannel { width: 2, .. })
        ));
    }

    #[test]
    fn non_numeric_channel_value() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "exg.csv", "0,1\n1,abc\n2,3\n");
        let err = read_exg_column(&path, 1).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LoadError>(),
            Some(LoadError::BadValue { row: 1, .. })
        ));
    }
}
