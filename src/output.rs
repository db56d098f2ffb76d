// src/output.rs

use anyhow::{bail, Context, Result};
use csv::{QuoteStyle, Terminator, Writer, WriterBuilder};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use tracing::debug;

/// Flat-file sink for one output table.
///
/// Rows go to a temporary file in the destination directory; the file is
/// only renamed over the destination once it is complete, so a failed run
/// never leaves a half-written table in place of a previous one.
pub struct TableWriter {
    path: PathBuf,
    columns: Vec<String>,
    writer: Writer<NamedTempFile>,
    rows: u64,
}

/// A fully written and synced table that has not replaced its destination yet.
pub struct SealedTable {
    path: PathBuf,
    tmp: NamedTempFile,
    rows: u64,
}

impl TableWriter {
    /// Open a sink for `path` whose rows carry exactly `columns.len()` fields.
    pub fn create<S: AsRef<str>>(
        path: impl AsRef<Path>,
        columns: &[S],
        delimiter: u8,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating output directory {}", dir.display()))?;

        let tmp = NamedTempFile::new_in(&dir)
            .with_context(|| format!("creating temporary file in {}", dir.display()))?;
        let writer = WriterBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .quote_style(QuoteStyle::Necessary)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(tmp);

        Ok(Self {
            path,
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            writer,
            rows: 0,
        })
    }

    /// Emit the column names as a first line. Not counted as a row.
    pub fn write_header(&mut self) -> Result<()> {
        self.writer
            .write_record(&self.columns)
            .with_context(|| format!("writing header to {}", self.path.display()))
    }

    pub fn write_row<S: AsRef<str>>(&mut self, row: &[S]) -> Result<()> {
        if row.len() != self.columns.len() {
            bail!(
                "{}: row has {} fields, table expects {} ({})",
                self.path.display(),
                row.len(),
                self.columns.len(),
                self.columns.join(", ")
            );
        }
        self.writer
            .write_record(row.iter().map(|f| f.as_ref()))
            .with_context(|| format!("writing row to {}", self.path.display()))?;
        self.rows += 1;
        Ok(())
    }

    /// Flush and sync everything written so far without touching the destination.
    pub fn seal(self) -> Result<SealedTable> {
        let Self {
            path, writer, rows, ..
        } = self;
        let tmp = writer
            .into_inner()
            .map_err(|e| e.into_error())
            .with_context(|| format!("flushing {}", path.display()))?;
        tmp.as_file()
            .sync_all()
            .with_context(|| format!("syncing {}", path.display()))?;
        Ok(SealedTable { path, tmp, rows })
    }

    /// Seal and move the table into place. Returns the number of rows written.
    pub fn finish(self) -> Result<u64> {
        self.seal()?.persist()
    }
}

impl SealedTable {
    /// Rename the finished table over its destination.
    pub fn persist(self) -> Result<u64> {
        let Self { path, tmp, rows } = self;
        tmp.persist(&path)
            .with_context(|| format!("renaming temporary file -> {}", path.display()))?;
        debug!(path = %path.display(), rows, "table written");
        Ok(rows)
    }
}

/// Finish a group of tables fed from one source. Every table is flushed and
/// synced before any destination is replaced, so a flush failure leaves all
/// previous outputs of the group untouched.
pub fn commit_all<K>(tables: Vec<(K, TableWriter)>) -> Result<Vec<(K, u64)>> {
    let mut sealed = Vec::with_capacity(tables.len());
    for (key, w) in tables {
        sealed.push((key, w.seal()?));
    }
    let mut rows = Vec::with_capacity(sealed.len());
    for (key, s) in sealed {
        rows.push((key, s.persist()?));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    #[test]
    fn test_rows_and_quoting() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("t.txt");

        let mut w = TableWriter::create(&path, &["id", "name"], b'|')?;
        w.write_row(&["1", "plain"])?;
        w.write_row(&["2", "has|pipe"])?;
        w.write_row(&["3", ""])?;
        assert_eq!(w.finish()?, 3);

        let text = fs::read_to_string(&path)?;
        assert_eq!(text, "1|plain\n2|\"has|pipe\"\n3|\n");
        Ok(())
    }

    #[test]
    fn test_width_mismatch_leaves_no_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("t.txt");

        let mut w = TableWriter::create(&path, &["a", "b"], b'|')?;
        w.write_row(&["x", "y"])?;
        let err = w.write_row(&["only-one"]).unwrap_err().to_string();
        assert!(err.contains("expects 2"), "unexpected error: {}", err);
        drop(w);

        assert!(!path.exists());
        assert_eq!(fs::read_dir(dir.path())?.count(), 0);
        Ok(())
    }

    #[test]
    fn test_header_then_overwrite() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("t.txt");
        fs::write(&path, "stale contents\nmore\n")?;

        let mut w = TableWriter::create(&path, &["a"], b',')?;
        w.write_header()?;
        w.write_row(&["fresh"])?;
        assert_eq!(w.finish()?, 1);

        assert_eq!(fs::read_to_string(&path)?, "a\nfresh\n");
        Ok(())
    }

    #[test]
    fn test_commit_all_replaces_only_after_every_seal() -> Result<()> {
        let dir = tempdir()?;
        let first = dir.path().join("first.txt");
        let second = dir.path().join("second.txt");
        fs::write(&first, "old first\n")?;
        fs::write(&second, "old second\n")?;

        let mut a = TableWriter::create(&first, &["x"], b'|')?;
        a.write_row(&["new"])?;
        let sealed = a.seal()?;
        // nothing replaced until persist
        assert_eq!(fs::read_to_string(&first)?, "old first\n");
        drop(sealed);
        assert_eq!(fs::read_to_string(&first)?, "old first\n");

        let mut a = TableWriter::create(&first, &["x"], b'|')?;
        let mut b = TableWriter::create(&second, &["x"], b'|')?;
        a.write_row(&["1"])?;
        b.write_row(&["2"])?;
        b.write_row(&["3"])?;
        let counts = commit_all(vec![("first", a), ("second", b)])?;
        assert_eq!(counts, vec![("first", 1), ("second", 2)]);
        assert_eq!(fs::read_to_string(&first)?, "1\n");
        assert_eq!(fs::read_to_string(&second)?, "2\n3\n");
        Ok(())
    }
}
