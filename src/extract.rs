// src/extract.rs
use anyhow::{anyhow, bail, Context, Result};
use csv::{ErrorKind, ReaderBuilder, StringRecord};
use std::{fs::File, io::Read, path::Path, time::Instant};
use tracing::{debug, info, instrument};

use crate::output::TableWriter;
use crate::record::{clean_for_sql, Record};

/// How to split input records and which fields to keep.
#[derive(Debug, Clone)]
pub struct ExtractSpec {
    pub delimiter: u8,
    pub output_delimiter: u8,
    /// Skip the first line of the input.
    pub has_header: bool,
    /// Required field count per record. `None` takes the first record's count.
    pub expected_fields: Option<usize>,
    /// 0-based positions to keep, in output order. Empty keeps all fields.
    pub columns: Vec<usize>,
    /// Apply `clean_for_sql` to every kept field.
    pub clean: bool,
    /// Start the output with a line of column names, taken from the input
    /// header when there is one and `field_<N>` otherwise.
    pub with_header: bool,
}

impl Default for ExtractSpec {
    fn default() -> Self {
        Self {
            delimiter: b',',
            output_delimiter: b'|',
            has_header: false,
            expected_fields: None,
            columns: Vec::new(),
            clean: false,
            with_header: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractStats {
    pub records: u64,
    pub lines: u64,
}

/// Read `input`, keep the fields named by `spec`, and write one line per
/// record to `output` (created or replaced).
#[instrument(level = "info", skip(input, output, spec), fields(input = %input.as_ref().display()))]
pub fn extract_file<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    spec: &ExtractSpec,
) -> Result<ExtractStats> {
    let start = Instant::now();
    let input = input.as_ref();
    let output = output.as_ref();

    let file = File::open(input).with_context(|| format!("opening {}", input.display()))?;

    let mut rdr = build_reader(file, spec);
    let source_names: Vec<String> = if spec.has_header {
        rdr.headers()
            .with_context(|| format!("reading header of {}", input.display()))?
            .iter()
            .map(str::to_string)
            .collect()
    } else {
        Vec::new()
    };

    // Output is only opened once the input is known to exist.
    let stats = match output_width(spec) {
        Some(width) => {
            let mut sink = open_sink(output, &source_names, width, spec)?;
            let stats = stream_records(&mut rdr, &mut sink, spec)
                .with_context(|| format!("extracting {}", input.display()))?;
            sink.finish()?;
            stats
        }
        None => {
            // width is only known after the first record
            let records = read_all(&mut rdr, spec)
                .with_context(|| format!("extracting {}", input.display()))?;
            let width = records
                .first()
                .map(Record::width)
                .unwrap_or(source_names.len());
            let mut sink = open_sink(output, &source_names, width, spec)?;
            for rec in &records {
                write_selected(&mut sink, rec, spec)?;
            }
            let lines = sink.finish()?;
            ExtractStats {
                records: records.len() as u64,
                lines,
            }
        }
    };

    info!(
        records = stats.records,
        lines = stats.lines,
        elapsed = ?start.elapsed(),
        output = %output.display(),
        "extraction complete"
    );
    Ok(stats)
}

/// Stream records from `reader` into `sink`. The sink must have been opened
/// with one column per output field.
pub fn extract_records<R: Read>(
    reader: R,
    sink: &mut TableWriter,
    spec: &ExtractSpec,
) -> Result<ExtractStats> {
    let mut rdr = build_reader(reader, spec);
    if spec.with_header {
        sink.write_header()?;
    }
    stream_records(&mut rdr, sink, spec)
}

fn stream_records<R: Read>(
    rdr: &mut csv::Reader<R>,
    sink: &mut TableWriter,
    spec: &ExtractSpec,
) -> Result<ExtractStats> {
    let mut stats = ExtractStats::default();
    let mut raw = StringRecord::new();
    let mut width = spec.expected_fields;

    while let Some(rec) = next_record(rdr, &mut raw, &mut width)? {
        stats.records += 1;
        write_selected(sink, &rec, spec)?;
        stats.lines += 1;
    }
    debug!(records = stats.records, "records extracted");
    Ok(stats)
}

/// Output column names: the input header's names for the kept columns, or
/// `field_<N>` where the input has none.
fn column_names(source_names: &[String], width: usize, spec: &ExtractSpec) -> Vec<String> {
    (0..width)
        .map(|i| {
            let src = spec.columns.get(i).copied().unwrap_or(i);
            source_names
                .get(src)
                .cloned()
                .unwrap_or_else(|| format!("field_{}", src))
        })
        .collect()
}

fn open_sink(
    output: &Path,
    source_names: &[String],
    width: usize,
    spec: &ExtractSpec,
) -> Result<TableWriter> {
    let names = column_names(source_names, width, spec);
    let mut sink = TableWriter::create(output, &names, spec.output_delimiter)?;
    if spec.with_header {
        sink.write_header()?;
    }
    Ok(sink)
}

/// Number of output fields, when it can be known before reading.
fn output_width(spec: &ExtractSpec) -> Option<usize> {
    if !spec.columns.is_empty() {
        Some(spec.columns.len())
    } else {
        spec.expected_fields
    }
}

fn build_reader<R: Read>(reader: R, spec: &ExtractSpec) -> csv::Reader<R> {
    ReaderBuilder::new()
        .delimiter(spec.delimiter)
        .has_headers(spec.has_header)
        // field counts are checked in `next_record` so errors carry our wording
        .flexible(true)
        .from_reader(reader)
}

fn read_all<R: Read>(rdr: &mut csv::Reader<R>, spec: &ExtractSpec) -> Result<Vec<Record>> {
    let mut raw = StringRecord::new();
    let mut width = spec.expected_fields;
    let mut out = Vec::new();
    while let Some(rec) = next_record(rdr, &mut raw, &mut width)? {
        out.push(rec);
    }
    Ok(out)
}

fn next_record<R: Read>(
    rdr: &mut csv::Reader<R>,
    raw: &mut StringRecord,
    width: &mut Option<usize>,
) -> Result<Option<Record>> {
    let more = rdr.read_record(raw).map_err(|e| {
        let line = e.position().map(|p| p.line()).unwrap_or(0);
        if matches!(e.kind(), ErrorKind::Utf8 { .. }) {
            anyhow!("line {}: invalid UTF-8", line)
        } else {
            anyhow::Error::new(e).context(format!("line {}: unreadable record", line))
        }
    })?;
    if !more {
        return Ok(None);
    }

    let line = raw.position().map(|p| p.line()).unwrap_or(0);
    match *width {
        Some(expected) if raw.len() != expected => bail!(
            "line {}: expected {} fields, found {}",
            line,
            expected,
            raw.len()
        ),
        Some(_) => {}
        None => *width = Some(raw.len()),
    }

    Ok(Some(Record::new(
        line,
        raw.iter().map(str::to_string).collect(),
    )))
}

fn write_selected(sink: &mut TableWriter, rec: &Record, spec: &ExtractSpec) -> Result<()> {
    let picked = rec.select(&spec.columns)?;
    if spec.clean {
        let cleaned: Vec<String> = picked.into_iter().map(clean_for_sql).collect();
        sink.write_row(&cleaned)
    } else {
        sink.write_row(&picked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs;
    use tempfile::tempdir;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,yelpdump::extract=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    const REVIEWS: &str = "\
r1,u1,b1,5,Loved it
r2,u2,b1,2,\"Slow, cold food\"
r3,u1,b2,4,Joe's was fine
";

    #[test]
    fn test_one_line_per_record() -> Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        let input = dir.path().join("reviews.csv");
        let output = dir.path().join("out/reviews.txt");
        fs::write(&input, REVIEWS)?;

        let spec = ExtractSpec {
            columns: vec![0, 2, 4],
            clean: true,
            ..Default::default()
        };
        let stats = extract_file(&input, &output, &spec)?;
        assert_eq!(stats, ExtractStats { records: 3, lines: 3 });

        let text = fs::read_to_string(&output)?;
        assert_eq!(
            text,
            "r1|b1|Loved it\nr2|b1|Slow, cold food\nr3|b2|Joe`s was fine\n"
        );
        assert_eq!(text.lines().count(), 3);
        Ok(())
    }

    #[test]
    fn test_rerun_is_byte_identical() -> Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("reviews.csv");
        let output = dir.path().join("reviews.txt");
        fs::write(&input, REVIEWS)?;

        let spec = ExtractSpec::default();
        extract_file(&input, &output, &spec)?;
        let first = fs::read(&output)?;
        extract_file(&input, &output, &spec)?;
        let second = fs::read(&output)?;
        assert_eq!(first, second);
        assert_eq!(String::from_utf8(first)?.lines().count(), 3);
        Ok(())
    }

    #[test]
    fn test_empty_input_gives_empty_output() -> Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("empty.csv");
        let output = dir.path().join("empty.txt");
        fs::write(&input, "")?;

        for spec in [
            ExtractSpec::default(),
            ExtractSpec {
                columns: vec![1],
                has_header: true,
                ..Default::default()
            },
        ] {
            let stats = extract_file(&input, &output, &spec)?;
            assert_eq!(stats, ExtractStats::default());
            assert_eq!(fs::read(&output)?, Vec::<u8>::new());
        }
        Ok(())
    }

    #[test]
    fn test_header_is_skipped() -> Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("h.psv");
        let output = dir.path().join("h.txt");
        fs::write(&input, "id|name\n1|a\n2|b\n")?;

        let spec = ExtractSpec {
            delimiter: b'|',
            output_delimiter: b'\t',
            has_header: true,
            columns: vec![1, 0],
            ..Default::default()
        };
        let stats = extract_file(&input, &output, &spec)?;
        assert_eq!(stats.lines, 2);
        assert_eq!(fs::read_to_string(&output)?, "a\t1\nb\t2\n");
        Ok(())
    }

    #[test]
    fn test_header_line_from_input_names() -> Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("h.csv");
        let output = dir.path().join("h.txt");
        fs::write(&input, "id,name,city\n1,a,x\n2,b,y\n")?;

        let spec = ExtractSpec {
            has_header: true,
            with_header: true,
            columns: vec![2, 0],
            ..Default::default()
        };
        let stats = extract_file(&input, &output, &spec)?;
        assert_eq!(stats, ExtractStats { records: 2, lines: 2 });
        assert_eq!(fs::read_to_string(&output)?, "city|id\nx|1\ny|2\n");

        // no input header: positional names, width from the first record
        let spec = ExtractSpec {
            with_header: true,
            ..Default::default()
        };
        extract_file(&input, &output, &spec)?;
        assert_eq!(
            fs::read_to_string(&output)?,
            "field_0|field_1|field_2\nid|name|city\n1|a|x\n2|b|y\n"
        );
        Ok(())
    }

    #[test]
    fn test_extract_records_from_reader() -> Result<()> {
        let dir = tempdir()?;
        let output = dir.path().join("picked.txt");
        let spec = ExtractSpec {
            columns: vec![3, 1],
            with_header: true,
            ..Default::default()
        };

        let mut sink = TableWriter::create(&output, &["stars", "user"], spec.output_delimiter)?;
        let stats = extract_records(std::io::Cursor::new(REVIEWS), &mut sink, &spec)?;
        assert_eq!(sink.finish()?, 3);
        assert_eq!(stats, ExtractStats { records: 3, lines: 3 });
        assert_eq!(
            fs::read_to_string(&output)?,
            "stars|user\n5|u1\n2|u2\n4|u1\n"
        );
        Ok(())
    }

    #[test]
    fn test_unwritable_output_fails_and_keeps_input() -> Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("reviews.csv");
        fs::write(&input, REVIEWS)?;
        let blocker = dir.path().join("not_a_dir");
        fs::write(&blocker, "regular file")?;
        let output = blocker.join("reviews.txt");

        for spec in [
            ExtractSpec::default(),
            ExtractSpec {
                columns: vec![0],
                ..Default::default()
            },
        ] {
            let err = format!("{:#}", extract_file(&input, &output, &spec).unwrap_err());
            assert!(err.contains("creating output directory"), "unexpected error: {}", err);
        }
        assert_eq!(fs::read_to_string(&input)?, REVIEWS);
        assert_eq!(fs::read_to_string(&blocker)?, "regular file");
        Ok(())
    }

    #[test]
    fn test_wrong_field_count_fails() -> Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("bad.csv");
        let output = dir.path().join("bad.txt");
        fs::write(&input, "a,b,c\nd,e\nf,g,h\n")?;

        for spec in [
            ExtractSpec::default(),
            ExtractSpec {
                columns: vec![0],
                ..Default::default()
            },
        ] {
            let err = format!("{:#}", extract_file(&input, &output, &spec).unwrap_err());
            assert!(err.contains("line 2"), "unexpected error: {}", err);
            assert!(err.contains("expected 3 fields, found 2"), "unexpected error: {}", err);
            assert!(!output.exists());
        }
        Ok(())
    }

    #[test]
    fn test_expected_fields_enforced_on_first_record() -> Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("bad.csv");
        let output = dir.path().join("bad.txt");
        fs::write(&input, "a,b\nc,d\n")?;

        let spec = ExtractSpec {
            expected_fields: Some(3),
            ..Default::default()
        };
        let err = format!("{:#}", extract_file(&input, &output, &spec).unwrap_err());
        assert!(err.contains("line 1"), "unexpected error: {}", err);
        Ok(())
    }

    #[test]
    fn test_column_out_of_range_fails() -> Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("in.csv");
        let output = dir.path().join("out.txt");
        fs::write(&input, "a,b\n")?;

        let spec = ExtractSpec {
            columns: vec![0, 4],
            ..Default::default()
        };
        let err = format!("{:#}", extract_file(&input, &output, &spec).unwrap_err());
        assert!(err.contains("column 4 out of range"), "unexpected error: {}", err);
        Ok(())
    }

    #[test]
    fn test_missing_input_is_io_error() {
        let dir = tempdir().unwrap();
        let err = extract_file(
            dir.path().join("nope.csv"),
            dir.path().join("out.txt"),
            &ExtractSpec::default(),
        )
        .unwrap_err();
        assert!(err.downcast_ref::<std::io::Error>().is_some());
        assert!(!dir.path().join("out.txt").exists());
    }
}
