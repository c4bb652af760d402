//! Record source: streams (run_id, run_record) pairs out of the archive.
//!
//! The archive is a single JSON object mapping run id to run record,
//! optionally gzip-compressed, and far too large to materialize. A seeded
//! serde visitor walks the top-level object one entry at a time and hands
//! each record to the caller's sink; only one record is alive at once.
//!
//! The traversal is forward-only and not restartable. A caller needing a
//! second pass must reopen the source.

use crate::error::RfResult;
use crate::model::Run;
use flate2::read::GzDecoder;
use serde::de::{DeserializeSeed, Deserializer, MapAccess, Visitor};
use serde_json::Value;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::{debug, warn};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Opens a text file for reading, transparently decompressing gzip
/// containers (detected by magic bytes) and stripping a UTF-8 BOM.
pub fn open_text_reader(path: &Path) -> RfResult<Box<dyn Read>> {
    let mut probe = File::open(path)?;
    let mut magic = [0u8; 2];
    let n = probe.read(&mut magic)?;
    drop(probe);

    let file = File::open(path)?;
    let inner: Box<dyn Read> = if n == 2 && magic == GZIP_MAGIC {
        Box::new(GzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(file)
    };

    let mut reader = BufReader::new(inner);
    skip_bom(&mut reader)?;
    Ok(Box::new(reader))
}

fn skip_bom<R: Read>(reader: &mut BufReader<R>) -> std::io::Result<()> {
    let buf = reader.fill_buf()?;
    if buf.starts_with(&UTF8_BOM) {
        reader.consume(UTF8_BOM.len());
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SourceStats {
    /// Records handed to the sink.
    pub yielded: u64,
    /// Records whose shape did not deserialize; logged and passed over.
    pub skipped: u64,
}

/// Streams every run in the archive into `sink`, in source order.
///
/// A missing archive yields zero records with a warning. A record whose
/// shape is wrong is skipped; only syntactically invalid JSON ends the pass
/// early (the stream cannot be resynced), and even then the records already
/// consumed stand.
pub fn stream_runs<P, F>(path: P, mut sink: F) -> RfResult<SourceStats>
where
    P: AsRef<Path>,
    F: FnMut(String, Run),
{
    let path = path.as_ref();
    if !path.exists() {
        warn!("Run archive {:?} not found; nothing to stream.", path);
        return Ok(SourceStats::default());
    }

    let reader = open_text_reader(path)?;
    let mut de = serde_json::Deserializer::from_reader(reader);
    let mut stats = SourceStats::default();

    let seed = RunMapSeed {
        sink: &mut sink,
        stats: &mut stats,
    };
    if let Err(e) = seed.deserialize(&mut de) {
        warn!(
            "Run archive {:?} aborted mid-stream after {} records: {}",
            path, stats.yielded, e
        );
    }
    Ok(stats)
}

struct RunMapSeed<'a, F> {
    sink: &'a mut F,
    stats: &'a mut SourceStats,
}

impl<'de, F: FnMut(String, Run)> DeserializeSeed<'de> for RunMapSeed<'_, F> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de, F: FnMut(String, Run)> Visitor<'de> for RunMapSeed<'_, F> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a map of run id to run record")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<(), A::Error> {
        while let Some(run_id) = map.next_key::<String>()? {
            // Buffer one record as a Value so a shape mismatch skips the
            // record instead of poisoning the whole traversal.
            let value: Value = map.next_value()?;
            match serde_json::from_value::<Run>(value) {
                Ok(run) => {
                    self.stats.yielded += 1;
                    (self.sink)(run_id, run);
                }
                Err(e) => {
                    self.stats.skipped += 1;
                    debug!("Skipping malformed run {}: {}", run_id, e);
                }
            }
        }
        Ok(())
    }
}
