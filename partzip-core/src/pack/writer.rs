use crate::codec::{CodecId, Encoder};
use crate::domain::{FileRecord, Partition};
use crate::pack::runner::CancelToken;
use crate::stats::{PartitionReport, SkippedFile};
use crate::util::hash_forward::HashingForward;
use std::collections::HashSet;
use std::fs::{File, Metadata};
use std::io::{self, BufWriter, Read};
use std::path::Path;
use tar::{Builder, EntryType, Header};
use time::OffsetDateTime;
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

#[derive(Clone, Debug, Default)]
pub struct PackOptions {
    pub codec: CodecId,
    /// Codec level; `None` picks the codec's default.
    pub level: Option<i32>,
    /// When true, zero entry mtimes for reproducible archives.
    pub deterministic: bool,
    /// Bounded worker count; `None` runs one thread per partition.
    pub jobs: Option<usize>,
    pub cancel: CancelToken,
}

impl PackOptions {
    pub fn effective_level(&self) -> i32 {
        self.level.unwrap_or_else(|| self.codec.default_level())
    }
}

/// `partition_<ordinal>.<ext>`
pub fn archive_name(partition: &Partition, codec: CodecId) -> String {
    format!("partition_{}.{}", partition.ordinal(), codec.extension())
}

/// Builds one partition's archive. Per-file failures are recorded in the
/// returned report and the remaining files are still attempted; the archive
/// is finalized whenever it could be created.
pub fn write_partition(
    partition: &Partition,
    out_dir: &Path,
    opts: &PackOptions,
) -> PartitionReport {
    let archive_path = out_dir.join(archive_name(partition, opts.codec));
    let mut report = PartitionReport::new(partition.index, archive_path.clone());

    let mut archive = match ArchiveWriter::create(&archive_path, opts) {
        Ok(a) => a,
        Err(e) => {
            warn!(archive = %archive_path.display(), error = %e, "cannot create archive");
            report.archive_error = Some(format!("create {}: {e}", archive_path.display()));
            return report;
        }
    };
    let mut names = HashSet::new();

    for file in &partition.files {
        if opts.cancel.is_cancelled() {
            debug!(partition = partition.ordinal(), "cancelled; finalizing early");
            report.cancelled = true;
            break;
        }
        let Some(name) = file.entry_name() else {
            report.skipped.push(skip(file, "path has no file name".to_string()));
            continue;
        };
        if !names.insert(name.to_path_buf()) {
            if !opts.codec.is_tar_stream() {
                // zip central directories cannot hold two entries with one name
                report.skipped.push(skip(
                    file,
                    format!("duplicate entry name `{}` in zip archive", name.display()),
                ));
                continue;
            }
            warn!(
                archive = %report.archive_name(),
                entry = %name.display(),
                "duplicate entry name; the later entry shadows the earlier one on extraction"
            );
        }
        let appended = append_file(&mut archive, file, name, opts.deterministic);
        tally(&mut report, file, appended);
    }

    match archive.finish(&archive_path) {
        Ok((hash, bytes_out)) => {
            report.blake3 = Some(hash.to_hex().to_string());
            report.bytes_out = bytes_out;
        }
        Err(e) => {
            report.archive_error = Some(format!("finalize {}: {e}", archive_path.display()));
        }
    }
    report
}

/// Files land in exactly one of `entries_written`, `damaged` or `skipped`.
fn tally(report: &mut PartitionReport, file: &FileRecord, appended: io::Result<Appended>) {
    match appended {
        Ok(Appended::Whole(n)) => {
            report.entries_written += 1;
            report.bytes_in += n;
        }
        Ok(Appended::Padded {
            read,
            declared,
            cause,
        }) => {
            let reason = format!(
                "read stopped after {read} of {declared} bytes ({cause}); entry zero-padded"
            );
            warn!(file = %file.path.display(), %reason, "entry damaged");
            report.damaged.push(SkippedFile {
                path: file.path.clone(),
                reason,
            });
        }
        Err(e) => report.skipped.push(skip(file, e.to_string())),
    }
}

fn skip(file: &FileRecord, reason: String) -> SkippedFile {
    warn!(file = %file.path.display(), %reason, "file skipped");
    SkippedFile {
        path: file.path.clone(),
        reason,
    }
}

type Sink = Encoder<HashingForward<BufWriter<File>>>;

struct EntryMeta {
    size: u64,
    mode: u32,
    mtime: u64,
}

/// The open output for one partition, owned by its task.
enum ArchiveWriter {
    Tar(Builder<Sink>),
    Zip {
        zip: ZipWriter<BufWriter<File>>,
        level: i32,
    },
}

impl ArchiveWriter {
    fn create(path: &Path, opts: &PackOptions) -> io::Result<Self> {
        let buffered = BufWriter::with_capacity(1 << 16, File::create(path)?);
        if opts.codec.is_tar_stream() {
            let sink = opts
                .codec
                .encoder(HashingForward::new(buffered), opts.effective_level())?;
            Ok(Self::Tar(Builder::new(sink)))
        } else {
            Ok(Self::Zip {
                zip: ZipWriter::new(buffered),
                level: opts.effective_level(),
            })
        }
    }

    fn append(&mut self, name: &Path, meta: &EntryMeta, body: &mut dyn Read) -> io::Result<()> {
        match self {
            Self::Tar(builder) => {
                let mut header = Header::new_gnu();
                header.set_entry_type(EntryType::Regular);
                header.set_size(meta.size);
                header.set_mode(meta.mode);
                header.set_mtime(meta.mtime);
                builder.append_data(&mut header, name, body)
            }
            Self::Zip { zip, level } => {
                let options = SimpleFileOptions::default()
                    .compression_method(CompressionMethod::Deflated)
                    .compression_level(Some(i64::from(*level)))
                    .unix_permissions(meta.mode)
                    .last_modified_time(zip_time(meta.mtime))
                    .large_file(meta.size >= u64::from(u32::MAX));
                zip.start_file(name.to_string_lossy().into_owned(), options)
                    .map_err(io::Error::other)?;
                io::copy(body, zip)?;
                Ok(())
            }
        }
    }

    /// Writes trailers and returns the archive's BLAKE3 digest and length.
    fn finish(self, path: &Path) -> io::Result<(blake3::Hash, u64)> {
        match self {
            Self::Tar(builder) => {
                let sink = builder.into_inner()?;
                let (buffered, hash, n) = sink.finish()?.into_parts();
                let f = buffered.into_inner().map_err(|e| e.into_error())?;
                f.sync_all()?;
                Ok((hash, n))
            }
            Self::Zip { zip, .. } => {
                let buffered = zip.finish().map_err(io::Error::other)?;
                let f = buffered.into_inner().map_err(|e| e.into_error())?;
                f.sync_all()?;
                drop(f);
                // zip seeks back to patch headers, so hash the finished file
                let mut hasher = blake3::Hasher::new();
                let n = io::copy(&mut File::open(path)?, &mut hasher)?;
                Ok((hasher.finalize(), n))
            }
        }
    }
}

/// Zip stores DOS time; anything before 1980 falls back to its epoch.
fn zip_time(mtime: u64) -> DateTime {
    let Ok(t) = OffsetDateTime::from_unix_timestamp(i64::try_from(mtime).unwrap_or(i64::MAX))
    else {
        return DateTime::default();
    };
    let Ok(year) = u16::try_from(t.year()) else {
        return DateTime::default();
    };
    DateTime::from_date_and_time(
        year,
        u8::from(t.month()),
        t.day(),
        t.hour(),
        t.minute(),
        t.second(),
    )
    .unwrap_or_default()
}

enum Appended {
    Whole(u64),
    Padded {
        read: u64,
        declared: u64,
        cause: String,
    },
}

fn append_file(
    archive: &mut ArchiveWriter,
    file: &FileRecord,
    name: &Path,
    deterministic: bool,
) -> io::Result<Appended> {
    let mut src = File::open(&file.path)?;
    let md = src.metadata()?;
    if !md.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "no longer a regular file",
        ));
    }
    let meta = EntryMeta {
        size: md.len(),
        mode: mode_from(&md),
        mtime: if deterministic { 0 } else { mtime_from(&md) },
    };

    let mut body = ExactReader::new(&mut src, meta.size);
    archive.append(name, &meta, &mut body)?;
    debug!(entry = %name.display(), bytes = meta.size, "entry written");

    Ok(match body.shortfall {
        None => Appended::Whole(meta.size),
        Some(cause) => Appended::Padded {
            read: body.consumed,
            declared: meta.size,
            cause,
        },
    })
}

/// Yields exactly `len` bytes: the source's bytes, then zeros if the source
/// ends early or fails. Keeps the archive well-formed when a file shrinks
/// or turns unreadable after its entry header has been written.
struct ExactReader<'a, R: Read> {
    inner: &'a mut R,
    remaining: u64,
    consumed: u64,
    shortfall: Option<String>,
}

impl<'a, R: Read> ExactReader<'a, R> {
    fn new(inner: &'a mut R, len: u64) -> Self {
        Self {
            inner,
            remaining: len,
            consumed: 0,
            shortfall: None,
        }
    }
}

impl<'a, R: Read> Read for ExactReader<'a, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let want = buf.len().min(usize::try_from(self.remaining).unwrap_or(usize::MAX));
        let n = if self.shortfall.is_some() {
            buf[..want].fill(0);
            want
        } else {
            match self.inner.read(&mut buf[..want]) {
                Ok(0) => {
                    self.shortfall = Some("unexpected end of file".to_string());
                    buf[..want].fill(0);
                    want
                }
                Ok(n) => {
                    self.consumed += n as u64;
                    n
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => return Err(e),
                Err(e) => {
                    self.shortfall = Some(e.to_string());
                    buf[..want].fill(0);
                    want
                }
            }
        };
        self.remaining -= n as u64;
        Ok(n)
    }
}

fn mode_from(_md: &Metadata) -> u32 {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        _md.permissions().mode() & 0o7777
    }
    #[cfg(not(unix))]
    {
        0o644
    }
}

fn mtime_from(md: &Metadata) -> u64 {
    md.modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
