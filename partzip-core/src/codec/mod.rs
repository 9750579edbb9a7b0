use crate::error::{PartzipError, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

/// Container and compression used for each partition's archive. Every
/// variant but `Zip` is a tar stream wrapped in the named compression.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecId {
    Store,
    #[default]
    Zstd,
    Gzip,
    /// Zip container with per-entry Deflate.
    Zip,
}

impl CodecId {
    pub fn extension(self) -> &'static str {
        match self {
            CodecId::Store => "tar",
            CodecId::Zstd => "tar.zst",
            CodecId::Gzip => "tar.gz",
            CodecId::Zip => "zip",
        }
    }

    pub fn default_level(self) -> i32 {
        match self {
            CodecId::Store => 0,
            CodecId::Zstd => 3,
            CodecId::Gzip | CodecId::Zip => 6,
        }
    }

    pub fn check_level(self, level: i32) -> Result<()> {
        let ok = match self {
            CodecId::Store => true,
            CodecId::Zstd => (1..=22).contains(&level),
            CodecId::Gzip | CodecId::Zip => (0..=9).contains(&level),
        };
        if ok {
            Ok(())
        } else {
            Err(PartzipError::InvalidOption(format!(
                "level {level} out of range for {self}"
            )))
        }
    }

    pub fn is_tar_stream(self) -> bool {
        self != CodecId::Zip
    }

    /// Compression for a tar stream; zip compresses per entry instead.
    pub fn encoder<W: Write>(self, dst: W, level: i32) -> io::Result<Encoder<W>> {
        Ok(match self {
            CodecId::Store => Encoder::Store(dst),
            CodecId::Zstd => Encoder::Zstd(zstd::stream::write::Encoder::new(dst, level.max(1))?),
            CodecId::Gzip => {
                Encoder::Gzip(GzEncoder::new(dst, Compression::new(level.clamp(0, 9) as u32)))
            }
            CodecId::Zip => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "zip archives are not tar streams",
                ));
            }
        })
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CodecId::Store => "store",
            CodecId::Zstd => "zstd",
            CodecId::Gzip => "gzip",
            CodecId::Zip => "zip",
        })
    }
}

impl FromStr for CodecId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "store" | "none" | "tar" => Ok(CodecId::Store),
            "zstd" | "zst" => Ok(CodecId::Zstd),
            "gzip" | "gz" => Ok(CodecId::Gzip),
            "zip" => Ok(CodecId::Zip),
            other => Err(format!(
                "unknown codec `{other}` (expected zstd, gzip, zip or store)"
            )),
        }
    }
}

pub enum Encoder<W: Write> {
    Store(W),
    Zstd(zstd::stream::write::Encoder<'static, W>),
    Gzip(GzEncoder<W>),
}

impl<W: Write> Encoder<W> {
    /// Writes the codec trailer and hands back the underlying writer.
    pub fn finish(self) -> io::Result<W> {
        match self {
            Encoder::Store(mut w) => {
                w.flush()?;
                Ok(w)
            }
            Encoder::Zstd(e) => e.finish(),
            Encoder::Gzip(e) => e.finish(),
        }
    }
}

impl<W: Write> Write for Encoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Encoder::Store(w) => w.write(buf),
            Encoder::Zstd(e) => e.write(buf),
            Encoder::Gzip(e) => e.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Encoder::Store(w) => w.flush(),
            Encoder::Zstd(e) => e.flush(),
            Encoder::Gzip(e) => e.flush(),
        }
    }
}
