use std::fmt::Display;
use std::io::Write;
use std::str::FromStr;

use anyhow::bail;
use serde::{
    Deserialize,
    Serialize,
};

/// Output compression of the per-site and per-variant tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Compression {
    None,
    #[default]
    Gz,
    Zstd,
}

impl Compression {
    pub fn name(&self) -> &str {
        match self {
            Compression::None => "none",
            Compression::Gz => "gzip",
            Compression::Zstd => "zstd",
        }
    }

    /// Suffix appended to file names, including the dot.
    pub fn extension(&self) -> &str {
        match self {
            Compression::None => "",
            Compression::Gz => ".gz",
            Compression::Zstd => ".zst",
        }
    }

    pub fn get_encoder<W: Write>(
        &self,
        handle: W,
        compression_level: u32,
    ) -> anyhow::Result<Encoder<W>> {
        let encoder = match self {
            Compression::None => Encoder::Plain(handle),
            #[cfg(feature = "compression")]
            Compression::Gz => Encoder::Gz(flate2::write::GzEncoder::new(
                handle,
                flate2::Compression::new(compression_level),
            )),
            #[cfg(feature = "compression")]
            Compression::Zstd => Encoder::Zstd(zstd::Encoder::new(
                handle,
                compression_level as i32,
            )?),
            #[cfg(not(feature = "compression"))]
            other => {
                let _ = (handle, compression_level);
                bail!("Built without support for {} output", other.name())
            },
        };
        Ok(encoder)
    }
}

/// Output stream of a [`Compression`]. Must be closed with
/// [`Encoder::finish`], which writes the gzip trailer or the last zstd
/// frame and reports failures doing so.
pub enum Encoder<W: Write> {
    Plain(W),
    #[cfg(feature = "compression")]
    Gz(flate2::write::GzEncoder<W>),
    #[cfg(feature = "compression")]
    Zstd(zstd::Encoder<'static, W>),
}

impl<W: Write> Encoder<W> {
    /// Finalizes the stream and returns the flushed inner writer.
    pub fn finish(self) -> std::io::Result<W> {
        let mut inner = match self {
            Encoder::Plain(handle) => handle,
            #[cfg(feature = "compression")]
            Encoder::Gz(encoder) => encoder.finish()?,
            #[cfg(feature = "compression")]
            Encoder::Zstd(encoder) => encoder.finish()?,
        };
        inner.flush()?;
        Ok(inner)
    }
}

impl<W: Write> Write for Encoder<W> {
    fn write(
        &mut self,
        buf: &[u8],
    ) -> std::io::Result<usize> {
        match self {
            Encoder::Plain(handle) => handle.write(buf),
            #[cfg(feature = "compression")]
            Encoder::Gz(encoder) => encoder.write(buf),
            #[cfg(feature = "compression")]
            Encoder::Zstd(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Encoder::Plain(handle) => handle.flush(),
            #[cfg(feature = "compression")]
            Encoder::Gz(encoder) => encoder.flush(),
            #[cfg(feature = "compression")]
            Encoder::Zstd(encoder) => encoder.flush(),
        }
    }
}

impl FromStr for Compression {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Compression::None),
            "gz" | "gzip" => Ok(Compression::Gz),
            "zst" | "zstd" => Ok(Compression::Zstd),
            other => bail!("Unknown compression '{}'", other),
        }
    }
}

impl Display for Compression {
    #[cfg_attr(coverage_nightly, coverage(off))]
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
