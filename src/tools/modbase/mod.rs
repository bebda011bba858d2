//! Per-read base-modification decoding from MM/ML annotations.
//!
//! Two implementations share the [`ModificationDecoder`] interface:
//! [`StructuredDecoder`] walks calls through htslib's modification API and
//! is used whenever the current `MM`/`ML` tags are present;
//! [`TagStringDecoder`] parses the tag text itself and handles legacy
//! `Mm`/`Ml` tags or records htslib refuses to parse.

mod structured;
mod tag_string;

use log::debug;
use rust_htslib::bam;
use rust_htslib::bam::record::Aux;
pub use structured::StructuredDecoder;
pub use tag_string::{
    parse_mm_ml,
    TagStringDecoder,
};

use crate::data_structs::typedef::DensityType;

pub const MM_TAGS: [&[u8]; 2] = [b"MM", b"Mm"];
pub const ML_TAGS: [&[u8]; 2] = [b"ML", b"Ml"];

/// Canonical base whose modifications are reported.
pub const CANONICAL_BASE: u8 = b'C';
/// 5mC and 5hmC.
pub const MOD_CODES: [char; 2] = ['m', 'h'];

/// A single modification call on a read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModCall {
    /// 0-based offset into the stored read sequence.
    pub read_offset: usize,
    pub probability: DensityType,
    pub code:        char,
}

impl ModCall {
    pub(crate) fn from_quality(
        read_offset: usize,
        quality: u8,
        code: char,
    ) -> Self {
        Self {
            read_offset,
            probability: quality as DensityType / 255.0,
            code,
        }
    }
}

pub trait ModificationDecoder: Sync {
    fn name(&self) -> &'static str;

    /// Calls of interest, in no particular order. An `Err` means the
    /// annotation is malformed.
    fn decode(
        &self,
        record: &bam::Record,
    ) -> anyhow::Result<Vec<ModCall>>;
}

/// Which annotation flavour a record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationKind {
    Current,
    Legacy,
    Missing,
}

impl AnnotationKind {
    pub fn inspect(record: &bam::Record) -> Self {
        if record.aux(MM_TAGS[0]).is_ok() {
            AnnotationKind::Current
        }
        else if record.aux(MM_TAGS[1]).is_ok() {
            AnnotationKind::Legacy
        }
        else {
            AnnotationKind::Missing
        }
    }
}

pub(crate) fn aux_string(
    record: &bam::Record,
    tags: &[&[u8]],
) -> Option<String> {
    tags.iter().find_map(|tag| {
        match record.aux(tag) {
            Ok(Aux::String(value)) => Some(value.to_string()),
            _ => None,
        }
    })
}

pub(crate) fn aux_u8_array(
    record: &bam::Record,
    tags: &[&[u8]],
) -> Option<Vec<u8>> {
    tags.iter().find_map(|tag| {
        match record.aux(tag) {
            Ok(Aux::ArrayU8(values)) => Some(values.iter().collect()),
            _ => None,
        }
    })
}

static STRUCTURED: StructuredDecoder = StructuredDecoder;
static TAG_STRING: TagStringDecoder = TagStringDecoder;

/// Picks the decoder for `record`, `None` when it carries no annotation.
pub fn select_decoder(
    record: &bam::Record
) -> Option<&'static dyn ModificationDecoder> {
    match AnnotationKind::inspect(record) {
        AnnotationKind::Current => Some(&STRUCTURED),
        AnnotationKind::Legacy => Some(&TAG_STRING),
        AnnotationKind::Missing => None,
    }
}

/// Decodes a record's modification calls. Missing or malformed
/// annotations yield an empty list.
pub fn decode_modifications(record: &bam::Record) -> Vec<ModCall> {
    let Some(decoder) = select_decoder(record) else {
        return Vec::new();
    };
    match decoder.decode(record) {
        Ok(calls) => calls,
        Err(e) if decoder.name() != TAG_STRING.name() => {
            debug!(
                "{} decoder failed on {}: {}, retrying with {}",
                decoder.name(),
                String::from_utf8_lossy(record.qname()),
                e,
                TAG_STRING.name()
            );
            TAG_STRING.decode(record).unwrap_or_else(|e| {
                debug!(
                    "Dropping modifications of {}: {}",
                    String::from_utf8_lossy(record.qname()),
                    e
                );
                Vec::new()
            })
        },
        Err(e) => {
            debug!(
                "Dropping modifications of {}: {}",
                String::from_utf8_lossy(record.qname()),
                e
            );
            Vec::new()
        },
    }
}
