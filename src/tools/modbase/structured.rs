use rust_htslib::bam;

use super::{
    ModCall,
    ModificationDecoder,
    CANONICAL_BASE,
    MOD_CODES,
};

/// Decoder backed by htslib's per-position modification iterator.
///
/// htslib already reports offsets in stored-sequence orientation and
/// resolves multi-code segments, so only filtering is left here.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredDecoder;

impl ModificationDecoder for StructuredDecoder {
    fn name(&self) -> &'static str {
        "structured"
    }

    fn decode(
        &self,
        record: &bam::Record,
    ) -> anyhow::Result<Vec<ModCall>> {
        let mut calls = Vec::new();
        for position in record.basemods_position_iter()? {
            let (offset, mods) = position?;
            if offset < 0 {
                continue;
            }
            for m in mods.iter() {
                if m.canonical_base != CANONICAL_BASE as i32 || m.strand != 0 {
                    continue;
                }
                let Some(code) = u8::try_from(m.modified_base)
                    .ok()
                    .map(char::from)
                    .filter(|c| MOD_CODES.contains(c))
                else {
                    continue;
                };
                // Missing ML value.
                let Ok(quality) = u8::try_from(m.qual) else {
                    continue;
                };
                calls.push(ModCall::from_quality(offset as usize, quality, code));
            }
        }
        Ok(calls)
    }
}
