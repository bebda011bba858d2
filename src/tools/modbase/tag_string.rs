use anyhow::{
    anyhow,
    bail,
};
use rust_htslib::bam;

use super::{
    aux_string,
    aux_u8_array,
    ModCall,
    ModificationDecoder,
    CANONICAL_BASE,
    ML_TAGS,
    MM_TAGS,
    MOD_CODES,
};

/// Decoder working directly on the MM/ML (or Mm/Ml) tag contents.
#[derive(Debug, Default, Clone, Copy)]
pub struct TagStringDecoder;

impl ModificationDecoder for TagStringDecoder {
    fn name(&self) -> &'static str {
        "tag-string"
    }

    fn decode(
        &self,
        record: &bam::Record,
    ) -> anyhow::Result<Vec<ModCall>> {
        let Some(mm) = aux_string(record, &MM_TAGS) else {
            return Ok(Vec::new());
        };
        let ml = aux_u8_array(record, &ML_TAGS).unwrap_or_default();
        let seq = record.seq().as_bytes();
        parse_mm_ml(&seq, record.is_reverse(), &mm, &ml)
    }
}

/// Header of one MM segment, e.g. `C+hm?`.
#[derive(Debug, PartialEq)]
struct SegmentHeader {
    base:   u8,
    strand: u8,
    codes:  Vec<char>,
}

impl SegmentHeader {
    fn parse(header: &str) -> anyhow::Result<Self> {
        let bytes = header.as_bytes();
        if bytes.len() < 3 {
            bail!("MM segment header '{}' is too short", header)
        }
        let base = bytes[0].to_ascii_uppercase();
        let strand = bytes[1];
        if strand != b'+' && strand != b'-' {
            bail!("MM segment header '{}' has invalid strand", header)
        }
        let codes = header[2..].trim_end_matches(&['.', '?'][..]);
        if codes.is_empty() {
            bail!("MM segment header '{}' has no modification code", header)
        }
        // ChEBI identifiers are a single numeric code.
        let codes = if codes.bytes().all(|b| b.is_ascii_digit()) {
            vec!['?']
        }
        else {
            codes.chars().collect()
        };
        Ok(Self {
            base,
            strand,
            codes,
        })
    }

    fn is_of_interest(&self) -> bool {
        self.base == CANONICAL_BASE && self.strand == b'+'
    }
}

fn complement(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'T' => b'A',
        b'C' => b'G',
        b'G' => b'C',
        other => other,
    }
}

/// Offsets (into the stored sequence) of the canonical base occurrences,
/// in the order the MM skip counts walk them.
fn base_occurrences(
    seq: &[u8],
    base: u8,
    is_reverse: bool,
) -> Vec<usize> {
    let target = if is_reverse { complement(base) } else { base };
    let hit = |i: &usize| base == b'N' || seq[*i].to_ascii_uppercase() == target;
    if is_reverse {
        (0..seq.len()).rev().filter(hit).collect()
    }
    else {
        (0..seq.len()).filter(hit).collect()
    }
}

/// Decodes MM/ML contents for a read with stored sequence `seq`.
///
/// ML values are consumed position-major across all segments, including
/// those that are not reported. Calls whose ML value is missing are
/// dropped; skip counts running past the read are an error.
pub fn parse_mm_ml(
    seq: &[u8],
    is_reverse: bool,
    mm: &str,
    ml: &[u8],
) -> anyhow::Result<Vec<ModCall>> {
    let mut calls = Vec::new();
    let mut ml_offset = 0usize;

    for segment in mm.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        let mut fields = segment.split(',');
        let header = SegmentHeader::parse(fields.next().unwrap_or_default())?;
        let deltas = fields
            .filter(|f| !f.is_empty())
            .map(|f| {
                f.trim()
                    .parse::<usize>()
                    .map_err(|e| anyhow!("Invalid MM skip count '{}': {}", f, e))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let n_codes = header.codes.len();
        if header.is_of_interest() {
            let occurrences = base_occurrences(seq, header.base, is_reverse);
            let mut cursor = 0usize;
            for (call_idx, delta) in deltas.iter().enumerate() {
                cursor += delta;
                let Some(&read_offset) = occurrences.get(cursor) else {
                    bail!(
                        "MM skip counts exceed the {} {} bases of the read",
                        occurrences.len(),
                        header.base as char
                    )
                };
                cursor += 1;

                for (code_idx, code) in header.codes.iter().enumerate() {
                    let ml_idx = ml_offset + call_idx * n_codes + code_idx;
                    let Some(&quality) = ml.get(ml_idx) else {
                        continue;
                    };
                    if MOD_CODES.contains(code) {
                        calls.push(ModCall::from_quality(read_offset, quality, *code));
                    }
                }
            }
        }
        ml_offset += deltas.len() * n_codes;
    }

    Ok(calls)
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;

    #[test]
    fn forward_single_code() {
        // C at offsets 1, 3, 6
        let seq = b"ACGCTTCA";
        let calls = parse_mm_ml(seq, false, "C+m?,0,1;", &[255, 51]).unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].read_offset, 1);
        assert_approx_eq!(calls[0].probability, 1.0);
        assert_eq!(calls[1].read_offset, 6);
        assert_approx_eq!(calls[1].probability, 0.2);
    }

    #[test]
    fn lowercase_bases_are_counted() {
        let calls = parse_mm_ml(b"acgc", false, "C+m,1;", &[128]).unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].read_offset, 3);
    }

    #[test]
    fn reverse_read_counts_from_end() {
        // Original read is the reverse complement, its C's are the G's of
        // the stored sequence read right to left: offsets 5, 2.
        let seq = b"AAGTTGA";
        let calls = parse_mm_ml(seq, true, "C+m,0,0;", &[10, 20]).unwrap();
        let offsets = calls.iter().map(|c| c.read_offset).collect::<Vec<_>>();
        assert_eq!(offsets, vec![5, 2]);
    }

    #[test]
    fn multi_code_segment_interleaves_ml() {
        let seq = b"CC";
        let calls = parse_mm_ml(seq, false, "C+hm,0,0;", &[1, 2, 3, 4]).unwrap();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[0].code, 'h');
        assert_eq!(calls[0].read_offset, 0);
        assert_approx_eq!(calls[0].probability, 1.0 / 255.0);
        assert_eq!(calls[1].code, 'm');
        assert_eq!(calls[1].read_offset, 0);
        assert_approx_eq!(calls[1].probability, 2.0 / 255.0);
        assert_eq!(calls[3].read_offset, 1);
        assert_approx_eq!(calls[3].probability, 4.0 / 255.0);
    }

    #[test]
    fn ml_offset_spans_ignored_segments() {
        let seq = b"ACAC";
        let calls =
            parse_mm_ml(seq, false, "A+a,0,0;C+m,1;", &[9, 9, 200]).unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].read_offset, 3);
        assert_approx_eq!(calls[0].probability, 200.0 / 255.0);
    }

    #[test]
    fn missing_quality_drops_remaining_calls() {
        let calls = parse_mm_ml(b"CCC", false, "C+m,0,0,0;", &[100]).unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].read_offset, 0);
    }

    #[test]
    fn other_codes_and_strands_ignored() {
        let seq = b"CCGG";
        let calls =
            parse_mm_ml(seq, false, "C+a,0;C-m,0;C+76792,0;", &[1, 2, 3])
                .unwrap();
        assert!(calls.is_empty());
    }

    #[test]
    fn malformed_annotation_is_an_error() {
        assert!(parse_mm_ml(b"CC", false, "C+m,5;", &[1]).is_err());
        assert!(parse_mm_ml(b"CC", false, "C+m,x;", &[1]).is_err());
        assert!(parse_mm_ml(b"CC", false, "C*m,0;", &[1]).is_err());
    }

    #[test]
    fn empty_annotation() {
        assert!(parse_mm_ml(b"CC", false, "", &[]).unwrap().is_empty());
        assert!(parse_mm_ml(b"CC", false, "C+m;", &[]).unwrap().is_empty());
    }
}
