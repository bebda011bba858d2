//! Read-offset to reference-position translation.
//!
//! Every query is answered from the aligned blocks produced by one linear
//! walk over the alignment operations, so the forward table and the
//! reverse lookup cannot disagree about operation semantics.

use anyhow::{
    anyhow,
    bail,
};
use rust_htslib::bam;

use crate::data_structs::typedef::PosType;

/// Alignment operation kinds, in BAM numeric order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Match,
    Insertion,
    Deletion,
    RefSkip,
    SoftClip,
    HardClip,
    Pad,
    SeqMatch,
    SeqMismatch,
}

impl OpKind {
    fn consumes_read(&self) -> bool {
        matches!(
            self,
            OpKind::Match
                | OpKind::Insertion
                | OpKind::SoftClip
                | OpKind::SeqMatch
                | OpKind::SeqMismatch
        )
    }

    fn consumes_reference(&self) -> bool {
        matches!(
            self,
            OpKind::Match
                | OpKind::Deletion
                | OpKind::RefSkip
                | OpKind::SeqMatch
                | OpKind::SeqMismatch
        )
    }
}

impl TryFrom<u32> for OpKind {
    type Error = anyhow::Error;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => OpKind::Match,
            1 => OpKind::Insertion,
            2 => OpKind::Deletion,
            3 => OpKind::RefSkip,
            4 => OpKind::SoftClip,
            5 => OpKind::HardClip,
            6 => OpKind::Pad,
            7 => OpKind::SeqMatch,
            8 => OpKind::SeqMismatch,
            other => return Err(anyhow!("Unknown CIGAR operation code {}", other)),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CigarOp {
    pub kind: OpKind,
    pub len:  u32,
}

impl CigarOp {
    pub fn new(
        kind: OpKind,
        len: u32,
    ) -> Self {
        Self { kind, len }
    }

    /// Decodes a packed BAM operation (`len << 4 | op`).
    pub fn from_raw(raw: u32) -> anyhow::Result<Self> {
        Ok(Self {
            kind: OpKind::try_from(raw & 0xf)?,
            len:  raw >> 4,
        })
    }
}

/// Run of read bases aligned one-to-one against the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AlignedBlock {
    read_start: usize,
    /// 0-based.
    ref_start:  PosType,
    len:        usize,
}

impl AlignedBlock {
    fn ref_end(&self) -> PosType {
        self.ref_start + self.len as PosType
    }

    fn read_end(&self) -> usize {
        self.read_start + self.len
    }
}

#[derive(Debug, Clone)]
pub struct CoordinateMapper {
    blocks:   Vec<AlignedBlock>,
    read_len: usize,
}

impl CoordinateMapper {
    /// Walks `ops` once starting at the 0-based reference position
    /// `ref_start`.
    pub fn new(
        ref_start: PosType,
        ops: &[CigarOp],
    ) -> Self {
        let mut blocks = Vec::new();
        let mut ref_cursor = ref_start;
        let mut read_cursor = 0usize;

        for op in ops {
            let len = op.len as usize;
            if len == 0 {
                continue;
            }
            match (op.kind.consumes_read(), op.kind.consumes_reference()) {
                (true, true) => {
                    // Adjacent M/=/X ops form one contiguous block.
                    match blocks.last_mut() {
                        Some(AlignedBlock {
                            read_start,
                            ref_start,
                            len: block_len,
                        }) if *read_start + *block_len == read_cursor
                            && *ref_start + *block_len as PosType == ref_cursor =>
                        {
                            *block_len += len
                        },
                        _ => {
                            blocks.push(AlignedBlock {
                                read_start: read_cursor,
                                ref_start: ref_cursor,
                                len,
                            })
                        },
                    }
                    read_cursor += len;
                    ref_cursor += len as PosType;
                },
                (true, false) => read_cursor += len,
                (false, true) => ref_cursor += len as PosType,
                (false, false) => {},
            }
        }

        Self {
            blocks,
            read_len: read_cursor,
        }
    }

    pub fn from_record(record: &bam::Record) -> anyhow::Result<Self> {
        if record.pos() < 0 {
            bail!("Record has no alignment position")
        }
        let ops = record
            .raw_cigar()
            .iter()
            .map(|raw| CigarOp::from_raw(*raw))
            .collect::<anyhow::Result<Vec<_>>>()?;
        let mapper = Self::new(record.pos() as PosType, &ops);
        if mapper.read_len != record.seq_len() {
            bail!(
                "CIGAR query length {} does not match sequence length {}",
                mapper.read_len,
                record.seq_len()
            )
        }
        Ok(mapper)
    }

    /// Number of read bases consumed by the operations.
    pub fn read_len(&self) -> usize {
        self.read_len
    }

    /// 0-based read offset aligned to the 1-based `ref_pos`, `None` inside
    /// deletions and skips or outside the aligned span.
    pub fn reference_to_read(
        &self,
        ref_pos: PosType,
    ) -> Option<usize> {
        let ref0 = ref_pos.checked_sub(1)?;
        let idx = self.blocks.partition_point(|b| b.ref_end() <= ref0);
        let block = self.blocks.get(idx)?;
        if ref0 < block.ref_start {
            return None;
        }
        Some(block.read_start + (ref0 - block.ref_start) as usize)
    }

    /// 1-based reference position of a read offset, `None` for inserted or
    /// clipped bases.
    pub fn read_to_reference(
        &self,
        offset: usize,
    ) -> Option<PosType> {
        let idx = self.blocks.partition_point(|b| b.read_end() <= offset);
        let block = self.blocks.get(idx)?;
        if offset < block.read_start {
            return None;
        }
        Some(block.ref_start + (offset - block.read_start) as PosType + 1)
    }

    /// Forward table over `0..read_len` of 1-based reference positions.
    pub fn read_to_reference_table(&self) -> Vec<Option<PosType>> {
        let mut table = vec![None; self.read_len];
        for block in self.blocks.iter() {
            for i in 0..block.len {
                table[block.read_start + i] =
                    Some(block.ref_start + i as PosType + 1);
            }
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{
        Rng,
        SeedableRng,
    };
    use rstest::rstest;

    use super::*;

    fn op(
        kind: OpKind,
        len: u32,
    ) -> CigarOp {
        CigarOp::new(kind, len)
    }

    #[test]
    fn simple_match() {
        let mapper = CoordinateMapper::new(99, &[op(OpKind::Match, 5)]);
        assert_eq!(mapper.read_len(), 5);
        assert_eq!(mapper.reference_to_read(100), Some(0));
        assert_eq!(mapper.reference_to_read(104), Some(4));
        assert_eq!(mapper.reference_to_read(99), None);
        assert_eq!(mapper.reference_to_read(105), None);
        assert_eq!(
            mapper.read_to_reference_table(),
            vec![Some(100), Some(101), Some(102), Some(103), Some(104)]
        );
    }

    #[test]
    fn soft_clip_insertion_deletion() {
        // 2S 3M 2I 2D 3M, leftmost aligned base at 1-based 11
        let mapper = CoordinateMapper::new(10, &[
            op(OpKind::SoftClip, 2),
            op(OpKind::Match, 3),
            op(OpKind::Insertion, 2),
            op(OpKind::Deletion, 2),
            op(OpKind::Match, 3),
        ]);
        assert_eq!(mapper.read_len(), 10);
        assert_eq!(mapper.read_to_reference_table(), vec![
            None,
            None,
            Some(11),
            Some(12),
            Some(13),
            None,
            None,
            Some(16),
            Some(17),
            Some(18),
        ]);
        assert_eq!(mapper.reference_to_read(11), Some(2));
        assert_eq!(mapper.reference_to_read(14), None);
        assert_eq!(mapper.reference_to_read(15), None);
        assert_eq!(mapper.reference_to_read(16), Some(7));
    }

    #[test]
    fn hard_clip_and_pad_consume_nothing() {
        let mapper = CoordinateMapper::new(0, &[
            op(OpKind::HardClip, 5),
            op(OpKind::Match, 2),
            op(OpKind::Pad, 3),
            op(OpKind::Match, 2),
            op(OpKind::HardClip, 4),
        ]);
        assert_eq!(mapper.read_len(), 4);
        assert_eq!(
            mapper.read_to_reference_table(),
            vec![Some(1), Some(2), Some(3), Some(4)]
        );
    }

    #[test]
    fn reference_skip() {
        let mapper = CoordinateMapper::new(0, &[
            op(OpKind::Match, 2),
            op(OpKind::RefSkip, 100),
            op(OpKind::Match, 2),
        ]);
        assert_eq!(mapper.reference_to_read(50), None);
        assert_eq!(mapper.reference_to_read(103), Some(2));
        assert_eq!(mapper.read_to_reference(3), Some(104));
    }

    #[rstest]
    #[case(0, OpKind::Match, 10)]
    #[case(1, OpKind::Insertion, 3)]
    #[case(4, OpKind::SoftClip, 1)]
    #[case(8, OpKind::SeqMismatch, 7)]
    fn raw_decoding(
        #[case] code: u32,
        #[case] kind: OpKind,
        #[case] len: u32,
    ) {
        let decoded = CigarOp::from_raw(len << 4 | code).unwrap();
        assert_eq!(decoded, CigarOp::new(kind, len));
    }

    #[test]
    fn raw_decoding_rejects_unknown() {
        assert!(CigarOp::from_raw(5 << 4 | 9).is_err());
    }

    #[test]
    fn round_trip_random_alignments() {
        let kinds = [
            OpKind::Match,
            OpKind::Insertion,
            OpKind::Deletion,
            OpKind::RefSkip,
            OpKind::SoftClip,
            OpKind::SeqMatch,
            OpKind::SeqMismatch,
        ];
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let ops = (0..rng.gen_range(1..12))
                .map(|_| op(kinds[rng.gen_range(0..kinds.len())], rng.gen_range(0..20)))
                .collect::<Vec<_>>();
            let start = rng.gen_range(0..1000);
            let mapper = CoordinateMapper::new(start, &ops);
            let table = mapper.read_to_reference_table();
            assert_eq!(table.len(), mapper.read_len());

            for (offset, ref_pos) in table.iter().enumerate() {
                assert_eq!(mapper.read_to_reference(offset), *ref_pos);
                if let Some(ref_pos) = ref_pos {
                    let back = mapper.reference_to_read(*ref_pos).unwrap();
                    assert_eq!(back, offset);
                    assert_eq!(table[back], Some(*ref_pos));
                }
            }
            for ref_pos in start..start + 300 {
                if let Some(offset) = mapper.reference_to_read(ref_pos) {
                    assert_eq!(table[offset], Some(ref_pos));
                }
            }
        }
    }
}
