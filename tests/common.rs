#![allow(dead_code)]

use methylsomatic::config::MethylationThresholds;
use methylsomatic::data_structs::{
    AlleleSupport,
    MethylationSite,
    Strand,
    VariantClass,
};
use rand::rngs::StdRng;
use rand::Rng;
use rust_htslib::bam;
use rust_htslib::bam::record::{
    Aux,
    Cigar,
    CigarString,
};

pub const FLAG_REVERSE: u16 = 0x10;
pub const FLAG_SECONDARY: u16 = 0x100;
pub const FLAG_QC_FAIL: u16 = 0x200;
pub const FLAG_DUPLICATE: u16 = 0x400;

/// In-memory alignment record with optional modification and phasing
/// tags.
pub struct ReadBuilder {
    name:   String,
    pos0:   i64,
    seq:    String,
    cigar:  Option<Vec<Cigar>>,
    flags:  u16,
    mm:     Option<String>,
    ml:     Vec<u8>,
    legacy: bool,
    hp:     Option<i32>,
}

impl ReadBuilder {
    pub fn new(
        name: &str,
        pos0: i64,
        seq: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            pos0,
            seq: seq.to_string(),
            cigar: None,
            flags: 0,
            mm: None,
            ml: Vec::new(),
            legacy: false,
            hp: None,
        }
    }

    pub fn cigar(
        mut self,
        ops: Vec<Cigar>,
    ) -> Self {
        self.cigar = Some(ops);
        self
    }

    pub fn flags(
        mut self,
        flags: u16,
    ) -> Self {
        self.flags |= flags;
        self
    }

    pub fn reverse(self) -> Self {
        self.flags(FLAG_REVERSE)
    }

    pub fn mods(
        mut self,
        mm: &str,
        ml: &[u8],
    ) -> Self {
        self.mm = Some(mm.to_string());
        self.ml = ml.to_vec();
        self
    }

    /// Writes the modification tags as `Mm`/`Ml`.
    pub fn legacy_tags(mut self) -> Self {
        self.legacy = true;
        self
    }

    pub fn haplotype(
        mut self,
        hp: i32,
    ) -> Self {
        self.hp = Some(hp);
        self
    }

    pub fn build(self) -> bam::Record {
        let mut record = bam::Record::new();
        let cigar = CigarString(
            self.cigar
                .unwrap_or_else(|| vec![Cigar::Match(self.seq.len() as u32)]),
        );
        let qual = vec![30u8; self.seq.len()];
        record.set(self.name.as_bytes(), Some(&cigar), self.seq.as_bytes(), &qual);
        record.set_tid(0);
        record.set_pos(self.pos0);
        record.set_mapq(60);
        record.set_flags(self.flags);

        if let Some(mm) = self.mm.as_ref() {
            let (mm_tag, ml_tag): (&[u8], &[u8]) = if self.legacy {
                (b"Mm", b"Ml")
            }
            else {
                (b"MM", b"ML")
            };
            record.push_aux(mm_tag, Aux::String(mm)).unwrap();
            record
                .push_aux(ml_tag, Aux::ArrayU8((&self.ml).into()))
                .unwrap();
        }
        if let Some(hp) = self.hp {
            record.push_aux(b"HP", Aux::I32(hp)).unwrap();
        }
        record
    }
}

/// Level-1 site with sensible defaults for aggregation tests.
pub struct SiteBuilder {
    site: MethylationSite,
}

impl SiteBuilder {
    pub fn new(
        somatic_pos: u64,
        methyl_pos: u64,
    ) -> Self {
        Self {
            site: MethylationSite {
                chrom: "chr1".into(),
                methyl_pos,
                somatic_pos,
                variant_class: VariantClass::Snv,
                vcf_source: "calls".into(),
                bam_source: "tumor".into(),
                allele_support: AlleleSupport::Alt,
                base_at_variant: 'T',
                haplotype: "1".into(),
                probability: 0.5,
                state: MethylationThresholds::default().classify(0.5),
                strand: Strand::Forward,
                read_id: "read".into(),
            },
        }
    }

    pub fn prob(
        mut self,
        probability: f64,
    ) -> Self {
        self.site.probability = probability;
        self.site.state = MethylationThresholds::default().classify(probability);
        self
    }

    pub fn strand(
        mut self,
        strand: Strand,
    ) -> Self {
        self.site.strand = strand;
        self
    }

    pub fn read(
        mut self,
        read_id: &str,
    ) -> Self {
        self.site.read_id = read_id.into();
        self
    }

    pub fn vcf(
        mut self,
        source: &str,
    ) -> Self {
        self.site.vcf_source = source.into();
        self
    }

    pub fn bam(
        mut self,
        source: &str,
    ) -> Self {
        self.site.bam_source = source.into();
        self
    }

    pub fn allele(
        mut self,
        support: AlleleSupport,
    ) -> Self {
        self.site.allele_support = support;
        self
    }

    pub fn haplotype(
        mut self,
        haplotype: &str,
    ) -> Self {
        self.site.haplotype = haplotype.into();
        self
    }

    pub fn class(
        mut self,
        class: VariantClass,
    ) -> Self {
        self.site.variant_class = class;
        self
    }

    pub fn build(self) -> MethylationSite {
        self.site
    }
}

/// Random sites over a few variants, samples, sources and haplotypes.
pub fn random_sites(
    rng: &mut StdRng,
    n: usize,
) -> Vec<MethylationSite> {
    let sources = ["calls_a", "calls_b"];
    let samples = ["tumor", "normal"];
    let haplotypes = ["0", "1", "2"];
    let classes = [
        VariantClass::Snv,
        VariantClass::Insertion,
        VariantClass::Deletion,
    ];
    (0..n)
        .map(|i| {
            let somatic_pos = 1000 * rng.gen_range(1..5u64);
            let strand = if rng.gen_bool(0.5) {
                Strand::Forward
            }
            else {
                Strand::Reverse
            };
            let allele = if rng.gen_bool(0.5) {
                AlleleSupport::Ref
            }
            else {
                AlleleSupport::Alt
            };
            SiteBuilder::new(somatic_pos, somatic_pos + rng.gen_range(0..20u64))
                .prob(rng.gen_range(0..=255u32) as f64 / 255.0)
                .strand(strand)
                .read(&format!("read{}", i % 40))
                .vcf(sources[rng.gen_range(0..sources.len())])
                .bam(samples[rng.gen_range(0..samples.len())])
                .haplotype(haplotypes[rng.gen_range(0..haplotypes.len())])
                .class(classes[(somatic_pos / 1000) as usize % classes.len()])
                .allele(allele)
                .build()
        })
        .collect()
}
