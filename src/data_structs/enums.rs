use std::convert::Infallible;
use std::fmt::Display;
use std::hash::Hash;
use std::str::FromStr;

use serde::{
    Deserialize,
    Serialize,
};

macro_rules! string_serde {
    ($enum_name: ident) => {
        impl Serialize for $enum_name {
            fn serialize<S>(
                &self,
                serializer: S,
            ) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer, {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $enum_name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>, {
                let s = String::deserialize(deserializer)?;
                std::str::FromStr::from_str(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

/// Strand of an alignment (and of the methylation calls it carries).
#[derive(Eq, Hash, PartialEq, Copy, Clone, Debug, PartialOrd, Ord)]
pub enum Strand {
    /// Forward strand.
    Forward,
    /// Reverse strand.
    Reverse,
    /// No strand, or no majority strand.
    None,
}

impl Strand {
    /// Strand of a read from its reverse-complement flag.
    pub fn from_reverse_flag(is_reverse: bool) -> Self {
        if is_reverse {
            Strand::Reverse
        }
        else {
            Strand::Forward
        }
    }
}

impl FromStr for Strand {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(Strand::Forward),
            "-" => Ok(Strand::Reverse),
            _ => Ok(Strand::None),
        }
    }
}

impl From<Strand> for char {
    fn from(value: Strand) -> Self {
        match value {
            Strand::Forward => '+',
            Strand::Reverse => '-',
            Strand::None => '.',
        }
    }
}

impl Display for Strand {
    #[cfg_attr(coverage_nightly, coverage(off))]
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}", char::from(*self))
    }
}

string_serde!(Strand);

/// Which allele of the variant a read supports.
#[derive(Eq, Hash, PartialEq, Copy, Clone, Debug, PartialOrd, Ord)]
pub enum AlleleSupport {
    Ref,
    Alt,
    Unknown,
}

impl FromStr for AlleleSupport {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ref" => Ok(AlleleSupport::Ref),
            "alt" => Ok(AlleleSupport::Alt),
            _ => Ok(AlleleSupport::Unknown),
        }
    }
}

impl Display for AlleleSupport {
    #[cfg_attr(coverage_nightly, coverage(off))]
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            AlleleSupport::Ref => write!(f, "ref"),
            AlleleSupport::Alt => write!(f, "alt"),
            AlleleSupport::Unknown => write!(f, "unknown"),
        }
    }
}

string_serde!(AlleleSupport);

/// Discretized methylation level of a single call.
#[derive(Eq, Hash, PartialEq, Copy, Clone, Debug, PartialOrd, Ord)]
pub enum MethState {
    High,
    Mid,
    Low,
}

impl MethState {
    /// High and mid calls count as methylated in the global metrics.
    pub fn is_methylated(&self) -> bool {
        matches!(self, MethState::High | MethState::Mid)
    }
}

impl FromStr for MethState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "high" => Ok(MethState::High),
            "mid" => Ok(MethState::Mid),
            "low" => Ok(MethState::Low),
            other => Err(format!("unknown methylation state '{}'", other)),
        }
    }
}

impl Display for MethState {
    #[cfg_attr(coverage_nightly, coverage(off))]
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            MethState::High => write!(f, "high"),
            MethState::Mid => write!(f, "mid"),
            MethState::Low => write!(f, "low"),
        }
    }
}

string_serde!(MethState);

/// Class of a called variant, derived from its REF/ALT lengths and allele
/// count.
#[derive(Eq, Hash, PartialEq, Copy, Clone, Debug, PartialOrd, Ord)]
pub enum VariantClass {
    Snv,
    Insertion,
    Deletion,
    Complex,
    Multi,
}

impl VariantClass {
    /// Classifies one REF/ALT pair of a record with `n_alleles` alleles
    /// (REF included).
    pub fn classify(
        ref_allele: &str,
        alt_allele: &str,
        n_alleles: usize,
    ) -> Self {
        if n_alleles > 2 {
            return VariantClass::Multi;
        }
        match (ref_allele.len(), alt_allele.len()) {
            (1, 1) => VariantClass::Snv,
            (r, a) if r > a => VariantClass::Deletion,
            (r, a) if r < a => VariantClass::Insertion,
            _ => VariantClass::Complex,
        }
    }

    /// Coarse grouping used by haplotype-level statistics.
    pub fn type_group(&self) -> VariantTypeGroup {
        match self {
            VariantClass::Snv => VariantTypeGroup::Snv,
            VariantClass::Insertion | VariantClass::Deletion => {
                VariantTypeGroup::Indel
            },
            VariantClass::Complex => VariantTypeGroup::Complex,
            VariantClass::Multi => VariantTypeGroup::Multi,
        }
    }
}

impl FromStr for VariantClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SNV" => Ok(VariantClass::Snv),
            "INS" => Ok(VariantClass::Insertion),
            "DEL" => Ok(VariantClass::Deletion),
            "COMPLEX" => Ok(VariantClass::Complex),
            "MULTI" => Ok(VariantClass::Multi),
            other => Err(format!("unknown variant class '{}'", other)),
        }
    }
}

impl Display for VariantClass {
    #[cfg_attr(coverage_nightly, coverage(off))]
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            VariantClass::Snv => write!(f, "SNV"),
            VariantClass::Insertion => write!(f, "INS"),
            VariantClass::Deletion => write!(f, "DEL"),
            VariantClass::Complex => write!(f, "COMPLEX"),
            VariantClass::Multi => write!(f, "MULTI"),
        }
    }
}

string_serde!(VariantClass);

/// [`VariantClass`] with insertions and deletions collapsed.
#[derive(Eq, Hash, PartialEq, Copy, Clone, Debug, PartialOrd, Ord)]
pub enum VariantTypeGroup {
    Snv,
    Indel,
    Complex,
    Multi,
}

impl Display for VariantTypeGroup {
    #[cfg_attr(coverage_nightly, coverage(off))]
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            VariantTypeGroup::Snv => write!(f, "SNV"),
            VariantTypeGroup::Indel => write!(f, "INDEL"),
            VariantTypeGroup::Complex => write!(f, "COMPLEX"),
            VariantTypeGroup::Multi => write!(f, "MULTI"),
        }
    }
}

impl FromStr for VariantTypeGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SNV" => Ok(VariantTypeGroup::Snv),
            "INDEL" => Ok(VariantTypeGroup::Indel),
            "COMPLEX" => Ok(VariantTypeGroup::Complex),
            "MULTI" => Ok(VariantTypeGroup::Multi),
            other => Err(format!("unknown variant type group '{}'", other)),
        }
    }
}

string_serde!(VariantTypeGroup);
