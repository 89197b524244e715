// Tagged union over the representations an FST file may hold. Reading
// dispatches on the header's fst_type string; this is the registry that
// lets generic containers (archives in particular) hold any standard
// representation of one transition type.

use std::io::Write;
use std::path::Path;
use std::sync::Arc as SharedPtr;

use crate::compact_fst::{
    CompactAcceptorFst, CompactStringFst, CompactTransitionIter, CompactUnweightedAcceptorFst,
    CompactUnweightedFst, CompactWeightedStringFst,
};
use crate::compactor::{
    AcceptorCompactor, PodWeight, StringCompactor, UnweightedAcceptorCompactor,
    UnweightedCompactor, WeightedStringCompactor,
};
use crate::fst::{ExpandedFst, Fst};
use crate::io::{ByteReader, FstHeader, FstWriteOptions};
use crate::mapped::{LoadMode, MappedRegion};
use crate::symbols::SymbolTable;
use crate::transition::Transition;
use crate::vector_fst::VectorFst;
use crate::{FstError, Result, StateId};

/// Any standard representation over the weight `W`.
#[derive(Debug, Clone)]
pub enum FstVariant<W: PodWeight> {
    Vector(VectorFst<W>),
    CompactString(CompactStringFst<W>),
    CompactWeightedString(CompactWeightedStringFst<W>),
    CompactAcceptor(CompactAcceptorFst<W>),
    CompactUnweightedAcceptor(CompactUnweightedAcceptorFst<W>),
    CompactUnweighted(CompactUnweightedFst<W>),
}

macro_rules! each_variant {
    ($value:expr, $fst:ident => $body:expr) => {
        match $value {
            FstVariant::Vector($fst) => $body,
            FstVariant::CompactString($fst) => $body,
            FstVariant::CompactWeightedString($fst) => $body,
            FstVariant::CompactAcceptor($fst) => $body,
            FstVariant::CompactUnweightedAcceptor($fst) => $body,
            FstVariant::CompactUnweighted($fst) => $body,
        }
    };
}

impl<W: PodWeight> FstVariant<W> {
    /// Parse whatever representation starts at `offset`, by fst_type.
    pub fn read_region(region: &SharedPtr<MappedRegion>, offset: usize) -> Result<Self> {
        let slice = &region.data()[offset..];
        let hdr = FstHeader::read(&mut ByteReader::new(slice))?;
        match hdr.fst_type.as_str() {
            "vector" => Ok(Self::Vector(VectorFst::read(&mut ByteReader::new(slice))?)),
            "compact_string" => Ok(Self::CompactString(CompactStringFst::read_region(
                region, offset,
            )?)),
            "compact_weighted_string" => Ok(Self::CompactWeightedString(
                CompactWeightedStringFst::read_region(region, offset)?,
            )),
            "compact_acceptor" => Ok(Self::CompactAcceptor(
                CompactAcceptorFst::read_region(region, offset)?,
            )),
            "compact_unweighted_acceptor" => Ok(Self::CompactUnweightedAcceptor(
                CompactUnweightedAcceptorFst::read_region(region, offset)?,
            )),
            "compact_unweighted" => Ok(Self::CompactUnweighted(
                CompactUnweightedFst::read_region(region, offset)?,
            )),
            other => Err(FstError::UnknownFstType(other.to_string())),
        }
    }

    pub fn read_file(path: impl AsRef<Path>, mode: LoadMode) -> Result<Self> {
        let region = SharedPtr::new(MappedRegion::open(path, mode)?);
        Self::read_region(&region, 0)
    }

    pub fn write<S: Write>(&self, sink: S, opts: &FstWriteOptions) -> Result<()> {
        each_variant!(self, fst => fst.write(sink, opts))
    }

    pub fn write_file(&self, path: impl AsRef<Path>, opts: &FstWriteOptions) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.write(std::io::BufWriter::new(file), opts)
    }
}

impl<W: PodWeight> From<VectorFst<W>> for FstVariant<W> {
    fn from(fst: VectorFst<W>) -> Self {
        Self::Vector(fst)
    }
}

impl<W: PodWeight> From<CompactStringFst<W>> for FstVariant<W> {
    fn from(fst: CompactStringFst<W>) -> Self {
        Self::CompactString(fst)
    }
}

impl<W: PodWeight> From<CompactWeightedStringFst<W>> for FstVariant<W> {
    fn from(fst: CompactWeightedStringFst<W>) -> Self {
        Self::CompactWeightedString(fst)
    }
}

impl<W: PodWeight> From<CompactAcceptorFst<W>> for FstVariant<W> {
    fn from(fst: CompactAcceptorFst<W>) -> Self {
        Self::CompactAcceptor(fst)
    }
}

impl<W: PodWeight> From<CompactUnweightedAcceptorFst<W>> for FstVariant<W> {
    fn from(fst: CompactUnweightedAcceptorFst<W>) -> Self {
        Self::CompactUnweightedAcceptor(fst)
    }
}

impl<W: PodWeight> From<CompactUnweightedFst<W>> for FstVariant<W> {
    fn from(fst: CompactUnweightedFst<W>) -> Self {
        Self::CompactUnweighted(fst)
    }
}

/// Transition iterator over whichever representation the variant holds.
pub enum VariantTransitionIter<'a, W: PodWeight> {
    Vector(std::iter::Cloned<std::slice::Iter<'a, Transition<W>>>),
    CompactString(CompactTransitionIter<'a, StringCompactor<W>>),
    CompactWeightedString(CompactTransitionIter<'a, WeightedStringCompactor<W>>),
    CompactAcceptor(CompactTransitionIter<'a, AcceptorCompactor<W>>),
    CompactUnweightedAcceptor(CompactTransitionIter<'a, UnweightedAcceptorCompactor<W>>),
    CompactUnweighted(CompactTransitionIter<'a, UnweightedCompactor<W>>),
}

impl<'a, W: PodWeight> Iterator for VariantTransitionIter<'a, W> {
    type Item = Transition<W>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Vector(it) => it.next(),
            Self::CompactString(it) => it.next(),
            Self::CompactWeightedString(it) => it.next(),
            Self::CompactAcceptor(it) => it.next(),
            Self::CompactUnweightedAcceptor(it) => it.next(),
            Self::CompactUnweighted(it) => it.next(),
        }
    }
}

impl<W: PodWeight> Fst for FstVariant<W> {
    type W = W;
    type TransitionIter<'a>
        = VariantTransitionIter<'a, W>
    where
        Self: 'a;

    fn start(&self) -> StateId {
        each_variant!(self, fst => fst.start())
    }

    fn final_weight(&self, s: StateId) -> W {
        each_variant!(self, fst => fst.final_weight(s))
    }

    fn num_transitions(&self, s: StateId) -> usize {
        each_variant!(self, fst => fst.num_transitions(s))
    }

    fn num_input_epsilons(&self, s: StateId) -> usize {
        each_variant!(self, fst => fst.num_input_epsilons(s))
    }

    fn num_output_epsilons(&self, s: StateId) -> usize {
        each_variant!(self, fst => fst.num_output_epsilons(s))
    }

    fn properties(&self, mask: u64, test: bool) -> u64 {
        each_variant!(self, fst => fst.properties(mask, test))
    }

    fn fst_type(&self) -> String {
        each_variant!(self, fst => fst.fst_type())
    }

    fn input_symbols(&self) -> Option<&SymbolTable> {
        each_variant!(self, fst => fst.input_symbols())
    }

    fn output_symbols(&self) -> Option<&SymbolTable> {
        each_variant!(self, fst => fst.output_symbols())
    }

    fn transitions(&self, s: StateId) -> VariantTransitionIter<'_, W> {
        match self {
            Self::Vector(fst) => VariantTransitionIter::Vector(fst.transitions(s)),
            Self::CompactString(fst) => {
                VariantTransitionIter::CompactString(fst.transitions(s))
            }
            Self::CompactWeightedString(fst) => {
                VariantTransitionIter::CompactWeightedString(fst.transitions(s))
            }
            Self::CompactAcceptor(fst) => {
                VariantTransitionIter::CompactAcceptor(fst.transitions(s))
            }
            Self::CompactUnweightedAcceptor(fst) => {
                VariantTransitionIter::CompactUnweightedAcceptor(fst.transitions(s))
            }
            Self::CompactUnweighted(fst) => {
                VariantTransitionIter::CompactUnweighted(fst.transitions(s))
            }
        }
    }
}

impl<W: PodWeight> ExpandedFst for FstVariant<W> {
    fn num_states(&self) -> StateId {
        each_variant!(self, fst => fst.num_states())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::float_weight::TropicalWeight;
    use crate::fst::MutableFst;
    use crate::weight::Weight;

    type W = TropicalWeight;

    fn sample_vector() -> VectorFst<W> {
        let mut fst = VectorFst::new();
        let s0 = fst.add_state();
        let s1 = fst.add_state();
        fst.set_start(s0);
        fst.set_final(s1, W::one());
        fst.add_transition(s0, Transition::new(1, 2, W::new(0.5), s1));
        fst
    }

    fn round_trip(variant: &FstVariant<W>) -> FstVariant<W> {
        let mut buf = Vec::new();
        variant.write(&mut buf, &FstWriteOptions::default()).unwrap();
        let region = SharedPtr::new(MappedRegion::from_vec(buf));
        FstVariant::read_region(&region, 0).unwrap()
    }

    #[test]
    fn dispatches_vector() {
        let variant = FstVariant::from(sample_vector());
        let back = round_trip(&variant);
        assert!(matches!(back, FstVariant::Vector(_)));
        assert_eq!(back.fst_type(), "vector");
        assert_eq!(back.num_states(), 2);
        let trs: Vec<_> = back.transitions(0).collect();
        assert_eq!(trs, vec![Transition::new(1, 2, W::new(0.5), 1)]);
    }

    #[test]
    fn dispatches_compact_string() {
        let compact = CompactStringFst::<W>::from_elements(
            vec![3, 4],
            StringCompactor::default(),
        );
        let back = round_trip(&FstVariant::from(compact));
        assert!(matches!(back, FstVariant::CompactString(_)));
        assert_eq!(back.fst_type(), "compact_string");
        assert_eq!(back.num_states(), 3);
    }

    #[test]
    fn unknown_type_is_rejected() {
        let hdr = FstHeader {
            fst_type: "mystery".to_string(),
            arc_type: "standard".to_string(),
            version: 1,
            flags: 0,
            properties: 0,
            start: -1,
            num_states: 0,
            num_arcs: 0,
        };
        let mut buf = Vec::new();
        hdr.write(&mut buf).unwrap();
        let region = SharedPtr::new(MappedRegion::from_vec(buf));
        assert!(matches!(
            FstVariant::<W>::read_region(&region, 0).unwrap_err(),
            FstError::UnknownFstType(_)
        ));
    }
}
