// Element packing strategies for compact transducers. A compactor maps each
// (state, transition) pair to a fixed-layout element and back; elements are
// plain-old-data so stores can be memory-mapped.

use std::io::{self, Write};
use std::marker::PhantomData;

use bytemuck::{Pod, Zeroable};

use crate::float_weight::{LogWeight, MinMaxWeight, TropicalWeight};
use crate::fst::Fst;
use crate::io::ByteReader;
use crate::properties::{ACCEPTOR, STRING, UNWEIGHTED};
use crate::transition::Transition;
use crate::weight::Weight;
use crate::{Label, NO_LABEL, NO_STATE_ID, Result, StateId};

/// Weights that are plain-old-data with at most 4-byte alignment, so
/// elements embedding them next to i32 fields carry no padding.
pub trait PodWeight: Weight + Pod {}

impl PodWeight for TropicalWeight {}
impl PodWeight for LogWeight {}
impl PodWeight for MinMaxWeight {}

/// A strategy packing transitions into elements and back.
///
/// `compact` must be pure. Fixed out-degree compactors declare
/// `fixed_size() == Some(k)`: every state stores exactly k elements, a
/// non-zero final weight counting as one (the superfinal element). Variable
/// compactors return `None` and rely on a per-state offset table.
pub trait Compactor: Clone + 'static {
    type W: Weight;
    type Element: Pod + std::fmt::Debug;

    fn compact(&self, s: StateId, tr: &Transition<Self::W>) -> Self::Element;

    /// Rebuild a transition; `flags` names the fields the caller will read,
    /// the rest may be stubs.
    fn expand(&self, s: StateId, element: &Self::Element, flags: u32) -> Transition<Self::W>;

    fn fixed_size(&self) -> Option<usize>;

    /// Property bits guaranteed for any FST this compactor can represent.
    fn properties(&self) -> u64;

    /// An FST qualifies when it asserts every property the compactor needs.
    fn compatible<F: Fst<W = Self::W> + ?Sized>(&self, fst: &F) -> bool {
        let required = self.properties();
        fst.properties(required, true) == required
    }

    /// String key identifying the compactor in file headers.
    fn compactor_type() -> &'static str;

    /// Serialize compactor parameters; the standard compactors have none.
    fn write<S: Write>(&self, _w: &mut S) -> io::Result<()> {
        Ok(())
    }

    /// Deserialize compactor parameters.
    fn read(r: &mut ByteReader<'_>) -> Result<Self>;
}

/// Compactor for unweighted string FSTs: one label per state.
#[derive(Debug, Clone)]
pub struct StringCompactor<W>(PhantomData<W>);

impl<W> Default for StringCompactor<W> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<W: Weight> Compactor for StringCompactor<W> {
    type W = W;
    type Element = Label;

    fn compact(&self, _s: StateId, tr: &Transition<W>) -> Label {
        tr.ilabel
    }

    fn expand(&self, s: StateId, element: &Label, _flags: u32) -> Transition<W> {
        let label = *element;
        Transition::new(
            label,
            label,
            W::one(),
            if label != NO_LABEL { s + 1 } else { NO_STATE_ID },
        )
    }

    fn fixed_size(&self) -> Option<usize> {
        Some(1)
    }

    fn properties(&self) -> u64 {
        STRING | ACCEPTOR | UNWEIGHTED
    }

    fn compactor_type() -> &'static str {
        "string"
    }

    fn read(_r: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self::default())
    }
}

/// Element of [`WeightedStringCompactor`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedStringElement<W> {
    pub label: Label,
    pub weight: W,
}

// No padding: PodWeight guarantees a 4-byte-aligned, Pod weight.
unsafe impl<W: PodWeight> Zeroable for WeightedStringElement<W> {}
unsafe impl<W: PodWeight> Pod for WeightedStringElement<W> {}

/// Compactor for weighted string FSTs: (label, weight) per state.
#[derive(Debug, Clone)]
pub struct WeightedStringCompactor<W>(PhantomData<W>);

impl<W> Default for WeightedStringCompactor<W> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<W: PodWeight> Compactor for WeightedStringCompactor<W> {
    type W = W;
    type Element = WeightedStringElement<W>;

    fn compact(&self, _s: StateId, tr: &Transition<W>) -> Self::Element {
        WeightedStringElement {
            label: tr.ilabel,
            weight: tr.weight.clone(),
        }
    }

    fn expand(&self, s: StateId, element: &Self::Element, _flags: u32) -> Transition<W> {
        Transition::new(
            element.label,
            element.label,
            element.weight.clone(),
            if element.label != NO_LABEL {
                s + 1
            } else {
                NO_STATE_ID
            },
        )
    }

    fn fixed_size(&self) -> Option<usize> {
        Some(1)
    }

    fn properties(&self) -> u64 {
        STRING | ACCEPTOR
    }

    fn compactor_type() -> &'static str {
        "weighted_string"
    }

    fn read(_r: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self::default())
    }
}

/// Element of [`UnweightedAcceptorCompactor`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct UnweightedAcceptorElement {
    pub label: Label,
    pub nextstate: StateId,
}

/// Compactor for unweighted acceptors: (label, nextstate).
#[derive(Debug, Clone)]
pub struct UnweightedAcceptorCompactor<W>(PhantomData<W>);

impl<W> Default for UnweightedAcceptorCompactor<W> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<W: Weight> Compactor for UnweightedAcceptorCompactor<W> {
    type W = W;
    type Element = UnweightedAcceptorElement;

    fn compact(&self, _s: StateId, tr: &Transition<W>) -> Self::Element {
        UnweightedAcceptorElement {
            label: tr.ilabel,
            nextstate: tr.nextstate,
        }
    }

    fn expand(&self, _s: StateId, element: &Self::Element, _flags: u32) -> Transition<W> {
        Transition::new(element.label, element.label, W::one(), element.nextstate)
    }

    fn fixed_size(&self) -> Option<usize> {
        None
    }

    fn properties(&self) -> u64 {
        ACCEPTOR | UNWEIGHTED
    }

    fn compactor_type() -> &'static str {
        "unweighted_acceptor"
    }

    fn read(_r: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self::default())
    }
}

/// Element of [`AcceptorCompactor`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcceptorElement<W> {
    pub label: Label,
    pub weight: W,
    pub nextstate: StateId,
}

unsafe impl<W: PodWeight> Zeroable for AcceptorElement<W> {}
unsafe impl<W: PodWeight> Pod for AcceptorElement<W> {}

/// Compactor for weighted acceptors: ((label, weight), nextstate).
#[derive(Debug, Clone)]
pub struct AcceptorCompactor<W>(PhantomData<W>);

impl<W> Default for AcceptorCompactor<W> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<W: PodWeight> Compactor for AcceptorCompactor<W> {
    type W = W;
    type Element = AcceptorElement<W>;

    fn compact(&self, _s: StateId, tr: &Transition<W>) -> Self::Element {
        AcceptorElement {
            label: tr.ilabel,
            weight: tr.weight.clone(),
            nextstate: tr.nextstate,
        }
    }

    fn expand(&self, _s: StateId, element: &Self::Element, _flags: u32) -> Transition<W> {
        Transition::new(
            element.label,
            element.label,
            element.weight.clone(),
            element.nextstate,
        )
    }

    fn fixed_size(&self) -> Option<usize> {
        None
    }

    fn properties(&self) -> u64 {
        ACCEPTOR
    }

    fn compactor_type() -> &'static str {
        "acceptor"
    }

    fn read(_r: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self::default())
    }
}

/// Element of [`UnweightedCompactor`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct UnweightedElement {
    pub ilabel: Label,
    pub olabel: Label,
    pub nextstate: StateId,
}

/// Compactor for unweighted transducers: ((ilabel, olabel), nextstate).
#[derive(Debug, Clone)]
pub struct UnweightedCompactor<W>(PhantomData<W>);

impl<W> Default for UnweightedCompactor<W> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<W: Weight> Compactor for UnweightedCompactor<W> {
    type W = W;
    type Element = UnweightedElement;

    fn compact(&self, _s: StateId, tr: &Transition<W>) -> Self::Element {
        UnweightedElement {
            ilabel: tr.ilabel,
            olabel: tr.olabel,
            nextstate: tr.nextstate,
        }
    }

    fn expand(&self, _s: StateId, element: &Self::Element, _flags: u32) -> Transition<W> {
        Transition::new(
            element.ilabel,
            element.olabel,
            W::one(),
            element.nextstate,
        )
    }

    fn fixed_size(&self) -> Option<usize> {
        None
    }

    fn properties(&self) -> u64 {
        UNWEIGHTED
    }

    fn compactor_type() -> &'static str {
        "unweighted"
    }

    fn read(_r: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fst::MutableFst;
    use crate::vector_fst::VectorFst;

    #[test]
    fn element_layouts() {
        assert_eq!(size_of::<WeightedStringElement<TropicalWeight>>(), 8);
        assert_eq!(size_of::<UnweightedAcceptorElement>(), 8);
        assert_eq!(size_of::<AcceptorElement<TropicalWeight>>(), 12);
        assert_eq!(size_of::<UnweightedElement>(), 12);
    }

    #[test]
    fn string_compactor_round_trip() {
        let compactor = StringCompactor::<TropicalWeight>::default();
        let tr = Transition::new(7, 7, TropicalWeight::one(), 4);
        let element = compactor.compact(3, &tr);
        assert_eq!(compactor.expand(3, &element, crate::transition::VALUE_FLAGS), tr);

        let superfinal = Transition::superfinal(TropicalWeight::one());
        let element = compactor.compact(3, &superfinal);
        let back = compactor.expand(3, &element, crate::transition::VALUE_FLAGS);
        assert!(back.is_superfinal());
        assert_eq!(back.nextstate, NO_STATE_ID);
    }

    #[test]
    fn weighted_string_keeps_weight() {
        let compactor = WeightedStringCompactor::<TropicalWeight>::default();
        let tr = Transition::new(2, 2, TropicalWeight::new(1.5), 1);
        let element = compactor.compact(0, &tr);
        assert_eq!(compactor.expand(0, &element, crate::transition::VALUE_FLAGS), tr);
    }

    #[test]
    fn acceptor_round_trip() {
        let compactor = AcceptorCompactor::<LogWeight>::default();
        let tr = Transition::new(5, 5, LogWeight::new(0.5), 9);
        let element = compactor.compact(2, &tr);
        assert_eq!(compactor.expand(2, &element, crate::transition::VALUE_FLAGS), tr);
    }

    #[test]
    fn unweighted_round_trip() {
        let compactor = UnweightedCompactor::<TropicalWeight>::default();
        let tr = Transition::new(5, 6, TropicalWeight::one(), 9);
        let element = compactor.compact(2, &tr);
        assert_eq!(compactor.expand(2, &element, crate::transition::VALUE_FLAGS), tr);
    }

    #[test]
    fn compatibility_checks_properties() {
        // A linear, unweighted acceptor: compatible with every compactor.
        let mut chain = VectorFst::<TropicalWeight>::new();
        let s0 = chain.add_state();
        let s1 = chain.add_state();
        chain.set_start(s0);
        chain.set_final(s1, TropicalWeight::one());
        chain.add_transition(s0, Transition::new(1, 1, TropicalWeight::one(), s1));
        assert!(StringCompactor::<TropicalWeight>::default().compatible(&chain));
        assert!(AcceptorCompactor::<TropicalWeight>::default().compatible(&chain));

        // A weighted transducer arc breaks both.
        let mut transducer = VectorFst::<TropicalWeight>::new();
        let s0 = transducer.add_state();
        let s1 = transducer.add_state();
        transducer.set_start(s0);
        transducer.set_final(s1, TropicalWeight::one());
        transducer.add_transition(s0, Transition::new(1, 2, TropicalWeight::new(0.5), s1));
        assert!(!StringCompactor::<TropicalWeight>::default().compatible(&transducer));
        assert!(!UnweightedCompactor::<TropicalWeight>::default().compatible(&transducer));
        assert!(!AcceptorCompactor::<TropicalWeight>::default().compatible(&transducer));
    }
}
