// Read-only, compactor-parameterized transducer. The store keeps packed
// elements (plus a state-offset table for variable out-degree compactors)
// in shared regions that may be memory-mapped; handles clone in O(1).

use std::cell::{Cell, RefCell};
use std::io::Write;
use std::path::Path;
use std::sync::Arc as SharedPtr;

use crate::cache::{CacheOptions, StateCache};
use crate::compactor::Compactor;
use crate::fst::{ExpandedFst, Fst};
use crate::io::{
    ByteReader, CountingWriter, FstHeader, FstWriteOptions, HAS_ISYMBOLS, HAS_OSYMBOLS,
    IS_ALIGNED,
};
use crate::mapped::{LoadMode, MappedRegion, TypedSlice};
use crate::properties::{
    self, BINARY_PROPERTIES, COPY_PROPERTIES, ERROR, EXPANDED, ILABEL_SORTED, OLABEL_SORTED,
    known_properties,
};
use crate::symbols::SymbolTable;
use crate::transition::{self, Transition};
use crate::weight::Weight;
use crate::{EPSILON, FstError, NO_LABEL, NO_STATE_ID, Result, StateId};

/// Unaligned on-disk format version.
const FILE_VERSION: i32 = 2;
/// Aligned on-disk format version; implies the aligned flag.
const ALIGNED_FILE_VERSION: i32 = 1;
const MIN_FILE_VERSION: i32 = 1;

/// File sections are padded to this boundary when writing aligned.
const ARCH_ALIGNMENT: usize = 16;

const STATIC_PROPERTIES: u64 = EXPANDED;

/// Default cache behavior for compact FSTs: expansion is cheap, so keep
/// nothing beyond the state being read.
fn compact_cache_options() -> CacheOptions {
    CacheOptions { gc: true, limit: 0 }
}

/// Shared, immutable storage behind a [`CompactFst`].
///
/// `compacts` holds every state's packed transitions consecutively, the
/// superfinal element first for final states. Variable out-degree stores
/// also keep `states`, the per-state offsets into `compacts`, with
/// `states[nstates] == ncompacts`.
#[derive(Debug)]
pub struct CompactStore<C: Compactor> {
    states: Option<TypedSlice<u32>>,
    compacts: TypedSlice<C::Element>,
    nstates: usize,
    ncompacts: usize,
    ntransitions: usize,
    start: StateId,
    error: bool,
}

impl<C: Compactor> CompactStore<C> {
    /// Pack a compatible FST. Incompatibility (a fixed out-degree that does
    /// not match) is recorded in the store's error flag.
    pub fn from_fst<F>(fst: &F, compactor: &C) -> Self
    where
        F: ExpandedFst<W = C::W> + ?Sized,
    {
        let nstates = fst.num_states() as usize;
        let mut ntransitions = 0usize;
        let mut nfinals = 0usize;
        for s in fst.states() {
            ntransitions += fst.num_transitions(s);
            if fst.final_weight(s) != C::W::zero() {
                nfinals += 1;
            }
        }

        let mut store = Self {
            states: None,
            compacts: TypedSlice::from_vec(Vec::new()),
            nstates,
            ncompacts: 0,
            ntransitions,
            start: fst.start(),
            error: false,
        };
        let mut compacts: Vec<C::Element> = Vec::new();
        match compactor.fixed_size() {
            Some(k) => {
                store.ncompacts = nstates * k;
                if ntransitions + nfinals != store.ncompacts {
                    store.error = true;
                    return store;
                }
                compacts.reserve(store.ncompacts);
            }
            None => {
                store.ncompacts = ntransitions + nfinals;
                compacts.reserve(store.ncompacts);
            }
        }
        let mut states: Vec<u32> = Vec::new();
        if compactor.fixed_size().is_none() {
            states.reserve(nstates + 1);
        }
        for s in fst.states() {
            let state_begin = compacts.len();
            if compactor.fixed_size().is_none() {
                states.push(state_begin as u32);
            }
            let final_weight = fst.final_weight(s);
            if final_weight != C::W::zero() {
                compacts.push(compactor.compact(s, &Transition::superfinal(final_weight)));
            }
            for tr in fst.transitions(s) {
                compacts.push(compactor.compact(s, &tr));
            }
            if let Some(k) = compactor.fixed_size() {
                if compacts.len() - state_begin != k {
                    store.error = true;
                    return store;
                }
            }
        }
        if compacts.len() != store.ncompacts {
            store.error = true;
            return store;
        }
        if compactor.fixed_size().is_none() {
            states.push(store.ncompacts as u32);
            store.states = Some(TypedSlice::from_vec(states));
        }
        store.compacts = TypedSlice::from_vec(compacts);
        store
    }

    /// Build directly from already-compacted elements, starting with the
    /// transitions out of state 0.
    ///
    /// For fixed out-degree 1 (strings), an empty input denotes the empty
    /// string and a trailing non-superfinal element receives an implicit
    /// superfinal with weight one. For variable out-degree, every state's
    /// superfinal element must be present and first; superfinals with zero
    /// weight mark non-final state boundaries and are dropped.
    pub fn from_elements(elements: Vec<C::Element>, compactor: &C) -> Self {
        let mut store = Self {
            states: None,
            compacts: TypedSlice::from_vec(Vec::new()),
            nstates: 0,
            ncompacts: 0,
            ntransitions: 0,
            start: NO_STATE_ID,
            error: false,
        };
        match compactor.fixed_size() {
            Some(k) => {
                let mut compacts = elements;
                if k == 1 {
                    match compacts.last() {
                        None => {
                            compacts
                                .push(compactor.compact(
                                    0,
                                    &Transition::superfinal(C::W::one()),
                                ));
                        }
                        Some(last) => {
                            let tr = compactor.expand(
                                compacts.len() as StateId - 1,
                                last,
                                transition::ILABEL_VALUE,
                            );
                            if tr.ilabel != NO_LABEL {
                                compacts.push(compactor.compact(
                                    compacts.len() as StateId,
                                    &Transition::superfinal(C::W::one()),
                                ));
                            }
                        }
                    }
                }
                if compacts.len() % k != 0 {
                    store.error = true;
                    return store;
                }
                if compacts.is_empty() {
                    return store;
                }
                store.start = 0;
                store.nstates = compacts.len() / k;
                store.ncompacts = compacts.len();
                for (i, element) in compacts.iter().enumerate() {
                    let tr = compactor.expand(
                        (i / k) as StateId,
                        element,
                        transition::ILABEL_VALUE,
                    );
                    if tr.ilabel != NO_LABEL {
                        store.ntransitions += 1;
                    }
                }
                store.compacts = TypedSlice::from_vec(compacts);
            }
            None => {
                if elements.is_empty() {
                    return store;
                }
                let mut compacts = Vec::new();
                let mut states = Vec::new();
                for (i, element) in elements.iter().enumerate() {
                    let tr = compactor.expand(i as StateId, element, transition::VALUE_FLAGS);
                    if tr.ilabel != NO_LABEL {
                        if states.is_empty() {
                            // Transitions before the first state boundary.
                            store.error = true;
                            return store;
                        }
                        store.ntransitions += 1;
                        compacts.push(*element);
                    } else {
                        states.push(compacts.len() as u32);
                        if tr.weight != C::W::zero() {
                            compacts.push(*element);
                        }
                    }
                }
                store.start = 0;
                store.nstates = states.len();
                store.ncompacts = compacts.len();
                states.push(store.ncompacts as u32);
                store.states = Some(TypedSlice::from_vec(states));
                store.compacts = TypedSlice::from_vec(compacts);
            }
        }
        store
    }

    /// Parse the store body. `base` is the byte offset of the reader's
    /// slice within `region`; views are zero-copy when alignment allows.
    fn read(
        r: &mut ByteReader<'_>,
        region: &SharedPtr<MappedRegion>,
        base: usize,
        hdr: &FstHeader,
        compactor: &C,
    ) -> Result<Self> {
        let nstates = hdr.num_states as usize;
        let aligned = hdr.flags & IS_ALIGNED != 0;
        let mut store = Self {
            states: None,
            compacts: TypedSlice::from_vec(Vec::new()),
            nstates,
            ncompacts: 0,
            ntransitions: hdr.num_arcs as usize,
            start: hdr.start as StateId,
            error: false,
        };
        match compactor.fixed_size() {
            Some(k) => {
                store.ncompacts = nstates * k;
            }
            None => {
                if aligned {
                    r.align_to(ARCH_ALIGNMENT)?;
                }
                let states =
                    TypedSlice::<u32>::from_region(region, base + r.pos(), nstates + 1)?;
                r.take((nstates + 1) * size_of::<u32>())?;
                store.ncompacts = states.as_slice()[nstates] as usize;
                store.states = Some(states);
            }
        }
        if aligned {
            r.align_to(ARCH_ALIGNMENT)?;
        }
        store.compacts =
            TypedSlice::<C::Element>::from_region(region, base + r.pos(), store.ncompacts)?;
        r.take(store.ncompacts * size_of::<C::Element>())?;
        Ok(store)
    }

    fn write<S: Write>(&self, w: &mut CountingWriter<S>, opts: &FstWriteOptions) -> Result<()> {
        if let Some(states) = &self.states {
            if opts.align {
                w.align_to(ARCH_ALIGNMENT as u64)?;
            }
            w.write_all(bytemuck::cast_slice(states.as_slice()))?;
        }
        if opts.align {
            w.align_to(ARCH_ALIGNMENT as u64)?;
        }
        w.write_all(bytemuck::cast_slice(self.compacts.as_slice()))?;
        Ok(())
    }

    /// Element range of state `s` in `compacts`.
    fn range(&self, s: StateId, fixed_size: Option<usize>) -> (usize, usize) {
        match (&self.states, fixed_size) {
            (Some(states), _) => {
                let states = states.as_slice();
                (states[s as usize] as usize, states[s as usize + 1] as usize)
            }
            (None, Some(k)) => (s as usize * k, (s as usize + 1) * k),
            (None, None) => unreachable!("variable store without offsets"),
        }
    }

    pub fn num_states(&self) -> usize {
        self.nstates
    }

    pub fn num_compacts(&self) -> usize {
        self.ncompacts
    }

    pub fn num_transitions(&self) -> usize {
        self.ntransitions
    }

    pub fn start(&self) -> StateId {
        self.start
    }

    pub fn error(&self) -> bool {
        self.error
    }

    pub fn compacts(&self) -> &[C::Element] {
        self.compacts.as_slice()
    }

    /// Whether either array is a view into a mapped region.
    pub fn is_mapped(&self) -> bool {
        self.compacts.is_mapped()
            || self.states.as_ref().is_some_and(TypedSlice::is_mapped)
    }
}

/// A read-only FST over a shared compactor and compact store.
///
/// Cloning shares the store and compactor and starts a fresh cache, so each
/// reader thread can hold its own cheap copy.
#[derive(Debug)]
pub struct CompactFst<C: Compactor> {
    compactor: SharedPtr<C>,
    data: SharedPtr<CompactStore<C>>,
    cache: RefCell<StateCache<C::W>>,
    properties: Cell<u64>,
    isymbols: Option<SharedPtr<SymbolTable>>,
    osymbols: Option<SharedPtr<SymbolTable>>,
}

/// Compact string FST: one label per state.
pub type CompactStringFst<W> = CompactFst<crate::compactor::StringCompactor<W>>;
/// Compact weighted string FST.
pub type CompactWeightedStringFst<W> =
    CompactFst<crate::compactor::WeightedStringCompactor<W>>;
/// Compact weighted acceptor.
pub type CompactAcceptorFst<W> = CompactFst<crate::compactor::AcceptorCompactor<W>>;
/// Compact unweighted acceptor.
pub type CompactUnweightedAcceptorFst<W> =
    CompactFst<crate::compactor::UnweightedAcceptorCompactor<W>>;
/// Compact unweighted transducer.
pub type CompactUnweightedFst<W> = CompactFst<crate::compactor::UnweightedCompactor<W>>;

impl<C: Compactor> Clone for CompactFst<C> {
    fn clone(&self) -> Self {
        Self {
            compactor: SharedPtr::clone(&self.compactor),
            data: SharedPtr::clone(&self.data),
            cache: RefCell::new(StateCache::new(compact_cache_options())),
            properties: Cell::new(self.properties.get()),
            isymbols: self.isymbols.clone(),
            osymbols: self.osymbols.clone(),
        }
    }
}

impl<C: Compactor> CompactFst<C> {
    fn fst_type_name() -> String {
        format!("compact_{}", C::compactor_type())
    }

    /// Compact a compatible FST. Incompatibility marks the result with the
    /// error property instead of failing.
    pub fn from_fst<F>(fst: &F, compactor: C) -> Self
    where
        F: ExpandedFst<W = C::W> + ?Sized,
    {
        let compatible = compactor.compatible(fst);
        let data = CompactStore::from_fst(fst, &compactor);
        let mut props = fst.properties(COPY_PROPERTIES, false) | STATIC_PROPERTIES;
        if !compatible || data.error() {
            props |= ERROR;
        }
        Self {
            compactor: SharedPtr::new(compactor),
            data: SharedPtr::new(data),
            cache: RefCell::new(StateCache::new(compact_cache_options())),
            properties: Cell::new(props),
            isymbols: fst.input_symbols().cloned().map(SharedPtr::new),
            osymbols: fst.output_symbols().cloned().map(SharedPtr::new),
        }
    }

    /// Build from raw elements; see [`CompactStore::from_elements`].
    pub fn from_elements(elements: Vec<C::Element>, compactor: C) -> Self {
        let data = CompactStore::from_elements(elements, &compactor);
        let mut props = STATIC_PROPERTIES | compactor.properties();
        if data.error() {
            props |= ERROR;
        }
        Self {
            compactor: SharedPtr::new(compactor),
            data: SharedPtr::new(data),
            cache: RefCell::new(StateCache::new(compact_cache_options())),
            properties: Cell::new(props),
            isymbols: None,
            osymbols: None,
        }
    }

    /// Parse from a shared region starting at byte `offset`.
    pub fn read_region(region: &SharedPtr<MappedRegion>, offset: usize) -> Result<Self> {
        let mut r = ByteReader::new(&region.data()[offset..]);
        let mut hdr = FstHeader::read(&mut r)?;
        hdr.check_version(&Self::fst_type_name(), MIN_FILE_VERSION)?;
        // Aligned files carry their own version number.
        if hdr.version == ALIGNED_FILE_VERSION {
            hdr.flags |= IS_ALIGNED;
        }
        if hdr.arc_type != C::W::arc_type() {
            return Err(FstError::ArcTypeMismatch {
                expected: C::W::arc_type(),
                found: hdr.arc_type,
            });
        }
        let isymbols = if hdr.flags & HAS_ISYMBOLS != 0 {
            Some(SharedPtr::new(SymbolTable::read(&mut r)?))
        } else {
            None
        };
        let osymbols = if hdr.flags & HAS_OSYMBOLS != 0 {
            Some(SharedPtr::new(SymbolTable::read(&mut r)?))
        } else {
            None
        };
        let compactor = C::read(&mut r)?;
        let data = CompactStore::read(&mut r, region, offset, &hdr, &compactor)?;
        Ok(Self {
            compactor: SharedPtr::new(compactor),
            data: SharedPtr::new(data),
            cache: RefCell::new(StateCache::new(compact_cache_options())),
            properties: Cell::new((hdr.properties & COPY_PROPERTIES) | STATIC_PROPERTIES),
            isymbols,
            osymbols,
        })
    }

    /// Read a file, optionally memory-mapping it.
    pub fn read_file(path: impl AsRef<Path>, mode: LoadMode) -> Result<Self> {
        let region = SharedPtr::new(MappedRegion::open(path, mode)?);
        Self::read_region(&region, 0)
    }

    pub fn write<S: Write>(&self, sink: S, opts: &FstWriteOptions) -> Result<()> {
        let mut w = CountingWriter::new(sink);
        let mut flags = 0;
        if self.isymbols.is_some() && opts.write_isymbols {
            flags |= HAS_ISYMBOLS;
        }
        if self.osymbols.is_some() && opts.write_osymbols {
            flags |= HAS_OSYMBOLS;
        }
        if opts.align {
            flags |= IS_ALIGNED;
        }
        let hdr = FstHeader {
            fst_type: Self::fst_type_name(),
            arc_type: C::W::arc_type(),
            version: if opts.align {
                ALIGNED_FILE_VERSION
            } else {
                FILE_VERSION
            },
            flags,
            properties: self.properties.get(),
            start: self.data.start() as i64,
            num_states: self.data.num_states() as i64,
            num_arcs: self.data.num_transitions() as i64,
        };
        hdr.write(&mut w)?;
        if flags & HAS_ISYMBOLS != 0 {
            self.isymbols.as_ref().expect("flag checked").write(&mut w)?;
        }
        if flags & HAS_OSYMBOLS != 0 {
            self.osymbols.as_ref().expect("flag checked").write(&mut w)?;
        }
        self.compactor.write(&mut w)?;
        self.data.write(&mut w, opts)?;
        w.flush()?;
        Ok(())
    }

    pub fn write_file(&self, path: impl AsRef<Path>, opts: &FstWriteOptions) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.write(std::io::BufWriter::new(file), opts)
    }

    pub fn compactor(&self) -> &C {
        &self.compactor
    }

    pub fn data(&self) -> &CompactStore<C> {
        &self.data
    }

    fn range(&self, s: StateId) -> (usize, usize) {
        self.data.range(s, self.compactor.fixed_size())
    }

    /// Materialize one state into the cache (final weight plus transitions).
    fn expand_into_cache(&self, s: StateId) {
        let mut cache = self.cache.borrow_mut();
        if cache.has_transitions(s) {
            return;
        }
        let (begin, end) = self.range(s);
        let compacts = self.data.compacts();
        for element in &compacts[begin..end] {
            let tr = self
                .compactor
                .expand(s, element, transition::VALUE_FLAGS);
            if tr.ilabel == NO_LABEL {
                cache.set_final(s, tr.weight);
            } else {
                cache.push_transition(s, tr);
            }
        }
        if !cache.has_final(s) {
            cache.set_final(s, C::W::zero());
        }
        cache.set_transitions(s);
    }

    /// Count leading epsilons straight off the store; valid when the
    /// relevant label sorting is asserted.
    fn count_epsilons(&self, s: StateId, output: bool) -> usize {
        let (begin, end) = self.range(s);
        let compacts = self.data.compacts();
        let flags = if output {
            transition::OLABEL_VALUE
        } else {
            transition::ILABEL_VALUE
        };
        let mut n = 0;
        for element in &compacts[begin..end] {
            let tr = self.compactor.expand(s, element, flags);
            let label = if output { tr.olabel } else { tr.ilabel };
            if label == NO_LABEL {
                continue;
            }
            if label != EPSILON {
                break;
            }
            n += 1;
        }
        n
    }
}

impl<C: Compactor> Fst for CompactFst<C> {
    type W = C::W;
    type TransitionIter<'a>
        = CompactTransitionIter<'a, C>
    where
        Self: 'a;

    fn start(&self) -> StateId {
        self.data.start()
    }

    fn final_weight(&self, s: StateId) -> C::W {
        if let Some(w) = self.cache.borrow().final_weight(s) {
            return w.clone();
        }
        let (begin, end) = self.range(s);
        if begin == end {
            return C::W::zero();
        }
        let tr = self.compactor.expand(
            s,
            &self.data.compacts()[begin],
            transition::ILABEL_VALUE | transition::WEIGHT_VALUE,
        );
        if tr.ilabel == NO_LABEL {
            tr.weight
        } else {
            C::W::zero()
        }
    }

    fn num_transitions(&self, s: StateId) -> usize {
        if let Some(n) = self.cache.borrow().num_transitions(s) {
            return n;
        }
        let (begin, end) = self.range(s);
        let mut n = end - begin;
        if n > 0 {
            let tr = self.compactor.expand(
                s,
                &self.data.compacts()[begin],
                transition::ILABEL_VALUE,
            );
            if tr.ilabel == NO_LABEL {
                n -= 1;
            }
        }
        n
    }

    fn num_input_epsilons(&self, s: StateId) -> usize {
        if self.cache.borrow().num_input_epsilons(s).is_none()
            && self.properties.get() & ILABEL_SORTED == 0
        {
            self.expand_into_cache(s);
        }
        if let Some(n) = self.cache.borrow().num_input_epsilons(s) {
            return n;
        }
        self.count_epsilons(s, false)
    }

    fn num_output_epsilons(&self, s: StateId) -> usize {
        if self.cache.borrow().num_output_epsilons(s).is_none()
            && self.properties.get() & OLABEL_SORTED == 0
        {
            self.expand_into_cache(s);
        }
        if let Some(n) = self.cache.borrow().num_output_epsilons(s) {
            return n;
        }
        self.count_epsilons(s, true)
    }

    fn properties(&self, mask: u64, test: bool) -> u64 {
        if test && known_properties(self.properties.get()) & mask != mask {
            let computed = properties::compute_properties(self);
            let binary = self.properties.get() & BINARY_PROPERTIES;
            self.properties.set(binary | computed);
        }
        self.properties.get() & mask
    }

    fn fst_type(&self) -> String {
        Self::fst_type_name()
    }

    fn input_symbols(&self) -> Option<&SymbolTable> {
        self.isymbols.as_deref()
    }

    fn output_symbols(&self) -> Option<&SymbolTable> {
        self.osymbols.as_deref()
    }

    /// Iterate transitions straight off the store, bypassing the cache: the
    /// first element is peeked for a superfinal and skipped when present.
    fn transitions(&self, s: StateId) -> CompactTransitionIter<'_, C> {
        let (mut begin, end) = self.range(s);
        let compacts = self.data.compacts();
        if begin < end {
            let tr = self.compactor.expand(
                s,
                &compacts[begin],
                transition::ILABEL_VALUE,
            );
            if tr.ilabel == NO_LABEL {
                begin += 1;
            }
        }
        CompactTransitionIter {
            compactor: &self.compactor,
            compacts: &compacts[begin..end],
            state: s,
            pos: 0,
            flags: transition::VALUE_FLAGS,
        }
    }
}

impl<C: Compactor> ExpandedFst for CompactFst<C> {
    fn num_states(&self) -> StateId {
        if self.properties.get() & ERROR != 0 {
            return 0;
        }
        self.data.num_states() as StateId
    }
}

/// On-demand expanding transition iterator over one state's elements.
#[derive(Debug)]
pub struct CompactTransitionIter<'a, C: Compactor> {
    compactor: &'a C,
    compacts: &'a [C::Element],
    state: StateId,
    pos: usize,
    flags: u32,
}

impl<'a, C: Compactor> CompactTransitionIter<'a, C> {
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn reset(&mut self) {
        self.pos = 0;
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }

    /// Restrict which fields expansion must fill, e.g. label-only scans.
    pub fn set_flags(&mut self, flags: u32, mask: u32) {
        self.flags &= !mask;
        self.flags |= flags & transition::VALUE_FLAGS;
    }
}

impl<'a, C: Compactor> Iterator for CompactTransitionIter<'a, C> {
    type Item = Transition<C::W>;

    fn next(&mut self) -> Option<Self::Item> {
        let element = self.compacts.get(self.pos)?;
        self.pos += 1;
        Some(self.compactor.expand(self.state, element, self.flags))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.compacts.len() - self.pos.min(self.compacts.len());
        (n, Some(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compactor::{
        AcceptorCompactor, StringCompactor, UnweightedCompactor, WeightedStringCompactor,
    };
    use crate::float_weight::TropicalWeight;
    use crate::fst::MutableFst;
    use crate::properties::{ACCEPTOR, STRING, UNWEIGHTED, verify_properties};
    use crate::vector_fst::VectorFst;

    type W = TropicalWeight;

    fn chain_fst(labels: &[i32]) -> VectorFst<W> {
        let mut fst = VectorFst::new();
        let mut prev = fst.add_state();
        fst.set_start(prev);
        for &label in labels {
            let next = fst.add_state();
            fst.add_transition(prev, Transition::new(label, label, W::one(), next));
            prev = next;
        }
        fst.set_final(prev, W::one());
        fst
    }

    fn assert_same_fst<A, B>(a: &A, b: &B)
    where
        A: ExpandedFst<W = W>,
        B: ExpandedFst<W = W>,
    {
        assert_eq!(a.num_states(), b.num_states());
        assert_eq!(a.start(), b.start());
        for s in a.states() {
            assert_eq!(a.final_weight(s), b.final_weight(s), "final of {s}");
            let left: Vec<_> = a.transitions(s).collect();
            let right: Vec<_> = b.transitions(s).collect();
            assert_eq!(left, right, "transitions of {s}");
        }
    }

    #[test]
    fn empty_string_fst() {
        let fst = CompactStringFst::<W>::from_elements(
            Vec::new(),
            StringCompactor::default(),
        );
        assert_eq!(fst.num_states(), 1);
        assert_eq!(fst.start(), 0);
        assert_eq!(fst.final_weight(0), W::one());
        assert_eq!(fst.num_transitions(0), 0);
        assert!(fst.transitions(0).next().is_none());
    }

    #[test]
    fn string_fst_from_labels() {
        let fst = CompactStringFst::<W>::from_elements(
            vec![5, 6, 7],
            StringCompactor::default(),
        );
        assert_eq!(fst.num_states(), 4);
        assert_eq!(fst.start(), 0);
        for (s, label) in [(0, 5), (1, 6), (2, 7)] {
            let trs: Vec<_> = fst.transitions(s).collect();
            assert_eq!(trs, vec![Transition::new(label, label, W::one(), s + 1)]);
        }
        assert_eq!(fst.final_weight(3), W::one());
        assert_ne!(fst.properties(STRING, false) & STRING, 0);
        assert!(verify_properties(&fst));
    }

    #[test]
    fn compact_round_trips_to_vector() {
        let source = chain_fst(&[1, 2, 3]);
        let compact =
            CompactStringFst::<W>::from_fst(&source, StringCompactor::default());
        assert_eq!(compact.properties(ERROR, false), 0);
        assert_same_fst(&source, &compact);
        let back = VectorFst::from_fst(&compact);
        assert_same_fst(&source, &back);
    }

    #[test]
    fn weighted_acceptor_compact() {
        let mut source = VectorFst::<W>::new();
        let s0 = source.add_state();
        let s1 = source.add_state();
        source.set_start(s0);
        source.set_final(s1, W::new(0.5));
        source.add_transition(s0, Transition::new(1, 1, W::new(1.5), s1));
        source.add_transition(s0, Transition::new(2, 2, W::one(), s1));
        source.add_transition(s1, Transition::new(3, 3, W::new(2.5), s0));

        let compact =
            CompactAcceptorFst::<W>::from_fst(&source, AcceptorCompactor::default());
        assert_eq!(compact.properties(ERROR, false), 0);
        assert_same_fst(&source, &compact);
        // The superfinal element is stored first yet never iterated.
        assert_eq!(compact.num_transitions(s1), 1);
        assert_eq!(compact.final_weight(s1), W::new(0.5));
    }

    #[test]
    fn unweighted_transducer_compact() {
        let mut source = VectorFst::<W>::new();
        let s0 = source.add_state();
        let s1 = source.add_state();
        source.set_start(s0);
        source.set_final(s1, W::one());
        source.add_transition(s0, Transition::new(1, 2, W::one(), s1));
        source.add_transition(s0, Transition::new(3, 4, W::one(), s1));

        let compact =
            CompactUnweightedFst::<W>::from_fst(&source, UnweightedCompactor::default());
        assert_eq!(compact.properties(ERROR, false), 0);
        assert_same_fst(&source, &compact);
    }

    #[test]
    fn incompatible_fst_sets_error() {
        let mut weighted = VectorFst::<W>::new();
        let s0 = weighted.add_state();
        let s1 = weighted.add_state();
        weighted.set_start(s0);
        weighted.set_final(s1, W::one());
        weighted.add_transition(s0, Transition::new(1, 1, W::new(2.0), s1));

        let compact =
            CompactStringFst::<W>::from_fst(&weighted, StringCompactor::default());
        assert_ne!(compact.properties(ERROR, false) & ERROR, 0);
        assert_eq!(compact.num_states(), 0);
    }

    #[test]
    fn clones_share_the_store() {
        let compact = CompactStringFst::<W>::from_elements(
            vec![1, 2],
            StringCompactor::default(),
        );
        let copy = compact.clone();
        assert!(SharedPtr::ptr_eq(&compact.data, &copy.data));
        assert_same_fst(&compact, &copy);
    }

    #[test]
    fn epsilon_counts_via_cache() {
        let mut source = VectorFst::<W>::new();
        let s0 = source.add_state();
        let s1 = source.add_state();
        source.set_start(s0);
        source.set_final(s1, W::one());
        source.add_transition(s0, Transition::new(0, 0, W::one(), s1));
        source.add_transition(s0, Transition::new(1, 0, W::one(), s1));

        let compact =
            CompactUnweightedFst::<W>::from_fst(&source, UnweightedCompactor::default());
        assert_eq!(compact.num_input_epsilons(s0), 1);
        assert_eq!(compact.num_output_epsilons(s0), 2);
        assert_eq!(compact.num_input_epsilons(s1), 0);
    }

    #[test]
    fn file_round_trip_unaligned() {
        let source = chain_fst(&[9, 8]);
        let compact = CompactWeightedStringFst::<W>::from_fst(
            &source,
            WeightedStringCompactor::default(),
        );
        let mut buf = Vec::new();
        compact.write(&mut buf, &FstWriteOptions::default()).unwrap();

        let region = SharedPtr::new(MappedRegion::from_vec(buf));
        let back = CompactWeightedStringFst::<W>::read_region(&region, 0).unwrap();
        assert_same_fst(&compact, &back);
    }

    #[test]
    fn file_round_trip_aligned_and_mapped() {
        let mut source = VectorFst::<W>::new();
        let s0 = source.add_state();
        let s1 = source.add_state();
        source.set_start(s0);
        source.set_final(s1, W::new(0.25));
        source.add_transition(s0, Transition::new(1, 1, W::new(1.0), s1));
        source.add_transition(s1, Transition::new(2, 2, W::one(), s0));
        let compact =
            CompactAcceptorFst::<W>::from_fst(&source, AcceptorCompactor::default());

        let file = tempfile::NamedTempFile::new().unwrap();
        compact
            .write_file(file.path(), &FstWriteOptions::aligned())
            .unwrap();

        let read_back =
            CompactAcceptorFst::<W>::read_file(file.path(), LoadMode::Read).unwrap();
        let mapped_back =
            CompactAcceptorFst::<W>::read_file(file.path(), LoadMode::Map).unwrap();
        assert!(mapped_back.data().is_mapped());
        assert_same_fst(&read_back, &mapped_back);
        assert_same_fst(&compact, &mapped_back);
    }

    #[test]
    fn rejects_wrong_compactor_type() {
        let compact = CompactStringFst::<W>::from_elements(
            vec![1],
            StringCompactor::default(),
        );
        let mut buf = Vec::new();
        compact.write(&mut buf, &FstWriteOptions::default()).unwrap();
        let region = SharedPtr::new(MappedRegion::from_vec(buf));
        let err = CompactAcceptorFst::<W>::read_region(&region, 0).unwrap_err();
        assert!(matches!(err, FstError::FstTypeMismatch { .. }));
    }

    #[test]
    fn compactor_properties_are_asserted() {
        let fst = CompactStringFst::<W>::from_elements(
            vec![4],
            StringCompactor::default(),
        );
        let props = fst.properties(STRING | ACCEPTOR | UNWEIGHTED, false);
        assert_eq!(props, STRING | ACCEPTOR | UNWEIGHTED);
    }
}
