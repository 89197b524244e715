// Mutable transducer with per-state adjacency lists; the workhorse
// representation for incremental construction.

use std::cell::Cell;
use std::io::Write;
use std::path::Path;
use std::sync::Arc as SharedPtr;

use crate::fst::{ExpandedFst, Fst, MutableFst};
use crate::io::{
    ByteReader, CountingWriter, FstHeader, FstWriteOptions, HAS_ISYMBOLS, HAS_OSYMBOLS,
};
use crate::properties::{
    self, BINARY_PROPERTIES, COPY_PROPERTIES, ERROR, EXPANDED, FST_PROPERTIES, MUTABLE,
    NULL_PROPERTIES, known_properties,
};
use crate::symbols::SymbolTable;
use crate::transition::Transition;
use crate::weight::Weight;
use crate::{EPSILON, FstError, NO_STATE_ID, Result, StateId};

/// On-disk format version written by this crate.
const FILE_VERSION: i32 = 2;
/// Oldest format version this crate reads.
const MIN_FILE_VERSION: i32 = 1;

const STATIC_PROPERTIES: u64 = EXPANDED | MUTABLE;

#[derive(Debug, Clone)]
struct VectorState<W: Weight> {
    final_weight: W,
    transitions: Vec<Transition<W>>,
    niepsilons: usize,
    noepsilons: usize,
}

impl<W: Weight> VectorState<W> {
    fn new() -> Self {
        Self {
            final_weight: W::zero(),
            transitions: Vec::new(),
            niepsilons: 0,
            noepsilons: 0,
        }
    }
}

/// A mutable, in-memory FST.
///
/// Transition iteration order is insertion order. Property bits are
/// maintained incrementally across mutations and can be recomputed exactly
/// on demand.
#[derive(Debug, Clone)]
pub struct VectorFst<W: Weight> {
    states: Vec<VectorState<W>>,
    start: StateId,
    properties: Cell<u64>,
    isymbols: Option<SharedPtr<SymbolTable>>,
    osymbols: Option<SharedPtr<SymbolTable>>,
}

impl<W: Weight> Default for VectorFst<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Weight> VectorFst<W> {
    pub fn new() -> Self {
        Self {
            states: Vec::new(),
            start: NO_STATE_ID,
            properties: Cell::new(NULL_PROPERTIES | STATIC_PROPERTIES),
            isymbols: None,
            osymbols: None,
        }
    }

    /// Materialize any expanded FST into vector form, copying structure,
    /// weights, symbol tables and the copyable property bits.
    pub fn from_fst<F>(other: &F) -> Self
    where
        F: ExpandedFst<W = W> + ?Sized,
    {
        let mut fst = Self::new();
        fst.states.reserve(other.num_states() as usize);
        for s in other.states() {
            let added = fst.add_state();
            debug_assert_eq!(added, s);
            for tr in other.transitions(s) {
                fst.add_transition(s, tr);
            }
            let final_weight = other.final_weight(s);
            if final_weight != W::zero() {
                fst.set_final(s, final_weight);
            }
        }
        if other.start() != NO_STATE_ID {
            fst.set_start(other.start());
        }
        fst.properties
            .set(other.properties(COPY_PROPERTIES, false) | STATIC_PROPERTIES);
        fst
    }

    /// Parse from the byte form produced by [`write`](Self::write).
    pub fn read(r: &mut ByteReader<'_>) -> Result<Self> {
        let hdr = FstHeader::read(r)?;
        hdr.check_version("vector", MIN_FILE_VERSION)?;
        if hdr.arc_type != W::arc_type() {
            return Err(FstError::ArcTypeMismatch {
                expected: W::arc_type(),
                found: hdr.arc_type,
            });
        }
        let isymbols = if hdr.flags & HAS_ISYMBOLS != 0 {
            Some(SharedPtr::new(SymbolTable::read(r)?))
        } else {
            None
        };
        let osymbols = if hdr.flags & HAS_OSYMBOLS != 0 {
            Some(SharedPtr::new(SymbolTable::read(r)?))
        } else {
            None
        };
        if hdr.num_states < 0 {
            return Err(FstError::Format(format!(
                "negative state count {}",
                hdr.num_states
            )));
        }
        let mut fst = Self::new();
        fst.isymbols = isymbols;
        fst.osymbols = osymbols;
        fst.states.reserve(hdr.num_states as usize);
        for _ in 0..hdr.num_states {
            let mut state = VectorState::new();
            state.final_weight = W::read_binary(r)?;
            let ntrans = r.read_i64()?;
            if ntrans < 0 {
                return Err(FstError::Format(format!(
                    "negative transition count {ntrans}"
                )));
            }
            state.transitions.reserve(ntrans as usize);
            for _ in 0..ntrans {
                let tr = Transition::read_binary(r)?;
                if tr.ilabel == EPSILON {
                    state.niepsilons += 1;
                }
                if tr.olabel == EPSILON {
                    state.noepsilons += 1;
                }
                state.transitions.push(tr);
            }
            fst.states.push(state);
        }
        fst.start = hdr.start as StateId;
        fst.properties
            .set((hdr.properties & COPY_PROPERTIES) | STATIC_PROPERTIES);
        Ok(fst)
    }

    pub fn read_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::read(&mut ByteReader::new(&bytes))
    }

    /// Serialize: header, optional symbol tables, then per state the final
    /// weight, transition count and transition records.
    pub fn write<S: Write>(&self, sink: S, opts: &FstWriteOptions) -> Result<()> {
        let mut w = CountingWriter::new(sink);
        let mut flags = 0;
        if self.isymbols.is_some() && opts.write_isymbols {
            flags |= HAS_ISYMBOLS;
        }
        if self.osymbols.is_some() && opts.write_osymbols {
            flags |= HAS_OSYMBOLS;
        }
        let num_arcs: usize = self.states.iter().map(|s| s.transitions.len()).sum();
        let hdr = FstHeader {
            fst_type: "vector".to_string(),
            arc_type: W::arc_type(),
            version: FILE_VERSION,
            flags,
            properties: self.properties.get(),
            start: self.start as i64,
            num_states: self.states.len() as i64,
            num_arcs: num_arcs as i64,
        };
        hdr.write(&mut w)?;
        if flags & HAS_ISYMBOLS != 0 {
            self.isymbols.as_ref().expect("flag checked").write(&mut w)?;
        }
        if flags & HAS_OSYMBOLS != 0 {
            self.osymbols.as_ref().expect("flag checked").write(&mut w)?;
        }
        for state in &self.states {
            state.final_weight.write_binary(&mut w)?;
            crate::io::write_i64(&mut w, state.transitions.len() as i64)?;
            for tr in &state.transitions {
                tr.write_binary(&mut w)?;
            }
        }
        w.flush()?;
        Ok(())
    }

    pub fn write_file(&self, path: impl AsRef<Path>, opts: &FstWriteOptions) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.write(std::io::BufWriter::new(file), opts)
    }

    fn update_properties(&mut self, props: u64) {
        let error = self.properties.get() & ERROR;
        self.properties.set(props | STATIC_PROPERTIES | error);
    }
}

impl<W: Weight> Fst for VectorFst<W> {
    type W = W;
    type TransitionIter<'a>
        = std::iter::Cloned<std::slice::Iter<'a, Transition<W>>>
    where
        Self: 'a;

    fn start(&self) -> StateId {
        self.start
    }

    fn final_weight(&self, s: StateId) -> W {
        self.states[s as usize].final_weight.clone()
    }

    fn num_transitions(&self, s: StateId) -> usize {
        self.states[s as usize].transitions.len()
    }

    fn num_input_epsilons(&self, s: StateId) -> usize {
        self.states[s as usize].niepsilons
    }

    fn num_output_epsilons(&self, s: StateId) -> usize {
        self.states[s as usize].noepsilons
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
        "vector".to_string()
    }

    fn input_symbols(&self) -> Option<&SymbolTable> {
        self.isymbols.as_deref()
    }

    fn output_symbols(&self) -> Option<&SymbolTable> {
        self.osymbols.as_deref()
    }

    fn transitions(&self, s: StateId) -> Self::TransitionIter<'_> {
        self.states[s as usize].transitions.iter().cloned()
    }
}

impl<W: Weight> ExpandedFst for VectorFst<W> {
    fn num_states(&self) -> StateId {
        self.states.len() as StateId
    }
}

impl<W: Weight> MutableFst for VectorFst<W> {
    fn set_start(&mut self, s: StateId) {
        self.start = s;
        self.update_properties(properties::set_start_properties(self.properties.get()));
    }

    fn set_final(&mut self, s: StateId, weight: W) {
        let mut props = {
            let old = &self.states[s as usize].final_weight;
            properties::set_final_properties(self.properties.get(), Some(old), &weight)
        };
        if !weight.member() {
            props |= ERROR;
        }
        self.states[s as usize].final_weight = weight;
        self.update_properties(props);
    }

    fn add_state(&mut self) -> StateId {
        self.states.push(VectorState::new());
        self.update_properties(properties::add_state_properties(self.properties.get()));
        (self.states.len() - 1) as StateId
    }

    fn add_transition(&mut self, s: StateId, tr: Transition<W>) {
        let mut props = {
            let state = &self.states[s as usize];
            properties::add_transition_properties(
                self.properties.get(),
                s,
                &tr,
                state.transitions.last(),
            )
        };
        if !tr.weight.member() {
            props |= ERROR;
        }
        let state = &mut self.states[s as usize];
        if tr.ilabel == EPSILON {
            state.niepsilons += 1;
        }
        if tr.olabel == EPSILON {
            state.noepsilons += 1;
        }
        state.transitions.push(tr);
        self.update_properties(props);
    }

    fn delete_states(&mut self, dstates: &[StateId]) {
        if dstates.is_empty() {
            return;
        }
        let mut deleted = vec![false; self.states.len()];
        for &s in dstates {
            deleted[s as usize] = true;
        }
        // Renumber survivors in order.
        let mut newid = vec![NO_STATE_ID; self.states.len()];
        let mut next = 0;
        for (s, del) in deleted.iter().enumerate() {
            if !del {
                newid[s] = next;
                next += 1;
            }
        }
        let old_states = std::mem::take(&mut self.states);
        self.states.reserve(next as usize);
        for (s, mut state) in old_states.into_iter().enumerate() {
            if deleted[s] {
                continue;
            }
            let mut niepsilons = 0;
            let mut noepsilons = 0;
            state.transitions.retain_mut(|tr| {
                if deleted[tr.nextstate as usize] {
                    return false;
                }
                tr.nextstate = newid[tr.nextstate as usize];
                if tr.ilabel == EPSILON {
                    niepsilons += 1;
                }
                if tr.olabel == EPSILON {
                    noepsilons += 1;
                }
                true
            });
            state.niepsilons = niepsilons;
            state.noepsilons = noepsilons;
            self.states.push(state);
        }
        self.start = if self.start == NO_STATE_ID || deleted[self.start as usize] {
            NO_STATE_ID
        } else {
            newid[self.start as usize]
        };
        self.update_properties(properties::delete_states_properties(self.properties.get()));
    }

    fn delete_all_states(&mut self) {
        self.states.clear();
        self.start = NO_STATE_ID;
        let error = self.properties.get() & ERROR;
        self.properties
            .set(NULL_PROPERTIES | STATIC_PROPERTIES | error);
    }

    fn delete_transitions(&mut self, s: StateId) {
        let state = &mut self.states[s as usize];
        state.transitions.clear();
        state.niepsilons = 0;
        state.noepsilons = 0;
        self.update_properties(properties::delete_transitions_properties(
            self.properties.get(),
        ));
    }

    fn reserve_states(&mut self, n: usize) {
        self.states.reserve(n);
    }

    fn reserve_transitions(&mut self, s: StateId, n: usize) {
        self.states[s as usize].transitions.reserve(n);
    }

    fn set_properties(&mut self, props: u64, mask: u64) {
        let error = self.properties.get() & ERROR;
        let masked = (self.properties.get() & !mask) | (props & mask & FST_PROPERTIES);
        self.properties.set(masked | error);
    }

    fn set_input_symbols(&mut self, symbols: Option<SharedPtr<SymbolTable>>) {
        self.isymbols = symbols;
    }

    fn set_output_symbols(&mut self, symbols: Option<SharedPtr<SymbolTable>>) {
        self.osymbols = symbols;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::float_weight::TropicalWeight;
    use crate::properties::{
        ACCEPTOR, ACYCLIC, CYCLIC, EPSILONS, ILABEL_SORTED, NOT_ILABEL_SORTED, UNWEIGHTED,
        WEIGHTED, verify_properties,
    };

    type F = VectorFst<TropicalWeight>;

    fn tr(i: i32, o: i32, w: f32, next: StateId) -> Transition<TropicalWeight> {
        Transition::new(i, o, TropicalWeight::new(w), next)
    }

    fn two_state_fst() -> F {
        let mut fst = F::new();
        let s0 = fst.add_state();
        let s1 = fst.add_state();
        fst.set_start(s0);
        fst.set_final(s1, TropicalWeight::one());
        fst.add_transition(s0, tr(5, 5, 0.0, s1));
        fst
    }

    #[test]
    fn empty_fst() {
        let fst = F::new();
        assert_eq!(fst.start(), NO_STATE_ID);
        assert_eq!(fst.num_states(), 0);
        assert_ne!(fst.properties(ACCEPTOR, false) & ACCEPTOR, 0);
        assert!(verify_properties(&fst));
    }

    #[test]
    fn build_and_iterate() {
        let fst = two_state_fst();
        assert_eq!(fst.start(), 0);
        assert_eq!(fst.num_states(), 2);
        assert_eq!(fst.num_transitions(0), 1);
        assert_eq!(fst.num_transitions(1), 0);
        assert_eq!(fst.final_weight(0), TropicalWeight::zero());
        assert_eq!(fst.final_weight(1), TropicalWeight::one());
        let trs: Vec<_> = fst.transitions(0).collect();
        assert_eq!(trs, vec![tr(5, 5, 0.0, 1)]);
    }

    #[test]
    fn properties_track_mutations() {
        let mut fst = two_state_fst();
        assert_ne!(fst.properties(ACCEPTOR, true) & ACCEPTOR, 0);
        assert_ne!(fst.properties(UNWEIGHTED, false) & UNWEIGHTED, 0);
        assert!(verify_properties(&fst));

        fst.add_transition(0, tr(3, 7, 1.5, 1));
        assert_eq!(fst.properties(ACCEPTOR, false) & ACCEPTOR, 0);
        assert_ne!(fst.properties(WEIGHTED, false) & WEIGHTED, 0);
        assert_ne!(
            fst.properties(NOT_ILABEL_SORTED, false) & NOT_ILABEL_SORTED,
            0
        );
        assert!(verify_properties(&fst));
    }

    #[test]
    fn sorted_appends_keep_sortedness() {
        let mut fst = F::new();
        let s0 = fst.add_state();
        let s1 = fst.add_state();
        fst.set_start(s0);
        fst.set_final(s1, TropicalWeight::one());
        fst.add_transition(s0, tr(1, 1, 0.0, s1));
        fst.add_transition(s0, tr(2, 2, 0.0, s1));
        fst.add_transition(s0, tr(2, 2, 0.0, s1));
        assert_ne!(fst.properties(ILABEL_SORTED, false) & ILABEL_SORTED, 0);
        assert!(verify_properties(&fst));
    }

    #[test]
    fn epsilon_counts() {
        let mut fst = F::new();
        let s0 = fst.add_state();
        let s1 = fst.add_state();
        fst.add_transition(s0, tr(0, 3, 0.0, s1));
        fst.add_transition(s0, tr(4, 0, 0.0, s1));
        fst.add_transition(s0, tr(0, 0, 0.0, s1));
        assert_eq!(fst.num_input_epsilons(s0), 2);
        assert_eq!(fst.num_output_epsilons(s0), 2);
        assert_ne!(fst.properties(EPSILONS, true) & EPSILONS, 0);
    }

    #[test]
    fn self_loop_is_cyclic() {
        let mut fst = two_state_fst();
        fst.add_transition(1, tr(1, 1, 0.0, 1));
        assert_ne!(fst.properties(CYCLIC, true) & CYCLIC, 0);
        assert_eq!(fst.properties(ACYCLIC, false) & ACYCLIC, 0);
        assert!(verify_properties(&fst));
    }

    #[test]
    fn delete_states_renumbers_and_filters() {
        let mut fst = F::new();
        let s0 = fst.add_state();
        let s1 = fst.add_state();
        let s2 = fst.add_state();
        fst.set_start(s0);
        fst.set_final(s2, TropicalWeight::one());
        fst.add_transition(s0, tr(1, 1, 0.0, s1));
        fst.add_transition(s0, tr(2, 2, 0.0, s2));
        fst.add_transition(s1, tr(3, 3, 0.0, s2));

        fst.delete_states(&[s1]);
        assert_eq!(fst.num_states(), 2);
        assert_eq!(fst.start(), 0);
        // The transition through the deleted state is gone; the survivor is
        // renumbered.
        let trs: Vec<_> = fst.transitions(0).collect();
        assert_eq!(trs, vec![tr(2, 2, 0.0, 1)]);
        assert_eq!(fst.final_weight(1), TropicalWeight::one());
        assert!(verify_properties(&fst));
    }

    #[test]
    fn delete_start_clears_it() {
        let mut fst = two_state_fst();
        fst.delete_states(&[0]);
        assert_eq!(fst.start(), NO_STATE_ID);
        assert_eq!(fst.num_states(), 1);
        assert!(verify_properties(&fst));
    }

    #[test]
    fn delete_all_states_resets() {
        let mut fst = two_state_fst();
        fst.delete_all_states();
        assert_eq!(fst.num_states(), 0);
        assert_eq!(fst.start(), NO_STATE_ID);
        assert_eq!(
            fst.properties(NULL_PROPERTIES, false),
            NULL_PROPERTIES
        );
    }

    #[test]
    fn non_member_weight_marks_error() {
        let mut fst = two_state_fst();
        fst.add_transition(0, Transition::new(1, 1, TropicalWeight::no_weight(), 1));
        assert_ne!(fst.properties(ERROR, false) & ERROR, 0);
    }

    #[test]
    fn error_bit_is_sticky() {
        let mut fst = two_state_fst();
        fst.set_properties(ERROR, ERROR);
        fst.add_transition(0, tr(1, 1, 0.0, 1));
        fst.set_start(1);
        fst.set_properties(0, ERROR);
        assert_ne!(fst.properties(ERROR, false) & ERROR, 0);
    }

    #[test]
    fn binary_round_trip_single_transition() {
        let fst = two_state_fst();
        let mut buf = Vec::new();
        fst.write(&mut buf, &FstWriteOptions::default()).unwrap();

        // The header survives byte-exactly.
        let mut r = ByteReader::new(&buf);
        let hdr = FstHeader::read(&mut r).unwrap();
        assert_eq!(hdr.fst_type, "vector");
        assert_eq!(hdr.arc_type, "standard");
        assert_eq!(hdr.num_states, 2);
        assert_eq!(hdr.num_arcs, 1);
        assert_eq!(hdr.start, 0);

        let back = F::read(&mut ByteReader::new(&buf)).unwrap();
        assert_eq!(back.num_states(), 2);
        assert_eq!(back.start(), 0);
        assert_eq!(back.final_weight(1), TropicalWeight::one());
        let trs: Vec<_> = back.transitions(0).collect();
        assert_eq!(trs, vec![tr(5, 5, 0.0, 1)]);
        assert!(verify_properties(&back));
    }

    #[test]
    fn round_trip_with_symbols() {
        let mut fst = two_state_fst();
        let mut syms = SymbolTable::new("letters");
        syms.add_symbol("<eps>");
        syms.add_symbol("a");
        fst.set_input_symbols(Some(SharedPtr::new(syms)));

        let mut buf = Vec::new();
        fst.write(&mut buf, &FstWriteOptions::default()).unwrap();
        let back = F::read(&mut ByteReader::new(&buf)).unwrap();
        let table = back.input_symbols().expect("input symbols survive");
        assert_eq!(table.find_key("a"), Some(1));
        assert!(back.output_symbols().is_none());
    }

    #[test]
    fn read_rejects_wrong_arc_type() {
        let fst = two_state_fst();
        let mut buf = Vec::new();
        fst.write(&mut buf, &FstWriteOptions::default()).unwrap();
        let err = VectorFst::<crate::float_weight::LogWeight>::read(&mut ByteReader::new(&buf))
            .unwrap_err();
        assert!(matches!(err, FstError::ArcTypeMismatch { .. }));
    }

    #[test]
    fn from_fst_copies_structure() {
        let fst = two_state_fst();
        let copy = F::from_fst(&fst);
        assert_eq!(copy.num_states(), 2);
        assert_eq!(copy.start(), 0);
        assert_eq!(copy.final_weight(1), TropicalWeight::one());
        let trs: Vec<_> = copy.transitions(0).collect();
        assert_eq!(trs, vec![tr(5, 5, 0.0, 1)]);
    }
}
