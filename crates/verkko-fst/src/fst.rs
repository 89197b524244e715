// The polymorphic transducer interface: read-only, expanded and mutable
// views. Polymorphism is parametric throughout; weight operations stay
// monomorphized and inlinable.

use std::ops::Range;
use std::sync::Arc as SharedPtr;

use crate::symbols::SymbolTable;
use crate::transition::Transition;
use crate::weight::Weight;
use crate::StateId;

/// A read-only weighted finite-state transducer.
///
/// States are dense indices; `start` is `NO_STATE_ID` for the empty machine.
/// A state's final weight of `zero` marks it non-final. Transition iteration
/// order is the representation's layout order; when `ILABEL_SORTED` is
/// asserted, transitions come in non-decreasing input-label order.
pub trait Fst {
    type W: Weight;
    type TransitionIter<'a>: Iterator<Item = Transition<Self::W>>
    where
        Self: 'a;

    fn start(&self) -> StateId;

    fn final_weight(&self, s: StateId) -> Self::W;

    fn num_transitions(&self, s: StateId) -> usize;

    fn num_input_epsilons(&self, s: StateId) -> usize;

    fn num_output_epsilons(&self, s: StateId) -> usize;

    /// Property bits restricted to `mask`. With `test` set, any unknown bits
    /// in the mask are computed by a full pass and become known.
    fn properties(&self, mask: u64, test: bool) -> u64;

    /// Representation identifier stored in file headers, e.g. `vector`.
    fn fst_type(&self) -> String;

    fn input_symbols(&self) -> Option<&SymbolTable>;

    fn output_symbols(&self) -> Option<&SymbolTable>;

    fn transitions(&self, s: StateId) -> Self::TransitionIter<'_>;
}

/// An FST whose state count is known.
pub trait ExpandedFst: Fst {
    fn num_states(&self) -> StateId;

    fn states(&self) -> Range<StateId> {
        0..self.num_states()
    }
}

/// An FST that owns its states and supports incremental construction.
///
/// Mutations maintain the property bits incrementally: each operation keeps
/// only the bits it cannot invalidate, per the rules in [`crate::properties`].
pub trait MutableFst: ExpandedFst {
    fn set_start(&mut self, s: StateId);

    fn set_final(&mut self, s: StateId, weight: Self::W);

    /// Append a fresh state with `zero` final weight and no transitions.
    fn add_state(&mut self) -> StateId;

    fn add_transition(&mut self, s: StateId, tr: Transition<Self::W>);

    /// Remove the listed states and every transition referencing them;
    /// remaining states are renumbered to stay dense, preserving order. The
    /// start state is remapped, or cleared if it was deleted.
    fn delete_states(&mut self, states: &[StateId]);

    fn delete_all_states(&mut self);

    /// Remove all transitions leaving `s`.
    fn delete_transitions(&mut self, s: StateId);

    /// Capacity hint; no observable behavior change.
    fn reserve_states(&mut self, _n: usize) {}

    /// Capacity hint for the transition list of `s`.
    fn reserve_transitions(&mut self, _s: StateId, _n: usize) {}

    /// Overwrite the bits selected by `mask`. The error bit is sticky: once
    /// set it survives every call.
    fn set_properties(&mut self, props: u64, mask: u64);

    fn set_input_symbols(&mut self, symbols: Option<SharedPtr<SymbolTable>>);

    fn set_output_symbols(&mut self, symbols: Option<SharedPtr<SymbolTable>>);
}
