// Per-state lazy store backing derived and read-only transducers: records
// each state's final weight, transition list and expansion status, with a
// byte-budgeted FIFO garbage collector.

use std::collections::VecDeque;

use crate::config::FstConfig;
use crate::transition::Transition;
use crate::weight::Weight;
use crate::{EPSILON, NO_STATE_ID, StateId};

/// Cache behavior knobs; defaults come from [`FstConfig`].
#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// Whether to garbage collect at all.
    pub gc: bool,
    /// Byte budget for resident transition lists. Zero caches nothing
    /// beyond the state currently being built.
    pub limit: usize,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self::from_config(&FstConfig::default())
    }
}

impl CacheOptions {
    pub fn from_config(config: &FstConfig) -> Self {
        Self {
            gc: config.default_cache_gc,
            limit: config.default_cache_gc_limit,
        }
    }
}

const HAS_FINAL: u8 = 0x1;
const HAS_TRANSITIONS: u8 = 0x2;

#[derive(Debug, Clone)]
struct CacheState<W: Weight> {
    final_weight: W,
    transitions: Vec<Transition<W>>,
    flags: u8,
    ref_count: usize,
    niepsilons: usize,
    noepsilons: usize,
}

impl<W: Weight> CacheState<W> {
    fn new() -> Self {
        Self {
            final_weight: W::zero(),
            transitions: Vec::new(),
            flags: 0,
            ref_count: 0,
            niepsilons: 0,
            noepsilons: 0,
        }
    }
}

/// Lazy per-state storage. Single-threaded; populate each state with
/// `push_transition` calls closed by `set_transitions`, after which the
/// counts are O(1).
///
/// When the byte budget is exceeded, completed states are evicted whole in
/// insertion order, skipping pinned states (those under a live iterator).
/// An evicted state may be expanded again.
#[derive(Debug, Clone)]
pub struct StateCache<W: Weight> {
    states: Vec<Option<Box<CacheState<W>>>>,
    /// Completed states, oldest first.
    queue: VecDeque<StateId>,
    start: StateId,
    has_start: bool,
    cache_size: usize,
    opts: CacheOptions,
}

impl<W: Weight> StateCache<W> {
    pub fn new(opts: CacheOptions) -> Self {
        Self {
            states: Vec::new(),
            queue: VecDeque::new(),
            start: NO_STATE_ID,
            has_start: false,
            cache_size: 0,
            opts,
        }
    }

    pub fn options(&self) -> &CacheOptions {
        &self.opts
    }

    /// Bytes of resident transition lists.
    pub fn resident_bytes(&self) -> usize {
        self.cache_size
    }

    pub fn has_start(&self) -> bool {
        self.has_start
    }

    pub fn set_start(&mut self, s: StateId) {
        self.start = s;
        self.has_start = true;
    }

    pub fn start(&self) -> StateId {
        self.start
    }

    fn state(&self, s: StateId) -> Option<&CacheState<W>> {
        self.states.get(s as usize)?.as_deref()
    }

    fn entry(&mut self, s: StateId) -> &mut CacheState<W> {
        let i = s as usize;
        if i >= self.states.len() {
            self.states.resize_with(i + 1, || None);
        }
        self.states[i]
            .get_or_insert_with(|| Box::new(CacheState::new()))
            .as_mut()
    }

    pub fn has_final(&self, s: StateId) -> bool {
        self.state(s).is_some_and(|st| st.flags & HAS_FINAL != 0)
    }

    pub fn set_final(&mut self, s: StateId, weight: W) {
        let st = self.entry(s);
        st.final_weight = weight;
        st.flags |= HAS_FINAL;
    }

    pub fn final_weight(&self, s: StateId) -> Option<&W> {
        self.state(s)
            .filter(|st| st.flags & HAS_FINAL != 0)
            .map(|st| &st.final_weight)
    }

    pub fn has_transitions(&self, s: StateId) -> bool {
        self.state(s)
            .is_some_and(|st| st.flags & HAS_TRANSITIONS != 0)
    }

    /// Append one transition to a state still being expanded. Calling this
    /// after `set_transitions` on the same state is a contract violation.
    pub fn push_transition(&mut self, s: StateId, tr: Transition<W>) {
        let st = self.entry(s);
        assert!(
            st.flags & HAS_TRANSITIONS == 0,
            "push_transition after set_transitions on state {s}"
        );
        st.transitions.push(tr);
    }

    /// Close a state's transition list; counts become O(1) and the state
    /// enters the eviction queue.
    pub fn set_transitions(&mut self, s: StateId) {
        let bytes;
        {
            let st = self.entry(s);
            st.flags |= HAS_TRANSITIONS;
            st.niepsilons = st
                .transitions
                .iter()
                .filter(|tr| tr.ilabel == EPSILON)
                .count();
            st.noepsilons = st
                .transitions
                .iter()
                .filter(|tr| tr.olabel == EPSILON)
                .count();
            bytes = st.transitions.len() * size_of::<Transition<W>>();
        }
        self.cache_size += bytes;
        self.queue.push_back(s);
        if self.opts.gc && self.cache_size > self.opts.limit {
            self.gc(s);
        }
    }

    /// Transitions of a completed state; empty when absent or incomplete.
    pub fn transitions(&self, s: StateId) -> &[Transition<W>] {
        match self.state(s) {
            Some(st) if st.flags & HAS_TRANSITIONS != 0 => &st.transitions,
            _ => &[],
        }
    }

    pub fn num_transitions(&self, s: StateId) -> Option<usize> {
        self.state(s)
            .filter(|st| st.flags & HAS_TRANSITIONS != 0)
            .map(|st| st.transitions.len())
    }

    pub fn num_input_epsilons(&self, s: StateId) -> Option<usize> {
        self.state(s)
            .filter(|st| st.flags & HAS_TRANSITIONS != 0)
            .map(|st| st.niepsilons)
    }

    pub fn num_output_epsilons(&self, s: StateId) -> Option<usize> {
        self.state(s)
            .filter(|st| st.flags & HAS_TRANSITIONS != 0)
            .map(|st| st.noepsilons)
    }

    /// Protect a state from eviction while an iterator is live over it.
    pub fn pin(&mut self, s: StateId) {
        self.entry(s).ref_count += 1;
    }

    pub fn unpin(&mut self, s: StateId) {
        let st = self.entry(s);
        debug_assert!(st.ref_count > 0, "unpin without pin on state {s}");
        st.ref_count = st.ref_count.saturating_sub(1);
    }

    /// Evict completed, unpinned states oldest-first until the budget is
    /// met. `current` (the state just built) is spared this round so its
    /// counts stay readable.
    fn gc(&mut self, current: StateId) {
        let mut kept: Vec<StateId> = Vec::new();
        while self.cache_size > self.opts.limit {
            let Some(s) = self.queue.pop_front() else {
                break;
            };
            let pinned = self
                .state(s)
                .is_some_and(|st| st.ref_count > 0);
            if pinned || s == current {
                kept.push(s);
                continue;
            }
            if let Some(st) = self.states[s as usize].take() {
                self.cache_size -= st.transitions.len() * size_of::<Transition<W>>();
            }
        }
        for s in kept.into_iter().rev() {
            self.queue.push_front(s);
        }
    }
}
