// Semiring abstraction: the Weight trait, stable plus-accumulation, and the
// text form of composite weights.

use std::fmt;
use std::io;
use std::str::FromStr;

use crate::io::ByteReader;
use crate::{FstError, Result};

/// Default quantization and comparison tolerance.
pub const DELTA: f32 = 1.0 / 1024.0;

/// Semiring property: plus distributes over times from the left.
pub const LEFT_SEMIRING: u64 = 0x1;
/// Semiring property: plus distributes over times from the right.
pub const RIGHT_SEMIRING: u64 = 0x2;
/// Both a left and a right semiring.
pub const SEMIRING: u64 = LEFT_SEMIRING | RIGHT_SEMIRING;
/// Times is commutative.
pub const COMMUTATIVE: u64 = 0x4;
/// Plus is idempotent: a + a = a.
pub const IDEMPOTENT: u64 = 0x8;
/// Path property: a + b is always a or b.
pub const PATH: u64 = 0x10;

/// Which side a division cancels from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DivideType {
    /// Left division: find z such that x * z = y.
    Left,
    /// Right division: find z such that z * x = y.
    Right,
    /// Either; only valid in commutative semirings.
    Any,
}

/// A value in a semiring.
///
/// Implementations are immutable value types. A weight that fails
/// [`member`](Weight::member) is the `no_weight` sentinel: the result of an
/// out-of-domain operation, which callers lift to the sticky error property
/// of the FST holding it.
///
/// Binary serialization covers the raw payload only; the type tag travels in
/// the FST header. Text serialization goes through the composite
/// writer/reader so nested composite weights print and parse unambiguously.
pub trait Weight:
    Clone + fmt::Debug + fmt::Display + FromStr<Err = FstError> + PartialEq + Sized + 'static
{
    /// The weight type obtained by reversal; reversing twice returns `Self`.
    type Reverse: Weight<Reverse = Self>;
    /// Accumulator for numerically stable plus-folds.
    type Adder: Adder<Weight = Self> + fmt::Debug + Clone;

    /// The plus identity and times annihilator.
    fn zero() -> Self;
    /// The times identity.
    fn one() -> Self;
    /// The out-of-domain sentinel; never a member.
    fn no_weight() -> Self;

    fn plus(&self, rhs: &Self) -> Self;
    fn times(&self, rhs: &Self) -> Self;

    /// Division, where the semiring supports it; `no_weight` otherwise.
    fn divide(&self, rhs: &Self, divide_type: DivideType) -> Self;

    fn reverse(&self) -> Self::Reverse;

    /// Round onto a lattice of spacing `delta`. Idempotent.
    fn quantize(&self, delta: f32) -> Self;

    /// False for values outside the semiring's domain.
    fn member(&self) -> bool;

    fn approx_eq(&self, rhs: &Self, delta: f32) -> bool;

    /// Bitset over the semiring property constants in this module.
    fn properties() -> u64;

    /// Stable identifier, e.g. `tropical` or `expectation_log_log`.
    fn weight_type() -> String;

    /// Identifier of the transition type over this weight, stored in FST
    /// headers. The tropical semiring overrides this to `standard`.
    fn arc_type() -> String {
        Self::weight_type()
    }

    fn write_binary<W: io::Write>(&self, w: &mut W) -> io::Result<()>;

    fn read_binary(r: &mut ByteReader<'_>) -> Result<Self>;

    /// Write the text form. Scalars print their display form; composites
    /// override to emit separator-joined, optionally bracketed components.
    fn write_text<S: fmt::Write>(
        &self,
        out: &mut S,
        _separator: char,
        _parentheses: Option<(char, char)>,
    ) -> fmt::Result {
        write!(out, "{self}")
    }

    /// Parse the text form; the inverse of [`write_text`](Weight::write_text).
    fn parse_text(s: &str, _separator: char, _parentheses: Option<(char, char)>) -> Result<Self> {
        s.trim().parse()
    }
}

/// True when `a` is strictly better than `b` in the natural order of an
/// idempotent semiring: a + b = a and a != b.
pub fn natural_less<W: Weight>(a: &W, b: &W) -> bool {
    &a.plus(b) == a && a != b
}

/// Accumulator whose `sum` equals the plus-reduction of everything added,
/// up to quantization.
pub trait Adder: Default {
    type Weight: Weight;

    fn from_weight(w: Self::Weight) -> Self {
        let mut adder = Self::default();
        adder.reset(w);
        adder
    }

    fn add(&mut self, w: &Self::Weight);

    fn sum(&self) -> Self::Weight;

    /// Clear the accumulator to an initial value.
    fn reset(&mut self, w: Self::Weight);
}

/// Plain plus-fold accumulator; exact for idempotent semirings.
#[derive(Debug, Clone)]
pub struct SimpleAdder<W: Weight> {
    sum: W,
}

impl<W: Weight> Default for SimpleAdder<W> {
    fn default() -> Self {
        Self { sum: W::zero() }
    }
}

impl<W: Weight> Adder for SimpleAdder<W> {
    type Weight = W;

    fn add(&mut self, w: &W) {
        self.sum = self.sum.plus(w);
    }

    fn sum(&self) -> W {
        self.sum.clone()
    }

    fn reset(&mut self, w: W) {
        self.sum = w;
    }
}

/// Writes the components of one composite level, separator-joined and
/// optionally bracketed. Nested composites create their own writer over the
/// same sink, raising bracket depth by one per level.
pub struct CompositeWeightWriter<'a, S: fmt::Write> {
    out: &'a mut S,
    separator: char,
    parentheses: Option<(char, char)>,
    i: usize,
}

impl<'a, S: fmt::Write> CompositeWeightWriter<'a, S> {
    pub fn new(out: &'a mut S, separator: char, parentheses: Option<(char, char)>) -> Self {
        Self {
            out,
            separator,
            parentheses,
            i: 0,
        }
    }

    pub fn write_begin(&mut self) -> fmt::Result {
        if let Some((open, _)) = self.parentheses {
            self.out.write_char(open)?;
        }
        Ok(())
    }

    /// Write one component, preceded by the separator after the first.
    pub fn write_element<W: Weight>(&mut self, w: &W) -> fmt::Result {
        if self.i > 0 {
            self.out.write_char(self.separator)?;
        }
        self.i += 1;
        w.write_text(&mut *self.out, self.separator, self.parentheses)
    }

    pub fn write_end(&mut self) -> fmt::Result {
        if let Some((_, close)) = self.parentheses {
            self.out.write_char(close)?;
        }
        Ok(())
    }
}

/// Reads the components of one composite level.
///
/// `read_begin` skips leading whitespace and, when brackets are configured,
/// requires the open bracket. Each `read_element` returns the
/// separator-bounded slice for one component (inner brackets are matched, so
/// a nested composite arrives whole). `read_end` requires end of input,
/// whitespace, or the already-consumed close bracket.
pub struct CompositeWeightReader {
    chars: Vec<char>,
    pos: usize,
    current: Option<char>,
    separator: char,
    parentheses: Option<(char, char)>,
    depth: usize,
}

impl CompositeWeightReader {
    pub fn new(input: &str, separator: char, parentheses: Option<(char, char)>) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            current: None,
            separator,
            parentheses,
            depth: 0,
        }
    }

    fn advance(&mut self) {
        self.current = self.chars.get(self.pos).copied();
        self.pos += 1;
    }

    pub fn read_begin(&mut self) -> Result<()> {
        self.advance();
        while matches!(self.current, Some(c) if c.is_whitespace()) {
            self.advance();
        }
        if let Some((open, _)) = self.parentheses {
            if self.current != Some(open) {
                return Err(FstError::BadWeightText(format!(
                    "expected open parenthesis '{open}'"
                )));
            }
            self.depth += 1;
            self.advance();
        }
        Ok(())
    }

    /// Collect one component. `last` lets the final component absorb the
    /// separator character (needed when it can occur inside scalar text).
    pub fn read_element(&mut self, last: bool) -> Result<String> {
        let (open, close) = match self.parentheses {
            Some((o, c)) => (Some(o), Some(c)),
            None => (None, None),
        };
        let mut s = String::new();
        while let Some(c) = self.current {
            if c.is_whitespace() {
                break;
            }
            if c == self.separator && self.depth <= 1 && !last {
                break;
            }
            if Some(c) == close && self.depth == 1 {
                break;
            }
            s.push(c);
            if Some(c) == open {
                self.depth += 1;
            } else if Some(c) == close {
                if self.depth == 0 {
                    return Err(FstError::BadWeightText(
                        "unmatched close parenthesis".to_string(),
                    ));
                }
                self.depth -= 1;
            }
            self.advance();
        }
        if s.is_empty() {
            return Err(FstError::BadWeightText("empty component".to_string()));
        }
        // Skip the separator or close parenthesis the loop stopped on.
        if matches!(self.current, Some(c) if !c.is_whitespace()) {
            self.advance();
        }
        Ok(s)
    }

    pub fn read_end(&mut self) -> Result<()> {
        match self.current {
            None => Ok(()),
            Some(c) if c.is_whitespace() => Ok(()),
            Some(c) => Err(FstError::BadWeightText(format!("excess character '{c}'"))),
        }
    }
}
