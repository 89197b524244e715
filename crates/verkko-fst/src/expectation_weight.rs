// Expectation semiring over (probability, value) pairs, after Eisner (2002).
//
// Plus is component-wise; times multiplexes:
//   (a1, b1) * (a2, b2) = (a1 * a2, a1 * b2 + a2 * b1)
// so that shortest distance accumulates a posterior alongside its expectation.

use std::fmt;
use std::io;
use std::str::FromStr;

use crate::io::ByteReader;
use crate::pair_weight::{PairAdder, PairWeight};
use crate::weight::{Adder, COMMUTATIVE, DivideType, IDEMPOTENT, SEMIRING, Weight};
use crate::{FstError, Result};

/// The expectation semiring: a [`PairWeight`] with the multiplexed product.
///
/// W1 is usually a probability-like weight (e.g. the log semiring); W2 the
/// random variable being averaged. Division is undefined and returns
/// `no_weight`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectationWeight<W1: Weight, W2: Weight> {
    pair: PairWeight<W1, W2>,
}

impl<W1: Weight, W2: Weight> ExpectationWeight<W1, W2> {
    pub fn new(value1: W1, value2: W2) -> Self {
        Self {
            pair: PairWeight::new(value1, value2),
        }
    }

    pub fn value1(&self) -> &W1 {
        self.pair.value1()
    }

    pub fn value2(&self) -> &W2 {
        self.pair.value2()
    }
}

impl<W1: Weight, W2: Weight> fmt::Display for ExpectationWeight<W1, W2> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.pair.write_text(f, ',', None)
    }
}

impl<W: Weight> FromStr for ExpectationWeight<W, W> {
    type Err = FstError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_text(s, ',', None)
    }
}

// The cross terms in `times` (a1 * b2, a2 * b1) require W1 and W2 to be the
// same weight type, so the semiring itself is only implemented for that case.
impl<W: Weight> Weight for ExpectationWeight<W, W> {
    type Reverse = ExpectationWeight<W::Reverse, W::Reverse>;
    type Adder = ExpectationAdder<W, W>;

    fn zero() -> Self {
        Self::new(W::zero(), W::zero())
    }

    /// The times identity is (one, zero): multiplying by it leaves both the
    /// probability and the expectation untouched.
    fn one() -> Self {
        Self::new(W::one(), W::zero())
    }

    fn no_weight() -> Self {
        Self::new(W::no_weight(), W::no_weight())
    }

    fn plus(&self, rhs: &Self) -> Self {
        Self {
            pair: self.pair.plus(&rhs.pair),
        }
    }

    fn times(&self, rhs: &Self) -> Self {
        let (a1, b1) = (self.value1(), self.value2());
        let (a2, b2) = (rhs.value1(), rhs.value2());
        Self::new(a1.times(a2), a1.times(b2).plus(&a2.times(b1)))
    }

    fn divide(&self, _rhs: &Self, _divide_type: DivideType) -> Self {
        Self::no_weight()
    }

    fn reverse(&self) -> Self::Reverse {
        ExpectationWeight {
            pair: self.pair.reverse(),
        }
    }

    fn quantize(&self, delta: f32) -> Self {
        Self {
            pair: self.pair.quantize(delta),
        }
    }

    fn member(&self) -> bool {
        self.pair.member()
    }

    fn approx_eq(&self, rhs: &Self, delta: f32) -> bool {
        self.pair.approx_eq(&rhs.pair, delta)
    }

    fn properties() -> u64 {
        W::properties() & W::properties() & (SEMIRING | COMMUTATIVE | IDEMPOTENT)
    }

    fn weight_type() -> String {
        format!("expectation_{}_{}", W::weight_type(), W::weight_type())
    }

    fn write_binary<Wr: io::Write>(&self, w: &mut Wr) -> io::Result<()> {
        self.pair.write_binary(w)
    }

    fn read_binary(r: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self {
            pair: PairWeight::read_binary(r)?,
        })
    }

    fn write_text<S: fmt::Write>(
        &self,
        out: &mut S,
        separator: char,
        parentheses: Option<(char, char)>,
    ) -> fmt::Result {
        self.pair.write_text(out, separator, parentheses)
    }

    fn parse_text(s: &str, separator: char, parentheses: Option<(char, char)>) -> Result<Self> {
        Ok(Self {
            pair: PairWeight::parse_text(s, separator, parentheses)?,
        })
    }
}

/// Component-wise accumulator; valid because expectation plus is
/// component-wise.
#[derive(Debug, Clone)]
pub struct ExpectationAdder<W1: Weight, W2: Weight> {
    inner: PairAdder<W1, W2>,
}

impl<W1: Weight, W2: Weight> Default for ExpectationAdder<W1, W2> {
    fn default() -> Self {
        Self {
            inner: PairAdder::default(),
        }
    }
}

impl<W: Weight> Adder for ExpectationAdder<W, W> {
    type Weight = ExpectationWeight<W, W>;

    fn add(&mut self, w: &Self::Weight) {
        self.inner.add(&w.pair);
    }

    fn sum(&self) -> Self::Weight {
        let pair = self.inner.sum();
        ExpectationWeight::new(pair.value1().clone(), pair.value2().clone())
    }

    fn reset(&mut self, w: Self::Weight) {
        self.inner.reset(w.pair);
    }
}
