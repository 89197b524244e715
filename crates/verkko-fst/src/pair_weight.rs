// Cartesian product of two semirings with component-wise operations.

use std::fmt;
use std::io;
use std::str::FromStr;

use crate::io::ByteReader;
use crate::weight::{
    Adder, COMMUTATIVE, CompositeWeightReader, CompositeWeightWriter, DivideType, IDEMPOTENT,
    SEMIRING, Weight,
};
use crate::{FstError, Result};

/// A pair of weights forming the product semiring: plus, times and divide
/// apply component-wise, zero is (zero, zero) and one is (one, one).
#[derive(Debug, Clone, PartialEq)]
pub struct PairWeight<W1: Weight, W2: Weight> {
    value1: W1,
    value2: W2,
}

impl<W1: Weight, W2: Weight> PairWeight<W1, W2> {
    pub fn new(value1: W1, value2: W2) -> Self {
        Self { value1, value2 }
    }

    pub fn value1(&self) -> &W1 {
        &self.value1
    }

    pub fn value2(&self) -> &W2 {
        &self.value2
    }
}

impl<W1: Weight, W2: Weight> fmt::Display for PairWeight<W1, W2> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_text(f, ',', None)
    }
}

impl<W1: Weight, W2: Weight> FromStr for PairWeight<W1, W2> {
    type Err = FstError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_text(s, ',', None)
    }
}

impl<W1: Weight, W2: Weight> Weight for PairWeight<W1, W2> {
    type Reverse = PairWeight<W1::Reverse, W2::Reverse>;
    type Adder = PairAdder<W1, W2>;

    fn zero() -> Self {
        Self::new(W1::zero(), W2::zero())
    }

    fn one() -> Self {
        Self::new(W1::one(), W2::one())
    }

    fn no_weight() -> Self {
        Self::new(W1::no_weight(), W2::no_weight())
    }

    fn plus(&self, rhs: &Self) -> Self {
        Self::new(
            self.value1.plus(&rhs.value1),
            self.value2.plus(&rhs.value2),
        )
    }

    fn times(&self, rhs: &Self) -> Self {
        Self::new(
            self.value1.times(&rhs.value1),
            self.value2.times(&rhs.value2),
        )
    }

    fn divide(&self, rhs: &Self, divide_type: DivideType) -> Self {
        Self::new(
            self.value1.divide(&rhs.value1, divide_type),
            self.value2.divide(&rhs.value2, divide_type),
        )
    }

    fn reverse(&self) -> Self::Reverse {
        PairWeight::new(self.value1.reverse(), self.value2.reverse())
    }

    fn quantize(&self, delta: f32) -> Self {
        Self::new(self.value1.quantize(delta), self.value2.quantize(delta))
    }

    fn member(&self) -> bool {
        self.value1.member() && self.value2.member()
    }

    fn approx_eq(&self, rhs: &Self, delta: f32) -> bool {
        self.value1.approx_eq(&rhs.value1, delta) && self.value2.approx_eq(&rhs.value2, delta)
    }

    fn properties() -> u64 {
        W1::properties() & W2::properties() & (SEMIRING | COMMUTATIVE | IDEMPOTENT)
    }

    fn weight_type() -> String {
        format!("pair_{}_{}", W1::weight_type(), W2::weight_type())
    }

    fn write_binary<W: io::Write>(&self, w: &mut W) -> io::Result<()> {
        self.value1.write_binary(w)?;
        self.value2.write_binary(w)
    }

    fn read_binary(r: &mut ByteReader<'_>) -> Result<Self> {
        let value1 = W1::read_binary(r)?;
        let value2 = W2::read_binary(r)?;
        Ok(Self::new(value1, value2))
    }

    fn write_text<S: fmt::Write>(
        &self,
        out: &mut S,
        separator: char,
        parentheses: Option<(char, char)>,
    ) -> fmt::Result {
        let mut writer = CompositeWeightWriter::new(out, separator, parentheses);
        writer.write_begin()?;
        writer.write_element(&self.value1)?;
        writer.write_element(&self.value2)?;
        writer.write_end()
    }

    fn parse_text(s: &str, separator: char, parentheses: Option<(char, char)>) -> Result<Self> {
        let mut reader = CompositeWeightReader::new(s, separator, parentheses);
        reader.read_begin()?;
        let first = reader.read_element(false)?;
        let value1 = W1::parse_text(&first, separator, parentheses)?;
        let second = reader.read_element(true)?;
        let value2 = W2::parse_text(&second, separator, parentheses)?;
        reader.read_end()?;
        Ok(Self::new(value1, value2))
    }
}

/// Component-wise accumulator for pair-shaped weights.
#[derive(Debug, Clone)]
pub struct PairAdder<W1: Weight, W2: Weight> {
    adder1: W1::Adder,
    adder2: W2::Adder,
}

impl<W1: Weight, W2: Weight> Default for PairAdder<W1, W2> {
    fn default() -> Self {
        Self {
            adder1: W1::Adder::default(),
            adder2: W2::Adder::default(),
        }
    }
}

impl<W1: Weight, W2: Weight> Adder for PairAdder<W1, W2> {
    type Weight = PairWeight<W1, W2>;

    fn add(&mut self, w: &Self::Weight) {
        self.adder1.add(&w.value1);
        self.adder2.add(&w.value2);
    }

    fn sum(&self) -> Self::Weight {
        PairWeight::new(self.adder1.sum(), self.adder2.sum())
    }

    fn reset(&mut self, w: Self::Weight) {
        self.adder1.reset(w.value1);
        self.adder2.reset(w.value2);
    }
}
