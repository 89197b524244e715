// Fixed-length tuple of one semiring with component-wise operations.

use std::array;
use std::fmt;
use std::io;
use std::str::FromStr;

use crate::io::ByteReader;
use crate::weight::{
    Adder, COMMUTATIVE, CompositeWeightReader, CompositeWeightWriter, DivideType, IDEMPOTENT,
    SEMIRING, Weight,
};
use crate::{FstError, Result};

/// An `N`-tuple over one semiring; the n-th Cartesian power.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerWeight<W: Weight, const N: usize> {
    values: [W; N],
}

impl<W: Weight, const N: usize> PowerWeight<W, N> {
    pub fn new(values: [W; N]) -> Self {
        Self { values }
    }

    pub fn value(&self, i: usize) -> &W {
        &self.values[i]
    }

    pub fn values(&self) -> &[W; N] {
        &self.values
    }

    fn map2(&self, rhs: &Self, f: impl Fn(&W, &W) -> W) -> Self {
        Self {
            values: array::from_fn(|i| f(&self.values[i], &rhs.values[i])),
        }
    }
}

impl<W: Weight, const N: usize> fmt::Display for PowerWeight<W, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_text(f, ',', None)
    }
}

impl<W: Weight, const N: usize> FromStr for PowerWeight<W, N> {
    type Err = FstError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_text(s, ',', None)
    }
}

impl<W: Weight, const N: usize> Weight for PowerWeight<W, N> {
    type Reverse = PowerWeight<W::Reverse, N>;
    type Adder = PowerAdder<W, N>;

    fn zero() -> Self {
        Self {
            values: array::from_fn(|_| W::zero()),
        }
    }

    fn one() -> Self {
        Self {
            values: array::from_fn(|_| W::one()),
        }
    }

    fn no_weight() -> Self {
        Self {
            values: array::from_fn(|_| W::no_weight()),
        }
    }

    fn plus(&self, rhs: &Self) -> Self {
        self.map2(rhs, |a, b| a.plus(b))
    }

    fn times(&self, rhs: &Self) -> Self {
        self.map2(rhs, |a, b| a.times(b))
    }

    fn divide(&self, rhs: &Self, divide_type: DivideType) -> Self {
        self.map2(rhs, |a, b| a.divide(b, divide_type))
    }

    fn reverse(&self) -> Self::Reverse {
        PowerWeight {
            values: array::from_fn(|i| self.values[i].reverse()),
        }
    }

    fn quantize(&self, delta: f32) -> Self {
        Self {
            values: array::from_fn(|i| self.values[i].quantize(delta)),
        }
    }

    fn member(&self) -> bool {
        self.values.iter().all(W::member)
    }

    fn approx_eq(&self, rhs: &Self, delta: f32) -> bool {
        self.values
            .iter()
            .zip(&rhs.values)
            .all(|(a, b)| a.approx_eq(b, delta))
    }

    fn properties() -> u64 {
        W::properties() & (SEMIRING | COMMUTATIVE | IDEMPOTENT)
    }

    fn weight_type() -> String {
        format!("{}_^{}", W::weight_type(), N)
    }

    fn write_binary<Wr: io::Write>(&self, w: &mut Wr) -> io::Result<()> {
        for v in &self.values {
            v.write_binary(w)?;
        }
        Ok(())
    }

    fn read_binary(r: &mut ByteReader<'_>) -> Result<Self> {
        let mut values = Vec::with_capacity(N);
        for _ in 0..N {
            values.push(W::read_binary(r)?);
        }
        match values.try_into() {
            Ok(values) => Ok(Self { values }),
            Err(_) => unreachable!(),
        }
    }

    fn write_text<S: fmt::Write>(
        &self,
        out: &mut S,
        separator: char,
        parentheses: Option<(char, char)>,
    ) -> fmt::Result {
        let mut writer = CompositeWeightWriter::new(out, separator, parentheses);
        writer.write_begin()?;
        for v in &self.values {
            writer.write_element(v)?;
        }
        writer.write_end()
    }

    fn parse_text(s: &str, separator: char, parentheses: Option<(char, char)>) -> Result<Self> {
        let mut reader = CompositeWeightReader::new(s, separator, parentheses);
        reader.read_begin()?;
        let mut values = Vec::with_capacity(N);
        for i in 0..N {
            let part = reader.read_element(i + 1 == N)?;
            values.push(W::parse_text(&part, separator, parentheses)?);
        }
        reader.read_end()?;
        match values.try_into() {
            Ok(values) => Ok(Self { values }),
            Err(_) => unreachable!(),
        }
    }
}

/// Component-wise accumulator over the tuple.
#[derive(Debug, Clone)]
pub struct PowerAdder<W: Weight, const N: usize> {
    adders: [W::Adder; N],
}

impl<W: Weight, const N: usize> Default for PowerAdder<W, N> {
    fn default() -> Self {
        Self {
            adders: array::from_fn(|_| W::Adder::default()),
        }
    }
}

impl<W: Weight, const N: usize> Adder for PowerAdder<W, N> {
    type Weight = PowerWeight<W, N>;

    fn add(&mut self, w: &Self::Weight) {
        for (adder, v) in self.adders.iter_mut().zip(w.values()) {
            adder.add(v);
        }
    }

    fn sum(&self) -> Self::Weight {
        PowerWeight::new(array::from_fn(|i| self.adders[i].sum()))
    }

    fn reset(&mut self, w: Self::Weight) {
        for (adder, v) in self.adders.iter_mut().zip(w.values) {
            adder.reset(v);
        }
    }
}
