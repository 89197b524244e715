// Lexicographic semiring over two path-property components: plus picks the
// pair that wins on the first component's natural order, breaking ties on
// the second; times and divide are component-wise.

use std::fmt;
use std::io;
use std::str::FromStr;

use crate::io::ByteReader;
use crate::pair_weight::PairWeight;
use crate::weight::{
    COMMUTATIVE, DivideType, IDEMPOTENT, PATH, SEMIRING, SimpleAdder, Weight, natural_less,
};
use crate::{FstError, Result};

/// Lexicographic product of two semirings.
///
/// Both components must carry the path property; the natural order
/// (a + b = a and a != b) is what "wins" means below.
#[derive(Debug, Clone, PartialEq)]
pub struct LexicographicWeight<W1: Weight, W2: Weight> {
    pair: PairWeight<W1, W2>,
}

impl<W1: Weight, W2: Weight> LexicographicWeight<W1, W2> {
    pub fn new(value1: W1, value2: W2) -> Self {
        debug_assert!(
            W1::properties() & PATH != 0 && W2::properties() & PATH != 0,
            "lexicographic components must have the path property"
        );
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

impl<W1: Weight, W2: Weight> fmt::Display for LexicographicWeight<W1, W2> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.pair.write_text(f, ',', None)
    }
}

impl<W1: Weight, W2: Weight> FromStr for LexicographicWeight<W1, W2> {
    type Err = FstError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_text(s, ',', None)
    }
}

impl<W1: Weight, W2: Weight> Weight for LexicographicWeight<W1, W2> {
    type Reverse = LexicographicWeight<W1::Reverse, W2::Reverse>;
    type Adder = SimpleAdder<Self>;

    fn zero() -> Self {
        Self {
            pair: PairWeight::zero(),
        }
    }

    fn one() -> Self {
        Self {
            pair: PairWeight::one(),
        }
    }

    fn no_weight() -> Self {
        Self {
            pair: PairWeight::no_weight(),
        }
    }

    fn plus(&self, rhs: &Self) -> Self {
        if !self.member() || !rhs.member() {
            return Self::no_weight();
        }
        if natural_less(self.value1(), rhs.value1()) {
            return self.clone();
        }
        if natural_less(rhs.value1(), self.value1()) {
            return rhs.clone();
        }
        if natural_less(self.value2(), rhs.value2()) {
            return self.clone();
        }
        if natural_less(rhs.value2(), self.value2()) {
            return rhs.clone();
        }
        self.clone()
    }

    fn times(&self, rhs: &Self) -> Self {
        Self {
            pair: self.pair.times(&rhs.pair),
        }
    }

    fn divide(&self, rhs: &Self, divide_type: DivideType) -> Self {
        Self {
            pair: self.pair.divide(&rhs.pair, divide_type),
        }
    }

    fn reverse(&self) -> Self::Reverse {
        LexicographicWeight {
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
        W1::properties() & W2::properties() & (SEMIRING | COMMUTATIVE | IDEMPOTENT | PATH)
    }

    fn weight_type() -> String {
        format!("lexicographic_{}_{}", W1::weight_type(), W2::weight_type())
    }

    fn write_binary<W: io::Write>(&self, w: &mut W) -> io::Result<()> {
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
