// Signed log semiring: log-domain magnitudes extended with a sign, so sums
// may cancel. The sign rides in a tropical component (+1 positive, -1
// negative); the magnitude is a log weight.

use std::fmt;
use std::io;
use std::str::FromStr;

use crate::float_weight::{LogWeight, TropicalWeight};
use crate::io::ByteReader;
use crate::weight::{
    COMMUTATIVE, CompositeWeightReader, CompositeWeightWriter, DivideType, SEMIRING, SimpleAdder,
    Weight,
};
use crate::{FstError, Result};

/// A signed value in the log semiring.
///
/// Both signs of the zero magnitude denote the semiring zero and compare
/// equal.
#[derive(Debug, Clone)]
pub struct SignedLogWeight {
    sign: TropicalWeight,
    magnitude: LogWeight,
}

impl SignedLogWeight {
    pub fn new(sign: TropicalWeight, magnitude: LogWeight) -> Self {
        Self { sign, magnitude }
    }

    /// Build from a sign flag and a -log magnitude.
    pub fn from_parts(positive: bool, magnitude: f32) -> Self {
        Self {
            sign: TropicalWeight::new(if positive { 1.0 } else { -1.0 }),
            magnitude: LogWeight::new(magnitude),
        }
    }

    pub fn sign(&self) -> &TropicalWeight {
        &self.sign
    }

    pub fn magnitude(&self) -> &LogWeight {
        &self.magnitude
    }

    pub fn is_positive(&self) -> bool {
        self.sign.value() > 0.0
    }

    fn is_zero_magnitude(&self) -> bool {
        self.magnitude.value() == f32::INFINITY
    }
}

impl PartialEq for SignedLogWeight {
    fn eq(&self, rhs: &Self) -> bool {
        if self.is_zero_magnitude() && rhs.is_zero_magnitude() {
            return true;
        }
        self.is_positive() == rhs.is_positive() && self.magnitude == rhs.magnitude
    }
}

impl fmt::Display for SignedLogWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_text(f, ',', None)
    }
}

impl FromStr for SignedLogWeight {
    type Err = FstError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_text(s, ',', None)
    }
}

impl Weight for SignedLogWeight {
    type Reverse = SignedLogWeight;
    type Adder = SimpleAdder<SignedLogWeight>;

    fn zero() -> Self {
        Self::from_parts(true, f32::INFINITY)
    }

    fn one() -> Self {
        Self::from_parts(true, 0.0)
    }

    fn no_weight() -> Self {
        Self::new(TropicalWeight::no_weight(), LogWeight::no_weight())
    }

    fn plus(&self, rhs: &Self) -> Self {
        if !self.member() || !rhs.member() {
            return Self::no_weight();
        }
        let f1 = self.magnitude.value() as f64;
        let f2 = rhs.magnitude.value() as f64;
        if f1 == f64::INFINITY {
            return rhs.clone();
        }
        if f2 == f64::INFINITY {
            return self.clone();
        }
        let same_sign = self.is_positive() == rhs.is_positive();
        if same_sign {
            let mag = if f1 > f2 {
                f2 - (f1 - f2).neg_exp_ln_1p()
            } else {
                f1 - (f2 - f1).neg_exp_ln_1p()
            };
            Self::from_parts(self.is_positive(), mag as f32)
        } else if f1 == f2 {
            Self::zero()
        } else if f1 < f2 {
            // Our magnitude dominates; the result keeps our sign.
            let mag = f1 - (-((f1 - f2).exp())).ln_1p();
            Self::from_parts(self.is_positive(), mag as f32)
        } else {
            let mag = f2 - (-((f2 - f1).exp())).ln_1p();
            Self::from_parts(rhs.is_positive(), mag as f32)
        }
    }

    fn times(&self, rhs: &Self) -> Self {
        if !self.member() || !rhs.member() {
            return Self::no_weight();
        }
        let positive = self.is_positive() == rhs.is_positive();
        let mag = self.magnitude.times(&rhs.magnitude);
        Self::new(
            TropicalWeight::new(if positive { 1.0 } else { -1.0 }),
            mag,
        )
    }

    fn divide(&self, rhs: &Self, divide_type: DivideType) -> Self {
        if !self.member() || !rhs.member() {
            return Self::no_weight();
        }
        let positive = self.is_positive() == rhs.is_positive();
        let mag = self.magnitude.divide(&rhs.magnitude, divide_type);
        if !mag.member() {
            return Self::no_weight();
        }
        Self::new(
            TropicalWeight::new(if positive { 1.0 } else { -1.0 }),
            mag,
        )
    }

    fn reverse(&self) -> Self {
        self.clone()
    }

    fn quantize(&self, delta: f32) -> Self {
        Self::from_parts(self.is_positive(), self.magnitude.quantize(delta).value())
    }

    fn member(&self) -> bool {
        self.sign.member() && self.magnitude.member()
    }

    fn approx_eq(&self, rhs: &Self, delta: f32) -> bool {
        if !self.member() || !rhs.member() {
            return false;
        }
        if self.is_zero_magnitude() && rhs.is_zero_magnitude() {
            return true;
        }
        self.is_positive() == rhs.is_positive() && self.magnitude.approx_eq(&rhs.magnitude, delta)
    }

    fn properties() -> u64 {
        SEMIRING | COMMUTATIVE
    }

    fn weight_type() -> String {
        "signed_log".to_string()
    }

    fn write_binary<W: io::Write>(&self, w: &mut W) -> io::Result<()> {
        self.sign.write_binary(w)?;
        self.magnitude.write_binary(w)
    }

    fn read_binary(r: &mut ByteReader<'_>) -> Result<Self> {
        let sign = TropicalWeight::read_binary(r)?;
        let magnitude = LogWeight::read_binary(r)?;
        Ok(Self::new(sign, magnitude))
    }

    fn write_text<S: fmt::Write>(
        &self,
        out: &mut S,
        separator: char,
        parentheses: Option<(char, char)>,
    ) -> fmt::Result {
        let mut writer = CompositeWeightWriter::new(out, separator, parentheses);
        writer.write_begin()?;
        writer.write_element(&self.sign)?;
        writer.write_element(&self.magnitude)?;
        writer.write_end()
    }

    fn parse_text(s: &str, separator: char, parentheses: Option<(char, char)>) -> Result<Self> {
        let mut reader = CompositeWeightReader::new(s, separator, parentheses);
        reader.read_begin()?;
        let sign = TropicalWeight::parse_text(&reader.read_element(false)?, separator, parentheses)?;
        let magnitude =
            LogWeight::parse_text(&reader.read_element(true)?, separator, parentheses)?;
        reader.read_end()?;
        Ok(Self::new(sign, magnitude))
    }
}

/// Helper trait so magnitude formulas read like their derivations.
trait LogArith {
    /// log1p(exp(-self)); requires self >= 0.
    fn neg_exp_ln_1p(self) -> f64;
}

impl LogArith for f64 {
    fn neg_exp_ln_1p(self) -> f64 {
        (-self).exp().ln_1p()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weight::DELTA;

    fn linear(w: &SignedLogWeight) -> f64 {
        if !w.member() {
            return f64::NAN;
        }
        let mag = (-(w.magnitude().value() as f64)).exp();
        if w.is_positive() { mag } else { -mag }
    }

    fn from_linear(v: f64) -> SignedLogWeight {
        SignedLogWeight::from_parts(v >= 0.0, (-(v.abs().ln())) as f32)
    }

    #[test]
    fn identities() {
        let a = SignedLogWeight::from_parts(false, 1.0);
        assert_eq!(a.plus(&SignedLogWeight::zero()), a);
        assert_eq!(SignedLogWeight::zero().plus(&a), a);
        assert!(a.times(&SignedLogWeight::one()).approx_eq(&a, DELTA));
        assert_eq!(a.times(&SignedLogWeight::zero()), SignedLogWeight::zero());
    }

    #[test]
    fn both_zero_signs_are_equal() {
        let pos_zero = SignedLogWeight::from_parts(true, f32::INFINITY);
        let neg_zero = SignedLogWeight::from_parts(false, f32::INFINITY);
        assert_eq!(pos_zero, neg_zero);
        assert!(pos_zero.approx_eq(&neg_zero, DELTA));
    }

    #[test]
    fn plus_tracks_linear_arithmetic() {
        for (x, y) in [(0.5, 0.25), (0.5, -0.25), (-0.5, 0.25), (-0.5, -0.25)] {
            let got = linear(&from_linear(x).plus(&from_linear(y)));
            assert!((got - (x + y)).abs() < 1e-5, "{x} + {y}: got {got}");
        }
    }

    #[test]
    fn opposite_signs_cancel_exactly() {
        let a = SignedLogWeight::from_parts(true, 2.0);
        let b = SignedLogWeight::from_parts(false, 2.0);
        assert_eq!(a.plus(&b), SignedLogWeight::zero());
    }

    #[test]
    fn times_multiplies_signs() {
        let a = from_linear(0.5);
        let b = from_linear(-0.25);
        assert!((linear(&a.times(&b)) - (-0.125)).abs() < 1e-6);
        assert!((linear(&b.times(&b)) - 0.0625).abs() < 1e-6);
    }

    #[test]
    fn divide_inverts_times() {
        let a = from_linear(-0.5);
        let b = from_linear(0.25);
        let q = a.times(&b).divide(&b, DivideType::Any);
        assert!(q.approx_eq(&a, DELTA));
    }

    #[test]
    fn text_and_binary_round_trip() {
        let a = SignedLogWeight::from_parts(false, 1.5);
        let back: SignedLogWeight = a.to_string().parse().unwrap();
        assert_eq!(back, a);

        let mut buf = Vec::new();
        a.write_binary(&mut buf).unwrap();
        let mut r = ByteReader::new(&buf);
        assert_eq!(SignedLogWeight::read_binary(&mut r).unwrap(), a);
    }
}
