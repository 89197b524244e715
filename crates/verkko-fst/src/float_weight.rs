// Scalar semirings over f32: tropical (min, +), log (-log sum, +) and
// min-max (min, max). All three are plain-old-data and serialize as their
// IEEE-754 bits, little-endian.

use std::fmt;
use std::io;
use std::str::FromStr;

use bytemuck::{Pod, Zeroable};

use crate::io::ByteReader;
use crate::weight::{
    Adder, COMMUTATIVE, DivideType, IDEMPOTENT, PATH, SEMIRING, SimpleAdder, Weight,
};
use crate::{FstError, Result};

fn parse_float(s: &str) -> Result<f32> {
    match s {
        "Infinity" => Ok(f32::INFINITY),
        "-Infinity" => Ok(f32::NEG_INFINITY),
        "BadNumber" => Ok(f32::NAN),
        _ => s
            .parse::<f32>()
            .map_err(|_| FstError::BadWeightText(format!("bad float '{s}'"))),
    }
}

fn format_float(f: &mut fmt::Formatter<'_>, v: f32) -> fmt::Result {
    if v == f32::INFINITY {
        write!(f, "Infinity")
    } else if v == f32::NEG_INFINITY {
        write!(f, "-Infinity")
    } else if v.is_nan() {
        write!(f, "BadNumber")
    } else {
        write!(f, "{v}")
    }
}

fn quantize_float(v: f32, delta: f32) -> f32 {
    if v == f32::INFINITY || v == f32::NEG_INFINITY || v.is_nan() {
        v
    } else {
        (v / delta + 0.5).floor() * delta
    }
}

fn approx_eq_float(v1: f32, v2: f32, delta: f32) -> bool {
    v1 <= v2 + delta && v2 <= v1 + delta
}

macro_rules! float_weight_common {
    ($name:ident) => {
        impl $name {
            pub const fn new(value: f32) -> Self {
                Self(value)
            }

            #[inline]
            pub const fn value(self) -> f32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                format_float(f, self.0)
            }
        }

        impl FromStr for $name {
            type Err = FstError;

            fn from_str(s: &str) -> Result<Self> {
                parse_float(s).map(Self)
            }
        }
    };
}

/// The tropical semiring: plus is min, times is float addition.
///
/// Zero is +inf, one is 0. Negative infinity is outside the domain.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Pod, Zeroable)]
pub struct TropicalWeight(f32);

float_weight_common!(TropicalWeight);

impl Weight for TropicalWeight {
    type Reverse = TropicalWeight;
    type Adder = SimpleAdder<TropicalWeight>;

    fn zero() -> Self {
        Self(f32::INFINITY)
    }

    fn one() -> Self {
        Self(0.0)
    }

    fn no_weight() -> Self {
        Self(f32::NAN)
    }

    fn plus(&self, rhs: &Self) -> Self {
        if !self.member() || !rhs.member() {
            return Self::no_weight();
        }
        if self.0 < rhs.0 { *self } else { *rhs }
    }

    fn times(&self, rhs: &Self) -> Self {
        if !self.member() || !rhs.member() {
            return Self::no_weight();
        }
        if self.0 == f32::INFINITY {
            *self
        } else if rhs.0 == f32::INFINITY {
            *rhs
        } else {
            Self(self.0 + rhs.0)
        }
    }

    fn divide(&self, rhs: &Self, _divide_type: DivideType) -> Self {
        if !self.member() || !rhs.member() || rhs.0 == f32::INFINITY {
            return Self::no_weight();
        }
        if self.0 == f32::INFINITY {
            *self
        } else {
            Self(self.0 - rhs.0)
        }
    }

    fn reverse(&self) -> Self {
        *self
    }

    fn quantize(&self, delta: f32) -> Self {
        Self(quantize_float(self.0, delta))
    }

    fn member(&self) -> bool {
        !self.0.is_nan() && self.0 != f32::NEG_INFINITY
    }

    fn approx_eq(&self, rhs: &Self, delta: f32) -> bool {
        approx_eq_float(self.0, rhs.0, delta)
    }

    fn properties() -> u64 {
        SEMIRING | COMMUTATIVE | IDEMPOTENT | PATH
    }

    fn weight_type() -> String {
        "tropical".to_string()
    }

    fn arc_type() -> String {
        "standard".to_string()
    }

    fn write_binary<W: io::Write>(&self, w: &mut W) -> io::Result<()> {
        crate::io::write_f32(w, self.0)
    }

    fn read_binary(r: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self(r.read_f32()?))
    }
}

/// log1p(exp(-x)) for x >= 0; the stable core of log-domain addition.
fn log_exp(x: f64) -> f64 {
    (-x).exp().ln_1p()
}

/// One compensated log-domain sum step; requires `a <= b`.
fn kahan_log_sum(a: f64, b: f64, c: &mut f64) -> f64 {
    let y = -log_exp(b - a) - *c;
    let t = a + y;
    *c = (t - a) - y;
    t
}

/// The log semiring: values are negated natural logs of probabilities,
/// plus is -log(e^-x + e^-y), times is float addition.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Pod, Zeroable)]
pub struct LogWeight(f32);

float_weight_common!(LogWeight);

impl Weight for LogWeight {
    type Reverse = LogWeight;
    type Adder = LogAdder;

    fn zero() -> Self {
        Self(f32::INFINITY)
    }

    fn one() -> Self {
        Self(0.0)
    }

    fn no_weight() -> Self {
        Self(f32::NAN)
    }

    fn plus(&self, rhs: &Self) -> Self {
        if !self.member() || !rhs.member() {
            return Self::no_weight();
        }
        let (f1, f2) = (self.0 as f64, rhs.0 as f64);
        if f1 == f64::INFINITY {
            *rhs
        } else if f2 == f64::INFINITY {
            *self
        } else if f1 > f2 {
            Self((f2 - log_exp(f1 - f2)) as f32)
        } else {
            Self((f1 - log_exp(f2 - f1)) as f32)
        }
    }

    fn times(&self, rhs: &Self) -> Self {
        if !self.member() || !rhs.member() {
            return Self::no_weight();
        }
        if self.0 == f32::INFINITY {
            *self
        } else if rhs.0 == f32::INFINITY {
            *rhs
        } else {
            Self(self.0 + rhs.0)
        }
    }

    fn divide(&self, rhs: &Self, _divide_type: DivideType) -> Self {
        if !self.member() || !rhs.member() || rhs.0 == f32::INFINITY {
            return Self::no_weight();
        }
        if self.0 == f32::INFINITY {
            *self
        } else {
            Self(self.0 - rhs.0)
        }
    }

    fn reverse(&self) -> Self {
        *self
    }

    fn quantize(&self, delta: f32) -> Self {
        Self(quantize_float(self.0, delta))
    }

    fn member(&self) -> bool {
        !self.0.is_nan() && self.0 != f32::NEG_INFINITY
    }

    fn approx_eq(&self, rhs: &Self, delta: f32) -> bool {
        approx_eq_float(self.0, rhs.0, delta)
    }

    fn properties() -> u64 {
        SEMIRING | COMMUTATIVE
    }

    fn weight_type() -> String {
        "log".to_string()
    }

    fn write_binary<W: io::Write>(&self, w: &mut W) -> io::Result<()> {
        crate::io::write_f32(w, self.0)
    }

    fn read_binary(r: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self(r.read_f32()?))
    }
}

/// Compensated accumulator for the log semiring. Keeps the running sum in
/// f64 with a Kahan correction term, anchored at the dominant (smallest)
/// summand.
#[derive(Debug, Clone)]
pub struct LogAdder {
    sum: f64,
    c: f64,
}

impl Default for LogAdder {
    fn default() -> Self {
        Self {
            sum: f64::INFINITY,
            c: 0.0,
        }
    }
}

impl Adder for LogAdder {
    type Weight = LogWeight;

    fn add(&mut self, w: &LogWeight) {
        let f = w.value() as f64;
        if f == f64::INFINITY {
            return;
        }
        if self.sum == f64::INFINITY {
            self.sum = f;
            self.c = 0.0;
        } else if f > self.sum {
            self.sum = kahan_log_sum(self.sum, f, &mut self.c);
        } else {
            self.sum = kahan_log_sum(f, self.sum, &mut self.c);
        }
    }

    fn sum(&self) -> LogWeight {
        LogWeight::new(self.sum as f32)
    }

    fn reset(&mut self, w: LogWeight) {
        self.sum = w.value() as f64;
        self.c = 0.0;
    }
}

/// The min-max semiring: plus is min, times is max.
///
/// Zero is +inf, one is -inf; both infinities are members.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Pod, Zeroable)]
pub struct MinMaxWeight(f32);

float_weight_common!(MinMaxWeight);

impl Weight for MinMaxWeight {
    type Reverse = MinMaxWeight;
    type Adder = SimpleAdder<MinMaxWeight>;

    fn zero() -> Self {
        Self(f32::INFINITY)
    }

    fn one() -> Self {
        Self(f32::NEG_INFINITY)
    }

    fn no_weight() -> Self {
        Self(f32::NAN)
    }

    fn plus(&self, rhs: &Self) -> Self {
        if !self.member() || !rhs.member() {
            return Self::no_weight();
        }
        if self.0 < rhs.0 { *self } else { *rhs }
    }

    fn times(&self, rhs: &Self) -> Self {
        if !self.member() || !rhs.member() {
            return Self::no_weight();
        }
        if self.0 >= rhs.0 { *self } else { *rhs }
    }

    /// Defined only when max(rhs, z) = self has a solution: self >= rhs.
    fn divide(&self, rhs: &Self, _divide_type: DivideType) -> Self {
        if !self.member() || !rhs.member() {
            return Self::no_weight();
        }
        if self.0 >= rhs.0 {
            *self
        } else {
            Self::no_weight()
        }
    }

    fn reverse(&self) -> Self {
        *self
    }

    fn quantize(&self, delta: f32) -> Self {
        Self(quantize_float(self.0, delta))
    }

    fn member(&self) -> bool {
        !self.0.is_nan()
    }

    fn approx_eq(&self, rhs: &Self, delta: f32) -> bool {
        approx_eq_float(self.0, rhs.0, delta)
    }

    fn properties() -> u64 {
        SEMIRING | COMMUTATIVE | IDEMPOTENT | PATH
    }

    fn weight_type() -> String {
        "minmax".to_string()
    }

    fn write_binary<W: io::Write>(&self, w: &mut W) -> io::Result<()> {
        crate::io::write_f32(w, self.0)
    }

    fn read_binary(r: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self(r.read_f32()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weight::DELTA;

    fn check_semiring_identities<W: Weight>(samples: &[W]) {
        for a in samples {
            assert_eq!(&a.plus(&W::zero()), a);
            assert_eq!(&W::zero().plus(a), a);
            assert_eq!(&a.times(&W::one()), a);
            assert_eq!(&W::one().times(a), a);
            assert_eq!(a.times(&W::zero()), W::zero());
            assert_eq!(W::zero().times(a), W::zero());
        }
        for a in samples {
            for b in samples {
                for c in samples {
                    let left = a.plus(b).plus(c);
                    let right = a.plus(&b.plus(c));
                    assert!(left.approx_eq(&right, DELTA), "{left:?} vs {right:?}");
                    let left = a.times(b).times(c);
                    let right = a.times(&b.times(c));
                    assert!(left.approx_eq(&right, DELTA), "{left:?} vs {right:?}");
                }
            }
        }
    }

    #[test]
    fn tropical_laws() {
        let samples = [
            TropicalWeight::new(0.0),
            TropicalWeight::new(1.5),
            TropicalWeight::new(3.25),
            TropicalWeight::zero(),
        ];
        check_semiring_identities(&samples);
        // Idempotent and commutative.
        for a in &samples {
            assert_eq!(&a.plus(a), a);
            for b in &samples {
                assert_eq!(a.plus(b), b.plus(a));
                assert_eq!(a.times(b), b.times(a));
            }
        }
    }

    #[test]
    fn tropical_divide() {
        let a = TropicalWeight::new(5.0);
        let b = TropicalWeight::new(2.0);
        assert_eq!(a.divide(&b, DivideType::Any), TropicalWeight::new(3.0));
        assert!(!a.divide(&TropicalWeight::zero(), DivideType::Any).member());
    }

    #[test]
    fn tropical_members() {
        assert!(TropicalWeight::zero().member());
        assert!(!TropicalWeight::no_weight().member());
        assert!(!TropicalWeight::new(f32::NEG_INFINITY).member());
        assert!(!TropicalWeight::new(1.0).plus(&TropicalWeight::no_weight()).member());
    }

    #[test]
    fn tropical_quantize_idempotent() {
        let w = TropicalWeight::new(1.00061);
        let q = w.quantize(DELTA);
        assert_eq!(q.quantize(DELTA), q);
        assert_eq!(TropicalWeight::zero().quantize(DELTA), TropicalWeight::zero());
    }

    #[test]
    fn tropical_text_round_trip() {
        for w in [
            TropicalWeight::new(2.5),
            TropicalWeight::zero(),
            TropicalWeight::no_weight(),
        ] {
            let text = w.to_string();
            let back: TropicalWeight = text.parse().unwrap();
            if w.member() {
                assert_eq!(back, w);
            } else {
                assert!(!back.member());
            }
        }
        assert_eq!(TropicalWeight::zero().to_string(), "Infinity");
        assert_eq!(TropicalWeight::no_weight().to_string(), "BadNumber");
    }

    #[test]
    fn log_laws() {
        let samples = [
            LogWeight::new(0.0),
            LogWeight::new(0.5),
            LogWeight::new(2.0),
            LogWeight::zero(),
        ];
        check_semiring_identities(&samples);
        for a in &samples {
            for b in &samples {
                assert!(a.plus(b).approx_eq(&b.plus(a), DELTA));
            }
        }
    }

    #[test]
    fn log_plus_matches_linear_domain() {
        // -log(e^-1 + e^-2)
        let expected = -((-1.0f64).exp() + (-2.0f64).exp()).ln();
        let got = LogWeight::new(1.0).plus(&LogWeight::new(2.0));
        assert!((got.value() as f64 - expected).abs() < 1e-6);
    }

    #[test]
    fn log_adder_is_stable() {
        // Sum 1000 copies of -log(1/1000): the result must be ~one().
        let w = LogWeight::new((1000.0f64).ln() as f32);
        let mut adder = LogAdder::default();
        for _ in 0..1000 {
            adder.add(&w);
        }
        assert!(adder.sum().approx_eq(&LogWeight::one(), 1e-4));
    }

    #[test]
    fn minmax_laws() {
        let samples = [
            MinMaxWeight::new(-1.0),
            MinMaxWeight::new(0.5),
            MinMaxWeight::new(2.0),
            MinMaxWeight::zero(),
            MinMaxWeight::one(),
        ];
        check_semiring_identities(&samples);
        for a in &samples {
            assert_eq!(&a.plus(a), a);
        }
    }

    #[test]
    fn minmax_divide_partiality() {
        let a = MinMaxWeight::new(3.0);
        let b = MinMaxWeight::new(1.0);
        assert_eq!(a.divide(&b, DivideType::Any), a);
        assert!(!b.divide(&a, DivideType::Any).member());
    }

    #[test]
    fn binary_round_trip() {
        let w = LogWeight::new(1.25);
        let mut buf = Vec::new();
        w.write_binary(&mut buf).unwrap();
        assert_eq!(buf.len(), 4);
        let mut r = ByteReader::new(&buf);
        assert_eq!(LogWeight::read_binary(&mut r).unwrap(), w);
    }
}
