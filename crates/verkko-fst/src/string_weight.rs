// String semirings over label sequences, and the gallic product of a string
// with an ordinary weight.
//
// Plus takes the longest common prefix (left variant), longest common suffix
// (right variant), or requires equality (restricted variant); times is
// concatenation. Zero is an infinite-string sentinel.

use std::fmt;
use std::io;
use std::marker::PhantomData;
use std::str::FromStr;

use crate::io::ByteReader;
use crate::pair_weight::PairWeight;
use crate::weight::{
    CompositeWeightReader, CompositeWeightWriter, DivideType, IDEMPOTENT, LEFT_SEMIRING,
    RIGHT_SEMIRING, SEMIRING, SimpleAdder, Weight,
};
use crate::{FstError, Label, Result};

/// Sentinel label encoding the infinite string (the semiring zero).
pub const STRING_INFINITY: Label = i32::MAX;
/// Sentinel label encoding a malformed string (never a member).
pub const STRING_BAD: Label = i32::MAX - 1;

/// Which plus a string semiring uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringKind {
    /// Longest common prefix.
    Left,
    /// Longest common suffix.
    Right,
    /// Plus defined only between equal strings.
    Restricted,
}

/// Marker selecting a string semiring variant at the type level.
pub trait StringType: Clone + fmt::Debug + PartialEq + 'static {
    type Reverse: StringType<Reverse = Self>;
    const KIND: StringKind;
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeftString;

#[derive(Debug, Clone, PartialEq)]
pub struct RightString;

#[derive(Debug, Clone, PartialEq)]
pub struct RestrictedString;

impl StringType for LeftString {
    type Reverse = RightString;
    const KIND: StringKind = StringKind::Left;
}

impl StringType for RightString {
    type Reverse = LeftString;
    const KIND: StringKind = StringKind::Right;
}

impl StringType for RestrictedString {
    type Reverse = RestrictedString;
    const KIND: StringKind = StringKind::Restricted;
}

/// A label sequence under one of the string semirings.
#[derive(Debug, Clone, PartialEq)]
pub struct StringWeight<S: StringType> {
    labels: Vec<Label>,
    _string_type: PhantomData<S>,
}

pub type LeftStringWeight = StringWeight<LeftString>;
pub type RightStringWeight = StringWeight<RightString>;
pub type RestrictedStringWeight = StringWeight<RestrictedString>;

impl<S: StringType> StringWeight<S> {
    pub fn new(labels: Vec<Label>) -> Self {
        Self {
            labels,
            _string_type: PhantomData,
        }
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    fn is_zero(&self) -> bool {
        self.labels == [STRING_INFINITY]
    }

    fn longest_common_prefix(&self, rhs: &Self) -> Self {
        let n = self
            .labels
            .iter()
            .zip(&rhs.labels)
            .take_while(|(a, b)| a == b)
            .count();
        Self::new(self.labels[..n].to_vec())
    }

    fn longest_common_suffix(&self, rhs: &Self) -> Self {
        let n = self
            .labels
            .iter()
            .rev()
            .zip(rhs.labels.iter().rev())
            .take_while(|(a, b)| a == b)
            .count();
        Self::new(self.labels[self.labels.len() - n..].to_vec())
    }
}

impl<S: StringType> fmt::Display for StringWeight<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return write!(f, "Infinity");
        }
        if !self.member() {
            return write!(f, "BadString");
        }
        if self.labels.is_empty() {
            return write!(f, "Epsilon");
        }
        for (i, label) in self.labels.iter().enumerate() {
            if i > 0 {
                write!(f, "_")?;
            }
            write!(f, "{label}")?;
        }
        Ok(())
    }
}

impl<S: StringType> FromStr for StringWeight<S> {
    type Err = FstError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Infinity" => Ok(Self::zero()),
            "BadString" => Ok(Self::no_weight()),
            "Epsilon" => Ok(Self::one()),
            _ => {
                let labels = s
                    .split('_')
                    .map(|part| {
                        part.parse::<Label>()
                            .map_err(|_| FstError::BadWeightText(format!("bad label '{part}'")))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Self::new(labels))
            }
        }
    }
}

impl<S: StringType> Weight for StringWeight<S> {
    type Reverse = StringWeight<S::Reverse>;
    type Adder = SimpleAdder<Self>;

    fn zero() -> Self {
        Self::new(vec![STRING_INFINITY])
    }

    fn one() -> Self {
        Self::new(Vec::new())
    }

    fn no_weight() -> Self {
        Self::new(vec![STRING_BAD])
    }

    fn plus(&self, rhs: &Self) -> Self {
        if !self.member() || !rhs.member() {
            return Self::no_weight();
        }
        if self.is_zero() {
            return rhs.clone();
        }
        if rhs.is_zero() {
            return self.clone();
        }
        match S::KIND {
            StringKind::Left => self.longest_common_prefix(rhs),
            StringKind::Right => self.longest_common_suffix(rhs),
            StringKind::Restricted => {
                if self == rhs {
                    self.clone()
                } else {
                    Self::no_weight()
                }
            }
        }
    }

    fn times(&self, rhs: &Self) -> Self {
        if !self.member() || !rhs.member() {
            return Self::no_weight();
        }
        if self.is_zero() || rhs.is_zero() {
            return Self::zero();
        }
        let mut labels = Vec::with_capacity(self.labels.len() + rhs.labels.len());
        labels.extend_from_slice(&self.labels);
        labels.extend_from_slice(&rhs.labels);
        Self::new(labels)
    }

    fn divide(&self, rhs: &Self, divide_type: DivideType) -> Self {
        if !self.member() || !rhs.member() || rhs.is_zero() {
            return Self::no_weight();
        }
        if self.is_zero() {
            return Self::zero();
        }
        match divide_type {
            DivideType::Left => {
                if self.labels.starts_with(&rhs.labels) {
                    Self::new(self.labels[rhs.labels.len()..].to_vec())
                } else {
                    Self::no_weight()
                }
            }
            DivideType::Right => {
                if self.labels.ends_with(&rhs.labels) {
                    Self::new(self.labels[..self.labels.len() - rhs.labels.len()].to_vec())
                } else {
                    Self::no_weight()
                }
            }
            DivideType::Any => Self::no_weight(),
        }
    }

    fn reverse(&self) -> Self::Reverse {
        StringWeight::new(self.labels.iter().rev().copied().collect())
    }

    fn quantize(&self, _delta: f32) -> Self {
        self.clone()
    }

    fn member(&self) -> bool {
        !self.labels.contains(&STRING_BAD)
    }

    fn approx_eq(&self, rhs: &Self, _delta: f32) -> bool {
        self == rhs
    }

    fn properties() -> u64 {
        match S::KIND {
            StringKind::Left => LEFT_SEMIRING | IDEMPOTENT,
            StringKind::Right => RIGHT_SEMIRING | IDEMPOTENT,
            StringKind::Restricted => SEMIRING | IDEMPOTENT,
        }
    }

    fn weight_type() -> String {
        match S::KIND {
            StringKind::Left => "left_string".to_string(),
            StringKind::Right => "right_string".to_string(),
            StringKind::Restricted => "string".to_string(),
        }
    }

    fn write_binary<W: io::Write>(&self, w: &mut W) -> io::Result<()> {
        crate::io::write_i32(w, self.labels.len() as i32)?;
        for label in &self.labels {
            crate::io::write_i32(w, *label)?;
        }
        Ok(())
    }

    fn read_binary(r: &mut ByteReader<'_>) -> Result<Self> {
        let n = r.read_i32()?;
        if n < 0 {
            return Err(FstError::BadString(format!("negative label count {n}")));
        }
        let mut labels = Vec::with_capacity(n as usize);
        for _ in 0..n {
            labels.push(r.read_i32()?);
        }
        Ok(Self::new(labels))
    }
}

/// The gallic semiring: a string component carrying output labels alongside
/// an ordinary weight. The restricted variant admits plus only between equal
/// strings; the left/right variants take the string semiring's own plus.
#[derive(Debug, Clone, PartialEq)]
pub struct GallicWeight<W: Weight, S: StringType> {
    pair: PairWeight<StringWeight<S>, W>,
}

impl<W: Weight, S: StringType> GallicWeight<W, S> {
    pub fn new(string: StringWeight<S>, weight: W) -> Self {
        Self {
            pair: PairWeight::new(string, weight),
        }
    }

    pub fn string(&self) -> &StringWeight<S> {
        self.pair.value1()
    }

    pub fn weight(&self) -> &W {
        self.pair.value2()
    }
}

impl<W: Weight, S: StringType> fmt::Display for GallicWeight<W, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.pair.write_text(f, ',', None)
    }
}

impl<W: Weight, S: StringType> FromStr for GallicWeight<W, S> {
    type Err = FstError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_text(s, ',', None)
    }
}

impl<W: Weight, S: StringType> Weight for GallicWeight<W, S> {
    type Reverse = GallicWeight<W::Reverse, S::Reverse>;
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
        if self == &Self::zero() {
            return rhs.clone();
        }
        if rhs == &Self::zero() {
            return self.clone();
        }
        if S::KIND == StringKind::Restricted && self.string() != rhs.string() {
            return Self::no_weight();
        }
        Self {
            pair: self.pair.plus(&rhs.pair),
        }
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
        GallicWeight {
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
        StringWeight::<S>::properties() & W::properties() & (SEMIRING | IDEMPOTENT)
    }

    fn weight_type() -> String {
        match S::KIND {
            StringKind::Left => format!("left_gallic_{}", W::weight_type()),
            StringKind::Right => format!("right_gallic_{}", W::weight_type()),
            StringKind::Restricted => format!("gallic_{}", W::weight_type()),
        }
    }

    fn write_binary<Wr: io::Write>(&self, w: &mut Wr) -> io::Result<()> {
        self.pair.write_binary(w)
    }

    fn read_binary(r: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self {
            pair: PairWeight::read_binary(r)?,
        })
    }

    fn write_text<Sk: fmt::Write>(
        &self,
        out: &mut Sk,
        separator: char,
        parentheses: Option<(char, char)>,
    ) -> fmt::Result {
        let mut writer = CompositeWeightWriter::new(out, separator, parentheses);
        writer.write_begin()?;
        writer.write_element(self.string())?;
        writer.write_element(self.weight())?;
        writer.write_end()
    }

    fn parse_text(s: &str, separator: char, parentheses: Option<(char, char)>) -> Result<Self> {
        let mut reader = CompositeWeightReader::new(s, separator, parentheses);
        reader.read_begin()?;
        let string =
            StringWeight::parse_text(&reader.read_element(false)?, separator, parentheses)?;
        let weight = W::parse_text(&reader.read_element(true)?, separator, parentheses)?;
        reader.read_end()?;
        Ok(Self::new(string, weight))
    }
}
