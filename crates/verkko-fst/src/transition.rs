// The labeled, weighted transition record (the "arc" of WFST literature).

use std::io;

use crate::float_weight::{LogWeight, TropicalWeight};
use crate::io::ByteReader;
use crate::weight::Weight;
use crate::{Label, NO_LABEL, NO_STATE_ID, Result, StateId};

/// Expansion flag: the input label must be valid.
pub const ILABEL_VALUE: u32 = 0x1;
/// Expansion flag: the output label must be valid.
pub const OLABEL_VALUE: u32 = 0x2;
/// Expansion flag: the weight must be valid.
pub const WEIGHT_VALUE: u32 = 0x4;
/// Expansion flag: the next state must be valid.
pub const NEXTSTATE_VALUE: u32 = 0x8;
/// All transition fields.
pub const VALUE_FLAGS: u32 = ILABEL_VALUE | OLABEL_VALUE | WEIGHT_VALUE | NEXTSTATE_VALUE;

/// A transition out of an implicit source state.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition<W: Weight> {
    pub ilabel: Label,
    pub olabel: Label,
    pub weight: W,
    pub nextstate: StateId,
}

/// Transition over the tropical semiring, the conventional default.
pub type StdTransition = Transition<TropicalWeight>;

/// Transition over the log semiring.
pub type LogTransition = Transition<LogWeight>;

impl<W: Weight> Transition<W> {
    pub fn new(ilabel: Label, olabel: Label, weight: W, nextstate: StateId) -> Self {
        Self {
            ilabel,
            olabel,
            weight,
            nextstate,
        }
    }

    /// The superfinal encoding of a final weight: both labels `NO_LABEL`,
    /// next state `NO_STATE_ID`.
    pub fn superfinal(weight: W) -> Self {
        Self::new(NO_LABEL, NO_LABEL, weight, NO_STATE_ID)
    }

    pub fn is_superfinal(&self) -> bool {
        self.ilabel == NO_LABEL
    }

    /// Serialize as (ilabel, olabel, weight payload, nextstate), all
    /// little-endian; the vector body's transition record.
    pub fn write_binary<Wr: io::Write>(&self, w: &mut Wr) -> io::Result<()> {
        crate::io::write_i32(w, self.ilabel)?;
        crate::io::write_i32(w, self.olabel)?;
        self.weight.write_binary(w)?;
        crate::io::write_i32(w, self.nextstate)
    }

    pub fn read_binary(r: &mut ByteReader<'_>) -> Result<Self> {
        let ilabel = r.read_i32()?;
        let olabel = r.read_i32()?;
        let weight = W::read_binary(r)?;
        let nextstate = r.read_i32()?;
        Ok(Self::new(ilabel, olabel, weight, nextstate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn superfinal_encoding() {
        let tr = StdTransition::superfinal(TropicalWeight::new(1.0));
        assert_eq!(tr.ilabel, NO_LABEL);
        assert_eq!(tr.olabel, NO_LABEL);
        assert_eq!(tr.nextstate, NO_STATE_ID);
        assert!(tr.is_superfinal());
        assert!(!StdTransition::new(1, 1, TropicalWeight::one(), 0).is_superfinal());
    }

    #[test]
    fn binary_round_trip() {
        let tr = StdTransition::new(5, 7, TropicalWeight::new(0.5), 3);
        let mut buf = Vec::new();
        tr.write_binary(&mut buf).unwrap();
        assert_eq!(buf.len(), 16);
        let mut r = ByteReader::new(&buf);
        assert_eq!(StdTransition::read_binary(&mut r).unwrap(), tr);
    }
}
