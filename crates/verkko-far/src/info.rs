// Archive summaries: container type, transition type, entry count and
// aggregate state/transition counts.

use verkko_fst::compactor::PodWeight;
use verkko_fst::fst::{ExpandedFst, Fst};
use verkko_fst::weight::Weight;

use crate::Result;
use crate::far::FarReader;

/// Summary of one archive (or concatenation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FarInfo {
    pub far_type: String,
    pub arc_type: String,
    /// Representation of the entries, or `multiple` when mixed.
    pub fst_type: String,
    pub num_fsts: usize,
    pub num_states: usize,
    pub num_transitions: usize,
    pub first_key: String,
    pub last_key: String,
}

/// Scan the whole archive and summarize it. The reader is left exhausted.
pub fn far_info<W: PodWeight>(reader: &mut FarReader<W>) -> Result<FarInfo> {
    reader.reset()?;
    let far_type = reader
        .far_type()
        .map(|t| t.to_string())
        .unwrap_or_else(|| "none".to_string());
    let mut info = FarInfo {
        far_type,
        arc_type: W::arc_type(),
        fst_type: String::new(),
        num_fsts: 0,
        num_states: 0,
        num_transitions: 0,
        first_key: String::new(),
        last_key: String::new(),
    };
    while !reader.done() {
        let key = reader.get_key().to_string();
        if info.num_fsts == 0 {
            info.first_key = key.clone();
        }
        info.last_key = key;
        let fst = reader.get_fst()?;
        let fst_type = fst.fst_type();
        if info.fst_type.is_empty() {
            info.fst_type = fst_type;
        } else if info.fst_type != fst_type {
            info.fst_type = "multiple".to_string();
        }
        info.num_fsts += 1;
        info.num_states += fst.num_states() as usize;
        for s in fst.states() {
            info.num_transitions += fst.num_transitions(s);
        }
        reader.next()?;
    }
    Ok(info)
}
