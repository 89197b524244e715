// On-disk round trips through real files, including the memory-mapped path.

use std::sync::Arc as SharedPtr;

use verkko_fst::compact_fst::{CompactAcceptorFst, CompactStringFst};
use verkko_fst::compactor::{AcceptorCompactor, StringCompactor};
use verkko_fst::float_weight::TropicalWeight;
use verkko_fst::fst::MutableFst;
use verkko_fst::io::FstWriteOptions;
use verkko_fst::mapped::LoadMode;
use verkko_fst::properties::{ERROR, verify_properties};
use verkko_fst::transition::Transition;
use verkko_fst::variant::FstVariant;
use verkko_fst::vector_fst::VectorFst;
use verkko_fst::{ExpandedFst, Fst, Weight};

type W = TropicalWeight;

fn tr(i: i32, o: i32, w: f32, next: i32) -> Transition<W> {
    Transition::new(i, o, W::new(w), next)
}

fn collect<F: ExpandedFst<W = W>>(fst: &F) -> Vec<(i32, W, Vec<Transition<W>>)> {
    fst.states()
        .map(|s| (s, fst.final_weight(s), fst.transitions(s).collect()))
        .collect()
}

#[test]
fn vector_file_round_trip() {
    let mut fst = VectorFst::<W>::new();
    let s0 = fst.add_state();
    let s1 = fst.add_state();
    let s2 = fst.add_state();
    fst.set_start(s0);
    fst.set_final(s2, W::new(0.25));
    fst.add_transition(s0, tr(1, 2, 0.5, s1));
    fst.add_transition(s0, tr(3, 3, 0.0, s2));
    fst.add_transition(s1, tr(4, 0, 1.5, s2));

    let file = tempfile::NamedTempFile::new().unwrap();
    fst.write_file(file.path(), &FstWriteOptions::default())
        .unwrap();

    let back = VectorFst::<W>::read_file(file.path()).unwrap();
    assert_eq!(collect(&fst), collect(&back));
    assert_eq!(back.properties(ERROR, false), 0);
    assert!(verify_properties(&back));
}

#[test]
fn compact_mapped_reader_is_bit_identical() {
    let mut source = VectorFst::<W>::new();
    let states: Vec<_> = (0..4).map(|_| source.add_state()).collect();
    source.set_start(states[0]);
    source.set_final(states[3], W::new(2.0));
    source.add_transition(states[0], tr(1, 1, 0.125, states[1]));
    source.add_transition(states[1], tr(2, 2, 0.0, states[2]));
    source.add_transition(states[1], tr(3, 3, 7.5, states[3]));
    source.add_transition(states[2], tr(4, 4, 0.0625, states[3]));
    let compact = CompactAcceptorFst::<W>::from_fst(&source, AcceptorCompactor::default());

    let file = tempfile::NamedTempFile::new().unwrap();
    compact
        .write_file(file.path(), &FstWriteOptions::aligned())
        .unwrap();

    let heap = CompactAcceptorFst::<W>::read_file(file.path(), LoadMode::Read).unwrap();
    let mapped = CompactAcceptorFst::<W>::read_file(file.path(), LoadMode::Map).unwrap();
    assert!(mapped.data().is_mapped());

    for s in heap.states() {
        let lhs: Vec<_> = heap.transitions(s).collect();
        let rhs: Vec<_> = mapped.transitions(s).collect();
        assert_eq!(lhs, rhs);
        // Weights compare as exact bit patterns.
        for (a, b) in lhs.iter().zip(&rhs) {
            assert_eq!(a.weight.value().to_bits(), b.weight.value().to_bits());
        }
        assert_eq!(
            heap.final_weight(s).value().to_bits(),
            mapped.final_weight(s).value().to_bits()
        );
    }
    assert_eq!(collect(&compact), collect(&mapped));
}

#[test]
fn every_standard_compactor_survives_a_file() {
    // A linear unweighted acceptor is compatible with all five compactors.
    let mut source = VectorFst::<W>::new();
    let s0 = source.add_state();
    let s1 = source.add_state();
    source.set_start(s0);
    source.set_final(s1, W::one());
    source.add_transition(s0, tr(9, 9, 0.0, s1));

    let variants: Vec<FstVariant<W>> = vec![
        FstVariant::from(source.clone()),
        FstVariant::from(CompactStringFst::from_fst(
            &source,
            StringCompactor::default(),
        )),
        FstVariant::from(CompactAcceptorFst::from_fst(
            &source,
            AcceptorCompactor::default(),
        )),
        FstVariant::from(verkko_fst::compact_fst::CompactUnweightedAcceptorFst::from_fst(
            &source,
            verkko_fst::compactor::UnweightedAcceptorCompactor::default(),
        )),
        FstVariant::from(verkko_fst::compact_fst::CompactUnweightedFst::from_fst(
            &source,
            verkko_fst::compactor::UnweightedCompactor::default(),
        )),
        FstVariant::from(verkko_fst::compact_fst::CompactWeightedStringFst::from_fst(
            &source,
            verkko_fst::compactor::WeightedStringCompactor::default(),
        )),
    ];

    for variant in &variants {
        assert_eq!(variant.properties(ERROR, false), 0, "{}", variant.fst_type());
        let file = tempfile::NamedTempFile::new().unwrap();
        variant
            .write_file(file.path(), &FstWriteOptions::default())
            .unwrap();
        let back = FstVariant::<W>::read_file(file.path(), LoadMode::Read).unwrap();
        assert_eq!(back.fst_type(), variant.fst_type());
        assert_eq!(collect(variant), collect(&back));
    }
}

#[test]
fn frozen_and_thawed_fst_matches_source() {
    let mut source = VectorFst::<W>::new();
    let s0 = source.add_state();
    let s1 = source.add_state();
    let s2 = source.add_state();
    source.set_start(s0);
    source.set_final(s2, W::new(1.0));
    source.add_transition(s0, tr(1, 1, 0.5, s1));
    source.add_transition(s0, tr(2, 2, 0.25, s2));
    source.add_transition(s1, tr(2, 2, 0.0, s2));

    let compact = CompactAcceptorFst::<W>::from_fst(&source, AcceptorCompactor::default());
    let thawed = VectorFst::from_fst(&compact);
    assert_eq!(collect(&source), collect(&thawed));
    assert!(verify_properties(&thawed));
}

#[test]
fn shared_region_parses_many_fsts() {
    // Two FSTs written back to back in one buffer parse independently from
    // their offsets, the way an archive embeds them.
    let mut buf = Vec::new();
    let a = CompactStringFst::<W>::from_elements(vec![1, 2], StringCompactor::default());
    a.write(&mut buf, &FstWriteOptions::default()).unwrap();
    let second_offset = buf.len();
    let b = CompactStringFst::<W>::from_elements(vec![7], StringCompactor::default());
    b.write(&mut buf, &FstWriteOptions::default()).unwrap();

    let region = SharedPtr::new(verkko_fst::mapped::MappedRegion::from_vec(buf));
    let first = CompactStringFst::<W>::read_region(&region, 0).unwrap();
    let second = CompactStringFst::<W>::read_region(&region, second_offset).unwrap();
    assert_eq!(first.num_states(), 3);
    assert_eq!(second.num_states(), 2);
    assert_eq!(
        second.transitions(0).next().unwrap(),
        Transition::new(7, 7, W::one(), 1)
    );
}
