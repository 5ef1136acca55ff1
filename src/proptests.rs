use super::*;

use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Debug, PartialEq)]
struct Versioned {
    qualifier: [u8; 2],
    version: u8,
}

impl Cell for Versioned {
    fn qualifier_array(&self) -> &[u8] {
        &self.qualifier
    }
}

fn cell(qualifier: u16, version: u8) -> Versioned {
    Versioned {
        qualifier: qualifier.to_be_bytes(),
        version,
    }
}

fn accepts(range: QualifierRange, qualifier: u16) -> bool {
    ReservedRange::default().contains(qualifier.into()) || range.contains(qualifier.into())
}

fn validate_list(list: &EncodedCellList<Versioned>, model: &BTreeMap<u16, u8>) {
    assert_eq!(list.len(), model.len(), "len must match the model");
    assert_eq!(list.iter().count(), list.len());
    assert_eq!(list.iter().len(), list.len());

    let got: Vec<(u16, u8)> = list
        .iter()
        .map(|c| (u16::from_be_bytes(c.qualifier), c.version))
        .collect();
    let expected: Vec<(u16, u8)> = model.iter().map(|(&q, &v)| (q, v)).collect();
    assert_eq!(got, expected, "iteration must be in ascending qualifier order");

    let mut reversed = list.iter().rev().cloned().collect::<Vec<_>>();
    reversed.reverse();
    assert_eq!(reversed, list.to_vec());

    match model.iter().next() {
        Some((&q, &v)) => assert_eq!(list.first().ok(), Some(&cell(q, v))),
        None => assert_eq!(list.first(), Err(Error::Empty)),
    }
}

#[derive(Clone, Debug)]
enum Op {
    Add(u16, u8),
    Remove(u16, u8),
    Get(u16),
    RemoveOddWithCursor,
    Retain(BTreeSet<u16>),
    Clear,
}

fn range_strategy() -> impl Strategy<Value = QualifierRange> {
    (0u32..60, 0u32..40).prop_map(|(min, len)| {
        QualifierRange::new(min, min + len).expect("min <= min + len")
    })
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let qualifier = 0u16..120;
    let version = 0u8..4;
    let op = prop_oneof![
        50 => (qualifier.clone(), version.clone()).prop_map(|(q, v)| Op::Add(q, v)),
        20 => (qualifier.clone(), version).prop_map(|(q, v)| Op::Remove(q, v)),
        20 => qualifier.clone().prop_map(Op::Get),
        4 => Just(Op::RemoveOddWithCursor),
        4 => prop::collection::btree_set(qualifier, 0..=30).prop_map(Op::Retain),
        1 => Just(Op::Clear),
    ];
    prop::collection::vec(op, 0..=300)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence_with_ordered_map(range in range_strategy(), ops in ops_strategy()) {
        let mut list: EncodedCellList<Versioned> = EncodedCellList::with_reserved_range(
            range,
            ReservedRange::default(),
            QualifierEncodingScheme::TwoByte,
        );
        let mut m: BTreeMap<u16, u8> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Add(q, v) => {
                    let got = list.add(cell(q, v));
                    if accepts(range, q) {
                        let old_m = m.insert(q, v).map(|old| cell(q, old));
                        prop_assert_eq!(got, Ok(old_m));
                    } else {
                        let is_out_of_range = matches!(got, Err(Error::OutOfRange { .. }));
                        prop_assert!(is_out_of_range);
                    }
                }
                Op::Remove(q, v) => {
                    let removed = list.remove(&cell(q, v));
                    let expected = m.get(&q) == Some(&v);
                    if expected {
                        m.remove(&q);
                    }
                    prop_assert_eq!(removed, expected);
                }
                Op::Get(q) => {
                    let got = list.get_by_qualifier(q.into());
                    if accepts(range, q) {
                        let expected = m.get(&q).map(|&v| cell(q, v));
                        prop_assert_eq!(got, Ok(expected.as_ref()));
                    } else {
                        prop_assert!(got.is_err());
                    }
                }
                Op::RemoveOddWithCursor => {
                    let mut cursor = list.cursor();
                    while let Some(current) = cursor.next(&list).unwrap() {
                        if current.version % 2 == 1 {
                            cursor.remove(&mut list).unwrap();
                        }
                    }
                    m.retain(|_, v| *v % 2 == 0);
                }
                Op::Retain(keep) => {
                    let mut other: EncodedCellList<Versioned> = EncodedCellList::with_reserved_range(
                        range,
                        ReservedRange::default(),
                        QualifierEncodingScheme::TwoByte,
                    );
                    for (&q, &v) in m.iter().filter(|(q, _)| keep.contains(*q)) {
                        other.add(cell(q, v)).unwrap();
                    }
                    let changed = list.retain_all(&other).unwrap();
                    let before = m.len();
                    m.retain(|q, _| keep.contains(q));
                    prop_assert_eq!(changed, m.len() != before);
                }
                Op::Clear => {
                    list.clear();
                    m.clear();
                }
            }

            prop_assert_eq!(list.len(), m.len());
        }

        validate_list(&list, &m);
    }

    #[test]
    fn prop_positional_access_matches_iteration(
        range in range_strategy(),
        qualifiers in prop::collection::btree_set(0u16..120, 0..=40),
    ) {
        let mut list: EncodedCellList<Versioned> = EncodedCellList::with_reserved_range(
            range,
            ReservedRange::default(),
            QualifierEncodingScheme::TwoByte,
        );
        list.add_all(
            qualifiers
                .iter()
                .filter(|&&q| accepts(range, q))
                .map(|&q| cell(q, 0)),
        )
        .unwrap();

        for (index, expected) in list.iter().enumerate() {
            prop_assert_eq!(list.get(index), Ok(expected));
            prop_assert_eq!(list.index_of(expected), Some(index));
        }
        prop_assert!(list.get(list.len()).is_err());
    }
}

#[test]
fn list_cursor_round_trip_over_every_subset() {
    let qualifiers = [0u16, 10, 11, 12, 15];
    for mask in 0u32..(1 << qualifiers.len()) {
        let mut list = EncodedCellList::new(11, 15, QualifierEncodingScheme::TwoByte).unwrap();
        for (i, &q) in qualifiers.iter().enumerate() {
            if mask & (1 << i) != 0 {
                list.add(cell(q, 0)).unwrap();
            }
        }

        let mut cursor = list.list_cursor();
        let mut forward = Vec::new();
        while let Some(c) = cursor.next(&list).unwrap() {
            forward.push(c.clone());
        }
        assert_eq!(cursor.next_index(), list.len());

        let mut backward = Vec::new();
        while let Some(c) = cursor.previous(&list).unwrap() {
            backward.push(c.clone());
        }
        backward.reverse();
        assert_eq!(forward, backward);
        assert_eq!(forward, list.to_vec());
        assert_eq!(cursor.previous_index(), None);
    }
}
