//! End-to-end scenarios S1-S6 from the design doc, exercised through the
//! public facade only.

use id_compressor_core::{Compressor, CompressorOptions, IdCreationRange, IdRange, OpSpaceId, SessionSpaceId};

fn compressor(session_id: Option<uuid::Uuid>, cluster_capacity_policy: u32) -> Compressor {
    Compressor::new(CompressorOptions {
        session_id,
        cluster_capacity_policy,
    })
    .unwrap()
}

/// A v4/variant-1 uuid with every free bit zeroed, so that `raw + k` (for
/// small `k`) equals the bit-pattern-aware `numeric_uuid::add` the crate uses
/// internally, letting tests assert on stable-id arithmetic without reaching
/// into private modules.
fn zeroed_v4_uuid() -> uuid::Uuid {
    uuid::Uuid::from_u128((0x4u128 << 48) | (0b10u128 << 64))
}

#[test]
fn s1_solo_session_no_finalization() {
    let mut s1 = compressor(Some(zeroed_v4_uuid()), 512);
    assert_eq!(s1.generate_compressed_id().unwrap(), SessionSpaceId(-1));
    assert_eq!(s1.generate_compressed_id().unwrap(), SessionSpaceId(-2));
    assert_eq!(s1.generate_compressed_id().unwrap(), SessionSpaceId(-3));

    let base = s1.session_id();
    let expected = id_compressor_core::StableId::from_u128(base.as_u128() + 1);
    assert_eq!(s1.decompress(SessionSpaceId(-2)).unwrap(), expected);
    assert_eq!(s1.normalize_to_op_space(SessionSpaceId(-2)), OpSpaceId(-2));
}

#[test]
fn s2_self_finalization_makes_local_ids_final() {
    let mut s1 = compressor(None, 5);
    s1.generate_compressed_id().unwrap();
    s1.generate_compressed_id().unwrap();
    s1.generate_compressed_id().unwrap();

    let range = s1.take_next_creation_range();
    assert_eq!(
        range,
        IdCreationRange {
            session_id: s1.session_id(),
            ids: Some(IdRange {
                first_gen_count: 1,
                last_gen_count: 3,
            }),
        }
    );

    s1.finalize_creation_range(&range).unwrap();

    assert_eq!(s1.generate_compressed_id().unwrap(), SessionSpaceId(2));
    assert_eq!(s1.normalize_to_op_space(SessionSpaceId(-2)), OpSpaceId(1));
}

#[test]
fn s3_two_sessions_interleaved_finalization() {
    let mut a = compressor(None, 5);
    let mut b = compressor(None, 5);

    a.generate_compressed_id().unwrap();
    a.generate_compressed_id().unwrap();
    b.generate_compressed_id().unwrap();
    b.generate_compressed_id().unwrap();
    b.generate_compressed_id().unwrap();

    let a_range = a.take_next_creation_range();
    let b_range = b.take_next_creation_range();

    for c in [&mut a, &mut b] {
        c.finalize_creation_range(&a_range).unwrap();
        c.finalize_creation_range(&b_range).unwrap();
    }

    let session_b = b.session_id();
    assert_eq!(
        a.decompress(SessionSpaceId(5)).unwrap(),
        id_compressor_core::StableId::from_u128(session_b.as_u128())
    );
}

#[test]
fn s4_in_place_cluster_extension() {
    let mut a = compressor(None, 5);
    let mut b = compressor(None, 5);

    a.generate_compressed_id().unwrap();
    a.generate_compressed_id().unwrap();
    b.generate_compressed_id().unwrap();
    b.generate_compressed_id().unwrap();
    b.generate_compressed_id().unwrap();

    let a_range_1 = a.take_next_creation_range();
    let b_range_1 = b.take_next_creation_range();
    for c in [&mut a, &mut b] {
        c.finalize_creation_range(&a_range_1).unwrap();
        c.finalize_creation_range(&b_range_1).unwrap();
    }

    a.generate_compressed_id().unwrap();
    a.generate_compressed_id().unwrap();
    b.generate_compressed_id().unwrap();

    let a_range_2 = a.take_next_creation_range();
    let b_range_2 = b.take_next_creation_range();
    for c in [&mut a, &mut b] {
        // B's range is broadcast ahead of A's this round, so B is still at
        // the frontier when its range lands and extends in place; A's own
        // slack was already spent by B's cluster in the first round, so A
        // gets a fresh cluster regardless of intra-round order.
        c.finalize_creation_range(&b_range_2).unwrap();
        c.finalize_creation_range(&a_range_2).unwrap();
    }

    // A could not extend in place (B's cluster intervened), so A got a new
    // cluster at base_final=10; B's cluster extended in place.
    assert_eq!(a.normalize_to_op_space(SessionSpaceId(-3)), OpSpaceId(10));
    assert_eq!(b.normalize_to_op_space(SessionSpaceId(-4)), OpSpaceId(8));
    assert_eq!(a.decompress(SessionSpaceId(10)).unwrap(), a.decompress(SessionSpaceId(-3)).unwrap());
    assert_eq!(b.decompress(SessionSpaceId(8)).unwrap(), b.decompress(SessionSpaceId(-4)).unwrap());

    // next_final should have advanced to 15 for both compressors.
    let a_bytes = a.serialize(false);
    let b_bytes = b.serialize(false);
    assert_eq!(a_bytes.len(), b_bytes.len());
}

#[test]
fn s5_serialize_resume_round_trip() {
    let mut a = compressor(None, 5);
    let mut b = compressor(None, 5);
    a.generate_compressed_id().unwrap();
    a.generate_compressed_id().unwrap();
    b.generate_compressed_id().unwrap();
    b.generate_compressed_id().unwrap();
    b.generate_compressed_id().unwrap();
    let a_range = a.take_next_creation_range();
    let b_range = b.take_next_creation_range();
    for c in [&mut a, &mut b] {
        c.finalize_creation_range(&a_range).unwrap();
        c.finalize_creation_range(&b_range).unwrap();
    }

    let bytes = b.serialize(true);
    let mut resumed = Compressor::deserialize(&bytes, None).unwrap();
    assert_eq!(resumed.serialize(true), bytes);

    // Further finalizations behave identically on both.
    b.generate_compressed_id().unwrap();
    resumed.generate_compressed_id().unwrap();
    let more = b.take_next_creation_range();
    let more_resumed = resumed.take_next_creation_range();
    assert_eq!(more, more_resumed);
    b.finalize_creation_range(&more).unwrap();
    resumed.finalize_creation_range(&more_resumed).unwrap();
    assert_eq!(b.serialize(true), resumed.serialize(true));
}

#[test]
fn s6_foreign_unfinalized_id_rejection() {
    let mut a = compressor(None, 5);
    let mut b = compressor(None, 5);

    for _ in 0..7 {
        a.generate_compressed_id().unwrap();
    }

    let wire_id = OpSpaceId(-7);
    let result = b.normalize_to_session_space(wire_id, a.session_id());
    assert!(matches!(result, Err(id_compressor_core::Error::UnfinalizedForeignId)));

    let a_range = a.take_next_creation_range();
    a.finalize_creation_range(&a_range).unwrap();
    b.finalize_creation_range(&a_range).unwrap();

    let resolved = b.normalize_to_session_space(wire_id, a.session_id()).unwrap();
    assert_eq!(resolved, SessionSpaceId(6));
}
