use super::*;

#[test]
fn extent_rejects_zero_dimensions() {
    assert!(Extent::new(0, 4).is_err());
    assert!(Extent::new(4, 0).is_err());
    let e = Extent::new(16, 8).unwrap();
    assert_eq!(e.texel_count(), 128);
    assert!((e.aspect() - 2.0).abs() < 1e-6);
}

#[test]
fn texel_size_is_reciprocal_of_extent() {
    let e = Extent::new(4, 2).unwrap();
    assert_eq!(e.texel_size(), Vec2::new(0.25, 0.5));
}

#[test]
fn frame_index_next_saturates() {
    assert_eq!(FrameIndex(3).next(), FrameIndex(4));
    assert_eq!(FrameIndex(u64::MAX).next(), FrameIndex(u64::MAX));
}
