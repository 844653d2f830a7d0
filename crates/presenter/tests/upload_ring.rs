use presenter::format::gl;
use presenter::upload::{TexelEncoding, UploadRing, DEFAULT_RING_DEPTH};
use presenter::{CopyStrategy, FrameBufferDescriptor, Rect, Size, UploadError};

fn descriptor(buffer: Size, rect: Rect) -> FrameBufferDescriptor {
    FrameBufferDescriptor::new(buffer, rect, gl::BGRA, gl::UNSIGNED_INT_8_8_8_8_REV).unwrap()
}

fn filled(descriptor: &FrameBufferDescriptor, value: u8) -> Vec<u8> {
    vec![value; descriptor.source_len()]
}

#[test]
fn scenario_a_full_frame_takes_fast_path() {
    let desc = descriptor(Size::new(256, 224), Rect::new(0, 0, 256, 224));
    let encoding = TexelEncoding::for_format(desc.resolved());
    assert_eq!(desc.bytes_per_pixel(), 4);

    let mut ring = UploadRing::new(DEFAULT_RING_DEPTH).unwrap();
    let staged = ring.stage(0, &desc, &encoding, &filled(&desc, 9)).unwrap();
    assert_eq!(staged.strategy, CopyStrategy::Fast);
    assert_eq!(staged.copy_calls, 1);
    assert_eq!(staged.layout.len(), 256 * 224 * 4);
    assert_eq!(staged.layout.extent, Size::new(256, 224));
}

#[test]
fn scenario_b_offset_crop_copies_each_scanline() {
    let desc = descriptor(Size::new(292, 224), Rect::new(8, 8, 256, 208));
    let encoding = TexelEncoding::for_format(desc.resolved());

    let mut ring = UploadRing::new(DEFAULT_RING_DEPTH).unwrap();
    let staged = ring.stage(0, &desc, &encoding, &filled(&desc, 3)).unwrap();
    assert_eq!(staged.strategy, CopyStrategy::Scanline);
    assert_eq!(staged.copy_calls, 208);
    assert_eq!(staged.layout.bytes_per_row, 256 * 4);
    assert_ne!(desc.source_row_bytes(), 256 * 4);
}

#[test]
fn fast_producer_cannot_overwrite_unissued_slots() {
    let desc = descriptor(Size::new(64, 32), Rect::new(0, 0, 64, 32));
    let encoding = TexelEncoding::for_format(desc.resolved());
    let mut ring = UploadRing::new(3).unwrap();

    for frame in 0..3u64 {
        ring.stage(frame, &desc, &encoding, &filled(&desc, frame as u8 + 1))
            .unwrap();
    }
    assert_eq!(ring.in_flight(), 3);
    assert_eq!(ring.oldest_in_flight(), Some(0));

    // Frame 3 maps onto slot 0 whose copy has not been issued yet.
    let err = ring
        .stage(3, &desc, &encoding, &filled(&desc, 4))
        .unwrap_err();
    assert_eq!(err, UploadError::SlotInFlight { slot: 0, pending: 0 });
    assert!(ring.slot_bytes(0).iter().take(64 * 4).all(|&byte| byte == 1));

    ring.mark_issued(0).unwrap();
    assert_eq!(ring.oldest_in_flight(), Some(1));
    ring.stage(3, &desc, &encoding, &filled(&desc, 4)).unwrap();
    assert!(ring.slot_bytes(0).iter().take(64 * 4).all(|&byte| byte == 4));
    assert!(ring.slot_bytes(1).iter().take(64 * 4).all(|&byte| byte == 2));

    for frame in 1..=3 {
        ring.mark_issued(frame).unwrap();
    }
    assert_eq!(ring.in_flight(), 0);
    assert_eq!(ring.oldest_in_flight(), None);
}
