use crate::compositor::PreviewCompositor;
use crate::error::ConverterError;
use proptest::prelude::*;

fn image() -> impl Strategy<Value = (u32, u32, Vec<u8>)> {
    (0u32..64, 0u32..32).prop_flat_map(|(w, h)| {
        (
            Just(w),
            Just(h),
            proptest::collection::vec(any::<u8>(), (w * h) as usize),
        )
    })
}

// Property: output is always width * height * 4 bytes
proptest! {
    #[test]
    fn prop_output_length((w, h, gray) in image()) {
        let out = PreviewCompositor::new().compose(&gray, w, h).unwrap();
        prop_assert_eq!(out.data().len(), (w * h) as usize * 4);
    }
}

// Property: every pixel repeats its intensity and is opaque
proptest! {
    #[test]
    fn prop_pixels_expand_intensity((w, h, gray) in image()) {
        let out = PreviewCompositor::new().compose(&gray, w, h).unwrap();
        for (g, px) in gray.iter().zip(out.data().chunks(4)) {
            prop_assert_eq!(px, &[*g, *g, *g, 255][..]);
        }
    }
}

// Property: composing the same input twice gives identical buffers
proptest! {
    #[test]
    fn prop_compose_idempotent((w, h, gray) in image()) {
        let compositor = PreviewCompositor::new();
        let first = compositor.compose(&gray, w, h).unwrap();
        let second = compositor.compose(&gray, w, h).unwrap();
        prop_assert_eq!(first, second);
    }
}

// Property: any length other than width * height is a size mismatch
proptest! {
    #[test]
    fn prop_wrong_length_rejected(w in 1u32..32, h in 1u32..32, delta in 1usize..16, grow in any::<bool>()) {
        let expected = (w * h) as usize;
        let len = if grow { expected + delta } else { expected.saturating_sub(delta) };
        prop_assume!(len != expected);

        let result = PreviewCompositor::new().compose(&vec![7; len], w, h);
        let is_mismatch = matches!(result, Err(ConverterError::SizeMismatch { .. }));
        prop_assert!(is_mismatch);
    }
}
