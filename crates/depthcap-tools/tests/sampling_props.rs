//! 抽帧与深度清洗的属性测试
//!
//! 使用 proptest 验证计数公式和清洗后的取值范围。

use depthcap_tools::{
    DEFAULT_MAX_DEPTH_MM, INDEX_WIDTH, frame_stem, is_sampled, sampled_count, sanitize_depth,
    sanitize_value,
};
use proptest::prelude::*;

/// 任意 f32，包含 NaN、±∞ 和负值
fn any_depth() -> impl Strategy<Value = f32> {
    prop_oneof![
        Just(f32::NAN),
        Just(f32::INFINITY),
        Just(f32::NEG_INFINITY),
        -10_000.0f32..10_000.0f32,
        any::<f32>(),
    ]
}

proptest! {
    /// 抽中帧数等于 ceil(frames / stride)
    #[test]
    fn sampled_count_matches_filter(frames in 0u64..2_000, stride in 1u64..64) {
        let counted = (0..frames).filter(|&i| is_sampled(i, stride)).count() as u64;
        prop_assert_eq!(sampled_count(frames, stride), counted);
    }

    /// 抽中的帧序号都是步长的整数倍
    #[test]
    fn sampled_indices_are_multiples(index in 0u64..1_000_000, stride in 1u64..100) {
        prop_assert_eq!(is_sampled(index, stride), index % stride == 0);
    }

    /// 清洗结果要么为 0，要么落在 (0, cap] 且等于原值
    #[test]
    fn sanitized_value_in_domain(v in any_depth(), cap in 1.0f32..10_000.0) {
        let out = sanitize_value(v, cap);
        prop_assert!(out.is_finite());
        prop_assert!(out == 0.0 || (out > 0.0 && out <= cap && out == v));
    }

    /// 清洗幂等，且第二次不再替换任何像素
    #[test]
    fn sanitize_is_idempotent(mut values in prop::collection::vec(any_depth(), 0..256)) {
        sanitize_depth(&mut values, DEFAULT_MAX_DEPTH_MM);
        let once = values.clone();
        let replaced = sanitize_depth(&mut values, DEFAULT_MAX_DEPTH_MM);
        prop_assert_eq!(replaced, 0);
        prop_assert_eq!(
            once.iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
            values.iter().map(|v| v.to_bits()).collect::<Vec<_>>()
        );
    }

    /// 文件名按帧序号排序与按字典序排序一致
    #[test]
    fn frame_stem_sorts_lexically(a in 0u64..1_000_000, b in 0u64..1_000_000) {
        let (sa, sb) = (frame_stem(a), frame_stem(b));
        prop_assert_eq!(sa.len(), INDEX_WIDTH);
        prop_assert_eq!(a.cmp(&b), sa.cmp(&sb));
    }
}
