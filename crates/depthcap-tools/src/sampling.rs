//! # 抽帧与深度清洗
//!
//! 纯函数，不涉及 IO。

/// 默认抽帧步长（每 20 帧保存 1 帧）
pub const DEFAULT_STRIDE: u64 = 20;

/// 默认深度上限（毫米）
pub const DEFAULT_MAX_DEPTH_MM: f32 = 2000.0;

/// 输出文件名中帧序号的位数
pub const INDEX_WIDTH: usize = 6;

/// 第 `index` 帧是否被抽中
///
/// `stride` 为 0 时按 1 处理。
pub fn is_sampled(index: u64, stride: u64) -> bool {
    index % stride.max(1) == 0
}

/// 长度为 `frames` 的序列中被抽中的帧数，即 `ceil(frames / stride)`
pub fn sampled_count(frames: u64, stride: u64) -> u64 {
    frames.div_ceil(stride.max(1))
}

/// 单个深度值清洗
///
/// 有效范围 `(0, cap]` 内的值原样保留；NaN、±∞、负值和超过上限的值一律置 0
/// （0 表示无有效测量，不截断到上限）。
#[inline]
pub fn sanitize_value(value: f32, cap: f32) -> f32 {
    if value.is_finite() && value > 0.0 && value <= cap {
        value
    } else {
        0.0
    }
}

/// 原地清洗深度图，返回被置 0 的像素数
pub fn sanitize_depth(values: &mut [f32], cap: f32) -> usize {
    let mut replaced = 0;
    for v in values.iter_mut() {
        let clean = sanitize_value(*v, cap);
        if clean.to_bits() != v.to_bits() {
            replaced += 1;
        }
        *v = clean;
    }
    replaced
}

/// 零填充的帧序号文件名（不含扩展名）
pub fn frame_stem(index: u64) -> String {
    format!("{index:0width$}", width = INDEX_WIDTH)
}
