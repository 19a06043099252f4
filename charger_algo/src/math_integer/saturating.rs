use crate::Value;

/// Clamps a wide signed intermediate into the `Value` range.
/// Negative results become 0, results above `Value::MAX` saturate.
///
/// # Arguments
/// * `x` - Intermediate result [i64]
///
/// # Returns
/// The clamped value [Value]
#[inline(always)]
pub const fn clamp_to_value(x: i64) -> Value {
    if x < 0 {
        0
    } else if x > Value::MAX as i64 {
        Value::MAX
    } else {
        x as Value
    }
}

/// Divides an accumulated sum by its sample count.
///
/// # Arguments
/// * `sum` - Sum of `count` samples [u64]
/// * `count` - Number of accumulated samples (0 yields 0)
///
/// # Returns
/// The truncated mean, saturated to `Value`
#[inline(always)]
pub const fn average(sum: u64, count: u32) -> Value {
    if count == 0 {
        return 0;
    }
    let avg = sum / count as u64;
    if avg > Value::MAX as u64 {
        Value::MAX
    } else {
        avg as Value
    }
}
