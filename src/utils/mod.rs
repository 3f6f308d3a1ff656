pub mod ip;
pub mod password;
pub mod text;
pub mod user_agent;
pub mod validators;

/// 生成指定长度的随机字母数字串
pub fn generate_random_code(length: usize) -> String {
    const CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

    std::iter::repeat_with(|| CHARS[rand::random_range(0..CHARS.len())] as char)
        .take(length)
        .collect()
}

/// 生成小写随机串（slug 去重后缀等）
pub fn generate_random_suffix(length: usize) -> String {
    const CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

    std::iter::repeat_with(|| CHARS[rand::random_range(0..CHARS.len())] as char)
        .take(length)
        .collect()
}

/// 金额保留两位小数
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
