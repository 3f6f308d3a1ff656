//! 密码哈希（Argon2id，PHC 字符串格式）

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::errors::AppError;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_PASSWORD_LEN: usize = 50;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::internal(format!("password hash failed: {}", e)))
}

/// 校验密码；哈希串本身无法解析时视为不匹配
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// 新密码长度校验（按字符计）
pub fn check_password_length(password: &str) -> Result<(), AppError> {
    let len = password.chars().count();
    if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
        return Err(AppError::field(
            "new_password",
            format!(
                "password must be {}-{} characters",
                MIN_PASSWORD_LEN, MAX_PASSWORD_LEN
            ),
        ));
    }
    Ok(())
}

/// 生成随机初始密码
pub fn generate_random_password() -> String {
    super::generate_random_code(16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
    }

    #[test]
    fn test_verify_garbage_hash() {
        assert!(!verify_password("anything", "not-a-phc-string"));
        assert!(!verify_password("anything", ""));
    }

    #[test]
    fn test_password_length() {
        assert!(check_password_length("12345").is_err());
        assert!(check_password_length("123456").is_ok());
        assert!(check_password_length(&"x".repeat(50)).is_ok());
        assert!(check_password_length(&"x".repeat(51)).is_err());
    }

    #[test]
    fn test_random_password() {
        let a = generate_random_password();
        assert_eq!(a.len(), 16);
        assert_ne!(a, generate_random_password());
    }
}
