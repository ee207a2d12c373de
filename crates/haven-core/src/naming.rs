//! 将用户标识等外部输入转换为安全的文件名。

/// 字母、数字、`-`、`_` 原样保留，其余字节编码为 `%XX`
pub fn file_safe_name(raw: &str) -> String {
    let mut name = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            name.push(byte as char);
        } else {
            name.push_str(&format!("%{:02X}", byte));
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_safe_name() {
        assert_eq!(file_safe_name("user-1_a"), "user-1_a");
        assert_eq!(file_safe_name("../etc"), "%2E%2E%2Fetc");
        assert_eq!(file_safe_name("a@b.c"), "a%40b%2Ec");
        assert_ne!(file_safe_name("a/b"), file_safe_name("a_b"));
    }
}
