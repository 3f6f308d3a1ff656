//! User-Agent 解析（woothee）

use woothee::parser::Parser;

/// 从 UA 推断出的访问设备信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// desktop | mobile | tablet | bot
    pub device_type: String,
    pub browser: String,
    pub os: String,
}

const UNKNOWN: &str = "UNKNOWN";

pub fn detect_device(user_agent: &str) -> DeviceInfo {
    let parsed = Parser::new().parse(user_agent).unwrap_or_default();

    let device_type = if user_agent.contains("iPad") || user_agent.contains("Tablet") {
        "tablet"
    } else {
        match parsed.category {
            "smartphone" | "mobilephone" => "mobile",
            "crawler" => "bot",
            _ => "desktop",
        }
    };

    let known = |s: &str| {
        if s.is_empty() || s == UNKNOWN {
            "Other".to_string()
        } else {
            s.to_string()
        }
    };

    DeviceInfo {
        device_type: device_type.to_string(),
        browser: known(parsed.name),
        os: known(parsed.os),
    }
}
