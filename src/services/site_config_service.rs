//! Site config service
//!
//! 站点配置是一张 key/value 表。非字符串的值以 JSON 文本存储，
//! `type = json` 的条目在读取时再解析回 JSON。

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::post_service::{check_max_len, check_required};
use crate::errors::{AppError, Result};
use crate::storage::SeaOrmStorage;

use migration::entities::site_config;

pub mod keys {
    pub const SITE_LOGO: &str = "site_logo";
    pub const SITE_NAME: &str = "site_name";
    pub const SITE_ICP: &str = "site_icp";
    pub const HOME_AVATAR: &str = "home_avatar";
    pub const HOME_NICKNAME: &str = "home_nickname";
    pub const HOME_ABOUT: &str = "home_about";
    pub const FOOTER_LEFT_IMAGE: &str = "footer_left_image";
    pub const FOOTER_LEFT_NAME: &str = "footer_left_name";
    pub const FOOTER_LEFT_DESCRIPTION: &str = "footer_left_description";
    pub const FOOTER_RIGHT_LINKS: &str = "footer_right_links";
}

pub const TYPE_STRING: &str = "string";
pub const TYPE_JSON: &str = "json";
pub const TYPE_IMAGE: &str = "image";
const KEY_MAX: usize = 100;

// ============ Request/Response DTOs ============

#[derive(Debug, Clone, Deserialize)]
pub struct ConfigItem {
    pub key: String,
    #[serde(default)]
    pub value: Value,
    #[serde(rename = "type", default)]
    pub value_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateConfigRequest {
    pub configs: Vec<ConfigItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FooterLink {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FooterCategory {
    pub category: String,
    #[serde(default)]
    pub links: Vec<FooterLink>,
}

/// `GET /api/config` 的聚合视图
#[derive(Debug, Clone, Default, Serialize)]
pub struct SiteConfigView {
    pub site_logo: String,
    pub site_name: String,
    pub site_icp: String,
    pub home_avatar: String,
    pub home_nickname: String,
    pub home_about: String,
    pub footer_left_image: String,
    pub footer_left_name: String,
    pub footer_left_description: String,
    pub footer_right_links: Vec<FooterCategory>,
}

impl SiteConfigView {
    fn from_entries(entries: Vec<site_config::Model>) -> Self {
        let mut view = Self::default();
        for entry in entries {
            let slot = match entry.config_key.as_str() {
                keys::SITE_LOGO => &mut view.site_logo,
                keys::SITE_NAME => &mut view.site_name,
                keys::SITE_ICP => &mut view.site_icp,
                keys::HOME_AVATAR => &mut view.home_avatar,
                keys::HOME_NICKNAME => &mut view.home_nickname,
                keys::HOME_ABOUT => &mut view.home_about,
                keys::FOOTER_LEFT_IMAGE => &mut view.footer_left_image,
                keys::FOOTER_LEFT_NAME => &mut view.footer_left_name,
                keys::FOOTER_LEFT_DESCRIPTION => &mut view.footer_left_description,
                keys::FOOTER_RIGHT_LINKS => {
                    match serde_json::from_str(&entry.value) {
                        Ok(links) => view.footer_right_links = links,
                        Err(e) => warn!("Invalid footer_right_links config: {}", e),
                    }
                    continue;
                }
                _ => continue,
            };
            *slot = entry.value;
        }
        view
    }
}

/// `type = json` 时解析为 JSON，否则原样返回字符串
fn parse_value(entry: &site_config::Model) -> Value {
    if entry.value_type == TYPE_JSON {
        if let Ok(value) = serde_json::from_str(&entry.value) {
            return value;
        }
    }
    Value::String(entry.value.clone())
}

/// 字符串原样存储，其它值存 JSON 文本
fn encode_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn check_value_type(value_type: &str) -> Result<()> {
    match value_type {
        TYPE_STRING | TYPE_JSON | TYPE_IMAGE => Ok(()),
        _ => Err(AppError::field("type", "type must be string, json or image")),
    }
}

// ============ SiteConfigService ============

pub struct SiteConfigService {
    storage: Arc<SeaOrmStorage>,
}

impl SiteConfigService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    pub async fn public_view(&self) -> Result<SiteConfigView> {
        let entries = self.storage.all_site_configs().await?;
        Ok(SiteConfigView::from_entries(entries))
    }

    /// 后台：原始 key -> value
    pub async fn raw_map(&self) -> Result<BTreeMap<String, Value>> {
        let entries = self.storage.all_site_configs().await?;
        Ok(entries
            .iter()
            .map(|e| (e.config_key.clone(), parse_value(e)))
            .collect())
    }

    /// 批量 upsert；未指定 type 时沿用原类型，新建条目默认 string
    pub async fn update(&self, req: UpdateConfigRequest) -> Result<()> {
        let existing: HashMap<String, String> = self
            .storage
            .all_site_configs()
            .await?
            .into_iter()
            .map(|e| (e.config_key, e.value_type))
            .collect();

        let mut entries = Vec::with_capacity(req.configs.len());
        for item in req.configs {
            let key = item.key.trim().to_string();
            check_required("key", &key)?;
            check_max_len("key", &key, KEY_MAX)?;

            let value_type = match item.value_type.filter(|t| !t.is_empty()) {
                Some(t) => {
                    check_value_type(&t)?;
                    t
                }
                None => existing
                    .get(&key)
                    .cloned()
                    .unwrap_or_else(|| TYPE_STRING.to_string()),
            };
            entries.push((key, encode_value(&item.value), value_type));
        }

        self.storage.upsert_site_configs(&entries).await?;
        info!("SiteConfigService: updated {} config entries", entries.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(key: &str, value: &str, value_type: &str) -> site_config::Model {
        site_config::Model {
            id: 0,
            config_key: key.into(),
            value: value.into(),
            value_type: value_type.into(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_encode_value() {
        assert_eq!(encode_value(&Value::String("hi".into())), "hi");
        assert_eq!(encode_value(&serde_json::json!({"a": 1})), r#"{"a":1}"#);
        assert_eq!(encode_value(&serde_json::json!(3)), "3");
        assert_eq!(encode_value(&Value::Null), "");
    }

    #[test]
    fn test_parse_value_json_only_for_json_type() {
        let json = entry("links", r#"[1,2]"#, "json");
        assert_eq!(parse_value(&json), serde_json::json!([1, 2]));
        let text = entry("name", r#"[1,2]"#, "string");
        assert_eq!(parse_value(&text), Value::String("[1,2]".into()));
        let broken = entry("links", "{oops", "json");
        assert_eq!(parse_value(&broken), Value::String("{oops".into()));
    }

    #[test]
    fn test_view_aggregates_known_keys() {
        let view = SiteConfigView::from_entries(vec![
            entry(keys::SITE_NAME, "inkpost", "string"),
            entry(keys::HOME_ABOUT, "hello", "string"),
            entry(
                keys::FOOTER_RIGHT_LINKS,
                r#"[{"category":"Friends","links":[{"title":"A","url":"https://a.example"}]}]"#,
                "json",
            ),
            entry("unknown_key", "ignored", "string"),
        ]);
        assert_eq!(view.site_name, "inkpost");
        assert_eq!(view.home_about, "hello");
        assert_eq!(view.footer_right_links.len(), 1);
        assert_eq!(view.footer_right_links[0].links[0].title, "A");
    }

    #[test]
    fn test_value_type_enum() {
        assert!(check_value_type("image").is_ok());
        assert!(check_value_type("number").is_err());
    }
}
