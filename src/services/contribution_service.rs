//! Contribution calendar
//!
//! 按发布日期统计一年内的文章和生活记录，供前端绘制热力图。
//! 只返回有记录的日期。

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};
use ts_rs::TS;

use super::life_service::PAGE_TYPE_LIFE;
use super::post_service::PAGE_TYPE_POST;
use crate::api::services::types::TS_EXPORT_PATH;
use crate::errors::{AppError, Result};
use crate::storage::SeaOrmStorage;
use crate::utils::text::truncate_chars;

use migration::entities::{life_record, post};

const LIFE_TITLE_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ContributionType {
    #[default]
    All,
    Post,
    Life,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContributionQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub year: Option<String>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct ContributionItem {
    pub id: i64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub published_at: String,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct ContributionDay {
    pub date: String,
    /// post | life | both
    #[serde(rename = "type")]
    pub kind: String,
    pub count: u32,
    pub posts: Vec<ContributionItem>,
    pub life_records: Vec<ContributionItem>,
}

impl ContributionDay {
    fn empty(date: String) -> Self {
        Self {
            date,
            kind: String::new(),
            count: 0,
            posts: Vec::new(),
            life_records: Vec::new(),
        }
    }

    fn refresh_kind(&mut self) {
        self.count = (self.posts.len() + self.life_records.len()) as u32;
        self.kind = match (self.posts.is_empty(), self.life_records.is_empty()) {
            (false, false) => "both",
            (false, true) => PAGE_TYPE_POST,
            _ => PAGE_TYPE_LIFE,
        }
        .to_string();
    }
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct ContributionCalendar {
    pub year: i32,
    #[serde(rename = "type")]
    pub kind: String,
    pub total: u32,
    pub days: Vec<ContributionDay>,
}

fn parse_year(raw: Option<&str>) -> Result<i32> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(Utc::now().year()),
        Some(s) => s
            .parse::<i32>()
            .ok()
            .filter(|y| (1970..=9999).contains(y))
            .ok_or_else(|| AppError::field("year", format!("invalid year '{}'", s))),
    }
}

fn year_range(year: i32) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let bound = |y: i32| {
        NaiveDate::from_ymd_opt(y, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
            .ok_or_else(|| AppError::field("year", format!("invalid year '{}'", y)))
    };
    Ok((bound(year)?, bound(year + 1)?))
}

fn post_item(p: &post::Model, at: DateTime<Utc>) -> ContributionItem {
    ContributionItem {
        id: p.id,
        title: p.title.clone(),
        slug: Some(p.slug.clone()),
        kind: PAGE_TYPE_POST.to_string(),
        published_at: at.to_rfc3339_opts(SecondsFormat::Secs, true),
    }
}

fn life_item(l: &life_record::Model, at: DateTime<Utc>) -> ContributionItem {
    let title = if l.title.is_empty() {
        truncate_chars(&l.content, LIFE_TITLE_CHARS)
    } else {
        l.title.clone()
    };
    ContributionItem {
        id: l.id,
        title,
        slug: None,
        kind: PAGE_TYPE_LIFE.to_string(),
        published_at: at.to_rfc3339_opts(SecondsFormat::Secs, true),
    }
}

/// 按日期归并，日期升序
fn build_days(posts: &[post::Model], life: &[life_record::Model]) -> Vec<ContributionDay> {
    fn slot(days: &mut BTreeMap<String, ContributionDay>, at: DateTime<Utc>) -> &mut ContributionDay {
        let key = at.format("%Y-%m-%d").to_string();
        days.entry(key.clone())
            .or_insert_with(|| ContributionDay::empty(key))
    }

    let mut days = BTreeMap::new();
    for p in posts {
        if let Some(at) = p.published_at {
            slot(&mut days, at).posts.push(post_item(p, at));
        }
    }
    for l in life {
        if let Some(at) = l.published_at {
            slot(&mut days, at).life_records.push(life_item(l, at));
        }
    }

    days.into_values()
        .map(|mut day| {
            day.refresh_kind();
            day
        })
        .collect()
}

pub struct ContributionService {
    storage: Arc<SeaOrmStorage>,
}

impl ContributionService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    pub async fn calendar(&self, query: &ContributionQuery) -> Result<ContributionCalendar> {
        let kind = match query.kind.as_deref().filter(|k| !k.is_empty()) {
            None => ContributionType::All,
            Some(raw) => raw.parse().map_err(|_| {
                AppError::field("type", "type must be all, post or life")
            })?,
        };
        let year = parse_year(query.year.as_deref())?;
        let (start, end) = year_range(year)?;

        let posts = if kind != ContributionType::Life {
            self.storage.posts_published_between(start, end).await?
        } else {
            Vec::new()
        };
        let life = if kind != ContributionType::Post {
            self.storage.life_published_between(start, end).await?
        } else {
            Vec::new()
        };

        let days = build_days(&posts, &life);
        Ok(ContributionCalendar {
            year,
            kind: kind.as_ref().to_string(),
            total: days.iter().map(|d| d.count).sum(),
            days,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn post_at(id: i64, at: DateTime<Utc>) -> post::Model {
        post::Model {
            id,
            title: format!("post {}", id),
            slug: format!("post-{}", id),
            content: String::new(),
            excerpt: String::new(),
            cover_image: String::new(),
            status: "published".into(),
            view_count: 0,
            author_id: 1,
            published_at: Some(at),
            created_at: at,
            updated_at: at,
            deleted_at: None,
        }
    }

    fn life_at(id: i64, title: &str, content: &str, at: DateTime<Utc>) -> life_record::Model {
        life_record::Model {
            id,
            title: title.into(),
            content: content.into(),
            cover_image: String::new(),
            status: "published".into(),
            author_id: 1,
            view_count: 0,
            published_at: Some(at),
            created_at: at,
            updated_at: at,
            deleted_at: None,
        }
    }

    #[test]
    fn test_parse_year() {
        assert_eq!(parse_year(Some("2023")).unwrap(), 2023);
        assert_eq!(parse_year(None).unwrap(), Utc::now().year());
        assert!(parse_year(Some("20x3")).is_err());
        assert!(parse_year(Some("123")).is_err());
    }

    #[test]
    fn test_build_days_merges_by_date() {
        let d1 = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let d1_late = Utc.with_ymd_and_hms(2024, 3, 1, 20, 0, 0).unwrap();
        let d2 = Utc.with_ymd_and_hms(2024, 2, 10, 9, 0, 0).unwrap();

        let long = "字".repeat(60);
        let days = build_days(
            &[post_at(1, d1), post_at(2, d2)],
            &[life_at(3, "", &long, d1_late)],
        );

        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, "2024-02-10");
        assert_eq!(days[0].kind, "post");
        assert_eq!(days[1].kind, "both");
        assert_eq!(days[1].count, 2);
        let life_title = &days[1].life_records[0].title;
        assert!(life_title.ends_with("..."));
        assert_eq!(life_title.chars().count(), LIFE_TITLE_CHARS + 3);
        assert_eq!(days[1].posts[0].slug.as_deref(), Some("post-1"));
        assert_eq!(days[1].posts[0].published_at, "2024-03-01T09:00:00Z");
    }
}
