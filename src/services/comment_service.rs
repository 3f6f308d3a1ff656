//! Comment service
//!
//! 评论审核与楼中楼：
//! - 首次评论（该邮箱没有任何非垃圾评论）进入待审核，之后自动通过
//! - 列表只展示已审核的顶层评论，每条附带最近 N 条回复
//! - 回复统一挂在顶层评论下，`reply_to_id` 记录 @ 的对象
//!
//! 回复通过一次 `parent_id IN (...)` 查询取回，再按 parent_id 分组。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue::NotSet, Set};
use serde::{Deserialize, Serialize};
use tracing::info;
use ts_rs::TS;

use super::post_service::{check_max_len, check_required};
use super::{PageParams, Paginated, Visitor};
use crate::api::constants::messages;
use crate::api::services::types::TS_EXPORT_PATH;
use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::storage::SeaOrmStorage;
use crate::storage::backend::{
    AdminCommentFilter, CommentTarget, STATUS_APPROVED, STATUS_PENDING, STATUS_SPAM,
};
use crate::utils::validators::is_valid_email;

use migration::entities::comment;

const GUESTBOOK_LIMIT: u64 = 20;
const NICKNAME_MAX: usize = 50;
const EMAIL_MAX: usize = 100;
const URL_MAX: usize = 500;
const CONTENT_MAX: usize = 2000;

// ============ Request/Response DTOs ============

/// `GET /comments?post_id|life_record_id&email`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentListQuery {
    pub post_id: Option<i64>,
    pub life_record_id: Option<i64>,
    /// 请求者邮箱，用于带出自己的待审核评论
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCommentRequest {
    pub post_id: Option<i64>,
    pub life_record_id: Option<i64>,
    /// 留言板评论
    #[serde(default)]
    pub guestbook: bool,
    pub parent_id: Option<i64>,
    pub reply_to_id: Option<i64>,
    pub nickname: String,
    pub email: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub website: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminCommentListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<String>,
    pub is_pinned: Option<bool>,
    pub post_id: Option<i64>,
    pub life_record_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCommentStatusRequest {
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminReplyRequest {
    pub content: String,
}

/// 前台评论（不含邮箱和 IP）
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct CommentView {
    pub id: i64,
    pub post_id: Option<i64>,
    pub life_record_id: Option<i64>,
    pub parent_id: Option<i64>,
    pub reply_to_id: Option<i64>,
    pub nickname: String,
    pub avatar: String,
    pub website: String,
    pub content: String,
    pub is_admin: bool,
    pub is_pinned: bool,
    pub status: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub replies: Vec<CommentView>,
    pub reply_count: usize,
    pub has_more: bool,
}

/// 后台评论（含邮箱、IP 与目标标题）
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct AdminCommentView {
    pub id: i64,
    pub post_id: Option<i64>,
    pub life_record_id: Option<i64>,
    pub parent_id: Option<i64>,
    pub reply_to_id: Option<i64>,
    pub nickname: String,
    pub email: String,
    pub avatar: String,
    pub website: String,
    pub content: String,
    pub is_admin: bool,
    pub is_pinned: bool,
    pub status: String,
    pub ip_address: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub life_title: Option<String>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct CreateCommentResult {
    pub id: i64,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct PinResult {
    pub id: i64,
    pub is_pinned: bool,
}

impl From<comment::Model> for CommentView {
    fn from(c: comment::Model) -> Self {
        Self {
            id: c.id,
            post_id: c.post_id,
            life_record_id: c.life_record_id,
            parent_id: c.parent_id,
            reply_to_id: c.reply_to_id,
            nickname: c.nickname,
            avatar: c.avatar,
            website: c.website,
            content: c.content,
            is_admin: c.is_admin,
            is_pinned: c.is_pinned,
            status: c.status,
            created_at: c.created_at,
            replies: Vec::new(),
            reply_count: 0,
            has_more: false,
        }
    }
}

impl From<comment::Model> for AdminCommentView {
    fn from(c: comment::Model) -> Self {
        Self {
            id: c.id,
            post_id: c.post_id,
            life_record_id: c.life_record_id,
            parent_id: c.parent_id,
            reply_to_id: c.reply_to_id,
            nickname: c.nickname,
            email: c.email,
            avatar: c.avatar,
            website: c.website,
            content: c.content,
            is_admin: c.is_admin,
            is_pinned: c.is_pinned,
            status: c.status,
            ip_address: c.ip_address,
            created_at: c.created_at,
            post_title: None,
            life_title: None,
        }
    }
}

fn check_comment_status(status: &str) -> Result<()> {
    match status {
        STATUS_PENDING | STATUS_APPROVED | STATUS_SPAM => Ok(()),
        _ => Err(AppError::field(
            "status",
            "status must be pending, approved or spam",
        )),
    }
}

fn validate_create(req: &CreateCommentRequest) -> Result<()> {
    check_required("nickname", &req.nickname)?;
    check_max_len("nickname", &req.nickname, NICKNAME_MAX)?;
    check_required("email", &req.email)?;
    check_max_len("email", &req.email, EMAIL_MAX)?;
    if !is_valid_email(req.email.trim()) {
        return Err(AppError::field("email", "email is invalid"));
    }
    check_max_len("avatar", &req.avatar, URL_MAX)?;
    check_max_len("website", &req.website, URL_MAX)?;
    check_required("content", &req.content)?;
    check_max_len("content", &req.content, CONTENT_MAX)
}

/// 按 parent_id 分组回复，每组保留前 `limit` 条（已按时间倒序）
///
/// 返回 parent_id -> (展示的回复, 回复总数)
fn group_replies(
    replies: Vec<comment::Model>,
    limit: usize,
) -> HashMap<i64, (Vec<CommentView>, usize)> {
    let mut grouped: HashMap<i64, (Vec<CommentView>, usize)> = HashMap::new();
    for reply in replies {
        let Some(parent_id) = reply.parent_id else {
            continue;
        };
        let entry = grouped.entry(parent_id).or_default();
        entry.1 += 1;
        if entry.0.len() < limit {
            entry.0.push(reply.into());
        }
    }
    grouped
}

/// 回复挂载位置：被回复的评论本身是回复时，挂到它所在的顶层评论
fn thread_root(parent: &comment::Model) -> i64 {
    parent.parent_id.unwrap_or(parent.id)
}

// ============ CommentService ============

pub struct CommentService {
    storage: Arc<SeaOrmStorage>,
    config: Arc<AppConfig>,
}

impl CommentService {
    pub fn new(storage: Arc<SeaOrmStorage>, config: Arc<AppConfig>) -> Self {
        Self { storage, config }
    }

    pub async fn list(&self, query: &CommentListQuery) -> Result<Vec<CommentView>> {
        let target = CommentTarget::from_ids(query.post_id, query.life_record_id);
        let limit = (target == CommentTarget::Guestbook).then_some(GUESTBOOK_LIMIT);

        let approved = self
            .storage
            .approved_top_level_comments(target, limit)
            .await?;

        let email = query.email.as_deref().map(str::trim).filter(|e| !e.is_empty());
        let mut comments = match email {
            Some(email) => self.storage.pending_comments_by_email(target, email).await?,
            None => Vec::new(),
        };
        comments.extend(approved);

        let mut seen = HashSet::new();
        comments.retain(|c| seen.insert(c.id));

        let ids: Vec<i64> = comments.iter().map(|c| c.id).collect();
        let replies = self.storage.approved_replies_for(&ids).await?;
        let mut grouped = group_replies(replies, self.config.content.reply_limit as usize);

        // 提交者自己待审核的回复排在已审核回复之前，不计入 reply_count
        let mut own_pending = match email {
            Some(email) => group_replies(
                self.storage.pending_replies_by_email(&ids, email).await?,
                usize::MAX,
            ),
            None => HashMap::new(),
        };

        Ok(comments
            .into_iter()
            .map(|c| {
                let mut view = CommentView::from(c);
                if let Some((shown, count)) = grouped.remove(&view.id) {
                    view.has_more = count > shown.len();
                    view.reply_count = count;
                    view.replies = shown;
                }
                if let Some((mut mine, _)) = own_pending.remove(&view.id) {
                    let seen: HashSet<i64> = mine.iter().map(|r| r.id).collect();
                    mine.extend(view.replies.drain(..).filter(|r| !seen.contains(&r.id)));
                    view.replies = mine;
                }
                view
            })
            .collect())
    }

    /// 解析评论挂载目标，返回 (target, parent_id, reply_to_id)
    async fn resolve_target(
        &self,
        req: &CreateCommentRequest,
    ) -> Result<(CommentTarget, Option<i64>, Option<i64>)> {
        if let Some(parent_id) = req.parent_id {
            let parent = self
                .storage
                .find_comment(parent_id)
                .await?
                .ok_or_else(|| AppError::not_found("parent comment not found"))?;
            let root = thread_root(&parent);

            let reply_to = match req.reply_to_id {
                None => parent.id,
                Some(id) if id == parent.id => id,
                Some(id) => {
                    let in_thread = self
                        .storage
                        .find_comment(id)
                        .await?
                        .is_some_and(|c| c.id == root || c.parent_id == Some(root));
                    if !in_thread {
                        return Err(AppError::field(
                            "reply_to_id",
                            "reply target is not in the same thread",
                        ));
                    }
                    id
                }
            };
            return Ok((CommentTarget::of(&parent), Some(root), Some(reply_to)));
        }

        if req.reply_to_id.is_some() {
            return Err(AppError::field(
                "reply_to_id",
                "reply_to_id requires parent_id",
            ));
        }

        if let Some(post_id) = req.post_id {
            self.storage
                .find_post(post_id)
                .await?
                .ok_or_else(|| AppError::not_found("post not found"))?;
            return Ok((CommentTarget::Post(post_id), None, None));
        }
        if let Some(life_id) = req.life_record_id {
            self.storage
                .find_life(life_id)
                .await?
                .ok_or_else(|| AppError::not_found("life record not found"))?;
            return Ok((CommentTarget::Life(life_id), None, None));
        }
        if req.guestbook {
            return Ok((CommentTarget::Guestbook, None, None));
        }

        Err(AppError::validation("comment target is required"))
    }

    pub async fn create(
        &self,
        req: CreateCommentRequest,
        visitor: &Visitor,
    ) -> Result<CreateCommentResult> {
        validate_create(&req)?;
        let (target, parent_id, reply_to_id) = self.resolve_target(&req).await?;

        let email = req.email.trim().to_string();
        let (status, message) = if self.storage.has_approved_comment(&email).await? {
            (STATUS_APPROVED, messages::COMMENT_APPROVED)
        } else {
            (STATUS_PENDING, messages::COMMENT_PENDING)
        };

        let now = Utc::now();
        let saved = self
            .storage
            .insert_comment(comment::ActiveModel {
                id: NotSet,
                post_id: Set(target.post_id()),
                life_record_id: Set(target.life_record_id()),
                parent_id: Set(parent_id),
                reply_to_id: Set(reply_to_id),
                nickname: Set(req.nickname.trim().to_string()),
                email: Set(email),
                avatar: Set(req.avatar),
                website: Set(req.website),
                content: Set(req.content),
                is_admin: Set(false),
                is_pinned: Set(false),
                status: Set(status.to_string()),
                ip_address: Set(visitor.ip.clone()),
                user_agent: Set(visitor.user_agent.clone()),
                created_at: Set(now),
                updated_at: Set(now),
                deleted_at: Set(None),
            })
            .await?;

        info!(
            "CommentService: new comment {} on {:?} ({})",
            saved.id, target, status
        );
        Ok(CreateCommentResult {
            id: saved.id,
            status: status.to_string(),
            message: message.to_string(),
        })
    }

    // ============ 后台 ============

    pub async fn admin_list(
        &self,
        query: &AdminCommentListQuery,
    ) -> Result<Paginated<AdminCommentView>> {
        let params = PageParams::new(query.page, query.limit);
        let filter = AdminCommentFilter {
            status: query.status.clone().filter(|s| !s.is_empty()),
            is_pinned: query.is_pinned,
            post_id: query.post_id,
            life_record_id: query.life_record_id,
        };
        let (comments, total) = self
            .storage
            .list_comments_admin(&filter, params.page, params.limit)
            .await?;

        let post_ids: Vec<i64> = comments.iter().filter_map(|c| c.post_id).collect();
        let life_ids: Vec<i64> = comments.iter().filter_map(|c| c.life_record_id).collect();
        let post_titles = self.storage.post_titles(&post_ids).await?;
        let life_titles = self.storage.life_titles(&life_ids).await?;

        let items = comments
            .into_iter()
            .map(|c| {
                let post_title = c.post_id.and_then(|id| post_titles.get(&id).cloned());
                let life_title = c.life_record_id.and_then(|id| life_titles.get(&id).cloned());
                let mut view = AdminCommentView::from(c);
                view.post_title = post_title;
                view.life_title = life_title;
                view
            })
            .collect();
        Ok(Paginated::new(items, params, total))
    }

    pub async fn update_status(&self, id: i64, status: &str) -> Result<AdminCommentView> {
        check_comment_status(status)?;
        if !self.storage.set_comment_status(id, status).await? {
            return Err(AppError::not_found("comment not found"));
        }
        let updated = self
            .storage
            .find_comment(id)
            .await?
            .ok_or_else(|| AppError::not_found("comment not found"))?;
        info!("CommentService: comment {} -> {}", id, status);
        Ok(updated.into())
    }

    /// 切换置顶；回复不能置顶
    pub async fn toggle_pin(&self, id: i64) -> Result<PinResult> {
        let current = self
            .storage
            .find_comment(id)
            .await?
            .ok_or_else(|| AppError::not_found("comment not found"))?;
        if current.parent_id.is_some() {
            return Err(AppError::CommentNotTopLevel(
                "only top-level comments can be pinned".to_string(),
            ));
        }

        let pinned = !current.is_pinned;
        self.storage.set_comment_pinned(id, pinned).await?;
        Ok(PinResult {
            id,
            is_pinned: pinned,
        })
    }

    /// 软删除评论及其直接回复
    pub async fn delete(&self, id: i64) -> Result<()> {
        if !self.storage.soft_delete_comment_thread(id).await? {
            return Err(AppError::not_found("comment not found"));
        }
        info!("CommentService: deleted comment {} with its replies", id);
        Ok(())
    }

    /// 管理员回复：直接通过，昵称与邮箱取自当前登录用户
    pub async fn admin_reply(
        &self,
        parent_id: i64,
        content: &str,
        admin_id: i64,
        visitor: &Visitor,
    ) -> Result<CommentView> {
        check_required("content", content)?;
        check_max_len("content", content, CONTENT_MAX)?;

        let parent = self
            .storage
            .find_comment(parent_id)
            .await?
            .ok_or_else(|| AppError::not_found("comment not found"))?;
        let admin = self
            .storage
            .find_user_by_id(admin_id)
            .await?
            .ok_or_else(|| AppError::not_found("user not found"))?;

        let target = CommentTarget::of(&parent);
        let now = Utc::now();
        let reply = self
            .storage
            .insert_comment(comment::ActiveModel {
                id: NotSet,
                post_id: Set(target.post_id()),
                life_record_id: Set(target.life_record_id()),
                parent_id: Set(Some(thread_root(&parent))),
                reply_to_id: Set(Some(parent.id)),
                nickname: Set(admin.username),
                email: Set(admin.email),
                avatar: Set(admin.avatar),
                website: Set(String::new()),
                content: Set(content.to_string()),
                is_admin: Set(true),
                is_pinned: Set(false),
                status: Set(STATUS_APPROVED.to_string()),
                ip_address: Set(visitor.ip.clone()),
                user_agent: Set(visitor.user_agent.clone()),
                created_at: Set(now),
                updated_at: Set(now),
                deleted_at: Set(None),
            })
            .await?;
        Ok(reply.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(id: i64, parent_id: Option<i64>) -> comment::Model {
        let now = Utc::now();
        comment::Model {
            id,
            post_id: Some(1),
            life_record_id: None,
            parent_id,
            reply_to_id: parent_id,
            nickname: format!("n{}", id),
            email: "a@x.com".into(),
            avatar: String::new(),
            website: String::new(),
            content: "hi".into(),
            is_admin: false,
            is_pinned: false,
            status: STATUS_APPROVED.into(),
            ip_address: "1.2.3.4".into(),
            user_agent: String::new(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn test_group_replies_caps_and_counts() {
        let replies = (10..15).map(|id| comment(id, Some(1))).collect();
        let grouped = group_replies(replies, 3);
        let (shown, count) = &grouped[&1];
        assert_eq!(shown.len(), 3);
        assert_eq!(*count, 5);
        assert_eq!(shown[0].id, 10);
    }

    #[test]
    fn test_thread_root() {
        assert_eq!(thread_root(&comment(1, None)), 1);
        assert_eq!(thread_root(&comment(7, Some(1))), 1);
    }

    #[test]
    fn test_public_view_hides_email() {
        let json = serde_json::to_value(CommentView::from(comment(1, None))).unwrap();
        assert!(json.get("email").is_none());
        assert!(json.get("ip_address").is_none());
        assert!(json.get("replies").is_none());
    }

    #[test]
    fn test_validate_create() {
        let mut req = CreateCommentRequest {
            nickname: "A".into(),
            email: "a@x.com".into(),
            content: "hi".into(),
            life_record_id: Some(5),
            ..Default::default()
        };
        assert!(validate_create(&req).is_ok());

        req.email = "not-an-email".into();
        assert!(validate_create(&req).is_err());

        req.email = "a@x.com".into();
        req.content = "x".repeat(2001);
        assert!(validate_create(&req).is_err());
    }

    #[test]
    fn test_status_enum() {
        assert!(check_comment_status("spam").is_ok());
        assert!(check_comment_status("deleted").is_err());
    }
}
