pub mod analytics_event;
pub mod bill;
pub mod category;
pub mod comment;
pub mod life_record;
pub mod page_view;
pub mod post;
pub mod post_tag;
pub mod site_config;
pub mod tag;
pub mod user;

pub use analytics_event::Entity as AnalyticsEventEntity;
pub use bill::Entity as BillEntity;
pub use category::Entity as CategoryEntity;
pub use comment::Entity as CommentEntity;
pub use life_record::Entity as LifeRecordEntity;
pub use page_view::Entity as PageViewEntity;
pub use post::Entity as PostEntity;
pub use post_tag::Entity as PostTagEntity;
pub use site_config::Entity as SiteConfigEntity;
pub use tag::Entity as TagEntity;
pub use user::Entity as UserEntity;
