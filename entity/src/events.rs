//! # 事件日志实体定义
//!
//! `events` 表的 Sea-ORM 实体模型：只追加的审计记录

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 审计事件实体
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub at: DateTimeUtc,
    /// info / warn / error
    pub level: String,
    /// resolve / resolve-fail / proxy-error / ssrf-blocked / cache-hit /
    /// cache-miss / cache-purge / admin-action / upstream-timeout
    pub kind: String,
    pub slug: Option<String>,
    pub message: String,
    /// 结构化补充信息（JSON 字符串）
    pub meta_json: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
