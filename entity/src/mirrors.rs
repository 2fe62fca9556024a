//! # 镜像注册实体定义
//!
//! `mirrors` 表的 Sea-ORM 实体模型：slug 与目标站点 origin 的映射

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 镜像注册实体
///
/// 一条记录对应一个已注册的目标站点。`target_origin` 一经创建不再变更，
/// 管理端只能切换 `disabled` 开关。
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "mirrors")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// URL 安全的短标识，全表唯一
    #[sea_orm(unique)]
    pub slug: String,
    /// `<scheme>://<host>[:<port>]`，不含路径
    pub target_origin: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    /// 最近一次观测到的非空路径（含查询串）
    pub last_path: Option<String>,
    pub disabled: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
