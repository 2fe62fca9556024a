//! # Entity 模块
//!
//! 包含所有 Sea-ORM 实体定义

pub mod events;
pub mod mirrors;

pub use events::Entity as Events;
pub use mirrors::Entity as Mirrors;
