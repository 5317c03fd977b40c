//! A tiny identity-mapped record mapper.
//!
//! A [`Mapper`] converts rows of one table into [`Record`]s and keeps every fetched
//! row in an identity map, so all lookups of the same id share one [`Handle`].
//! Storage is reached through a [`Gateway`], with sled and SQLite implementations.

pub mod entity;
pub use entity::{Column, Entity, Row, Schema};

pub mod gateway;
pub use gateway::{Gateway, Outcome, Query, SledGateway, SqliteGateway, Statement};

pub mod mapper;
pub use mapper::Mapper;

pub mod record;
pub use record::{Handle, Record};

pub mod result;
pub use result::{DbResult, TinyOrmError};

pub mod value;
pub use value::{Field, SqlType, Value};

mod encoding;

#[cfg(feature = "derive")]
pub use tinyorm_derive::Entity;
