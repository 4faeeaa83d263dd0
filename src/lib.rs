//! # Farm Storefront Bot
//!
//! A Telegram storefront for a family honey farm: catalog browsing, a cart
//! with a multi-step checkout, quick orders and customer messages, with every
//! order and message relayed to the farm's admins through a second bot.

pub mod bot;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod db;
pub mod dialogue;
pub mod health;
pub mod instance_lock;
pub mod localization;
pub mod memory_store;
pub mod models;
pub mod notifier;
pub mod session;
pub mod validators;
