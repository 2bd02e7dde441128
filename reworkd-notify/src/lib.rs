//! # reworkd-notify
//!
//! Notification layer for reworkd.
//!
//! This crate provides:
//! - The `Notifier` trait consumed by the controller
//! - A topic-keyed in-process bus with retained messages
//! - The station state topic convention

pub mod bus;

pub use bus::{station_state_topic, Notification, Notifier, QoS, TopicBus, TopicSubscription};
