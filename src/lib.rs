//! Order Assist — chat-channel front-end for food ordering.

pub mod address;
pub mod channels;
pub mod config;
pub mod conversation;
pub mod customer;
pub mod delivery;
pub mod error;
pub mod gateway;
pub mod geocode;
pub mod service;
pub mod store;
