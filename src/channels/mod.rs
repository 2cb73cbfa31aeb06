//! Chat channels.

pub mod whatsapp;

pub use whatsapp::{OutboundPayload, RecordingTransport, Transport, WhatsAppClient, WhatsAppConfig};
