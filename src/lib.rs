//! Billing Sync - Verified billing webhook ingestion
//!
//! This crate authenticates billing provider webhooks and reconciles each
//! event into the subscription record of the organization it belongs to.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
