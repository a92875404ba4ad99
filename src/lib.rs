//! # LexCRM Functions
//!
//! Server-side functions of the LexCRM legal-office CRM: the notification
//! scheduler, public document template filling, and signer verification codes.

pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod documents;
pub mod error;
pub mod handlers;
pub mod mail;
pub mod models;
pub mod notifications;
pub mod otp;
pub mod repositories;
pub mod server;
pub mod storage;
pub mod telemetry;
pub use migration;
