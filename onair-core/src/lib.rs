//! # onair Core
//!
//! Control plane for the onair streaming admin backend. It decides what is
//! allowed to run and when.
//!
//! ## Overview
//!
//! - **Runner election**: heartbeat-based single-leader lock over one shared slot
//! - **Schedule materialization**: eligible schedules become queued sessions, at
//!   most one active session per schedule
//! - **License lifecycle**: activation, lease renewal, backdated outage grace
//! - **Downgrade cascade**: all-or-nothing demotion of premium jobs with
//!   restorable backups
//!
//! ## Architecture
//!
//! - [`database`]: repository ports, Postgres adapters, and an in-memory store
//! - [`application`]: the [`AppUnitOfWork`] bundle of ports handed to services
//! - [`domain`]: runner, license, job, and session services
//! - [`clock`]: injectable time source
//!
//! ## Feature Flags
//!
//! - `postgres-tests`: compiles the adapter tests that need a live database

pub mod application;
pub mod clock;
pub mod crypto;
pub mod database;
pub mod domain;
pub mod error;

pub use application::AppUnitOfWork;
pub use clock::{Clock, ManualClock, SystemClock};
pub use crypto::{SecretHasher, SecretHasherError};
pub use error::{CoreError, Result};

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
