//! # cephkey
//!
//! Keyring provisioning and inspection for Ceph cluster daemons.
//!
//! This library provides:
//! - Desired-state reconciliation of authentication keyrings by driving the
//!   external `ceph-authtool` command, directly or wrapped in a container
//! - Random secret generation through the same tool
//! - A read-only existence check for previously materialized keys
//! - An IP-range filter for templating contexts
//!
//! ## Reconciliation flow
//!
//! ```text
//!   KeyParams ──► Reconciler ──► command::build ──► Invoker ──► result
//!                     │                │
//!                     │                └─ caps::encode (ordered flags)
//!                     └─ keyring::load_entry (idempotency check)
//! ```
//!
//! External command execution sits behind the [`invoke::Invoker`] trait so
//! tests assert on exact argument vectors without spawning processes.
//!
//! ## Modules
//! - `config`: immutable per-invocation parameters with upstream defaults
//! - `caps`: ordered capability sets and their flag encoding
//! - `command`: ceph-authtool argument assembly and container wrapping
//! - `reconcile`: the present/absent/generate_secret state machine
//! - `query`: key-info existence check
//! - `ipfilter`: `ips_in_ranges`

pub mod caps;
pub mod command;
pub mod config;
pub mod error;
pub mod fileattr;
pub mod invoke;
pub mod ipfilter;
pub mod keyring;
pub mod query;
pub mod reconcile;
pub mod secret;

pub use caps::{Capability, CapabilitySet, EncodeStyle};
pub use config::{InfoParams, KeyIdentity, KeyParams};
pub use error::{KeyError, KeyResult};
pub use invoke::{CommandOutput, HostInvoker, Invocation, Invoker};
pub use ipfilter::ips_in_ranges;
pub use reconcile::{DesiredState, ReconcileError, ReconciliationResult, Reconciler};
