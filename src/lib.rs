//! glpromote - GitLab merge and release automation
//!
//! Lands merge requests into a project's main branch, promotes main into
//! a deploy branch, tags each release with a sequenced version tag and
//! renders the changelog carried by a promotion.
//!
//! The host is reached through the [`platform::HostService`] trait; the
//! flows in [`release::ReleaseCoordinator`] never talk HTTP directly.

pub mod cancel;
pub mod changes;
pub mod config;
pub mod error;
pub mod merge;
pub mod platform;
pub mod progress;
pub mod release;
pub mod types;
