// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod meeting;
pub mod refresh_token;
pub mod user;

pub use meeting::{ActionItem, Priority, TranscriptAnalysis};
pub use refresh_token::RefreshTokenRecord;
pub use user::{PublicUser, User};
