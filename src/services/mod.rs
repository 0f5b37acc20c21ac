// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod extraction;
pub mod password;
pub mod rate_limit;
pub mod session;
pub mod session_store;
pub mod token;

pub use extraction::MeetingAnalyzer;
pub use password::CredentialHasher;
pub use rate_limit::{RateLimitDecision, RateLimitPolicy, RateLimiter};
pub use session::{AuthSession, SessionManager, TokenPair};
pub use session_store::SessionStore;
pub use token::{Claims, IssuedToken, TokenCodec, TokenKind};
