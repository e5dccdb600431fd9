// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod completion;
pub mod identity;
pub mod notifications;
pub mod prompts;

pub use completion::CompletionClient;
pub use identity::{IdentityError, IdentityService, VerifiedUser};
pub use notifications::{Channel, ChannelResult, NotificationService, Recipient};
