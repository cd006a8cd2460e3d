//! Conversation domain.
//!
//! - [`entities::Transcript`]: validated, append-only conversation history
//! - [`entities::ConversationTurn`]: a single role/content pair
//! - [`entities::RawTurn`]: caller-supplied turn prior to validation

pub mod entities;
