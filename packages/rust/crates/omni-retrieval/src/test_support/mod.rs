//! Scripted collaborators for integration tests.
//!
//! Every fake counts its calls and records its inputs so tests can assert
//! both what came back and what was (or was not) asked for.

#![allow(missing_docs)]

mod fakes;
mod fixtures;

pub use fakes::{ScriptedEmbedder, ScriptedKeywordSearch, ScriptedVectorStore, StaticDirectory};
pub use fixtures::{ScriptedClients, keyword_hit, vector_hit};
