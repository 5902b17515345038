//! Outreach prioritization — ranks non-vocal customers for proactive
//! contact under limited capacity.

pub mod ranker;

pub use ranker::{OutreachRanker, OutreachScore};
