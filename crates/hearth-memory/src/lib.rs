// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-term memory for Hearth.
//!
//! After each completed turn the chat layer queues an [`ExtractionJob`]. The
//! [`ExtractionWorker`] asks the extraction model for durable facts about the
//! user, drops near-duplicates, and stores the rest encrypted. On the way in,
//! [`memory_context`] picks the facts most relevant to the next message.

pub mod context;
pub mod dedup;
pub mod extractor;
pub mod worker;

pub use context::{format_fact_context, memory_context, select_facts};
pub use extractor::{
    CandidateFact, ExtractionJob, FactExtractor, build_extraction_prompt,
    parse_extraction_response,
};
pub use worker::ExtractionWorker;
