//! Runtime module: the long-lived pipeline and its host-facing edges.
//!
//! This module contains:
//! - [`Pipeline`]: Owns cross-frame state and runs commit → layout → encode
//! - [`FrameSubmitter`]: Backend thread with an in-flight cap and coalescing
//! - [`InputEvent`]: Semantic input decoded from crossterm events
//! - [`PipelineConfig`]: Plain configuration with defaults
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   VNode    ┌──────────────┐   bytes   ┌──────────────┐
//! │     Host     │───────────▶│   Pipeline   │──────────▶│FrameSubmitter│
//! │ (app state)  │            │ (one thread) │           │ (weft-submit)│
//! └──────────────┘            └──────────────┘           └──────┬───────┘
//!        ▲                           ▲                          │
//!        │        InputEvent         │ hit map / focus          ▼
//!        └───────────────────────────┘                      Backend
//! ```

mod config;
mod input;
mod pipeline;
mod submit;

pub use config::PipelineConfig;
pub use input::{decode_batch, InputEvent, KeyCode, KeyModifiers, MouseButton, MouseEvent, MouseKind};
pub use pipeline::{FrameOutcome, FrameReport, Pipeline, PipelineStats};
pub use submit::{Backend, FrameSubmitter, ShutdownMode, SubmitStats, Submitted, WriterBackend};
