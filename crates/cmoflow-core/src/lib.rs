//! # cmoflow-core
//!
//! The deterministic session engine for cmoflow - THE LOGIC.
//!
//! A session walks one user through three phases:
//!
//! ```text
//! Intake ──(primary asset present)──► Processing ──(stages + settle)──► Revealed
//!    ▲                                     │                                │
//!    └──────────────── reset ──────────────┴────────────────────────────────┘
//! ```
//!
//! ## Components
//!
//! - `registry`: assets, classification, preview lifecycle
//! - `controller`: the phase state machine and its event subscriptions
//! - `sequencer`: ordered, timed processing stages
//! - `scheduler`: the virtual clock every timer runs on
//!
//! ## Architectural Constraints
//!
//! - No async, no network, no OS clock: time only moves when the owner
//!   advances the scheduler
//! - No randomness: ids come from monotonic counters
//! - Previews are created and released by the registry alone

// =============================================================================
// MODULES
// =============================================================================

pub mod config;
pub mod controller;
pub mod detect;
pub mod phase;
pub mod preview;
pub mod primitives;
pub mod registry;
pub mod scheduler;
pub mod sequencer;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Asset, AssetId, Classification, ContentType, FlowError, Millis, Payload, PreviewHandle,
};

// =============================================================================
// RE-EXPORTS: Session Engine
// =============================================================================

pub use config::FlowConfig;
pub use controller::{FlowEvent, PhaseController, SubscriptionId, TriggerState};
pub use detect::{content_type_for_extension, sniff_content_type};
pub use phase::{SessionPhase, Transition};
pub use preview::{InMemoryPreviewStore, PreviewStore};
pub use registry::AssetRegistry;
pub use scheduler::{Scheduler, TimerId};
pub use sequencer::{
    ProcessingStage, RunHandle, SequencerStep, SequencerTimer, StageProgress,
    StagedProgressSequencer, total_duration,
};
