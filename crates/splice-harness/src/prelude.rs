//! Common imports for typical usage.
pub use crate::{
    ControllerState, HarnessError, ModelRef, PassOutcome, ProviderAdapter, ProviderId,
    SpliceReport, StreamingController, TemplateSource, TextSink,
};
