//! Pipeline stages for batched document analysis.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. switch the media store) without touching
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! rasterize ──▶ count ──▶ dispatch ──▶ postprocess ──▶ aggregate
//! (store upload) (pages)  (batched VLM)  (cleanup)     (ordered report)
//! ```
//!
//! 1. [`rasterize`] — upload the document to the media store and derive the
//!    ordered per-page image list, capped at the page ceiling
//! 2. [`count`]     — query the store for the page count; degrades to a
//!    fallback estimate instead of failing
//! 3. [`dispatch`]  — submit pages in fixed-size sequential groups, fully
//!    concurrent within a group; the only stage with analysis I/O
//! 4. [`postprocess`] — deterministic text cleanup of model output
//!    (fences, line endings, invisible characters)
//! 5. [`aggregate`] — restore page order and render the combined report

pub mod aggregate;
pub mod count;
pub mod dispatch;
pub mod postprocess;
pub mod rasterize;
