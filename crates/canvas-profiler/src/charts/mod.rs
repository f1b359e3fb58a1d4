//! Declarative chart descriptors for the exploratory views.
//!
//! Nothing is rendered here; the descriptors are Vega-Lite v5 shaped and
//! stored with the profile.

mod generator;

pub use generator::ChartGenerator;
