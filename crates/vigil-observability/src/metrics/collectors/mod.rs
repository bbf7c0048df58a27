//! Metric collectors for Vigil components

pub mod http;
pub mod pipeline;

use prometheus::Registry;

use crate::error::Result;

/// All Vigil metrics combined
#[derive(Clone)]
pub struct VigilMetrics {
    /// Analytics pipeline metrics
    pub pipeline: pipeline::PipelineMetrics,
    /// HTTP surface metrics
    pub http: http::HttpMetrics,
}

impl VigilMetrics {
    /// Create all Vigil metrics and register them
    pub fn new(registry: &Registry) -> Result<Self> {
        Ok(Self {
            pipeline: pipeline::PipelineMetrics::new(registry)?,
            http: http::HttpMetrics::new(registry)?,
        })
    }
}
