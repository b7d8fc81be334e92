use async_trait::async_trait;

use crate::error::AnalysisError;

/// A remote multimodal completion service: prompt + image in, free-form
/// text out. The analyzer drives model fallback through this trait, so the
/// orchestration can be exercised without a live endpoint.
#[async_trait]
pub trait VisionBackend: Send + Sync {
    /// True when the credential needed to reach the service is present.
    /// The analyzer refuses to issue any request while this is false.
    fn is_configured(&self) -> bool;

    /// Run one completion request against `model` and return the raw reply.
    async fn complete(
        &self,
        model: &str,
        prompt: &str,
        image_data_url: &str,
    ) -> Result<String, AnalysisError>;
}
