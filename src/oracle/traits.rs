//! Traits related to the external classification model
use async_trait::async_trait;

use crate::{
    error::Result,
    oracle::types::{ModelDetails, ModelResponse},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Send the assembled prompt to the model and decode its structured
    /// response. Any decode or shape failure is fatal; there is no
    /// partial-success handling.
    async fn classify(
        &self,
        prompt: &str,
        release: &str,
        model: &str,
    ) -> Result<(ModelResponse, ModelDetails)>;
}
