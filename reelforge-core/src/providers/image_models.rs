use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{GeneratedImage, ImageGenerator};
use crate::error::ProviderError;

/// Which image model a deployment asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageModel {
    /// Coze first, then Zhipu, using whichever is configured.
    #[default]
    Auto,
    Coze,
    Zhipu,
}

impl FromStr for ImageModel {
    type Err = ProviderError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(ImageModel::Auto),
            "coze" => Ok(ImageModel::Coze),
            "zhipu" | "glm-image" => Ok(ImageModel::Zhipu),
            other => Err(ProviderError::NotConfigured(format!(
                "unknown image model '{other}'"
            ))),
        }
    }
}

/// Tries each configured generator in order until one yields an image.
#[derive(Clone)]
pub struct ImageModelChain {
    generators: Vec<(&'static str, Arc<dyn ImageGenerator>)>,
}

impl fmt::Debug for ImageModelChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.generators.iter().map(|(n, _)| *n).collect();
        f.debug_struct("ImageModelChain")
            .field("generators", &names)
            .finish()
    }
}

impl ImageModelChain {
    /// Build the chain for `model`. An explicitly requested model without
    /// credentials is a configuration error; `Auto` with nothing configured
    /// yields `None`.
    pub fn select(
        model: ImageModel,
        coze: Option<Arc<dyn ImageGenerator>>,
        zhipu: Option<Arc<dyn ImageGenerator>>,
    ) -> Result<Option<Self>, ProviderError> {
        let generators = match model {
            ImageModel::Coze => {
                let coze = coze.ok_or_else(|| {
                    ProviderError::NotConfigured(
                        "coze image model requires COZE_API_TOKEN and \
                         COZE_WORKFLOW_ID"
                            .into(),
                    )
                })?;
                vec![("coze", coze)]
            }
            ImageModel::Zhipu => {
                let zhipu = zhipu.ok_or_else(|| {
                    ProviderError::NotConfigured(
                        "zhipu image model requires ZHIPU_API_KEY".into(),
                    )
                })?;
                vec![("zhipu", zhipu)]
            }
            ImageModel::Auto => {
                let mut generators = Vec::new();
                if let Some(coze) = coze {
                    generators.push(("coze", coze));
                }
                if let Some(zhipu) = zhipu {
                    generators.push(("zhipu", zhipu));
                }
                generators
            }
        };

        if generators.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Self { generators }))
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.generators.iter().map(|(name, _)| *name).collect()
    }
}

#[async_trait]
impl ImageGenerator for ImageModelChain {
    async fn generate(
        &self,
        prompt: &str,
    ) -> Result<Option<GeneratedImage>, ProviderError> {
        let mut last_error = None;
        for (name, generator) in &self.generators {
            match generator.generate(prompt).await {
                Ok(Some(image)) => {
                    debug!(model = name, "image generated");
                    return Ok(Some(image));
                }
                Ok(None) => debug!(model = name, "model returned no image"),
                Err(err) => {
                    warn!(model = name, error = %err, "image model failed");
                    last_error = Some(err);
                }
            }
        }
        match last_error {
            Some(err) => Err(err),
            None => Ok(None),
        }
    }
}
