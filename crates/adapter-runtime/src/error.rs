//! Unified adapter error.

use adapter_event::NormalizeError;
use adapter_image::ImageError;
use adapter_revalidate::DispatchError;
use adapter_security::AllowlistError;
use adapter_streaming::SinkError;

use crate::config::ConfigError;
use crate::framework::FrameworkError;

/// Any error the adapter can surface.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Framework(#[from] FrameworkError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Allowlist(#[from] AllowlistError),
}

impl AdapterError {
    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Normalize(_) => "normalize",
            Self::Sink(_) => "sink",
            Self::Image(_) => "image",
            Self::Framework(_) => "framework",
            Self::Config(_) => "config",
            Self::Dispatch(_) => "dispatch",
            Self::Allowlist(_) => "allowlist",
        }
    }
}
