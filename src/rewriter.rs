//! Entrypoint rewriting
//!
//! Reads an image's declared startup command and produces the tracer
//! wrapper that will replace its entrypoint. The caller owns the
//! returned wrapper and is responsible for deleting it.

use crate::command::StartupCommand;
use crate::engine::ImageInspector;
use crate::error::{Result, TrimError};
use crate::wrapper::{TracerSettings, TracerWrapper};

/// Command to re-execute plus the wrapper that will execute it
#[derive(Debug)]
pub struct RewrittenEntrypoint {
    pub command: StartupCommand,
    pub wrapper: TracerWrapper,
}

pub struct EntrypointRewriter<'a> {
    inspector: &'a dyn ImageInspector,
    settings: TracerSettings,
}

impl<'a> EntrypointRewriter<'a> {
    pub fn new(inspector: &'a dyn ImageInspector, settings: TracerSettings) -> Self {
        Self {
            inspector,
            settings,
        }
    }

    pub fn settings(&self) -> &TracerSettings {
        &self.settings
    }

    /// Inspect `image` and materialize a wrapper for its startup command
    ///
    /// No host file is created when the image has no startup command.
    pub fn rewrite(&self, image: &str) -> Result<RewrittenEntrypoint> {
        let config = self.inspector.inspect_image(image).map_err(|e| {
            let message = if e.is_not_found() {
                format!("Image '{}' not found during inspection", image)
            } else {
                format!("Error inspecting image '{}'", image)
            };
            TrimError::startup(message, e)
        })?;
        tracing::info!(
            image,
            entrypoint = ?config.entrypoint,
            cmd = ?config.cmd,
            "inspected image"
        );

        let command = StartupCommand::from_image_config(image, config)?;
        tracing::info!(command = ?command.args(), "wrapping startup command");

        let wrapper = TracerWrapper::materialize(&self.settings)?;
        Ok(RewrittenEntrypoint { command, wrapper })
    }
}
