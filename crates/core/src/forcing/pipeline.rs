//! Ordered provider pipelines for the applied and induced force stages

use super::provider::{ForceProvider, ProviderContext};
use crate::error::{ForcingError, ForcingResult};
use crate::grid::ForceTriple;
use tracing::debug;

/// Applied-force providers, invoked in registration order
#[derive(Default)]
pub struct AppliedForcing {
    providers: Vec<Box<dyn ForceProvider>>,
}

impl AppliedForcing {
    /// Empty pipeline; running it only zeroes the forces
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a provider
    pub fn register(&mut self, provider: Box<dyn ForceProvider>) {
        self.providers.push(provider);
    }

    /// Number of registered providers
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// True when no provider is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Provider names in invocation order
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.providers.iter().map(|p| p.name())
    }

    /// Zero `forces`, then let every provider contribute
    ///
    /// # Errors
    ///
    /// Returns the first provider error; later providers are not invoked.
    pub fn run(
        &mut self,
        ctx: &ProviderContext<'_>,
        forces: &mut ForceTriple,
    ) -> ForcingResult<()> {
        forces.reset();
        for provider in &mut self.providers {
            provider.apply(ctx, forces)?;
            debug!("applied force provider '{}' done", provider.name());
        }
        Ok(())
    }
}

/// Primary induced provider plus an optional dependent correction
#[derive(Default)]
pub struct InducedForcing {
    primary: Option<Box<dyn ForceProvider>>,
    correction: Option<Box<dyn ForceProvider>>,
}

impl InducedForcing {
    /// Build the induced stage
    ///
    /// # Errors
    ///
    /// Returns [`ForcingError::InvalidConfig`] when a correction is given
    /// without the primary provider it depends on.
    pub fn new(
        primary: Option<Box<dyn ForceProvider>>,
        correction: Option<Box<dyn ForceProvider>>,
    ) -> ForcingResult<Self> {
        if primary.is_none() {
            if let Some(correction) = &correction {
                return Err(ForcingError::config(
                    "induced_correction",
                    format!(
                        "correction provider '{}' requires a primary induced provider",
                        correction.name()
                    ),
                ));
            }
        }
        Ok(Self {
            primary,
            correction,
        })
    }

    /// True when neither provider is configured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.primary.is_none()
    }

    /// Provider names in invocation order
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.primary
            .iter()
            .chain(self.correction.iter())
            .map(|p| p.name())
    }

    /// Zero `forces`, run the primary provider, then the correction
    ///
    /// # Errors
    ///
    /// Propagates provider errors unchanged.
    pub fn run(
        &mut self,
        ctx: &ProviderContext<'_>,
        forces: &mut ForceTriple,
    ) -> ForcingResult<()> {
        forces.reset();
        if let Some(primary) = &mut self.primary {
            primary.apply(ctx, forces)?;
            debug!("induced force provider '{}' done", primary.name());
        }
        if let Some(correction) = &mut self.correction {
            correction.apply(ctx, forces)?;
            debug!("induced correction '{}' done", correction.name());
        }
        Ok(())
    }
}
