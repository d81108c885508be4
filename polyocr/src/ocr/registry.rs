use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::OcrConfig;
use crate::error::{PolyOcrError, Result};
use crate::models::EngineKind;

use super::capability::{CapabilityProbe, SystemProbe};
use super::provider::{BackendFactory, EngineFactory, EngineSettings, OcrEngine};

/// Lifecycle of one engine inside a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineState {
    NotAttempted,
    Ready,
    Unavailable(String),
}

enum EngineSlot {
    Ready(Arc<dyn OcrEngine>),
    Unavailable(String),
}

/// Lazily constructs engines and keeps them for the registry's lifetime.
///
/// Each engine is built at most once. A successful build is reused for
/// every later call; a failed build is remembered and never retried.
pub struct EngineRegistry {
    factory: Arc<dyn EngineFactory>,
    probe: Arc<dyn CapabilityProbe>,
    enabled: Vec<EngineKind>,
    slots: Mutex<HashMap<EngineKind, EngineSlot>>,
}

impl EngineRegistry {
    pub fn new(config: &OcrConfig) -> Self {
        Self::with_factory(
            Arc::new(BackendFactory::new(config)),
            Arc::new(SystemProbe::new(config.force_cpu)),
            config.enabled_engines.clone(),
        )
    }

    pub fn with_factory(
        factory: Arc<dyn EngineFactory>,
        probe: Arc<dyn CapabilityProbe>,
        enabled: Vec<EngineKind>,
    ) -> Self {
        Self {
            factory,
            probe,
            enabled,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the engine for `kind`, constructing it on first use.
    ///
    /// The slot table stays locked while an engine is being built, so
    /// concurrent first use still constructs once.
    pub async fn resolve(&self, kind: EngineKind) -> Result<Arc<dyn OcrEngine>> {
        let mut slots = self.slots.lock().await;

        if let Some(slot) = slots.get(&kind) {
            return match slot {
                EngineSlot::Ready(engine) => Ok(Arc::clone(engine)),
                EngineSlot::Unavailable(reason) => {
                    Err(PolyOcrError::EngineUnavailable(reason.clone()))
                }
            };
        }

        if !self.enabled.contains(&kind) {
            let reason = format!("{kind} disabled by configuration");
            slots.insert(kind, EngineSlot::Unavailable(reason.clone()));
            return Err(PolyOcrError::EngineUnavailable(reason));
        }

        let settings = EngineSettings {
            accelerated: self.probe.accelerator_available(),
        };
        info!(engine = %kind, accelerated = settings.accelerated, "Constructing OCR engine");

        match self.factory.build(kind, settings).await {
            Ok(engine) => {
                slots.insert(kind, EngineSlot::Ready(Arc::clone(&engine)));
                Ok(engine)
            }
            Err(e) => {
                let reason = match e {
                    PolyOcrError::EngineUnavailable(reason) => reason,
                    other => other.to_string(),
                };
                warn!(engine = %kind, "OCR engine unavailable: {}", reason);
                slots.insert(kind, EngineSlot::Unavailable(reason.clone()));
                Err(PolyOcrError::EngineUnavailable(reason))
            }
        }
    }

    /// Engines that resolve successfully, in canonical order. Constructs
    /// every enabled engine that has not been attempted yet.
    pub async fn available(&self) -> Vec<EngineKind> {
        let mut ready = Vec::new();
        for kind in EngineKind::ALL {
            if self.enabled.contains(&kind) && self.resolve(kind).await.is_ok() {
                ready.push(kind);
            }
        }
        ready
    }

    pub async fn state(&self, kind: EngineKind) -> EngineState {
        match self.slots.lock().await.get(&kind) {
            None => EngineState::NotAttempted,
            Some(EngineSlot::Ready(_)) => EngineState::Ready,
            Some(EngineSlot::Unavailable(reason)) => EngineState::Unavailable(reason.clone()),
        }
    }
}
