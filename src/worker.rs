//! Async boundary for token operations
//!
//! Token calls block on the device. `TokenWorker` runs each one on tokio's
//! blocking pool and hands the result back to the awaiting caller, so an
//! interactive front-end never blocks on hardware. There is no queue, lock
//! or timeout: one call, one blocking task.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::task;
use tracing::error;

use crate::error::{TokenSignError, TokenSignResult};
use crate::model::{
    KeyFamily, MechanismDescriptor, MechanismId, Pin, SignatureArtifact, SlotId, TokenHandle,
};
use crate::ports::RuntimeLoader;
use crate::use_cases;

#[derive(Debug)]
pub struct TokenWorker<L> {
    loader: Arc<L>,
}

impl<L> Clone for TokenWorker<L> {
    fn clone(&self) -> Self {
        Self {
            loader: Arc::clone(&self.loader),
        }
    }
}

impl<L> TokenWorker<L>
where
    L: RuntimeLoader + Send + Sync + 'static,
{
    pub fn new(loader: L) -> Self {
        Self {
            loader: Arc::new(loader),
        }
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    async fn run<T, F>(&self, op: F) -> TokenSignResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&L) -> TokenSignResult<T> + Send + 'static,
    {
        let loader = Arc::clone(&self.loader);
        task::spawn_blocking(move || op(&loader))
            .await
            .map_err(|e| {
                error!("Token task did not complete: {}", e);
                TokenSignError::Worker {
                    reason: e.to_string(),
                }
            })?
    }

    pub async fn list_tokens(&self) -> TokenSignResult<Vec<TokenHandle>> {
        self.run(|loader| use_cases::list_tokens(loader)).await
    }

    pub async fn resolve_key_family(&self, slot: SlotId) -> TokenSignResult<KeyFamily> {
        self.run(move |loader| use_cases::resolve_key_family(loader, slot))
            .await
    }

    pub async fn list_signing_mechanisms(
        &self,
        slot: SlotId,
    ) -> TokenSignResult<Vec<MechanismDescriptor>> {
        self.run(move |loader| use_cases::list_signing_mechanisms(loader, slot))
            .await
    }

    /// The PIN is moved into the task and wiped when it finishes
    pub async fn sign(
        &self,
        slot: SlotId,
        mechanism: MechanismId,
        pin: Pin,
        payload: Vec<u8>,
    ) -> TokenSignResult<SignatureArtifact> {
        self.run(move |loader| use_cases::sign(loader, slot, mechanism, &pin, &payload))
            .await
    }

    pub async fn verify(
        &self,
        slot: SlotId,
        mechanism: MechanismId,
        payload: Vec<u8>,
        signature: Vec<u8>,
    ) -> TokenSignResult<bool> {
        self.run(move |loader| use_cases::verify(loader, slot, mechanism, &payload, &signature))
            .await
    }

    pub async fn sign_file(
        &self,
        slot: SlotId,
        mechanism: MechanismId,
        pin: Pin,
        path: PathBuf,
    ) -> TokenSignResult<PathBuf> {
        self.run(move |loader| use_cases::sign_file(loader, slot, mechanism, &pin, &path))
            .await
    }

    pub async fn verify_file(
        &self,
        slot: SlotId,
        mechanism: MechanismId,
        signature_path: PathBuf,
    ) -> TokenSignResult<bool> {
        self.run(move |loader| use_cases::verify_file(loader, slot, mechanism, &signature_path))
            .await
    }
}
