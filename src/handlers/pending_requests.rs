//! Default handler wired in by the bootstrap: inspects each decoded action
//! request and logs what a response would need. The decision engine that
//! chooses whether to answer (and with what) sits outside this process; it
//! drives the responder through the same operations this handler gates on.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::NodeError,
    managers::blockchain::{
        ActionRequestEvent, ActionRequestHandler, HandlerError, RequestRecord, Responder,
    },
};

pub struct PendingRequestHandler {
    responder: Arc<Responder>,
}

impl PendingRequestHandler {
    pub fn new(responder: Arc<Responder>) -> Self {
        Self { responder }
    }
}

#[async_trait]
impl ActionRequestHandler for PendingRequestHandler {
    async fn handle(&self, event: ActionRequestEvent) -> Result<(), HandlerError> {
        tracing::info!(
            hash = %event.hash,
            agent = %event.agent_address,
            action_id = %event.action_id,
            block = ?event.block_number,
            "Action request observed"
        );

        // Pre-check before anything that could spend gas; the responder
        // re-verifies on its own before submitting.
        if !self.responder.is_authorized().await {
            tracing::warn!(
                hash = %event.hash,
                signer = %self.responder.signer_address(),
                "Signer is not the authorized responder; ignoring request"
            );
            return Ok(());
        }

        let record = self
            .responder
            .get_request(event.hash)
            .await
            .map_err(NodeError::from)?;

        match record {
            None => {
                tracing::warn!(
                    hash = %event.hash,
                    "Request not registered on-chain; nothing to answer"
                );
            }
            Some(record) if record.status == RequestRecord::STATUS_COMPLETED => {
                tracing::info!(hash = %event.hash, "Request already completed; skipping");
            }
            Some(record) => {
                let kind = if record.action_id == RequestRecord::ACTION_KIND_UPGRADE {
                    "upgrade"
                } else {
                    "action"
                };
                tracing::info!(
                    hash = %event.hash,
                    agent = %record.agent,
                    status = record.status,
                    kind,
                    "Request pending; awaiting decision engine"
                );
            }
        }

        Ok(())
    }
}
