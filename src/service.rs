//! ConversationService — one inbound envelope through load, handle, save and
//! dispatch, serialized per customer.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::channels::whatsapp::{OutboundPayload, Transport, compose};
use crate::conversation::{ConversationEngine, InboundEnvelope};
use crate::error::Result;
use crate::gateway::CustomerStateGateway;

pub struct ConversationService {
    engine: ConversationEngine,
    gateway: CustomerStateGateway,
    transport: Arc<dyn Transport>,
    /// Gap between consecutive messages of one batch.
    dispatch_pacing: Duration,
}

impl ConversationService {
    pub fn new(
        engine: ConversationEngine,
        gateway: CustomerStateGateway,
        transport: Arc<dyn Transport>,
        dispatch_pacing: Duration,
    ) -> Self {
        Self {
            engine,
            gateway,
            transport,
            dispatch_pacing,
        }
    }

    pub fn gateway(&self) -> &CustomerStateGateway {
        &self.gateway
    }

    pub fn transport_name(&self) -> &str {
        self.transport.name()
    }

    /// Handle one envelope and send the resulting messages.
    ///
    /// Returns the payloads that were dispatched. A storage failure returns
    /// the error before anything is sent; delivery failures are logged only.
    /// A message id already handled for this customer is skipped, so provider
    /// redeliveries do not advance the conversation twice.
    pub async fn process(&self, envelope: &InboundEnvelope) -> Result<Vec<OutboundPayload>> {
        let identifier = envelope.identifier.as_str();

        if let Some(message_id) = &envelope.message_id {
            if let Err(e) = self.transport.mark_read(message_id).await {
                debug!(identifier, message_id, error = %e, "Failed to mark message read");
            }
        }

        let _guard = self.gateway.lock(identifier).await;

        let now = Utc::now();
        let loaded = self
            .gateway
            .load_or_create(identifier, envelope.display_name.as_deref(), now)
            .await?;
        if let Some(message_id) = &envelope.message_id {
            if loaded.snapshot.has_seen_message(message_id) {
                info!(identifier, message_id, "Redelivered message skipped");
                return Ok(Vec::new());
            }
        }

        let mut outcome = self.engine.handle(loaded.snapshot, &envelope.event, now).await;
        let remembered = envelope
            .message_id
            .as_deref()
            .is_some_and(|id| outcome.snapshot.remember_message(id));

        if outcome.changed || loaded.dirty || remembered {
            self.gateway.save(&outcome.snapshot).await?;
        }

        let payloads: Vec<OutboundPayload> = outcome.intents.iter().map(compose).collect();
        self.dispatch(identifier, &payloads).await;
        Ok(payloads)
    }

    async fn dispatch(&self, to: &str, payloads: &[OutboundPayload]) {
        for (i, payload) in payloads.iter().enumerate() {
            if i > 0 && !self.dispatch_pacing.is_zero() {
                tokio::time::sleep(self.dispatch_pacing).await;
            }
            match self.transport.deliver(to, payload).await {
                Ok(receipt) => info!(
                    to,
                    kind = payload.kind(),
                    message_id = %receipt.message_id,
                    "Message delivered"
                ),
                Err(e) => warn!(to, kind = payload.kind(), error = %e, "Message delivery failed"),
            }
        }
    }
}
