use std::sync::Arc;

use tokio::sync::mpsc::{channel, Receiver, Sender};

use crate::actors::messages::*;
use crate::actors::pipeline_actor::PipelineActorHandle;
use crate::config::Settings;
use crate::storage::PersonaStore;

pub struct MessageRouterHandle {
    sender: Sender<RoutingMessage>,
}

impl MessageRouterHandle {
    pub fn new(settings: Settings, personas: Arc<dyn PersonaStore>) -> Self {
        let buffer_size = settings.system.channel_buffer_size;
        let (sender, receiver) = channel(buffer_size);
        tokio::spawn(router_actor(receiver, settings, personas));
        Self { sender }
    }

    pub async fn send_message(&self, message: RoutingMessage) -> anyhow::Result<()> {
        self.sender
            .send(message)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to send message to Router: {}", e))
    }

    pub async fn shutdown(&self) -> anyhow::Result<()> {
        self.send_message(RoutingMessage::Shutdown).await
    }
}

async fn router_actor(
    mut receiver: Receiver<RoutingMessage>,
    settings: Settings,
    personas: Arc<dyn PersonaStore>,
) {
    tracing::info!("Router actor started");

    let pipeline_handle = PipelineActorHandle::new(settings.clone(), personas);

    while let Some(message) = receiver.recv().await {
        match message {
            RoutingMessage::Pipeline(pipeline_message) => {
                if let Err(e) = pipeline_handle.send_message(pipeline_message).await {
                    tracing::error!("Failed to send to Pipeline actor: {}", e);
                }
            }
            RoutingMessage::Shutdown => {
                tracing::info!("Router received shutdown signal");
                break;
            }
        }
    }
}
