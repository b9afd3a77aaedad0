use std::sync::Arc;

use tokio::sync::mpsc::{channel, Receiver, Sender};

use crate::actors::messages::*;
use crate::config::Settings;
use crate::pipeline::ResponsePipeline;
use crate::storage::PersonaStore;

pub struct PipelineActorHandle {
    sender: Sender<PipelineMessage>,
}

impl PipelineActorHandle {
    pub fn new(settings: Settings, personas: Arc<dyn PersonaStore>) -> Self {
        let buffer_size = settings.system.channel_buffer_size;
        let (sender, receiver) = channel(buffer_size);
        tokio::spawn(pipeline_actor(receiver, settings, personas));
        Self { sender }
    }

    pub async fn send_message(&self, message: PipelineMessage) -> anyhow::Result<()> {
        self.sender
            .send(message)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to send message to Pipeline actor: {}", e))
    }
}

async fn pipeline_actor(
    mut receiver: Receiver<PipelineMessage>,
    settings: Settings,
    personas: Arc<dyn PersonaStore>,
) {
    let pipeline = Arc::new(ResponsePipeline::new(&settings, personas));

    tracing::info!("Pipeline actor started");

    while let Some(message) = receiver.recv().await {
        // Each ask runs in its own task so one slow model call does not
        // serialize every other conversation behind it.
        let pipeline = pipeline.clone();
        tokio::spawn(async move {
            handle_pipeline_message(message, &pipeline).await;
        });
    }

    tracing::info!("Pipeline actor channel closed, shutting down");
}

async fn handle_pipeline_message(message: PipelineMessage, pipeline: &ResponsePipeline) {
    match message {
        PipelineMessage::Ask(request) => {
            if request.stream {
                handle_stream_ask(request, pipeline).await;
            } else {
                handle_single_shot_ask(request, pipeline).await;
            }
        }
    }
}

async fn handle_single_shot_ask(request: AskRequest, pipeline: &ResponsePipeline) {
    match pipeline
        .invoke(&request.question, &request.grade, &request.history)
        .await
    {
        Ok(answer) => {
            let _ = request.response.send(AskResponse::Complete(answer));
        }
        Err(e) => {
            tracing::error!("Pipeline invocation error: {}", e);
            let _ = request.response.send(AskResponse::Error(e.to_string()));
        }
    }
}

async fn handle_stream_ask(request: AskRequest, pipeline: &ResponsePipeline) {
    let (tx, rx) = channel(100);

    // Hand the receiver back immediately; fragments flow as produced.
    let _ = request.response.send(AskResponse::StreamFragments(rx));

    if let Err(e) = pipeline
        .invoke_stream(&request.question, &request.grade, &request.history, tx)
        .await
    {
        tracing::error!("Pipeline stream error: {}", e);
    }
}
