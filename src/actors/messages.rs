use tokio::sync::{mpsc, oneshot};

use crate::history::Turn;

/// One tutoring question heading into the pipeline.
#[derive(Debug)]
pub struct AskRequest {
    pub question: String,
    pub grade: String,
    pub history: Vec<Turn>,
    pub stream: bool,
    pub response: oneshot::Sender<AskResponse>,
}

#[derive(Debug)]
pub enum AskResponse {
    Complete(String),
    StreamFragments(mpsc::Receiver<String>),
    Error(String),
}

#[derive(Debug)]
pub enum PipelineMessage {
    Ask(AskRequest),
}

#[derive(Debug)]
pub enum RoutingMessage {
    Pipeline(PipelineMessage),
    Shutdown,
}
