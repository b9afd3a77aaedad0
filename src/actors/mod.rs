pub mod message_router;
pub mod messages;
pub mod pipeline_actor;

pub use message_router::MessageRouterHandle;
