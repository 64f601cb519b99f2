//! Outgoing message pipeline: tone classification followed by aura
//! updates for the sender and, in group chats, the group.

pub mod processor;
pub mod types;

pub use processor::{MessagePipeline, PipelineTask};
pub use types::{AuraFailure, DeliveryStatus, Destination, OutboundMessage, PipelineResult};
