// Public modules
pub mod message;
pub mod message_create_params;
pub mod message_param;
pub mod model_parameters;
pub mod segment;
pub mod sender;
pub mod stream_event;
pub mod topic;

// Re-exports
pub use message::{Message, MessageId, MessageIdGenerator};
pub use message_create_params::MessageCreateParams;
pub use message_param::{MessageParam, MessageRole};
pub use model_parameters::{
    DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE, ModelParameters,
};
pub use segment::Segment;
pub use sender::Sender;
pub use stream_event::{ContentDelta, StreamError, StreamEvent};
pub use topic::Topic;
