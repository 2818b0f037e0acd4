//! Service implementations, one method per logical operation.
//!
//! - Buckets: create, list all, delete
//! - Objects: list (with cursor), put (buffer or stream), get, conditional get, delete, head
//! - Queues: create, list, delete, send, receive, delete message

mod buckets;
mod objects;
mod queues;

pub use buckets::BucketsService;
pub use objects::ObjectsService;
pub use queues::QueuesService;
