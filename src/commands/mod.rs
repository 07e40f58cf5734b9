pub mod comments;

// Re-export command functions for convenience
pub use comments::{comments, replies, CommentOptions};
