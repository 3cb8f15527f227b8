mod channel;
mod fetch;
mod idea;

pub use channel::{ChannelAddArgs, ChannelRmArgs};
pub use fetch::FetchArgs;
pub use idea::{IdeaAddArgs, IdeaRmArgs};
