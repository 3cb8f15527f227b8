use clap::Args;

/// Track a new competitor channel.
#[derive(Args, Debug, Clone)]
pub struct ChannelAddArgs {
    /// Channel URL (youtube.com/channel/UC…, /@handle, /c/name, /user/name)
    /// or a raw canonical id
    pub input: String,
}

/// Stop tracking a channel; its videos and saved ideas go with it.
#[derive(Args, Debug, Clone)]
pub struct ChannelRmArgs {
    /// Internal channel id (see `channel list`)
    pub id: String,
}
