use clap::Args;

/// Run one ingestion cycle for a tracked channel.
#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// Internal channel id or the channel's external id
    pub channel: String,

    /// Skip the freshness gate and fetch from the platform unconditionally
    #[arg(long)]
    pub force: bool,
}
