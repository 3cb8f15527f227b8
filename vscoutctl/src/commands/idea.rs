use clap::Args;

/// Save a video as an idea.
#[derive(Args, Debug, Clone)]
pub struct IdeaAddArgs {
    /// Internal video id (as printed by `fetch`)
    pub video: String,

    /// Free-form note attached to the idea
    #[arg(long)]
    pub note: Option<String>,
}

/// Discard a saved idea.
#[derive(Args, Debug, Clone)]
pub struct IdeaRmArgs {
    /// Internal idea id (see `idea list`)
    pub id: String,
}
