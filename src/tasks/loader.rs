use tracing::instrument;

use crate::builder::{SlideSequence, build};
use crate::clock::Clock;
use crate::config::Configuration;
use crate::error::Error;
use crate::sources::{self, Fetcher};

/// Run the full pipeline: resolve sources, normalize, filter, sort, cap.
#[instrument(skip_all, fields(description_file = cfg.description_file()))]
pub async fn load_sequence(
    cfg: &Configuration,
    fetcher: &Fetcher,
    clock: &Clock,
) -> Result<SlideSequence, Error> {
    let chain = sources::providers(cfg);
    let raw = sources::resolve(&chain, fetcher).await?;
    build(raw, &cfg.build_limits(), clock)
}
