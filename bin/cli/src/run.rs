use changelog::document::ChangelogDocument;
use changelog::settings::ChangelogSettings;
use changelog::Changelog;
use scm::platforms::cache::CachedPlatform;
use scm::platforms::ScmPlatformClient;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::args::Opt;
use crate::config;
use crate::errors::CliResult;

pub(crate) const UP_TO_DATE: &str = "Up to date";

pub(crate) async fn execute(opt: &Opt, cancel: &CancellationToken) -> CliResult<Option<String>> {
    let settings = config::load(opt)?;
    let platform = CachedPlatform::new(settings.remote.connect()?);
    update(&platform, &settings, opt.dry_run, cancel).await
}

/// Adds missing releases to the configured changelog. With `dry_run` the updated changelog is
/// returned instead of written.
pub(crate) async fn update<P>(
    platform: &P,
    settings: &ChangelogSettings,
    dry_run: bool,
    cancel: &CancellationToken,
) -> CliResult<Option<String>>
where
    P: ScmPlatformClient + ?Sized,
{
    let document = ChangelogDocument::load(&settings.file)?;
    let releases = Changelog::new(platform, settings)
        .generate(&document, cancel)
        .await?;
    if releases.is_empty() {
        return Ok(Some(UP_TO_DATE.to_string()));
    }

    let text = document.render(&releases)?;
    if dry_run {
        return Ok(Some(text));
    }

    ChangelogDocument::write(&settings.file, &text)?;
    info!(
        "added {} releases to {}",
        releases.len(),
        settings.file.display()
    );
    Ok(None)
}
