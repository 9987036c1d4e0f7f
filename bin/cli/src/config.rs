use std::env;
use std::path::PathBuf;

use changelog::settings::ChangelogSettings;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use scm::platforms::ScmPlatforms;
use serde_derive::Serialize;
use tracing::debug;

use crate::args::Opt;
use crate::errors::{CliError, CliResult};

pub(crate) const DEFAULT_CONFIG_FILE: &str = ".chlog.toml";
const ENV_PREFIX: &str = "CHLOG_";

/// Flags given on the command line. Unset flags leave the configured value alone.
#[derive(Debug, Default, Serialize)]
struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    exclude_tags: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    exclude_tags_regex: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    to: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    future: Option<String>,

    remote: RemoteOverrides,
}

#[derive(Debug, Default, Serialize)]
struct RemoteOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    platform: Option<ScmPlatforms>,

    #[serde(skip_serializing_if = "Option::is_none")]
    owner: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    repo: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
}

impl From<&Opt> for Overrides {
    fn from(opt: &Opt) -> Self {
        Self {
            file: opt.file.clone(),
            branch: opt.branch.clone(),
            exclude_tags: opt.exclude_tags.clone(),
            exclude_tags_regex: opt.exclude_tags_regex.clone(),
            from: opt.from.clone(),
            to: opt.to.clone(),
            future: opt.future.clone(),
            remote: RemoteOverrides {
                platform: opt.platform,
                owner: opt.owner.clone(),
                repo: opt.repo.clone(),
                token: opt.token.clone(),
            },
        }
    }
}

/// Settings from, in increasing precedence, built-in defaults, the configuration file,
/// `CHLOG_` environment variables and command line flags.
pub(crate) fn load(opt: &Opt) -> CliResult<ChangelogSettings> {
    let path = match &opt.config {
        Some(path) if !path.is_file() => return Err(CliError::MissingConfig(path.clone())),
        Some(path) => path.clone(),
        None => PathBuf::from(DEFAULT_CONFIG_FILE),
    };
    debug!("reading configuration from {}", path.display());

    let mut settings: ChangelogSettings = Figment::new()
        .merge(Toml::file(&path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .merge(Serialized::defaults(Overrides::from(opt)))
        .extract()?;

    if settings.remote.token.is_none() {
        let var = match settings.remote.platform {
            ScmPlatforms::GitHub => "GITHUB_TOKEN",
            ScmPlatforms::GitLab => "GITLAB_TOKEN",
        };
        settings.remote.token = env::var(var).ok();
    }

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use figment::Jail;
    use scm::platforms::ScmPlatforms;

    use crate::args::Opt;
    use crate::config::load;
    use crate::errors::CliError;

    #[test]
    fn defaults_without_configuration() {
        Jail::expect_with(|jail| {
            jail.set_env("GITHUB_TOKEN", "from-env");

            let settings = load(&Opt::default()).map_err(|e| e.to_string())?;
            assert_eq!(PathBuf::from("CHANGELOG.md"), settings.file);
            assert_eq!(ScmPlatforms::GitHub, settings.remote.platform);
            assert_eq!(Some("from-env".to_string()), settings.remote.token);
            assert_eq!(4, settings.exclude_labels.len());
            Ok(())
        });
    }

    #[test]
    fn layered_configuration() {
        Jail::expect_with(|jail| {
            jail.create_file(
                ".chlog.toml",
                r#"
                future = "v1.0.0"
                exclude_tags = ["nightly"]
                exclude_tags_regex = "-rc\\d*$"
                exclude_labels = ["invalid"]

                [[issue_groups]]
                title = "Bugs"
                labels = ["bug"]

                [remote]
                platform = "gitlab"
                owner = "group"
                repo = "project"
                token = "from-file"
                "#,
            )?;
            jail.set_env("CHLOG_REMOTE__REPO", "from-env");
            jail.set_env("CHLOG_BRANCH", "develop");

            let opt = Opt {
                branch: Some("release".to_string()),
                exclude_tags: vec!["latest".to_string()],
                ..Default::default()
            };
            let settings = load(&opt).map_err(|e| e.to_string())?;

            assert_eq!(ScmPlatforms::GitLab, settings.remote.platform);
            assert_eq!("group", settings.remote.owner);
            assert_eq!("from-env", settings.remote.repo);
            assert_eq!(Some("from-file".to_string()), settings.remote.token);
            assert_eq!(Some("release".to_string()), settings.branch);
            assert_eq!(vec!["latest"], settings.exclude_tags);
            assert_eq!(Some("v1.0.0".to_string()), settings.future);
            assert_eq!(vec!["invalid"], settings.exclude_labels);
            assert_eq!(1, settings.issue_groups.len());
            assert!(settings
                .exclude_tags_regex
                .as_ref()
                .is_some_and(|re| re.is_match("v1.0.0-rc1")));
            Ok(())
        });
    }

    #[test]
    fn explicit_configuration_must_exist() {
        Jail::expect_with(|_| {
            let opt = Opt {
                config: Some(PathBuf::from("missing.toml")),
                ..Default::default()
            };
            assert!(matches!(load(&opt), Err(CliError::MissingConfig(_))));
            Ok(())
        });
    }
}
