//! End-to-end release report: resolve versions, map commits to pull
//! requests, look up bugs and render the output.
use chrono::{Local, NaiveDate};
use log::*;
use secrecy::SecretString;
use std::path::PathBuf;

use crate::{
    cache::ResponseCache,
    cli::Args,
    config::{
        Config, DEFAULT_TRACKER_KEY_FILE, TRACKER_KEY_ENV_VAR, home_file,
        load_secret,
    },
    error::{FindBzsError, Result},
    forge::{
        config::{DEFAULT_TOKEN_FILE, RemoteConfig, TOKEN_ENV_VAR, web_url},
        github::Github,
        traits::PullRequestSearch,
    },
    formatter::{Packager, ReleaseContext, Report},
    mapper::{Mapper, Strategy},
    repo::{GitRepo, Repo, find_project},
    tracker::{
        BugFilter, IssueTracker, bugs_for_pull_requests, bugzilla::Bugzilla,
    },
    version::{DescribedRef, Target},
};

/// Collaborators the pipeline talks to.
pub struct Services<'a> {
    pub repo: &'a dyn Repo,
    pub search: &'a dyn PullRequestSearch,
    pub tracker: &'a dyn IssueTracker,
    pub cache: &'a ResponseCache,
}

/// One invocation's inputs.
pub struct Release<'a> {
    pub config: &'a Config,
    pub strategy: Strategy,
    pub old: &'a str,
    pub new: &'a str,
    /// Changelog date.
    pub date: NaiveDate,
}

/// Wire up real collaborators from the command line and print the report.
pub async fn execute(args: &Args) -> Result<()> {
    let mut config = Config::load(args.config.as_deref(), &args.repo_path)?;
    args.apply(&mut config);

    let api_key = secret(
        args.bugzilla_key_file.clone(),
        DEFAULT_TRACKER_KEY_FILE,
        TRACKER_KEY_ENV_VAR,
    )?;
    let tracker = Bugzilla::new(&config.tracker.url, api_key)?;

    let token = secret(
        args.github_token_file.clone(),
        DEFAULT_TOKEN_FILE,
        TOKEN_ENV_VAR,
    )?;

    let token = match token {
        Some(token) => token,
        None if args.strategy == Strategy::Search => {
            return Err(FindBzsError::Authentication(format!(
                "no github token: create ~/{DEFAULT_TOKEN_FILE} or set \
                 {TOKEN_ENV_VAR}"
            )));
        }
        None => SecretString::from(String::new()),
    };

    let search = Github::new(RemoteConfig {
        api_url: config.forge.api_url.clone(),
        token,
    })?;

    let cache_dir = config
        .cache_dir
        .clone()
        .or_else(ResponseCache::default_dir)
        .ok_or_else(|| {
            FindBzsError::configuration(
                "unable to determine a cache directory: pass --cache-dir",
            )
        })?;
    let cache = ResponseCache::new(cache_dir);
    debug!("caching search responses in {}", cache.dir().display());

    let repo = GitRepo::open(&args.repo_path)?;

    let services = Services {
        repo: &repo,
        search: &search,
        tracker: &tracker,
        cache: &cache,
    };

    let release = Release {
        config: &config,
        strategy: args.strategy,
        old: &args.old,
        new: &args.new,
        date: Local::now().date_naive(),
    };

    let report = run(&services, &release).await?;

    print!("{report}");

    Ok(())
}

/// Read a secret from `file`, or `~/<default_name>`, falling back to
/// `env_var`.
fn secret(
    file: Option<PathBuf>,
    default_name: &str,
    env_var: &str,
) -> Result<Option<SecretString>> {
    match file.or_else(|| home_file(default_name)) {
        Some(path) => load_secret(&path, env_var),
        None => Ok(std::env::var(env_var).ok().map(SecretString::from)),
    }
}

/// Build the report for `release`.
pub async fn run(
    services: &Services<'_>,
    release: &Release<'_>,
) -> Result<Report> {
    let config = release.config;

    if !services.tracker.logged_in().await? {
        return Err(FindBzsError::Authentication(format!(
            "not logged into {}: set {TRACKER_KEY_ENV_VAR} or create \
             ~/{DEFAULT_TRACKER_KEY_FILE}",
            services.tracker.name()
        )));
    }

    let project =
        find_project(services.repo, &config.forge.remotes, &config.forge.host)?;

    let described =
        DescribedRef::parse(&services.repo.describe(release.new)?)?;
    let rpm = Target::Rpm.format(&described)?;
    let deb = Target::Deb.format(&described)?;

    info!("RPM version {rpm}, Debian version {deb}");

    let full_hash = if services.repo.is_tag(release.new)? {
        None
    } else {
        Some(services.repo.rev_parse(release.new)?)
    };

    let packager = packager(services.repo, config)?;

    let mapper = Mapper {
        repo: services.repo,
        search: services.search,
        cache: services.cache,
        project: &project.slug,
        remote: &project.remote,
    };

    let prs = mapper
        .find_all_prs(release.strategy, release.old, release.new)
        .await?;

    let filter = BugFilter {
        product: config.tracker.product.clone(),
        forge_url: web_url(&config.forge.host),
        include_closed: config.tracker.include_closed,
    };

    let bugs =
        bugs_for_pull_requests(services.tracker, &filter, &project.slug, &prs)
            .await?;

    info!("found {} bugs", bugs.len());

    let ctx = ReleaseContext {
        new: release.new,
        described: &described,
        rpm: &rpm,
        deb: &deb,
        full_hash: full_hash.as_deref(),
        bugs: &bugs,
        date: release.date,
        packager: &packager,
        tracker_url: &config.tracker.url,
        link_style: config.tracker.link_style,
    };

    Ok(Report::render(&ctx))
}

fn packager(repo: &dyn Repo, config: &Config) -> Result<Packager> {
    let package = &config.package;

    let (author, email) = match (&package.author, &package.email) {
        (Some(author), Some(email)) => (author.clone(), email.clone()),
        (author, email) => {
            let identity = repo.identity()?;
            (
                author.clone().unwrap_or(identity.name),
                email.clone().unwrap_or(identity.email),
            )
        }
    };

    Ok(Packager {
        author,
        email,
        package: package.name.clone(),
        dist_tag: package.dist_tag.clone(),
    })
}
