//! Wires the catalog, cache, and requester together and drives the eleven
//! (plus two optional) discovery stages in the fixed order the spec
//! requires, per target. Grounded on `Wig.scan_site`
//! (`original_source/wig.py`).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use url::Url;

use crate::cache::Cache;
use crate::context::{ScanContext, Stage, StageOptions};
use crate::discovery::{
    AllCmsStage, CmsStage, CookiesStage, ErrorPageStage, HeadersStage, InterestingStage, IpStage,
    JavaScriptStage, MoreStage, OsStage, PlatformStage, SubdomainsStage, TitleStage, ToolsStage,
    UrlLessStage, VulnerabilitiesStage,
};
use crate::fingerprint::Catalog;
use crate::output::SiteReport;
use crate::request::{Requester, RequesterConfig};

/// Confirms whether a scan should proceed after a cross-host redirect.
/// Invoked only when `StageOptions::quiet` is false; a quiet run always
/// continues without prompting, matching the documented (non-dead-code)
/// behavior of REDESIGN FLAG (a).
pub type RedirectConfirm = Arc<dyn Fn(&str) -> bool + Send + Sync>;

fn default_redirect_confirm() -> RedirectConfirm {
    Arc::new(|new_base: &str| {
        eprint!("Redirected to {new_base}. Continue? [Y/n]: ");
        use std::io::Write as _;
        let _ = std::io::stderr().flush();
        let mut line = String::new();
        if std::io::stdin().read_line(&mut line).is_err() {
            return true;
        }
        !matches!(line.trim(), "n" | "N")
    })
}

pub struct Orchestrator {
    pub catalog: Arc<Catalog>,
    pub cache_dir: PathBuf,
    pub ttl_secs: u64,
    pub requester_config: RequesterConfig,
    pub stage_options: StageOptions,
    pub no_cache_load: bool,
    pub no_cache_save: bool,
    pub confirm_redirect: RedirectConfirm,
}

impl Orchestrator {
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, cache_dir: PathBuf, requester_config: RequesterConfig, stage_options: StageOptions) -> Self {
        Self {
            catalog,
            cache_dir,
            ttl_secs: crate::cache::DEFAULT_TTL_SECS,
            requester_config,
            stage_options,
            no_cache_load: false,
            no_cache_save: false,
            confirm_redirect: default_redirect_confirm(),
        }
    }

    pub async fn scan_target(&self, target: &str) -> SiteReport {
        let Ok(parsed) = Url::parse(target) else {
            return SiteReport::error(target.to_string(), "invalid target URL".to_string());
        };
        let Some(host) = parsed.host_str().map(str::to_string) else {
            return SiteReport::error(target.to_string(), "target URL has no host".to_string());
        };

        let mut cache = Cache::new(self.cache_dir.clone(), self.ttl_secs);
        cache.set_host(&host);
        if !self.no_cache_load {
            if let Err(e) = cache.load() {
                log::warn!("cache load failed for {host}: {e}");
            }
        }
        let cache = Arc::new(cache);

        let requester = Arc::new(Requester::new(self.requester_config.clone(), cache.clone()));

        let (mut base_url, mut target_host) = (target.trim_end_matches('/').to_string(), host.clone());
        requester.set_scope(parsed.scheme(), &host);

        match requester.detect_redirect(target).await {
            Err(e) => return SiteReport::error(target.to_string(), e.to_string()),
            Ok((redirected, new_base)) => {
                if redirected {
                    if !self.stage_options.quiet && !(self.confirm_redirect)(&new_base) {
                        return SiteReport::error(target.to_string(), format!("redirected to {new_base}, scan aborted"));
                    }
                    if let Ok(new_parsed) = Url::parse(&new_base) {
                        if let Some(new_host) = new_parsed.host_str() {
                            target_host = new_host.to_string();
                            requester.set_scope(new_parsed.scheme(), new_host);
                        }
                    }
                    base_url = new_base;
                }
            }
        }

        let start_time = Utc::now();
        let started = Instant::now();

        let mut ctx = ScanContext::new(
            requester,
            self.catalog.clone(),
            cache.clone(),
            base_url.clone(),
            target_host,
            self.stage_options.clone(),
        );

        run_stage(&mut ctx, "title", &TitleStage).await;
        run_stage(&mut ctx, "ip", &IpStage).await;
        run_stage(&mut ctx, "error_page", &ErrorPageStage).await;
        run_stage(&mut ctx, "cms", &CmsStage).await;
        run_stage(&mut ctx, "platform", &PlatformStage).await;
        run_stage(&mut ctx, "interesting", &InterestingStage).await;
        run_stage(&mut ctx, "more", &MoreStage).await;
        run_stage(&mut ctx, "javascript", &JavaScriptStage).await;
        run_stage(&mut ctx, "urlless", &UrlLessStage).await;
        run_stage(&mut ctx, "cookies", &CookiesStage).await;
        run_stage(&mut ctx, "headers", &HeadersStage).await;
        run_stage(&mut ctx, "os", &OsStage).await;
        if ctx.options.match_all {
            run_stage(&mut ctx, "all_cms", &AllCmsStage).await;
        }

        ctx.results.update();

        run_stage(&mut ctx, "vulnerabilities", &VulnerabilitiesStage).await;
        run_stage(&mut ctx, "tools", &ToolsStage).await;
        if ctx.options.subdomains {
            run_stage(&mut ctx, "subdomains", &SubdomainsStage).await;
        }

        if !self.no_cache_save {
            if let Err(e) = cache.save() {
                log::warn!("cache save failed for {host}: {e}");
            }
        }

        let run_time = started.elapsed().as_secs_f64();
        let fingerprints = self.catalog.cms.len()
            + self.catalog.js.len()
            + self.catalog.platform.len()
            + self.catalog.os.len()
            + self.catalog.error_pages.len()
            + self.catalog.interesting.len();

        SiteReport::from_results(
            base_url,
            start_time.to_rfc3339(),
            run_time,
            cache.size_distinct_ids(),
            fingerprints,
            &ctx.results,
        )
    }
}

async fn run_stage(ctx: &mut ScanContext, name: &str, stage: &dyn StageRunner) {
    if let Err(e) = stage.run_boxed(ctx).await {
        log::warn!("{name} stage failed: {e}");
    }
}

/// Object-safe shim over [`Stage`]: native `async fn` in a trait isn't
/// object-safe, so each stage's `run` is boxed here only at this one
/// sequencing call site, keeping every stage's own implementation a plain
/// `async fn`.
trait StageRunner {
    fn run_boxed<'a>(
        &'a self,
        ctx: &'a mut ScanContext,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = crate::error::Result<()>> + Send + 'a>>;
}

impl<T: Stage + Sync> StageRunner for T {
    fn run_boxed<'a>(
        &'a self,
        ctx: &'a mut ScanContext,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = crate::error::Result<()>> + Send + 'a>> {
        Box::pin(self.run(ctx))
    }
}
