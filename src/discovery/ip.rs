//! Resolves the target host to an IP address for `site_info.ip`.

use crate::context::{ScanContext, Stage};
use crate::error::Result;

pub struct IpStage;

impl Stage for IpStage {
    async fn run(&self, ctx: &mut ScanContext) -> Result<()> {
        let host = ctx.target_host.clone();
        let lookup = format!("{host}:80");
        if let Ok(mut addrs) = tokio::net::lookup_host(lookup).await {
            if let Some(addr) = addrs.next() {
                ctx.results.site_info.ip = Some(addr.ip().to_string());
            }
        }
        Ok(())
    }
}
