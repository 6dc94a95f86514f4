use std::path::Path;

use anyhow::{Context as _, Result};
use chrono::Utc;

use chronicle_engine::friend_json::{self, SiteMeta};
use chronicle_engine::rss::CORS_HEADERS;
use chronicle_engine::{render_feed, write_atomic, FeedChannel};
use chronicle_logging::{chronicle_debug, chronicle_info};

use crate::context::AppContext;

pub fn rss(ctx: &AppContext, out: &Path) -> Result<()> {
    let site = &ctx.config.site;
    let channel = FeedChannel {
        title: site.title.clone(),
        description: site.description.clone(),
        site_url: site.url.clone(),
        lang: site.lang.clone(),
    };
    let posts = ctx.local_posts(false)?;
    let xml = render_feed(&channel, &posts);
    write_atomic(out, xml.as_bytes()).with_context(|| format!("writing {}", out.display()))?;

    chronicle_info!("Wrote {} items to {}", posts.len(), out.display());
    for (name, value) in CORS_HEADERS {
        chronicle_debug!("Serve with {}: {}", name, value);
    }
    println!("{}", out.display());
    Ok(())
}

pub fn friend_json(ctx: &AppContext, out: &Path) -> Result<()> {
    let site = &ctx.config.site;
    let meta = SiteMeta {
        name: site.title.clone(),
        description: site.description.clone(),
        url: site.url.clone(),
        owner: site.owner.clone(),
        avatar: site.avatar.clone(),
    };
    let posts = ctx.local_posts(false)?;
    let content = friend_json::build(&meta, &posts, Utc::now());
    let json = friend_json::to_json(&content).context("serializing friend content")?;
    write_atomic(out, json.as_bytes()).with_context(|| format!("writing {}", out.display()))?;

    chronicle_info!("Wrote {} posts to {}", content.posts.len(), out.display());
    println!("{}", out.display());
    Ok(())
}
