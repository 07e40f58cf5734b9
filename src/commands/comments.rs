use chrono::NaiveDate;
use futures::{StreamExt, TryStreamExt};
use serde::Serialize;
use std::io::{BufWriter, Write};
use std::sync::Arc;

use ytmeta::comment::tree::build_threads;
use ytmeta::comment::{CommentFetcher, CommentQuery, CommentStream, ReplyQuery};
use ytmeta::config::Config;
use ytmeta::crawler::fetcher::YoutubeFetcher;
use ytmeta::error::Result;
use ytmeta::models::SortOrder;

/// Report progress every this many records
const PROGRESS_EVERY: usize = 100;

pub struct CommentOptions {
    pub sort: SortOrder,
    pub limit: Option<usize>,
    pub since: Option<NaiveDate>,
    pub with_reply_tokens: bool,
    pub threads: bool,
}

fn build_fetcher(config: &Config) -> Result<CommentFetcher> {
    let transport = YoutubeFetcher::from_config(&config.fetcher)?;
    Ok(CommentFetcher::new(Arc::new(transport)))
}

fn log_progress(count: usize) {
    if count % PROGRESS_EVERY == 0 {
        tracing::info!(count, "Records fetched");
    }
}

pub async fn comments(config: &Config, video: &str, options: CommentOptions) -> Result<()> {
    let fetcher = build_fetcher(config)?;

    let mut query = CommentQuery::new()
        .sort(options.sort)
        .on_progress(log_progress);
    if let Some(limit) = options.limit {
        query = query.limit(limit);
    }
    if let Some(since) = options.since {
        query = query.since(since);
    }

    let stream = if options.with_reply_tokens {
        fetcher.fetch_comments_with_reply_tokens(video, query)?
    } else {
        fetcher.fetch_comments(video, query)?
    };

    if options.threads {
        let records: Vec<_> = stream.try_collect().await?;
        write_document(&build_threads(records))
    } else {
        write_lines(stream).await
    }
}

pub async fn replies(
    config: &Config,
    token: &str,
    parent: Option<String>,
    limit: Option<usize>,
) -> Result<()> {
    let fetcher = build_fetcher(config)?;

    let mut query = ReplyQuery::new().on_progress(log_progress);
    if let Some(parent) = parent {
        query = query.parent(parent);
    }
    if let Some(limit) = limit {
        query = query.limit(limit);
    }

    write_lines(fetcher.fetch_replies(token, query)?).await
}

async fn write_lines(stream: CommentStream) -> Result<()> {
    let stdout = std::io::stdout();
    let count = write_records(stream, BufWriter::new(stdout.lock())).await?;
    tracing::info!(count, "Done");
    Ok(())
}

/// Write each record as one JSON line, flushing as records arrive
async fn write_records<W: Write>(mut stream: CommentStream, mut out: W) -> Result<usize> {
    let mut count = 0usize;

    while let Some(record) = stream.next().await {
        let record = record?;
        serde_json::to_writer(&mut out, &record)?;
        writeln!(out)?;
        out.flush()?;
        count += 1;
    }

    Ok(count)
}

fn write_document<T: Serialize>(value: &T) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}
