use std::io::{self, BufWriter};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use esscroll_config::ConfigOverrides;
use esscroll_core::{
    FieldSelection, ScanEnd, ScrollCursor, SearchRequest, SortSpec,
    elasticsearch::ElasticsearchBackend,
};
use tracing::{debug, info};

use super::{GlobalArgs, load_config, log_warnings};
use crate::output::{HitPrinter, OutputFormat};

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Index, alias or comma-separated index pattern to search
    #[arg(long, short)]
    pub index: String,

    /// Text matched across the selected fields; empty matches everything
    #[arg(long, short, default_value = "")]
    pub query: String,

    /// Hits per scroll page
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// How long the cluster keeps the cursor between pages, e.g. 5m
    #[arg(long, value_parser = humantime_duration)]
    pub keep_alive: Option<Duration>,

    /// Fields to match and return, comma separated
    #[arg(long, value_delimiter = ',')]
    pub fields: Vec<String>,

    /// FIELD[:asc|desc]; defaults to index order
    #[arg(long)]
    pub sort: Option<SortSpec>,

    /// Stop after this many hits
    #[arg(long)]
    pub limit: Option<usize>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
    pub output: OutputFormat,

    /// Print hits only
    #[arg(long)]
    pub quiet: bool,
}

fn humantime_duration(raw: &str) -> Result<Duration, String> {
    esscroll_config::util::parse_duration(raw).map_err(|err| err.to_string())
}

impl SearchArgs {
    fn request(&self) -> SearchRequest {
        let mut request = SearchRequest::new(self.index.clone(), self.query.clone());
        if !self.fields.is_empty() {
            request = request.with_fields(self.fields.iter().cloned().collect::<FieldSelection>());
        }
        if let Some(sort) = &self.sort {
            request = request.with_sort(sort.clone());
        }
        request
    }
}

pub async fn run(global: &GlobalArgs, args: SearchArgs) -> Result<()> {
    let load = load_config(
        global,
        ConfigOverrides {
            batch_size: args.batch_size,
            keep_alive: args.keep_alive,
            ..ConfigOverrides::default()
        },
    )?;
    log_warnings(&load.warnings);
    let config = load.config;

    let backend = ElasticsearchBackend::new(config.backend.to_options())
        .context("failed to configure Elasticsearch backend")?;
    let request = config.scroll.apply(args.request());
    debug!(?request, "running search");

    let mut printer = HitPrinter::new(BufWriter::new(io::stdout()), args.output)
        .quiet(args.quiet)
        .limit(args.limit);

    let summary = ScrollCursor::scan(Arc::new(backend), request, |batch| {
        let flow = match printer.write_batch(&batch) {
            Ok(flow) => Ok(flow),
            // Downstream reader went away, e.g. `| head`.
            Err(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(ControlFlow::Break(())),
            Err(err) => Err(anyhow::Error::new(err).context("failed to write hits")),
        };
        async move { flow }
    })
    .await?;

    match printer.finish() {
        Err(err) if err.kind() != io::ErrorKind::BrokenPipe => {
            return Err(anyhow::Error::new(err).context("failed to write hits"));
        }
        _ => {}
    }

    info!(
        printed = printer.written(),
        total_hits = ?summary.total_hits,
        stopped_early = summary.end == ScanEnd::Stopped,
        "search finished"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Command};
    use clap::Parser;
    use esscroll_core::request::SortOrder;

    fn parse(args: &[&str]) -> SearchArgs {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Search(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn builds_request_from_flags() {
        let args = parse(&[
            "esscrollctl",
            "search",
            "--index",
            "logs-*",
            "--query",
            "disk full",
            "--fields",
            "host,message",
            "--sort",
            "@timestamp:desc",
            "--keep-alive",
            "90s",
        ]);

        assert_eq!(args.keep_alive, Some(Duration::from_secs(90)));
        let request = args.request();
        assert_eq!(request.collection, "logs-*");
        assert_eq!(request.query, "disk full");
        assert_eq!(
            request.fields,
            FieldSelection::Only(vec!["host".into(), "message".into()])
        );
        assert_eq!(request.sort, SortSpec::field("@timestamp", SortOrder::Desc));
    }

    #[test]
    fn query_defaults_to_match_everything() {
        let args = parse(&["esscrollctl", "search", "-i", "logs"]);
        let request = args.request();
        assert!(request.query.is_empty());
        assert!(request.fields.is_all());
        assert_eq!(request.sort, SortSpec::Doc);
        assert_eq!(args.output, OutputFormat::Pretty);
    }

    #[test]
    fn rejects_relevance_sort_and_bad_durations() {
        assert!(
            Cli::try_parse_from(["esscrollctl", "search", "-i", "x", "--sort", "_score"]).is_err()
        );
        assert!(
            Cli::try_parse_from(["esscrollctl", "search", "-i", "x", "--keep-alive", "soon"])
                .is_err()
        );
    }
}
