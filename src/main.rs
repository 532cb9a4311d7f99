// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Framebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Framebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Framebridge CLI entrypoint.
//!
//! Hosts the command channel over stdio: every stdin line is one inbound frame message
//! `{"origin": ..., "data": ...}`, every stdout line one posted reply
//! `{"targetOrigin": ..., "message": ...}`. Logs go to stderr.

use std::error::Error;
use std::sync::Arc;

use framebridge::format::mermaid::FlowchartParser;
use framebridge::model::MemoryGraph;
use framebridge::respond::{announce_ready, ReplyError, ReplyHandle};
use framebridge::router::{InboundEvent, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, Mutex};
use tokio::task::{JoinError, JoinSet};

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--query <string>] [--config <file.json>]\n  {program} --help\n\nReads one JSON message per stdin line: {{\"origin\": \"https://host\", \"data\": {{...}}}}\nand writes one JSON reply per stdout line: {{\"targetOrigin\": \"...\", \"message\": {{...}}}}.\n\n--query applies request-line parameters, e.g. `parseTimeout=5000&debugMode=true`.\n--config reads the process-wide override object from a JSON file.\n\nFRAMEBRIDGE_LOG overrides the log filter (stderr)."
    );
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct CliOptions {
    help: bool,
    query: Option<String>,
    config_path: Option<String>,
}

fn parse_options(mut args: impl Iterator<Item = String>) -> Result<CliOptions, ()> {
    let mut options = CliOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => options.help = true,
            "--query" => {
                if options.query.is_some() {
                    return Err(());
                }
                options.query = Some(args.next().ok_or(())?);
            }
            "--config" => {
                if options.config_path.is_some() {
                    return Err(());
                }
                options.config_path = Some(args.next().ok_or(())?);
            }
            _ => return Err(()),
        }
    }

    Ok(options)
}

#[derive(Debug, Deserialize)]
struct InboundLine {
    #[serde(default)]
    origin: Option<String>,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OutboundLine<'a> {
    target_origin: &'a str,
    message: Value,
}

/// Queues replies for the stdout writer task.
struct StdoutReply {
    lines: mpsc::UnboundedSender<String>,
}

impl ReplyHandle for StdoutReply {
    fn post(&self, message: &str, target_origin: &str) -> Result<(), ReplyError> {
        let message =
            serde_json::from_str(message).map_err(|err| ReplyError::Encode(err.to_string()))?;
        let line = serde_json::to_string(&OutboundLine { target_origin, message })
            .map_err(|err| ReplyError::Encode(err.to_string()))?;
        self.lines.send(line).map_err(|_| ReplyError::Closed)
    }
}

/// Collects handlers that already finished so the set only holds in-flight requests.
fn reap_finished(tasks: &mut JoinSet<()>) -> Result<(), JoinError> {
    while let Some(joined) = tasks.try_join_next() {
        joined?;
    }
    Ok(())
}

async fn serve(router: Router<MemoryGraph>) -> Result<(), Box<dyn Error>> {
    let (sender, mut receiver) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = receiver.recv().await {
            stdout.write_all(line.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
        Ok::<(), std::io::Error>(())
    });

    let reply: Arc<dyn ReplyHandle> = Arc::new(StdoutReply { lines: sender });
    announce_ready(reply.as_ref())?;
    tracing::info!("command channel ready");

    let mut tasks = JoinSet::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let inbound: InboundLine = match serde_json::from_str(&line) {
            Ok(inbound) => inbound,
            Err(err) => {
                tracing::warn!(error = %err, "skipping malformed input line");
                continue;
            }
        };
        let event = InboundEvent {
            origin: inbound.origin,
            data: inbound.data,
            source: Some(reply.clone()),
        };
        let router = router.clone();
        tasks.spawn(async move {
            router.handle(event).await;
        });
        reap_finished(&mut tasks)?;
    }

    while let Some(joined) = tasks.join_next().await {
        joined?;
    }
    drop(reply);
    writer.await??;
    Ok(())
}

fn main() {
    let result = (|| -> Result<(), Box<dyn Error>> {
        let mut args = std::env::args();
        let program = args.next().unwrap_or_else(|| "framebridge".to_owned());

        let options = match parse_options(args) {
            Ok(options) => options,
            Err(()) => {
                print_usage(&program);
                std::process::exit(2);
            }
        };
        if options.help {
            print_usage(&program);
            return Ok(());
        }

        let global = match &options.config_path {
            Some(path) => Some(serde_json::from_str::<Value>(&std::fs::read_to_string(path)?)?),
            None => None,
        };
        let config = framebridge::config::resolve(global.as_ref(), options.query.as_deref());
        framebridge::telemetry::init(config.debug_mode);
        tracing::debug!(?config, "configuration resolved");

        let router = Router::new(
            Arc::new(config),
            Arc::new(FlowchartParser),
            Arc::new(Mutex::new(MemoryGraph::new())),
        );

        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        runtime.block_on(serve(router))
    })();

    if let Err(err) = result {
        eprintln!("framebridge: {err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_options, reap_finished, CliOptions, ReplyHandle, StdoutReply};
    use tokio::task::JoinSet;

    #[test]
    fn parses_empty_args() {
        let options = parse_options(std::iter::empty()).expect("parse options");
        assert_eq!(options, CliOptions::default());
    }

    #[test]
    fn parses_query_and_config() {
        let options = parse_options(
            ["--query".to_owned(), "debugMode=true".to_owned(), "--config".to_owned(), "c.json".to_owned()]
                .into_iter(),
        )
        .expect("parse options");
        assert_eq!(options.query.as_deref(), Some("debugMode=true"));
        assert_eq!(options.config_path.as_deref(), Some("c.json"));
        assert!(!options.help);
    }

    #[test]
    fn parses_help_flag() {
        let options = parse_options(["--help".to_owned()].into_iter()).expect("parse options");
        assert!(options.help);
    }

    #[test]
    fn rejects_unknown_args() {
        parse_options(["--nope".to_owned()].into_iter()).unwrap_err();
        parse_options(["positional".to_owned()].into_iter()).unwrap_err();
    }

    #[test]
    fn rejects_duplicate_flags_and_missing_values() {
        parse_options(
            ["--query".to_owned(), "a=1".to_owned(), "--query".to_owned(), "b=2".to_owned()]
                .into_iter(),
        )
        .unwrap_err();
        parse_options(["--config".to_owned()].into_iter()).unwrap_err();
    }

    #[test]
    fn replies_are_wrapped_with_their_target() {
        let (lines, mut receiver) = tokio::sync::mpsc::unbounded_channel();
        let reply = StdoutReply { lines };
        reply.post(r#"{"event":"modifyStyle","status":"ok"}"#, "https://a.example").expect("post");

        let line = receiver.try_recv().expect("line");
        assert_eq!(
            line,
            r#"{"targetOrigin":"https://a.example","message":{"event":"modifyStyle","status":"ok"}}"#
        );
    }

    #[tokio::test]
    async fn finished_handlers_are_reaped_while_reading() {
        let mut tasks = JoinSet::new();
        tasks.spawn(async {});
        tasks.spawn(std::future::pending::<()>());
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }

        reap_finished(&mut tasks).expect("reap");
        assert_eq!(tasks.len(), 1);
        tasks.abort_all();
    }
}
