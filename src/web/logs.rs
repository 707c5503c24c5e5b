use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;

use super::AppState;
use crate::logging::LOG_FILE_PREFIX;

const LOG_FILE_SUFFIX: &str = "log";

const DEFAULT_TAIL_LINES: usize = 200;
const MAX_TAIL_LINES: usize = 10_000;

#[derive(Debug, Deserialize)]
pub struct TailParams {
    pub lines: Option<usize>,
}

pub async fn logs_tail(
    State(state): State<AppState>,
    Query(params): Query<TailParams>,
) -> impl IntoResponse {
    let max_lines = params
        .lines
        .unwrap_or(DEFAULT_TAIL_LINES)
        .min(MAX_TAIL_LINES);
    let Some(path) = resolve_log_file_path(&state.log_file).await else {
        return (StatusCode::NOT_FOUND, "Log file not available").into_response();
    };
    match fs::read_to_string(&path).await {
        Ok(contents) => {
            let mut resp = Response::new(tail_lines(&contents, max_lines).into());
            resp.headers_mut().insert(
                header::CONTENT_TYPE,
                header::HeaderValue::from_static("text/plain; charset=utf-8"),
            );
            resp
        }
        Err(_) => (StatusCode::NOT_FOUND, "Log file not available").into_response(),
    }
}

fn tail_lines(contents: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = contents.lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}

fn name_matches(file_name: &str) -> bool {
    file_name.starts_with(LOG_FILE_PREFIX) && file_name.ends_with(&format!(".{LOG_FILE_SUFFIX}"))
}

// The appender rolls daily into the configured file's directory, so the
// configured path itself rarely exists; pick the newest rolled file instead.
async fn resolve_log_file_path(configured_path: &str) -> Option<PathBuf> {
    let configured = Path::new(configured_path);
    if let Ok(md) = fs::metadata(configured).await
        && md.is_file()
    {
        return Some(configured.to_path_buf());
    }

    let search_dir = if configured.extension().is_some() {
        configured.parent().unwrap_or_else(|| Path::new("."))
    } else {
        configured
    };

    let mut best: Option<(SystemTime, PathBuf)> = None;
    let mut rd = fs::read_dir(search_dir).await.ok()?;
    while let Ok(Some(entry)) = rd.next_entry().await {
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        if !name_matches(&name) {
            continue;
        }
        if let Ok(md) = entry.metadata().await
            && md.is_file()
            && let Ok(modified) = md.modified()
            && best.as_ref().is_none_or(|(t, _)| modified > *t)
        {
            best = Some((modified, entry.path()));
        }
    }
    best.map(|(_, path)| path)
}
