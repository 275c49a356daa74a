//! Debounced search state.
//!
//! Typing only issues a request once the query has been stable for
//! [`DEBOUNCE`]. Page and filter changes go out immediately. Changing the query
//! or the filters sends the reader back to page 1.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::debug;

use crate::types::{SearchFilters, SearchRequest};

pub const DEBOUNCE: Duration = Duration::from_millis(300);
pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone)]
enum Command {
    Query(String),
    Page(u32),
    Filters(SearchFilters),
}

/// Handle used to drive a running search task. Dropping every handle ends the
/// task once any pending query has been flushed.
#[derive(Debug, Clone)]
pub struct SearchController {
    commands: mpsc::UnboundedSender<Command>,
}

impl SearchController {
    /// Starts the task and returns the handle plus the stream of requests to run.
    pub fn spawn(limit: u32) -> (Self, mpsc::UnboundedReceiver<SearchRequest>, JoinHandle<()>) {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (request_tx, requests) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(command_rx, request_tx, limit));
        (Self { commands }, requests, task)
    }

    pub fn set_query(&self, query: impl Into<String>) {
        let _ = self.commands.send(Command::Query(query.into()));
    }

    pub fn set_page(&self, page: u32) {
        let _ = self.commands.send(Command::Page(page.max(1)));
    }

    pub fn set_filters(&self, filters: SearchFilters) {
        let _ = self.commands.send(Command::Filters(filters));
    }
}

async fn run(
    mut commands: mpsc::UnboundedReceiver<Command>,
    requests: mpsc::UnboundedSender<SearchRequest>,
    limit: u32,
) {
    let mut state = SearchRequest {
        query: String::new(),
        filters: SearchFilters::default(),
        page: 1,
        limit,
    };
    let mut deadline: Option<Instant> = None;

    loop {
        let command = match deadline {
            Some(at) => {
                tokio::select! {
                    command = commands.recv() => command,
                    _ = sleep_until(at) => {
                        deadline = None;
                        emit(&requests, &state);
                        continue;
                    }
                }
            }
            None => commands.recv().await,
        };

        let Some(command) = command else {
            if deadline.is_some() {
                emit(&requests, &state);
            }
            break;
        };

        match command {
            Command::Query(query) => {
                state.query = query;
                state.page = 1;
                deadline = Some(Instant::now() + DEBOUNCE);
            }
            Command::Page(page) => {
                state.page = page;
                deadline = None;
                emit(&requests, &state);
            }
            Command::Filters(filters) => {
                state.filters = filters;
                state.page = 1;
                deadline = None;
                emit(&requests, &state);
            }
        }
    }
}

fn emit(requests: &mpsc::UnboundedSender<SearchRequest>, state: &SearchRequest) {
    debug!(query = %state.query, page = state.page, "Search request ready");
    let _ = requests.send(state.clone());
}
