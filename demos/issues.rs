//! Issue tracker served over the `backend:` scheme.
//!
//! Demonstrates:
//! - Registering GET/POST routes with path placeholders
//! - Answering from a spawned task backed by a `Storage` implementation
//! - Issuing requests through `SchemeRequest` and awaiting `load`/`error`
//!
//! Usage:
//!   cargo run --example issues
//!   cargo run --example issues -- --debug

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use scheme_router::client::{HttpRequest, OfflineRequest, ResponseSnapshot};
use scheme_router::storage::column;
use scheme_router::{
    Error, ExecuteResult, ProtocolRegistry, Request, Response, Result, Router, Row,
    SchemeConfig, SchemeRequest, Storage,
};
use serde_json::{Value, json};
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Constants
// ============================================================================

const SELECT_ISSUES: &str = "SELECT i.rowid AS id, i.name AS name, \
     t.period_in_progress AS timesheet_period_in_progress \
     FROM issues i JOIN timesheets t ON i.rowid = t.issue_id";

const SELECT_ISSUE: &str = "SELECT i.rowid AS id, i.name AS name, \
     t.period_in_progress AS timesheet_period_in_progress, \
     t.jira_next_ref_index AS timesheet_jira_next_ref_index \
     FROM issues i JOIN timesheets t ON i.rowid = t.issue_id \
     WHERE i.rowid = ? LIMIT 1";

const SELECT_PERIODS: &str = "SELECT * FROM timesheet_periods p \
     LEFT JOIN timesheet_period_logrefs l ON l.period_id = p.rowid \
     WHERE p.timesheet_id = ?";

const SELECT_JIRA_LOGS: &str = "SELECT * FROM jira_logs WHERE timesheet_id = ?";

const INSERT_ISSUE: &str = "INSERT INTO issues VALUES (?)";

const INSERT_TIMESHEET: &str = "INSERT INTO timesheets VALUES (?, ?, ?)";

const INSERT_PERIOD: &str = "INSERT INTO timesheet_periods VALUES (?, ?, ?)";

const INSERT_LOGREF: &str = "INSERT INTO timesheet_period_logrefs VALUES (?, ?, ?)";

// ============================================================================
// Args
// ============================================================================

/// Command-line arguments.
#[derive(Debug, Clone)]
struct Args {
    debug: bool,
}

impl Args {
    fn parse() -> Self {
        Self {
            debug: std::env::args().any(|a| a == "--debug"),
        }
    }
}

// ============================================================================
// MemoryStore
// ============================================================================

/// In-memory store answering the fixed set of queries above.
#[derive(Default)]
struct MemoryStore {
    issues: Mutex<Vec<String>>,
    timesheets: Mutex<Vec<(i64, Option<i64>, i64)>>,
    /// `(timesheet_id, start, end)`
    periods: Mutex<Vec<(i64, Option<i64>, Option<i64>)>>,
    /// `(period_id, type, data)`
    logrefs: Mutex<Vec<(i64, String, String)>>,
}

impl MemoryStore {
    fn issue_rows(&self, with_ref_index: bool) -> Vec<Row> {
        let issues = self.issues.lock();
        let timesheets = self.timesheets.lock();

        timesheets
            .iter()
            .filter_map(|&(issue_id, in_progress, next_ref)| {
                let index = usize::try_from(issue_id - 1).ok()?;
                let name = issues.get(index)?;

                let mut row = Row::new();
                row.insert("id".into(), json!(issue_id));
                row.insert("name".into(), json!(name));
                row.insert("timesheet_period_in_progress".into(), json!(in_progress));
                if with_ref_index {
                    row.insert("timesheet_jira_next_ref_index".into(), json!(next_ref));
                }
                Some(row)
            })
            .collect()
    }

    /// One row per period and logref, with null logref columns for
    /// periods that have none.
    fn period_rows(&self, timesheet_id: i64) -> Vec<Row> {
        let periods = self.periods.lock();
        let logrefs = self.logrefs.lock();
        let mut rows = Vec::new();

        for (index, &(owner, start, end)) in periods.iter().enumerate() {
            if owner != timesheet_id {
                continue;
            }
            let period_id = index as i64 + 1;

            let mut base = Row::new();
            base.insert("timesheet_id".into(), json!(owner));
            base.insert("start".into(), json!(start));
            base.insert("end".into(), json!(end));

            let mut matched = false;
            for (_, kind, data) in logrefs.iter().filter(|(p, _, _)| *p == period_id) {
                let mut row = base.clone();
                row.insert("period_id".into(), json!(period_id));
                row.insert("type".into(), json!(kind));
                row.insert("data".into(), json!(data));
                rows.push(row);
                matched = true;
            }
            if !matched {
                for column in ["period_id", "type", "data"] {
                    base.insert(column.into(), Value::Null);
                }
                rows.push(base);
            }
        }

        rows
    }
}

/// Reads the first positional parameter as an integer id.
fn id_param(params: &[Value]) -> Result<i64> {
    params
        .first()
        .and_then(|p| p.as_i64().or_else(|| p.as_str()?.parse().ok()))
        .ok_or_else(|| Error::storage("Expected an integer id"))
}

#[async_trait]
impl Storage for MemoryStore {
    async fn fetch_all(&self, query: &str, params: &[Value]) -> Result<Vec<Row>> {
        match query {
            SELECT_ISSUES => Ok(self.issue_rows(false)),
            SELECT_PERIODS => Ok(self.period_rows(id_param(params)?)),
            SELECT_JIRA_LOGS => Ok(Vec::new()),
            _ => Err(Error::storage(format!("Unsupported query: {query}"))),
        }
    }

    async fn fetch_first(&self, query: &str, params: &[Value]) -> Result<Option<Row>> {
        if query != SELECT_ISSUE {
            return Err(Error::storage(format!("Unsupported query: {query}")));
        }

        let id = id_param(params)?;

        Ok(self
            .issue_rows(true)
            .into_iter()
            .find(|row| row.get("id").and_then(Value::as_i64) == Some(id)))
    }

    async fn execute_statement(&self, query: &str, params: &[Value]) -> Result<ExecuteResult> {
        match (query, params) {
            (INSERT_ISSUE, [Value::String(name)]) => {
                let mut issues = self.issues.lock();
                issues.push(name.clone());
                Ok(ExecuteResult {
                    last_insert_id: issues.len() as i64,
                })
            }
            (INSERT_TIMESHEET, [issue_id, in_progress, next_ref]) => {
                let mut timesheets = self.timesheets.lock();
                timesheets.push((
                    issue_id.as_i64().unwrap_or_default(),
                    in_progress.as_i64(),
                    next_ref.as_i64().unwrap_or(1),
                ));
                Ok(ExecuteResult {
                    last_insert_id: timesheets.len() as i64,
                })
            }
            (INSERT_PERIOD, [timesheet_id, start, end]) => {
                let mut periods = self.periods.lock();
                periods.push((
                    timesheet_id.as_i64().unwrap_or_default(),
                    start.as_i64(),
                    end.as_i64(),
                ));
                Ok(ExecuteResult {
                    last_insert_id: periods.len() as i64,
                })
            }
            (INSERT_LOGREF, [period_id, Value::String(kind), Value::String(data)]) => {
                let mut logrefs = self.logrefs.lock();
                logrefs.push((
                    period_id.as_i64().unwrap_or_default(),
                    kind.clone(),
                    data.clone(),
                ));
                Ok(ExecuteResult {
                    last_insert_id: logrefs.len() as i64,
                })
            }
            _ => Err(Error::storage(format!("Unsupported statement: {query}"))),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Answers from a spawned task, replying with a text error on failure.
fn respond<S, F, Fut>(store: &Arc<S>, res: Response, work: F)
where
    S: Storage + 'static,
    F: FnOnce(Arc<S>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    let store = Arc::clone(store);
    tokio::spawn(async move {
        let outcome = match work(store).await {
            Ok(value) => res.json(&value),
            Err(e) => res.send(e.to_string()),
        };
        if let Err(e) = outcome {
            tracing::warn!(%e, "Reply dropped");
        }
    });
}

async fn list_issues<S: Storage>(store: Arc<S>) -> Result<Value> {
    let rows = store.fetch_all(SELECT_ISSUES, &[]).await?;

    rows.iter()
        .map(|row| {
            Ok(json!({
                "id": column::<i64>(row, "id")?,
                "name": column::<String>(row, "name")?,
                "timesheet": {
                    "periodInProgress": column::<Option<i64>>(row, "timesheet_period_in_progress")?,
                },
            }))
        })
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}

async fn get_issue<S: Storage>(store: Arc<S>, id: String) -> Result<Value> {
    let row = store
        .fetch_first(SELECT_ISSUE, &[json!(id)])
        .await?
        .ok_or_else(|| Error::storage(format!("No issue {id}")))?;

    let issue_id = column::<i64>(&row, "id")?;
    let periods = store.fetch_all(SELECT_PERIODS, &[json!(issue_id)]).await?;
    let logs = store
        .fetch_all(SELECT_JIRA_LOGS, &[json!(issue_id)])
        .await?
        .iter()
        .map(|log| {
            Ok(json!({
                "ref": column::<i64>(log, "ref")?,
                "issueKey": column::<String>(log, "issue_key")?,
                "issueUrl": column::<String>(log, "issue_url")?,
                "loggedTime": column::<i64>(log, "logged_time")?,
                "commitTime": column::<i64>(log, "commit_time")?,
            }))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(json!({
        "id": issue_id,
        "name": column::<String>(&row, "name")?,
        "timesheet": {
            "periodInProgress": column::<Option<i64>>(&row, "timesheet_period_in_progress")?,
            "finishedPeriods": finished_periods(&periods),
            "integrations": {
                "jira": {
                    "nextRefIndex": column::<i64>(&row, "timesheet_jira_next_ref_index")?,
                    "logs": logs,
                }
            }
        }
    }))
}

/// Groups period rows by `start`, one entry per period with its logrefs.
fn finished_periods(rows: &[Row]) -> Vec<Value> {
    let mut groups: Vec<(Value, Value, Vec<Value>)> = Vec::new();

    for row in rows {
        let start = row.get("start").cloned().unwrap_or(Value::Null);
        let logref = json!({ "type": row.get("type"), "data": row.get("data") });

        match groups.iter_mut().find(|(s, _, _)| *s == start) {
            Some((_, _, logrefs)) => logrefs.push(logref),
            None => {
                let end = row.get("end").cloned().unwrap_or(Value::Null);
                groups.push((start, end, vec![logref]));
            }
        }
    }

    groups
        .into_iter()
        .map(|(start, end, logrefs)| json!({ "start": start, "end": end, "logrefs": logrefs }))
        .collect()
}

async fn create_issue<S: Storage>(store: Arc<S>, request: Request) -> Result<Value> {
    let name = request
        .body
        .as_ref()
        .and_then(|body| body.get("name"))
        .cloned()
        .unwrap_or(Value::Null);

    let ExecuteResult { last_insert_id } = store
        .execute_statement(INSERT_ISSUE, std::slice::from_ref(&name))
        .await?;
    store
        .execute_statement(
            INSERT_TIMESHEET,
            &[json!(last_insert_id), Value::Null, json!(1)],
        )
        .await?;

    Ok(json!({
        "id": last_insert_id,
        "name": name,
        "timesheet": {
            "periodInProgress": null,
            "finishedPeriods": [],
            "integrations": { "jira": { "nextRefIndex": 1, "logs": [] } }
        }
    }))
}

fn build_router<S: Storage + 'static>(store: Arc<S>) -> Result<Router> {
    let mut router = Router::with_config(SchemeConfig::default());

    let s = Arc::clone(&store);
    router.get("/db/issues", move |_, res| respond(&s, res, list_issues))?;

    let s = Arc::clone(&store);
    router.get("/db/issues/:id", move |req, res| {
        let id = req.param("id").unwrap_or_default().to_string();
        respond(&s, res, move |store| get_issue(store, id));
    })?;

    let s = store;
    router.post("/db/issues", move |req, res| {
        respond(&s, res, move |store| create_issue(store, req));
    })?;

    Ok(router)
}

// ============================================================================
// Client
// ============================================================================

/// Sends one request over the scheme and waits for `load` or `error`.
async fn call(
    registry: &Arc<ProtocolRegistry>,
    method: &str,
    url: &str,
    body: Option<Value>,
) -> Result<ResponseSnapshot> {
    let mut request = SchemeRequest::new(
        OfflineRequest::new(),
        Arc::clone(registry),
        &SchemeConfig::default(),
    );

    let (tx, rx) = oneshot::channel();
    let tx = Arc::new(Mutex::new(Some(tx)));

    let load_tx = Arc::clone(&tx);
    request.on_load(Box::new(move |snapshot: &ResponseSnapshot| {
        if let Some(tx) = load_tx.lock().take() {
            let _ = tx.send(Ok(snapshot.clone()));
        }
    }));
    request.on_error(Box::new(move |err: &Error| {
        if let Some(tx) = tx.lock().take() {
            let _ = tx.send(Err(err.to_string()));
        }
    }));

    request.open(method, url, true)?;
    let body = match body {
        Some(value) => {
            request.set_request_header("Content-Type", "application/json")?;
            Some(serde_json::to_vec(&value)?)
        }
        None => None,
    };
    request.send(body)?;

    rx.await?.map_err(Error::invalid_state)
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    if let Err(e) = run().await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        "scheme_router=debug"
    } else {
        "scheme_router=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

async fn run() -> Result<()> {
    println!("=== Issues over backend: ===\n");

    let registry = Arc::new(ProtocolRegistry::new());
    let store = Arc::new(MemoryStore::default());
    build_router(Arc::clone(&store))?.listen(&registry)?;

    for name in ["Task A", "Task B"] {
        let created = call(
            &registry,
            "POST",
            "backend:/db/issues",
            Some(json!({ "name": name })),
        )
        .await?;
        println!("[POST] {}", created.response);
    }

    let list = call(&registry, "GET", "backend:/db/issues", None).await?;
    println!("[GET ] {}", list.headers.trim_end());
    println!("       {}", list.response);

    let period = store
        .execute_statement(
            INSERT_PERIOD,
            &[json!(2), json!(1_700_000_000), json!(1_700_003_600)],
        )
        .await?;
    for (kind, data) in [("commit", "a1b2c3"), ("note", "pairing")] {
        store
            .execute_statement(
                INSERT_LOGREF,
                &[json!(period.last_insert_id), json!(kind), json!(data)],
            )
            .await?;
    }

    let one = call(&registry, "GET", "backend:/db/issues/2", None).await?;
    println!("[GET ] {}", one.response);

    match call(&registry, "DELETE", "backend:/db/issues/2", None).await {
        Ok(snapshot) => println!("[DEL ] unexpected {}", snapshot.response),
        Err(e) => println!("[DEL ] {e}"),
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn period_row(start: i64, end: i64, logref: Option<(&str, &str)>) -> Row {
        let mut row = Row::new();
        row.insert("start".into(), json!(start));
        row.insert("end".into(), json!(end));
        row.insert("type".into(), json!(logref.map(|(t, _)| t)));
        row.insert("data".into(), json!(logref.map(|(_, d)| d)));
        row
    }

    #[test]
    fn test_finished_periods_grouped_by_start() {
        let rows = vec![
            period_row(10, 20, Some(("commit", "abc"))),
            period_row(30, 40, None),
            period_row(10, 20, Some(("note", "x"))),
        ];

        let periods = finished_periods(&rows);

        assert_eq!(
            Value::Array(periods),
            json!([
                {
                    "start": 10,
                    "end": 20,
                    "logrefs": [
                        { "type": "commit", "data": "abc" },
                        { "type": "note", "data": "x" }
                    ]
                },
                {
                    "start": 30,
                    "end": 40,
                    "logrefs": [{ "type": null, "data": null }]
                }
            ])
        );
    }

    #[test]
    fn test_finished_periods_empty() {
        assert!(finished_periods(&[]).is_empty());
    }

    #[tokio::test]
    async fn test_get_issue_includes_periods() {
        let store = Arc::new(MemoryStore::default());
        store
            .execute_statement(INSERT_ISSUE, &[json!("Task A")])
            .await
            .unwrap();
        store
            .execute_statement(INSERT_TIMESHEET, &[json!(1), Value::Null, json!(1)])
            .await
            .unwrap();
        let period = store
            .execute_statement(INSERT_PERIOD, &[json!(1), json!(100), json!(200)])
            .await
            .unwrap();
        store
            .execute_statement(
                INSERT_LOGREF,
                &[json!(period.last_insert_id), json!("commit"), json!("abc")],
            )
            .await
            .unwrap();
        store
            .execute_statement(INSERT_PERIOD, &[json!(1), json!(300), json!(400)])
            .await
            .unwrap();

        let issue = get_issue(Arc::clone(&store), "1".into()).await.unwrap();

        assert_eq!(
            issue["timesheet"]["finishedPeriods"],
            json!([
                { "start": 100, "end": 200, "logrefs": [{ "type": "commit", "data": "abc" }] },
                { "start": 300, "end": 400, "logrefs": [{ "type": null, "data": null }] }
            ])
        );
    }

    #[tokio::test]
    async fn test_get_issue_over_scheme() {
        let registry = Arc::new(ProtocolRegistry::new());
        let store = Arc::new(MemoryStore::default());
        build_router(Arc::clone(&store))
            .unwrap()
            .listen(&registry)
            .unwrap();

        call(
            &registry,
            "POST",
            "backend:/db/issues",
            Some(json!({ "name": "Task A" })),
        )
        .await
        .unwrap();
        store
            .execute_statement(INSERT_PERIOD, &[json!(1), json!(5), json!(6)])
            .await
            .unwrap();

        let snapshot = call(&registry, "GET", "backend:/db/issues/1", None)
            .await
            .unwrap();
        let issue: Value = serde_json::from_str(&snapshot.response).unwrap();

        assert_eq!(issue["name"], "Task A");
        assert_eq!(issue["timesheet"]["finishedPeriods"][0]["start"], 5);
    }
}
