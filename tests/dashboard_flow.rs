use ops_command_center::config::DashboardConfig;
use ops_command_center::dispatch::{DispatchFailure, DispatchOutcome};
use ops_command_center::editor::{DraftEdit, EditPhase};
use ops_command_center::models::{NoticeLevel, SourceKind, TaskForm};
use ops_command_center::sources::{ConnectorTransport, RawTable};
use ops_command_center::{AppError, CommandCenter};
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

type Sheets = Arc<Mutex<HashMap<SourceKind, Vec<Vec<String>>>>>;

#[derive(Debug, Clone)]
struct Captured {
    path: String,
    body: Value,
}

struct StubWebhook {
    base_url: String,
    requests: Arc<Mutex<Vec<Captured>>>,
    reply: Arc<Mutex<(u16, String)>>,
    delay: Arc<Mutex<Duration>>,
}

impl StubWebhook {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
        let addr = listener.local_addr().expect("stub addr");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let reply = Arc::new(Mutex::new((200, r#"{"status":"ok"}"#.to_string())));
        let delay = Arc::new(Mutex::new(Duration::ZERO));
        tokio::spawn({
            let requests = requests.clone();
            let reply = reply.clone();
            let delay = delay.clone();
            async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let requests = requests.clone();
                    let reply = reply.clone();
                    let delay = *delay.lock().expect("delay lock");
                    tokio::spawn(async move {
                        let _ = serve(stream, requests, reply, delay).await;
                    });
                }
            }
        });
        Self {
            base_url: format!("http://{addr}"),
            requests,
            reply,
            delay,
        }
    }

    fn delay_replies(&self, delay: Duration) {
        *self.delay.lock().expect("delay lock") = delay;
    }

    fn respond_with(&self, code: u16, body: &str) {
        *self.reply.lock().expect("reply lock") = (code, body.to_string());
    }

    fn requests(&self) -> Vec<Captured> {
        self.requests.lock().expect("requests lock").clone()
    }
}

async fn serve(
    mut stream: TcpStream,
    requests: Arc<Mutex<Vec<Captured>>>,
    reply: Arc<Mutex<(u16, String)>>,
    delay: Duration,
) -> std::io::Result<()> {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    let header_end = loop {
        let read = stream.read(&mut buf).await?;
        if read == 0 {
            return Ok(());
        }
        data.extend_from_slice(&buf[..read]);
        if let Some(pos) = data.windows(4).position(|window| window == b"\r\n\r\n") {
            break pos + 4;
        }
    };
    let head = String::from_utf8_lossy(&data[..header_end]).to_string();
    let length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while data.len() < header_end + length {
        let read = stream.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        data.extend_from_slice(&buf[..read]);
    }
    let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();
    let end = data.len().min(header_end + length);
    let body = serde_json::from_slice(&data[header_end..end]).unwrap_or(Value::Null);
    requests.lock().expect("requests lock").push(Captured { path, body });

    tokio::time::sleep(delay).await;
    let (code, body) = reply.lock().expect("reply lock").clone();
    let response = format!(
        "HTTP/1.1 {code} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

fn rows(matrix: &[&[&str]]) -> Vec<Vec<String>> {
    matrix
        .iter()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect()
}

fn leads_sheet() -> Vec<Vec<String>> {
    rows(&[
        &["Lead ID", "Name", "Organization", "Email", "Status"],
        &["L1", "Ann Ortiz", "Hope Church", "ann@hope.org", "Pending Review"],
        &["L2", "Bo Li", "City of Akron", "bo@akron.gov", "pending review"],
        &["L3", "Cy Hart", "Acme", "cy@acme.com", "approved"],
    ])
}

fn tasks_sheet(priority: &str) -> Vec<Vec<String>> {
    rows(&[
        &["Task ID", "Task Type", "Task Title", "Status ", "Priority ", "Assigned To", "Deadline Date"],
        &["T-100", "Audit", "Annual audit", "New", priority, "Lee", "2026-12-01"],
        &["T-101", "Grant Writing", "Spring grant", "In Progress", "Low", "Kim", "2026-11-15"],
    ])
}

async fn harness() -> (Arc<CommandCenter>, Sheets, StubWebhook) {
    harness_with_timeout(5).await
}

async fn harness_with_timeout(seconds: u64) -> (Arc<CommandCenter>, Sheets, StubWebhook) {
    let stub = StubWebhook::start().await;
    let sheets: Sheets = Arc::new(Mutex::new(HashMap::new()));
    {
        let mut guard = sheets.lock().expect("sheets lock");
        guard.insert(SourceKind::Leads, leads_sheet());
        guard.insert(SourceKind::Tasks, tasks_sheet("Medium"));
    }
    let shared = sheets.clone();
    let transport = ConnectorTransport::new(move |kind, _| {
        let matrix = shared
            .lock()
            .map_err(|_| AppError::Internal("sheet lock poisoned".to_string()))?
            .get(&kind)
            .cloned()
            .ok_or_else(|| AppError::Transport(format!("{kind} sheet unreachable")))?;
        Ok(RawTable::from_matrix(matrix))
    });

    let mut config = DashboardConfig::default();
    config.cora_sheet_url = Some("host://cora".to_string());
    config.opsi_sheet_url = Some("host://opsi".to_string());
    config.webhooks.base_url = Some(stub.base_url.clone());
    config.timeout_seconds = Some(seconds);
    let center = CommandCenter::with_transport(config, Arc::new(transport)).expect("command center");
    (center, sheets, stub)
}

fn set_sheet(sheets: &Sheets, kind: SourceKind, matrix: Vec<Vec<String>>) {
    sheets.lock().expect("sheets lock").insert(kind, matrix);
}

fn break_sheet(sheets: &Sheets, kind: SourceKind) {
    sheets.lock().expect("sheets lock").remove(&kind);
}

#[tokio::test]
async fn approval_page_offers_only_pending_rows() {
    let (center, _sheets, _stub) = harness().await;
    let session = center.open_session().await;
    let view = center.approvals(&session, SourceKind::Leads).await.expect("render");
    let ids: Vec<_> = view.rows.iter().map(|row| row.id.as_str()).collect();
    assert_eq!(ids, vec!["L1", "L2"]);
    assert!(!view.approve_enabled);

    assert_eq!(center.toggle_selection(&session, SourceKind::Leads, "L3").await.expect("toggle"), None);
    assert_eq!(center.toggle_selection(&session, SourceKind::Leads, "L1").await.expect("toggle"), Some(true));
    let view = center.approvals(&session, SourceKind::Leads).await.expect("render");
    assert_eq!(view.selected_count, 1);
    assert!(view.approve_enabled);
}

#[tokio::test]
async fn delivered_approval_clears_selection_and_cache() {
    let (center, sheets, stub) = harness().await;
    let session = center.open_session().await;
    center.approvals(&session, SourceKind::Leads).await.expect("render");
    assert_eq!(center.select_all(&session, SourceKind::Leads, true).await.expect("select"), 2);

    let outcome = center.approve_selected(&session, SourceKind::Leads).await.expect("dispatch");
    assert!(outcome.is_success());
    assert!(center.sources().cache().is_empty().await);

    let requests = stub.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path, "/mark-approve-leads");
    assert_eq!(requests[0].body["approved_leads"], serde_json::json!(["L1", "L2"]));
    assert_eq!(requests[0].body["approved_by"], "Dashboard User");
    assert!(requests[0].body["timestamp"].as_str().is_some_and(|stamp| stamp.ends_with('Z')));

    set_sheet(
        &sheets,
        SourceKind::Leads,
        rows(&[
            &["Lead ID", "Name", "Status"],
            &["L1", "Ann Ortiz", "approved"],
            &["L2", "Bo Li", "approved"],
        ]),
    );
    let view = center.approvals(&session, SourceKind::Leads).await.expect("render");
    assert_eq!(view.selected_count, 0);
    assert_eq!(view.approved_ids, vec!["L1", "L2"]);
    assert_eq!(view.notices[0].level, NoticeLevel::Success);
    assert_eq!(view.notices[0].message, "Successfully approved 2 lead(s)!");
    assert_eq!(view.notices[1].message, "MARK will send outreach emails shortly.");
    assert!(view
        .notices
        .iter()
        .any(|notice| notice.message == "All leads have been reviewed! No pending approvals."));

    let again = center.approvals(&session, SourceKind::Leads).await.expect("render");
    assert!(again.approved_ids.is_empty());
}

#[tokio::test]
async fn failed_approval_keeps_selection() {
    let (center, _sheets, stub) = harness().await;
    stub.respond_with(500, r#"{"message":"workflow crashed"}"#);
    let session = center.open_session().await;
    center.approvals(&session, SourceKind::Leads).await.expect("render");
    center.select_all(&session, SourceKind::Leads, true).await.expect("select");

    let outcome = center.approve_selected(&session, SourceKind::Leads).await.expect("dispatch");
    match outcome {
        DispatchOutcome::Failed(DispatchFailure::Status { code, ref body }) => {
            assert_eq!(code, 500);
            assert!(body.contains("workflow crashed"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(!center.sources().cache().is_empty().await);

    let view = center.approvals(&session, SourceKind::Leads).await.expect("render");
    assert_eq!(view.selected_count, 2);
    assert_eq!(view.notices[0].level, NoticeLevel::Error);
    assert!(view.notices[0].message.starts_with("Failed to send to MARK: HTTP 500"));
    assert_eq!(view.notices[1].message, "Check that the MARK webhook is running in n8n");
}

#[tokio::test]
async fn slow_webhook_times_out_and_keeps_selection() {
    let (center, _sheets, stub) = harness_with_timeout(1).await;
    stub.delay_replies(Duration::from_secs(3));
    let session = center.open_session().await;
    center.approvals(&session, SourceKind::Leads).await.expect("render");
    center.select_all(&session, SourceKind::Leads, true).await.expect("select");

    let outcome = center.approve_selected(&session, SourceKind::Leads).await.expect("dispatch");
    assert!(
        matches!(outcome, DispatchOutcome::Failed(DispatchFailure::Timeout { seconds: 1 })),
        "unexpected outcome: {outcome:?}"
    );
    assert!(!center.sources().cache().is_empty().await);

    let view = center.approvals(&session, SourceKind::Leads).await.expect("render");
    assert_eq!(view.selected_count, 2);
    assert!(view.approved_ids.is_empty());
    assert_eq!(view.notices[0].message, "Failed to send to MARK: no response within 1s");
}

#[tokio::test]
async fn select_all_picks_up_rows_that_arrive_later() {
    let (center, sheets, _stub) = harness().await;
    let session = center.open_session().await;
    center.approvals(&session, SourceKind::Leads).await.expect("render");
    assert_eq!(center.select_all(&session, SourceKind::Leads, true).await.expect("select"), 2);

    let mut grown = leads_sheet();
    grown.push(vec![
        "L4".to_string(),
        "Di Moss".to_string(),
        "Grace Church".to_string(),
        "di@grace.org".to_string(),
        "Pending Review".to_string(),
    ]);
    set_sheet(&sheets, SourceKind::Leads, grown);
    center.sources().invalidate().await;

    let view = center.approvals(&session, SourceKind::Leads).await.expect("render");
    assert_eq!(view.rows.len(), 3);
    assert_eq!(view.selected_count, 3);
    assert!(view.all_selected);
}

#[tokio::test]
async fn draft_survives_a_failed_sheet_read() {
    let (center, sheets, _stub) = harness().await;
    let session = center.open_session().await;
    center.open_task(&session, "T-100").await.expect("open");
    center
        .edit_task(&session, DraftEdit::Notes("call the auditor".to_string()))
        .await
        .expect("edit");

    break_sheet(&sheets, SourceKind::Tasks);
    center.sources().invalidate().await;
    let board = center.task_board(&session).await.expect("board");
    assert_eq!(board.editor.phase, EditPhase::Draft);
    assert_eq!(
        board.editor.draft.as_ref().map(|draft| draft.notes.as_str()),
        Some("call the auditor")
    );
    assert!(board
        .notices
        .iter()
        .any(|notice| notice.message.starts_with("Could not load OPSI data: TRANSPORT_FAILURE")));

    set_sheet(&sheets, SourceKind::Tasks, tasks_sheet("Medium"));
    let board = center.task_board(&session).await.expect("board");
    assert_eq!(board.editor.phase, EditPhase::Draft);
    assert!(board.editor.current.is_some());
}

#[tokio::test]
async fn invalid_task_is_never_sent() {
    let (center, _sheets, stub) = harness().await;
    let session = center.open_session().await;
    let form = TaskForm {
        title: "   ".to_string(),
        task_type: Some("Audit".to_string()),
        assigned_to: "Lee".to_string(),
        deadline: NaiveDate::from_ymd_opt(2026, 11, 30).expect("date"),
        priority: Some("High".to_string()),
        notes: String::new(),
    };
    let error = center.create_task(&session, form).await.expect_err("validation");
    assert!(matches!(error, AppError::Validation(ref errors) if errors == &vec!["Task title is required.".to_string()]));
    assert!(stub.requests().is_empty());
}

#[tokio::test]
async fn created_task_uses_assigned_id() {
    let (center, _sheets, stub) = harness().await;
    stub.respond_with(200, r#"{"taskId":"T-777"}"#);
    let session = center.open_session().await;
    let form = TaskForm {
        title: " Renew insurance ".to_string(),
        task_type: Some("Contract Renewal".to_string()),
        assigned_to: "Kim".to_string(),
        deadline: NaiveDate::from_ymd_opt(2026, 11, 30).expect("date"),
        priority: Some("Medium".to_string()),
        notes: "broker call".to_string(),
    };
    let outcome = center.create_task(&session, form).await.expect("dispatch");
    let created = outcome.into_option().expect("delivered");
    assert_eq!(created.task_id, "T-777");

    let requests = stub.requests();
    assert_eq!(requests[0].path, "/opsi-create-task");
    assert_eq!(requests[0].body["title"], "Renew insurance");
    assert_eq!(requests[0].body["deadline"], "2026-11-30");
    assert_eq!(requests[0].body["status"], "New");
    assert!(requests[0].body["taskId"].as_str().is_some_and(|id| id.starts_with("OPSI-")));

    let board = center.task_board(&session).await.expect("board");
    assert_eq!(board.notices[0].message, "Task 'Renew insurance' created successfully!");
}

#[tokio::test]
async fn edited_task_round_trips_through_update_webhook() {
    let (center, sheets, stub) = harness().await;
    let session = center.open_session().await;
    center.set_task_id_search(&session, "100").await.expect("search");
    let board = center.task_board(&session).await.expect("board");
    assert_eq!(board.editor.options.len(), 1);
    assert!(board.editor.expanded);

    let draft = center.open_task(&session, "T-100").await.expect("open");
    assert_eq!(draft.priority, "Medium");
    center
        .edit_task(&session, DraftEdit::Priority("High".to_string()))
        .await
        .expect("edit");

    let outcome = center.submit_task_edit(&session).await.expect("dispatch");
    assert!(outcome.is_success());
    let requests = stub.requests();
    assert_eq!(requests[0].path, "/opsi-update-task");
    assert_eq!(requests[0].body["taskId"], "T-100");
    assert_eq!(requests[0].body["priority"], "High");
    assert_eq!(requests[0].body["status"], "New");

    set_sheet(&sheets, SourceKind::Tasks, tasks_sheet("High"));
    let board = center.task_board(&session).await.expect("board");
    assert_eq!(board.editor.phase, EditPhase::Unopened);
    assert!(board.editor.draft.is_none());
    assert!(board.editor.task_id_search.is_empty());
    assert_eq!(board.notices[0].message, "Task T-100 updated successfully!");
    assert_eq!(board.active.rows[0][4], "High");
}

#[tokio::test]
async fn failed_update_returns_draft_to_editing() {
    let (center, _sheets, stub) = harness().await;
    stub.respond_with(502, "");
    let session = center.open_session().await;
    center.open_task(&session, "T-100").await.expect("open");
    center
        .edit_task(&session, DraftEdit::Notes("waiting on CPA".to_string()))
        .await
        .expect("edit");

    let outcome = center.submit_task_edit(&session).await.expect("dispatch");
    assert!(!outcome.is_success());

    let board = center.task_board(&session).await.expect("board");
    assert_eq!(board.editor.phase, EditPhase::Draft);
    assert_eq!(board.editor.draft.as_ref().map(|draft| draft.notes.as_str()), Some("waiting on CPA"));
    assert_eq!(board.notices[0].message, "Failed to update task: HTTP 502");
}

#[tokio::test]
async fn refresh_picks_up_sheet_changes_and_drops_stale_ids() {
    let (center, sheets, _stub) = harness().await;
    let session = center.open_session().await;
    center.approvals(&session, SourceKind::Leads).await.expect("render");
    center.select_all(&session, SourceKind::Leads, true).await.expect("select");

    set_sheet(
        &sheets,
        SourceKind::Leads,
        rows(&[&["Lead ID", "Name", "Status"], &["L1", "Ann Ortiz", "approved"], &["L2", "Bo Li", "Pending Review"]]),
    );
    let cached = center.approvals(&session, SourceKind::Leads).await.expect("render");
    assert_eq!(cached.rows.len(), 2);

    center.refresh(&session).await.expect("refresh");
    let view = center.approvals(&session, SourceKind::Leads).await.expect("render");
    assert_eq!(view.rows.len(), 1);
    assert_eq!(view.rows[0].id, "L2");
    assert_eq!(view.selected_count, 0);
}

#[tokio::test]
async fn export_matches_the_filtered_table() {
    let (center, _sheets, _stub) = harness().await;
    let session = center.open_session().await;
    center.set_search(&session, SourceKind::Leads, "akron").await.expect("search");
    let export = center.export(&session, SourceKind::Leads).await.expect("export");
    assert!(export.filename.starts_with("cora_leads_"));
    assert_eq!(
        export.content,
        "Lead ID,Name,Organization,Email,Status\nL2,Bo Li,City of Akron,bo@akron.gov,pending review\n"
    );
}

#[tokio::test]
async fn sessions_do_not_share_selection() {
    let (center, _sheets, _stub) = harness().await;
    let first = center.open_session().await;
    let second = center.open_session().await;
    center.approvals(&first, SourceKind::Leads).await.expect("render");
    center.approvals(&second, SourceKind::Leads).await.expect("render");
    center.select_all(&first, SourceKind::Leads, true).await.expect("select");

    let view = center.approvals(&second, SourceKind::Leads).await.expect("render");
    assert_eq!(view.selected_count, 0);

    center.close_session(&first).await;
    let error = center.approvals(&first, SourceKind::Leads).await.expect_err("closed");
    assert!(matches!(error, AppError::NotFound(_)));
}
