//! Shared test doubles and fixtures for agent integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fieldsync_agent::config::Config;
use fieldsync_agent::db::{self, Database};
use fieldsync_agent::gateway::{
    ConnectivityFlag, GatewayError, SerialDirectory, UploadAck, UploadGateway,
};
use fieldsync_agent::pipeline::{PipelineOptions, UploadPipeline};
use fieldsync_agent::reconciler::SerialReconciler;
use fieldsync_agent::scheduler::{Scheduler, SchedulerConfig};
use fieldsync_agent::AppState;
use fieldsync_engine::{
    MeterCategory, NewMeterDraft, NewMeterRecord, OldMeterDraft, OldMeterRecord, OwnerSerials,
    RecordId,
};
use tokio::sync::Notify;

pub async fn test_db() -> Database {
    Database::open("sqlite::memory:").await.unwrap()
}

pub fn old_draft(account: &str, created_at: &str) -> OldMeterDraft {
    OldMeterDraft {
        serial_no_old: Some(format!("OLD-{account}")),
        category: Some(MeterCategory::Em),
        final_reading: Some("4821".into()),
        created_by: Some("agent-7".into()),
        created_at: created_at.into(),
        ..OldMeterDraft::new(account)
    }
}

pub fn new_draft(account: &str, created_at: &str) -> NewMeterDraft {
    NewMeterDraft {
        serial_no_new: Some(format!("NEW-{account}")),
        initial_reading_kwh: Some("0".into()),
        lat: Some(12.9716),
        lon: Some(77.5946),
        created_by: Some("agent-7".into()),
        created_at: created_at.into(),
        ..NewMeterDraft::new(account)
    }
}

pub async fn add_old(db: &Database, account: &str, created_at: &str) -> RecordId {
    db::enqueue_old_meter(db.pool(), &old_draft(account, created_at))
        .await
        .unwrap()
}

pub async fn add_new(db: &Database, account: &str, created_at: &str) -> RecordId {
    db::enqueue_new_meter(db.pool(), &new_draft(account, created_at))
        .await
        .unwrap()
}

pub fn server_error() -> GatewayError {
    GatewayError::Status {
        status: 500,
        message: "Server Error".into(),
    }
}

pub fn unauthorized() -> GatewayError {
    GatewayError::Status {
        status: 401,
        message: "Unauthenticated.".into(),
    }
}

pub fn duplicate() -> GatewayError {
    GatewayError::Status {
        status: 422,
        message: "The serial no new has already been taken.".into(),
    }
}

pub fn owners(lists: &[&str]) -> Vec<OwnerSerials> {
    lists
        .iter()
        .enumerate()
        .map(|(i, csv)| OwnerSerials {
            id: Some(serde_json::json!(i + 1)),
            box_id: Some(serde_json::json!(format!("BOX-{}", i + 1))),
            unused_meter_serial_no: Some(csv.to_string()),
        })
        .collect()
}

/// Holds a call open until the test releases it.
#[derive(Default)]
pub struct Gate {
    entered: Notify,
    release: Notify,
}

impl Gate {
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }

    async fn pass(&self) {
        self.entered.notify_one();
        self.release.notified().await;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Instance(String),
    Old(RecordId),
    New(RecordId),
}

/// Scripted failures: the error is returned for the next `remaining` calls.
struct Script {
    remaining: usize,
    error: GatewayError,
}

impl Script {
    fn next(&mut self) -> Result<(), GatewayError> {
        if self.remaining == 0 {
            return Ok(());
        }
        self.remaining -= 1;
        Err(self.error.clone())
    }
}

#[derive(Default)]
pub struct MockGateway {
    calls: Mutex<Vec<Call>>,
    instance: Mutex<HashMap<String, Script>>,
    old: Mutex<HashMap<RecordId, Script>>,
    new: Mutex<HashMap<RecordId, Script>>,
    gate: Mutex<Option<Arc<Gate>>>,
}

impl MockGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_instance(&self, account: &str, times: usize, error: GatewayError) {
        self.instance.lock().unwrap().insert(
            account.to_string(),
            Script {
                remaining: times,
                error,
            },
        );
    }

    pub fn fail_old(&self, id: RecordId, times: usize, error: GatewayError) {
        self.old.lock().unwrap().insert(
            id,
            Script {
                remaining: times,
                error,
            },
        );
    }

    pub fn fail_new(&self, id: RecordId, times: usize, error: GatewayError) {
        self.new.lock().unwrap().insert(
            id,
            Script {
                remaining: times,
                error,
            },
        );
    }

    pub fn hold_instance_calls(&self, gate: Arc<Gate>) {
        *self.gate.lock().unwrap() = Some(gate);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl UploadGateway for MockGateway {
    async fn create_account_instance(&self, account_id: &str) -> Result<(), GatewayError> {
        self.record(Call::Instance(account_id.to_string()));
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        match self.instance.lock().unwrap().get_mut(account_id) {
            Some(script) => script.next(),
            None => Ok(()),
        }
    }

    async fn upload_old_meter(&self, record: &OldMeterRecord) -> Result<UploadAck, GatewayError> {
        self.record(Call::Old(record.id));
        if let Some(script) = self.old.lock().unwrap().get_mut(&record.id) {
            script.next()?;
        }
        Ok(UploadAck {
            status: 201,
            data: None,
        })
    }

    async fn upload_new_meter(&self, record: &NewMeterRecord) -> Result<UploadAck, GatewayError> {
        self.record(Call::New(record.id));
        if let Some(script) = self.new.lock().unwrap().get_mut(&record.id) {
            script.next()?;
        }
        Ok(UploadAck {
            status: 201,
            data: None,
        })
    }
}

pub struct MockDirectory {
    response: Mutex<Result<Vec<OwnerSerials>, GatewayError>>,
    calls: AtomicUsize,
    gate: Mutex<Option<Arc<Gate>>>,
}

impl MockDirectory {
    pub fn new(lists: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Ok(owners(lists))),
            calls: AtomicUsize::new(0),
            gate: Mutex::new(None),
        })
    }

    pub fn set_response(&self, response: Result<Vec<OwnerSerials>, GatewayError>) {
        *self.response.lock().unwrap() = response;
    }

    pub fn hold_calls(&self, gate: Arc<Gate>) {
        *self.gate.lock().unwrap() = Some(gate);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SerialDirectory for MockDirectory {
    async fn fetch_serials(&self) -> Result<Vec<OwnerSerials>, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        self.response.lock().unwrap().clone()
    }
}

/// Pipeline options with no retry delay.
pub fn fast_options() -> PipelineOptions {
    PipelineOptions::with_retry_delay(0)
}

pub fn pipeline(
    db: &Database,
    gateway: Arc<MockGateway>,
    link: &ConnectivityFlag,
) -> UploadPipeline {
    UploadPipeline::new(db.clone(), gateway, Arc::new(link.clone()), fast_options())
}

pub fn reconciler(
    db: &Database,
    directory: Arc<MockDirectory>,
    link: &ConnectivityFlag,
) -> SerialReconciler {
    SerialReconciler::new(db.clone(), directory, Arc::new(link.clone()))
}

/// Everything a scheduler or API test needs, wired to mocks.
pub struct Harness {
    pub db: Database,
    pub gateway: Arc<MockGateway>,
    pub directory: Arc<MockDirectory>,
    pub link: ConnectivityFlag,
    pub scheduler: Scheduler,
}

pub fn scheduler_config() -> SchedulerConfig {
    SchedulerConfig {
        serial_interval: Duration::from_secs(3600),
        upload_interval: Duration::from_secs(3600),
        serial_cooldown_ms: 60_000,
        upload_cooldown_ms: 60_000,
        event_stagger: Duration::from_millis(0),
    }
}

pub async fn harness(config: SchedulerConfig) -> Harness {
    let db = test_db().await;
    let gateway = MockGateway::new();
    let directory = MockDirectory::new(&["S1, S2"]);
    let link = ConnectivityFlag::default();

    let reconciler = Arc::new(reconciler(&db, directory.clone(), &link));
    let pipeline = Arc::new(pipeline(&db, gateway.clone(), &link));
    let scheduler = Scheduler::new(reconciler, pipeline, config);

    Harness {
        db,
        gateway,
        directory,
        link,
        scheduler,
    }
}

pub fn test_config(control_api_token: Option<&str>) -> Config {
    Config {
        host: "127.0.0.1".into(),
        port: 0,
        database_url: "sqlite::memory:".into(),
        api_base_url: "http://127.0.0.1:9".into(),
        serial_directory_url: "http://127.0.0.1:9/api/unused-meter-serials".into(),
        auth_token: None,
        control_api_token: control_api_token.map(str::to_string),
        serial_sync_interval: Duration::from_secs(3600),
        upload_interval: Duration::from_secs(3600),
        serial_stream_cooldown: Duration::from_secs(60),
        upload_stream_cooldown: Duration::from_secs(60),
        event_stagger: Duration::from_millis(0),
        max_accounts_per_pass: 25,
        account_concurrency: 2,
        request_timeout: Duration::from_secs(5),
        upload_timeout: Duration::from_secs(5),
        retry_delay: Duration::from_millis(0),
    }
}

impl Harness {
    pub fn app_state(&self, control_api_token: Option<&str>) -> AppState {
        AppState {
            db: self.db.clone(),
            scheduler: self.scheduler.clone(),
            link: self.link.clone(),
            config: Arc::new(test_config(control_api_token)),
        }
    }
}
