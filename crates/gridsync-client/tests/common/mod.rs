#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use gridsync_client::{
    ApiError, ApiResult, Clock, ConnectivityOracle, DrainScheduler, RemoteSpreadsheet,
    SheetClient, SheetMetadata, SheetRef, SheetTransport, ValueRender,
};
use gridsync_model::CellValue;
use gridsync_storage::Storage;

/// Scriptable in-memory transport. Failures are queued per operation and
/// consumed one call at a time, so a test can make exactly the Nth call fail.
#[derive(Default)]
pub struct MockTransport {
    pub values: Mutex<Vec<Vec<CellValue>>>,
    pub formulas: Mutex<Vec<Vec<CellValue>>>,
    pub metadata: Mutex<SheetMetadata>,
    pub change_token: Mutex<Option<String>>,
    pub token_fails: AtomicBool,
    pub listing: Mutex<Vec<RemoteSpreadsheet>>,
    pub value_failures: Mutex<VecDeque<ApiError>>,
    pub append_failures: Mutex<VecDeque<ApiError>>,
    pub update_failures: Mutex<VecDeque<ApiError>>,
    pub listing_failures: Mutex<VecDeque<ApiError>>,
    pub value_fetches: AtomicUsize,
    pub appends: Mutex<Vec<(SheetRef, Vec<Option<String>>)>>,
    pub updates: Mutex<Vec<(SheetRef, usize, Vec<Option<String>>)>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_grid(&self, values: Vec<Vec<CellValue>>) {
        *self.values.lock().expect("mock mutex") = values;
    }

    pub fn set_token(&self, token: Option<&str>) {
        *self.change_token.lock().expect("mock mutex") = token.map(str::to_string);
    }

    pub fn fail_next_value_fetch(&self, err: ApiError) {
        self.value_failures.lock().expect("mock mutex").push_back(err);
    }

    pub fn fail_next_append(&self, err: ApiError) {
        self.append_failures.lock().expect("mock mutex").push_back(err);
    }

    pub fn fail_next_update(&self, err: ApiError) {
        self.update_failures.lock().expect("mock mutex").push_back(err);
    }

    pub fn fail_next_listing(&self, err: ApiError) {
        self.listing_failures.lock().expect("mock mutex").push_back(err);
    }

    fn take(queue: &Mutex<VecDeque<ApiError>>) -> Option<ApiError> {
        queue.lock().expect("mock mutex").pop_front()
    }
}

#[async_trait]
impl SheetTransport for MockTransport {
    async fn list_spreadsheets(&self) -> ApiResult<Vec<RemoteSpreadsheet>> {
        if let Some(err) = Self::take(&self.listing_failures) {
            return Err(err);
        }
        Ok(self.listing.lock().expect("mock mutex").clone())
    }

    async fn fetch_values(
        &self,
        _sheet: &SheetRef,
        render: ValueRender,
    ) -> ApiResult<Vec<Vec<CellValue>>> {
        self.value_fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = Self::take(&self.value_failures) {
            return Err(err);
        }
        let grid = match render {
            ValueRender::Formatted => &self.values,
            ValueRender::Formula => &self.formulas,
        };
        Ok(grid.lock().expect("mock mutex").clone())
    }

    async fn fetch_metadata(&self, _sheet: &SheetRef) -> ApiResult<SheetMetadata> {
        Ok(self.metadata.lock().expect("mock mutex").clone())
    }

    async fn fetch_change_token(&self, _spreadsheet_id: &str) -> ApiResult<Option<String>> {
        if self.token_fails.load(Ordering::SeqCst) {
            return Err(ApiError::io("token endpoint unreachable"));
        }
        Ok(self.change_token.lock().expect("mock mutex").clone())
    }

    async fn append_row(&self, sheet: &SheetRef, row: &[Option<String>]) -> ApiResult<()> {
        if let Some(err) = Self::take(&self.append_failures) {
            return Err(err);
        }
        self.appends
            .lock()
            .expect("mock mutex")
            .push((sheet.clone(), row.to_vec()));
        Ok(())
    }

    async fn update_row(
        &self,
        sheet: &SheetRef,
        row_index: usize,
        row: &[Option<String>],
    ) -> ApiResult<()> {
        if let Some(err) = Self::take(&self.update_failures) {
            return Err(err);
        }
        self.updates
            .lock()
            .expect("mock mutex")
            .push((sheet.clone(), row_index, row.to_vec()));
        Ok(())
    }
}

pub struct Network(pub AtomicBool);

impl Network {
    pub fn online() -> Arc<Self> {
        Arc::new(Network(AtomicBool::new(true)))
    }

    pub fn offline() -> Arc<Self> {
        Arc::new(Network(AtomicBool::new(false)))
    }

    pub fn set_online(&self, online: bool) {
        self.0.store(online, Ordering::SeqCst);
    }
}

impl ConnectivityOracle for Network {
    fn is_online(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Records drain requests instead of running them.
#[derive(Default)]
pub struct RecordingScheduler {
    pub requests: AtomicUsize,
}

impl RecordingScheduler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl DrainScheduler for RecordingScheduler {
    fn request_drain(&self) -> bool {
        self.requests.fetch_add(1, Ordering::SeqCst);
        true
    }
}

pub struct FixedClock(pub AtomicI64);

impl FixedClock {
    pub fn at(now_ms: i64) -> Arc<Self> {
        Arc::new(FixedClock(AtomicI64::new(now_ms)))
    }

    pub fn advance(&self, delta_ms: i64) {
        self.0.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_ms(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

pub fn grid(rows: &[&[&str]]) -> Vec<Vec<CellValue>> {
    rows.iter()
        .map(|row| row.iter().map(|cell| CellValue::from(*cell)).collect())
        .collect()
}

pub struct Harness {
    pub transport: Arc<MockTransport>,
    pub network: Arc<Network>,
    pub storage: Storage,
    pub scheduler: Arc<RecordingScheduler>,
    pub clock: Arc<FixedClock>,
    pub client: SheetClient,
}

impl Harness {
    pub fn online() -> Self {
        Self::build(Network::online())
    }

    pub fn offline() -> Self {
        Self::build(Network::offline())
    }

    fn build(network: Arc<Network>) -> Self {
        let transport = MockTransport::new();
        let storage = Storage::open_in_memory().expect("open storage");
        let scheduler = RecordingScheduler::new();
        let clock = FixedClock::at(1_000_000);
        let client = SheetClient::with_clock(
            Arc::clone(&transport) as Arc<dyn SheetTransport>,
            Arc::clone(&network) as Arc<dyn ConnectivityOracle>,
            storage.clone(),
            Arc::clone(&scheduler) as Arc<dyn DrainScheduler>,
            Arc::clone(&clock) as Arc<dyn Clock>,
        );
        Harness {
            transport,
            network,
            storage,
            scheduler,
            clock,
            client,
        }
    }
}
