//! Shared fixtures for the catalog integration tests: an in-process region
//! service with programmable failure, an auto-increment recorder, and a log
//! that applies every submitted increment immediately.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use corsac_meta::definition::{
    ColumnDefinition, ColumnType, HnswParameter, IndexDefinition, IndexParameter, MetricType,
    TableDefinition, VectorIndexParameter,
};
use corsac_meta::types::{
    Location, Peer, PeerRole, Range, Region, RegionDefinition, RegionMetrics,
};
use corsac_meta::{
    AutoIncrementService, Change, CreateRegionRequest, MetaCatalog, MetaConfig, MetaError,
    MetaIncrement, RegionService, ReplicatedLog, Result,
};

/// First region id the fake allocator hands out.
pub const FIRST_REGION_ID: u64 = 9000;

/// In-process region allocator. Records every request, keeps the regions it
/// created, and can be told to fail the nth create call.
pub struct FakeRegionService {
    next_region_id: AtomicU64,
    create_calls: AtomicU64,
    fail_on_call: AtomicU64,
    created: Mutex<HashMap<u64, Region>>,
    /// Every create request seen, in order.
    pub requests: Mutex<Vec<CreateRegionRequest>>,
    /// Every region id scheduled for drop, in order.
    pub dropped: Mutex<Vec<u64>>,
}

impl FakeRegionService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_region_id: AtomicU64::new(FIRST_REGION_ID),
            create_calls: AtomicU64::new(0),
            fail_on_call: AtomicU64::new(0),
            created: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            dropped: Mutex::new(Vec::new()),
        })
    }

    /// Fail the `n`th create call from now on, 1-based. Zero clears.
    pub fn fail_on_call(&self, n: u64) {
        self.create_calls.store(0, Ordering::SeqCst);
        self.fail_on_call.store(n, Ordering::SeqCst);
    }

    pub fn clear_failure(&self) {
        self.fail_on_call.store(0, Ordering::SeqCst);
    }

    pub fn create_call_count(&self) -> u64 {
        self.create_calls.load(Ordering::SeqCst)
    }

    fn peers(replica: u32) -> Vec<Peer> {
        let mut peers: Vec<Peer> = (1..=replica as u64)
            .map(|store_id| Peer {
                store_id,
                role: PeerRole::Voter,
                server_location: Location {
                    host: format!("store-{store_id}.corsac.local"),
                    port: 20160 + store_id as u32,
                },
            })
            .collect();
        peers.push(Peer {
            store_id: 999,
            role: PeerRole::Learner,
            server_location: Location {
                host: "store-999.corsac.local".to_string(),
                port: 21159,
            },
        });
        peers
    }
}

impl RegionService for FakeRegionService {
    fn create_region(
        &self,
        request: CreateRegionRequest,
        increment: &mut MetaIncrement,
    ) -> Result<u64> {
        let call = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().unwrap().push(request.clone());
        if self.fail_on_call.load(Ordering::SeqCst) == call {
            return Err(MetaError::Internal("injected region create failure".into()));
        }

        let region_id = self.next_region_id.fetch_add(1, Ordering::SeqCst);
        let region = Region {
            id: region_id,
            definition: RegionDefinition {
                name: request.name,
                region_type: request.region_type,
                range: request.range,
                peers: Self::peers(request.replica),
                schema_id: request.schema_id,
                table_id: request.table_id,
                index_id: request.index_id,
            },
            leader_store_id: 1,
            metrics: None,
        };
        self.created.lock().unwrap().insert(region_id, region.clone());
        increment
            .regions
            .push(Change::create(region_id, Some(request.schema_id), region));
        Ok(region_id)
    }

    fn drop_region(&self, region_id: u64, increment: &mut MetaIncrement) -> Result<()> {
        let region = self
            .created
            .lock()
            .unwrap()
            .get(&region_id)
            .cloned()
            .ok_or_else(|| MetaError::Internal(format!("unknown region {region_id}")))?;
        self.dropped.lock().unwrap().push(region_id);
        increment
            .regions
            .push(Change::delete(region_id, Some(region.definition.schema_id), region));
        Ok(())
    }
}

/// Auto-increment recorder with a programmable create failure.
pub struct FakeAutoIncrement {
    fail_create: AtomicBool,
    /// `(entity_id, start)` of every created series.
    pub created: Mutex<Vec<(u64, u64)>>,
    /// Entity ids whose series deletion was scheduled.
    pub deleted: Mutex<Vec<u64>>,
}

impl FakeAutoIncrement {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            fail_create: AtomicBool::new(false),
            created: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
        })
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }
}

impl AutoIncrementService for FakeAutoIncrement {
    fn sync_create(&self, entity_id: u64, start: u64) -> Result<()> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(MetaError::Internal("injected auto increment failure".into()));
        }
        self.created.lock().unwrap().push((entity_id, start));
        Ok(())
    }

    fn async_delete(&self, entity_id: u64) {
        self.deleted.lock().unwrap().push(entity_id);
    }
}

/// A log that commits instantly: every submitted increment is applied to the
/// wrapped catalog in submission order.
pub struct InstantLog {
    catalog: Arc<MetaCatalog>,
    /// Every committed increment, in order.
    pub committed: Mutex<Vec<MetaIncrement>>,
}

impl InstantLog {
    pub fn new(catalog: Arc<MetaCatalog>) -> Arc<Self> {
        Arc::new(Self {
            catalog,
            committed: Mutex::new(Vec::new()),
        })
    }
}

impl ReplicatedLog for InstantLog {
    fn submit(&self, increment: MetaIncrement) -> Result<()> {
        self.catalog.apply(&increment);
        self.committed.lock().unwrap().push(increment);
        Ok(())
    }
}

/// A catalog wired to fresh fakes.
pub struct TestCluster {
    pub catalog: Arc<MetaCatalog>,
    pub regions: Arc<FakeRegionService>,
    pub auto_increment: Arc<FakeAutoIncrement>,
}

/// Install an env-filtered subscriber so `RUST_LOG` surfaces catalog events
/// during test runs. Safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

impl TestCluster {
    pub fn new() -> Self {
        init_test_tracing();
        let regions = FakeRegionService::new();
        let auto_increment = FakeAutoIncrement::new();
        let catalog = Arc::new(
            MetaCatalog::new(MetaConfig::default(), regions.clone(), auto_increment.clone())
                .unwrap(),
        );
        Self {
            catalog,
            regions,
            auto_increment,
        }
    }

    /// Build-and-commit helper: applies the increment as the log would.
    pub fn commit(&self, increment: MetaIncrement) {
        self.catalog.apply(&increment);
    }

    /// Create a schema under root and commit it. Returns the schema id.
    pub fn create_schema(&self, name: &str) -> u64 {
        let mut increment = MetaIncrement::default();
        let schema_id = self
            .catalog
            .create_schema(corsac_meta::types::reserved::ROOT_SCHEMA, name, &mut increment)
            .unwrap();
        self.commit(increment);
        schema_id
    }

    /// Create a table and commit it. Returns the table id.
    pub fn create_table(&self, schema_id: u64, definition: &TableDefinition) -> u64 {
        let mut increment = MetaIncrement::default();
        let table_id = self
            .catalog
            .create_table(schema_id, definition, None, &mut increment)
            .unwrap();
        self.commit(increment);
        table_id
    }

    /// Create an index and commit it. Returns the index id.
    pub fn create_index(&self, schema_id: u64, definition: &IndexDefinition) -> u64 {
        let mut increment = MetaIncrement::default();
        let index_id = self
            .catalog
            .create_index(schema_id, definition, None, &mut increment)
            .unwrap();
        self.commit(increment);
        index_id
    }

    /// Feed region telemetry through the apply path, as a store heartbeat
    /// would.
    pub fn report_region_metrics(&self, region_id: u64, row_count: u64, min_key: &str, max_key: &str) {
        let mut region = self.catalog.store().regions().get(&region_id).unwrap();
        region.metrics = Some(RegionMetrics {
            row_count,
            min_key: min_key.as_bytes().to_vec(),
            max_key: max_key.as_bytes().to_vec(),
        });
        let mut increment = MetaIncrement::default();
        increment
            .regions
            .push(Change::update(region_id, Some(region.definition.schema_id), region));
        self.commit(increment);
    }
}

/// A two-column table definition partitioned over `ranges`.
pub fn table_def(name: &str, ranges: &[(&str, &str)]) -> TableDefinition {
    TableDefinition::new(name)
        .with_columns(vec![
            ColumnDefinition::new("id", ColumnType::Integer)
                .with_primary_key(true)
                .with_not_null(true),
            ColumnDefinition::new("payload", ColumnType::Text),
        ])
        .with_ranges(
            ranges
                .iter()
                .map(|(start, end)| Range::new(start.as_bytes().to_vec(), end.as_bytes().to_vec()))
                .collect(),
        )
}

/// Like [`table_def`], with an auto-increment primary key.
pub fn auto_increment_table_def(name: &str, ranges: &[(&str, &str)], start: u64) -> TableDefinition {
    let mut definition = table_def(name, ranges);
    definition.columns[0].auto_increment = true;
    definition.auto_increment = start;
    definition
}

/// A valid HNSW index definition partitioned over `ranges`.
pub fn hnsw_index_def(name: &str, ranges: &[(&str, &str)]) -> IndexDefinition {
    IndexDefinition::new(name)
        .with_ranges(
            ranges
                .iter()
                .map(|(start, end)| Range::new(start.as_bytes().to_vec(), end.as_bytes().to_vec()))
                .collect(),
        )
        .with_parameter(IndexParameter::Vector(VectorIndexParameter::Hnsw(
            HnswParameter {
                dimension: 128,
                metric_type: MetricType::L2,
                ef_construction: 200,
                max_elements: 1_000_000,
                nlinks: 16,
            },
        )))
}
