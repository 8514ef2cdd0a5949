//! Index lifecycle scenarios: validation wiring, index regions, the shared
//! id space with tables, and the index read path.

mod common;

use common::{hnsw_index_def, table_def, TestCluster, FIRST_REGION_ID};
use corsac_meta::definition::{
    IndexParameter, ScalarIndexParameter, ScalarIndexType,
};
use corsac_meta::id_epoch::IdEpochKind;
use corsac_meta::types::{reserved, RegionType};
use corsac_meta::{MetaError, MetaIncrement};

#[test]
fn create_index_materializes_index_regions() {
    let cluster = TestCluster::new();
    let schema_id = cluster.create_schema("sales");

    let definition = hnsw_index_def("embeddings", &[("a", "m"), ("m", "z")]);
    let mut increment = MetaIncrement::default();
    let index_id = cluster
        .catalog
        .create_index(schema_id, &definition, None, &mut increment)
        .unwrap();
    assert_eq!(increment.regions.len(), 2);
    assert_eq!(increment.indexes.len(), 1);
    cluster.commit(increment);

    let requests = cluster.regions.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    for (part, request) in requests.iter().enumerate() {
        assert_eq!(request.name, format!("I_1000_embeddings_part_{part}"));
        assert_eq!(request.region_type, RegionType::Index);
        assert_eq!(request.index_id, index_id);
        assert_eq!(request.table_id, 0);
        assert!(matches!(
            request.index_parameter,
            Some(IndexParameter::Vector(_))
        ));
    }
    drop(requests);

    let store = cluster.catalog.store();
    assert_eq!(store.present_id(IdEpochKind::EpochIndex), 1);
    assert_eq!(store.present_id(IdEpochKind::EpochRegion), 1);
    assert_eq!(store.present_id(IdEpochKind::EpochTable), 0);

    let schema = cluster.catalog.get_schema(schema_id).unwrap();
    assert_eq!(schema.index_ids, vec![index_id]);
}

#[test]
fn tables_and_indexes_share_one_id_space() {
    let cluster = TestCluster::new();
    let schema_id = cluster.create_schema("sales");

    let table_id = cluster.create_table(schema_id, &table_def("orders", &[("a", "z")]));
    let index_id = cluster.create_index(schema_id, &hnsw_index_def("embeddings", &[("a", "z")]));
    assert_eq!(index_id, table_id + 1);

    let next_table = cluster.create_table(schema_id, &table_def("shipments", &[("a", "z")]));
    assert_eq!(next_table, index_id + 1);
}

#[test]
fn invalid_index_definitions_never_reach_the_region_service() {
    let cluster = TestCluster::new();
    let schema_id = cluster.create_schema("sales");

    // Unset index kind.
    let mut definition = hnsw_index_def("embeddings", &[("a", "z")]);
    definition.index_parameter = IndexParameter::None;
    let mut increment = MetaIncrement::default();
    assert!(matches!(
        cluster
            .catalog
            .create_index(schema_id, &definition, None, &mut increment),
        Err(MetaError::IllegalParameters(_))
    ));

    // Missing partition declaration.
    let mut definition = hnsw_index_def("embeddings", &[("a", "z")]);
    definition.index_partition = None;
    let mut increment = MetaIncrement::default();
    assert!(matches!(
        cluster
            .catalog
            .create_index(schema_id, &definition, None, &mut increment),
        Err(MetaError::IndexDefIllegal(_))
    ));

    assert_eq!(cluster.regions.create_call_count(), 0);
}

#[test]
fn scalar_index_round_trip() {
    let cluster = TestCluster::new();
    let schema_id = cluster.create_schema("sales");

    let mut definition = hnsw_index_def("by_user", &[("a", "z")]);
    definition.index_parameter = IndexParameter::Scalar(ScalarIndexParameter {
        scalar_index_type: ScalarIndexType::Btree,
    });
    let index_id = cluster.create_index(schema_id, &definition);

    let view = cluster.catalog.get_index(schema_id, index_id).unwrap();
    assert!(matches!(
        view.definition.index_parameter,
        IndexParameter::Scalar(_)
    ));
}

#[test]
fn duplicate_index_name_is_rejected_but_table_names_are_separate() {
    let cluster = TestCluster::new();
    let schema_id = cluster.create_schema("sales");
    cluster.create_index(schema_id, &hnsw_index_def("embeddings", &[("a", "z")]));

    let mut increment = MetaIncrement::default();
    assert!(matches!(
        cluster.catalog.create_index(
            schema_id,
            &hnsw_index_def("embeddings", &[("a", "z")]),
            None,
            &mut increment,
        ),
        Err(MetaError::IndexExists(_))
    ));

    // Tables and indexes are separate name namespaces within a schema.
    cluster.create_table(schema_id, &table_def("embeddings", &[("a", "z")]));
}

#[test]
fn partial_region_failure_compensates_index_create() {
    let cluster = TestCluster::new();
    let schema_id = cluster.create_schema("sales");

    cluster.regions.fail_on_call(2);
    let definition = hnsw_index_def("embeddings", &[("a", "m"), ("m", "z")]);
    let mut increment = MetaIncrement::default();
    let err = cluster
        .catalog
        .create_index(schema_id, &definition, None, &mut increment)
        .unwrap_err();
    assert!(matches!(err, MetaError::IndexRegionCreateFailed(_)));
    assert_eq!(cluster.regions.dropped.lock().unwrap().as_slice(), [FIRST_REGION_ID]);

    cluster.regions.clear_failure();
    cluster.create_index(schema_id, &definition);
}

#[test]
fn index_auto_increment_is_gated_on_the_definition_flag() {
    let cluster = TestCluster::new();
    let schema_id = cluster.create_schema("sales");

    let plain = cluster.create_index(schema_id, &hnsw_index_def("plain", &[("a", "z")]));
    assert!(cluster.auto_increment.created.lock().unwrap().is_empty());

    let definition = hnsw_index_def("counted", &[("a", "z")]).with_auto_increment(500);
    let counted = cluster.create_index(schema_id, &definition);
    assert_eq!(
        cluster.auto_increment.created.lock().unwrap().as_slice(),
        [(counted, 500)]
    );

    let mut increment = MetaIncrement::default();
    cluster
        .catalog
        .drop_index(schema_id, counted, &mut increment)
        .unwrap();
    cluster.commit(increment);
    assert_eq!(
        cluster.auto_increment.deleted.lock().unwrap().as_slice(),
        [counted]
    );

    let mut increment = MetaIncrement::default();
    cluster.catalog.drop_index(schema_id, plain, &mut increment).unwrap();
    cluster.commit(increment);
    assert_eq!(
        cluster.auto_increment.deleted.lock().unwrap().as_slice(),
        [counted]
    );
}

#[test]
fn drop_index_removes_record_regions_and_name() {
    let cluster = TestCluster::new();
    let schema_id = cluster.create_schema("sales");
    let definition = hnsw_index_def("embeddings", &[("a", "m"), ("m", "z")]);
    let index_id = cluster.create_index(schema_id, &definition);

    let mut increment = MetaIncrement::default();
    cluster
        .catalog
        .drop_index(schema_id, index_id, &mut increment)
        .unwrap();
    cluster.commit(increment);

    assert!(matches!(
        cluster.catalog.get_index(schema_id, index_id),
        Err(MetaError::IndexNotFound(_))
    ));
    assert!(cluster.catalog.store().regions().is_empty());
    assert_eq!(cluster.catalog.store().present_id(IdEpochKind::EpochIndex), 2);
    assert!(cluster.catalog.get_schema(schema_id).unwrap().index_ids.is_empty());

    // The name is free again.
    cluster.create_index(schema_id, &definition);
}

#[test]
fn index_reads_resolve_by_id_and_name() {
    let cluster = TestCluster::new();
    let schema_id = cluster.create_schema("sales");
    let index_id = cluster.create_index(schema_id, &hnsw_index_def("embeddings", &[("a", "z")]));

    let by_id = cluster.catalog.get_index(schema_id, index_id).unwrap();
    let by_name = cluster
        .catalog
        .get_index_by_name(schema_id, "embeddings")
        .unwrap();
    assert_eq!(by_id, by_name);

    let listed = cluster.catalog.get_indexes(schema_id).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(cluster.catalog.get_indexes_count(schema_id).unwrap(), 1);

    let distributions = cluster.catalog.get_index_range(schema_id, index_id).unwrap();
    assert_eq!(distributions.len(), 1);
    assert!(distributions[0].leader.is_some());

    assert!(matches!(
        cluster.catalog.get_index_by_name(schema_id, "missing"),
        Err(MetaError::IndexNotFound(_))
    ));
}
