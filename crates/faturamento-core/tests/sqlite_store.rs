use faturamento_core::model::{Principal, ProcessRecord, Status};
use faturamento_core::query::{ListFilter, ListQueryEngine};
use faturamento_core::registry::AssignmentRegistry;
use faturamento_core::store::RecordStore;
use faturamento_core::store::sqlite::SqliteStore;
use faturamento_core::sync::{Operation, OptimisticSyncClient};
use faturamento_core::workflow::StatusWorkflow;
use std::sync::Arc;

#[test]
fn mutations_survive_reopen() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("records.db");

    {
        let store = SqliteStore::open(&path).expect("open");
        let records: Vec<_> = (0..3)
            .map(|i| {
                let mut r = ProcessRecord::new(format!("N{i}"));
                r.numero_processo = format!("PROC-{i}");
                r
            })
            .collect();
        assert_eq!(store.import(&records).expect("import"), 3);

        let client = OptimisticSyncClient::new(
            store,
            StatusWorkflow::default(),
            Arc::new(AssignmentRegistry::default()),
        );
        let actor = Principal::new("rossy@maida.health", "Rossy");
        let mut held = client.store().get("N1").expect("get").expect("present");
        client
            .mutate(&mut held, Operation::ChangeStatus(Status::EmAnalise), &actor)
            .expect("status");
        client
            .mutate(&mut held, Operation::Assign("Deise".into()), &actor)
            .expect("assign");
    }

    let store = SqliteStore::open(&path).expect("reopen");
    let record = store.get("N1").expect("get").expect("present");
    assert_eq!(record.status, Status::EmAnalise);
    assert_eq!(record.responsavel.as_deref(), Some("Deise"));
    assert_eq!(record.historico_status.len(), 1);
    assert_eq!(record.historico_status[0].actor_email, "rossy@maida.health");

    let engine = ListQueryEngine::new(2).expect("engine");
    let filter = ListFilter {
        responsavel: Some("Deise".into()),
        ..ListFilter::default()
    };
    let page = engine.query(&store, &filter, 1).expect("query");
    assert_eq!(page.total_count, 1);
    assert_eq!(page.items[0].nup, "N1");

    let all = engine.query(&store, &ListFilter::default(), 2).expect("query");
    assert_eq!(all.total_pages, 2);
    assert_eq!(all.items.len(), 1);
}

#[test]
fn reimport_replaces_history() {
    let store = SqliteStore::open_in_memory().expect("open");
    let mut record = ProcessRecord::new("X");
    store.upsert(&record).expect("first");

    record.status = Status::Arquivado;
    store.upsert(&record).expect("second");

    let back = store.get("X").expect("get").expect("present");
    assert_eq!(back.status, Status::Arquivado);
    assert!(back.historico_status.is_empty());
}
