use faturamento_core::aggregate::{AggregationEngine, AggregationWindow};
use faturamento_core::model::{DateBasis, Principal, ProcessRecord, Status};
use faturamento_core::query::{ListFilter, ListQueryEngine};
use faturamento_core::registry::AssignmentRegistry;
use faturamento_core::store::memory::MemoryStore;
use faturamento_core::workflow::StatusWorkflow;
use proptest::prelude::*;
use std::collections::HashSet;

#[path = "generators.rs"]
mod generators;
use generators::*;

fn actor() -> Principal {
    Principal::new("prop@maida.health", "Prop")
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(256))]

    #[test]
    fn terminal_absorbs_every_other_target(target in arb_status()) {
        let workflow = StatusWorkflow::default();
        let mut record = ProcessRecord::new("t");
        record.status = Status::AssinadoETramitado;

        let result = workflow.change_status(&record, target, &actor());
        prop_assert_eq!(result.is_ok(), target == Status::AssinadoETramitado);
    }

    #[test]
    fn accepted_transitions_chain_in_history(targets in prop::collection::vec(arb_status(), 0..20)) {
        let workflow = StatusWorkflow::default();
        let mut record = ProcessRecord::new("h");
        let mut accepted = 0_usize;

        for target in targets {
            if let Ok((next, _)) = workflow.change_status(&record, target, &actor()) {
                record = next;
                accepted += 1;
            }
        }

        prop_assert_eq!(record.historico_status.len(), accepted);
        for pair in record.historico_status.windows(2) {
            prop_assert_eq!(pair[0].to, pair[1].from);
        }
        if let Some(last) = record.historico_status.last() {
            prop_assert_eq!(last.to, record.status);
        }
    }

    #[test]
    fn pages_cover_every_match_once(records in arb_records(60), size in 1_u32..8, status in prop::option::of(arb_status())) {
        let store = MemoryStore::default().with_records(records);
        let engine = ListQueryEngine::new(size).unwrap();
        let filter = ListFilter { status, ..ListFilter::default() };

        let first = engine.query(&store, &filter, 1).unwrap();
        let mut seen = HashSet::new();
        for page in 1..=first.total_pages {
            let result = engine.query(&store, &filter, page).unwrap();
            prop_assert_eq!(result.total_count, first.total_count);
            for record in result.items {
                prop_assert!(seen.insert(record.nup));
            }
        }
        prop_assert_eq!(seen.len() as u64, first.total_count);
    }

    #[test]
    fn aggregate_counts_match_window(records in arb_records(60), finalized in any::<bool>()) {
        let store = MemoryStore::default()
            .with_date_basis(DateBasis::Received)
            .with_records(records.clone());
        let window = AggregationWindow::new(
            chrono::NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            chrono::NaiveDate::from_ymd_opt(2024, 1, 20).unwrap(),
            finalized,
        )
        .unwrap();

        let groups = AggregationEngine.aggregate(&store, &window).unwrap();
        let direct = records
            .iter()
            .filter(|r| window.selects(r, DateBasis::Received))
            .count();
        let counted: usize = groups.iter().map(|g| g.count).sum();
        prop_assert_eq!(counted, direct);
        for group in &groups {
            prop_assert_eq!(group.count, group.matching_records.len());
        }
    }

    #[test]
    fn repeated_assignment_registers_once(name in "[A-Z][a-z]{3,8}") {
        let registry = AssignmentRegistry::new(Vec::<String>::new());
        let record = ProcessRecord::new("r");
        let first = registry.assign(&record, &name, &actor());
        let _ = registry.assign(&first, &name, &actor());
        prop_assert_eq!(registry.known_names(), vec![name]);
    }
}

