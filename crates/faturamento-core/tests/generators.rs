#![allow(dead_code)]

use faturamento_core::model::{Money, ProcessRecord, Status, Treatment};
use proptest::prelude::*;

pub const NAMES: [&str; 4] = ["ANA", "Deise", "Paulo", "Karen"];

pub fn arb_status() -> impl Strategy<Value = Status> {
    prop::sample::select(Status::ALL.to_vec())
}

pub fn arb_treatment() -> impl Strategy<Value = Option<Treatment>> {
    prop::option::of(prop::sample::select(Treatment::ALL.to_vec()))
}

pub fn arb_assignee() -> impl Strategy<Value = Option<String>> {
    prop::option::of(prop::sample::select(NAMES.to_vec()).prop_map(str::to_string))
}

/// Records with distinct NUPs `0000..n`.
pub fn arb_records(max: usize) -> impl Strategy<Value = Vec<ProcessRecord>> {
    prop::collection::vec(
        (arb_status(), arb_treatment(), arb_assignee(), 0_i64..1_000_000, 1_u32..=28),
        0..max,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (status, tratamento, responsavel, cents, day))| {
                let mut record = ProcessRecord::new(format!("{i:04}"));
                record.numero_processo = format!("PROC-{i}");
                record.status = status;
                record.tratamento = tratamento;
                record.responsavel = responsavel;
                record.valor_capa = Money::from_cents(cents);
                record.data_recebimento = chrono::NaiveDate::from_ymd_opt(2024, 1, day);
                record
            })
            .collect()
    })
}
