//! JSON bodies exchanged with the record service.

use crate::aggregate::CollaboratorAggregate;
use crate::model::{Principal, ProcessRecord, Status};
use serde::{Deserialize, Serialize};

/// `PUT /processos/{nup}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    pub novo_status: Status,
    pub status_anterior: Status,
    pub usuario_email: String,
    pub usuario_nome: String,
}

impl StatusUpdateRequest {
    #[must_use]
    pub fn new(previous: Status, next: Status, actor: &Principal) -> Self {
        Self {
            novo_status: next,
            status_anterior: previous,
            usuario_email: actor.email.clone(),
            usuario_nome: actor.display_name.clone(),
        }
    }
}

/// `PUT /processos/{nup}/colaborador`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollaboratorUpdateRequest {
    pub novo_colaborador: String,
    pub usuario_email: String,
}

/// `GET /processos` response body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListResponse {
    #[serde(default)]
    pub data: Vec<ProcessRecord>,
    #[serde(default)]
    pub meta: ListMeta,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMeta {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub total: Option<u64>,
}

/// `GET /dashboard/resumo` response body.
pub type SummaryResponse = Vec<CollaboratorAggregate>;
