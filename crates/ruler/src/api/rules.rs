use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::state::AppState;
use crate::scheduler::{ActiveAlert, GroupStatus};

#[derive(Serialize)]
pub struct Envelope<T> {
    pub status: &'static str,
    pub data: T,
}

#[derive(Serialize)]
pub struct RulesData {
    pub groups: Vec<GroupStatus>,
}

#[derive(Serialize)]
pub struct AlertsData {
    pub alerts: Vec<ActiveAlert>,
}

pub async fn rules(State(state): State<AppState>) -> Json<Envelope<RulesData>> {
    Json(Envelope {
        status: "success",
        data: RulesData {
            groups: state.scheduler.groups(),
        },
    })
}

pub async fn alerts(State(state): State<AppState>) -> Json<Envelope<AlertsData>> {
    Json(Envelope {
        status: "success",
        data: AlertsData {
            alerts: state.scheduler.active_alerts(),
        },
    })
}
