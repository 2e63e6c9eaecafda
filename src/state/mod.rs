//! Application state: the root container, its actions and the root reducer

pub mod api;
pub mod global;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::persist::{self, PersistAction, PersistMeta};
use api::{ApiAction, ApiState};
use global::{GlobalAction, GlobalState};

/// Everything a store holds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RootState {
    /// UI preferences; persisted
    pub global: GlobalState,
    /// Remote-data cache; rebuilt on every start
    pub api: ApiState,
    #[serde(rename = "_persist")]
    pub persist: PersistMeta,
}

#[derive(Debug, Clone)]
pub enum Action {
    Global(GlobalAction),
    Api(ApiAction),
    Persist(PersistAction),
}

impl Action {
    pub fn action_type(&self) -> &'static str {
        match self {
            Action::Global(action) => action.action_type(),
            Action::Api(action) => action.action_type(),
            Action::Persist(action) => action.action_type(),
        }
    }

    /// JSON form of the action, `None` when its payload cannot be serialized
    pub fn to_json(&self) -> Option<Value> {
        let payload = match self {
            Action::Global(action) => serde_json::to_value(action).ok()?,
            Action::Api(action) => serde_json::to_value(action).ok()?,
            Action::Persist(_) => return None,
        };
        Some(json!({ "type": self.action_type(), "payload": payload }))
    }
}

impl From<GlobalAction> for Action {
    fn from(action: GlobalAction) -> Self {
        Action::Global(action)
    }
}

impl From<ApiAction> for Action {
    fn from(action: ApiAction) -> Self {
        Action::Api(action)
    }
}

pub fn set_is_sidebar_collapsed(value: bool) -> Action {
    GlobalAction::SetIsSidebarCollapsed(value).into()
}

pub fn set_is_dark_mode(value: bool) -> Action {
    GlobalAction::SetIsDarkMode(value).into()
}

/// Route an action to the region that owns it
pub fn reduce(state: &RootState, action: &Action) -> RootState {
    match action {
        Action::Global(action) => RootState {
            global: global::reduce(&state.global, action),
            ..state.clone()
        },
        Action::Api(action) => RootState {
            api: api::reduce(&state.api, action),
            ..state.clone()
        },
        Action::Persist(action) => persist::reduce(state, action),
    }
}
