//! UI preferences shared across the whole dashboard

use serde::{Deserialize, Serialize};

/// Region name of this slice in the root state
pub const SLICE_NAME: &str = "global";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalState {
    pub is_sidebar_collapsed: bool,
    pub is_dark_mode: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GlobalAction {
    SetIsSidebarCollapsed(bool),
    SetIsDarkMode(bool),
}

impl GlobalAction {
    pub fn action_type(&self) -> &'static str {
        match self {
            GlobalAction::SetIsSidebarCollapsed(_) => "global/setIsSidebarCollapsed",
            GlobalAction::SetIsDarkMode(_) => "global/setIsDarkMode",
        }
    }
}

/// Each action overwrites its flag; nothing else touches the slice.
pub fn reduce(state: &GlobalState, action: &GlobalAction) -> GlobalState {
    match *action {
        GlobalAction::SetIsSidebarCollapsed(value) => GlobalState {
            is_sidebar_collapsed: value,
            ..*state
        },
        GlobalAction::SetIsDarkMode(value) => GlobalState {
            is_dark_mode: value,
            ..*state
        },
    }
}
