use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Route {
    Leads,
    Opportunities,
}

impl Route {
    pub const ALL: [Route; 2] = [Self::Leads, Self::Opportunities];

    pub fn path(self) -> &'static str {
        match self {
            Self::Leads => "/leads",
            Self::Opportunities => "/opportunities",
        }
    }
}

/// The root redirects to the lead list. Trailing slashes are ignored.
pub fn resolve(path: &str) -> AppResult<Route> {
    let trimmed = path.trim_end_matches('/');
    match trimmed {
        "" | "/leads" => Ok(Route::Leads),
        "/opportunities" => Ok(Route::Opportunities),
        _ => Err(AppError::NotFound(format!("no view is mounted at `{}`", path))),
    }
}
