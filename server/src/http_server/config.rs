use axum::extract::FromRef;
use db::PgPool;

use crate::AppState;

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}
