/*
 * Responsibility
 * - v1 の URL 構造を定義 (/users, /workouts)
 * - 認証 gate は app 側で最上位 Router に掛ける (path prefix で判定するため)
 * - /health は v1 の外 (root) に置く
 */
use axum::{Router, routing::get};

use crate::state::AppState;

use crate::api::v1::handlers::{
    users::{create_user, get_user, list_users},
    workouts::{create_workout, delete_workout, get_workout, list_workouts, update_workout},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/{user_id}", get(get_user))
        .route("/workouts", get(list_workouts).post(create_workout))
        .route(
            "/workouts/{workout_id}",
            get(get_workout).patch(update_workout).delete(delete_workout),
        )
}
