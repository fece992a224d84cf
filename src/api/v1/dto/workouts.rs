/*
 * Responsibility
 * - Workouts の request/response DTO
 * - user_id は認証無効時のみ参照される (認証有効時は token から解決)
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::repos::workout_repo::WorkoutRow;

#[derive(Debug, Deserialize)]
pub struct ListWorkoutsQuery {
    pub user_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateWorkoutRequest {
    pub user_id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub duration_minutes: i32,
}

impl CreateWorkoutRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.name.trim().is_empty() {
            return Err("name is required");
        }
        if self.duration_minutes < 0 {
            return Err("duration_minutes must be >= 0");
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateWorkoutRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub duration_minutes: Option<i32>,
}

impl UpdateWorkoutRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if let Some(name) = &self.name
            && name.trim().is_empty()
        {
            return Err("name cannot be empty");
        }
        if let Some(minutes) = self.duration_minutes
            && minutes < 0
        {
            return Err("duration_minutes must be >= 0");
        }

        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct WorkoutResponse {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<WorkoutRow> for WorkoutResponse {
    fn from(row: WorkoutRow) -> Self {
        Self {
            id: row.workout_id,
            user_id: row.user_id,
            name: row.name,
            description: row.description,
            duration_minutes: row.duration_minutes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
