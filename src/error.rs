use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;
use thiserror::Error;

use crate::game::{GameError, GameId};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Game with ID {0} not found")]
    GameNotFound(GameId),

    #[error("Game logic violation: {0}")]
    Game(#[from] GameError),

    #[error("Invalid request: {0}")]
    Validation(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::GameNotFound(id) => {
                (StatusCode::NOT_FOUND, format!("Game with id {} not found", id))
            }
            AppError::Game(GameError::PlayerNotFound(id)) => {
                (StatusCode::NOT_FOUND, format!("Player {} not found", id))
            }
            AppError::Game(e) => {
                // Use the Display implementation of GameError for the message
                tracing::warn!("Game logic violation: {}", e);
                (StatusCode::CONFLICT, format!("Game rule violation: {}", e))
            }
            AppError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
