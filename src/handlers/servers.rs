use axum::extract::State;

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path};
use crate::models::{CreateServer, Server, UpdateServer};

pub async fn list_servers(State(state): State<AppState>) -> Result<Json<Vec<Server>>> {
    let conn = state.db.get()?;
    let servers = queries::list_servers(&conn)?;
    Ok(Json(servers))
}

pub async fn create_server(
    State(state): State<AppState>,
    Json(input): Json<CreateServer>,
) -> Result<Json<Server>> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Server name is required".into()));
    }

    let conn = state.db.get()?;
    let server = queries::create_server(
        &conn,
        &CreateServer {
            name: name.to_string(),
            description: input.description.trim().to_string(),
        },
    )?;

    tracing::info!(server_id = %server.id, name = %server.name, "Server created");
    Ok(Json(server))
}

pub async fn update_server(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateServer>,
) -> Result<Json<Server>> {
    let name = input.name.as_deref().map(str::trim);
    if name == Some("") {
        return Err(AppError::BadRequest("Server name cannot be empty".into()));
    }

    let conn = state.db.get()?;
    let update = UpdateServer {
        name: name.map(String::from),
        description: input.description.as_deref().map(|d| d.trim().to_string()),
    };
    if !queries::update_server(&conn, &id, &update)? {
        return Err(AppError::ServerNotFound);
    }

    let server = queries::get_server_by_id(&conn, &id)?.ok_or(AppError::ServerNotFound)?;
    tracing::info!(server_id = %server.id, "Server updated");
    Ok(Json(server))
}
