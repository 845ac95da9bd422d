//! XYZ tile endpoint.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Extension, Path, Query},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use tile_common::{TileCoord, TileError};
use tracing::{error, instrument, warn};

use crate::metrics::{record_resolve_duration, record_tile_outcome};
use crate::orchestrator::TileOutcome;
use crate::request::TileRequest;
use crate::state::AppState;

/// GET /tiles/:z/:x/:y[.ext]
#[instrument(skip(state, params))]
pub async fn xyz_tile_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((z, x, y)): Path<(String, String, String)>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let Some((coord, ext)) = parse_tile_path(&z, &x, &y) else {
        record_tile_outcome("error");
        return not_found();
    };

    let start = Instant::now();
    let result = match TileRequest::resolve(&state, coord, ext, params) {
        Ok(request) => state.orchestrator.resolve(&request).await,
        Err(e) => Err(e),
    };
    record_resolve_duration(start.elapsed());

    match result {
        Ok(TileOutcome::Png { bytes, source }) => {
            record_tile_outcome(source.as_str());
            (StatusCode::OK, [(header::CONTENT_TYPE, "image/png")], bytes).into_response()
        }
        Ok(TileOutcome::Redirect(url)) => {
            record_tile_outcome("redirect");
            Redirect::temporary(url.as_str()).into_response()
        }
        Err(e) => {
            record_tile_outcome("error");
            error_response(&coord, e)
        }
    }
}

/// Parse `z`, `x` and `y[.ext]` path segments into a coordinate inside the
/// zoom level's grid.
fn parse_tile_path<'a>(z: &str, x: &str, y: &'a str) -> Option<(TileCoord, Option<&'a str>)> {
    let (y, ext) = match y.rsplit_once('.') {
        Some((y, ext)) => (y, Some(ext)),
        None => (y, None),
    };
    let coord = TileCoord::new(z.parse().ok()?, x.parse().ok()?, y.parse().ok()?);
    coord.is_valid().then_some((coord, ext))
}

fn error_response(coord: &TileCoord, err: TileError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if status.is_server_error() {
        error!(tile = %coord, error = %err, "Tile resolution failed");
        (status, "Tile unavailable").into_response()
    } else {
        warn!(tile = %coord, error = %err, "Tile not found");
        not_found()
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Tile not found").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tile_path() {
        assert_eq!(
            parse_tile_path("14", "8924", "9338.png"),
            Some((TileCoord::new(14, 8924, 9338), Some("png")))
        );
        assert_eq!(
            parse_tile_path("3", "1", "2"),
            Some((TileCoord::new(3, 1, 2), None))
        );
        assert_eq!(parse_tile_path("abc", "1", "2.png"), None);
        assert_eq!(parse_tile_path("3", "-1", "2.png"), None);
        assert_eq!(parse_tile_path("3", "1", ".png"), None);
        assert_eq!(parse_tile_path("2", "4", "0.png"), None);
    }
}
