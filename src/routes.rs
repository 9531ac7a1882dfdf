//! Routes and endpoints

use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, Redirect},
    routing::get,
};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::{legend::SeriesId, viewer::Viewer};

/// Creates a [`Router`] serving the chart and its legend clicks.
pub fn create_router(viewer: Arc<Viewer>) -> Router {
    Router::new()
        .route("/", get(show_chart))
        .route("/legend/{series}", get(toggle_series))
        .layer(TraceLayer::new_for_http())
        .with_state(viewer)
}

/// The chart page, drawn with the current legend state
async fn show_chart(State(viewer): State<Arc<Viewer>>) -> Result<Html<String>, StatusCode> {
    viewer.to_html().map(Html).map_err(|err| {
        error!("Failed to render chart: {err:#}");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/// A click on a legend entry. Goes back to the chart afterwards.
async fn toggle_series(
    State(viewer): State<Arc<Viewer>>,
    Path(series): Path<SeriesId>,
) -> Result<Redirect, StatusCode> {
    match viewer.toggle(series) {
        Some(visible) => {
            info!(%series, visible, "Legend entry clicked");
            Ok(Redirect::to("/"))
        }
        None => Err(StatusCode::NOT_FOUND),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use chrono::{TimeZone, Utc};
    use http_body_util::BodyExt;
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    use super::create_router;
    use crate::{
        chart::{Chart, UserHistory},
        sessions::AtcSession,
        viewer::Viewer,
    };

    fn viewer() -> Arc<Viewer> {
        let erik = UserHistory {
            name: "Erik".to_owned(),
            color: "green".to_owned(),
            totals: [
                AtcSession {
                    start: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
                    duration_hours: 2.5,
                },
                AtcSession {
                    start: Utc.with_ymd_and_hms(2024, 3, 15, 8, 0, 0).unwrap(),
                    duration_hours: 0.75,
                },
            ]
            .into_iter()
            .collect(),
        };
        Arc::new(Viewer::new(Chart::plot(&[erik]).unwrap()).unwrap())
    }

    async fn get(viewer: &Arc<Viewer>, uri: &str) -> (StatusCode, Option<String>, String) {
        let response = create_router(Arc::clone(viewer))
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .map(|value| value.to_str().unwrap().to_owned());
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, location, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn index() {
        let viewer = viewer();
        let (status, _, body) = get(&viewer, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#"<g id="line-0" stroke="green" fill="green">"#));
    }

    #[tokio::test]
    async fn legend_click() {
        let viewer = viewer();

        let (status, location, _) = get(&viewer, "/legend/0").await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(location.as_deref(), Some("/"));

        let (_, _, body) = get(&viewer, "/").await;
        assert!(body.contains(r#"<g id="line-0" stroke="green" fill="green" visibility="hidden">"#));

        get(&viewer, "/legend/0").await;
        let (_, _, body) = get(&viewer, "/").await;
        assert!(!body.contains("visibility=\"hidden\""));
    }

    #[tokio::test]
    async fn unknown_legend_entry() {
        let viewer = viewer();
        assert_eq!(get(&viewer, "/legend/7").await.0, StatusCode::NOT_FOUND);
        assert_eq!(get(&viewer, "/legend/erik").await.0, StatusCode::BAD_REQUEST);
    }
}
