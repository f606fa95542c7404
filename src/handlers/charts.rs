//! 图表接口：返回 SVG

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
};
use std::sync::Arc;
use uuid::Uuid;

use super::analytics::{build_pairplot, build_scatter, load_view, PairplotQuery, ScatterQuery, ViewQuery};
use super::run_blocking;
use crate::{
    analytics::{self, ContentFilter, RELEASE_YEAR_NUM},
    error::AppError,
    middleware::AppState,
    render::{self, ChartLabels},
};

const CHART_KINDS: &[&str] = &["trends", "pairplot", "correlations", "scatter"];

fn trends_title(filter: ContentFilter) -> String {
    match filter.label() {
        Some(label) => format!("Titles per release year ({})", label),
        None => "Titles per release year".to_string(),
    }
}

/// 渲染指定类型的图表
pub async fn render_chart(
    State(state): State<Arc<AppState>>,
    Path((id, kind)): Path<(Uuid, String)>,
    Query(view_query): Query<ViewQuery>,
    Query(pairplot_query): Query<PairplotQuery>,
    Query(scatter_query): Query<ScatterQuery>,
) -> Result<impl IntoResponse, AppError> {
    if !CHART_KINDS.contains(&kind.as_str()) {
        return Err(AppError::not_found(format!("Chart '{}'", kind)));
    }

    let (_, view) = load_view(&state, id, &view_query).await?;
    let filter = view_query.filter()?;

    let svg = {
        let kind = kind.clone();
        run_blocking(move || match kind.as_str() {
            "trends" => {
                let counts = analytics::count_by_year(&view, filter);
                if counts.is_empty() {
                    return Err(AppError::InsufficientData(
                        "Not enough data for this view.".to_string(),
                    ));
                }
                let points: Vec<(f64, f64)> = counts
                    .iter()
                    .map(|c| (c.year as f64, c.count as f64))
                    .collect();
                Ok(render::line_chart(
                    &points,
                    &ChartLabels {
                        title: Some(trends_title(filter)),
                        x: "Year".to_string(),
                        y: "Count".to_string(),
                    },
                ))
            }
            "pairplot" => {
                let data = build_pairplot(&state, &view, &pairplot_query)?;
                Ok(render::pairplot_grid(&data.columns, &data.values, &data.histograms))
            }
            "correlations" => {
                let matrix = analytics::correlation_matrix(&view)?;
                Ok(render::heatmap(&matrix.columns, &matrix.values, Some("Correlation matrix")))
            }
            _ => {
                let data = build_scatter(&view, &scatter_query)?;
                Ok(render::scatter_chart(
                    &data.points,
                    data.regression.as_ref(),
                    &ChartLabels {
                        title: Some("Relationship with release year".to_string()),
                        x: RELEASE_YEAR_NUM.to_string(),
                        y: data.y.clone(),
                    },
                ))
            }
        })
        .await?
    };

    metrics::counter!("charts_rendered_total", "kind" => kind.clone()).increment(1);
    tracing::debug!(dataset_id = %id, kind = %kind, bytes = svg.len(), "Chart rendered");

    Ok((
        [
            (header::CONTENT_TYPE, render::SVG_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-store"),
        ],
        svg,
    ))
}
