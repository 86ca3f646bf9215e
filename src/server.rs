use crate::config::AppConfig;
use crate::data::MapData;
use crate::join::first_occurrence;
use crate::projection::Projection;
use crate::types::StatRecord;
use crate::view::{build_view, RegionView};
use anyhow::Result;
use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use geo::algorithm::contains::Contains;
use geo::{BoundingRect, MultiPolygon, Point};
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::info;

// Bounding box of one projected county, pointing back into `AppState::counties`.
pub struct CountyEnvelope {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for CountyEnvelope {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

pub struct County {
    pub geometry: MultiPolygon<f64>,
    pub view: RegionView,
}

pub struct AppState {
    pub counties: Vec<County>,
    pub by_fips: HashMap<u32, usize>,
    pub records: Vec<StatRecord>,
    pub record_index: HashMap<u32, usize>,
    pub tree: RTree<CountyEnvelope>,
}

#[derive(Deserialize)]
pub struct PointQuery {
    x: f64,
    y: f64,
}

#[derive(Deserialize)]
pub struct FipsQuery {
    fips: u32,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct CountyResponse {
    pub fips: u32,
    pub area_name: Option<String>,
    pub state: Option<String>,
    pub education: Option<f64>,
    pub bucket: Option<usize>,
    pub fill: String,
    pub tooltip: Option<String>,
}

impl AppState {
    /// Canvas-space state: geometry goes through the same projection as the
    /// rendered map so that query coordinates match the page.
    pub fn build(config: &AppConfig, data: MapData) -> Self {
        let view = build_view(config, &data.regions, &data.records);
        let projection = Projection::for_regions(&config.canvas, &data.regions);

        let counties: Vec<County> = data
            .regions
            .iter()
            .zip(view.regions)
            .map(|(region, view)| County {
                geometry: projection.project(&region.geometry),
                view,
            })
            .collect();

        let by_fips = first_occurrence(counties.iter().map(|c| c.view.fips));
        let record_index = first_occurrence(data.records.iter().map(|r| r.fips));

        let tree = RTree::bulk_load(
            counties
                .iter()
                .enumerate()
                .filter_map(|(index, county)| {
                    let rect = county.geometry.bounding_rect()?;
                    Some(CountyEnvelope {
                        index,
                        aabb: AABB::from_corners(
                            [rect.min().x, rect.min().y],
                            [rect.max().x, rect.max().y],
                        ),
                    })
                })
                .collect(),
        );

        Self {
            counties,
            by_fips,
            records: data.records,
            record_index,
            tree,
        }
    }

    /// County whose boundary contains canvas point `(x, y)`.
    pub fn locate(&self, x: f64, y: f64) -> Option<CountyResponse> {
        let point = Point::new(x, y);
        self.tree
            .locate_in_envelope_intersecting(&AABB::from_point([x, y]))
            .filter_map(|candidate| self.counties.get(candidate.index))
            .find(|county| county.geometry.contains(&point))
            .map(|county| self.response(&county.view))
    }

    pub fn county(&self, fips: u32) -> Option<CountyResponse> {
        let index = *self.by_fips.get(&fips)?;
        Some(self.response(&self.counties[index].view))
    }

    fn response(&self, view: &RegionView) -> CountyResponse {
        let record = self
            .record_index
            .get(&view.fips)
            .map(|&i| &self.records[i]);
        CountyResponse {
            fips: view.fips,
            area_name: record.map(|r| r.area_name.clone()),
            state: record.map(|r| r.state.clone()),
            education: view.education,
            bucket: view.bucket,
            fill: view.fill.clone(),
            tooltip: view.tooltip.clone(),
        }
    }
}

pub async fn start_server(config: AppConfig, data: MapData) -> Result<()> {
    info!("Building spatial index for {} counties...", data.regions.len());
    let state = Arc::new(AppState::build(&config, data));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.server.port));
    let output_dir = config.output.dir().to_path_buf();
    info!("Serving {:?} on http://{}", output_dir, addr);

    let app = Router::new()
        .route("/api/query", get(query_handler))
        .route("/api/county", get(county_handler))
        .fallback_service(ServeDir::new(output_dir))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn query_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PointQuery>,
) -> Json<Option<CountyResponse>> {
    Json(state.locate(params.x, params.y))
}

async fn county_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FipsQuery>,
) -> Json<Option<CountyResponse>> {
    Json(state.county(params.fips))
}
