use axum::{Json, extract::State};

use crate::application::{error::HttpError, landing::LandingModel};
use crate::infra::http::state::HttpState;

pub async fn landing(State(state): State<HttpState>) -> Result<Json<LandingModel>, HttpError> {
    let model = state.landing.build_landing_model().await?;
    Ok(Json(model))
}
