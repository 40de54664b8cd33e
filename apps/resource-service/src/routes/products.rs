//! Product routes. Everything under `/api` requires an access token.

use std::future::Future;
use std::pin::Pin;

use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use service_support::extractors::{query_config, CurrentUser, UserId, ValidatedJson};
use service_support::middleware::JwtExtract;
use service_support::AppError;
use tracing::info;

use crate::products::{NewProduct, ProductError, ProductQuery, DEFAULT_PAGE_SIZE};
use crate::state::AppState;

/// The caller as seen by product handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserInfo {
    pub user_id: UserId,
    pub username: String,
    pub is_admin: bool,
}

impl From<CurrentUser> for UserInfo {
    fn from(user: CurrentUser) -> Self {
        Self {
            user_id: user.id,
            username: user.username().unwrap_or_default().to_string(),
            is_admin: user.is_admin(),
        }
    }
}

impl FromRequest for UserInfo {
    type Error = AppError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let user = CurrentUser::from_request(req, payload);
        Box::pin(async move { user.await.map(UserInfo::from) })
    }
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub category: Option<String>,
    pub search: Option<String>,
}

impl From<ListParams> for ProductQuery {
    fn from(params: ListParams) -> Self {
        let non_blank = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            page: params.page.unwrap_or(1),
            size: params.size.unwrap_or(DEFAULT_PAGE_SIZE),
            category: non_blank(params.category),
            search: non_blank(params.search),
        }
    }
}

impl From<ProductError> for AppError {
    fn from(e: ProductError) -> Self {
        AppError::bad_request(e.code(), e.to_string())
    }
}

async fn list_products(
    user: UserInfo,
    params: web::Query<ListParams>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let query = ProductQuery::from(params.into_inner());
    let page = state.products.list(&query)?;

    info!(
        user_id = user.user_id,
        total = page.total,
        page = page.page,
        "products listed"
    );
    Ok(HttpResponse::Ok().json(page))
}

async fn create_product(
    user: UserInfo,
    body: ValidatedJson<NewProduct>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let product = state.products.create(body.into_inner())?;

    info!(
        user_id = user.user_id,
        username = %user.username,
        product_id = product.id,
        "product created"
    );
    Ok(HttpResponse::Created().json(product))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .wrap(JwtExtract)
            .app_data(query_config())
            .route("/products", web::get().to(list_products))
            .route("/products", web::post().to(create_product)),
    );
}
