use crate::state;
use crate::templates;

use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;

pub(crate) async fn home(
    State(state): State<state::AppState>,
) -> Result<templates::StorefrontTemplate, (StatusCode, &'static str)> {
    let settings = state.settings.current();
    let products = state.products.list_available().map_err(|err| {
        eprintln!("failed to list products: {err}");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    })?;

    let (specials, regular): (Vec<_>, Vec<_>) = products
        .into_iter()
        .partition(|product| product.daily_special);

    Ok(templates::StorefrontTemplate {
        company_name: settings.company_name,
        site_logo: settings.site_logo,
        whatsapp: settings.whatsapp,
        specials,
        products: regular,
    })
}

pub(crate) async fn product_page(
    State(state): State<state::AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<templates::ProductTemplate, (StatusCode, &'static str)> {
    let settings = state.settings.current();
    let product = state
        .products
        .get(&id)
        .map_err(|err| {
            eprintln!("failed to load product {id}: {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        })?
        .filter(|product| product.available)
        .ok_or((StatusCode::NOT_FOUND, "not found"))?;

    Ok(templates::ProductTemplate {
        company_name: settings.company_name,
        product,
        pix_key: settings.pix_key,
    })
}
