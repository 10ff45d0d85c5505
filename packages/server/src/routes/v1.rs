use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/categories", category_routes())
        .nest("/containers", container_routes())
        .nest("/items", item_routes())
}

fn category_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::category::create_category,
            handlers::category::list_categories
        ))
        .routes(routes!(
            handlers::category::get_category,
            handlers::category::update_category,
            handlers::category::delete_category
        ))
}

fn container_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::container::create_container,
            handlers::container::list_containers
        ))
        .routes(routes!(
            handlers::container::get_container,
            handlers::container::update_container,
            handlers::container::delete_container
        ))
        .nest("/{id}/images", container_image_routes())
}

fn item_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::item::create_item,
            handlers::item::list_items
        ))
        .routes(routes!(
            handlers::item::get_item,
            handlers::item::update_item,
            handlers::item::delete_item
        ))
        .nest("/{id}/images", item_image_routes())
}

fn item_image_routes() -> OpenApiRouter<AppState> {
    let upload = OpenApiRouter::new()
        .routes(routes!(handlers::image::upload_item_image))
        .layer(handlers::image::upload_body_limit());

    OpenApiRouter::new()
        .routes(routes!(handlers::image::reorder_item_images))
        .routes(routes!(
            handlers::image::download_item_image,
            handlers::image::delete_item_image
        ))
        .merge(upload)
}

fn container_image_routes() -> OpenApiRouter<AppState> {
    let upload = OpenApiRouter::new()
        .routes(routes!(handlers::image::upload_container_image))
        .layer(handlers::image::upload_body_limit());

    OpenApiRouter::new()
        .routes(routes!(handlers::image::reorder_container_images))
        .routes(routes!(
            handlers::image::download_container_image,
            handlers::image::delete_container_image
        ))
        .merge(upload)
}
