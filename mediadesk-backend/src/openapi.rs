use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(description = "Content and media management API", license(name = "MIT or Apache2", identifier="MIT Apache2.0"), title = "mediadesk", version = env!("CARGO_PKG_VERSION")),
    paths(
        crate::content::get_content,
        crate::content::post_content,
        crate::content::update_content,
        crate::content::delete_content,
        crate::content::download_content,
        crate::content::get_thumbnail,
        crate::category::get_categories,
        crate::category::post_category
    )
)]
pub struct ApiDoc;

pub(crate) fn api_route<T: Clone + Sync + Send + 'static>() -> Router<T> {
    let doc = ApiDoc::openapi();
    Router::new().merge(SwaggerUi::new("/api/v1/swagger-ui").url("/api/v1/openapi.json", doc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_content_paths() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for expected in [
            "/api/v1/content",
            "/api/v1/content/{id}",
            "/api/v1/content/{id}/file",
            "/api/v1/content/{id}/thumbnail/{width}",
            "/api/v1/categories",
            "/api/v1/category",
        ] {
            assert!(
                paths.iter().any(|p| p.as_str() == expected),
                "missing {}",
                expected
            );
        }
    }
}
