//! Static "about" pages.

use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct AboutPage {
    pub title: &'static str,
    pub text: &'static str,
}

/// `GET /about/author/`
pub async fn author() -> Json<AboutPage> {
    Json(AboutPage {
        title: "About the author",
        text: "Yatube is a small blogging community: write posts, join groups, follow the authors you like.",
    })
}

/// `GET /about/tech/`
pub async fn tech() -> Json<AboutPage> {
    Json(AboutPage {
        title: "Technologies",
        text: "Rust, axum, sqlx and PostgreSQL, with tracing for logs.",
    })
}
