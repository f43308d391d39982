use askama::Template;
use askama_web::WebTemplate;

use crate::catalog::Product;

#[derive(Template, WebTemplate)]
#[template(path = "storefront.html")]
pub(crate) struct StorefrontTemplate {
    pub(crate) company_name: String,
    pub(crate) site_logo: String,
    pub(crate) whatsapp: String,
    pub(crate) specials: Vec<Product>,
    pub(crate) products: Vec<Product>,
}

#[derive(Template, WebTemplate)]
#[template(path = "product.html")]
pub(crate) struct ProductTemplate {
    pub(crate) company_name: String,
    pub(crate) product: Product,
    pub(crate) pix_key: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin.html")]
pub(crate) struct AdminTemplate {
    pub(crate) company_name: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "login.html")]
pub(crate) struct LoginTemplate {
    pub(crate) company_name: String,
    pub(crate) error: String,
    pub(crate) next: String,
}

#[derive(Template)]
#[template(path = "manifest.json", escape = "none")]
pub(crate) struct ManifestTemplate<'a> {
    pub(crate) company_name: &'a str,
    pub(crate) app_icon: &'a str,
}
