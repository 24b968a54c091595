use serde::Serialize;
use tera::{Context, Tera};

use super::errors::ServiceError;

/// Values available to worker and connector config templates.
#[derive(Clone, Debug, Serialize)]
pub struct TemplateContext<'a> {
    pub bootstrap_servers: &'a str,
    pub node: &'a str,
    pub offsets_topic: Option<&'a str>,
    pub configs_topic: Option<&'a str>,
}

/// Renders a config template; templates without tera syntax come back
/// unchanged.
pub fn render(
    name: &str,
    template: &str,
    context: &TemplateContext<'_>,
) -> Result<String, ServiceError> {
    let template_error = |source| ServiceError::Template {
        name: name.to_owned(),
        source,
    };

    let context = Context::from_serialize(context).map_err(template_error)?;
    Tera::one_off(template, &context, false).map_err(template_error)
}
