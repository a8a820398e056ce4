//! Content components.

use formwright_config::Component;
use serde_json::{Value, json};
use tracing::debug;

use super::Hydrator;
use super::grid::source_rows;
use super::rows::rows_of;
use crate::error::RenderError;

/// Render the html template once per source row and join the results.
///
/// The template is `template` when declared, else the initial `html`. It is
/// captured in `content_source` so a later pass does not render the output
/// of the previous one.
pub(super) fn hydrate(hydrator: &Hydrator<'_>, component: &mut Component) -> Result<(), RenderError> {
  if component.content_source.is_none() {
    component.content_source = component.template.clone().or_else(|| component.html.clone());
  }
  let Some(template) = component.content_source.as_deref() else {
    return Ok(());
  };

  let state = hydrator.state();
  let has_source = component.api_source.is_some() || component.table.is_some();

  let html = if !has_source {
    let ctx = json!({ "session": state.session(), "values": state.values() });
    hydrator.render(&component.key, template, &ctx)?
  } else {
    let rows = source_rows(hydrator, component).map(rows_of).unwrap_or_default();
    if rows.is_empty() {
      debug!(component = %component.key, "content_source_empty");
    }

    let mut rendered = String::new();
    for (index, row) in rows.into_iter().enumerate() {
      let mut ctx = match row {
        Value::Object(fields) => fields.clone(),
        _ => Default::default(),
      };
      ctx.insert("row".to_string(), row.clone());
      ctx.insert("index".to_string(), json!(index));
      ctx.insert("session".to_string(), state.session().clone());
      ctx.insert("values".to_string(), Value::Object(state.values().clone()));
      rendered.push_str(&hydrator.render(&component.key, template, &Value::Object(ctx))?);
    }
    rendered
  };

  component.html = Some(html);
  Ok(())
}
