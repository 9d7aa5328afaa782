//! Derived resources
//!
//! A derived type lives under a parent (a disk under an instance, a node under
//! a node balancer config). Its endpoint template names each parent id, e.g.
//! `/nodebalancers/{nodebalancer_id}/configs/{config_id}/nodes/{id}`.

use super::property::ResourceDef;
use crate::error::{Error, Result};
use serde_json::Value;

/// Parent identifier(s) of a derived resource, outermost first
#[derive(Debug, Clone, PartialEq)]
pub struct ParentId(Vec<Value>);

impl ParentId {
    pub fn new(id: impl Into<Value>) -> Self {
        Self(vec![id.into()])
    }

    /// Composite parent key for doubly nested resources
    pub fn nested(ids: impl IntoIterator<Item = Value>) -> Self {
        Self(ids.into_iter().collect())
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parent key for the children of the resource `id` that has this parent
    pub fn child(&self, id: &Value) -> ParentId {
        let mut ids = self.0.clone();
        ids.push(id.clone());
        ParentId(ids)
    }
}

impl From<i64> for ParentId {
    fn from(id: i64) -> Self {
        ParentId::new(id)
    }
}

impl From<&str> for ParentId {
    fn from(id: &str) -> Self {
        ParentId::new(id)
    }
}

impl From<Value> for ParentId {
    fn from(id: Value) -> Self {
        ParentId::new(id)
    }
}

impl<A: Into<Value>, B: Into<Value>> From<(A, B)> for ParentId {
    fn from((outer, inner): (A, B)) -> Self {
        ParentId(vec![outer.into(), inner.into()])
    }
}

/// Check that `parent` matches what `def` needs
pub(crate) fn check_parent(def: &ResourceDef, parent: Option<&ParentId>) -> Result<()> {
    let given = parent.map_or(0, ParentId::len);
    if given != def.parent_ids.len() {
        return Err(Error::InvalidInput(format!(
            "{} needs {} parent id(s), got {}",
            def.display_name,
            def.parent_ids.len(),
            given
        )));
    }
    Ok(())
}

/// One URL path segment for an id value
fn segment(value: &Value) -> String {
    match value {
        Value::String(s) => urlencoding::encode(s).into_owned(),
        other => other.to_string(),
    }
}

/// Interpolate parent ids into `template`, and `id` when given
pub(crate) fn format_endpoint(
    template: &str,
    def: &ResourceDef,
    id: Option<&Value>,
    parent: Option<&ParentId>,
) -> Result<String> {
    check_parent(def, parent)?;

    let mut path = template.to_string();
    if let Some(parent) = parent {
        for (name, value) in def.parent_ids.iter().zip(parent.values()) {
            path = path.replace(&format!("{{{}}}", name), &segment(value));
        }
    }
    if let Some(id) = id {
        path = path.replace("{id}", &segment(id));
    }

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn def(endpoint: &str, parents: &[&str]) -> ResourceDef {
        serde_json::from_value(json!({
            "display_name": "Thing",
            "endpoint": endpoint,
            "parent_ids": parents,
            "properties": {"id": {"identifier": true}}
        }))
        .unwrap()
    }

    #[test]
    fn test_single_parent() {
        let d = def("/instances/{linode_id}/disks/{id}", &["linode_id"]);
        let parent = ParentId::from(123);
        assert_eq!(
            format_endpoint(&d.endpoint, &d, Some(&json!(1)), Some(&parent)).unwrap(),
            "/instances/123/disks/1"
        );
        assert_eq!(
            format_endpoint(d.collection_endpoint(), &d, None, Some(&parent)).unwrap(),
            "/instances/123/disks"
        );
    }

    #[test]
    fn test_nested_parents() {
        let d = def(
            "/nodebalancers/{nodebalancer_id}/configs/{config_id}/nodes/{id}",
            &["nodebalancer_id", "config_id"],
        );
        let parent = ParentId::from((10, 20));
        assert_eq!(
            format_endpoint(&d.endpoint, &d, Some(&json!(30)), Some(&parent)).unwrap(),
            "/nodebalancers/10/configs/20/nodes/30"
        );
    }

    #[test]
    fn test_parent_count_must_match() {
        let d = def("/instances/{linode_id}/disks/{id}", &["linode_id"]);
        assert!(format_endpoint(&d.endpoint, &d, Some(&json!(1)), None).is_err());

        let top = def("/volumes/{id}", &[]);
        let parent = ParentId::from(1);
        assert!(matches!(
            check_parent(&top, Some(&parent)),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_string_ids_are_encoded() {
        let d = def("/tags/{id}", &[]);
        assert_eq!(
            format_endpoint(&d.endpoint, &d, Some(&json!("web/prod")), None).unwrap(),
            "/tags/web%2Fprod"
        );
    }

    #[test]
    fn test_child_key() {
        let parent = ParentId::from(10);
        assert_eq!(parent.child(&json!(20)), ParentId::from((10, 20)));
    }
}
