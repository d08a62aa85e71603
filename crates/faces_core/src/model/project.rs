//! Project domain model.

use serde::{Deserialize, Serialize};

/// One entry of the project list. Names are not unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::Project;

    #[test]
    fn serializes_as_plain_name_object() {
        let json = serde_json::to_value(Project::new("faces")).unwrap();
        assert_eq!(json, serde_json::json!({ "name": "faces" }));

        let decoded: Project = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, Project::new("faces"));
    }
}
