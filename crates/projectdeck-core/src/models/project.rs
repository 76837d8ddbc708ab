use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl Project {
    pub fn display_description(&self) -> &str {
        if self.description.trim().is_empty() {
            "No description"
        } else {
            &self.description
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_project_list() {
        let json = r#"[{"_id": "6650f1c2a1b2c3d4e5f60718", "title": "Portfolio", "description": "Personal site", "__v": 0},{"_id": "6650f1c2a1b2c3d4e5f60719", "title": "Tasks"}]"#;

        let projects: Vec<Project> = serde_json::from_str(json)
            .expect("Failed to parse projects test JSON");
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].id, "6650f1c2a1b2c3d4e5f60718");
        assert_eq!(projects[0].title, "Portfolio");
        assert_eq!(projects[0].display_description(), "Personal site");

        // Missing description falls back to placeholder text
        assert_eq!(projects[1].description, "");
        assert_eq!(projects[1].display_description(), "No description");
    }

    #[test]
    fn test_missing_id_is_rejected() {
        let json = r#"{"title": "Orphan"}"#;
        assert!(serde_json::from_str::<Project>(json).is_err());
    }
}
