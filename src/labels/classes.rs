use serde::Serialize;
use std::path::Path;

use crate::error::{AgriError, Result};

/// Ordered class list; position `i` is the label of logit `i`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ClassNames(Vec<String>);

impl ClassNames {
    pub fn new(names: Vec<String>) -> Self {
        Self(names)
    }

    /// Derive classes from an ImageFolder layout: every sub-directory of
    /// `root` is a class, sorted by name.
    ///
    /// Symlinked directories count and dot-directories are not skipped, so
    /// index `i` lines up with the list the network was trained against.
    pub fn from_dataset_dir(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(AgriError::Labels(format!(
                "dataset directory not found: {}",
                root.display()
            )));
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(root)? {
            let entry = entry?;
            if entry.path().is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();

        if names.is_empty() {
            return Err(AgriError::Labels(format!(
                "no class directories under {}",
                root.display()
            )));
        }
        Ok(Self(names))
    }

    /// Read a labels file written next to the exported weights.
    ///
    /// `.json` files hold an array of strings; anything else is one label
    /// per line with blank lines and `#` comments ignored.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        let names: Vec<String> = if is_json {
            serde_json::from_str(&text)?
        } else {
            text.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .map(str::to_string)
                .collect()
        };

        if names.is_empty() {
            return Err(AgriError::Labels(format!(
                "labels file {} is empty",
                path.display()
            )));
        }
        Ok(Self(names))
    }

    /// Prefer an explicit labels file, fall back to the dataset directory.
    pub fn resolve(labels: Option<&Path>, dataset_dir: Option<&Path>) -> Result<Self> {
        match (labels, dataset_dir) {
            (Some(path), _) if path.exists() => Self::from_file(path),
            (_, Some(dir)) => Self::from_dataset_dir(dir),
            (Some(path), None) => Err(AgriError::Labels(format!(
                "labels file not found: {}",
                path.display()
            ))),
            (None, None) => Err(AgriError::Labels(
                "no labels file or dataset directory configured".to_string(),
            )),
        }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// One label per line, the format `from_file` reads back.
    pub fn to_lines(&self) -> String {
        let mut out = self.0.join("\n");
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn dataset_dir_classes_are_sorted_directories_only() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["Tomato___healthy", "Apple___Black_rot", "Corn___Common_rust", ".cache"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        fs::write(dir.path().join("README.txt"), "not a class").unwrap();

        let classes = ClassNames::from_dataset_dir(dir.path()).unwrap();
        assert_eq!(
            classes.as_slice(),
            &[".cache", "Apple___Black_rot", "Corn___Common_rust", "Tomato___healthy"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_class_directories_are_classes() {
        let store = tempfile::tempdir().unwrap();
        let real = store.path().join("tomato_images");
        fs::create_dir(&real).unwrap();

        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("Apple___Black_rot")).unwrap();
        std::os::unix::fs::symlink(&real, root.path().join("Tomato___healthy")).unwrap();
        // a link to a file is still not a class
        fs::write(store.path().join("notes.txt"), "x").unwrap();
        std::os::unix::fs::symlink(store.path().join("notes.txt"), root.path().join("notes"))
            .unwrap();

        let classes = ClassNames::from_dataset_dir(root.path()).unwrap();
        assert_eq!(classes.as_slice(), &["Apple___Black_rot", "Tomato___healthy"]);
    }

    #[test]
    fn empty_dataset_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ClassNames::from_dataset_dir(dir.path()).is_err());
        assert!(ClassNames::from_dataset_dir(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn text_labels_skip_comments_and_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.txt");
        fs::write(&path, "# cattle\nfoot-and-mouth\n\nhealthy\nlumpy_skin\n").unwrap();

        let classes = ClassNames::from_file(&path).unwrap();
        assert_eq!(classes.len(), 3);
        assert_eq!(classes.get(1), Some("healthy"));
        assert_eq!(classes.get(3), None);
    }

    #[test]
    fn json_labels_round_trip_through_lines() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("labels.json");
        fs::write(&json, r#"["mastitis", "normal"]"#).unwrap();
        let classes = ClassNames::from_file(&json).unwrap();

        let txt = dir.path().join("labels.txt");
        fs::write(&txt, classes.to_lines()).unwrap();
        assert_eq!(ClassNames::from_file(&txt).unwrap(), classes);
    }

    #[test]
    fn resolve_prefers_existing_labels_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("from_dir")).unwrap();
        let labels = dir.path().join("labels.txt");

        let classes = ClassNames::resolve(Some(&labels), Some(dir.path())).unwrap();
        assert_eq!(classes.as_slice(), &["from_dir"]);

        fs::write(&labels, "from_file\n").unwrap();
        let classes = ClassNames::resolve(Some(&labels), Some(dir.path())).unwrap();
        assert_eq!(classes.as_slice(), &["from_file"]);
    }
}
