//! Work handed to a viewer session

use crate::assets::{AssetError, MeshFormat};

/// One unit of work for the viewer; exactly one is processed per call
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// Scene script source
    Script(String),
    /// Mesh file dropped into the viewer
    File {
        /// Registry name for the imported model
        name: String,
        /// File contents
        bytes: Vec<u8>,
        /// Extension as declared by the caller, e.g. `glb` or `.OBJ`
        declared_extension: String,
    },
}

impl Submission {
    /// Script submission
    pub fn script(source: impl Into<String>) -> Self {
        Self::Script(source.into())
    }

    /// File submission named after the file stem, with the extension taken from `file_name`
    pub fn file(file_name: &str, bytes: Vec<u8>) -> Self {
        let path = std::path::Path::new(file_name);
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(file_name)
            .to_string();
        let declared_extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_string();
        Self::File { name, bytes, declared_extension }
    }

    /// Resolve the mesh format of a file submission; scripts have none
    pub fn format(&self) -> Result<Option<MeshFormat>, AssetError> {
        match self {
            Self::Script(_) => Ok(None),
            Self::File { declared_extension, .. } => MeshFormat::from_extension(declared_extension).map(Some),
        }
    }

    /// Short label for logs
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Script(_) => "script",
            Self::File { .. } => "file",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_from_name() {
        let submission = Submission::file("models/Helmet.GLB", vec![1, 2, 3]);

        let Submission::File { name, declared_extension, .. } = &submission else {
            panic!("expected a file submission");
        };
        assert_eq!(name, "Helmet");
        assert_eq!(declared_extension, "GLB");
        assert_eq!(submission.format().unwrap(), Some(MeshFormat::Glb));
    }

    #[test]
    fn test_unsupported_extension() {
        let submission = Submission::file("scene.gltf", Vec::new());
        assert!(matches!(submission.format(), Err(AssetError::UnsupportedFormat(ext)) if ext == "gltf"));
        assert_eq!(Submission::script("let a = 1;").format().unwrap(), None);
    }
}
