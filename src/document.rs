use std::{borrow::Cow, fs, path::Path};

use gltf::Glb;
use serde_json::{Map, Value};

use crate::{error::PatchError, material::Material};

const GLB_MAGIC: &[u8; 4] = b"glTF";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContainerKind {
    /// `.glb`: 12 byte header, JSON chunk, optional BIN chunk.
    Binary,
    /// `.gltf`: plain JSON text.
    Json,
}

/// A glTF asset held as raw JSON with its `materials` array lifted into typed records.
///
/// Nodes, meshes, accessors, extensions and the BIN chunk are never interpreted,
/// so saving writes them back exactly as they were read.
#[derive(Clone, Debug)]
pub struct GltfDocument {
    root: Map<String, Value>,
    materials: Option<Vec<Material>>,
    container: Option<Glb<'static>>,
}

impl GltfDocument {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PatchError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| PatchError::io(path, source))?;
        Self::from_slice(&bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, PatchError> {
        let (json, container) = if bytes.starts_with(GLB_MAGIC) {
            let glb = Glb::from_slice(bytes)?;
            let json = glb.json.into_owned();
            let container = Glb {
                header: glb.header,
                json: Cow::Owned(Vec::new()),
                bin: glb.bin.map(|bin| Cow::Owned(bin.into_owned())),
            };
            (json, Some(container))
        } else {
            (bytes.to_vec(), None)
        };

        let Value::Object(mut root) = serde_json::from_slice::<Value>(&json)? else {
            return Err(PatchError::InvalidDocument(
                "top-level JSON value is not an object".to_string(),
            ));
        };

        let materials = match root.remove("materials") {
            None | Some(Value::Null) => None,
            Some(value) => Some(serde_json::from_value::<Vec<Material>>(value)?),
        };

        Ok(Self {
            root,
            materials,
            container,
        })
    }

    pub fn kind(&self) -> ContainerKind {
        match self.container {
            Some(_) => ContainerKind::Binary,
            None => ContainerKind::Json,
        }
    }

    pub fn materials(&self) -> &[Material] {
        self.materials.as_deref().unwrap_or_default()
    }

    pub fn materials_mut(&mut self) -> &mut [Material] {
        self.materials.as_deref_mut().unwrap_or_default()
    }

    /// BIN chunk payload of a `.glb`, if any.
    pub fn binary_chunk(&self) -> Option<&[u8]> {
        self.container.as_ref()?.bin.as_deref()
    }

    fn json_value(&self) -> Result<Value, PatchError> {
        let mut root = self.root.clone();
        if let Some(materials) = &self.materials {
            root.insert("materials".to_string(), serde_json::to_value(materials)?);
        }
        Ok(Value::Object(root))
    }

    /// Serializes in the container kind the document was loaded from.
    pub fn to_vec(&self) -> Result<Vec<u8>, PatchError> {
        let json = self.json_value()?;
        match &self.container {
            Some(container) => {
                let mut glb = container.clone();
                glb.json = Cow::Owned(serde_json::to_vec(&json)?);
                Ok(glb.to_vec()?)
            }
            None => Ok(serde_json::to_vec_pretty(&json)?),
        }
    }

    /// Writes the document to `path`, creating or truncating it.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PatchError> {
        let path = path.as_ref();
        let payload = self.to_vec()?;
        fs::write(path, payload).map_err(|source| PatchError::io(path, source))
    }
}
