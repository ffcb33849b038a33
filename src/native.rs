use crate::error::NativeError;
use libloading::{Library, Symbol};
use std::{collections::HashMap, ffi::c_void, path::PathBuf};
use tracing::debug;

/// Native libraries opened on demand and kept loaded for the lifetime of the runtime, so
/// views over their symbols stay valid.
pub struct NativeLibraries {
    root: Option<PathBuf>,
    libraries: HashMap<String, Library>,
}

impl NativeLibraries {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self {
            root,
            libraries: HashMap::new(),
        }
    }

    // first file in the root directory whose name starts with `name`, else `name` itself
    fn locate(&self, name: &str) -> PathBuf {
        let found = self
            .root
            .as_ref()
            .and_then(|root| root.read_dir().ok())
            .into_iter()
            .flatten()
            .filter_map(Result::ok)
            .find(|d| d.file_name().to_string_lossy().starts_with(name));
        match found {
            Some(d) => d.path(),
            None => PathBuf::from(name),
        }
    }

    pub fn get_library(&mut self, name: &str) -> Result<&Library, NativeError> {
        if !self.libraries.contains_key(name) {
            let path = self.locate(name);
            debug!(library = name, path = %path.display(), "loading native library");
            let library = unsafe { Library::new(&path) }.map_err(|e| NativeError::Library {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
            self.libraries.insert(name.to_string(), library);
        }
        self.libraries
            .get(name)
            .ok_or_else(|| NativeError::Library {
                name: name.to_string(),
                reason: "library was not retained".to_string(),
            })
    }

    pub fn symbol_address(&mut self, library: &str, name: &str) -> Result<usize, NativeError> {
        let l = self.get_library(library)?;
        let sym: Symbol<*mut c_void> =
            unsafe { l.get(name.as_bytes()) }.map_err(|e| NativeError::Symbol {
                library: library.to_string(),
                symbol: name.to_string(),
                reason: e.to_string(),
            })?;
        Ok(*sym as usize)
    }
}
