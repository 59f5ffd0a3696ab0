//! Module requests and resolution outcomes
//!
//! A [`ModuleRequest`] is an immutable value: every transformation returns a
//! new request. Once virtualized or marked not-found a request is settled and
//! further transformations leave it as is.

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use serde_json::Value;

use crate::virtual_content::VirtualResponse;

/// Metadata carried alongside a request
pub type RequestMeta = IndexMap<String, Value>;

#[derive(Debug, Clone, PartialEq)]
enum RequestState {
    Pending,
    Virtual(VirtualResponse),
    NotFound,
}

/// One in-flight resolution attempt
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleRequest {
    specifier: String,
    from_file: Utf8PathBuf,
    meta: Option<Arc<RequestMeta>>,
    state: RequestState,
}

impl ModuleRequest {
    /// Create a request for `specifier` imported from `from_file`
    pub fn new(specifier: impl Into<String>, from_file: impl Into<Utf8PathBuf>) -> Self {
        Self {
            specifier: specifier.into(),
            from_file: from_file.into(),
            meta: None,
            state: RequestState::Pending,
        }
    }

    pub fn specifier(&self) -> &str {
        &self.specifier
    }

    pub fn from_file(&self) -> &Utf8Path {
        &self.from_file
    }

    /// Directory relative specifiers are resolved against
    pub fn from_dir(&self) -> &Utf8Path {
        self.from_file.parent().unwrap_or(Utf8Path::new("/"))
    }

    /// A metadata entry
    pub fn meta(&self, key: &str) -> Option<&Value> {
        self.meta.as_ref().and_then(|m| m.get(key))
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self.state, RequestState::Virtual(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.state, RequestState::NotFound)
    }

    /// Virtualized or not-found; no further rules apply
    pub fn is_settled(&self) -> bool {
        !matches!(self.state, RequestState::Pending)
    }

    /// The virtual response, once virtualized
    pub fn virtual_response(&self) -> Option<&VirtualResponse> {
        match &self.state {
            RequestState::Virtual(response) => Some(response),
            _ => None,
        }
    }

    /// Same origin, different specifier
    pub fn alias(&self, specifier: impl Into<String>) -> Self {
        if self.is_settled() {
            return self.clone();
        }
        Self {
            specifier: specifier.into(),
            ..self.clone()
        }
    }

    /// Same specifier, resolved as if imported from `from_file`
    pub fn rehome(&self, from_file: impl Into<Utf8PathBuf>) -> Self {
        if self.is_settled() {
            return self.clone();
        }
        Self {
            from_file: from_file.into(),
            ..self.clone()
        }
    }

    /// Add a metadata entry
    pub fn with_meta(&self, key: &str, value: Value) -> Self {
        if self.is_settled() {
            return self.clone();
        }
        let mut meta = self.meta.as_deref().cloned().unwrap_or_default();
        meta.insert(key.to_string(), value);
        Self {
            meta: Some(Arc::new(meta)),
            ..self.clone()
        }
    }

    /// Settle on a virtual module
    pub fn virtualize(&self, response: VirtualResponse) -> Self {
        if self.is_settled() {
            return self.clone();
        }
        Self {
            specifier: response.id(),
            state: RequestState::Virtual(response),
            ..self.clone()
        }
    }

    /// Settle as not found
    pub fn not_found(&self) -> Self {
        if self.is_settled() {
            return self.clone();
        }
        Self {
            state: RequestState::NotFound,
            ..self.clone()
        }
    }
}

/// Outcome of a resolution, from the host or from the resolver
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Resolved to a file on disk or to a virtual module id
    Found {
        id: String,
        virtual_response: Option<VirtualResponse>,
    },
    NotFound {
        specifier: String,
        from_file: Utf8PathBuf,
        /// Underlying host error, kept for diagnostics
        reason: Option<String>,
    },
}

impl Resolution {
    /// A file on disk
    pub fn found(path: impl Into<String>) -> Self {
        Resolution::Found {
            id: path.into(),
            virtual_response: None,
        }
    }

    pub fn not_found(request: &ModuleRequest, reason: Option<String>) -> Self {
        Resolution::NotFound {
            specifier: request.specifier().to_string(),
            from_file: request.from_file().to_path_buf(),
            reason,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found { .. })
    }

    /// Resolved id, if found
    pub fn id(&self) -> Option<&str> {
        match self {
            Resolution::Found { id, .. } => Some(id),
            Resolution::NotFound { .. } => None,
        }
    }
}
