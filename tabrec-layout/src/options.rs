use std::sync::Arc;

use crate::{CodecRegistry, LocalDictionaryPolicy, NoLocalDictionaries};

/// Options used when building a [`RecordLayoutResolver`](crate::RecordLayoutResolver).
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    codecs: Arc<CodecRegistry>,
    local_dictionaries: Arc<dyn LocalDictionaryPolicy>,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            codecs: Arc::new(CodecRegistry::default()),
            local_dictionaries: Arc::new(NoLocalDictionaries),
        }
    }
}

impl ResolverOptions {
    /// Look up metric codecs in `codecs` instead of the default registry.
    pub fn with_codecs(mut self, codecs: Arc<CodecRegistry>) -> Self {
        self.codecs = codecs;
        self
    }

    pub fn with_local_dictionary_policy(mut self, policy: Arc<dyn LocalDictionaryPolicy>) -> Self {
        self.local_dictionaries = policy;
        self
    }

    pub fn codecs(&self) -> &Arc<CodecRegistry> {
        &self.codecs
    }

    pub fn local_dictionary_policy(&self) -> &Arc<dyn LocalDictionaryPolicy> {
        &self.local_dictionaries
    }
}
