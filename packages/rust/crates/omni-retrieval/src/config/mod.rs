//! Config namespace: validated engine config and YAML settings loading.

mod retrieval;
mod settings;

pub use retrieval::{
    DEFAULT_KEYWORD_BASE_SCORE, DEFAULT_KEYWORD_BOOST_FACTOR, DEFAULT_MIN_CONFIDENCE_SCORE,
    DEFAULT_TOP_K, RetrievalConfig,
};
pub use settings::{
    LimitSettings, RetrievalSettings, ScoringSettings, TimeoutSettings, load_retrieval_settings,
    load_retrieval_settings_file, load_retrieval_settings_from_paths, retrieval_settings_paths,
};
