//! Lottie animation engine: keyframe resolution, expressions, the layer
//! composition tree and drawing onto an abstract [`Surface`].

pub mod animatable;
pub mod assets;
pub mod composition;
pub mod config;
pub mod content;
pub mod error;
pub mod expressions;
pub mod layers;
pub mod loader;
pub mod player;
pub mod property;
pub mod shape_data;
pub mod surface;
pub mod transform;

use std::collections::HashSet;
use std::sync::{Mutex, OnceLock};

pub use assets::{AssetRequest, AssetResolver, FileResolver, Font, FontManager, FontSpec, Glyph, ImageAsset};
pub use composition::{Composition, Marker};
pub use config::{EngineConfig, ExpressionErrorPolicy};
pub use error::{LookupKind, LottieError, Result};
pub use loader::{spawn_load, CompositionCache};
pub use player::LottiePlayer;
pub use surface::{RecordingSurface, Surface};

/// Returns true the first time `key` is seen in this process. Used to keep
/// repeated warnings about the same unsupported content out of the log.
pub(crate) fn first_report(key: String) -> bool {
    static REPORTED: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();
    let store = REPORTED.get_or_init(|| Mutex::new(HashSet::new()));
    match store.lock() {
        Ok(mut seen) => seen.insert(key),
        Err(_) => true,
    }
}
